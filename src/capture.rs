//! Stream capture workers: decode a child output stream into line events.

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::debug;

use crate::event::{LineEvent, StreamSource};
use crate::queue::LineSubmitter;

/// Upper bound on a single decoded line. A line exceeding it ends the
/// worker with an error instead of being silently truncated.
const MAX_LINE_BYTES: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("line on {0:?} exceeds {max} bytes", max = MAX_LINE_BYTES)]
    LineTooLong(StreamSource),

    #[error("read error on {stream:?}: {source}")]
    Read {
        stream: StreamSource,
        #[source]
        source: std::io::Error,
    },
}

/// Worker entry point: capture one child stream to end-of-stream.
///
/// A capture failure is surfaced as a formatted error line so it gets the
/// same timestamp and ordering treatment as normal output; it ends this
/// worker only. The sibling stream, the queue and the child keep running.
pub async fn capture_worker<R>(
    stream: R,
    source: StreamSource,
    submitter: LineSubmitter,
) -> Result<(), CaptureError>
where
    R: AsyncRead + Unpin,
{
    match capture_stream(stream, source, &submitter).await {
        Ok(()) => {
            debug!("{source:?} capture worker drained");
            Ok(())
        }
        Err(e) => {
            submitter
                .submit(LineEvent::new(
                    StreamSource::Stderr,
                    format!("-->capture error: {e}"),
                ))
                .await;
            Err(e)
        }
    }
}

/// Scan the pipe for newline-terminated lines and submit one event per
/// line, stamped the instant the line is complete. A final unterminated
/// line is emitted when the stream ends.
async fn capture_stream<R>(
    stream: R,
    source: StreamSource,
    submitter: &LineSubmitter,
) -> Result<(), CaptureError>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut buf: Vec<u8> = Vec::new();

    loop {
        let chunk = reader.fill_buf().await.map_err(|source_err| CaptureError::Read {
            stream: source,
            source: source_err,
        })?;

        if chunk.is_empty() {
            if !buf.is_empty() {
                submit_line(submitter, source, &mut buf).await;
            }
            return Ok(());
        }

        match chunk.iter().position(|&b| b == b'\n') {
            Some(newline) => {
                buf.extend_from_slice(&chunk[..newline]);
                reader.consume(newline + 1);
                if buf.len() > MAX_LINE_BYTES {
                    return Err(CaptureError::LineTooLong(source));
                }
                submit_line(submitter, source, &mut buf).await;
            }
            None => {
                let len = chunk.len();
                buf.extend_from_slice(chunk);
                reader.consume(len);
                if buf.len() > MAX_LINE_BYTES {
                    return Err(CaptureError::LineTooLong(source));
                }
            }
        }
    }
}

async fn submit_line(submitter: &LineSubmitter, source: StreamSource, buf: &mut Vec<u8>) {
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    let text = String::from_utf8_lossy(buf).into_owned();
    buf.clear();
    submitter.submit(LineEvent::new(source, text)).await;
}
