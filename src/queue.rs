//! Ordered emission queue: the single serialization point for output.
//!
//! Capture workers and the supervisor submit [`LineEvent`]s from their own
//! tasks; one consumer task formats them and writes to the real stdout and
//! stderr. The channel is bounded, so a fast child against a slow terminal
//! blocks its capture worker instead of growing memory without limit.
//!
//! Events are emitted in submission order. Because stdout and stderr are
//! captured by independent workers, that is the order in which each worker
//! observed a complete line, not a global wall-clock order across the two
//! streams; line-buffered OS pipes do not allow recovering the latter.

use std::time::Instant;

use anyhow::{Context, Result};
use tokio::io::{self, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::PresentationMode;
use crate::event::{EmissionCursor, LineEvent, StreamSource};
use crate::format::format_line;

/// Backlog entries before submitters start blocking.
const BACKLOG: usize = 10;

pub(crate) enum Submission {
    Line(LineEvent),
    /// Move the elapsed-time reference point, in submission order.
    ResetCursor(Instant),
}

/// Producer handle for the queue; clone one per worker.
#[derive(Clone)]
pub struct LineSubmitter {
    tx: mpsc::Sender<Submission>,
}

impl LineSubmitter {
    /// Queue a line for emission, awaiting while the backlog is full.
    pub async fn submit(&self, event: LineEvent) {
        // The consumer stops pulling only once every submitter is dropped,
        // so a send can fail here only after the consumer itself died; the
        // failure then surfaces from drain_and_close().
        let _ = self.tx.send(Submission::Line(event)).await;
    }

    /// Reset the elapsed-time cursor as of `at`.
    ///
    /// In-band so that a reset followed by a banner cannot reorder.
    pub async fn reset_cursor(&self, at: Instant) {
        let _ = self.tx.send(Submission::ResetCursor(at)).await;
    }
}

/// The queue itself; owned by the supervisor.
pub struct EmissionQueue {
    submitter: LineSubmitter,
    consumer: JoinHandle<Result<()>>,
}

impl EmissionQueue {
    /// Spawn the consumer task writing to the process stdout and stderr.
    pub fn spawn(mode: PresentationMode) -> Self {
        let (tx, rx) = mpsc::channel(BACKLOG);
        let consumer = tokio::spawn(async move {
            consume(rx, mode, io::stdout(), io::stderr())
                .await
                .map(|_| ())
        });
        Self {
            submitter: LineSubmitter { tx },
            consumer,
        }
    }

    pub fn submitter(&self) -> LineSubmitter {
        self.submitter.clone()
    }

    /// Close the queue and block until everything already submitted has
    /// been formatted, written and flushed.
    ///
    /// Every other [`LineSubmitter`] clone must already be dropped (workers
    /// drop theirs when they are joined); otherwise the consumer keeps
    /// waiting for more events.
    pub async fn drain_and_close(self) -> Result<()> {
        drop(self.submitter);
        self.consumer.await.context("emission consumer panicked")?
    }
}

/// Single consuming path: pulls in submission order, formats, writes.
///
/// Owns the cursor and both destinations, so no lock is needed around
/// "format, write, advance cursor". Returns the writers for inspection in
/// tests.
async fn consume<O, E>(
    mut rx: mpsc::Receiver<Submission>,
    mode: PresentationMode,
    mut out: O,
    mut err: E,
) -> Result<(O, E)>
where
    O: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    let mut cursor = EmissionCursor::new();

    while let Some(submission) = rx.recv().await {
        match submission {
            Submission::ResetCursor(at) => cursor.reset_to(at),
            Submission::Line(event) => {
                let mut line = format_line(&event, &mut cursor, &mode);
                line.push('\n');
                match event.source {
                    StreamSource::Stderr if !mode.merge_err_into_out => {
                        write_line(&mut err, &line).await?
                    }
                    _ => write_line(&mut out, &line).await?,
                }
            }
        }
    }

    Ok((out, err))
}

async fn write_line<W: AsyncWrite + Unpin>(dest: &mut W, line: &str) -> Result<()> {
    dest.write_all(line.as_bytes())
        .await
        .context("write output line")?;
    dest.flush().await.context("flush output line")
}

#[cfg(test)]
pub(crate) fn test_channel(capacity: usize) -> (LineSubmitter, mpsc::Receiver<Submission>) {
    let (tx, rx) = mpsc::channel(capacity);
    (LineSubmitter { tx }, rx)
}
