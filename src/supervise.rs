//! Child process lifecycle: spawn, banners, capture joins, exit status.

use std::io;
use std::process::Stdio;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::capture::capture_worker;
use crate::config::PresentationMode;
use crate::event::{LineEvent, StreamSource};
use crate::forward;
use crate::queue::EmissionQueue;

/// Exit code when the child could not be started at all.
pub const START_FAILURE_CODE: i32 = 1;

/// What to run and which banners to print around it.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub show_start: bool,
    pub show_end: bool,
}

impl Invocation {
    /// The command line as shown in the start and end banners.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// How the child ended, as far as exit-code propagation is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildExit {
    Exited(i32),
    Signaled(i32),
    StartFailed(String),
}

impl ChildExit {
    /// The exit code this process reproduces for the child's outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            ChildExit::Exited(code) => *code,
            ChildExit::Signaled(signo) => 128 + signo,
            ChildExit::StartFailed(_) => START_FAILURE_CODE,
        }
    }
}

/// Run the child under supervision and return how it ended.
///
/// Output ordering: the start banner is queued before the capture workers
/// exist, and the end banner only after both workers have been joined, so
/// banners can never interleave with captured lines. The queue drain is
/// the final synchronization point; once it returns, exiting cannot drop
/// output.
pub async fn run(invocation: &Invocation, mode: PresentationMode) -> Result<ChildExit> {
    let queue = EmissionQueue::spawn(mode);
    let submitter = queue.submitter();
    let cmdline = invocation.command_line();

    // The stdin pipe is wired up front; failing to create it is a
    // precondition error that aborts before the child starts.
    let (stdin_reader, stdin_writer) = io::pipe().context("could not create stdin pipe")?;

    debug!("spawning '{cmdline}'");
    let mut child = match Command::new(&invocation.program)
        .args(&invocation.args)
        .stdin(Stdio::from(stdin_reader))
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            submitter
                .submit(LineEvent::new(
                    StreamSource::Stderr,
                    format!("-->could not start, because of error: {e}"),
                ))
                .await;
            drop(submitter);
            queue.drain_and_close().await?;
            return Ok(ChildExit::StartFailed(e.to_string()));
        }
    };

    // Both output pipes were requested above; a missing handle would mean
    // the Stdio wiring was violated.
    let child_stdout = child.stdout.take().context("child stdout pipe missing")?;
    let child_stderr = child.stderr.take().context("child stderr pipe missing")?;

    // Reset the cursor first so the first line's elapsed time is measured
    // from the true start of execution, not from queue construction.
    submitter.reset_cursor(Instant::now()).await;
    if invocation.show_start {
        submitter
            .submit(LineEvent::new(
                StreamSource::Stdout,
                format!("Start of '{cmdline}'"),
            ))
            .await;
    }

    let out_worker = tokio::spawn(capture_worker(
        child_stdout,
        StreamSource::Stdout,
        queue.submitter(),
    ));
    let err_worker = tokio::spawn(capture_worker(
        child_stderr,
        StreamSource::Stderr,
        queue.submitter(),
    ));
    forward::spawn_forwarder(stdin_writer);

    let exit = match child.wait().await {
        Ok(status) => {
            let exit = exit_from_status(status);
            if !status.success() {
                submitter
                    .submit(LineEvent::new(
                        StreamSource::Stderr,
                        format!("-->finished with error: {status}"),
                    ))
                    .await;
            }
            exit
        }
        Err(e) => {
            submitter
                .submit(LineEvent::new(
                    StreamSource::Stderr,
                    format!("-->finished with error: {e}"),
                ))
                .await;
            ChildExit::Exited(1)
        }
    };

    // Both workers drain to end-of-stream once the child is gone. A failed
    // worker already reported itself through the queue.
    for (stream, worker) in [
        (StreamSource::Stdout, out_worker),
        (StreamSource::Stderr, err_worker),
    ] {
        match worker.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("{stream:?} capture worker failed: {e}"),
            Err(e) => warn!("{stream:?} capture worker panicked: {e}"),
        }
    }

    if invocation.show_end {
        submitter
            .submit(LineEvent::new(
                StreamSource::Stdout,
                format!("End of '{cmdline}'"),
            ))
            .await;
    }
    drop(submitter);
    queue.drain_and_close().await?;

    Ok(exit)
}

fn exit_from_status(status: std::process::ExitStatus) -> ChildExit {
    if let Some(code) = status.code() {
        return ChildExit::Exited(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signo) = status.signal() {
            return ChildExit::Signaled(signo);
        }
    }
    ChildExit::Exited(1)
}
