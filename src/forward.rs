//! Stdin forwarding into the child process.

use std::io::{self, PipeWriter};
use std::thread;

use tracing::{debug, error};

/// Forward our stdin into the child's until end-of-input, then close the
/// child's end so children that read to completion can make progress.
///
/// Runs on a dedicated thread: terminal reads block indefinitely, and an
/// async runtime would wait on such a read at shutdown. The thread is
/// never joined; it is abandoned when the process exits.
///
/// A copy failure means the surrounding environment is broken rather than
/// anything child-specific, so it terminates the whole program immediately.
pub fn spawn_forwarder(mut child_stdin: PipeWriter) {
    thread::spawn(move || {
        let mut stdin = io::stdin().lock();
        match io::copy(&mut stdin, &mut child_stdin) {
            Ok(bytes) => debug!("stdin exhausted after {bytes} bytes, closing child stdin"),
            Err(e) => {
                error!("stdin forwarding failed: {e}");
                std::process::exit(1);
            }
        }
        // Dropping the writer closes the child's stdin.
    });
}
