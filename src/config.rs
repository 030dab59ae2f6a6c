//! Presentation configuration, resolved once at startup.

use anyhow::{bail, Result};

use crate::color;
use crate::event::StreamSource;

/// What the timestamp on each line means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampMode {
    /// Wall-clock time at which the line was captured.
    Absolute,
    /// Elapsed time since the previously emitted line.
    #[default]
    RelativeToPrevious,
    /// Elapsed time since the start of execution.
    RelativeToStart,
}

/// Rounding unit for relative timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resolution {
    Millisecond,
    #[default]
    Microsecond,
}

/// Immutable presentation settings shared by the formatter and the
/// emission queue. Scoped to one invocation, not process-wide, so tests
/// can run independent queues concurrently.
#[derive(Debug, Clone)]
pub struct PresentationMode {
    pub colorize: bool,
    pub timestamp_mode: TimestampMode,
    pub resolution: Resolution,
    pub merge_err_into_out: bool,
    pub raw_mode: bool,
}

impl Default for PresentationMode {
    fn default() -> Self {
        Self {
            colorize: true,
            timestamp_mode: TimestampMode::default(),
            resolution: Resolution::default(),
            merge_err_into_out: false,
            raw_mode: false,
        }
    }
}

impl PresentationMode {
    /// Check the cross-field invariants the CLI layer also enforces.
    ///
    /// Absolute timestamps carry their own fixed microsecond rendering, so
    /// they cannot be combined with a non-default resolution. The
    /// absolute/relative conflict itself is unrepresentable in
    /// [`TimestampMode`].
    pub fn validate(&self) -> Result<()> {
        if self.timestamp_mode == TimestampMode::Absolute
            && self.resolution != Resolution::default()
        {
            bail!("absolute timestamps cannot be combined with a custom resolution");
        }
        Ok(())
    }

    /// The string emitted before the timestamp bracket: a color sequence,
    /// or a literal stream marker when colorization is off.
    pub fn prefix(&self, source: StreamSource) -> String {
        if self.colorize {
            match source {
                StreamSource::Stdout => format!(
                    "{}{}{}",
                    color::RESET,
                    color::fg(128, 255, 128),
                    color::bg(0, 0, 0)
                ),
                StreamSource::Stderr => format!(
                    "{}{}{}",
                    color::RESET,
                    color::fg(255, 0, 0),
                    color::bg(0, 0, 0)
                ),
            }
        } else {
            match source {
                StreamSource::Stdout => "stdout: ".to_string(),
                StreamSource::Stderr => "stderr: ".to_string(),
            }
        }
    }

    /// The string emitted after the timestamp bracket.
    pub fn line_end(&self) -> &'static str {
        if self.colorize {
            color::RESET
        } else {
            ""
        }
    }
}
