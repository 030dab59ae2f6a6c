//! Rendering of a captured line into its display string.

use std::time::Duration;

use crate::config::{PresentationMode, Resolution, TimestampMode};
use crate::event::{EmissionCursor, LineEvent};

/// Format one captured line and advance the cursor per the timestamp mode.
///
/// Pure with respect to its inputs except for the cursor: relative modes
/// move `cursor.previous` to the event's capture time, unless the mode is
/// [`TimestampMode::RelativeToStart`], in which case the reference point
/// stays pinned where the last reset put it.
pub fn format_line(
    event: &LineEvent,
    cursor: &mut EmissionCursor,
    mode: &PresentationMode,
) -> String {
    if mode.raw_mode {
        let elapsed = event.at.mono.saturating_duration_since(cursor.previous);
        advance(cursor, event, mode);
        return format!("{},{}", elapsed.as_nanos(), event.text);
    }

    let prefix = mode.prefix(event.source);
    let reset = mode.line_end();

    match mode.timestamp_mode {
        TimestampMode::Absolute => format!(
            "{}[{}]{} {}",
            prefix,
            event.at.wall.format("%Y-%m-%d %H:%M:%S%.6f"),
            reset,
            event.text
        ),
        TimestampMode::RelativeToPrevious | TimestampMode::RelativeToStart => {
            let elapsed = round_duration(
                event.at.mono.saturating_duration_since(cursor.previous),
                mode.resolution,
            );
            advance(cursor, event, mode);
            format!(
                "{}[{:>12}]{} {}",
                prefix,
                format!("{elapsed:?}"),
                reset,
                event.text
            )
        }
    }
}

fn advance(cursor: &mut EmissionCursor, event: &LineEvent, mode: &PresentationMode) {
    if mode.timestamp_mode != TimestampMode::RelativeToStart {
        cursor.previous = event.at.mono;
    }
}

/// Round half-up to the resolution's unit.
fn round_duration(elapsed: Duration, resolution: Resolution) -> Duration {
    let unit: u128 = match resolution {
        Resolution::Millisecond => 1_000_000,
        Resolution::Microsecond => 1_000,
    };
    let nanos = elapsed.as_nanos();
    let rounded = (nanos + unit / 2) / unit * unit;
    Duration::from_nanos(rounded as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{StreamSource, Timestamp};
    use chrono::{Local, TimeZone};
    use std::time::Instant;

    fn plain(timestamp_mode: TimestampMode) -> PresentationMode {
        PresentationMode {
            colorize: false,
            timestamp_mode,
            ..Default::default()
        }
    }

    fn event_after(base: Instant, offset: Duration, source: StreamSource, text: &str) -> LineEvent {
        LineEvent {
            at: Timestamp {
                wall: Local::now(),
                mono: base + offset,
            },
            source,
            text: text.to_string(),
        }
    }

    #[test]
    fn raw_mode_emits_nanoseconds_and_text_only() {
        let base = Instant::now();
        let mut cursor = EmissionCursor { previous: base };
        let mode = PresentationMode {
            raw_mode: true,
            ..Default::default()
        };
        let event = event_after(base, Duration::from_nanos(1500), StreamSource::Stdout, "hi");
        assert_eq!(format_line(&event, &mut cursor, &mode), "1500,hi");
        assert_eq!(cursor.previous, event.at.mono);
    }

    #[test]
    fn relative_microseconds_round_half_up() {
        let base = Instant::now();
        let mut cursor = EmissionCursor { previous: base };
        let mode = plain(TimestampMode::RelativeToPrevious);
        let event = event_after(
            base,
            Duration::from_nanos(1_234_567),
            StreamSource::Stdout,
            "hi",
        );
        assert_eq!(
            format_line(&event, &mut cursor, &mode),
            "stdout: [     1.235ms] hi"
        );
    }

    #[test]
    fn millisecond_resolution_coarsens_the_stamp() {
        let base = Instant::now();
        let mut cursor = EmissionCursor { previous: base };
        let mode = PresentationMode {
            colorize: false,
            resolution: Resolution::Millisecond,
            ..Default::default()
        };
        let event = event_after(
            base,
            Duration::from_nanos(1_500_000),
            StreamSource::Stderr,
            "x",
        );
        assert_eq!(
            format_line(&event, &mut cursor, &mode),
            "stderr: [         2ms] x"
        );
    }

    #[test]
    fn relative_to_previous_advances_the_cursor() {
        let base = Instant::now();
        let mut cursor = EmissionCursor { previous: base };
        let mode = plain(TimestampMode::RelativeToPrevious);
        let event = event_after(base, Duration::from_millis(5), StreamSource::Stdout, "a");
        format_line(&event, &mut cursor, &mode);
        assert_eq!(cursor.previous, event.at.mono);
    }

    #[test]
    fn relative_to_start_pins_the_cursor() {
        let base = Instant::now();
        let mut cursor = EmissionCursor { previous: base };
        let mode = plain(TimestampMode::RelativeToStart);

        let first = event_after(base, Duration::from_millis(5), StreamSource::Stdout, "a");
        format_line(&first, &mut cursor, &mode);
        assert_eq!(cursor.previous, base);

        // The second stamp is still measured from the start, not from "a".
        let second = event_after(base, Duration::from_millis(9), StreamSource::Stdout, "b");
        assert_eq!(
            format_line(&second, &mut cursor, &mode),
            "stdout: [         9ms] b"
        );
    }

    #[test]
    fn absolute_mode_uses_the_wall_clock_stamp() {
        let wall = Local
            .with_ymd_and_hms(2024, 1, 2, 3, 4, 5)
            .unwrap()
            .checked_add_signed(chrono::Duration::microseconds(6))
            .unwrap();
        let event = LineEvent {
            at: Timestamp {
                wall,
                mono: Instant::now(),
            },
            source: StreamSource::Stdout,
            text: "hi".to_string(),
        };
        let mut cursor = EmissionCursor::new();
        let mode = plain(TimestampMode::Absolute);
        assert_eq!(
            format_line(&event, &mut cursor, &mode),
            "stdout: [2024-01-02 03:04:05.000006] hi"
        );
    }

    #[test]
    fn colorized_line_wraps_only_the_bracket() {
        let base = Instant::now();
        let mut cursor = EmissionCursor { previous: base };
        let mode = PresentationMode::default();
        let event = event_after(base, Duration::from_micros(7), StreamSource::Stderr, "oops");
        let line = format_line(&event, &mut cursor, &mode);
        assert!(line.starts_with("\x1b[0;00m\x1b[38;5;196m\x1b[48;5;16m["));
        assert!(line.ends_with("]\x1b[0;00m oops"));
    }

    #[test]
    fn empty_text_passes_through_unchanged() {
        let base = Instant::now();
        let mut cursor = EmissionCursor { previous: base };
        let mode = plain(TimestampMode::RelativeToPrevious);
        let event = event_after(base, Duration::ZERO, StreamSource::Stdout, "");
        assert_eq!(
            format_line(&event, &mut cursor, &mode),
            "stdout: [         0ns] "
        );
    }

    #[test]
    fn rounding_units() {
        assert_eq!(
            round_duration(Duration::from_nanos(499), Resolution::Microsecond),
            Duration::ZERO
        );
        assert_eq!(
            round_duration(Duration::from_nanos(500), Resolution::Microsecond),
            Duration::from_micros(1)
        );
        assert_eq!(
            round_duration(Duration::from_micros(1499), Resolution::Millisecond),
            Duration::from_millis(1)
        );
        assert_eq!(
            round_duration(Duration::from_micros(1500), Resolution::Millisecond),
            Duration::from_millis(2)
        );
    }
}
