//! ANSI 256-color escape helpers for stream prefixes.

/// Resets the terminal foreground and background colors.
pub const RESET: &str = "\x1b[0;00m";

/// Map an RGB triple to the nearest entry of the 6x6x6 xterm color cube.
fn cube_index(r: u8, g: u8, b: u8) -> u16 {
    let scale = |c: u8| (u16::from(c) * 5) / 0xFF;
    36 * scale(r) + 6 * scale(g) + scale(b) + 16
}

/// Foreground escape sequence for the closest 256-color match.
pub fn fg(r: u8, g: u8, b: u8) -> String {
    format!("\x1b[38;5;{}m", cube_index(r, g, b))
}

/// Background escape sequence for the closest 256-color match.
pub fn bg(r: u8, g: u8, b: u8) -> String {
    format!("\x1b[48;5;{}m", cube_index(r, g, b))
}
