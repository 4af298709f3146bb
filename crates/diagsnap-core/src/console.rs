//! Human-facing status lines. No machine contract.

use crate::capture::CaptureResult;

pub const GLYPH_CAPTURED: char = '✓';
pub const GLYPH_UNSAVED: char = '!';
pub const GLYPH_SKIPPED: char = '○';

/// Glyph for a module result: captured, captured but not saved, or skipped.
pub fn glyph(result: &CaptureResult) -> char {
    match (result.success, result.error_msg.is_some()) {
        (true, false) => GLYPH_CAPTURED,
        (true, true) => GLYPH_UNSAVED,
        (false, _) => GLYPH_SKIPPED,
    }
}

/// `"  {glyph} {display_name}"`
pub fn status_line(display_name: &str, result: &CaptureResult) -> String {
    format!("  {} {}", glyph(result), display_name)
}
