//! Extension utilities (component C8): trailing-EOL stripping, control
//! picture rendering, and unused-extended-ASCII selection.

use scanner_calib_diagnostics::CalibrationError;
use serde::{Deserialize, Serialize};

/// The CR/LF sequence [`strip_trailing_eol`] detected and removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectedEol {
    /// A bare trailing `\r`.
    Cr,
    /// A bare trailing `\n`.
    Lf,
    /// A trailing `\r\n` pair (or a corrupted tail recognized as one — see
    /// [`strip_trailing_eol`]).
    CrLf,
}

impl std::fmt::Display for DetectedEol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DetectedEol::Cr => "CR",
            DetectedEol::Lf => "LF",
            DetectedEol::CrLf => "CRLF",
        })
    }
}

/// Strip a trailing EOL sequence the scanner or host appended to a report.
///
/// `is_baseline` gates the "four spaces then a control character" heuristic
/// (only ever fires for a baseline probe report, since only the baseline's
/// fixed boundary-spacing makes the heuristic meaningful). `strict`, when
/// true, disables that heuristic entirely regardless of `is_baseline` — see
/// [`scanner_calib_config::CalibrationConfig::strict_eol`].
///
/// Order of checks:
/// 1. a literal trailing `\r\n` is stripped as `CRLF`;
/// 2. otherwise a literal trailing `\n` is stripped as `LF`;
/// 3. otherwise a literal trailing `\r` is stripped as `CR`;
/// 4. otherwise, unless `strict`, if the last character is a non-zero
///    control character (`< 0x20`) and the four characters immediately
///    before it are spaces and `is_baseline`, that control character is
///    stripped and treated as `LF`;
/// 5. otherwise, if the second-to-last character is `\r` (the last
///    character having failed every check above — a corrupted CRLF tail),
///    both are stripped and treated as `CRLF`.
#[must_use]
pub fn strip_trailing_eol(s: &str, is_baseline: bool, strict: bool) -> (String, Option<DetectedEol>) {
    let chars: Vec<char> = s.chars().collect();
    let n = chars.len();
    if n == 0 {
        return (s.to_string(), None);
    }

    let last = chars[n - 1];

    if last == '\n' {
        if n >= 2 && chars[n - 2] == '\r' {
            return (chars[..n - 2].iter().collect(), Some(DetectedEol::CrLf));
        }
        return (chars[..n - 1].iter().collect(), Some(DetectedEol::Lf));
    }

    if last == '\r' {
        return (chars[..n - 1].iter().collect(), Some(DetectedEol::Cr));
    }

    if !strict && is_baseline && (last as u32) < 0x20 && last != '\0' && n >= 5 {
        let window = &chars[n - 5..n - 1];
        if window.iter().all(|&c| c == ' ') {
            return (chars[..n - 1].iter().collect(), Some(DetectedEol::Lf));
        }
    }

    if n >= 2 && chars[n - 2] == '\r' {
        return (chars[..n - 2].iter().collect(), Some(DetectedEol::CrLf));
    }

    (s.to_string(), None)
}

/// Return the smallest code point in `0x80..=0xFF` not present in `s`.
///
/// Used by C5 to pick a deterministic placeholder for unused-extended-ASCII
/// substitution rather than an arbitrary or randomized choice.
///
/// # Errors
/// Returns [`CalibrationError::NoUnusedExtendedAscii`] if `s` contains
/// every code point in that range.
pub fn unused_extended_ascii(s: &str) -> Result<char, CalibrationError> {
    let present: std::collections::HashSet<u32> = s.chars().map(|c| c as u32).collect();
    (0x80u32..=0xFF)
        .find(|code| !present.contains(code))
        .map(|code| char::from_u32(code).expect("0x80..=0xFF is always a valid scalar value"))
        .ok_or(CalibrationError::NoUnusedExtendedAscii)
}

/// Render a control character as its Unicode control-picture glyph
/// (`U+2400`–`U+241F`); any other character passes through unchanged.
#[must_use]
pub fn to_control_picture(c: char) -> char {
    if (c as u32) < 0x20 {
        char::from_u32(c as u32 + 0x2400).expect("control range maps into the control-picture block")
    } else {
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_literal_crlf() {
        let (s, eol) = strip_trailing_eol("hello\r\n", false, false);
        assert_eq!(s, "hello");
        assert_eq!(eol, Some(DetectedEol::CrLf));
    }

    #[test]
    fn strips_literal_lf_only() {
        let (s, eol) = strip_trailing_eol("hello\n", false, false);
        assert_eq!(s, "hello");
        assert_eq!(eol, Some(DetectedEol::Lf));
    }

    #[test]
    fn strips_literal_cr_only() {
        let (s, eol) = strip_trailing_eol("hello\r", false, false);
        assert_eq!(s, "hello");
        assert_eq!(eol, Some(DetectedEol::Cr));
    }

    #[test]
    fn no_eol_present_returns_input_unchanged() {
        let (s, eol) = strip_trailing_eol("hello", false, false);
        assert_eq!(s, "hello");
        assert_eq!(eol, None);
    }

    #[test]
    fn four_space_control_heuristic_fires_on_baseline() {
        let s = "payload    \u{7}";
        let (stripped, eol) = strip_trailing_eol(s, true, false);
        assert_eq!(stripped, "payload    ");
        assert_eq!(eol, Some(DetectedEol::Lf));
    }

    #[test]
    fn four_space_control_heuristic_does_not_fire_when_not_baseline() {
        let s = "payload    \u{7}";
        let (stripped, eol) = strip_trailing_eol(s, false, false);
        assert_eq!(stripped, s);
        assert_eq!(eol, None);
    }

    #[test]
    fn strict_mode_disables_four_space_heuristic() {
        let s = "payload    \u{7}";
        let (stripped, eol) = strip_trailing_eol(s, true, true);
        assert_eq!(stripped, s);
        assert_eq!(eol, None);
    }

    #[test]
    fn corrupted_crlf_tail_with_cr_second_to_last_is_recognized() {
        let s = "payload\r\u{1}";
        let (stripped, eol) = strip_trailing_eol(s, false, false);
        assert_eq!(stripped, "payload");
        assert_eq!(eol, Some(DetectedEol::CrLf));
    }

    #[test]
    fn invariant_strip_trailing_eol_of_crlf_suffix_round_trips() {
        for s in ["", "abc", "hello world", "X"] {
            let with_crlf = format!("{s}\r\n");
            let (stripped, eol) = strip_trailing_eol(&with_crlf, false, false);
            assert_eq!(stripped, s);
            assert_eq!(eol, Some(DetectedEol::CrLf));
        }
    }

    #[test]
    fn unused_extended_ascii_picks_smallest_available() {
        let used: String = (0x80u32..0xFF).map(|c| char::from_u32(c).unwrap()).collect();
        let c = unused_extended_ascii(&used).unwrap();
        assert_eq!(c as u32, 0xFF);
    }

    #[test]
    fn unused_extended_ascii_errors_when_exhausted() {
        let used: String = (0x80u32..=0xFF).map(|c| char::from_u32(c).unwrap()).collect();
        let err = unused_extended_ascii(&used).unwrap_err();
        assert_eq!(err, CalibrationError::NoUnusedExtendedAscii);
    }

    #[test]
    fn unused_extended_ascii_ignores_ascii_content() {
        let c = unused_extended_ascii("hello world 123").unwrap();
        assert_eq!(c as u32, 0x80);
    }

    #[test]
    fn control_picture_maps_control_range() {
        assert_eq!(to_control_picture('\0') as u32, 0x2400);
        assert_eq!(to_control_picture('\t') as u32, 0x2400 + 0x09);
        assert_eq!(to_control_picture('\u{1F}') as u32, 0x2400 + 0x1F);
    }

    #[test]
    fn control_picture_passes_through_non_control() {
        assert_eq!(to_control_picture('A'), 'A');
        assert_eq!(to_control_picture(' '), ' ');
    }
}
