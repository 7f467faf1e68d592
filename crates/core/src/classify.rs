//! Character classifier (component C1).
//!
//! Pure, stateless partitioning of code points into the categories the rest
//! of the engine reasons about: *invariant* (the 82-character ISO 646
//! printable subset legal in GS1 application identifiers and ASC MH 10.8.2
//! data identifiers), *control*, *ascii*, and *extended*. No failure modes.

use serde::{Deserialize, Serialize};

/// The classification flags for a single code point.
///
/// Categories are not mutually exclusive in the way their names might
/// suggest at a glance — e.g. every invariant character is also `ascii` —
/// but each flag answers an independent, well-defined predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifyFlags {
    /// One of the 82 ISO 646 printable characters GS1/ASC MH 10.8.2 data
    /// identifiers may legally contain.
    pub invariant: bool,
    /// A C0 control character (`c < 0x20`).
    pub control: bool,
    /// Any ASCII code point (`c < 0x80`).
    pub ascii: bool,
    /// Not ASCII — code point `>= 0x80`.
    pub extended: bool,
}

/// Classify a single code point.
#[must_use]
pub fn classify(c: char) -> ClassifyFlags {
    ClassifyFlags {
        invariant: is_invariant(c),
        control: is_control(c),
        ascii: is_ascii(c),
        extended: !is_ascii(c),
    }
}

/// True iff `c` is one of the 82 invariant characters:
/// `!`, `"`, `%`–`?`, `A`–`Z`, `_`, `a`–`z` (inclusive ranges).
#[must_use]
pub fn is_invariant(c: char) -> bool {
    matches!(c, '!' | '"' | '%'..='?' | 'A'..='Z' | '_' | 'a'..='z')
}

/// True iff `c` is a C0 control character (`c < 0x20`).
#[must_use]
pub fn is_control(c: char) -> bool {
    (c as u32) < 0x20
}

/// True iff `c` is an ASCII code point (`c < 0x80`).
#[must_use]
pub fn is_ascii(c: char) -> bool {
    (c as u32) < 0x80
}

/// The 82 invariant characters in their canonical baseline-probe order:
/// `!"%&'()*+,-./0123456789:;<=>?@ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz`.
pub const INVARIANT_ORDER: &str =
    "!\"%&'()*+,-./0123456789:;<=>?@ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_order_has_82_characters() {
        assert_eq!(INVARIANT_ORDER.chars().count(), 82);
    }

    #[test]
    fn invariant_order_characters_are_all_invariant() {
        for c in INVARIANT_ORDER.chars() {
            assert!(is_invariant(c), "{c:?} should be invariant");
        }
    }

    #[test]
    fn invariant_order_has_no_duplicates() {
        let mut seen = std::collections::HashSet::new();
        for c in INVARIANT_ORDER.chars() {
            assert!(seen.insert(c), "duplicate invariant character {c:?}");
        }
    }

    #[test]
    fn space_is_not_invariant() {
        assert!(!is_invariant(' '));
    }

    #[test]
    fn hash_is_not_invariant() {
        // '#' (0x23) falls in the gap between '"' (0x22) and '%' (0x25).
        assert!(!is_invariant('#'));
        assert!(!is_invariant('$'));
    }

    #[test]
    fn brackets_are_not_invariant() {
        for c in ['[', '\\', ']', '^', '`', '{', '|', '}', '~'] {
            assert!(!is_invariant(c), "{c:?} should not be invariant");
        }
    }

    #[test]
    fn digits_and_letters_are_invariant() {
        for c in '0'..='9' {
            assert!(is_invariant(c));
        }
        for c in 'A'..='Z' {
            assert!(is_invariant(c));
        }
        for c in 'a'..='z' {
            assert!(is_invariant(c));
        }
    }

    #[test]
    fn control_characters() {
        assert!(is_control('\0'));
        assert!(is_control('\t'));
        assert!(is_control('\u{1F}'));
        assert!(!is_control(' '));
        assert!(!is_control('A'));
    }

    #[test]
    fn ascii_and_extended_are_complementary() {
        for c in ['A', ' ', '\0', '\u{7F}'] {
            let flags = classify(c);
            assert!(flags.ascii);
            assert!(!flags.extended);
        }
        for c in ['\u{80}', '\u{E9}', '\u{FF}'] {
            let flags = classify(c);
            assert!(!flags.ascii);
            assert!(flags.extended);
        }
    }

    #[test]
    fn classify_invariant_character() {
        let flags = classify('A');
        assert!(flags.invariant);
        assert!(!flags.control);
        assert!(flags.ascii);
        assert!(!flags.extended);
    }

    #[test]
    fn classify_boundary_space() {
        let flags = classify(' ');
        assert!(!flags.invariant);
        assert!(!flags.control);
        assert!(flags.ascii);
    }
}
