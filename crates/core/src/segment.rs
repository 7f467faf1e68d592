//! Barcode segmenter (component C2).
//!
//! Splits a long probe payload into segments small-symbol scanners can
//! still carry, on a boundary character, so each segment is intrinsically
//! self-aligning: it never ends mid-cell (an invariant character flanked by
//! its boundary characters).

/// Split `payload` into segments of at most `max_chars` characters each.
///
/// `max_chars == 0` means "no segmentation" — the whole payload is
/// returned as a single segment.
///
/// The boundary character is taken to be `payload`'s first character (the
/// probe grammar always opens with the boundary, per §6). A candidate cut
/// that would leave a segment ending on the boundary is trimmed back
/// character by character until it does not; the next segment resumes
/// exactly where the trim stopped, so the deferred boundary characters
/// become the *next* segment's leading characters rather than being
/// dropped — concatenating every returned segment, in order, reproduces
/// `payload` exactly with no characters duplicated or dropped at the
/// joins.
///
/// When the remaining tail is shorter than `2 * max_chars`, the working
/// maximum for the next cut is rebalanced to `ceil(remaining / 2)` so the
/// last two segments come out roughly equal in length, rather than a full
/// `max_chars` segment followed by a short straggler.
#[must_use]
pub fn segment(payload: &str, max_chars: usize) -> Vec<String> {
    if max_chars == 0 {
        return vec![payload.to_string()];
    }
    let chars: Vec<char> = payload.chars().collect();
    let len = chars.len();
    if len == 0 {
        return vec![String::new()];
    }
    if len <= max_chars {
        return vec![payload.to_string()];
    }

    let boundary = chars[0];
    let mut segments = Vec::new();
    let mut start = 0usize;

    while start < len {
        let remaining = len - start;
        if remaining <= max_chars {
            segments.push(chars[start..len].iter().collect());
            break;
        }

        let working_max = if remaining < 2 * max_chars {
            remaining.div_ceil(2)
        } else {
            max_chars
        };

        let mut end = (start + working_max).min(len);
        while end > start + 1 && chars[end - 1] == boundary {
            end -= 1;
        }

        segments.push(chars[start..end].iter().collect::<String>());
        start = end;
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::INVARIANT_ORDER;

    fn baseline_probe() -> String {
        let mut s = String::new();
        for c in INVARIANT_ORDER.chars() {
            s.push(' ');
            s.push(c);
        }
        s.push(' ');
        s
    }

    #[test]
    fn zero_max_chars_yields_single_segment() {
        let payload = baseline_probe();
        let segs = segment(&payload, 0);
        assert_eq!(segs, vec![payload]);
    }

    #[test]
    fn payload_shorter_than_max_is_single_segment() {
        let payload = " A ";
        let segs = segment(payload, 100);
        assert_eq!(segs, vec![payload.to_string()]);
    }

    #[test]
    fn baseline_probe_has_165_characters() {
        assert_eq!(baseline_probe().chars().count(), 165);
    }

    #[test]
    fn segments_never_exceed_max_chars() {
        let payload = baseline_probe();
        for max in [8usize, 10, 16, 17, 40, 50, 164] {
            let segs = segment(&payload, max);
            for s in &segs {
                assert!(
                    s.chars().count() <= max,
                    "segment {s:?} exceeds max {max} for payload length {}",
                    payload.chars().count()
                );
            }
        }
    }

    #[test]
    fn concatenation_reconstructs_payload_exactly() {
        let payload = baseline_probe();
        for max in [8usize, 10, 16, 17, 40, 50, 80, 164, 1000] {
            let segs = segment(&payload, max);
            let reconstructed: String = segs.concat();
            assert_eq!(reconstructed, payload, "failed to reconstruct for max={max}");
        }
    }

    #[test]
    fn small_symbol_scanner_m40_yields_at_least_five_segments() {
        let payload = baseline_probe();
        let segs = segment(&payload, 40);
        assert!(
            segs.len() >= 5,
            "expected >= 5 segments for M=40, got {}",
            segs.len()
        );
        for s in &segs[..segs.len() - 1] {
            assert!(
                !s.ends_with(' '),
                "non-final segment {s:?} should not end on the boundary character"
            );
        }
    }

    #[test]
    fn rebalances_last_two_segments_to_roughly_equal_length() {
        let payload = baseline_probe();
        let segs = segment(&payload, 40);
        let last_two = &segs[segs.len() - 2..];
        let lens: Vec<usize> = last_two.iter().map(|s| s.chars().count()).collect();
        let diff = lens[0].abs_diff(lens[1]);
        assert!(
            diff <= 2,
            "last two segments should be roughly equal length, got {lens:?}"
        );
    }

    #[test]
    fn single_segment_equivalent_to_unsegmented_baseline() {
        let payload = baseline_probe();
        let unsegmented = segment(&payload, 0);
        let large_m = segment(&payload, 1000);
        assert_eq!(unsegmented, large_m);
    }

    #[test]
    fn empty_payload_yields_single_empty_segment() {
        let segs = segment("", 10);
        assert_eq!(segs, vec![String::new()]);
    }
}
