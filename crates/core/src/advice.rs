//! Advice analyzer (component C6).
//!
//! Evaluates a fixed set of rules over the final maps and ambiguities,
//! emitting one [`AdviceItem`] per rule that fires, then lets
//! [`apply_subsumption_and_sort`] collapse and order the result.

use std::collections::HashSet;

use scanner_calib_diagnostics::{apply_subsumption_and_sort, codes, AdviceItem, AdviceType, Severity};

use crate::classify::INVARIANT_ORDER;
use crate::infer::case_inversion_suspected;
use crate::maps::{Ambiguity, CharacterMap, DeadKeyMap, LigatureMap};
use crate::token::{PerformanceBucket, Timing};

const AIM_PREFIX_CHARS: &[char] = &[
    ']', 'c', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];

fn item(advice_type: u16, condition: impl Into<String>, suggestion: impl Into<String>) -> AdviceItem {
    AdviceItem::new(AdviceType(advice_type), condition, suggestion)
}

fn all_invariants_covered(
    character_map: &CharacterMap,
    dead_key_map: &DeadKeyMap,
    ligature_map: &LigatureMap,
) -> bool {
    let covered: HashSet<char> = character_map
        .values()
        .copied()
        .chain(dead_key_map.iter().map(|(_, e)| e))
        .chain(ligature_map.iter().map(|(_, e)| e))
        .collect();
    INVARIANT_ORDER.chars().all(|c| covered.contains(&c))
}

fn is_pure_identity(character_map: &CharacterMap) -> bool {
    INVARIANT_ORDER
        .chars()
        .all(|c| character_map.get(&c) == Some(&c))
}

/// True if every reported character that decodes to `c` is `c` itself (or
/// nothing decodes to `c` yet, which is treated as inconclusive rather than
/// corrupted).
fn char_reads_reliably(character_map: &CharacterMap, c: char) -> bool {
    let producers: Vec<char> = character_map
        .iter()
        .filter(|(_, &e)| e == c)
        .map(|(&r, _)| r)
        .collect();
    producers.is_empty() || producers == [c]
}

fn aim_prefix_may_be_corrupted(character_map: &CharacterMap) -> bool {
    AIM_PREFIX_CHARS
        .iter()
        .any(|&c| !char_reads_reliably(character_map, c))
}

fn any_invariant_scrambled(character_map: &CharacterMap) -> bool {
    INVARIANT_ORDER
        .chars()
        .any(|c| !char_reads_reliably(character_map, c))
}

/// Derive the ranked advice list for a terminal token's evidence.
#[must_use]
pub fn analyze(
    character_map: &CharacterMap,
    dead_key_map: &DeadKeyMap,
    ligature_map: &LigatureMap,
    ambiguities: &[Ambiguity],
    timing: Option<&Timing>,
) -> Vec<AdviceItem> {
    let mut items = Vec::new();

    if !ambiguities.is_empty() {
        items.push(item(
            codes::CANNOT_READ_BARCODES_RELIABLY,
            format!("{} reported sequence(s) are irresolvably ambiguous", ambiguities.len()),
            "re-run calibration with a recognised data element list to disambiguate, or choose a matching scanner layout",
        ));
    }

    let case_inverted = case_inversion_suspected(character_map);
    if case_inverted {
        items.push(item(
            codes::CASE_IS_SWITCHED,
            "reported letters are consistently the opposite case of what was expected",
            "check whether Caps Lock or a shift-state scanner setting is active on the host",
        ));
    }

    if !case_inverted && any_invariant_scrambled(character_map) {
        items.push(item(
            codes::LAYOUTS_DO_NOT_MATCH,
            "one or more invariant characters are reported differently than encoded",
            "configure the scanner to emit the host's keyboard layout, or install a matching OS layout",
        ));

        if aim_prefix_may_be_corrupted(character_map) {
            items.push(item(
                codes::MAY_NOT_READ_AIM,
                "one or more AIM symbology identifier characters (']', 'c', digits) do not read back reliably",
                "verify AIM identifiers survive calibration before relying on symbology detection",
            ));
        }

        if any_invariant_scrambled(character_map) {
            items.push(item(
                codes::MAY_NOT_READ_ANSI_MH_10_8_2,
                "one or more ASC MH 10.8.2 data identifier characters do not read back reliably",
                "verify data identifiers survive calibration before parsing decoded payloads",
            ));
        }
    }

    if let Some(bucket) = timing.and_then(Timing::bucket) {
        if matches!(bucket, PerformanceBucket::Medium | PerformanceBucket::Low) {
            items.push(item(
                codes::SLOW_SCANNER_PERFORMANCE,
                "average inter-character timing indicates a slow scanner keyboard emulation",
                "increase the scanner's keyboard emulation speed setting if available",
            ));
        }
    }

    let has_medium_or_higher = items.iter().any(|i| i.severity >= Severity::Medium);
    if !has_medium_or_higher {
        if is_pure_identity(character_map) && dead_key_map.is_empty() && ligature_map.is_empty() {
            items.push(item(
                codes::READS_INVARIANT_CHARACTERS_RELIABLY,
                "all invariant characters round-trip without modification",
                "no action needed",
            ));
        } else if all_invariants_covered(character_map, dead_key_map, ligature_map) {
            items.push(item(
                codes::READS_INVARIANT_CHARACTERS_RELIABLY_VIA_DEAD_KEYS,
                "all invariant characters round-trip once dead-key sequences are recovered",
                "apply the computed dead-key map before relying on decoded payloads",
            ));
        }
    }

    apply_subsumption_and_sort(items)
}
