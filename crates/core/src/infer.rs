//! Mapping inferer (component C5).
//!
//! Turns accumulated probe evidence into the three computed maps and any
//! ambiguities, per §4.5's baseline pass, dead-key pass, and ambiguity
//! resolution.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use scanner_calib_diagnostics::CalibrationError;

use crate::classify::{is_invariant, INVARIANT_ORDER};
use crate::maps::{Ambiguity, CharacterMap, LigatureMap, Mapping, DEAD_KEY_SENTINEL};

/// Result of walking a baseline report against the 82 expected invariants.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BaselinePass {
    /// `reported_sequence -> expected` entries observed this pass, prior to
    /// ambiguity resolution (single-character and ligature entries alike;
    /// dead-key sentinel entries are kept separate in `dead_key_queue`).
    pub raw_entries: Vec<(String, char)>,
    /// Evidence in presentation order, one entry per expected invariant
    /// cell that produced any reported content.
    pub evidence: Vec<Mapping>,
    /// Expected invariants whose cell reported the dead-key sentinel and
    /// so need a dedicated dead-key probe.
    pub dead_key_queue: VecDeque<char>,
    /// Non-fatal errors (e.g. `PartialDataReported` for short cells).
    pub errors: Vec<CalibrationError>,
}

/// Walk `reported` (the accumulated, prefix/suffix/EOL-stripped baseline
/// report) against the 82 expected invariants, splitting on `boundary_char`
/// to recover one reported "cell" per expected position.
#[must_use]
pub fn infer_baseline(reported: &str, boundary_char: char) -> BaselinePass {
    let mut pass = BaselinePass::default();
    let raw_cells: Vec<&str> = reported.split(boundary_char).collect();
    // The baseline starts and ends with the boundary character, so a clean
    // report splits into a leading "", 82 content cells, and a trailing "".
    let inner: &[&str] = if raw_cells.len() >= 2 {
        &raw_cells[1..raw_cells.len() - 1]
    } else {
        &raw_cells[..]
    };

    for (i, expected) in INVARIANT_ORDER.chars().enumerate() {
        let cell = inner.get(i).copied().unwrap_or("");
        let cell_chars: Vec<char> = cell.chars().collect();
        match cell_chars.len() {
            0 => {
                pass.errors.push(CalibrationError::PartialDataReported {
                    segment_index: i,
                    expected_cells: 1,
                    reported_cells: 0,
                });
            }
            1 if cell_chars[0] == DEAD_KEY_SENTINEL => {
                pass.dead_key_queue.push_back(expected);
                pass.evidence.push(Mapping::DeadKey {
                    reported_sequence: cell.to_string(),
                    expected,
                });
            }
            1 => {
                pass.raw_entries.push((cell.to_string(), expected));
                pass.evidence.push(Mapping::Character {
                    reported: cell_chars[0],
                    expected,
                });
            }
            _ => {
                // Two or more reported characters with no dead-key
                // sentinel: a ligature.
                pass.raw_entries.push((cell.to_string(), expected));
                pass.evidence.push(Mapping::Ligature {
                    reported_sequence: cell.to_string(),
                    expected,
                });
            }
        }
    }

    pass
}

/// Result of walking a dedicated dead-key probe's report.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DeadKeyPass {
    /// `reported_sequence -> expected` entries for the dead-key map (the
    /// recovery direction: what the host produced for `dead_key + c`, maps
    /// back to `c`).
    pub entries: Vec<(String, char)>,
    /// True if the probe's report began with the literal NUL sentinel
    /// (the "true dead key" case); false if the host completed `dead_key`
    /// with a default glyph instead.
    pub sentinel_observed: bool,
    /// Non-fatal errors for any cells the report was too short to cover.
    pub errors: Vec<CalibrationError>,
}

/// Walk the report for a dead-key probe targeting `dead_key`, whose
/// payload was `dead_key` followed by the 82 invariants with no boundary
/// delimiters (§6).
#[must_use]
pub fn infer_dead_key(dead_key: char, reported: &str, boundary_char: char) -> DeadKeyPass {
    let mut pass = DeadKeyPass::default();
    let chars: Vec<char> = reported.chars().collect();

    let (sentinel, sentinel_observed) = if chars.first() == Some(&DEAD_KEY_SENTINEL) {
        (DEAD_KEY_SENTINEL.to_string(), true)
    } else if chars.len() >= 2 && chars[1] == boundary_char {
        (chars[0..2].iter().collect::<String>(), false)
    } else if !chars.is_empty() {
        (chars[0].to_string(), false)
    } else {
        (String::new(), false)
    };

    let sentinel_len = sentinel.chars().count();
    let body = &chars[sentinel_len.min(chars.len())..];

    for (i, expected) in INVARIANT_ORDER.chars().enumerate() {
        match body.get(i) {
            Some(&r) => {
                let mut sequence = sentinel.clone();
                sequence.push(r);
                pass.entries.push((sequence, expected));
            }
            None => {
                pass.errors.push(CalibrationError::PartialDataReported {
                    segment_index: i,
                    expected_cells: 1,
                    reported_cells: 0,
                });
            }
        }
    }

    pass.sentinel_observed = sentinel_observed;
    pass
}

/// Resolve a pool of `reported_sequence -> expected` entries into a
/// conflict-free map plus any unresolved [`Ambiguity`] records, per §4.5.
///
/// Two entries sharing an identical `reported_sequence` are always
/// ambiguous. An entry whose sequence is a proper prefix of more than one
/// longer sequence in the pool is also ambiguous (the split point cannot
/// be resolved); a proper prefix of exactly one longer sequence is kept,
/// since consumers resolve it by longest-prefix match.
#[must_use]
pub fn resolve_ambiguities(entries: Vec<(String, char)>) -> (BTreeMap<String, char>, Vec<Ambiguity>) {
    let mut by_key: BTreeMap<String, BTreeSet<char>> = BTreeMap::new();
    for (k, v) in entries {
        by_key.entry(k).or_default().insert(v);
    }

    let keys: Vec<String> = by_key.keys().cloned().collect();
    let mut resolved = BTreeMap::new();
    let mut ambiguities = Vec::new();

    for k in &keys {
        let candidates = &by_key[k];
        if candidates.len() > 1 {
            record_ambiguity(&mut ambiguities, k, candidates.iter().copied());
            continue;
        }

        let conflicting_longer: Vec<&String> = keys
            .iter()
            .filter(|other| *other != k && other.starts_with(k.as_str()))
            .collect();

        if conflicting_longer.len() > 1 {
            let mut all = vec![*candidates.iter().next().unwrap()];
            for other in conflicting_longer {
                all.extend(by_key[other].iter().copied());
            }
            record_ambiguity(&mut ambiguities, k, all.into_iter());
            continue;
        }

        resolved.insert(k.clone(), *candidates.iter().next().unwrap());
    }

    (resolved, ambiguities)
}

/// Disambiguate unresolved [`Ambiguity`] records against a caller-supplied
/// list of recognised data elements (§6): when exactly one of an
/// ambiguity's candidates begins the identifier string of a recognised
/// element, that candidate is the only one that could start a legal data
/// identifier, so the ambiguity resolves to it; an ambiguity whose
/// candidates are not invariant characters at all (a dead-key ambiguity
/// decoding to punctuation no identifier could start with, say) is left
/// untouched, since the identifier list has nothing to say about it.
///
/// Returns the newly resolved `reported_sequence -> expected` entries
/// (to be merged into the caller's resolved map) plus the ambiguities that
/// remain irresolvable even with this list applied.
#[must_use]
pub fn disambiguate_via_recognised_elements(
    ambiguities: Vec<Ambiguity>,
    elements: &[scanner_calib_config::RecognisedDataElement],
) -> (Vec<(String, char)>, Vec<Ambiguity>) {
    if elements.is_empty() {
        return (Vec::new(), ambiguities);
    }

    let leading_chars: BTreeSet<char> = elements
        .iter()
        .filter_map(|e| e.identifier.chars().next())
        .collect();

    let mut resolved = Vec::new();
    let mut remaining = Vec::new();

    for ambiguity in ambiguities {
        if !ambiguity.invariant_only {
            remaining.push(ambiguity);
            continue;
        }
        let matching: Vec<char> = ambiguity
            .expected_candidates
            .iter()
            .copied()
            .filter(|c| leading_chars.contains(c))
            .collect();
        if matching.len() == 1 {
            resolved.push((ambiguity.reported.clone(), matching[0]));
        } else {
            remaining.push(ambiguity);
        }
    }

    (resolved, remaining)
}

fn record_ambiguity(out: &mut Vec<Ambiguity>, reported: &str, candidates: impl Iterator<Item = char>) {
    let mut expected_candidates: Vec<char> = candidates.collect();
    expected_candidates.sort_unstable();
    expected_candidates.dedup();
    let invariant_only = expected_candidates.iter().copied().all(is_invariant);
    out.push(Ambiguity {
        reported: reported.to_string(),
        expected_candidates,
        invariant_only,
        dead_key: reported.starts_with(DEAD_KEY_SENTINEL),
    });
}

/// Split a resolved `reported_sequence -> expected` map into a
/// single-character [`CharacterMap`] and a multi-character [`LigatureMap`].
///
/// # Errors
/// Propagates a [`crate::maps::PrefixConflict`] wrapped as a `LigatureMap`
/// insertion failure if two ligature sequences are not prefix-free — this
/// should not occur for baseline evidence emitted by [`infer_baseline`],
/// since every entry there is keyed by a distinct expected invariant
/// position and [`resolve_ambiguities`] has already removed exact
/// duplicates, but is reported rather than silently dropped.
pub fn split_character_and_ligature_maps(
    resolved: BTreeMap<String, char>,
) -> Result<(CharacterMap, LigatureMap), crate::maps::PrefixConflict> {
    let mut character_map = CharacterMap::new();
    let mut ligature_map = LigatureMap::default();

    for (sequence, expected) in resolved {
        let mut chars = sequence.chars();
        let first = chars.next();
        if chars.next().is_none() {
            if let Some(r) = first {
                character_map.insert(r, expected);
            }
        } else {
            ligature_map.insert(sequence, expected)?;
        }
    }

    Ok((character_map, ligature_map))
}

/// Suspect case inversion (Caps Lock family) per §4.5's case policy: true
/// when every entry with `toupper(r) == toupper(e)` and a strict majority
/// of entries have `r != e`. Does not rewrite the map; the advice
/// subsystem decides what to do with this signal.
#[must_use]
pub fn case_inversion_suspected(character_map: &CharacterMap) -> bool {
    if character_map.is_empty() {
        return false;
    }
    let mut case_consistent = 0usize;
    let mut flipped = 0usize;
    for (&r, &e) in character_map {
        if r.to_ascii_uppercase() != e.to_ascii_uppercase() {
            return false;
        }
        case_consistent += 1;
        if r != e {
            flipped += 1;
        }
    }
    case_consistent > 0 && flipped * 2 > case_consistent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::baseline_payload;

    #[test]
    fn identity_report_maps_every_invariant_to_itself() {
        let reported = baseline_payload(' ');
        let pass = infer_baseline(&reported, ' ');
        assert!(pass.errors.is_empty());
        assert!(pass.dead_key_queue.is_empty());
        assert_eq!(pass.raw_entries.len(), 82);
        for (r, e) in &pass.raw_entries {
            assert_eq!(r.chars().next().unwrap(), *e);
        }
    }

    #[test]
    fn case_flipped_report_is_detected_by_case_policy() {
        let reported: String = baseline_payload(' ')
            .chars()
            .map(|c| if c.is_ascii_alphabetic() { flip_case(c) } else { c })
            .collect();
        let pass = infer_baseline(&reported, ' ');
        let (resolved, ambiguities) = resolve_ambiguities(pass.raw_entries);
        assert!(ambiguities.is_empty());
        let (character_map, _) = split_character_and_ligature_maps(resolved).unwrap();
        assert!(case_inversion_suspected(&character_map));
    }

    fn flip_case(c: char) -> char {
        if c.is_ascii_uppercase() {
            c.to_ascii_lowercase()
        } else if c.is_ascii_lowercase() {
            c.to_ascii_uppercase()
        } else {
            c
        }
    }

    #[test]
    fn missing_cell_at_end_records_partial_data() {
        let mut reported = baseline_payload(' ');
        // Drop the final invariant character and its closing boundary,
        // leaving the report ending on the boundary that opens the last
        // (now empty) cell.
        let truncate_at = reported.len() - 2;
        reported.truncate(truncate_at);
        let pass = infer_baseline(&reported, ' ');
        assert!(!pass.errors.is_empty());
        assert_eq!(pass.errors.len(), 1);
    }

    #[test]
    fn dead_key_cell_is_queued_not_mapped() {
        let mut reported = baseline_payload(' ');
        let apostrophe_pos = reported.find('\'').unwrap();
        reported.replace_range(apostrophe_pos..apostrophe_pos + 1, "\0");
        let pass = infer_baseline(&reported, ' ');
        assert_eq!(pass.dead_key_queue.len(), 1);
        assert_eq!(pass.dead_key_queue[0], '\'');
    }

    #[test]
    fn ambiguous_reported_sequence_surfaces_both_candidates() {
        let entries = vec![("é".to_string(), 'x'), ("é".to_string(), 'y')];
        let (resolved, ambiguities) = resolve_ambiguities(entries);
        assert!(resolved.is_empty());
        assert_eq!(ambiguities.len(), 1);
        assert_eq!(ambiguities[0].reported, "é");
        assert_eq!(ambiguities[0].expected_candidates, vec!['x', 'y']);
        assert!(ambiguities[0].invariant_only);
    }

    #[test]
    fn unique_prefix_relationship_is_not_ambiguous() {
        let entries = vec![("a".to_string(), 'x'), ("ab".to_string(), 'y')];
        let (resolved, ambiguities) = resolve_ambiguities(entries);
        assert!(ambiguities.is_empty());
        assert_eq!(resolved.get("a"), Some(&'x'));
        assert_eq!(resolved.get("ab"), Some(&'y'));
    }

    #[test]
    fn prefix_shared_by_two_longer_sequences_is_ambiguous() {
        let entries = vec![
            ("a".to_string(), 'x'),
            ("ab".to_string(), 'y'),
            ("ac".to_string(), 'z'),
        ];
        let (resolved, ambiguities) = resolve_ambiguities(entries);
        assert!(resolved.contains_key("ab") || resolved.contains_key("ac"));
        assert!(ambiguities.iter().any(|a| a.reported == "a"));
    }

    #[test]
    fn dead_key_pass_true_dead_key_sentinel() {
        let mut report = String::from('\0');
        report.push_str(INVARIANT_ORDER);
        let pass = infer_dead_key('\'', &report, ' ');
        assert!(pass.sentinel_observed);
        assert_eq!(pass.entries.len(), 82);
        assert!(pass.entries.iter().all(|(seq, _)| seq.starts_with('\0')));
    }

    #[test]
    fn dead_key_pass_host_completed_with_default_glyph() {
        let mut report = String::from("' ");
        report.push_str(INVARIANT_ORDER);
        let pass = infer_dead_key('\'', &report, ' ');
        assert!(!pass.sentinel_observed);
        assert_eq!(pass.entries.len(), 82);
        assert!(pass.entries.iter().all(|(seq, _)| seq.starts_with("' ")));
    }

    #[test]
    fn case_inversion_not_suspected_for_identity_map() {
        let mut m = CharacterMap::new();
        m.insert('a', 'a');
        m.insert('B', 'B');
        assert!(!case_inversion_suspected(&m));
    }

    #[test]
    fn case_inversion_not_suspected_when_minority_flipped() {
        let mut m = CharacterMap::new();
        m.insert('a', 'a');
        m.insert('b', 'b');
        m.insert('C', 'c');
        assert!(!case_inversion_suspected(&m));
    }

    fn gs1_element(identifier: &str) -> scanner_calib_config::RecognisedDataElement {
        scanner_calib_config::RecognisedDataElement {
            syntax: scanner_calib_config::DataElementSyntax::Gs1,
            identifier: identifier.to_string(),
        }
    }

    #[test]
    fn recognised_elements_resolve_ambiguity_with_one_matching_leading_char() {
        let ambiguities = vec![Ambiguity {
            reported: "é".into(),
            expected_candidates: vec!['0', 'x'],
            invariant_only: true,
            dead_key: false,
        }];
        let elements = vec![gs1_element("0112345678901231")];
        let (resolved, remaining) = disambiguate_via_recognised_elements(ambiguities, &elements);
        assert!(remaining.is_empty());
        assert_eq!(resolved, vec![("é".to_string(), '0')]);
    }

    #[test]
    fn recognised_elements_leave_ambiguity_when_both_candidates_match() {
        let ambiguities = vec![Ambiguity {
            reported: "é".into(),
            expected_candidates: vec!['0', '9'],
            invariant_only: true,
            dead_key: false,
        }];
        let elements = vec![gs1_element("01"), gs1_element("9N")];
        let (resolved, remaining) = disambiguate_via_recognised_elements(ambiguities, &elements);
        assert!(resolved.is_empty());
        assert_eq!(remaining.len(), 1);
    }

    #[test]
    fn empty_recognised_elements_leaves_all_ambiguities_untouched() {
        let ambiguities = vec![Ambiguity {
            reported: "é".into(),
            expected_candidates: vec!['x', 'y'],
            invariant_only: true,
            dead_key: false,
        }];
        let (resolved, remaining) = disambiguate_via_recognised_elements(ambiguities.clone(), &[]);
        assert!(resolved.is_empty());
        assert_eq!(remaining, ambiguities);
    }

    #[test]
    fn non_invariant_ambiguity_is_left_for_recognised_elements() {
        let ambiguities = vec![Ambiguity {
            reported: "\0x".into(),
            expected_candidates: vec!['à', 'è'],
            invariant_only: false,
            dead_key: true,
        }];
        let elements = vec![gs1_element("01")];
        let (resolved, remaining) = disambiguate_via_recognised_elements(ambiguities, &elements);
        assert!(resolved.is_empty());
        assert_eq!(remaining.len(), 1);
    }
}
