//! Session driver (component C4).
//!
//! A state machine that produces the next probe to scan, consumes the
//! reported string for the previous probe, and terminates with a final
//! map or failure (§4.4). The driver is purely reactive: it has no
//! suspension points and no internal threads (§5); the caller owns the
//! outer scan loop.

use std::collections::VecDeque;

use scanner_calib_config::CalibrationConfig;
use scanner_calib_diagnostics::{AdviceItem, CalibrationError};
use serde::{Deserialize, Serialize};

use crate::advice::analyze as analyze_advice;
use crate::infer::{
    disambiguate_via_recognised_elements, infer_baseline, infer_dead_key, resolve_ambiguities,
    split_character_and_ligature_maps,
};
use crate::maps::{Ambiguity, DeadKeyMap};
use crate::segment::segment;
use crate::token::{dead_key_payload, genesis, terminal, with_report, Timing, Token};
use crate::util::strip_trailing_eol;

/// The session driver's current state (§4.4).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// `S1`: awaiting report for baseline segment `segment_index` of
    /// `segment_count`.
    AwaitingBaseline {
        segment_index: usize,
        segment_count: usize,
    },
    /// `S3`: awaiting report for `dead_key`'s probe, segment
    /// `segment_index` of `segment_count`.
    AwaitingDeadKey {
        dead_key: char,
        segment_index: usize,
        segment_count: usize,
    },
    /// `S5`: the session has concluded, successfully or not.
    Terminal { success: bool },
}

/// Drives a single calibration session from genesis to a terminal token.
#[derive(Debug, Clone)]
pub struct Session {
    config: CalibrationConfig,
    token: Token,
    state: SessionState,
    baseline_entries: Vec<(String, char)>,
    dead_key_entries: Vec<(String, char)>,
    /// Extra trailing text observed beyond each baseline segment's expected
    /// length, one entry per segment that had any (§9 Open Question 1).
    observed_baseline_suffixes: Vec<String>,
}

impl Session {
    /// Start a new session (`S0 -> S1(0, n)`): segments the baseline probe
    /// per `config.max_segment_chars` and emits its first segment.
    #[must_use]
    pub fn new(config: CalibrationConfig) -> Self {
        let token = genesis(&config);
        let segment_count = token.small_count;
        Session {
            config,
            token,
            state: SessionState::AwaitingBaseline {
                segment_index: 0,
                segment_count,
            },
            baseline_entries: Vec::new(),
            dead_key_entries: Vec::new(),
            observed_baseline_suffixes: Vec::new(),
        }
    }

    /// The probe payload the caller should scan/emit next. `None` once the
    /// session is terminal.
    #[must_use]
    pub fn current_probe(&self) -> Option<&str> {
        if matches!(self.state, SessionState::Terminal { .. }) {
            None
        } else {
            Some(&self.token.probe_payload)
        }
    }

    /// The most recent token snapshot.
    #[must_use]
    pub fn token(&self) -> &Token {
        &self.token
    }

    /// The driver's current state.
    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// True once the session has reached `S5`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self.state, SessionState::Terminal { .. })
    }

    /// Content hash of the token currently awaiting a report, for use with
    /// [`Session::accept_report_for_token`].
    #[must_use]
    pub fn current_token_hash(&self) -> u64 {
        self.token.fnv1a_hash()
    }

    /// Feed a report for the currently awaited probe segment.
    ///
    /// `cancel` models the caller's cancellation flag (§4.4): when true,
    /// the session moves straight to `S5(failure)` with
    /// [`CalibrationError::CancelledByUser`] recorded, regardless of the
    /// current state.
    ///
    /// # Errors
    /// Returns [`CalibrationError::OutOfSequenceReport`] if the session is
    /// already terminal — feeding a report for a superseded token is an
    /// error (§5 "Ordering guarantees"). All other error kinds are
    /// recorded in the resulting token's `errors` list rather than
    /// returned, per §7's propagation rule.
    pub fn accept_report(
        &mut self,
        reported: &str,
        timing: Timing,
        cancel: bool,
    ) -> Result<&Token, CalibrationError> {
        if self.is_terminal() {
            return Err(CalibrationError::OutOfSequenceReport {
                expected_sequence: self.token.sequence,
                reported_sequence: self.token.sequence,
            });
        }

        self.accept_report_inner(reported, timing, cancel)
    }

    /// Like [`Session::accept_report`], but keys the call by the content
    /// hash of the token the caller was given when it was handed the probe
    /// currently awaited (§4.3 "Hash uses FNV-1a over the primary
    /// fields"). A caller that holds on to a stale token — e.g. a report
    /// that raced against a cancellation, or a resubmission against a
    /// session that has since moved on — is rejected with
    /// [`CalibrationError::OutOfSequenceReport`] even though the internal
    /// sequence counter alone could not distinguish the two, since the hash
    /// is computed over the full token content rather than a bare counter.
    ///
    /// # Errors
    /// Returns [`CalibrationError::OutOfSequenceReport`] if
    /// `expected_token_hash` does not match [`Token::fnv1a_hash`] of the
    /// token currently awaiting a report, or if the session is already
    /// terminal. All other error kinds propagate exactly as in
    /// [`Session::accept_report`].
    pub fn accept_report_for_token(
        &mut self,
        expected_token_hash: u64,
        reported: &str,
        timing: Timing,
        cancel: bool,
    ) -> Result<&Token, CalibrationError> {
        if self.is_terminal() || self.token.fnv1a_hash() != expected_token_hash {
            return Err(CalibrationError::OutOfSequenceReport {
                expected_sequence: self.token.sequence,
                reported_sequence: self.token.sequence,
            });
        }
        self.accept_report_inner(reported, timing, cancel)
    }

    fn accept_report_inner(
        &mut self,
        reported: &str,
        timing: Timing,
        cancel: bool,
    ) -> Result<&Token, CalibrationError> {
        if cancel {
            self.token.errors.push(CalibrationError::CancelledByUser);
            self.token = terminal(
                &self.token,
                crate::maps::CharacterMap::new(),
                DeadKeyMap::default(),
                crate::maps::LigatureMap::default(),
                Vec::new(),
                Vec::new(),
            );
            self.state = SessionState::Terminal { success: false };
            return Ok(&self.token);
        }

        match self.state.clone() {
            SessionState::AwaitingBaseline {
                segment_index,
                segment_count,
            } => self.step_baseline(reported, timing, segment_index, segment_count),
            SessionState::AwaitingDeadKey {
                dead_key,
                segment_index,
                segment_count,
            } => self.step_dead_key(dead_key, reported, timing, segment_index, segment_count),
            SessionState::Terminal { .. } => unreachable!("checked above"),
        }

        Ok(&self.token)
    }

    /// Strip a reapplied prefix (first segment only) and any extra trailing
    /// text beyond `expected_len`, returning the stripped content plus the
    /// extra tail observed for this segment, if any.
    fn strip_prefix_suffix(
        &mut self,
        stripped: &str,
        segment_index: usize,
        expected_len: usize,
    ) -> (String, Option<String>) {
        let mut content = stripped.to_string();

        if segment_index == 0 {
            let boundary = self.config.boundary_char;
            if let Some(pos) = content.find(boundary) {
                let prefix: String = content[..pos].to_string();
                if !prefix.is_empty() {
                    self.token.detected_prefix = prefix.clone();
                }
                content = content[pos..].to_string();
            }
        } else if !self.token.detected_prefix.is_empty() && content.starts_with(&self.token.detected_prefix) {
            content = content[self.token.detected_prefix.len()..].to_string();
        }

        let content_len = content.chars().count();
        let tail = if content_len > expected_len {
            let suffix: String = content.chars().skip(expected_len).collect();
            content = content.chars().take(expected_len).collect();
            Some(suffix)
        } else {
            None
        };

        (content, tail)
    }

    /// Reconcile the per-segment trailing-data observations collected across
    /// a completed baseline round (§9 Open Question 1): if every segment
    /// that observed extra trailing data observed the *same* text, it is the
    /// scanner/host's consistently-applied suffix; otherwise it is recorded
    /// as an `UnexpectedTrailingData` input error rather than guessed at.
    fn reconcile_baseline_suffix(&mut self) {
        if self.observed_baseline_suffixes.is_empty() {
            return;
        }
        let first = &self.observed_baseline_suffixes[0];
        if self.observed_baseline_suffixes.iter().all(|s| s == first) {
            self.token.detected_suffix = first.clone();
        } else {
            self.token.errors.push(CalibrationError::InputError {
                code: "UnexpectedTrailingData".to_string(),
                is_fatal: false,
            });
        }
    }

    fn step_baseline(&mut self, reported: &str, timing: Timing, segment_index: usize, segment_count: usize) {
        let (stripped, eol) = strip_trailing_eol(reported, true, self.config.strict_eol);
        if eol.is_some() {
            self.token.detected_eol = eol;
        }
        let expected_len = self.token.probe_payload.chars().count();
        let (content, tail) = self.strip_prefix_suffix(&stripped, segment_index, expected_len);
        if let Some(tail) = tail {
            self.observed_baseline_suffixes.push(tail);
        }

        self.token = with_report(&self.token, &content, timing);

        if segment_index + 1 < segment_count {
            let next = self.token.remaining_segments.remove(0);
            self.token.probe_payload = next;
            self.state = SessionState::AwaitingBaseline {
                segment_index: segment_index + 1,
                segment_count,
            };
            return;
        }

        self.reconcile_baseline_suffix();

        let pass = infer_baseline(&self.token.reported_characters, self.config.boundary_char);
        self.baseline_entries.extend(pass.raw_entries);
        self.token.errors.extend(pass.errors);
        self.token.probes_remaining = pass.dead_key_queue;
        self.token.evidence.extend(pass.evidence);

        self.advance_to_next_dead_key_or_finish();
    }

    fn step_dead_key(
        &mut self,
        dead_key: char,
        reported: &str,
        timing: Timing,
        segment_index: usize,
        segment_count: usize,
    ) {
        let (stripped, eol) = strip_trailing_eol(reported, false, self.config.strict_eol);
        if eol.is_some() {
            self.token.detected_eol = eol;
        }

        self.token = with_report(&self.token, &stripped, timing);

        if segment_index + 1 < segment_count {
            let next = self.token.remaining_segments.remove(0);
            self.token.probe_payload = next;
            self.state = SessionState::AwaitingDeadKey {
                dead_key,
                segment_index: segment_index + 1,
                segment_count,
            };
            return;
        }

        let pass = infer_dead_key(dead_key, &self.token.reported_characters, self.config.boundary_char);
        self.dead_key_entries.extend(pass.entries);
        self.token.errors.extend(pass.errors);

        self.advance_to_next_dead_key_or_finish();
    }

    fn advance_to_next_dead_key_or_finish(&mut self) {
        if let Some(next_dead_key) = self.token.probes_remaining.pop_front() {
            let payload = dead_key_payload(next_dead_key);
            let mut segments = segment(&payload, self.config.max_segment_chars as usize);
            let segment_count = segments.len();
            let first = segments.remove(0);

            self.token.probe_payload = first;
            self.token.remaining_segments = segments;
            self.token.current_dead_key = Some(next_dead_key);
            self.token.reported_characters.clear();

            self.state = SessionState::AwaitingDeadKey {
                dead_key: next_dead_key,
                segment_index: 0,
                segment_count,
            };
            return;
        }

        self.finish();
    }

    fn finish(&mut self) {
        let (mut resolved_chars, ambiguities) = resolve_ambiguities(self.baseline_entries.clone());
        let (resolved_dead_keys, dead_key_ambiguities) = resolve_ambiguities(self.dead_key_entries.clone());

        let mut all_ambiguities = ambiguities;
        all_ambiguities.extend(dead_key_ambiguities);

        let (newly_resolved, mut remaining_ambiguities) = disambiguate_via_recognised_elements(
            all_ambiguities,
            &self.config.recognised_data_elements,
        );
        let mut resolved_dead_keys = resolved_dead_keys;
        for (sequence, expected) in newly_resolved {
            if sequence.starts_with(crate::maps::DEAD_KEY_SENTINEL) {
                resolved_dead_keys.insert(sequence, expected);
            } else {
                resolved_chars.insert(sequence, expected);
            }
        }
        remaining_ambiguities.sort_by(|a, b| a.reported.cmp(&b.reported));
        let ambiguities = remaining_ambiguities;

        let (character_map, ligature_map) =
            split_character_and_ligature_maps(resolved_chars).unwrap_or_else(|_| {
                (crate::maps::CharacterMap::new(), crate::maps::LigatureMap::default())
            });

        let mut dead_key_map = DeadKeyMap::default();
        for (sequence, expected) in resolved_dead_keys {
            let _ = dead_key_map.insert(sequence, expected);
        }

        let timing = self.token.timing.clone();
        let advice: Vec<AdviceItem> = analyze_advice(
            &character_map,
            &dead_key_map,
            &ligature_map,
            &ambiguities,
            timing.as_ref(),
        );

        let covers_all = crate::classify::INVARIANT_ORDER.chars().all(|c| {
            character_map.values().any(|&e| e == c)
                || dead_key_map.iter().any(|(_, e)| e == c)
                || ligature_map.iter().any(|(_, e)| e == c)
        });
        let success = ambiguities.is_empty() && covers_all;

        self.token = terminal(&self.token, character_map, dead_key_map, ligature_map, ambiguities, advice);
        self.state = SessionState::Terminal { success };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_timing() -> Timing {
        Timing::default()
    }

    #[test]
    fn scenario_a_identity_report_succeeds_with_positive_advice() {
        let mut session = Session::new(CalibrationConfig::default());
        let probe = session.current_probe().unwrap().to_string();
        let token = session.accept_report(&probe, empty_timing(), false).unwrap();
        assert!(matches!(session.state(), SessionState::Terminal { success: true }));
        let advice = token.advice.as_ref().unwrap();
        assert_eq!(advice.len(), 1);
        assert_eq!(
            advice[0].advice_type,
            scanner_calib_diagnostics::AdviceType(scanner_calib_diagnostics::codes::READS_INVARIANT_CHARACTERS_RELIABLY)
        );
        let character_map = token.character_map.as_ref().unwrap();
        for c in crate::classify::INVARIANT_ORDER.chars() {
            assert_eq!(character_map.get(&c), Some(&c));
        }
        assert!(token.dead_key_map.as_ref().unwrap().is_empty());
    }

    #[test]
    fn scenario_c_single_dead_key_populates_dead_key_map() {
        let mut session = Session::new(CalibrationConfig::default());
        let mut probe: Vec<char> = session.current_probe().unwrap().chars().collect();
        let apostrophe_pos = probe.iter().position(|&c| c == '\'').unwrap();
        probe[apostrophe_pos] = '\0';
        let reported: String = probe.into_iter().collect();
        session.accept_report(&reported, empty_timing(), false).unwrap();

        assert!(matches!(
            session.state(),
            SessionState::AwaitingDeadKey {
                dead_key: '\'',
                segment_index: 0,
                ..
            }
        ));

        let mut dead_key_report = String::from('\0');
        dead_key_report.push_str(crate::classify::INVARIANT_ORDER);
        let token = session.accept_report(&dead_key_report, empty_timing(), false).unwrap();

        assert!(matches!(session.state(), SessionState::Terminal { success: true }));
        let dead_key_map = token.dead_key_map.as_ref().unwrap();
        assert_eq!(dead_key_map.len(), 82);
        assert_eq!(dead_key_map.get("\0'"), Some('\''));
    }

    #[test]
    fn scenario_d_ambiguous_ligature_reports_cannot_read_reliably() {
        let config = CalibrationConfig::default();
        let mut session = Session::new(config);
        let mut probe: Vec<char> = session.current_probe().unwrap().chars().collect();
        // Two distinct invariant positions both collapse to the same
        // two-character reported sequence "xy".
        let pos_a = probe.iter().position(|&c| c == 'Q').unwrap();
        let pos_b = probe.iter().position(|&c| c == 'R').unwrap();
        probe.splice(pos_a..pos_a + 1, "xy".chars());
        let pos_b_adjusted = pos_b + 1; // account for the one inserted char
        probe.splice(pos_b_adjusted..pos_b_adjusted + 1, "xy".chars());
        let reported: String = probe.into_iter().collect();

        let token = session.accept_report(&reported, empty_timing(), false).unwrap();
        assert!(matches!(session.state(), SessionState::Terminal { success: false }));
        assert!(!token.ambiguities.is_empty());
        let advice = token.advice.as_ref().unwrap();
        assert!(advice.iter().any(|a| a.advice_type
            == scanner_calib_diagnostics::AdviceType(scanner_calib_diagnostics::codes::CANNOT_READ_BARCODES_RELIABLY)));
    }

    #[test]
    fn recognised_data_elements_resolve_an_otherwise_ambiguous_character() {
        let config = CalibrationConfig {
            recognised_data_elements: vec![scanner_calib_config::RecognisedDataElement {
                syntax: scanner_calib_config::DataElementSyntax::Gs1,
                identifier: "0123456789012345".to_string(),
            }],
            ..Default::default()
        };
        let mut session = Session::new(config);
        let mut probe: Vec<char> = session.current_probe().unwrap().chars().collect();
        // Both '0' and '9' are reported as the same single character '#'
        // (not itself an invariant character, so it introduces no other
        // collisions), which would otherwise be an irresolvable ambiguity.
        let pos_zero = probe.iter().position(|&c| c == '0').unwrap();
        let pos_nine = probe.iter().position(|&c| c == '9').unwrap();
        probe[pos_zero] = '#';
        probe[pos_nine] = '#';
        let reported: String = probe.into_iter().collect();

        let token = session.accept_report(&reported, empty_timing(), false).unwrap();
        // The recognised data element resolves the collision rather than
        // leaving it as an irresolvable Ambiguity record — '9' genuinely
        // cannot be distinguished from '0' given this evidence, so it drops
        // out of the final map, but that is a coverage gap, not ambiguity.
        assert!(token.ambiguities.is_empty());
        let character_map = token.character_map.as_ref().unwrap();
        assert_eq!(character_map.get(&'#'), Some(&'0'));
    }

    #[test]
    fn scenario_f_segmented_baseline_matches_single_segment_run() {
        let segmented_config = CalibrationConfig {
            max_segment_chars: 40,
            ..Default::default()
        };
        let mut segmented = Session::new(segmented_config);
        assert!(matches!(
            segmented.state(),
            SessionState::AwaitingBaseline { segment_count, .. } if *segment_count >= 5
        ));

        loop {
            let probe = segmented.current_probe().unwrap().to_string();
            segmented.accept_report(&probe, empty_timing(), false).unwrap();
            if segmented.is_terminal() {
                break;
            }
        }

        let mut unsegmented = Session::new(CalibrationConfig::default());
        let probe = unsegmented.current_probe().unwrap().to_string();
        unsegmented.accept_report(&probe, empty_timing(), false).unwrap();

        assert_eq!(segmented.token().character_map, unsegmented.token().character_map);
        assert_eq!(segmented.token().dead_key_map, unsegmented.token().dead_key_map);
    }

    #[test]
    fn cancellation_moves_to_terminal_failure() {
        let mut session = Session::new(CalibrationConfig::default());
        let token = session.accept_report("anything", empty_timing(), true).unwrap();
        assert!(matches!(session.state(), SessionState::Terminal { success: false }));
        assert!(token.errors.contains(&CalibrationError::CancelledByUser));
    }

    #[test]
    fn report_after_terminal_is_out_of_sequence() {
        let mut session = Session::new(CalibrationConfig::default());
        session.accept_report("anything", empty_timing(), true).unwrap();
        let err = session.accept_report("more", empty_timing(), false).unwrap_err();
        assert!(matches!(err, CalibrationError::OutOfSequenceReport { .. }));
    }

    #[test]
    fn accept_report_for_token_succeeds_with_matching_hash() {
        let mut session = Session::new(CalibrationConfig::default());
        let hash = session.current_token_hash();
        let probe = session.current_probe().unwrap().to_string();
        session.accept_report_for_token(hash, &probe, empty_timing(), false).unwrap();
        assert!(session.is_terminal());
    }

    #[test]
    fn accept_report_for_token_rejects_stale_hash() {
        let mut session = Session::new(CalibrationConfig::default());
        let stale_hash = session.current_token_hash().wrapping_add(1);
        let probe = session.current_probe().unwrap().to_string();
        let err = session
            .accept_report_for_token(stale_hash, &probe, empty_timing(), false)
            .unwrap_err();
        assert!(matches!(err, CalibrationError::OutOfSequenceReport { .. }));
        assert!(!session.is_terminal());
    }

    #[test]
    fn prefix_is_detected_and_stripped_on_first_segment() {
        let mut session = Session::new(CalibrationConfig::default());
        let probe = session.current_probe().unwrap().to_string();
        let with_prefix = format!("]C1{probe}");
        let token = session.accept_report(&with_prefix, empty_timing(), false).unwrap();
        assert_eq!(token.detected_prefix, "]C1");
    }
}
