//! Token store (component C3).
//!
//! An immutable snapshot of "where we are in the calibration session".
//! Every driver step produces a new [`Token`]; earlier tokens remain valid,
//! independently inspectable snapshots (§9 "token chain instead of mutable
//! session object").

use std::collections::VecDeque;

use scanner_calib_config::CalibrationConfig;
use scanner_calib_diagnostics::{AdviceItem, CalibrationError};
use serde::{Deserialize, Serialize};

use crate::classify::INVARIANT_ORDER;
use crate::hash::fnv1a;
use crate::maps::{Ambiguity, CharacterMap, DeadKeyMap, LigatureMap, Mapping};
use crate::segment::segment;
use crate::util::DetectedEol;

/// Per-report inter-character timing, in milliseconds, used by the advice
/// analyzer to classify scanner keyboard performance (§6).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    /// Milliseconds elapsed between consecutive reported characters.
    pub inter_character_ms: Vec<u32>,
}

/// Scanner keyboard performance bucket (§6): `High <= 800ms`,
/// `Medium 800..2000ms`, `Low > 2000ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PerformanceBucket {
    High,
    Medium,
    Low,
}

impl Timing {
    /// Mean inter-character delay, or `None` if no timing samples were
    /// recorded.
    #[must_use]
    pub fn average_ms(&self) -> Option<f64> {
        if self.inter_character_ms.is_empty() {
            return None;
        }
        let sum: u64 = self.inter_character_ms.iter().map(|&v| u64::from(v)).sum();
        Some(sum as f64 / self.inter_character_ms.len() as f64)
    }

    /// Classify the average inter-character delay into a performance
    /// bucket. Returns `None` if there are no samples.
    #[must_use]
    pub fn bucket(&self) -> Option<PerformanceBucket> {
        let avg = self.average_ms()?;
        Some(if avg <= 800.0 {
            PerformanceBucket::High
        } else if avg < 2000.0 {
            PerformanceBucket::Medium
        } else {
            PerformanceBucket::Low
        })
    }
}

/// An immutable calibration-session snapshot.
///
/// Equality is structural over every field except `advice`, which is
/// derived by C6 rather than primary state (§4.3).
///
/// Serialization omits every collection field that is empty (§6
/// "Persistence": "serializers must ... omit empty collection fields").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    /// The probe payload currently awaiting a report (the segment in
    /// flight, if segmented).
    pub probe_payload: String,
    /// The dead-key glyph this probe targets, if this is a dead-key probe
    /// rather than the baseline.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub current_dead_key: Option<char>,
    /// The single expected character this step is resolving, when the
    /// driver is stepping cell-by-cell rather than whole-segment.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub expected_character: Option<char>,
    /// Dead-key glyphs still queued for their own probe round.
    #[serde(skip_serializing_if = "VecDeque::is_empty", default)]
    pub probes_remaining: VecDeque<char>,
    /// Index of the segment currently in flight (0-based).
    pub small_index: usize,
    /// Total number of segments for the probe currently in flight.
    pub small_count: usize,
    /// Characters stripped from the front of the first segment's report as
    /// a scanner-added prefix.
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub detected_prefix: String,
    /// Characters stripped from the back of the last segment's report as a
    /// scanner- or host-added suffix.
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub detected_suffix: String,
    /// The EOL sequence detected and stripped, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub detected_eol: Option<DetectedEol>,
    /// Accumulated reported characters for the probe currently in flight,
    /// across however many segments have been received so far.
    pub reported_characters: String,
    /// Accumulated per-cell evidence (§4.5).
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub evidence: Vec<Mapping>,
    /// Non-fatal errors accumulated so far.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<CalibrationError>,
    /// The final character map, present only on a successful terminal
    /// token.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub character_map: Option<CharacterMap>,
    /// The final dead-key map, present only on a terminal token.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dead_key_map: Option<DeadKeyMap>,
    /// The final ligature map, present only on a terminal token.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ligature_map: Option<LigatureMap>,
    /// Unresolved ambiguities found during inference.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub ambiguities: Vec<Ambiguity>,
    /// Derived advice, present only on a terminal token. Excluded from
    /// structural equality.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub advice: Option<Vec<AdviceItem>>,
    /// Timing for the most recently accepted report.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub timing: Option<Timing>,
    /// Segments of the probe currently in flight that have not yet been
    /// emitted (index 0 is `probe_payload`'s successor).
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub remaining_segments: Vec<String>,
    /// Monotonically increasing step counter; doubles as the expected
    /// sequence number for the next report (`OutOfSequenceReport`
    /// detection).
    pub sequence: u64,
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.probe_payload == other.probe_payload
            && self.current_dead_key == other.current_dead_key
            && self.expected_character == other.expected_character
            && self.probes_remaining == other.probes_remaining
            && self.small_index == other.small_index
            && self.small_count == other.small_count
            && self.detected_prefix == other.detected_prefix
            && self.detected_suffix == other.detected_suffix
            && self.detected_eol == other.detected_eol
            && self.reported_characters == other.reported_characters
            && self.evidence == other.evidence
            && self.errors == other.errors
            && self.character_map == other.character_map
            && self.dead_key_map == other.dead_key_map
            && self.ligature_map == other.ligature_map
            && self.ambiguities == other.ambiguities
            && self.timing == other.timing
            && self.remaining_segments == other.remaining_segments
            && self.sequence == other.sequence
    }
}

impl Eq for Token {}

/// A view over the fields [`Token::eq`] considers, used to derive a
/// canonical byte representation for [`Token::fnv1a_hash`]. Keeping this in
/// sync with `PartialEq` is enforced by construction: both borrow the same
/// fields in the same order.
#[derive(Serialize)]
struct TokenPrimaryFields<'a> {
    probe_payload: &'a str,
    current_dead_key: Option<char>,
    expected_character: Option<char>,
    probes_remaining: &'a VecDeque<char>,
    small_index: usize,
    small_count: usize,
    detected_prefix: &'a str,
    detected_suffix: &'a str,
    detected_eol: Option<DetectedEol>,
    reported_characters: &'a str,
    evidence: &'a [Mapping],
    errors: &'a [CalibrationError],
    character_map: &'a Option<CharacterMap>,
    dead_key_map: &'a Option<DeadKeyMap>,
    ligature_map: &'a Option<LigatureMap>,
    ambiguities: &'a [Ambiguity],
    timing: &'a Option<Timing>,
    remaining_segments: &'a [String],
    sequence: u64,
}

impl Token {
    /// FNV-1a hash over the primary fields (§4.3): every field
    /// [`Token::eq`] considers, i.e. everything except the derived `advice`
    /// list. Used by the token store and session driver to key probe
    /// rounds and detect duplicate or out-of-sequence reports without
    /// relying on a randomized hasher.
    #[must_use]
    pub fn fnv1a_hash(&self) -> u64 {
        let view = TokenPrimaryFields {
            probe_payload: &self.probe_payload,
            current_dead_key: self.current_dead_key,
            expected_character: self.expected_character,
            probes_remaining: &self.probes_remaining,
            small_index: self.small_index,
            small_count: self.small_count,
            detected_prefix: &self.detected_prefix,
            detected_suffix: &self.detected_suffix,
            detected_eol: self.detected_eol,
            reported_characters: &self.reported_characters,
            evidence: &self.evidence,
            errors: &self.errors,
            character_map: &self.character_map,
            dead_key_map: &self.dead_key_map,
            ligature_map: &self.ligature_map,
            ambiguities: &self.ambiguities,
            timing: &self.timing,
            remaining_segments: &self.remaining_segments,
            sequence: self.sequence,
        };
        let bytes = serde_json::to_vec(&view).expect("TokenPrimaryFields is always serializable");
        fnv1a(&bytes)
    }
}

/// Assemble the fixed baseline probe payload: the boundary character
/// followed by each invariant character in canonical order, each followed
/// by the boundary character (§6 grammar).
#[must_use]
pub fn baseline_payload(boundary_char: char) -> String {
    let mut s = String::with_capacity(1 + INVARIANT_ORDER.len() * 2);
    s.push(boundary_char);
    for c in INVARIANT_ORDER.chars() {
        s.push(c);
        s.push(boundary_char);
    }
    s
}

/// Assemble a dead-key probe payload for dead key `d`: `d` followed by each
/// invariant character in canonical order (§6 grammar).
#[must_use]
pub fn dead_key_payload(dead_key: char) -> String {
    let mut s = String::with_capacity(1 + INVARIANT_ORDER.len());
    s.push(dead_key);
    s.push_str(INVARIANT_ORDER);
    s
}

/// Create the genesis token for a new calibration session: the baseline
/// probe, segmented per `config.max_segment_chars`, ready for its first
/// segment to be emitted.
#[must_use]
pub fn genesis(config: &CalibrationConfig) -> Token {
    let payload = baseline_payload(config.boundary_char);
    let mut segments = segment(&payload, config.max_segment_chars as usize);
    let small_count = segments.len();
    let first = segments.remove(0);

    Token {
        probe_payload: first,
        current_dead_key: None,
        expected_character: None,
        probes_remaining: VecDeque::new(),
        small_index: 0,
        small_count,
        detected_prefix: String::new(),
        detected_suffix: String::new(),
        detected_eol: None,
        reported_characters: String::new(),
        evidence: Vec::new(),
        errors: Vec::new(),
        character_map: None,
        dead_key_map: None,
        ligature_map: None,
        ambiguities: Vec::new(),
        advice: None,
        timing: None,
        remaining_segments: segments,
        sequence: 0,
    }
}

/// Build the successor token for accepting a report against `prior`,
/// appending the (already EOL/prefix/suffix-stripped) reported text to the
/// accumulated `reported_characters` and recording `timing`.
///
/// This is a pure accumulation step; it does not advance `small_index` or
/// decide the next probe — that orchestration belongs to the session
/// driver (C4), which calls this once per accepted segment report.
#[must_use]
pub fn with_report(prior: &Token, reported: &str, timing: Timing) -> Token {
    let mut next = prior.clone();
    next.reported_characters.push_str(reported);
    next.timing = Some(timing);
    next.sequence = prior.sequence + 1;
    next
}

/// Build the terminal token carrying the final maps, ambiguities, and
/// advice list.
#[must_use]
pub fn terminal(
    prior: &Token,
    character_map: CharacterMap,
    dead_key_map: DeadKeyMap,
    ligature_map: LigatureMap,
    ambiguities: Vec<Ambiguity>,
    advice: Vec<AdviceItem>,
) -> Token {
    let mut next = prior.clone();
    next.character_map = Some(character_map);
    next.dead_key_map = Some(dead_key_map);
    next.ligature_map = Some(ligature_map);
    next.ambiguities = ambiguities;
    next.advice = Some(advice);
    next.sequence = prior.sequence + 1;
    next
}
