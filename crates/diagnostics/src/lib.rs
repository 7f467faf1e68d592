//! Advice codes, severities, and error kinds for the calibration engine.
//!
//! Provides [`Severity`], [`AdviceType`], [`AdviceItem`], and
//! [`CalibrationError`], the vocabulary the session driver and advice
//! analyzer (`scanner_calib_core`) use to report calibration outcomes.
//! Advice type codes and their default severities, subsumption edges, and
//! locale message keys are defined in the [`codes`] module, generated at
//! build time from `spec/advice.jsonc`.

#![warn(missing_docs)]

/// Advice type code constants, severity/subsumption lookups, auto-generated
/// from the advice rule table.
pub mod codes;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Severity level for an advice item or recorded error.
///
/// Numeric values are part of the stable wire format: `None = 0`,
/// `Low = 100`, `Medium = 200`, `High = 300`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u16)]
pub enum Severity {
    /// No severity — used for purely informational bookkeeping.
    None = 0,
    /// Low severity: calibration succeeded without reservation.
    Low = 100,
    /// Medium severity: calibration succeeded but a condition warrants a suggestion.
    Medium = 200,
    /// High severity: a warning or failure condition exists.
    High = 300,
}

impl Severity {
    /// The severity's stable numeric value.
    #[must_use]
    pub fn value(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::None => "none",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        };
        write!(f, "{s}")
    }
}

/// A stable numeric advice type code (see [`codes`]).
///
/// Ranges are meaningful: 100-199 is positive readiness
/// (`ReadsInvariantCharactersReliably` family), 200-299 is
/// informational/configuration suggestions, 300-399 is warnings/failure
/// conditions. The numeric value, not the Rust variant name, is the
/// serialization-stable identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AdviceType(pub u16);

impl AdviceType {
    /// This type code's default severity, from the advice rule table.
    #[must_use]
    pub fn default_severity(self) -> Option<Severity> {
        default_severity(self.0)
    }

    /// The locale message key a [`MessageCatalog`]-style collaborator should
    /// resolve for this advice type, from the advice rule table.
    #[must_use]
    pub fn message_key(self) -> Option<&'static str> {
        message_key(self.0)
    }

    /// The advice type codes this one subsumes (suppresses) when both would
    /// otherwise be present in the same advice list, from the advice rule
    /// table's subsumption edges.
    #[must_use]
    pub fn subsumes(self) -> &'static [u16] {
        subsumption(self.0)
    }

    /// Non-localized human summary of this type code, for debugging and
    /// `--output json` rendering. Not suitable as user-facing text — use
    /// [`AdviceType::message_key`] with a `MessageCatalog` for that.
    #[must_use]
    pub fn explain(self) -> Option<&'static str> {
        summary(self.0)
    }
}

impl fmt::Display for AdviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single severity-ranked diagnostic derived from calibration evidence.
///
/// Advice items are derived, never primary state: the session driver
/// produces them only in the terminal token, from the accumulated evidence.
/// The core ships no user-facing strings — `locale_key` is a key for the
/// caller's own `MessageCatalog` collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdviceItem {
    /// The advice type code.
    #[serde(rename = "type")]
    pub advice_type: AdviceType,
    /// This item's severity (independent of the numeric type code range).
    pub severity: Severity,
    /// Short, non-localized description of the condition that triggered
    /// this item (for logs and `--output json`, not for end users).
    pub condition: String,
    /// Short, non-localized description of the suggested remediation.
    pub suggestion: String,
    /// Locale key for the caller's `MessageCatalog` to resolve into
    /// user-facing text.
    pub locale_key: String,
    /// Optional machine-readable context (e.g. which dead key, which
    /// reported sequence) for tooling. Uses `BTreeMap` for deterministic
    /// key ordering in serialized output. Omitted entirely when empty.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub context: BTreeMap<String, String>,
}

impl AdviceItem {
    /// Build an advice item for `advice_type`, pulling its default severity,
    /// message key from the generated rule table.
    ///
    /// # Panics
    /// Panics if `advice_type` is not present in `spec/advice.jsonc` — every
    /// call site should use one of the `codes::` constants, which are
    /// guaranteed to resolve.
    #[must_use]
    pub fn new(advice_type: AdviceType, condition: impl Into<String>, suggestion: impl Into<String>) -> Self {
        let severity = advice_type
            .default_severity()
            .unwrap_or_else(|| panic!("unknown advice type code {advice_type}"));
        let locale_key = advice_type
            .message_key()
            .unwrap_or_else(|| panic!("unknown advice type code {advice_type}"))
            .to_string();
        Self {
            advice_type,
            severity,
            condition: condition.into(),
            suggestion: suggestion.into(),
            locale_key,
            context: BTreeMap::new(),
        }
    }

    /// Attach machine-readable context (builder pattern).
    #[must_use]
    pub fn with_context(mut self, ctx: BTreeMap<String, String>) -> Self {
        self.context = ctx;
        self
    }
}

/// Applies the rule table's subsumption edges and the severity sort order
/// from the advice analyzer's contract: dedupe, suppress subsumed codes,
/// then sort by `(severity desc, type_code asc)`.
#[must_use]
pub fn apply_subsumption_and_sort(mut items: Vec<AdviceItem>) -> Vec<AdviceItem> {
    items.sort_by_key(|i| i.advice_type.0);
    items.dedup_by_key(|i| i.advice_type.0);

    let present: std::collections::HashSet<u16> = items.iter().map(|i| i.advice_type.0).collect();
    let mut suppressed: std::collections::HashSet<u16> = std::collections::HashSet::new();
    for item in &items {
        if present.contains(&item.advice_type.0) {
            for &s in item.advice_type.subsumes() {
                suppressed.insert(s);
            }
        }
    }
    items.retain(|i| !suppressed.contains(&i.advice_type.0));

    items.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.advice_type.0.cmp(&b.advice_type.0))
    });
    items
}

fn default_severity(code: u16) -> Option<Severity> {
    include!(concat!(env!("OUT_DIR"), "/generated_severity.rs"))
}

fn message_key(code: u16) -> Option<&'static str> {
    include!(concat!(env!("OUT_DIR"), "/generated_message_key.rs"))
}

fn summary(code: u16) -> Option<&'static str> {
    include!(concat!(env!("OUT_DIR"), "/generated_summary.rs"))
}

fn subsumption(code: u16) -> &'static [u16] {
    include!(concat!(env!("OUT_DIR"), "/generated_subsumption.rs"))
}

/// Errors the calibration session driver and its components can record.
///
/// Per the error handling design: all errors are recorded in the current
/// token's `errors` list and surfaced in the terminal token. Only
/// [`CalibrationError::OutOfSequenceReport`] and a fatal
/// [`CalibrationError::InputError`] terminate the session; every other
/// variant degrades the resulting map (marks entries partial) but lets the
/// caller accept the partial result or re-run the failed probe.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum CalibrationError {
    /// A probe segment was shorter than expected (missing cells).
    #[error("partial data reported for probe segment {segment_index} (expected {expected_cells} cells, got {reported_cells})")]
    PartialDataReported {
        /// Index of the probe segment that was short.
        segment_index: usize,
        /// Number of cells the segment was expected to carry.
        expected_cells: usize,
        /// Number of cells actually reported.
        reported_cells: usize,
    },
    /// An empty report was received for a probe.
    #[error("no data reported for probe segment {segment_index}")]
    NoDataReported {
        /// Index of the probe segment that produced no data.
        segment_index: usize,
    },
    /// The report received does not match the probe currently awaited.
    #[error("report does not match the awaited probe (expected sequence {expected_sequence}, got {reported_sequence})")]
    OutOfSequenceReport {
        /// Sequence number of the probe the driver was awaiting.
        expected_sequence: u64,
        /// Sequence number carried by the received report, if known.
        reported_sequence: u64,
    },
    /// Inference could not resolve a reported sequence to a single expected
    /// character.
    #[error("ambiguous mapping for reported sequence {reported:?}: candidates {expected_candidates:?}")]
    AmbiguousMapping {
        /// The reported sequence that maps to more than one expected character.
        reported: String,
        /// The distinct expected characters it could map to.
        expected_candidates: Vec<char>,
    },
    /// No unused extended-ASCII code point was available to use as a sentinel.
    #[error("no unused extended-ASCII code point available in the observed report data")]
    NoUnusedExtendedAscii,
    /// The session was explicitly cancelled by the caller.
    #[error("session cancelled by caller")]
    CancelledByUser,
    /// The session's advice-items-remaining count disagreed with the actual queue.
    #[error("advice item list mismatch: expected {expected} remaining, found {actual}")]
    AdviceItemListMismatch {
        /// Expected number of remaining advice items.
        expected: usize,
        /// Actual number found in the queue.
        actual: usize,
    },
    /// An external input failure (e.g. from the data-identifier parser).
    #[error("external input error {code} (fatal={is_fatal})")]
    InputError {
        /// Opaque error code from the external collaborator.
        code: String,
        /// Whether this error terminates the session.
        is_fatal: bool,
    },
}

impl CalibrationError {
    /// Whether this error terminates the session (`S5(failure)`), per the
    /// propagation rule in the error handling design: only
    /// `OutOfSequenceReport` and a fatal `InputError` are terminal.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CalibrationError::OutOfSequenceReport { .. }
        ) || matches!(self, CalibrationError::InputError { is_fatal: true, .. })
    }
}
