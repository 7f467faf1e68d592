//! Scanner calibration core library.
//!
//! Computes a character/dead-key/ligature map recovering what a barcode
//! scanner's keyboard-wedge emulation actually types for each of the 82
//! invariant characters, given only a sequence of scanned probe payloads
//! and their reported strings. The main entry point is [`Session`], driven
//! step by step through [`Session::accept_report`]; [`normalize`] then
//! applies the resulting maps to live scanner input.

#![warn(missing_docs)]

/// Character classifier (C1): invariant/control/ascii/extended partitioning.
pub mod classify;
/// Barcode segmenter (C2): splits long probes for small-symbol scanners.
pub mod segment;
/// Token store (C3): immutable calibration-session snapshots.
pub mod token;
/// Session driver (C4): the S0-S5 calibration state machine.
pub mod session;
/// Mapping inferer (C5): baseline pass, dead-key pass, ambiguity resolution.
pub mod infer;
/// Advice analyzer (C6): rule evaluation and subsumption over final evidence.
pub mod advice;
/// Normalizer (C7): applies computed maps to live scanner input.
pub mod normalize;
/// Extension utilities (C8): EOL stripping, control pictures, sentinel choice.
pub mod util;
/// Deterministic hashing used for cache keys and reproducible ordering.
pub mod hash;
/// The three computed maps, the ambiguity record, and per-cell evidence.
pub mod maps;
/// External collaborator interfaces (image rendering, localization,
/// persistence, data-identifier parsing).
pub mod external;

// ── Convenience re-exports ──────────────────────────────────────────────────
// Flat imports for the most common entry points. The full module paths
// remain available for less common types.

pub use session::{Session, SessionState};
pub use token::{PerformanceBucket, Timing, Token};

pub use maps::{Ambiguity, CharacterMap, DeadKeyMap, LigatureMap, Mapping, PrefixConflict};

pub use advice::analyze as analyze_advice;
pub use infer::{
    disambiguate_via_recognised_elements, infer_baseline, infer_dead_key, resolve_ambiguities, BaselinePass,
    DeadKeyPass,
};
pub use normalize::{normalize, normalize_lines, AimPrefixResolver};
pub use segment::segment;
pub use util::{strip_trailing_eol, to_control_picture, unused_extended_ascii, DetectedEol};

pub use classify::{classify, is_ascii, is_control, is_invariant, ClassifyFlags, INVARIANT_ORDER};

pub use external::{
    BarcodeImageEncoder, DataIdentifierDiagnostics, DataIdentifierParser, JsonRecordCodec, MessageCatalog,
    RecordCodec,
};

// Diagnostics (re-exported from the diagnostics crate, the teacher's
// convention of surfacing a sibling crate's public types at the top level).
pub use scanner_calib_diagnostics::{apply_subsumption_and_sort, codes, AdviceItem, AdviceType, CalibrationError, Severity};
