//! Advice type code constants.
//!
//! Auto-generated from `spec/advice.jsonc` at build time. Use these instead
//! of numeric literals to get compile-time typo detection and IDE
//! autocomplete. Ranges are meaningful: 100-199 is positive readiness,
//! 200-299 is informational/configuration suggestions, 300-399 is
//! warnings/failure conditions.

include!(concat!(env!("OUT_DIR"), "/generated_codes.rs"));
