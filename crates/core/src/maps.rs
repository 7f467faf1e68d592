//! The three computed maps (character, dead-key, ligature) and the
//! ambiguity record, plus the tagged-variant [`Mapping`] sum type component
//! C5 reports evidence through.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// `reported_char -> expected_char`.
///
/// Injective restricted to reported characters that are unambiguous: a
/// reported character that maps to more than one expected character is
/// recorded as an [`Ambiguity`] instead and excluded from this map.
pub type CharacterMap = BTreeMap<char, char>;

/// The NUL sentinel a reported dead-key sequence begins with.
pub const DEAD_KEY_SENTINEL: char = '\0';

/// `reported_sequence (2..n chars, first is the NUL sentinel) -> expected_char`.
///
/// Invariant: the key sequences form a prefix code over reported streams —
/// no key sequence is a proper prefix of another. Enforced on insert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadKeyMap(BTreeMap<String, char>);

/// `reported_sequence -> expected_char`, where the sequence has length > 1
/// and does not begin with [`DEAD_KEY_SENTINEL`].
///
/// Invariants: prefix-free; disjoint from the [`DeadKeyMap`] domain (that
/// disjointness is enforced by construction since a ligature sequence is
/// rejected here if it begins with the sentinel).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LigatureMap(BTreeMap<String, char>);

/// Returned when inserting into a [`DeadKeyMap`] or [`LigatureMap`] would
/// violate the prefix-free invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixConflict {
    /// The sequence that was rejected.
    pub rejected: String,
    /// The existing sequence it conflicts with (one is a prefix of the other).
    pub conflicts_with: String,
}

fn check_prefix_free<'a>(
    existing: impl Iterator<Item = &'a str>,
    candidate: &str,
) -> Result<(), PrefixConflict> {
    for key in existing {
        if key.starts_with(candidate) || candidate.starts_with(key) {
            return Err(PrefixConflict {
                rejected: candidate.to_string(),
                conflicts_with: key.to_string(),
            });
        }
    }
    Ok(())
}

impl DeadKeyMap {
    /// Insert a `reported_sequence -> expected` pair, rejecting it if it
    /// would break the prefix-free invariant against an existing entry.
    pub fn insert(
        &mut self,
        reported_sequence: String,
        expected: char,
    ) -> Result<(), PrefixConflict> {
        check_prefix_free(self.0.keys().map(String::as_str), &reported_sequence)?;
        self.0.insert(reported_sequence, expected);
        Ok(())
    }

    /// Look up the expected character for an exact reported sequence.
    #[must_use]
    pub fn get(&self, reported_sequence: &str) -> Option<char> {
        self.0.get(reported_sequence).copied()
    }

    /// Find the longest key in this map that is a prefix of `input[at..]`,
    /// returning `(expected, matched_len)`. Used by the normalizer (C7) for
    /// longest-prefix matching.
    #[must_use]
    pub fn longest_prefix_match(&self, input: &str, at: usize) -> Option<(char, usize)> {
        let tail = &input[at..];
        self.0
            .iter()
            .filter(|(k, _)| tail.starts_with(k.as_str()))
            .map(|(k, v)| (*v, k.len()))
            .max_by_key(|(_, len)| *len)
    }

    /// Iterate over all `(reported_sequence, expected)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, char)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True iff there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl LigatureMap {
    /// Insert a `reported_sequence -> expected` pair. Rejects sequences of
    /// length < 2, sequences beginning with the dead-key sentinel, and
    /// sequences that would break the prefix-free invariant.
    pub fn insert(
        &mut self,
        reported_sequence: String,
        expected: char,
    ) -> Result<(), PrefixConflict> {
        debug_assert!(
            reported_sequence.chars().count() > 1,
            "ligature sequences must have length > 1"
        );
        debug_assert!(
            !reported_sequence.starts_with(DEAD_KEY_SENTINEL),
            "ligature sequences must not begin with the dead-key sentinel"
        );
        check_prefix_free(self.0.keys().map(String::as_str), &reported_sequence)?;
        self.0.insert(reported_sequence, expected);
        Ok(())
    }

    /// Look up the expected character for an exact reported sequence.
    #[must_use]
    pub fn get(&self, reported_sequence: &str) -> Option<char> {
        self.0.get(reported_sequence).copied()
    }

    /// Iterate over all `(reported_sequence, expected)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, char)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True iff there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Present iff a reported sequence maps to more than one distinct expected
/// character with no disambiguator (§4.5 ambiguity resolution).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ambiguity {
    /// The reported sequence that is ambiguous.
    pub reported: String,
    /// The distinct expected characters it could plausibly decode to.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub expected_candidates: Vec<char>,
    /// True iff every candidate is an invariant character (the common,
    /// highest-severity case: barcode content itself cannot be recovered).
    pub invariant_only: bool,
    /// True iff this ambiguity arose during the dead-key pass rather than
    /// the baseline pass.
    pub dead_key: bool,
}

/// A single piece of evidence C5 records while walking expected/reported
/// cells, as a tagged variant per family rather than an inheritance
/// hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Mapping {
    /// A single reported character maps to a single expected character.
    Character { reported: char, expected: char },
    /// A reported dead-key sequence (NUL-prefixed) maps to an expected
    /// character.
    DeadKey {
        reported_sequence: String,
        expected: char,
    },
    /// A reported multi-character sequence not involving a dead key maps
    /// to a single expected character.
    Ligature {
        reported_sequence: String,
        expected: char,
    },
}

impl Mapping {
    /// The expected character this mapping resolves to.
    #[must_use]
    pub fn expected(&self) -> char {
        match self {
            Mapping::Character { expected, .. }
            | Mapping::DeadKey { expected, .. }
            | Mapping::Ligature { expected, .. } => *expected,
        }
    }
}
