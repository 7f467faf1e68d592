//! Normalizer (component C7).
//!
//! Applies a computed map to arbitrary live scanner input, recovering the
//! original barcode payload. Used post-calibration by the caller on
//! production data (§2).

use crate::maps::{CharacterMap, DeadKeyMap, LigatureMap};

/// An AIM symbology identifier resolver consulted first when the input's
/// leading bytes might be a mangled `]cN` prefix (the host may have eaten
/// the `]` — see §4.7).
pub trait AimPrefixResolver {
    /// Attempt to resolve an AIM prefix at the start of `input`. Returns
    /// the recovered prefix text and how many input characters it consumed,
    /// or `None` if `input` does not begin with a recognizable (possibly
    /// mangled) AIM prefix.
    fn resolve(&self, input: &str) -> Option<(String, usize)>;
}

/// Apply `character_map`, `dead_key_map`, and `ligature_map` to `input`,
/// recovering the original barcode payload character by character.
///
/// On a NUL byte, attempts a longest-prefix match against `dead_key_map`
/// starting at the current index; failing that, falls back to a
/// single-sentinel lookup. On any other character, if `aim_resolver` is
/// supplied and this is the first character of `input`, it is consulted
/// before the character maps. Otherwise the reported character is looked
/// up in `character_map` (preferring it over `ligature_map`, since a
/// ligature match requires at least one more character); unmapped
/// characters pass through verbatim.
#[must_use]
pub fn normalize(
    input: &str,
    character_map: &CharacterMap,
    dead_key_map: &DeadKeyMap,
    ligature_map: &LigatureMap,
    aim_resolver: Option<&dyn AimPrefixResolver>,
) -> String {
    let mut out = String::with_capacity(input.len());
    let mut idx = 0usize;

    if let Some(resolver) = aim_resolver {
        if let Some((resolved, consumed)) = resolver.resolve(input) {
            out.push_str(&resolved);
            idx = consumed;
        }
    }

    while idx < input.len() {
        let rest = &input[idx..];
        let current = rest.chars().next().expect("idx < input.len() implies a character remains");

        if current == '\0' {
            if let Some((expected, matched_len)) = dead_key_map.longest_prefix_match(input, idx) {
                out.push(expected);
                idx += matched_len;
                continue;
            }
            if let Some(expected) = character_map.get(&'\0') {
                out.push(*expected);
                idx += current.len_utf8();
                continue;
            }
            out.push(current);
            idx += current.len_utf8();
            continue;
        }

        if let Some((expected, matched_len)) = ligature_map_prefix_match(ligature_map, rest) {
            out.push(expected);
            idx += matched_len;
            continue;
        }

        if let Some(expected) = character_map.get(&current) {
            out.push(*expected);
        } else {
            out.push(current);
        }
        idx += current.len_utf8();
    }

    out
}

fn ligature_map_prefix_match(ligature_map: &LigatureMap, rest: &str) -> Option<(char, usize)> {
    ligature_map
        .iter()
        .filter(|(k, _)| rest.starts_with(k))
        .map(|(k, v)| (v, k.len()))
        .max_by_key(|(_, len)| *len)
}

/// Convenience wrapper over [`normalize`] for input already split into
/// lines, preserving line boundaries — useful when calibrated data is read
/// line-by-line (e.g. from a log or serial capture) rather than as one
/// contiguous stream.
#[must_use]
pub fn normalize_lines(
    lines: &[String],
    character_map: &CharacterMap,
    dead_key_map: &DeadKeyMap,
    ligature_map: &LigatureMap,
    aim_resolver: Option<&dyn AimPrefixResolver>,
) -> Vec<String> {
    lines
        .iter()
        .map(|line| normalize(line, character_map, dead_key_map, ligature_map, aim_resolver))
        .collect()
}
