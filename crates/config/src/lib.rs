//! Calibration session configuration loading and validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading or validating a [`CalibrationConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// JSON deserialization failed.
    #[error("invalid config JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// A required field value is out of its valid range.
    #[error("invalid {field}: {reason}")]
    InvalidField {
        /// The name of the field that failed validation.
        field: String,
        /// A human-readable explanation of why the field value is invalid.
        reason: String,
    },
}

/// Configuration for a calibration session.
///
/// Drives C2 (the barcode segmenter), C4 (the session driver), C5 (the
/// mapping inferer's disambiguation against recognised data elements), and
/// C8 (the EOL-stripping heuristic's strict mode).
///
/// # Example
/// ```
/// let config = scanner_calib_config::CalibrationConfig {
///     boundary_char: ' ',
///     max_segment_chars: 0,
///     strict_eol: false,
///     recognised_data_elements: vec![],
///     locale_hint: None,
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalibrationConfig {
    /// The character used to delimit cells in probe payloads. By convention
    /// U+0020 (space).
    pub boundary_char: char,
    /// Maximum characters per probe segment for small-symbol scanners.
    /// `0` means "no segmentation — emit the whole probe as one payload".
    pub max_segment_chars: u32,
    /// When `true`, disables the "four spaces + trailing control" EOL
    /// detection heuristic in `strip_trailing_eol`; only an explicit
    /// CR/LF/CRLF tail is recognized.
    pub strict_eol: bool,
    /// Recognised data elements the mapping inferer may use to disambiguate
    /// reported sequences that decode to more than one expected character.
    pub recognised_data_elements: Vec<RecognisedDataElement>,
    /// Locale hint passed through to the caller's `MessageCatalog`
    /// collaborator. Never interpreted by the core itself.
    pub locale_hint: Option<String>,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            boundary_char: ' ',
            max_segment_chars: 0,
            strict_eol: false,
            recognised_data_elements: Vec::new(),
            locale_hint: None,
        }
    }
}

/// Data element syntax family for a [`RecognisedDataElement`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DataElementSyntax {
    /// GS1 application identifiers.
    Gs1,
    /// ASC MH 10.8.2 data identifiers.
    AscMh1082,
}

/// A data element the caller expects to appear in calibrated payloads,
/// used by the mapping inferer to disambiguate reported sequences that
/// would otherwise decode to more than one expected character: only the
/// candidate that produces a legal identifier prefix for one of these
/// elements is kept.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecognisedDataElement {
    /// The syntax family this identifier belongs to.
    pub syntax: DataElementSyntax,
    /// The identifier string (e.g. a GS1 application identifier digit
    /// string, or an ASC MH 10.8.2 data identifier).
    pub identifier: String,
}

/// Load and validate a [`CalibrationConfig`] from a JSON string.
///
/// Performs structural validation after deserialization:
/// - `max_segment_chars` must be `0` or `>= 8` (a segment shorter than 8
///   characters could never carry a boundary-flanked invariant character
///   plus its neighbours, making positional alignment undetectable)
/// - `boundary_char` must not itself be one of the 82 invariant characters
///   (it would be indistinguishable from probe content)
/// - each `recognised_data_elements[].identifier` must be non-empty
/// - `locale_hint`, if present, must be non-empty
pub fn load_config_from_str(s: &str) -> Result<CalibrationConfig, ConfigError> {
    let config: CalibrationConfig = serde_json::from_str(s)?;

    if config.max_segment_chars != 0 && config.max_segment_chars < 8 {
        return Err(ConfigError::InvalidField {
            field: "max_segment_chars".into(),
            reason: format!(
                "{} is too small to carry any boundary-flanked invariant character (must be 0 or >= 8)",
                config.max_segment_chars
            ),
        });
    }

    if scanner_calib_is_invariant(config.boundary_char) {
        return Err(ConfigError::InvalidField {
            field: "boundary_char".into(),
            reason: format!(
                "'{}' is one of the 82 invariant characters and cannot also be the boundary",
                config.boundary_char
            ),
        });
    }

    for (i, elem) in config.recognised_data_elements.iter().enumerate() {
        if elem.identifier.trim().is_empty() {
            return Err(ConfigError::InvalidField {
                field: format!("recognised_data_elements[{i}].identifier"),
                reason: "must not be empty".into(),
            });
        }
    }

    if let Some(ref hint) = config.locale_hint
        && hint.trim().is_empty()
    {
        return Err(ConfigError::InvalidField {
            field: "locale_hint".into(),
            reason: "must not be empty when present".into(),
        });
    }

    Ok(config)
}

/// Mirrors `scanner_calib_core::classify::is_invariant` without creating a
/// circular crate dependency: the invariant set is a fixed constant defined
/// by the spec, not configuration, so both crates may each carry this tiny
/// pure check independently. Kept `pub(crate)`-free here so a single
/// authoritative definition stays in `scanner_calib_core::classify`; this is
/// a private validation helper.
fn scanner_calib_is_invariant(c: char) -> bool {
    matches!(c, '!' | '"' | '%'..='?' | 'A'..='Z' | '_' | 'a'..='z')
}
