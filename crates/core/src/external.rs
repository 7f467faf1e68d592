//! External collaborator interfaces (§1, §9).
//!
//! The core deliberately does not implement barcode image rendering,
//! locale message resolution, structured-data persistence, or
//! data-identifier parsing — each is represented here only as the trait
//! the core requires, so callers may plug in whatever concrete service
//! fits their deployment.

use serde::{de::DeserializeOwned, Serialize};

/// Encodes a probe or calibrated payload into barcode image bytes.
///
/// Multiple implementations may coexist (§9); some encoders are not
/// thread-safe, so serializing calls to a single encoder instance is the
/// caller's responsibility, not the core's (§5 "Rendering isolation").
pub trait BarcodeImageEncoder {
    /// The image byte format this encoder produces (e.g. PNG, SVG).
    type Error;

    /// Render `payload` as a scannable barcode image.
    fn encode(&self, payload: &str) -> Result<Vec<u8>, Self::Error>;
}

/// Resolves an advice item's `locale_key` (and an optional locale hint
/// from [`scanner_calib_config::CalibrationConfig::locale_hint`]) to a
/// human-readable string. The core ships no strings of its own (§9
/// "Localization separation").
pub trait MessageCatalog {
    /// Look up `key` for `locale`, returning `None` if no translation is
    /// registered.
    fn lookup(&self, key: &str, locale: Option<&str>) -> Option<String>;
}

/// Serializes and deserializes tokens, records, and ambiguities to a
/// structured-data format (§6 "Persistence"). Implementations must escape
/// non-ASCII code points and omit empty collection fields: the calibration
/// types carry `#[serde(skip_serializing_if = "...", default)]` on every
/// collection field (§3, §4.3), and the blanket `serde_json`
/// implementation below ASCII-escapes its output after serializing, since
/// `serde_json` itself emits raw UTF-8 by default.
pub trait RecordCodec<T> {
    /// The codec's error type.
    type Error;

    /// Serialize `value` to bytes.
    fn encode(&self, value: &T) -> Result<Vec<u8>, Self::Error>;

    /// Deserialize `bytes` back into a value.
    fn decode(&self, bytes: &[u8]) -> Result<T, Self::Error>;
}

/// A [`RecordCodec`] backed by `serde_json`, ASCII-escaping non-ASCII code
/// points as the persistence contract requires.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRecordCodec;

impl<T> RecordCodec<T> for JsonRecordCodec
where
    T: Serialize + DeserializeOwned,
{
    type Error = serde_json::Error;

    fn encode(&self, value: &T) -> Result<Vec<u8>, Self::Error> {
        let json = serde_json::to_string(value)?;
        Ok(escape_non_ascii(&json).into_bytes())
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, Self::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Rewrite `json` so every non-ASCII code point is replaced by its `\uXXXX`
/// escape (a surrogate pair for code points outside the BMP). JSON's
/// structural characters (braces, brackets, commas, colons, quotes) are all
/// ASCII, so non-ASCII code points can only occur inside string literal
/// content — replacing them wherever they appear in the serialized text is
/// therefore safe.
fn escape_non_ascii(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    let mut units = [0u16; 2];
    for c in json.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    out
}

/// Diagnostics returned by a [`DataIdentifierParser`] for a decoded
/// payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataIdentifierDiagnostics {
    /// True if the payload parsed as a well-formed sequence of data
    /// elements.
    pub ok: bool,
    /// Human-unresolved diagnostic codes (resolved via a
    /// [`MessageCatalog`] by the caller, not the core).
    pub codes: Vec<String>,
}

/// Validates a decoded payload against a data-identifier grammar (GS1
/// application identifiers, ASC MH 10.8.2 data identifiers, or both). Used
/// by the mapping inferer to disambiguate reported sequences via
/// `recognised_data_elements` (§6); the core treats the parser purely as a
/// boundary collaborator and carries no grammar of its own.
pub trait DataIdentifierParser {
    /// Parse `payload` and report whether it is well-formed.
    fn parse(&self, payload: &str) -> DataIdentifierDiagnostics;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        value: String,
    }

    #[test]
    fn json_record_codec_round_trips() {
        let codec = JsonRecordCodec;
        let sample = Sample {
            value: "héllo".into(),
        };
        let bytes = codec.encode(&sample).unwrap();
        let decoded: Sample = codec.decode(&bytes).unwrap();
        assert_eq!(decoded, sample);
    }

    #[test]
    fn json_record_codec_ascii_escapes_non_ascii_code_points() {
        let codec = JsonRecordCodec;
        let sample = Sample {
            value: "héllo \u{1F600}".into(),
        };
        let bytes = codec.encode(&sample).unwrap();
        assert!(bytes.is_ascii(), "encoded bytes must be pure ASCII");
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("\\u00e9"));
        // U+1F600 is outside the BMP and must appear as a surrogate pair.
        assert!(text.contains("\\ud83d\\ude00"));
    }

    #[test]
    fn json_record_codec_reports_decode_errors() {
        let codec = JsonRecordCodec;
        let err: Result<Sample, _> = codec.decode(b"not json");
        assert!(err.is_err());
    }

    struct AlwaysOkParser;
    impl DataIdentifierParser for AlwaysOkParser {
        fn parse(&self, _payload: &str) -> DataIdentifierDiagnostics {
            DataIdentifierDiagnostics {
                ok: true,
                codes: Vec::new(),
            }
        }
    }

    #[test]
    fn data_identifier_parser_trait_is_object_safe() {
        let parser: Box<dyn DataIdentifierParser> = Box::new(AlwaysOkParser);
        let diagnostics = parser.parse("0112345678901231");
        assert!(diagnostics.ok);
    }
}
