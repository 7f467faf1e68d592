//! Build script for generating advice code data structures at compile time.
//!
//! This script reads `spec/advice.jsonc` and generates Rust files:
//! - `generated_codes.rs`: public `u16` constants for each advice type code
//! - `generated_severity.rs`: code -> default `Severity` lookup
//! - `generated_message_key.rs`: code -> locale message key lookup
//! - `generated_subsumption.rs`: code -> list of codes it subsumes
//! - `generated_summary.rs`: code -> human summary (non-localized, for `explain`)

use std::collections::{HashMap, HashSet};
use std::env;
use std::fs;
use std::path::Path;
use scanner_calib_jsonc_strip::strip_jsonc;

fn main() {
    let spec_path = Path::new("spec/advice.jsonc");
    println!("cargo:rerun-if-changed={}", spec_path.display());

    let raw = fs::read_to_string(spec_path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", spec_path.display()));

    let stripped = strip_jsonc(&raw);

    let spec: serde_json::Value =
        serde_json::from_str(&stripped).expect("failed to parse advice.jsonc as JSON");

    let items = spec["adviceItems"]
        .as_array()
        .expect("advice.jsonc: expected `adviceItems` array");

    let out_dir = env::var("OUT_DIR").unwrap();
    let out_path = Path::new(&out_dir);

    let mut seen_codes: HashSet<u64> = HashSet::new();
    let mut seen_names: HashSet<String> = HashSet::new();
    let mut code_by_name: HashMap<String, u64> = HashMap::new();

    for (i, entry) in items.iter().enumerate() {
        let code = entry["code"]
            .as_u64()
            .unwrap_or_else(|| panic!("adviceItems[{i}] missing numeric `code`"));
        let const_name = entry["constName"]
            .as_str()
            .unwrap_or_else(|| panic!("adviceItems[{i}] (code={code}) missing `constName`"));

        assert!(
            !const_name.is_empty()
                && const_name
                    .bytes()
                    .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_')
                && const_name.as_bytes()[0].is_ascii_uppercase(),
            "adviceItems[{i}] (code={code}): constName '{const_name}' is not a valid SCREAMING_SNAKE_CASE identifier"
        );
        assert!(
            seen_codes.insert(code),
            "adviceItems[{i}]: duplicate code {code}"
        );
        assert!(
            seen_names.insert(const_name.to_string()),
            "adviceItems[{i}] (code={code}): duplicate constName '{const_name}'"
        );
        code_by_name.insert(const_name.to_string(), code);
    }

    // ── generated_codes.rs ──────────────────────────────────────────────
    let mut codes = String::from("// Auto-generated from spec/advice.jsonc — DO NOT EDIT.\n\n");
    for entry in items {
        let code = entry["code"].as_u64().unwrap();
        let const_name = entry["constName"].as_str().unwrap();
        let summary = entry["summary"].as_str().unwrap_or("");
        codes.push_str(&format!("/// {summary}\n"));
        codes.push_str(&format!("pub const {const_name}: u16 = {code};\n\n"));
    }
    fs::write(out_path.join("generated_codes.rs"), &codes)
        .expect("failed to write generated_codes.rs");

    // ── generated_severity.rs ───────────────────────────────────────────
    let mut severity = String::from("// Auto-generated from spec/advice.jsonc — DO NOT EDIT.\n\n");
    severity.push_str("match code {\n");
    for entry in items {
        let code = entry["code"].as_u64().unwrap();
        let sev = entry["severity"]
            .as_str()
            .unwrap_or_else(|| panic!("adviceItems code={code} missing `severity`"));
        let sev_rs = match sev {
            "low" => "Severity::Low",
            "medium" => "Severity::Medium",
            "high" => "Severity::High",
            "none" => "Severity::None",
            other => panic!("adviceItems code={code}: invalid severity '{other}'"),
        };
        severity.push_str(&format!("    {code} => Some({sev_rs}),\n"));
    }
    severity.push_str("    _ => None,\n}\n");
    fs::write(out_path.join("generated_severity.rs"), &severity)
        .expect("failed to write generated_severity.rs");

    // ── generated_message_key.rs ────────────────────────────────────────
    let mut message_key =
        String::from("// Auto-generated from spec/advice.jsonc — DO NOT EDIT.\n\n");
    message_key.push_str("match code {\n");
    for entry in items {
        let code = entry["code"].as_u64().unwrap();
        let key = entry["messageKey"]
            .as_str()
            .unwrap_or_else(|| panic!("adviceItems code={code} missing `messageKey`"));
        message_key.push_str(&format!("    {code} => Some(\"{key}\"),\n"));
    }
    message_key.push_str("    _ => None,\n}\n");
    fs::write(out_path.join("generated_message_key.rs"), &message_key)
        .expect("failed to write generated_message_key.rs");

    // ── generated_summary.rs ────────────────────────────────────────────
    let mut summary = String::from("// Auto-generated from spec/advice.jsonc — DO NOT EDIT.\n\n");
    summary.push_str("match code {\n");
    for entry in items {
        let code = entry["code"].as_u64().unwrap();
        let text = entry["summary"].as_str().unwrap_or("");
        let escaped = escape_rust_string_literal(text);
        summary.push_str(&format!("    {code} => Some(\"{escaped}\"),\n"));
    }
    summary.push_str("    _ => None,\n}\n");
    fs::write(out_path.join("generated_summary.rs"), &summary)
        .expect("failed to write generated_summary.rs");

    // ── generated_subsumption.rs ─────────────────────────────────────────
    let mut subsumption =
        String::from("// Auto-generated from spec/advice.jsonc — DO NOT EDIT.\n\n");
    subsumption.push_str("match code {\n");
    for entry in items {
        let code = entry["code"].as_u64().unwrap();
        let subsumes = entry["subsumes"]
            .as_array()
            .map(|a| {
                a.iter()
                    .map(|v| {
                        let name = v.as_str().unwrap_or_else(|| {
                            panic!("adviceItems code={code}: subsumes entries must be strings")
                        });
                        *code_by_name.get(name).unwrap_or_else(|| {
                            panic!(
                                "adviceItems code={code}: subsumes references unknown constName '{name}'"
                            )
                        })
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        let list = subsumes
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        subsumption.push_str(&format!("    {code} => &[{list}],\n"));
    }
    subsumption.push_str("    _ => &[],\n}\n");
    fs::write(out_path.join("generated_subsumption.rs"), &subsumption)
        .expect("failed to write generated_subsumption.rs");
}

fn escape_rust_string_literal(value: &str) -> String {
    value.chars().flat_map(char::escape_default).collect()
}
