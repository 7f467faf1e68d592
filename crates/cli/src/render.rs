//! Terminal rendering for calibration tokens and advice lists.
//!
//! Falls back to structured JSON when the output is piped or when the user
//! explicitly requests it, the same `--output pretty|json` convention the
//! rest of this toolchain's CLIs use.

use std::io::{self, IsTerminal};

use scanner_calib_core::Token;
use scanner_calib_diagnostics::{AdviceItem, Severity};

/// Output format for CLI results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Format {
    /// Human-readable text to stdout.
    Pretty,
    /// Machine-readable JSON to stdout.
    Json,
}

impl Format {
    /// Resolve an explicit `--output` flag, defaulting to `Pretty` for
    /// interactive terminals and `Json` for pipes.
    pub(crate) fn resolve_or_detect(explicit: Option<&str>) -> Self {
        match explicit {
            Some("json") => Format::Json,
            Some("pretty") => Format::Pretty,
            _ => {
                if io::stdout().is_terminal() {
                    Format::Pretty
                } else {
                    Format::Json
                }
            }
        }
    }
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::None => "none",
        Severity::Low => "low",
        Severity::Medium => "medium",
        Severity::High => "high",
    }
}

/// Print a terminal token's outcome: success/failure, map sizes,
/// unresolved ambiguities, and advice count.
pub(crate) fn print_token_summary(token: &Token) {
    let has_maps = token.character_map.is_some();
    if !has_maps {
        println!("session did not reach a terminal outcome");
        return;
    }

    let character_count = token.character_map.as_ref().map_or(0, std::collections::BTreeMap::len);
    let dead_key_count = token.dead_key_map.as_ref().map_or(0, scanner_calib_core::DeadKeyMap::len);
    let ligature_count = token.ligature_map.as_ref().map_or(0, scanner_calib_core::LigatureMap::len);

    if token.ambiguities.is_empty() {
        println!("calibration succeeded");
    } else {
        println!("calibration incomplete: {} unresolved ambiguit(y/ies)", token.ambiguities.len());
        for amb in &token.ambiguities {
            println!(
                "  {:?} -> one of {:?}{}",
                amb.reported,
                amb.expected_candidates,
                if amb.dead_key { " (dead-key probe)" } else { "" }
            );
        }
    }

    println!(
        "maps: {character_count} character, {dead_key_count} dead-key, {ligature_count} ligature"
    );

    if !token.errors.is_empty() {
        println!("{} non-fatal error(s) recorded during the session", token.errors.len());
    }

    if let Some(advice) = &token.advice {
        render_advice_pretty(advice);
    }
}

/// Print an advice list as one line per item: severity, code, condition,
/// suggestion.
pub(crate) fn render_advice_pretty(advice: &[AdviceItem]) {
    if advice.is_empty() {
        println!("no advice items");
        return;
    }
    println!("advice:");
    for item in advice {
        println!(
            "  [{}] {} — {}",
            severity_label(item.severity),
            item.advice_type.0,
            item.condition
        );
        println!("    -> {}", item.suggestion);
    }
}
