//! `scanner-calib`: a small demonstration CLI over `scanner_calib_core`.
//!
//! Three subcommands: `run` drives a calibration session from a JSON
//! transcript of scanner reports, `advise` prints a terminal token's advice
//! list, and `normalize` applies a calibrated token's maps to production
//! scan lines.

mod render;

use std::fs;
use std::io::{self, Read as _};
use std::process;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use scanner_calib_config::load_config_from_str;
use scanner_calib_core::{normalize_lines, Session, Timing, Token};

use render::Format;

#[derive(Parser)]
#[command(name = "scanner-calib", version, about = "Drive and inspect barcode scanner keyboard-layout calibration sessions")]
struct Cli {
    /// Output format: `pretty` for a human summary, `json` for a machine
    /// readable payload. Defaults to `pretty` on a terminal and `json`
    /// otherwise.
    #[arg(long, global = true, value_name = "FORMAT")]
    output: Option<String>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Drive a calibration session from a JSON transcript of reports and
    /// print the resulting token.
    Run {
        /// Path to a `CalibrationConfig` JSON file.
        #[arg(long, value_name = "PATH")]
        config: String,
        /// Path to a JSON array of report entries, each
        /// `{"text": "...", "timing_ms": [..], "cancel": false}`.
        /// `timing_ms` and `cancel` may be omitted.
        #[arg(value_name = "TRANSCRIPT")]
        transcript: String,
    },
    /// Print the advice list carried by a terminal token.
    Advise {
        /// Path to a terminal `Token` JSON file, as produced by
        /// `run --output json`.
        #[arg(value_name = "TOKEN")]
        token: String,
    },
    /// Apply a terminal token's computed maps to a file of production scan
    /// lines.
    Normalize {
        /// Path to a terminal `Token` JSON file carrying the computed maps.
        #[arg(long, value_name = "TOKEN")]
        token: String,
        /// Path to a file of scan lines to normalize, one per line. Use
        /// `-` to read from stdin.
        #[arg(value_name = "INPUT")]
        input: String,
    },
}

/// A single entry in a `run` transcript: one scanner report.
#[derive(Debug, serde::Deserialize)]
struct ReportEntry {
    text: String,
    #[serde(default)]
    timing_ms: Vec<u32>,
    #[serde(default)]
    cancel: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let format = Format::resolve_or_detect(cli.output.as_deref());

    let run_result = match &cli.cmd {
        Cmd::Run { config, transcript } => cmd_run(config, transcript, format),
        Cmd::Advise { token } => cmd_advise(token, format),
        Cmd::Normalize { token, input } => cmd_normalize(token, input),
    };

    if let Err(err) = run_result {
        emit_cli_error(format, &err);
        process::exit(1);
    }
    Ok(())
}

fn emit_cli_error(format: Format, err: &anyhow::Error) {
    let message = format!("{err:#}");
    match format {
        Format::Json => {
            let out = serde_json::json!({
                "success": false,
                "error": "command_failed",
                "message": message,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&out)
                    .expect("error envelope JSON serialization cannot fail")
            );
        }
        Format::Pretty => eprintln!("error: {message}"),
    }
}

fn cmd_run(config_path: &str, transcript_path: &str, format: Format) -> Result<()> {
    let config_json = fs::read_to_string(config_path)
        .with_context(|| format!("reading config file {config_path}"))?;
    let config = load_config_from_str(&config_json)
        .with_context(|| format!("loading calibration config from {config_path}"))?;

    let transcript_json = fs::read_to_string(transcript_path)
        .with_context(|| format!("reading transcript file {transcript_path}"))?;
    let entries: Vec<ReportEntry> = serde_json::from_str(&transcript_json)
        .with_context(|| format!("parsing transcript JSON from {transcript_path}"))?;

    let mut session = Session::new(config);
    for entry in &entries {
        if session.is_terminal() {
            break;
        }
        let timing = Timing {
            inter_character_ms: entry.timing_ms.clone(),
        };
        session
            .accept_report(&entry.text, timing, entry.cancel)
            .context("feeding a report to the session")?;
    }

    if !session.is_terminal() {
        bail!(
            "transcript ended before the session reached a terminal state ({} report(s) consumed, still awaiting {:?})",
            entries.len(),
            session.state()
        );
    }

    let token = session.token();
    print_token(token, format)?;

    if token.errors.iter().any(scanner_calib_diagnostics::CalibrationError::is_fatal) {
        bail!("session recorded a fatal error");
    }
    Ok(())
}

fn cmd_advise(token_path: &str, format: Format) -> Result<()> {
    let token = read_token(token_path)?;
    let advice = token
        .advice
        .context("token is not terminal — it carries no advice")?;

    match format {
        Format::Json => println!(
            "{}",
            serde_json::to_string_pretty(&advice).context("serializing advice")?
        ),
        Format::Pretty => render::render_advice_pretty(&advice),
    }
    Ok(())
}

fn cmd_normalize(token_path: &str, input_path: &str) -> Result<()> {
    let token = read_token(token_path)?;
    let character_map = token
        .character_map
        .context("token is not terminal — it carries no character map")?;
    let dead_key_map = token
        .dead_key_map
        .context("token is not terminal — it carries no dead-key map")?;
    let ligature_map = token
        .ligature_map
        .context("token is not terminal — it carries no ligature map")?;

    let text = if input_path == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("reading scan lines from stdin")?;
        buf
    } else {
        fs::read_to_string(input_path).with_context(|| format!("reading input file {input_path}"))?
    };

    let lines: Vec<String> = text.lines().map(str::to_string).collect();
    let normalized = normalize_lines(&lines, &character_map, &dead_key_map, &ligature_map, None);
    for line in normalized {
        println!("{line}");
    }
    Ok(())
}

fn read_token(path: &str) -> Result<Token> {
    let json = fs::read_to_string(path).with_context(|| format!("reading token file {path}"))?;
    serde_json::from_str(&json).with_context(|| format!("parsing token JSON from {path}"))
}

fn print_token(token: &Token, format: Format) -> Result<()> {
    match format {
        Format::Json => println!(
            "{}",
            serde_json::to_string_pretty(token).context("serializing token")?
        ),
        Format::Pretty => render::print_token_summary(token),
    }
    Ok(())
}
