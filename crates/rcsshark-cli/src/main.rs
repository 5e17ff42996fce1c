use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glob::glob;
use rcsshark_core::{DecodeConfig, Report, Revision};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("RCSSHARK_BUILD_COMMIT"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "rcsshark")]
#[command(version, long_version = LONG_VERSION)]
#[command(
    about = "Offline decoder for DVB-RCS / RCS2 signalling tables.",
    long_about = None,
    after_help = "Examples:\n  rcsshark table decode sct.bin -o report.json\n  rcsshark table decode sct.bin --revision rcs --stdout --pretty\n  rcsshark table decode dump.hex --hex --stdout"
)]
struct Cli {
    /// Log lenient skips (unknown ids, tags, classes) to stderr
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Operations on raw signalling tables.
    Table {
        #[command(subcommand)]
        command: TableCommands,
    },
}

#[derive(Subcommand, Debug)]
enum TableCommands {
    /// Decode one table and write a versioned JSON report.
    #[command(
        after_help = "Examples:\n  rcsshark table decode sct.bin -o report.json\n  rcsshark table decode 'captures/tim_*.bin' --revision rcs --stdout"
    )]
    Decode {
        /// Path to a file holding one table (glob patterns must match one file)
        input: PathBuf,

        /// Protocol revision (rcs or rcs2); overrides --config
        #[arg(long)]
        revision: Option<Revision>,

        /// JSON decode configuration, e.g. {"revision": "rcs"}
        #[arg(long)]
        config: Option<PathBuf>,

        /// Input holds hex text instead of raw bytes
        #[arg(long)]
        hex: bool,

        /// Output report path (JSON)
        #[arg(short = 'o', long, required_unless_present = "stdout")]
        report: Option<PathBuf>,

        /// Write JSON report to stdout
        #[arg(long, conflicts_with = "report")]
        stdout: bool,

        /// Pretty-print JSON output
        #[arg(long, conflicts_with = "compact")]
        pretty: bool,

        /// Compact JSON output (default)
        #[arg(long)]
        compact: bool,

        /// Suppress non-error output
        #[arg(long)]
        quiet: bool,

        /// Exit with a non-zero code on a decode error or CRC mismatch
        #[arg(long)]
        strict: bool,
    },
}

struct DecodeArgs {
    input: PathBuf,
    revision: Option<Revision>,
    config: Option<PathBuf>,
    hex: bool,
    report: Option<PathBuf>,
    stdout: bool,
    pretty: bool,
    compact: bool,
    quiet: bool,
    strict: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Table { command } => match command {
            TableCommands::Decode {
                input,
                revision,
                config,
                hex,
                report,
                stdout,
                pretty,
                compact,
                quiet,
                strict,
            } => cmd_table_decode(DecodeArgs {
                input,
                revision,
                config,
                hex,
                report,
                stdout,
                pretty,
                compact,
                quiet,
                strict,
            }),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .try_init()
        .ok();
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{err:#}"), None)
    }
}

fn cmd_table_decode(args: DecodeArgs) -> Result<(), CliError> {
    let resolved_input = resolve_input_path(&args.input)?;
    validate_input_file(&resolved_input)?;
    let input_abs = fs::canonicalize(&resolved_input)
        .with_context(|| format!("Failed to resolve input path: {}", resolved_input.display()))?;
    let report_path = if args.stdout {
        None
    } else {
        Some(args.report.ok_or_else(|| {
            CliError::new(
                "missing output path",
                Some("use -o/--report or --stdout".to_string()),
            )
        })?)
    };
    if let Some(report_path) = report_path.as_ref() {
        ensure_distinct_output(report_path, &input_abs)?;
    }

    let config = load_config(args.config.as_deref(), args.revision)?;
    let raw = fs::read(&resolved_input)
        .with_context(|| format!("Failed to read input file: {}", resolved_input.display()))?;
    let bytes = if args.hex { parse_hex(&raw)? } else { raw };
    if bytes.is_empty() {
        return Err(CliError::new(
            format!("input is empty: {}", resolved_input.display()),
            Some("the input must hold one table, starting at its table_id".to_string()),
        ));
    }

    log::debug!(
        "decoding {} bytes from {} as {}",
        bytes.len(),
        resolved_input.display(),
        config.revision
    );
    let rep = rcsshark_core::decode_report(
        &resolved_input.display().to_string(),
        &bytes,
        &config,
    );
    let json = serialize_report(&rep, args.pretty, args.compact)?;

    match report_path {
        None => print!("{}", json),
        Some(report) => {
            if let Some(parent) = report.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create output directory: {}", parent.display())
                    })?;
                }
            }
            fs::write(&report, json)
                .with_context(|| format!("Failed to write report: {}", report.display()))?;
            if !args.quiet {
                eprintln!("OK: report written -> {}", report.display());
            }
        }
    }

    if !args.quiet {
        print_problems(&rep);
    }
    if args.strict {
        check_strict(&rep)?;
    }
    Ok(())
}

fn ensure_distinct_output(report_path: &Path, input_abs: &Path) -> Result<(), CliError> {
    let report_dir = report_path
        .parent()
        .map(|parent| {
            if parent.as_os_str().is_empty() {
                fs::canonicalize(".")
            } else {
                fs::canonicalize(parent)
            }
        })
        .transpose()
        .with_context(|| format!("Failed to resolve output path: {}", report_path.display()))?;
    if let Some(report_dir) = report_dir {
        let report_target = report_dir.join(
            report_path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("Invalid report path"))?,
        );
        if report_target == input_abs {
            return Err(CliError::new(
                format!(
                    "report path must differ from input: {}",
                    report_path.display()
                ),
                Some("choose a different output path".to_string()),
            ));
        }
    }
    Ok(())
}

/// File configuration first, then the command-line revision on top.
fn load_config(path: Option<&Path>, revision: Option<Revision>) -> Result<DecodeConfig, CliError> {
    let mut config = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            DecodeConfig::from_json(&text).map_err(|err| {
                CliError::new(
                    format!("invalid config file {}: {}", path.display(), err),
                    Some(r#"expected JSON such as {"revision": "rcs2"}"#.to_string()),
                )
            })?
        }
        None => DecodeConfig::default(),
    };
    if let Some(revision) = revision {
        config.revision = revision;
    }
    Ok(config)
}

/// Accepts whitespace between bytes and an optional `0x` prefix.
fn parse_hex(raw: &[u8]) -> Result<Vec<u8>, CliError> {
    let text = String::from_utf8_lossy(raw);
    let digits: String = text
        .split_whitespace()
        .map(|chunk| chunk.trim_start_matches("0x").trim_start_matches("0X"))
        .collect();
    if digits.len() % 2 != 0 {
        return Err(CliError::new(
            format!("hex input has an odd number of digits ({})", digits.len()),
            Some("each byte needs two hex digits".to_string()),
        ));
    }
    (0..digits.len())
        .step_by(2)
        .map(|index| {
            let pair = digits.get(index..index + 2).unwrap_or_default();
            u8::from_str_radix(pair, 16).map_err(|_| {
                CliError::new(
                    format!("invalid hex byte '{}' at digit {}", pair, index),
                    Some("drop --hex to read the input as raw bytes".to_string()),
                )
            })
        })
        .collect()
}

fn serialize_report(rep: &Report, pretty: bool, compact: bool) -> Result<String, CliError> {
    if pretty && compact {
        return Err(CliError::new(
            "cannot use --pretty and --compact together",
            Some("choose one output format".to_string()),
        ));
    }
    if pretty {
        serde_json::to_string_pretty(rep)
            .context("JSON serialization failed")
            .map_err(Into::into)
    } else {
        serde_json::to_string(rep)
            .context("JSON serialization failed")
            .map_err(Into::into)
    }
}

fn print_problems(rep: &Report) {
    if let Some(error) = rep.error.as_ref() {
        eprintln!(
            "warning: decode stopped at offset {}: {}",
            error.offset, error.message
        );
    }
    if let Some(crc) = rep.crc.as_ref().filter(|crc| !crc.is_valid()) {
        eprintln!(
            "warning: CRC mismatch: 0x{:08x} in section, 0x{:08x} computed",
            crc.value, crc.computed
        );
    }
}

fn check_strict(rep: &Report) -> Result<(), CliError> {
    if let Some(error) = rep.error.as_ref() {
        return Err(CliError::new(
            format!("decode failed at offset {}: {}", error.offset, error.message),
            Some("check --revision; RCS and RCS2 headers differ".to_string()),
        ));
    }
    if rep.crc.as_ref().is_some_and(|crc| !crc.is_valid()) {
        return Err(CliError::new(
            "section CRC mismatch",
            Some("the table was decoded; the trailer does not match its bytes".to_string()),
        ));
    }
    Ok(())
}

fn validate_input_file(input: &Path) -> Result<(), CliError> {
    if !input.exists() {
        return Err(CliError::new(
            format!("input file not found: {}", input.display()),
            Some("pass a file holding one raw table, or hex text with --hex".to_string()),
        ));
    }
    if !input.is_file() {
        return Err(CliError::new(
            format!("input is not a file: {}", input.display()),
            Some("pass a file holding one raw table, or hex text with --hex".to_string()),
        ));
    }
    Ok(())
}

fn resolve_input_path(input: &Path) -> Result<PathBuf, CliError> {
    let pattern = input.to_string_lossy();
    if !is_glob_pattern(&pattern) {
        return Ok(input.to_path_buf());
    }

    let mut matches = Vec::new();
    let paths = glob(&pattern).map_err(|err| {
        CliError::new(
            format!("invalid input pattern '{}'", pattern),
            Some(format!("pattern error: {}", err.msg)),
        )
    })?;
    for entry in paths {
        let path = entry.map_err(|err| {
            CliError::new(
                format!("invalid input pattern '{}'", pattern),
                Some(format!("pattern error: {}", err)),
            )
        })?;
        if path.is_file() {
            matches.push(path);
        }
    }

    if matches.is_empty() {
        return Err(CliError::new(
            format!("no files match pattern '{}'", pattern),
            Some("check the path or quote the pattern".to_string()),
        ));
    }
    if matches.len() > 1 {
        let hint = "pass a single table file, or run once per file".to_string();
        let mut message = format!(
            "multiple files match pattern '{}' ({} matches)",
            pattern,
            matches.len()
        );
        let listed = matches
            .iter()
            .take(3)
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>();
        message.push_str("; matches: ");
        message.push_str(&listed.join(", "));
        if matches.len() > 3 {
            message.push_str(", ...");
        }
        return Err(CliError::new(message, Some(hint)));
    }

    Ok(matches.remove(0))
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?') || input.contains('[')
}

#[cfg(test)]
mod tests {
    use super::{load_config, parse_hex};
    use rcsshark_core::Revision;

    #[test]
    fn hex_accepts_spacing_and_prefixes() {
        let bytes = parse_hex(b"0x70 00 01\nc1 00").unwrap();
        assert_eq!(bytes, [0x70, 0x00, 0x01, 0xc1, 0x00]);
    }

    #[test]
    fn hex_rejects_odd_digits_and_garbage() {
        assert!(parse_hex(b"700").is_err());
        let err = parse_hex(b"70zz").unwrap_err();
        assert!(err.message.contains("'zz'"));
    }

    #[test]
    fn command_line_revision_wins() {
        let config = load_config(None, Some(Revision::Rcs)).unwrap();
        assert_eq!(config.revision, Revision::Rcs);
        assert_eq!(load_config(None, None).unwrap().revision, Revision::Rcs2);
    }
}
