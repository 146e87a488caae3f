//! CLI binary for BBL Decoder
//!
//! Decodes every log in the given files, prints a summary per log and
//! optionally exports CSV and JSON.

use anyhow::{Context, Result};
use bbl_decoder::{
    decode_all_logs_with_options, export_log, DecodeOptions, DecodedLog, ExportOptions,
};
use clap::{Arg, Command};
use glob::glob;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

const SUPPORTED_EXTENSIONS: &[&str] = &["bbl", "bfl", "txt"];

/// Commit the binary was built from, emitted by build.rs
const GIT_SHA: &str = match option_env!("VERGEN_GIT_SHA") {
    Some(sha) => sha,
    None => "unknown",
};

fn build_command() -> Command {
    Command::new("BBL Decoder")
        .version(env!("CARGO_PKG_VERSION"))
        .about(
            "Decode blackbox flight logs. Prints a summary per log; optionally exports CSV/JSON.",
        )
        .arg(
            Arg::new("files")
                .help("BBL files to decode (.BBL, .BFL, .TXT, case-insensitive, globs supported)")
                .required(true)
                .num_args(1..)
                .index(1),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Enable debug output and detailed decoding information")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("csv")
                .long("csv")
                .help("Export mapped flight frames to CSV files (.XX.csv plus .XX.headers.csv)")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Export log metadata to JSON files (requires the json feature)")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("output-dir")
                .long("output-dir")
                .help("Directory for output files (default: same as input file)")
                .value_name("DIR"),
        )
        .arg(
            Arg::new("max-errors")
                .long("max-errors")
                .help("Stop decoding a log after this many corrupted frames")
                .value_name("N")
                .value_parser(clap::value_parser!(u32)),
        )
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Expand patterns into existing files with a supported extension
fn collect_input_paths(patterns: &[&String]) -> Vec<PathBuf> {
    let mut valid_paths = Vec::new();

    for pattern in patterns {
        let paths: Vec<PathBuf> = if pattern.contains('*') || pattern.contains('?') {
            match glob(pattern) {
                Ok(glob_iter) => match glob_iter.collect::<Result<Vec<_>, _>>() {
                    Ok(paths) => {
                        debug!(%pattern, matched = paths.len(), "expanded glob pattern");
                        paths
                    }
                    Err(e) => {
                        eprintln!("Error expanding glob pattern '{pattern}': {e}");
                        continue;
                    }
                },
                Err(e) => {
                    eprintln!("Invalid glob pattern '{pattern}': {e}");
                    continue;
                }
            }
        } else {
            vec![PathBuf::from(pattern.as_str())]
        };

        for path in paths {
            if !path.exists() {
                eprintln!("Warning: File does not exist: {path:?}");
                continue;
            }
            if !has_supported_extension(&path) {
                let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("none");
                eprintln!("Warning: Skipping file with unsupported extension '{ext}': {path:?}");
                continue;
            }
            valid_paths.push(path);
        }
    }

    valid_paths
}

fn print_log_summary(log: &DecodedLog, total_logs: usize) {
    let meta = &log.metadata;
    println!("Log {} of {}", log.log_index, total_logs);
    println!(
        "  Firmware: {} {}",
        meta.firmware_type.name(),
        meta.firmware_version.as_deref().unwrap_or("(unknown version)")
    );
    if !meta.craft_name.is_empty() {
        println!("  Craft: {}", meta.craft_name);
    }
    println!(
        "  Frames: {} ({} I, {} P, {} S)",
        meta.frame_count, meta.stats.i_frames, meta.stats.p_frames, meta.stats.s_frames
    );
    println!("  Duration: {:.2} s", meta.duration_seconds);
    println!("  Loop rate: {:.0} Hz", meta.loop_rate_hz);
    if let Some(gyro_rate) = meta.gyro_rate_hz {
        println!("  Gyro rate: {gyro_rate:.0} Hz");
    }
    println!("  Motors: {}", meta.motor_count);
    println!("  Errors: {}", log.error_count);
    if let Some(warning) = &log.warning {
        println!("  Warning: {warning}");
    }
}

fn process_file(
    path: &Path,
    decode_options: &DecodeOptions,
    export_options: &ExportOptions,
) -> Result<usize> {
    let data =
        std::fs::read(path).with_context(|| format!("Failed to read BBL file: {path:?}"))?;
    debug!(path = %path.display(), bytes = data.len(), "read input file");

    let results = decode_all_logs_with_options(&data, decode_options, |_, _| {});
    let total_logs = results.len();
    let mut decoded = 0;

    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(log) => {
                print_log_summary(&log, total_logs);
                if export_options.csv || export_options.json {
                    let report = export_log(&log, path, total_logs, export_options)
                        .with_context(|| format!("Failed to export log {}", log.log_index))?;
                    for written in [report.headers_path, report.csv_path, report.json_path]
                        .into_iter()
                        .flatten()
                    {
                        println!("  Exported: {}", written.display());
                    }
                }
                decoded += 1;
            }
            Err(e) => {
                eprintln!("Log {} of {}: {e}", index + 1, total_logs);
            }
        }
    }

    Ok(decoded)
}

fn main() -> Result<()> {
    let matches = build_command().get_matches();

    let debug = matches.get_flag("debug");
    init_tracing(debug);
    debug!(version = env!("CARGO_PKG_VERSION"), git_sha = GIT_SHA, "bbl_decoder starting");

    let export_options = ExportOptions {
        csv: matches.get_flag("csv"),
        json: matches.get_flag("json"),
        output_dir: matches.get_one::<String>("output-dir").cloned(),
    };
    let decode_options = DecodeOptions {
        max_errors: matches.get_one::<u32>("max-errors").copied(),
        keep_raw: false,
    };

    let file_patterns: Vec<&String> = matches
        .get_many::<String>("files")
        .map(|files| files.collect())
        .unwrap_or_default();
    debug!(?file_patterns, "input patterns");

    let valid_paths = collect_input_paths(&file_patterns);
    if valid_paths.is_empty() {
        eprintln!("Error: No valid files found to process.");
        eprintln!("Supported extensions: .BBL, .BFL, .TXT (case-insensitive)");
        eprintln!("Input patterns were: {file_patterns:?}");
        std::process::exit(1);
    }

    let mut processed_files = 0;
    for (index, path) in valid_paths.iter().enumerate() {
        if index > 0 {
            println!();
        }
        let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or("unknown");
        println!("Processing: {filename}");

        match process_file(path, &decode_options, &export_options) {
            Ok(0) => warn!(file = filename, "no logs could be decoded"),
            Ok(_) => processed_files += 1,
            Err(e) => {
                eprintln!("Error processing {filename}: {e:#}");
                eprintln!("Continuing with next file...");
            }
        }
    }

    if processed_files == 0 {
        eprintln!(
            "Error: No files were successfully processed out of {} files found.",
            valid_paths.len()
        );
        eprintln!("This could be due to:");
        eprintln!("  - Files not being valid blackbox logs");
        eprintln!("  - Corrupted or empty files");
        eprintln!("  - Missing blackbox log headers");
        eprintln!("Use --debug flag for more detailed error information.");
        std::process::exit(1);
    }

    Ok(())
}
