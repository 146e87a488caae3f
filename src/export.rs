//! Export functionality for decoded logs
//!
//! Writes mapped flight frames and plaintext headers to CSV files, and log
//! metadata to JSON. File names follow `<stem>[.NN].csv` where the `.NN`
//! suffix is added only when the input held more than one log.

use crate::error::{BBLError, Result};
use crate::types::DecodedLog;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Export options for controlling output formats
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub csv: bool,
    pub json: bool,
    /// Output directory; defaults to the input file's directory
    pub output_dir: Option<String>,
}

/// Paths written by an export
#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    pub csv_path: Option<PathBuf>,
    pub headers_path: Option<PathBuf>,
    pub json_path: Option<PathBuf>,
}

/// Output directory and file stem (with log suffix) for one log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub output_dir: PathBuf,
    pub stem: String,
}

impl ExportPaths {
    pub fn with_extension(&self, extension: &str) -> PathBuf {
        self.output_dir.join(format!("{}.{}", self.stem, extension))
    }
}

pub fn compute_export_paths(
    input_path: &Path,
    log_index: usize,
    total_logs: usize,
    options: &ExportOptions,
) -> ExportPaths {
    let base_name = input_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("blackbox");

    let output_dir = match options.output_dir {
        Some(ref dir) => PathBuf::from(dir),
        None => input_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf(),
    };

    let stem = if total_logs > 1 {
        format!("{base_name}.{log_index:02}")
    } else {
        base_name.to_string()
    };

    ExportPaths { output_dir, stem }
}

fn ensure_output_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
        debug!(dir = %dir.display(), "created output directory");
    }
    Ok(())
}

/// Export every format enabled in `options` for one log
pub fn export_log(
    log: &DecodedLog,
    input_path: &Path,
    total_logs: usize,
    options: &ExportOptions,
) -> Result<ExportReport> {
    let paths = compute_export_paths(input_path, log.log_index, total_logs, options);
    let mut report = ExportReport::default();

    if options.csv {
        #[cfg(feature = "csv")]
        {
            ensure_output_dir(&paths.output_dir)?;
            report.headers_path = Some(export_headers_to_csv(log, &paths)?);
            report.csv_path = Some(export_frames_to_csv(log, &paths)?);
        }
        #[cfg(not(feature = "csv"))]
        return Err(BBLError::Export("CSV export requires the `csv` feature".to_string()));
    }

    if options.json {
        #[cfg(feature = "json")]
        {
            ensure_output_dir(&paths.output_dir)?;
            report.json_path = Some(export_metadata_to_json(log, &paths)?);
        }
        #[cfg(not(feature = "json"))]
        return Err(BBLError::Export("JSON export requires the `json` feature".to_string()));
    }

    Ok(report)
}

#[cfg(feature = "csv")]
fn csv_error(path: &Path, err: csv::Error) -> BBLError {
    BBLError::Export(format!("{}: {}", path.display(), err))
}

/// Column names of the flight data CSV for this log
pub fn flight_csv_columns(log: &DecodedLog) -> Vec<String> {
    let mut columns = vec!["time (us)".to_string(), "loopIteration".to_string()];
    let axis_group = |columns: &mut Vec<String>, name: &str| {
        columns.extend((0..3).map(|axis| format!("{name}[{axis}]")));
    };

    axis_group(&mut columns, "gyroADC");
    axis_group(&mut columns, "setpoint");
    axis_group(&mut columns, "axisP");
    axis_group(&mut columns, "axisI");
    axis_group(&mut columns, "axisD");
    let has_feedforward = log.frames.first().map_or(false, |f| f.pid_f.is_some());
    if has_feedforward {
        axis_group(&mut columns, "axisF");
    }
    axis_group(&mut columns, "axisSum");
    columns.extend((0..log.metadata.motor_count).map(|n| format!("motor[{n}]")));
    columns.push("throttle".to_string());
    let debug_count = log.frames.first().map_or(0, |f| f.debug.len());
    columns.extend((0..debug_count).map(|n| format!("debug[{n}]")));
    columns
}

#[cfg(feature = "csv")]
fn export_frames_to_csv(log: &DecodedLog, paths: &ExportPaths) -> Result<PathBuf> {
    let path = paths.with_extension("csv");
    let mut writer = csv::Writer::from_path(&path).map_err(|e| csv_error(&path, e))?;

    writer
        .write_record(flight_csv_columns(log))
        .map_err(|e| csv_error(&path, e))?;

    let mut record: Vec<String> = Vec::new();
    for frame in &log.frames {
        record.clear();
        record.push(frame.time_us.to_string());
        record.push(frame.loop_iteration.to_string());
        let groups = [frame.gyro, frame.setpoint, frame.pid_p, frame.pid_i, frame.pid_d];
        record.extend(groups.iter().flatten().map(i32::to_string));
        if let Some(pid_f) = frame.pid_f {
            record.extend(pid_f.iter().map(i32::to_string));
        }
        record.extend(frame.pid_sum.iter().map(i32::to_string));
        record.extend(frame.motors.iter().map(i32::to_string));
        record.push(frame.throttle.to_string());
        record.extend(frame.debug.iter().map(i32::to_string));
        writer.write_record(&record).map_err(|e| csv_error(&path, e))?;
    }

    writer.flush()?;
    debug!(path = %path.display(), rows = log.frames.len(), "exported flight data");
    Ok(path)
}

#[cfg(feature = "csv")]
fn export_headers_to_csv(log: &DecodedLog, paths: &ExportPaths) -> Result<PathBuf> {
    let path = paths.with_extension("headers.csv");
    let mut writer = csv::Writer::from_path(&path).map_err(|e| csv_error(&path, e))?;

    writer
        .write_record(["Field", "Value"])
        .map_err(|e| csv_error(&path, e))?;
    for (key, value) in &log.header.raw_headers {
        writer
            .write_record([key, value])
            .map_err(|e| csv_error(&path, e))?;
    }

    writer.flush()?;
    Ok(path)
}

#[cfg(feature = "json")]
fn export_metadata_to_json(log: &DecodedLog, paths: &ExportPaths) -> Result<PathBuf> {
    let path = paths.with_extension("json");
    let file = std::fs::File::create(&path)?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), &log.metadata)
        .map_err(|e| BBLError::Export(format!("{}: {}", path.display(), e)))?;
    Ok(path)
}
