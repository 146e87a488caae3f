use crate::conversion::{
    collect_filter_settings, detect_firmware_type, extract_firmware_version, gyro_rate_hz,
    logging_rate_hz, parse_pid_profile, pid_rate_hz,
};
use crate::error::{BBLError, Result};
use crate::parser::frame::{parse_frames, FrameDecodeOutput};
use crate::parser::header::{find_all_log_starts, find_log_start, parse_headers, LOG_START_MARKER};
use crate::parser::mapper::FieldMap;
use crate::types::*;
use tracing::{debug, info};

/// Share of the progress range spent in the frame loop; mapping takes the rest
const FRAME_PROGRESS_SHARE: u32 = 90;

/// Decode the first log in `data`.
///
/// `progress` receives non-decreasing percentages ending with 100.
pub fn decode_log<F: FnMut(u8, &str)>(data: &[u8], progress: F) -> Result<DecodedLog> {
    decode_log_with_options(data, &DecodeOptions::default(), progress)
}

pub fn decode_log_with_options<F: FnMut(u8, &str)>(
    data: &[u8],
    options: &DecodeOptions,
    mut progress: F,
) -> Result<DecodedLog> {
    let log_start = find_log_start(data, 0).ok_or(BBLError::NoLogStart)?;
    decode_log_at(data, log_start, 1, options, &mut progress)
}

/// Decode every log in `data`, one result per log start marker.
///
/// A failed log does not stop the others. A buffer without any log start
/// yields a single `NoLogStart` error.
pub fn decode_all_logs<F: FnMut(u8, &str)>(data: &[u8], progress: F) -> Vec<Result<DecodedLog>> {
    decode_all_logs_with_options(data, &DecodeOptions::default(), progress)
}

pub fn decode_all_logs_with_options<F: FnMut(u8, &str)>(
    data: &[u8],
    options: &DecodeOptions,
    mut progress: F,
) -> Vec<Result<DecodedLog>> {
    let log_starts = find_all_log_starts(data);
    if log_starts.is_empty() {
        return vec![Err(BBLError::NoLogStart)];
    }

    let total = log_starts.len() as u32;
    debug!(logs = total, bytes = data.len(), "found log start markers");

    log_starts
        .iter()
        .enumerate()
        .map(|(index, &log_start)| {
            let base = index as u32 * 100;
            let mut scaled = |percent: u8, message: &str| {
                progress(((base + percent as u32) / total) as u8, message)
            };
            decode_log_at(data, log_start, index + 1, options, &mut scaled)
        })
        .collect()
}

/// Decode the log whose start marker is at `log_start`
fn decode_log_at<F: FnMut(u8, &str)>(
    data: &[u8],
    log_start: usize,
    log_index: usize,
    options: &DecodeOptions,
    progress: &mut F,
) -> Result<DecodedLog> {
    progress(0, "Parsing headers");

    // The log ends where the next one begins
    let data_end = find_log_start(data, log_start + LOG_START_MARKER.len()).unwrap_or(data.len());
    let header = parse_headers(&data[..data_end], log_start)?;
    if header.i_frame_def.is_empty() {
        return Err(BBLError::NoFieldDefinitions);
    }

    let mut frame_progress = |percent: u8, message: &str| {
        progress((percent as u32 * FRAME_PROGRESS_SHARE / 100) as u8, message)
    };
    let output = parse_frames(data, &header, data_end, options, &mut frame_progress);

    if output.main_samples.is_empty() {
        return Err(BBLError::NoFrames {
            errors: output.error_count,
        });
    }

    progress(FRAME_PROGRESS_SHARE as u8, "Mapping frames");
    let log = assemble_log(header, output, log_index, options);

    info!(
        log = log_index,
        frames = log.metadata.frame_count,
        errors = log.error_count,
        duration_s = log.metadata.duration_seconds,
        "decoded log"
    );
    progress(100, "Complete");

    Ok(log)
}

fn assemble_log(
    header: BBLHeader,
    output: FrameDecodeOutput,
    log_index: usize,
    options: &DecodeOptions,
) -> DecodedLog {
    let field_map = FieldMap::new(&header.i_frame_def);
    let frames = field_map.map_all(&output.main_samples);
    let metadata = build_metadata(&header, &field_map, &frames, &output);

    let warning = (output.error_count > 0).then(|| {
        format!(
            "{} corrupted frame(s) were skipped; the decoded data may have gaps",
            output.error_count
        )
    });

    DecodedLog {
        log_index,
        frames,
        slow_frames: output.slow_samples,
        metadata,
        error_count: output.error_count,
        warning,
        raw_samples: options.keep_raw.then_some(output.main_samples),
        header,
    }
}

fn build_metadata(
    header: &BBLHeader,
    field_map: &FieldMap,
    frames: &[FlightFrame],
    output: &FrameDecodeOutput,
) -> LogMetadata {
    let duration_seconds = frames.last().map(|f| f.time_us).unwrap_or(0) as f64 / 1_000_000.0;
    let logging_rate = logging_rate_hz(header);

    let loop_rate_hz = if frames.len() > 1 && duration_seconds > 0.0 {
        (frames.len() - 1) as f64 / duration_seconds
    } else {
        logging_rate.unwrap_or(0.0)
    };

    LogMetadata {
        firmware_type: detect_firmware_type(&header.firmware_type, &header.firmware_revision),
        firmware_revision: header.firmware_revision.clone(),
        firmware_version: extract_firmware_version(&header.firmware_revision)
            .map(|version| version.to_string()),
        board_info: header.board_info.clone(),
        craft_name: header.craft_name.clone(),
        loop_rate_hz,
        gyro_rate_hz: gyro_rate_hz(header),
        pid_rate_hz: pid_rate_hz(header),
        logging_rate_hz: logging_rate,
        motor_count: field_map.motor_count(),
        field_names: header.i_frame_def.field_names(),
        slow_field_names: header.s_frame_def.field_names(),
        debug_mode: header.get_i32("debug_mode"),
        pid_profile: parse_pid_profile(header),
        filter_settings: collect_filter_settings(header),
        frame_count: frames.len(),
        duration_seconds,
        stats: output.stats.clone(),
    }
}
