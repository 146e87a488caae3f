//! Integration tests for the decode path
//!
//! Every log here is built in memory from header lines plus hand-encoded
//! frame bytes:
//! - Literal values, history reset and increment fields
//! - Tagged group layouts through the public stream API
//! - Resynchronization and partial success
//! - Multi-log buffers and fatal error classification

use bbl_decoder::{
    decode_all_logs, decode_log, decode_log_with_options, zigzag_decode, BBLDataStream, BBLError,
    DecodeOptions, LOG_END_MESSAGE, LOG_START_MARKER,
};

/// Build a log from `H` lines (without the product line) and a binary body
fn build_log(headers: &[&str], body: &[u8]) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(LOG_START_MARKER);
    data.push(b'\n');
    for line in headers {
        data.extend_from_slice(b"H ");
        data.extend_from_slice(line.as_bytes());
        data.push(b'\n');
    }
    data.extend_from_slice(body);
    data
}

fn unsigned_vb(mut value: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    while value >= 0x80 {
        bytes.push((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    bytes.push(value as u8);
    bytes
}

fn raw_options() -> DecodeOptions {
    DecodeOptions {
        keep_raw: true,
        ..Default::default()
    }
}

const LOOP_AND_GYRO: &[&str] = &[
    "Field I name:loopIteration,gyroADC[0]",
    "Field I signed:0,1",
    "Field I predictor:0,0",
    "Field I encoding:1,0",
    "Field P predictor:6,1",
    "Field P encoding:9,0",
];

#[test]
fn test_intra_unsigned_values_are_literal() {
    let headers = [
        "Field I name:loopIteration,time",
        "Field I predictor:0,0",
        "Field I encoding:1,1",
    ];
    let data = build_log(&headers, &[b'I', 0x05, 0xC8, 0x01, b'I', 0x06, 0x90, 0x03]);
    let log = decode_log_with_options(&data, &raw_options(), |_, _| {}).unwrap();

    let raw: Vec<Vec<i32>> = log
        .raw_samples
        .unwrap()
        .into_iter()
        .map(|sample| sample.values)
        .collect();
    assert_eq!(raw, vec![vec![5, 200], vec![6, 400]]);
    assert_eq!(log.error_count, 0);
}

#[test]
fn test_time_crossing_signed_range_is_non_decreasing() {
    let headers = [
        "Field I name:loopIteration,time",
        "Field I predictor:0,0",
        "Field I encoding:1,1",
    ];
    let mut body = vec![b'I', 0x00];
    body.extend(unsigned_vb(2_147_483_000));
    body.extend([b'I', 0x01]);
    body.extend(unsigned_vb(2_147_484_000));
    let data = build_log(&headers, &body);
    let log = decode_log(&data, |_, _| {}).unwrap();

    let times: Vec<i64> = log.frames.iter().map(|f| f.time_us).collect();
    assert_eq!(times, vec![0, 1000]);
    assert!((log.metadata.duration_seconds - 0.001).abs() < 1e-9);
}

#[test]
fn test_malformed_slow_column_header_is_not_fatal() {
    let mut headers = LOOP_AND_GYRO.to_vec();
    headers.push("Field S name:flightModeFlags,stateFlags");
    headers.push("Field S predictor:0,?");
    let data = build_log(&headers, &[b'I', 3, 0x02]);
    let log = decode_log(&data, |_, _| {}).unwrap();

    assert_eq!(log.frames.len(), 1);
    assert_eq!(log.frames[0].loop_iteration, 3);
    assert_eq!(log.error_count, 0);
}

#[test]
fn test_zigzag_sequence() {
    let decoded: Vec<i32> = (0..5).map(zigzag_decode).collect();
    assert_eq!(decoded, vec![0, -1, 1, -2, 2]);
}

#[test]
fn test_intra_frame_resets_history() {
    let headers = [
        "Field I name:loopIteration",
        "Field I predictor:0",
        "Field I encoding:1",
        "Field P predictor:1",
        "Field P encoding:0",
    ];
    // I 10, P +5, I 3, P +5
    let data = build_log(&headers, &[b'I', 10, b'P', 10, b'I', 3, b'P', 10]);
    let log = decode_log(&data, |_, _| {}).unwrap();

    let loops: Vec<i32> = log.frames.iter().map(|f| f.loop_iteration).collect();
    assert_eq!(loops, vec![10, 15, 3, 8]);
}

#[test]
fn test_increment_field_reads_no_bytes() {
    // P frame: loopIteration is incremented, gyro +1 (zigzag 2)
    let body = [b'I', 41, 0x00, b'P', 0x02, b'I', 50, 0x04];
    let data = build_log(LOOP_AND_GYRO, &body);
    let log = decode_log(&data, |_, _| {}).unwrap();

    assert_eq!(log.error_count, 0);
    let frames: Vec<(i32, i32)> = log
        .frames
        .iter()
        .map(|f| (f.loop_iteration, f.gyro[0]))
        .collect();
    assert_eq!(frames, vec![(41, 0), (42, 1), (50, 2)]);
}

#[test]
fn test_inter_frame_without_keyframe_is_dropped() {
    let body = [b'P', 0x02, b'I', 7, 0x00];
    let data = build_log(LOOP_AND_GYRO, &body);
    let log = decode_log(&data, |_, _| {}).unwrap();

    assert_eq!(log.frames.len(), 1);
    assert_eq!(log.frames[0].loop_iteration, 7);
    assert_eq!(log.error_count, 1);
}

#[test]
fn test_tag8_4s16_examples() {
    let data = [0x25, 0x3F, 0xA0, 0xFF];
    let mut stream = BBLDataStream::new(&data);
    let mut values = [0i32; 8];
    stream.read_tag8_4s16(&mut values).unwrap();
    assert_eq!(&values[..4], &[3, -1, -96, 0]);
    assert_eq!(stream.position(), 3);

    let data = [0x09, 0x1A, 0xB0];
    let mut stream = BBLDataStream::new(&data);
    stream.read_tag8_4s16(&mut values).unwrap();
    assert_eq!(&values[..4], &[1, -85, 0, 0]);
    assert_eq!(stream.position(), 3);
}

#[test]
fn test_garbage_between_frames_is_skipped() {
    let body = [b'I', 1, 0x02, 0x99, b'I', 2, 0x04];
    let data = build_log(LOOP_AND_GYRO, &body);
    let log = decode_log(&data, |_, _| {}).unwrap();

    assert_eq!(log.frames.len(), 2);
    assert_eq!(log.error_count, 1);
    assert!(log.warning.is_some());
    assert_eq!(log.frames[1].gyro[0], 2);
}

#[test]
fn test_single_gyro_field_end_to_end() {
    let headers = [
        "Field I name:gyroADC[0]",
        "Field I predictor:0",
        "Field I encoding:1",
    ];
    let data = build_log(&headers, &[b'I', 0x07]);
    let log = decode_log(&data, |_, _| {}).unwrap();

    assert_eq!(log.frames.len(), 1);
    let frame = &log.frames[0];
    assert_eq!(frame.gyro, [7, 0, 0]);
    assert_eq!(frame.motors, vec![1000, 1000, 1000, 1000]);
    assert_eq!(frame.throttle, 1000);
    assert_eq!(log.metadata.frame_count, 1);
    assert_eq!(log.metadata.duration_seconds, 0.0);
}

#[test]
fn test_partial_success_with_trailing_garbage() {
    let mut body = vec![b'I', 1, 0x02];
    body.extend_from_slice(&[0xF1, 0x80, 0x80, 0x22, 0x33]);
    let data = build_log(LOOP_AND_GYRO, &body);
    let log = decode_log(&data, |_, _| {}).unwrap();

    assert_eq!(log.frames.len(), 1);
    assert!(log.error_count > 0);
}

#[test]
fn test_truncated_final_frame() {
    let body = [b'I', 1, 0x02, b'I', 0x80];
    let data = build_log(LOOP_AND_GYRO, &body);
    let log = decode_log(&data, |_, _| {}).unwrap();
    assert_eq!(log.frames.len(), 1);
    assert_eq!(log.error_count, 1);
}

#[test]
fn test_log_end_event_stops_decoding() {
    let mut body = vec![b'I', 1, 0x02, b'E', 255];
    body.extend_from_slice(LOG_END_MESSAGE);
    body.extend_from_slice(&[b'I', 2, 0x04]);
    let data = build_log(LOOP_AND_GYRO, &body);
    let log = decode_log(&data, |_, _| {}).unwrap();

    assert_eq!(log.frames.len(), 1);
    assert!(log.metadata.stats.log_end_seen);
}

#[test]
fn test_legacy_gyro_name_is_mapped() {
    let headers = [
        "Field I name:gyroData[0],gyroData[1]",
        "Field I predictor:0,0",
        "Field I encoding:0,0",
    ];
    let data = build_log(&headers, &[b'I', 0x03, 0x04]);
    let log = decode_log(&data, |_, _| {}).unwrap();
    assert_eq!(log.frames[0].gyro, [-2, 2, 0]);
    assert_eq!(log.metadata.field_names, vec!["gyroADC[0]", "gyroADC[1]"]);
}

#[test]
fn test_header_constants_feed_predictors() {
    let headers = [
        "Field I name:motor[0],motor[1],vbatLatest",
        "Field I predictor:11,5,9",
        "Field I encoding:1,0,0",
        "motorOutput:158,2047",
        "vbatref:420",
    ];
    // motor[0] = 158 + 10; motor[1] = motor[0] - 3; vbat = 420 - 1
    let data = build_log(&headers, &[b'I', 10, 0x05, 0x01]);
    let log = decode_log_with_options(&data, &raw_options(), |_, _| {}).unwrap();

    assert_eq!(log.frames[0].motors, vec![168, 165]);
    assert_eq!(log.raw_samples.unwrap()[0].values, vec![168, 165, 419]);
}

#[test]
fn test_multiple_logs_decode_independently() {
    let mut data = build_log(LOOP_AND_GYRO, &[b'I', 1, 0x00]);
    data.extend(build_log(LOOP_AND_GYRO, &[b'I', 9, 0x00, b'P', 0x00]));

    let results = decode_all_logs(&data, |_, _| {});
    assert_eq!(results.len(), 2);
    let first = results[0].as_ref().unwrap();
    let second = results[1].as_ref().unwrap();
    assert_eq!(first.frames.len(), 1);
    assert_eq!(second.frames.len(), 2);
    assert_eq!(second.frames[1].loop_iteration, 10);
    assert_eq!(second.log_index, 2);
}

#[test]
fn test_fatal_errors() {
    let err = decode_log(b"\x00\x01 random bytes", |_, _| {}).unwrap_err();
    assert!(matches!(err, BBLError::NoLogStart));
    assert!(err.is_fatal());

    let data = build_log(&["Data version:2"], &[b'I', 0x01]);
    assert!(matches!(
        decode_log(&data, |_, _| {}),
        Err(BBLError::NoFieldDefinitions)
    ));

    let data = build_log(LOOP_AND_GYRO, &[0x01, 0x02, 0x03]);
    let err = decode_log(&data, |_, _| {}).unwrap_err();
    assert!(matches!(err, BBLError::NoFrames { .. }));
    assert_ne!(err.to_string(), BBLError::NoLogStart.to_string());
}

#[test]
fn test_progress_is_monotonic() {
    let body: Vec<u8> = (0..100u8).flat_map(|i| [b'I', i, 0x00]).collect();
    let data = build_log(LOOP_AND_GYRO, &body);
    let mut reports = Vec::new();
    decode_log(&data, |percent, _| reports.push(percent)).unwrap();

    assert!(reports.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(reports.last(), Some(&100));
}
