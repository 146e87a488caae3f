//! Firmware-aware interpretation of header values
//!
//! Contains firmware detection, version extraction and the derived rates
//! and tuning snapshots reported in [`LogMetadata`](crate::LogMetadata).

use crate::types::{BBLHeader, FirmwareType, PidGains, PidProfile};
use semver::Version;
use std::collections::BTreeMap;

/// Header keys describing the gyro and D-term filter chain
pub const FILTER_HEADER_KEYS: &[&str] = &[
    "gyro_lowpass_type",
    "gyro_lowpass_hz",
    "gyro_lowpass2_type",
    "gyro_lowpass2_hz",
    "gyro_lpf1_static_hz",
    "gyro_lpf2_static_hz",
    "gyro_lpf1_dyn_hz",
    "gyro_notch_hz",
    "gyro_notch_cutoff",
    "dterm_filter_type",
    "dterm_lpf_hz",
    "dterm_filter2_type",
    "dterm_lpf2_hz",
    "dterm_lpf1_static_hz",
    "dterm_lpf2_static_hz",
    "dterm_lpf1_dyn_hz",
    "dterm_notch_hz",
    "dterm_notch_cutoff",
    "yaw_lowpass_hz",
    "yaw_lpf_hz",
    "dyn_notch_count",
    "dyn_notch_q",
    "dyn_notch_min_hz",
    "dyn_notch_max_hz",
    "rpm_filter_harmonics",
    "rpm_filter_min_hz",
];

/// Detect the firmware family.
///
/// Betaflight logs still declare `Firmware type:Cleanflight`, so the
/// revision string is checked first.
pub fn detect_firmware_type(firmware_type: &str, firmware_revision: &str) -> FirmwareType {
    let revision = firmware_revision.to_ascii_lowercase();
    if revision.contains("betaflight") {
        FirmwareType::Betaflight
    } else if revision.contains("emuflight") {
        FirmwareType::EmuFlight
    } else if revision.contains("inav") {
        FirmwareType::Inav
    } else if firmware_type.eq_ignore_ascii_case("cleanflight") {
        FirmwareType::Cleanflight
    } else {
        FirmwareType::Unknown
    }
}

fn parse_version_word(word: &str) -> Option<Version> {
    let word = word.trim_start_matches(['v', 'V']);
    if let Ok(version) = Version::parse(word) {
        return Some(version);
    }
    // Two-component releases such as "4.5"
    let mut parts = word.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    match parts.next() {
        None => Some(Version::new(major, minor, 0)),
        Some(_) => None,
    }
}

/// Extract version from firmware revision string
pub fn extract_firmware_version(firmware_revision: &str) -> Option<Version> {
    // Parse version from strings like "Betaflight 4.5.1 (77d01ba3b) AT32F435M"
    let words: Vec<&str> = firmware_revision.split_whitespace().collect();
    for (i, word) in words.iter().enumerate() {
        let lower = word.to_ascii_lowercase();
        let is_name = ["betaflight", "emuflight", "inav", "cleanflight"]
            .iter()
            .any(|name| lower.contains(name));
        if is_name {
            if let Some(version) = words.get(i + 1).and_then(|next| parse_version_word(next)) {
                return Some(version);
            }
        }
    }
    words.iter().find_map(|word| parse_version_word(word))
}

/// Parse a comma-separated list of integers, skipping malformed entries
pub fn parse_header_list(value: &str) -> Vec<i32> {
    value
        .split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect()
}

/// Gyro sample rate from `looptime` (microseconds per gyro sample)
pub fn gyro_rate_hz(header: &BBLHeader) -> Option<f64> {
    let looptime = header.get_i32("looptime").filter(|&lt| lt > 0)?;
    Some(1_000_000.0 / looptime as f64)
}

/// PID loop rate: gyro rate divided by `pid_process_denom` (1 when absent)
pub fn pid_rate_hz(header: &BBLHeader) -> Option<f64> {
    let denom = header
        .get_i32("pid_process_denom")
        .filter(|&d| d > 0)
        .unwrap_or(1);
    gyro_rate_hz(header).map(|rate| rate / denom as f64)
}

/// Fraction of PID loops that produce a main frame, as (numerator, denominator)
pub fn p_interval_ratio(header: &BBLHeader) -> Option<(u32, u32)> {
    if let Some(value) = header.get("P interval") {
        let ratio = match value.split_once('/') {
            Some((num, denom)) => (num.trim().parse().ok()?, denom.trim().parse().ok()?),
            None => (1, value.trim().parse().ok()?),
        };
        return (ratio.0 > 0 && ratio.1 > 0).then_some(ratio);
    }

    let num = header.get_i32("frameIntervalPNum")?;
    let denom = header.get_i32("frameIntervalPDenom")?;
    (num > 0 && denom > 0).then_some((num as u32, denom as u32))
}

/// Main-frame logging rate: PID rate scaled by the P-interval ratio
pub fn logging_rate_hz(header: &BBLHeader) -> Option<f64> {
    let pid_rate = pid_rate_hz(header)?;
    let (num, denom) = p_interval_ratio(header).unwrap_or((1, 1));
    Some(pid_rate * num as f64 / denom as f64)
}

fn parse_gains(header: &BBLHeader, key: &str) -> Option<PidGains> {
    match parse_header_list(header.get(key)?).as_slice() {
        [p, i, d, ..] => Some(PidGains { p: *p, i: *i, d: *d }),
        _ => None,
    }
}

pub fn parse_pid_profile(header: &BBLHeader) -> PidProfile {
    let feedforward = header
        .get("ff_weight")
        .map(parse_header_list)
        .and_then(|weights| match weights.as_slice() {
            [roll, pitch, yaw, ..] => Some([*roll, *pitch, *yaw]),
            _ => None,
        });

    PidProfile {
        roll: parse_gains(header, "rollPID"),
        pitch: parse_gains(header, "pitchPID"),
        yaw: parse_gains(header, "yawPID"),
        feedforward,
    }
}

/// Snapshot of the filter headers present in the log
pub fn collect_filter_settings(header: &BBLHeader) -> BTreeMap<String, String> {
    FILTER_HEADER_KEYS
        .iter()
        .filter_map(|&key| header.get(key).map(|value| (key.to_string(), value.to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_with(entries: &[(&str, &str)]) -> BBLHeader {
        let mut header = BBLHeader::default();
        for (key, value) in entries {
            header.raw_headers.push((key.to_string(), value.to_string()));
            if let Ok(number) = value.parse::<i32>() {
                header.sysconfig.insert(key.to_string(), number);
            }
        }
        header
    }

    #[test]
    fn test_detect_firmware_type() {
        assert_eq!(
            detect_firmware_type("Cleanflight", "Betaflight 4.5.1 (77d01ba3b) AT32F435M"),
            FirmwareType::Betaflight
        );
        assert_eq!(
            detect_firmware_type("Cleanflight", "EmuFlight 0.4.1 (52b1a2f) HELIOSPRING"),
            FirmwareType::EmuFlight
        );
        assert_eq!(detect_firmware_type("", "INAV 7.1.0"), FirmwareType::Inav);
        assert_eq!(detect_firmware_type("Cleanflight", ""), FirmwareType::Cleanflight);
        assert_eq!(detect_firmware_type("", "custom"), FirmwareType::Unknown);
    }

    #[test]
    fn test_extract_firmware_version() {
        assert_eq!(
            extract_firmware_version("Betaflight 4.5.1 (77d01ba3b) AT32F435M"),
            Some(Version::new(4, 5, 1))
        );
        assert_eq!(
            extract_firmware_version("EmuFlight 0.4.1 (52b1a2f) HELIOSPRING"),
            Some(Version::new(0, 4, 1))
        );
        assert_eq!(extract_firmware_version("INAV 7.1"), Some(Version::new(7, 1, 0)));
        assert_eq!(extract_firmware_version("no version here"), None);
    }

    #[test]
    fn test_rates() {
        let header = header_with(&[
            ("looptime", "125"),
            ("pid_process_denom", "2"),
            ("P interval", "1/2"),
        ]);
        assert_eq!(gyro_rate_hz(&header), Some(8000.0));
        assert_eq!(pid_rate_hz(&header), Some(4000.0));
        assert_eq!(logging_rate_hz(&header), Some(2000.0));
    }

    #[test]
    fn test_rates_without_headers() {
        let header = BBLHeader::default();
        assert_eq!(gyro_rate_hz(&header), None);
        assert_eq!(logging_rate_hz(&header), None);
        assert_eq!(p_interval_ratio(&header), None);
    }

    #[test]
    fn test_frame_interval_fallback() {
        let header = header_with(&[
            ("looptime", "500"),
            ("frameIntervalPNum", "1"),
            ("frameIntervalPDenom", "4"),
        ]);
        assert_eq!(p_interval_ratio(&header), Some((1, 4)));
        assert_eq!(logging_rate_hz(&header), Some(500.0));
    }

    #[test]
    fn test_pid_profile() {
        let header = header_with(&[
            ("rollPID", "45,80,30"),
            ("pitchPID", "47,84,34"),
            ("yawPID", "45,80"),
            ("ff_weight", "120,125,120"),
        ]);
        let profile = parse_pid_profile(&header);
        assert_eq!(profile.roll, Some(PidGains { p: 45, i: 80, d: 30 }));
        assert_eq!(profile.pitch.map(|g| g.d), Some(34));
        assert_eq!(profile.yaw, None);
        assert_eq!(profile.feedforward, Some([120, 125, 120]));
        assert!(parse_pid_profile(&BBLHeader::default()).is_empty());
    }

    #[test]
    fn test_filter_settings() {
        let header = header_with(&[
            ("gyro_lowpass_hz", "250"),
            ("dyn_notch_count", "3"),
            ("acc_hardware", "1"),
        ]);
        let filters = collect_filter_settings(&header);
        assert_eq!(filters.len(), 2);
        assert_eq!(filters.get("gyro_lowpass_hz").map(String::as_str), Some("250"));
    }
}
