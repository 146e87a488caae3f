use crate::types::{BBLHeader, DecodedSample, FrameStats};
use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Motor output substituted when a log carries no value for a motor
pub const DEFAULT_MOTOR_VALUE: i32 = 1000;
/// Throttle substituted when `rcCommand[3]` is not logged
pub const DEFAULT_THROTTLE: i32 = 1000;

/// Runtime options for a decode
#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    /// Stop decoding a log once this many frames have failed
    pub max_errors: Option<u32>,
    /// Keep the ordinal-indexed main samples alongside the mapped frames
    pub keep_raw: bool,
}

/// One mapped main-stream sample
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FlightFrame {
    /// Microseconds since the first decoded frame
    pub time_us: i64,
    pub loop_iteration: i32,
    /// Roll, pitch, yaw
    pub gyro: [i32; 3],
    pub setpoint: [i32; 3],
    pub pid_p: [i32; 3],
    pub pid_i: [i32; 3],
    pub pid_d: [i32; 3],
    /// Present only when the log declares feedforward terms
    pub pid_f: Option<[i32; 3]>,
    pub pid_sum: [i32; 3],
    pub motors: Vec<i32>,
    pub throttle: i32,
    /// `debug[n]` channels; empty when not logged
    pub debug: Vec<i32>,
}

/// Firmware family, detected from the revision and type headers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FirmwareType {
    Betaflight,
    EmuFlight,
    Inav,
    Cleanflight,
    #[default]
    Unknown,
}

impl FirmwareType {
    pub fn name(self) -> &'static str {
        match self {
            FirmwareType::Betaflight => "Betaflight",
            FirmwareType::EmuFlight => "EmuFlight",
            FirmwareType::Inav => "INAV",
            FirmwareType::Cleanflight => "Cleanflight",
            FirmwareType::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PidGains {
    pub p: i32,
    pub i: i32,
    pub d: i32,
}

/// PID tuning recorded in the headers
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PidProfile {
    pub roll: Option<PidGains>,
    pub pitch: Option<PidGains>,
    pub yaw: Option<PidGains>,
    /// Feedforward weight per axis
    pub feedforward: Option<[i32; 3]>,
}

impl PidProfile {
    pub fn is_empty(&self) -> bool {
        self.roll.is_none()
            && self.pitch.is_none()
            && self.yaw.is_none()
            && self.feedforward.is_none()
    }
}

/// Derived information about a decoded log
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LogMetadata {
    pub firmware_type: FirmwareType,
    pub firmware_revision: String,
    /// Semantic version parsed from the revision, e.g. "4.5.1"
    pub firmware_version: Option<String>,
    pub board_info: String,
    pub craft_name: String,
    /// Measured frame rate, falling back to the header-derived logging rate
    pub loop_rate_hz: f64,
    pub gyro_rate_hz: Option<f64>,
    pub pid_rate_hz: Option<f64>,
    /// Rate at which main frames are written, from the header intervals
    pub logging_rate_hz: Option<f64>,
    pub motor_count: usize,
    pub field_names: Vec<String>,
    pub slow_field_names: Vec<String>,
    pub debug_mode: Option<i32>,
    pub pid_profile: PidProfile,
    /// Filter headers present in the log, by header key
    pub filter_settings: BTreeMap<String, String>,
    pub frame_count: usize,
    pub duration_seconds: f64,
    pub stats: FrameStats,
}

/// One fully decoded log
#[derive(Debug, Clone)]
pub struct DecodedLog {
    /// 1-based position of this log within its buffer
    pub log_index: usize,
    pub header: BBLHeader,
    pub frames: Vec<FlightFrame>,
    pub slow_frames: Vec<DecodedSample>,
    pub metadata: LogMetadata,
    pub error_count: u32,
    /// Set when some frames were lost to corruption
    pub warning: Option<String>,
    /// Main samples before mapping; kept only with `DecodeOptions::keep_raw`
    pub raw_samples: Option<Vec<DecodedSample>>,
}

impl DecodedLog {
    pub fn duration_us(&self) -> i64 {
        self.frames.last().map(|frame| frame.time_us).unwrap_or(0)
    }

    pub fn has_slow_data(&self) -> bool {
        !self.slow_frames.is_empty()
    }

    pub fn is_partial(&self) -> bool {
        self.error_count > 0
    }
}
