use crate::types::frame::FrameDefinition;
use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const DEFAULT_MINTHROTTLE: i32 = 1150;
pub const DEFAULT_VBATREF: i32 = 4095;
pub const DEFAULT_MOTOR_OUTPUT: (i32, i32) = (48, 2047);

/// Header-supplied constants used by the constant predictors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DecodeConstants {
    pub minthrottle: i32,
    pub vbatref: i32,
    /// Motor output range (low, high); the low end feeds the min-motor predictor
    pub motor_output: (i32, i32),
}

impl DecodeConstants {
    pub fn min_motor(&self) -> i32 {
        self.motor_output.0
    }
}

impl Default for DecodeConstants {
    fn default() -> Self {
        Self {
            minthrottle: DEFAULT_MINTHROTTLE,
            vbatref: DEFAULT_VBATREF,
            motor_output: DEFAULT_MOTOR_OUTPUT,
        }
    }
}

/// Parsed log headers
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BBLHeader {
    pub firmware_type: String,
    pub firmware_revision: String,
    pub board_info: String,
    pub craft_name: String,
    pub data_version: u8,
    pub i_frame_def: FrameDefinition,
    pub p_frame_def: FrameDefinition,
    pub s_frame_def: FrameDefinition,
    pub constants: DecodeConstants,
    /// Ordinal of `motor[0]` in the intra schema
    pub motor0_ordinal: Option<usize>,
    /// Numeric header values by key
    pub sysconfig: HashMap<String, i32>,
    /// Every header as (key, value), in log order
    pub raw_headers: Vec<(String, String)>,
    /// Offset of the first binary byte after the headers
    pub data_start: usize,
}

impl BBLHeader {
    /// Last value recorded for a header key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.raw_headers
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_i32(&self, key: &str) -> Option<i32> {
        self.sysconfig.get(key).copied()
    }
}
