//! Projection of ordinal-indexed samples onto named flight channels

use crate::types::{
    DecodedSample, FlightFrame, FrameDefinition, DEFAULT_MOTOR_VALUE, DEFAULT_THROTTLE,
};

const AXES: usize = 3;
const DEFAULT_MOTOR_COUNT: usize = 4;
const THROTTLE_CHANNEL: usize = 3;

/// Ordinals of the channels a [`FlightFrame`] is built from
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    time: Option<usize>,
    loop_iteration: Option<usize>,
    gyro: [Option<usize>; AXES],
    setpoint: [Option<usize>; AXES],
    rc_command: [Option<usize>; 4],
    axis_p: [Option<usize>; AXES],
    axis_i: [Option<usize>; AXES],
    axis_d: [Option<usize>; AXES],
    axis_f: [Option<usize>; AXES],
    axis_sum: [Option<usize>; AXES],
    motors: Vec<Option<usize>>,
    debug: Vec<Option<usize>>,
}

/// The firmware logs `time` as an unsigned 32-bit microsecond counter
fn time_value(raw: i32) -> i64 {
    i64::from(raw as u32)
}

fn indexed<const N: usize>(frame_def: &FrameDefinition, base: &str) -> [Option<usize>; N] {
    std::array::from_fn(|i| frame_def.ordinal_of(&format!("{base}[{i}]")))
}

fn count_indexed(frame_def: &FrameDefinition, base: &str) -> usize {
    let prefix = format!("{base}[");
    frame_def
        .fields
        .iter()
        .filter(|field| field.name.starts_with(&prefix))
        .count()
}

impl FieldMap {
    pub fn new(frame_def: &FrameDefinition) -> Self {
        let motor_count = match count_indexed(frame_def, "motor") {
            0 => DEFAULT_MOTOR_COUNT,
            n => n,
        };
        let debug_count = count_indexed(frame_def, "debug");

        Self {
            time: frame_def.ordinal_of("time"),
            loop_iteration: frame_def.ordinal_of("loopIteration"),
            gyro: indexed(frame_def, "gyroADC"),
            setpoint: indexed(frame_def, "setpoint"),
            rc_command: indexed(frame_def, "rcCommand"),
            axis_p: indexed(frame_def, "axisP"),
            axis_i: indexed(frame_def, "axisI"),
            axis_d: indexed(frame_def, "axisD"),
            axis_f: indexed(frame_def, "axisF"),
            axis_sum: indexed(frame_def, "axisSum"),
            motors: (0..motor_count)
                .map(|n| frame_def.ordinal_of(&format!("motor[{n}]")))
                .collect(),
            debug: (0..debug_count)
                .map(|n| frame_def.ordinal_of(&format!("debug[{n}]")))
                .collect(),
        }
    }

    pub fn motor_count(&self) -> usize {
        self.motors.len()
    }

    pub fn has_feedforward(&self) -> bool {
        self.axis_f.iter().any(Option::is_some)
    }

    /// Map one sample; `time_origin` is subtracted from the raw timestamp.
    pub fn map(&self, values: &[i32], time_origin: i64) -> FlightFrame {
        let get = |ordinal: Option<usize>| ordinal.and_then(|i| values.get(i).copied());
        let axes = |ordinals: &[Option<usize>; AXES]| ordinals.map(|o| get(o).unwrap_or(0));

        let pid_p = axes(&self.axis_p);
        let pid_i = axes(&self.axis_i);
        let pid_d = axes(&self.axis_d);

        let setpoint = std::array::from_fn(|axis| {
            get(self.setpoint[axis])
                .or_else(|| get(self.rc_command[axis]))
                .unwrap_or(0)
        });
        let pid_sum = std::array::from_fn(|axis| {
            get(self.axis_sum[axis]).unwrap_or_else(|| {
                pid_p[axis].wrapping_add(pid_i[axis]).wrapping_add(pid_d[axis])
            })
        });

        FlightFrame {
            time_us: get(self.time).map(time_value).unwrap_or(0) - time_origin,
            loop_iteration: get(self.loop_iteration).unwrap_or(0),
            gyro: axes(&self.gyro),
            setpoint,
            pid_p,
            pid_i,
            pid_d,
            pid_f: self.has_feedforward().then(|| axes(&self.axis_f)),
            pid_sum,
            motors: self
                .motors
                .iter()
                .map(|&o| get(o).unwrap_or(DEFAULT_MOTOR_VALUE))
                .collect(),
            throttle: get(self.rc_command[THROTTLE_CHANNEL]).unwrap_or(DEFAULT_THROTTLE),
            debug: self.debug.iter().map(|&o| get(o).unwrap_or(0)).collect(),
        }
    }

    /// Map every sample with timestamps zero-based on the first one
    pub fn map_all(&self, samples: &[DecodedSample]) -> Vec<FlightFrame> {
        let time_origin = samples
            .first()
            .and_then(|sample| self.time.and_then(|t| sample.values.get(t).copied()))
            .map(time_value)
            .unwrap_or(0);

        samples
            .iter()
            .map(|sample| self.map(&sample.values, time_origin))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FrameKind;

    fn def(names: &[&str]) -> FrameDefinition {
        FrameDefinition::from_field_names(names.iter().map(|n| n.to_string()).collect())
    }

    fn sample(values: Vec<i32>) -> DecodedSample {
        DecodedSample {
            kind: FrameKind::Intra,
            values,
            offset: 0,
        }
    }

    #[test]
    fn test_missing_channels_use_defaults() {
        let map = FieldMap::new(&def(&["gyroADC[0]"]));
        let frame = map.map(&[7], 0);
        assert_eq!(frame.gyro, [7, 0, 0]);
        assert_eq!(frame.motors, vec![1000; 4]);
        assert_eq!(frame.throttle, 1000);
        assert_eq!(frame.setpoint, [0, 0, 0]);
        assert_eq!(frame.pid_f, None);
        assert!(frame.debug.is_empty());
    }

    #[test]
    fn test_setpoint_falls_back_to_rc_command() {
        let map = FieldMap::new(&def(&[
            "rcCommand[0]",
            "rcCommand[1]",
            "rcCommand[2]",
            "rcCommand[3]",
            "setpoint[1]",
        ]));
        let frame = map.map(&[10, 20, 30, 1400, 250], 0);
        assert_eq!(frame.setpoint, [10, 250, 30]);
        assert_eq!(frame.throttle, 1400);
    }

    #[test]
    fn test_pid_sum_fallback() {
        let map = FieldMap::new(&def(&[
            "axisP[0]", "axisI[0]", "axisD[0]", "axisSum[1]", "axisF[0]",
        ]));
        let frame = map.map(&[5, 6, 7, 99, 3], 0);
        assert_eq!(frame.pid_sum, [18, 99, 0]);
        assert_eq!(frame.pid_f, Some([3, 0, 0]));
    }

    #[test]
    fn test_motor_count_follows_schema() {
        let map = FieldMap::new(&def(&[
            "motor[0]", "motor[1]", "motor[2]", "motor[3]", "motor[4]", "motor[5]",
        ]));
        assert_eq!(map.motor_count(), 6);
        let frame = map.map(&[1, 2, 3, 4, 5, 6], 0);
        assert_eq!(frame.motors, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_debug_channels() {
        let map = FieldMap::new(&def(&["debug[0]", "debug[1]"]));
        assert_eq!(map.map(&[-4, 9], 0).debug, vec![-4, 9]);
    }

    #[test]
    fn test_timestamps_are_zero_based() {
        let map = FieldMap::new(&def(&["loopIteration", "time"]));
        let frames = map.map_all(&[sample(vec![0, 5_000_000]), sample(vec![1, 5_000_500])]);
        assert_eq!(frames[0].time_us, 0);
        assert_eq!(frames[1].time_us, 500);
        assert_eq!(frames[1].loop_iteration, 1);
    }

    #[test]
    fn test_timestamps_past_i32_range_stay_increasing() {
        let map = FieldMap::new(&def(&["time"]));
        let before = (0x8000_0000u32 - 600) as i32;
        let after = (0x8000_0000u32 + 400) as i32;
        let frames = map.map_all(&[sample(vec![before]), sample(vec![after])]);
        assert_eq!(frames[0].time_us, 0);
        assert_eq!(frames[1].time_us, 1000);
    }
}
