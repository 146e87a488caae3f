use crate::error::Result;
use crate::parser::stream::BBLDataStream;
use crate::types::{BBLHeader, DecodeConstants, FrameDefinition, DEFAULT_MOTOR_OUTPUT};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Literal line that opens every log in a blackbox file
pub const LOG_START_MARKER: &[u8] = b"H Product:Blackbox flight data recorder by Nicholas Sherlock";

/// Column id substituted for header entries that are not numbers
pub const UNKNOWN_COLUMN_ID: u8 = u8::MAX;

/// Field name prefixes renamed by newer firmware (old prefix, current prefix)
pub const LEGACY_FIELD_RENAMES: &[(&str, &str)] = &[("gyroData", "gyroADC")];

/// Find the next log start marker at or after `from`
pub fn find_log_start(data: &[u8], from: usize) -> Option<usize> {
    if from >= data.len() || data.len() - from < LOG_START_MARKER.len() {
        return None;
    }
    data[from..]
        .windows(LOG_START_MARKER.len())
        .position(|window| window == LOG_START_MARKER)
        .map(|offset| from + offset)
}

/// Offsets of every log start marker in the buffer
pub fn find_all_log_starts(data: &[u8]) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut from = 0;
    while let Some(start) = find_log_start(data, from) {
        positions.push(start);
        from = start + LOG_START_MARKER.len();
    }
    positions
}

/// Column headers of one frame schema, applied once all names are known
#[derive(Default)]
struct SchemaColumns {
    names: Option<Vec<String>>,
    signed: Option<Vec<bool>>,
    predictors: Option<Vec<u8>>,
    encodings: Option<Vec<u8>>,
}

impl SchemaColumns {
    fn build(self) -> FrameDefinition {
        let mut frame_def = FrameDefinition::from_field_names(self.names.unwrap_or_default());
        frame_def.update_signed(&self.signed.unwrap_or_default());
        frame_def.update_predictors(&self.predictors.unwrap_or_default());
        frame_def.update_encoding(&self.encodings.unwrap_or_default());
        frame_def
    }
}

/// Parse the header block of the log starting at `log_start`.
///
/// Stops at the first line that is not an `H key:value` header and records
/// that line's offset as [`BBLHeader::data_start`] without consuming it.
/// Column headers may appear in any order relative to the name lists.
pub fn parse_headers(data: &[u8], log_start: usize) -> Result<BBLHeader> {
    let mut header = BBLHeader {
        data_version: 2,
        ..Default::default()
    };
    let mut stream = BBLDataStream::with_range(data, log_start, data.len());
    let mut intra = SchemaColumns::default();
    let mut inter = SchemaColumns::default();
    let mut slow = SchemaColumns::default();

    loop {
        let line_start = stream.position();
        if stream.peek_byte() != Some(b'H') {
            break;
        }
        let Some(line) = stream.read_line() else {
            break;
        };
        let Some((key, value)) = split_header_line(line) else {
            stream.set_position(line_start);
            break;
        };

        match key.as_str() {
            "Firmware type" => header.firmware_type = value.clone(),
            "Firmware revision" => header.firmware_revision = value.clone(),
            "Board information" => header.board_info = value.clone(),
            "Craft name" => header.craft_name = value.clone(),
            "Data version" => {
                if let Ok(version) = value.parse() {
                    header.data_version = version;
                }
            }
            "Field I name" => intra.names = Some(parse_field_names(&value)),
            "Field S name" => slow.names = Some(parse_field_names(&value)),
            "Field I signed" => intra.signed = Some(parse_signed_data(&value)),
            "Field S signed" => slow.signed = Some(parse_signed_data(&value)),
            "Field I predictor" => intra.predictors = Some(parse_numeric_data(&key, &value)),
            "Field P predictor" => inter.predictors = Some(parse_numeric_data(&key, &value)),
            "Field S predictor" => slow.predictors = Some(parse_numeric_data(&key, &value)),
            "Field I encoding" => intra.encodings = Some(parse_numeric_data(&key, &value)),
            "Field P encoding" => inter.encodings = Some(parse_numeric_data(&key, &value)),
            "Field S encoding" => slow.encodings = Some(parse_numeric_data(&key, &value)),
            _ => parse_sysconfig_value(&key, &value, &mut header.sysconfig),
        }

        header.raw_headers.push((key, value));
    }

    header.data_start = stream.position();

    // Inter fields take name and signedness from intra fields of the same ordinal
    inter.names = intra.names.clone();
    inter.signed = intra.signed.clone();
    header.i_frame_def = intra.build();
    header.p_frame_def = inter.build();
    header.s_frame_def = slow.build();

    header.constants = resolve_constants(&header.sysconfig);
    header.motor0_ordinal = header.i_frame_def.ordinal_of("motor[0]");

    debug!(
        firmware = %header.firmware_revision,
        intra_fields = header.i_frame_def.count(),
        slow_fields = header.s_frame_def.count(),
        data_start = header.data_start,
        "parsed log headers"
    );

    Ok(header)
}

/// Split `H key:value` into trimmed key and value
fn split_header_line(line: &[u8]) -> Option<(String, String)> {
    let text = std::str::from_utf8(line).ok()?;
    let rest = text.strip_prefix("H ")?;
    let (key, value) = rest.split_once(':')?;
    Some((key.trim().to_string(), value.trim().to_string()))
}

fn parse_field_names(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|name| rename_legacy_field(name.trim()))
        .collect()
}

/// Rewrite field names from older firmware to their current spelling
pub fn rename_legacy_field(name: &str) -> String {
    for (old_prefix, new_prefix) in LEGACY_FIELD_RENAMES {
        if let Some(rest) = name.strip_prefix(old_prefix) {
            return format!("{}{}", new_prefix, rest);
        }
    }
    name.to_string()
}

fn parse_signed_data(value: &str) -> Vec<bool> {
    value.split(',').map(|s| s.trim() == "1").collect()
}

/// Parse a predictor/encoding id list. Entries that are not ids become
/// [`UNKNOWN_COLUMN_ID`], which passes values through as a predictor and
/// fails per frame as an encoding.
fn parse_numeric_data(key: &str, value: &str) -> Vec<u8> {
    value
        .split(',')
        .map(|s| {
            s.trim().parse::<u8>().unwrap_or_else(|_| {
                warn!(header = key, entry = s.trim(), "unparseable column id");
                UNKNOWN_COLUMN_ID
            })
        })
        .collect()
}

fn parse_sysconfig_value(key: &str, value: &str, sysconfig: &mut HashMap<String, i32>) {
    if value.contains(',') {
        // Array values like motorOutput:48,2047
        for (i, part) in value.split(',').enumerate() {
            if let Ok(int_val) = part.trim().parse::<i32>() {
                sysconfig.insert(format!("{}[{}]", key, i), int_val);
            }
        }
    } else if let Ok(int_val) = value.parse::<i32>() {
        sysconfig.insert(key.to_string(), int_val);
    }
}

fn resolve_constants(sysconfig: &HashMap<String, i32>) -> DecodeConstants {
    let defaults = DecodeConstants::default();
    let motor_low = sysconfig
        .get("motorOutput[0]")
        .or_else(|| sysconfig.get("motorOutput"))
        .copied()
        .unwrap_or(DEFAULT_MOTOR_OUTPUT.0);
    let motor_high = sysconfig
        .get("motorOutput[1]")
        .copied()
        .unwrap_or(DEFAULT_MOTOR_OUTPUT.1);

    DecodeConstants {
        minthrottle: sysconfig
            .get("minthrottle")
            .copied()
            .unwrap_or(defaults.minthrottle),
        vbatref: sysconfig.get("vbatref").copied().unwrap_or(defaults.vbatref),
        motor_output: (motor_low, motor_high),
    }
}
