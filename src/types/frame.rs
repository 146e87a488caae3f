use crate::parser::decoder::{Encoding, Predictor};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Field definition for a frame type
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FieldDefinition {
    pub name: String,
    pub signed: bool,
    pub predictor: Predictor,
    pub encoding: Encoding,
    pub ordinal: usize,
}

/// Ordered field layout of one frame type, as declared by the log headers
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameDefinition {
    pub fields: Vec<FieldDefinition>,
}

impl FrameDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_field_names(names: Vec<String>) -> Self {
        let fields = names
            .into_iter()
            .enumerate()
            .map(|(ordinal, name)| FieldDefinition {
                name,
                signed: false,
                predictor: Predictor::Zero,
                encoding: Encoding::SignedVb,
                ordinal,
            })
            .collect();
        Self { fields }
    }

    pub fn count(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|field| field.name.clone()).collect()
    }

    pub fn ordinal_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    pub fn update_signed(&mut self, signed_data: &[bool]) {
        for (field, &signed) in self.fields.iter_mut().zip(signed_data) {
            field.signed = signed;
        }
    }

    pub fn update_predictors(&mut self, predictors: &[u8]) {
        for (field, &predictor) in self.fields.iter_mut().zip(predictors) {
            field.predictor = Predictor::from_id(predictor);
        }
    }

    pub fn update_encoding(&mut self, encodings: &[u8]) {
        for (field, &encoding) in self.fields.iter_mut().zip(encodings) {
            field.encoding = Encoding::from_id(encoding);
        }
    }
}

/// Single-byte frame markers that start every binary frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameMarker {
    Intra,
    Inter,
    Slow,
    Event,
    Gps,
    GpsHome,
}

impl FrameMarker {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'I' => Some(FrameMarker::Intra),
            b'P' => Some(FrameMarker::Inter),
            b'S' => Some(FrameMarker::Slow),
            b'E' => Some(FrameMarker::Event),
            b'G' => Some(FrameMarker::Gps),
            b'H' => Some(FrameMarker::GpsHome),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            FrameMarker::Intra => b'I',
            FrameMarker::Inter => b'P',
            FrameMarker::Slow => b'S',
            FrameMarker::Event => b'E',
            FrameMarker::Gps => b'G',
            FrameMarker::GpsHome => b'H',
        }
    }
}

/// Kind of a field-decoded frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FrameKind {
    Intra,
    Inter,
    Slow,
}

impl FrameKind {
    pub fn as_char(self) -> char {
        match self {
            FrameKind::Intra => 'I',
            FrameKind::Inter => 'P',
            FrameKind::Slow => 'S',
        }
    }
}

/// Ordinal-indexed field values of one decoded frame
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DecodedSample {
    pub kind: FrameKind,
    pub values: Vec<i32>,
    /// Byte offset of the frame marker in the log buffer
    pub offset: usize,
}

/// Frame statistics
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameStats {
    pub i_frames: u32,
    pub p_frames: u32,
    pub s_frames: u32,
    pub e_frames: u32,
    pub g_frames: u32,
    pub h_frames: u32,
    pub failed_frames: u32,
    pub total_bytes: u64,
    pub log_end_seen: bool,
}

impl FrameStats {
    pub fn main_frames(&self) -> u32 {
        self.i_frames + self.p_frames
    }
}

/// Main-stream history for prediction during decoding
///
/// Both generations are `None` until the first intra frame arrives.
#[derive(Debug, Default)]
pub struct FrameHistory {
    pub previous_frame: Option<Vec<i32>>,
    pub previous2_frame: Option<Vec<i32>>,
}

impl FrameHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.previous_frame.is_some()
    }

    /// A keyframe replaces both generations.
    pub fn reset_to(&mut self, keyframe: &[i32]) {
        self.previous_frame = Some(keyframe.to_vec());
        self.previous2_frame = Some(keyframe.to_vec());
    }

    /// A delta frame shifts the generations by one.
    pub fn advance(&mut self, frame: Vec<i32>) {
        self.previous2_frame = self.previous_frame.take();
        self.previous_frame = Some(frame);
    }

    pub fn previous(&self) -> Option<&[i32]> {
        self.previous_frame.as_deref()
    }

    pub fn previous2(&self) -> Option<&[i32]> {
        self.previous2_frame.as_deref()
    }
}
