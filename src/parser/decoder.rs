use crate::error::{BBLError, Result};
use crate::parser::stream::BBLDataStream;
use crate::types::DecodeConstants;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// Field encoding ids as written in the "Field X encoding" headers
pub const ENCODING_SIGNED_VB: u8 = 0;
pub const ENCODING_UNSIGNED_VB: u8 = 1;
pub const ENCODING_NEG_14BIT: u8 = 3;
pub const ENCODING_ELIAS_DELTA_U32: u8 = 4;
pub const ENCODING_ELIAS_DELTA_S32: u8 = 5;
pub const ENCODING_TAG8_8SVB: u8 = 6;
pub const ENCODING_TAG2_3S32: u8 = 7;
pub const ENCODING_TAG8_4S16: u8 = 8;
pub const ENCODING_NULL: u8 = 9;
pub const ENCODING_TAG2_3SVARIABLE: u8 = 10;
pub const ENCODING_ELIAS_GAMMA_U32: u8 = 11;
pub const ENCODING_ELIAS_GAMMA_S32: u8 = 12;

// Predictor ids as written in the "Field X predictor" headers
pub const PREDICT_0: u8 = 0;
pub const PREDICT_PREVIOUS: u8 = 1;
pub const PREDICT_STRAIGHT_LINE: u8 = 2;
pub const PREDICT_AVERAGE_2: u8 = 3;
pub const PREDICT_MINTHROTTLE: u8 = 4;
pub const PREDICT_MOTOR_0: u8 = 5;
pub const PREDICT_INC: u8 = 6;
pub const PREDICT_HOME_COORD: u8 = 7;
pub const PREDICT_1500: u8 = 8;
pub const PREDICT_VBATREF: u8 = 9;
pub const PREDICT_LAST_MAIN_FRAME_TIME: u8 = 10;
pub const PREDICT_MINMOTOR: u8 = 11;

/// How a field's residual is laid out in the byte stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Encoding {
    SignedVb,
    UnsignedVb,
    Neg14Bit,
    EliasDeltaU32,
    EliasDeltaS32,
    Tag8_8Svb,
    Tag2_3S32,
    Tag8_4S16,
    Null,
    Tag2_3SVariable,
    EliasGammaU32,
    EliasGammaS32,
    Unknown(u8),
}

impl Encoding {
    pub fn from_id(id: u8) -> Self {
        match id {
            ENCODING_SIGNED_VB => Encoding::SignedVb,
            ENCODING_UNSIGNED_VB => Encoding::UnsignedVb,
            ENCODING_NEG_14BIT => Encoding::Neg14Bit,
            ENCODING_ELIAS_DELTA_U32 => Encoding::EliasDeltaU32,
            ENCODING_ELIAS_DELTA_S32 => Encoding::EliasDeltaS32,
            ENCODING_TAG8_8SVB => Encoding::Tag8_8Svb,
            ENCODING_TAG2_3S32 => Encoding::Tag2_3S32,
            ENCODING_TAG8_4S16 => Encoding::Tag8_4S16,
            ENCODING_NULL => Encoding::Null,
            ENCODING_TAG2_3SVARIABLE => Encoding::Tag2_3SVariable,
            ENCODING_ELIAS_GAMMA_U32 => Encoding::EliasGammaU32,
            ENCODING_ELIAS_GAMMA_S32 => Encoding::EliasGammaS32,
            other => Encoding::Unknown(other),
        }
    }

    /// Bit-packed encodings share a bit reader and must be byte-aligned afterwards.
    pub fn is_bit_packed(self) -> bool {
        matches!(
            self,
            Encoding::EliasDeltaU32
                | Encoding::EliasDeltaS32
                | Encoding::EliasGammaU32
                | Encoding::EliasGammaS32
        )
    }
}

/// Formula that turns a decoded residual into the field value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Predictor {
    Zero,
    Previous,
    StraightLine,
    Average2,
    MinThrottle,
    Motor0,
    Increment,
    HomeCoord,
    Fixed1500,
    VbatRef,
    LastMainFrameTime,
    MinMotor,
    Unknown(u8),
}

impl Predictor {
    pub fn from_id(id: u8) -> Self {
        match id {
            PREDICT_0 => Predictor::Zero,
            PREDICT_PREVIOUS => Predictor::Previous,
            PREDICT_STRAIGHT_LINE => Predictor::StraightLine,
            PREDICT_AVERAGE_2 => Predictor::Average2,
            PREDICT_MINTHROTTLE => Predictor::MinThrottle,
            PREDICT_MOTOR_0 => Predictor::Motor0,
            PREDICT_INC => Predictor::Increment,
            PREDICT_HOME_COORD => Predictor::HomeCoord,
            PREDICT_1500 => Predictor::Fixed1500,
            PREDICT_VBATREF => Predictor::VbatRef,
            PREDICT_LAST_MAIN_FRAME_TIME => Predictor::LastMainFrameTime,
            PREDICT_MINMOTOR => Predictor::MinMotor,
            other => Predictor::Unknown(other),
        }
    }
}

/// Everything a predictor may look at besides the residual
#[derive(Debug, Clone, Copy)]
pub struct PredictorContext<'c> {
    pub previous: Option<&'c [i32]>,
    pub previous2: Option<&'c [i32]>,
    /// Values already decoded earlier in the frame being built
    pub current: &'c [i32],
    pub constants: &'c DecodeConstants,
    pub motor0_ordinal: Option<usize>,
}

/// Decode a single byte-aligned field residual
pub fn decode_field_value(stream: &mut BBLDataStream, encoding: Encoding) -> Result<i32> {
    match encoding {
        Encoding::SignedVb => stream.read_signed_vb(),
        Encoding::UnsignedVb => Ok(stream.read_unsigned_vb()? as i32),
        Encoding::Neg14Bit => stream.read_neg_14bit(),
        Encoding::Null => Ok(0),
        Encoding::Unknown(id) => Err(BBLError::InvalidEncoding(id)),
        other => Err(BBLError::InvalidFrame(format!(
            "{:?} is not a single byte-aligned field encoding",
            other
        ))),
    }
}

/// Apply a predictor to a residual.
///
/// `Increment` never reaches this function because it reads no residual;
/// see [`predict_increment`]. Predictors this decoder does not model return
/// the residual unchanged.
pub fn apply_predictor(
    predictor: Predictor,
    ordinal: usize,
    residual: i32,
    ctx: &PredictorContext,
) -> i32 {
    let previous = ctx.previous.and_then(|prev| prev.get(ordinal).copied());
    // Without a second generation the previous frame stands in for it
    let previous2 = ctx
        .previous2
        .and_then(|prev2| prev2.get(ordinal).copied())
        .or(previous);

    match predictor {
        Predictor::Zero => residual,

        Predictor::Previous => residual.wrapping_add(previous.unwrap_or(0)),

        Predictor::StraightLine => {
            let prev = previous.unwrap_or(0);
            let prev2 = previous2.unwrap_or(0);
            residual.wrapping_add(prev.wrapping_mul(2).wrapping_sub(prev2))
        }

        Predictor::Average2 => {
            let sum = previous.unwrap_or(0) as i64 + previous2.unwrap_or(0) as i64;
            residual.wrapping_add(sum.div_euclid(2) as i32)
        }

        Predictor::MinThrottle => residual.wrapping_add(ctx.constants.minthrottle),

        Predictor::Fixed1500 => residual.wrapping_add(1500),

        Predictor::VbatRef => residual.wrapping_add(ctx.constants.vbatref),

        Predictor::MinMotor => residual.wrapping_add(ctx.constants.min_motor()),

        Predictor::Motor0 => {
            let motor0 = ctx
                .motor0_ordinal
                .and_then(|motor0_idx| ctx.current.get(motor0_idx).copied())
                .unwrap_or(0);
            residual.wrapping_add(motor0)
        }

        Predictor::Increment
        | Predictor::HomeCoord
        | Predictor::LastMainFrameTime
        | Predictor::Unknown(_) => residual,
    }
}

/// Value of an `Increment` field: one more than last time, 1 with no history.
pub fn predict_increment(ordinal: usize, previous: Option<&[i32]>) -> i32 {
    previous
        .and_then(|prev| prev.get(ordinal).copied())
        .unwrap_or(0)
        .wrapping_add(1)
}
