use std::fmt;

/// Error types for blackbox log decoding
#[derive(Debug)]
pub enum BBLError {
    /// I/O errors (export only; decoding never touches the filesystem)
    Io(std::io::Error),
    /// Read past the end of the data region
    UnexpectedEof,
    /// Malformed header line or attribute list
    InvalidHeader(String),
    /// Frame content that cannot be decoded
    InvalidFrame(String),
    /// Field encoding id not known to this decoder
    InvalidEncoding(u8),
    /// Byte that is not a frame marker where one was expected
    UnknownMarker(u8),
    /// Event type with no known payload shape
    UnknownEvent(u8),
    /// The buffer does not contain a log start marker
    NoLogStart,
    /// Headers were found but no main frame field definitions
    NoFieldDefinitions,
    /// Headers parsed but not a single main frame decoded
    NoFrames { errors: u32 },
    /// Export format error
    Export(String),
}

impl BBLError {
    /// Fatal errors abort a decode; everything else is recovered per frame.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BBLError::NoLogStart
                | BBLError::NoFieldDefinitions
                | BBLError::NoFrames { .. }
        )
    }
}

impl fmt::Display for BBLError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BBLError::Io(err) => write!(f, "I/O error: {}", err),
            BBLError::UnexpectedEof => write!(f, "Unexpected end of data"),
            BBLError::InvalidHeader(msg) => write!(f, "Invalid header: {}", msg),
            BBLError::InvalidFrame(msg) => write!(f, "Invalid frame: {}", msg),
            BBLError::InvalidEncoding(encoding) => write!(f, "Invalid encoding type: {}", encoding),
            BBLError::UnknownMarker(byte) => write!(f, "Unknown frame marker 0x{:02X}", byte),
            BBLError::UnknownEvent(event) => write!(f, "Unknown event type: {}", event),
            BBLError::NoLogStart => {
                write!(f, "Not a recognized blackbox log: no log start marker found")
            }
            BBLError::NoFieldDefinitions => write!(
                f,
                "Not a recognized blackbox log: headers contain no field definitions"
            ),
            BBLError::NoFrames { errors } => write!(
                f,
                "Corrupted or empty log: no data frames could be decoded ({} decode errors)",
                errors
            ),
            BBLError::Export(msg) => write!(f, "Export error: {}", msg),
        }
    }
}

impl std::error::Error for BBLError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BBLError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for BBLError {
    fn from(err: std::io::Error) -> Self {
        BBLError::Io(err)
    }
}

pub type Result<T> = std::result::Result<T, BBLError>;
