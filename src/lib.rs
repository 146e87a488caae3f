//! BBL Decoder Library
//!
//! A Rust library for decoding Betaflight/EmuFlight/INAV blackbox flight
//! logs into timestamped telemetry frames. Decoding is tolerant of corrupted
//! flash data: damaged frames are counted and skipped, and the decoder
//! resynchronizes on the next frame marker.
//!
//! # Features
//!
//! - **`csv`** (default): Enable CSV export functionality
//! - **`cli`** (default): Build the command-line interface binary
//! - **`json`**: Enable metadata export in JSON format
//! - **`serde`**: Enable serialization/deserialization of types
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use bbl_decoder::decode_log;
//!
//! let data = std::fs::read("flight.BBL").unwrap();
//! let log = decode_log(&data, |percent, stage| println!("{percent:3}% {stage}")).unwrap();
//! println!("Decoded {} frames", log.frames.len());
//! println!("Flight duration: {:.1} s", log.metadata.duration_seconds);
//! if let Some(warning) = &log.warning {
//!     println!("Warning: {warning}");
//! }
//! ```
//!
//! # Public API
//!
//! ## Decoding Functions
//! - [`decode_log`] - Decode the first log in a buffer
//! - [`decode_log_with_options`] - Same, with [`DecodeOptions`]
//! - [`decode_all_logs`] - Decode every concatenated log in a buffer
//!
//! ## Data Types
//! - [`DecodedLog`] - Mapped frames, slow samples and metadata of one log
//! - [`FlightFrame`] - One mapped sample
//! - [`LogMetadata`] - Firmware, rates and tuning snapshots
//! - [`BBLError`] - Decode and export errors
//!
//! ## Export Functions
//! - [`export_log`] - Write CSV and JSON files for a decoded log
//! - [`compute_export_paths`] - Helper for consistent path computation

pub mod conversion;
pub mod error;
pub mod export;
pub mod parser;
pub mod types;

pub use conversion::*;
pub use error::*;
pub use export::*;
#[allow(ambiguous_glob_reexports)]
pub use parser::*;
#[allow(ambiguous_glob_reexports)]
pub use types::*;
