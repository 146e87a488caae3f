//! Event frame skipping
//!
//! Event payloads are not interpreted; each known event type has a fixed
//! payload shape that is read and discarded so the decoder stays in step.

use crate::error::{BBLError, Result};
use crate::parser::stream::BBLDataStream;

pub const EVENT_SYNC_BEEP: u8 = 0;
pub const EVENT_INFLIGHT_ADJUSTMENT: u8 = 13;
pub const EVENT_LOGGING_RESUME: u8 = 14;
pub const EVENT_DISARM: u8 = 15;
pub const EVENT_FLIGHT_MODE: u8 = 30;
pub const EVENT_LOG_END: u8 = 255;

/// Payload that follows the log-end event type byte
pub const LOG_END_MESSAGE: &[u8] = b"End of log\0";

/// Result of skipping one event frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Skipped(u8),
    /// A verified end-of-log event; nothing after it belongs to this log
    LogEnd,
}

/// Skip the payload of an event frame; the marker byte is already consumed.
pub fn skip_event_frame(stream: &mut BBLDataStream) -> Result<EventOutcome> {
    let event_type = stream.read_byte()?;

    match event_type {
        EVENT_SYNC_BEEP | EVENT_DISARM => {
            stream.read_unsigned_vb()?;
        }
        EVENT_INFLIGHT_ADJUSTMENT => {
            let adjustment_function = stream.read_byte()?;
            if adjustment_function > 127 {
                // Float payload
                stream.read_raw_bytes(4)?;
            } else {
                stream.read_signed_vb()?;
            }
        }
        EVENT_LOGGING_RESUME | EVENT_FLIGHT_MODE => {
            stream.read_unsigned_vb()?;
            stream.read_unsigned_vb()?;
        }
        EVENT_LOG_END => {
            let message = stream.read_raw_bytes(LOG_END_MESSAGE.len())?;
            if message != LOG_END_MESSAGE {
                return Err(BBLError::InvalidFrame(
                    "log end event without end-of-log message".to_string(),
                ));
            }
            return Ok(EventOutcome::LogEnd);
        }
        other => return Err(BBLError::UnknownEvent(other)),
    }

    Ok(EventOutcome::Skipped(event_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_varint_events() {
        let data = [EVENT_SYNC_BEEP, 0x80, 0x01, EVENT_LOGGING_RESUME, 0x05, 0x06, b'I'];
        let mut stream = BBLDataStream::new(&data);
        assert_eq!(
            skip_event_frame(&mut stream).unwrap(),
            EventOutcome::Skipped(EVENT_SYNC_BEEP)
        );
        assert_eq!(
            skip_event_frame(&mut stream).unwrap(),
            EventOutcome::Skipped(EVENT_LOGGING_RESUME)
        );
        assert_eq!(stream.peek_byte(), Some(b'I'));
    }

    #[test]
    fn test_skip_inflight_adjustment() {
        let data = [
            EVENT_INFLIGHT_ADJUSTMENT,
            0x80,
            1,
            2,
            3,
            4,
            EVENT_INFLIGHT_ADJUSTMENT,
            0x05,
            0x03,
        ];
        let mut stream = BBLDataStream::new(&data);
        skip_event_frame(&mut stream).unwrap();
        assert_eq!(stream.position(), 6);
        skip_event_frame(&mut stream).unwrap();
        assert!(stream.eof);
    }

    #[test]
    fn test_log_end() {
        let mut data = vec![EVENT_LOG_END];
        data.extend_from_slice(LOG_END_MESSAGE);
        let mut stream = BBLDataStream::new(&data);
        assert_eq!(skip_event_frame(&mut stream).unwrap(), EventOutcome::LogEnd);
    }

    #[test]
    fn test_log_end_false_positive() {
        let mut data = vec![EVENT_LOG_END];
        data.extend_from_slice(b"End of lag\0");
        let mut stream = BBLDataStream::new(&data);
        assert!(matches!(
            skip_event_frame(&mut stream),
            Err(BBLError::InvalidFrame(_))
        ));
    }

    #[test]
    fn test_unknown_event() {
        let data = [0x42, 0x00];
        let mut stream = BBLDataStream::new(&data);
        assert!(matches!(
            skip_event_frame(&mut stream),
            Err(BBLError::UnknownEvent(0x42))
        ));
    }
}
