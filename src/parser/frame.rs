use crate::error::{BBLError, Result};
use crate::parser::bits::BBLBitStream;
use crate::parser::decoder::{
    apply_predictor, decode_field_value, predict_increment, Encoding, Predictor, PredictorContext,
};
use crate::parser::event::{skip_event_frame, EventOutcome};
use crate::parser::stream::BBLDataStream;
use crate::parser::tagged::MAX_GROUP_FIELDS;
use crate::types::{
    BBLHeader, DecodeConstants, DecodeOptions, DecodedSample, FieldDefinition, FrameDefinition,
    FrameHistory, FrameKind, FrameMarker, FrameStats,
};
use tracing::{debug, warn};

/// Progress is reported in steps of at least this many percentage points
pub const PROGRESS_STEP_PERCENT: u8 = 5;

/// Everything the frame loop produces for one log
#[derive(Debug, Clone, Default)]
pub struct FrameDecodeOutput {
    /// Intra and inter samples in stream order
    pub main_samples: Vec<DecodedSample>,
    pub slow_samples: Vec<DecodedSample>,
    pub error_count: u32,
    pub stats: FrameStats,
}

/// Per-frame prediction inputs, borrowed from the loop's history
struct FieldDecoder<'h> {
    previous: Option<&'h [i32]>,
    previous2: Option<&'h [i32]>,
    constants: &'h DecodeConstants,
    motor0_ordinal: Option<usize>,
}

impl<'h> FieldDecoder<'h> {
    fn resolve(&self, field: &FieldDefinition, residual: i32, current: &[i32]) -> i32 {
        if field.predictor == Predictor::Increment {
            return predict_increment(field.ordinal, self.previous);
        }
        let ctx = PredictorContext {
            previous: self.previous,
            previous2: self.previous2,
            current,
            constants: self.constants,
            motor0_ordinal: self.motor0_ordinal,
        };
        apply_predictor(field.predictor, field.ordinal, residual, &ctx)
    }

    /// Decode every field of `frame_def` in ordinal order
    fn decode(&self, stream: &mut BBLDataStream, frame_def: &FrameDefinition) -> Result<Vec<i32>> {
        let count = frame_def.count();
        let mut current = vec![0i32; count];
        let mut values = [0i32; MAX_GROUP_FIELDS];
        let mut i = 0;

        while i < count {
            let field = &frame_def.fields[i];

            // Increment fields carry no bytes at all
            if field.predictor == Predictor::Increment {
                current[i] = predict_increment(i, self.previous);
                i += 1;
                continue;
            }

            let group_size = match field.encoding {
                Encoding::Tag8_4S16 => {
                    stream.read_tag8_4s16(&mut values)?;
                    4
                }
                Encoding::Tag2_3S32 => {
                    stream.read_tag2_3s32(&mut values)?;
                    3
                }
                Encoding::Tag2_3SVariable => {
                    stream.read_tag2_3svariable(&mut values)?;
                    3
                }
                Encoding::Tag8_8Svb => {
                    let group_count = frame_def.fields[i..]
                        .iter()
                        .take(8)
                        .take_while(|f| f.encoding == Encoding::Tag8_8Svb)
                        .count();
                    stream.read_tag8_8svb(&mut values, group_count)?;
                    group_count
                }
                encoding if encoding.is_bit_packed() => {
                    i += self.decode_bit_packed_run(stream, frame_def, i, &mut current)?;
                    continue;
                }
                encoding => {
                    values[0] = decode_field_value(stream, encoding)?;
                    1
                }
            };

            // Groups running past the last field are decoded whole; extras are dropped
            let group_end = (i + group_size).min(count);
            for (j, ordinal) in (i..group_end).enumerate() {
                current[ordinal] = self.resolve(&frame_def.fields[ordinal], values[j], &current);
            }
            i += group_size;
        }

        Ok(current)
    }

    /// Decode consecutive bit-packed fields through one bit reader, then byte-align
    fn decode_bit_packed_run(
        &self,
        stream: &mut BBLDataStream,
        frame_def: &FrameDefinition,
        start: usize,
        current: &mut [i32],
    ) -> Result<usize> {
        let mut bits = BBLBitStream::new(stream);
        let mut consumed = 0;

        for field in frame_def.fields[start..]
            .iter()
            .take_while(|f| f.encoding.is_bit_packed())
        {
            let residual = match field.encoding {
                _ if field.predictor == Predictor::Increment => 0,
                Encoding::EliasDeltaU32 => bits.read_elias_delta_u32()? as i32,
                Encoding::EliasDeltaS32 => bits.read_elias_delta_s32()?,
                Encoding::EliasGammaU32 => bits.read_elias_gamma_u32()? as i32,
                _ => bits.read_elias_gamma_s32()?,
            };
            current[field.ordinal] = self.resolve(field, residual, current);
            consumed += 1;
        }

        bits.byte_align();
        Ok(consumed)
    }
}

/// What the loop should do after one frame
enum FrameOutcome {
    Decoded,
    /// Frame type not field-decoded; continue from the next marker
    Skip,
    LogEnd,
}

/// Tracks bytes consumed and reports progress in coarse steps
struct ProgressTracker {
    start: usize,
    end: usize,
    last_reported: Option<u8>,
}

impl ProgressTracker {
    fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            last_reported: None,
        }
    }

    fn update<F: FnMut(u8, &str)>(&mut self, pos: usize, progress: &mut F) {
        let span = self.end.saturating_sub(self.start);
        let percent = if span == 0 {
            100
        } else {
            (pos.saturating_sub(self.start).min(span) * 100 / span) as u8
        };
        let due = match self.last_reported {
            None => true,
            Some(last) => {
                percent >= last.saturating_add(PROGRESS_STEP_PERCENT)
                    || (percent == 100 && last < 100)
            }
        };
        if due {
            self.last_reported = Some(percent);
            progress(percent, "Decoding frames");
        }
    }
}

/// Walk the binary section of one log frame by frame.
///
/// Decoding never aborts: a frame that fails is counted, and the loop
/// resumes at the next marker byte strictly after the failed frame's start.
/// `data_end` bounds the log (the next log's start, or the buffer end).
pub fn parse_frames<F: FnMut(u8, &str)>(
    data: &[u8],
    header: &BBLHeader,
    data_end: usize,
    options: &DecodeOptions,
    progress: &mut F,
) -> FrameDecodeOutput {
    let mut output = FrameDecodeOutput::default();
    let mut history = FrameHistory::new();
    let mut slow_history: Option<Vec<i32>> = None;
    let mut stream = BBLDataStream::with_range(data, header.data_start, data_end);
    let mut tracker = ProgressTracker::new(stream.position(), stream.end());

    debug!(
        start = stream.position(),
        end = stream.end(),
        "decoding binary frames"
    );
    tracker.update(stream.position(), progress);

    while let Some(marker_byte) = stream.peek_byte() {
        let frame_start = stream.position();

        let result = match FrameMarker::from_byte(marker_byte) {
            Some(marker) => {
                stream.set_position(frame_start + 1);
                decode_frame(
                    &mut stream,
                    marker,
                    header,
                    &mut history,
                    &mut slow_history,
                    &mut output,
                )
            }
            None => Err(BBLError::UnknownMarker(marker_byte)),
        };

        match result {
            Ok(FrameOutcome::Decoded) => {}
            Ok(FrameOutcome::Skip) => {
                stream.skip_to_next_marker();
            }
            Ok(FrameOutcome::LogEnd) => {
                output.stats.log_end_seen = true;
                debug!(offset = frame_start, "end of log event");
                break;
            }
            Err(err) => {
                output.error_count += 1;
                output.stats.failed_frames += 1;
                if output.error_count <= 3 {
                    debug!(offset = frame_start, error = %err, "frame failed, resynchronizing");
                }
                stream.set_position(frame_start + 1);
                stream.skip_to_next_marker();

                if let Some(max_errors) = options.max_errors {
                    if output.error_count >= max_errors {
                        warn!(max_errors, "decode error limit reached, stopping");
                        break;
                    }
                }
            }
        }

        tracker.update(stream.position(), progress);
    }

    tracker.update(stream.end(), progress);
    output.stats.total_bytes = (stream.end() - header.data_start.min(stream.end())) as u64;

    if output.error_count > 0 {
        warn!(
            errors = output.error_count,
            frames = output.main_samples.len(),
            "recovered from corrupted frames"
        );
    }

    output
}

fn decode_frame(
    stream: &mut BBLDataStream,
    marker: FrameMarker,
    header: &BBLHeader,
    history: &mut FrameHistory,
    slow_history: &mut Option<Vec<i32>>,
    output: &mut FrameDecodeOutput,
) -> Result<FrameOutcome> {
    let frame_start = stream.position() - 1;

    match marker {
        FrameMarker::Intra => {
            if header.i_frame_def.is_empty() {
                return Err(BBLError::InvalidFrame("no intra field definitions".to_string()));
            }
            let values = FieldDecoder {
                previous: history.previous(),
                previous2: None,
                constants: &header.constants,
                motor0_ordinal: header.motor0_ordinal,
            }
            .decode(stream, &header.i_frame_def)?;

            history.reset_to(&values);
            output.stats.i_frames += 1;
            output.main_samples.push(DecodedSample {
                kind: FrameKind::Intra,
                values,
                offset: frame_start,
            });
        }
        FrameMarker::Inter => {
            if !history.is_valid() || header.p_frame_def.is_empty() {
                return Err(BBLError::InvalidFrame(
                    "inter frame without a preceding intra frame".to_string(),
                ));
            }
            let values = FieldDecoder {
                previous: history.previous(),
                previous2: history.previous2(),
                constants: &header.constants,
                motor0_ordinal: header.motor0_ordinal,
            }
            .decode(stream, &header.p_frame_def)?;

            history.advance(values.clone());
            output.stats.p_frames += 1;
            output.main_samples.push(DecodedSample {
                kind: FrameKind::Inter,
                values,
                offset: frame_start,
            });
        }
        FrameMarker::Slow => {
            if header.s_frame_def.is_empty() {
                return Err(BBLError::InvalidFrame("no slow field definitions".to_string()));
            }
            let values = FieldDecoder {
                previous: slow_history.as_deref(),
                previous2: None,
                constants: &header.constants,
                motor0_ordinal: None,
            }
            .decode(stream, &header.s_frame_def)?;

            *slow_history = Some(values.clone());
            output.stats.s_frames += 1;
            output.slow_samples.push(DecodedSample {
                kind: FrameKind::Slow,
                values,
                offset: frame_start,
            });
        }
        FrameMarker::Event => {
            let outcome = skip_event_frame(stream)?;
            output.stats.e_frames += 1;
            if outcome == EventOutcome::LogEnd {
                return Ok(FrameOutcome::LogEnd);
            }
        }
        FrameMarker::Gps => {
            output.stats.g_frames += 1;
            return Ok(FrameOutcome::Skip);
        }
        FrameMarker::GpsHome => {
            output.stats.h_frames += 1;
            return Ok(FrameOutcome::Skip);
        }
    }

    Ok(FrameOutcome::Decoded)
}
