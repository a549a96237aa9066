// Sample feed - chunked dump reassembly
//
// The logger streams its memory as JSON messages: a `dump_start` announcing
// the sample count, any number of `data_chunk`s carrying 6-tuples, then a
// `dump_end`. `SampleAccumulator` collects the chunks and hands back a
// processed `Dataset` once the dump is complete.

use serde::{Deserialize, Serialize};

use crate::analysis::{RawSample, SAMPLES_PER_SEGMENT};
use crate::error::{log_feed_error, FeedError};

use super::Dataset;

/// Most samples reserved up front for one dump: a full day at 20 Hz.
/// Larger announcements still work; the buffer grows as chunks arrive.
const MAX_PREALLOCATED_SAMPLES: usize = SAMPLES_PER_SEGMENT * 28_800;

/// One message from the logger's transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedMessage {
    Connected,
    DumpStart {
        samples: usize,
    },
    DataChunk {
        #[serde(default)]
        samples: Vec<RawSample>,
    },
    DumpEnd,
    Erasing,
    EraseDone,
    Bird,
}

impl FeedMessage {
    /// Wire name of the message type
    pub fn kind(&self) -> &'static str {
        match self {
            FeedMessage::Connected => "connected",
            FeedMessage::DumpStart { .. } => "dump_start",
            FeedMessage::DataChunk { .. } => "data_chunk",
            FeedMessage::DumpEnd => "dump_end",
            FeedMessage::Erasing => "erasing",
            FeedMessage::EraseDone => "erase_done",
            FeedMessage::Bird => "bird",
        }
    }
}

/// Where the accumulator is in the dump protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedState {
    #[default]
    Idle,
    Receiving,
    Complete,
}

/// What handling one message produced
#[derive(Debug, Clone, PartialEq)]
pub enum FeedUpdate {
    /// The logger reported a connection
    Connected,
    /// A dump began; `expected` samples announced
    Started { expected: usize },
    /// Receive progress in whole percent
    Progress { percent: u32 },
    /// The dump finished and was processed
    Complete(Box<Dataset>),
    /// A message with no effect on the dump
    Ignored { kind: &'static str },
}

/// Reassembles a chunked sample dump.
#[derive(Debug, Default)]
pub struct SampleAccumulator {
    state: FeedState,
    expected: usize,
    received: Vec<RawSample>,
}

impl SampleAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FeedState {
        self.state
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn received(&self) -> usize {
        self.received.len()
    }

    /// Receive progress in whole percent; 100 once everything announced arrived.
    pub fn progress_percent(&self) -> u32 {
        if self.expected == 0 {
            return 100;
        }
        let percent = (self.received.len() as f64 / self.expected as f64 * 100.0).round();
        percent.min(100.0) as u32
    }

    /// Decode one raw text frame and handle it.
    pub fn handle_text(&mut self, text: &str) -> Result<FeedUpdate, FeedError> {
        let message: FeedMessage = serde_json::from_str(text).map_err(|err| {
            let err = FeedError::from(err);
            log_feed_error(&err, "handle_text");
            err
        })?;
        self.handle(message)
    }

    /// Advance the dump protocol by one message.
    ///
    /// A `dump_start` always begins a fresh dump, discarding anything
    /// partially received. A chunk containing a non-finite value is rejected
    /// whole and the dump stays open.
    pub fn handle(&mut self, message: FeedMessage) -> Result<FeedUpdate, FeedError> {
        let result = self.apply(message);
        if let Err(err) = &result {
            log_feed_error(err, "handle");
        }
        result
    }

    fn apply(&mut self, message: FeedMessage) -> Result<FeedUpdate, FeedError> {
        match message {
            FeedMessage::Connected => {
                log::info!("[Feed] Logger connected");
                Ok(FeedUpdate::Connected)
            }
            FeedMessage::DumpStart { samples } => {
                if self.state == FeedState::Receiving {
                    log::warn!(
                        "[Feed] New dump started, dropping {} partial samples",
                        self.received.len()
                    );
                }
                self.state = FeedState::Receiving;
                self.expected = samples;
                self.received = Vec::with_capacity(samples.min(MAX_PREALLOCATED_SAMPLES));
                log::info!("[Feed] Receiving dump of {} samples", samples);
                Ok(FeedUpdate::Started { expected: samples })
            }
            FeedMessage::DataChunk { samples } => {
                if self.state != FeedState::Receiving {
                    return Err(FeedError::UnexpectedMessage {
                        kind: "data_chunk".to_string(),
                    });
                }
                if let Some(offset) = samples.iter().position(|s| !s.is_finite()) {
                    return Err(FeedError::MalformedSample {
                        index: self.received.len() + offset,
                    });
                }
                self.received.extend(samples);
                let percent = self.progress_percent();
                log::debug!(
                    "[Feed] {}/{} samples ({}%)",
                    self.received.len(),
                    self.expected,
                    percent
                );
                Ok(FeedUpdate::Progress { percent })
            }
            FeedMessage::DumpEnd => {
                if self.state != FeedState::Receiving {
                    return Err(FeedError::NotReceiving);
                }
                if self.received.len() != self.expected {
                    log::warn!(
                        "[Feed] Dump ended with {} of {} announced samples",
                        self.received.len(),
                        self.expected
                    );
                }
                self.state = FeedState::Complete;
                let samples = std::mem::take(&mut self.received);
                Ok(FeedUpdate::Complete(Box::new(Dataset::from_samples(&samples))))
            }
            other => Ok(FeedUpdate::Ignored { kind: other.kind() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(count: usize) -> FeedMessage {
        FeedMessage::DataChunk {
            samples: vec![RawSample::at_rest(); count],
        }
    }

    #[test]
    fn test_messages_decode_from_wire_format() {
        let start: FeedMessage = serde_json::from_str(r#"{"type":"dump_start","samples":120}"#).unwrap();
        assert_eq!(start, FeedMessage::DumpStart { samples: 120 });

        let data: FeedMessage = serde_json::from_str(
            r#"{"type":"data_chunk","samples":[[0,0,1,0,0,0],[0.1,0.2,0.9,1.5,0,0]]}"#,
        )
        .unwrap();
        match data {
            FeedMessage::DataChunk { samples } => {
                assert_eq!(samples.len(), 2);
                assert_eq!(samples[1].gyro, [1.5, 0.0, 0.0]);
            }
            other => panic!("unexpected {:?}", other),
        }

        let bird: FeedMessage = serde_json::from_str(r#"{"type":"bird","name":"pip"}"#).unwrap();
        assert_eq!(bird, FeedMessage::Bird);
    }

    #[test]
    fn test_full_dump_produces_dataset() {
        let mut acc = SampleAccumulator::new();
        assert_eq!(
            acc.handle(FeedMessage::DumpStart { samples: 120 }).unwrap(),
            FeedUpdate::Started { expected: 120 }
        );
        assert_eq!(
            acc.handle(chunk(40)).unwrap(),
            FeedUpdate::Progress { percent: 33 }
        );
        assert_eq!(
            acc.handle(chunk(80)).unwrap(),
            FeedUpdate::Progress { percent: 100 }
        );

        match acc.handle(FeedMessage::DumpEnd).unwrap() {
            FeedUpdate::Complete(dataset) => {
                assert_eq!(dataset.metadata.sample_count, 120);
                assert_eq!(dataset.metadata.segment_count, 2);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(acc.state(), FeedState::Complete);
        assert_eq!(acc.received(), 0);
    }

    #[test]
    fn test_chunk_outside_dump_is_rejected() {
        let mut acc = SampleAccumulator::new();
        assert!(matches!(
            acc.handle(chunk(3)),
            Err(FeedError::UnexpectedMessage { .. })
        ));
        assert_eq!(acc.handle(FeedMessage::DumpEnd), Err(FeedError::NotReceiving));
        assert_eq!(acc.state(), FeedState::Idle);
    }

    #[test]
    fn test_malformed_chunk_is_dropped_whole() {
        let mut acc = SampleAccumulator::new();
        acc.handle(FeedMessage::DumpStart { samples: 10 }).unwrap();
        acc.handle(chunk(4)).unwrap();

        let mut bad = vec![RawSample::at_rest(); 3];
        bad[2].accel[0] = f64::NAN;
        assert_eq!(
            acc.handle(FeedMessage::DataChunk { samples: bad }),
            Err(FeedError::MalformedSample { index: 6 })
        );
        assert_eq!(acc.received(), 4);
        assert_eq!(acc.state(), FeedState::Receiving);
    }

    #[test]
    fn test_restart_discards_partial_dump() {
        let mut acc = SampleAccumulator::new();
        acc.handle(FeedMessage::DumpStart { samples: 100 }).unwrap();
        acc.handle(chunk(50)).unwrap();
        acc.handle(FeedMessage::DumpStart { samples: 20 }).unwrap();
        assert_eq!(acc.received(), 0);
        assert_eq!(acc.progress_percent(), 0);
    }

    #[test]
    fn test_status_messages_are_ignored() {
        let mut acc = SampleAccumulator::new();
        assert_eq!(
            acc.handle(FeedMessage::Connected).unwrap(),
            FeedUpdate::Connected
        );
        assert_eq!(
            acc.handle_text(r#"{"type":"erase_done"}"#).unwrap(),
            FeedUpdate::Ignored { kind: "erase_done" }
        );
        assert!(matches!(
            acc.handle_text("not json"),
            Err(FeedError::Decode { .. })
        ));
    }

    #[test]
    fn test_oversized_announcement_does_not_preallocate() {
        let mut acc = SampleAccumulator::new();
        assert_eq!(
            acc.handle_text(r#"{"type":"dump_start","samples":18446744073709551615}"#)
                .unwrap(),
            FeedUpdate::Started {
                expected: usize::MAX
            }
        );
        assert_eq!(acc.state(), FeedState::Receiving);

        acc.handle(chunk(60)).unwrap();
        assert_eq!(acc.received(), 60);
        assert_eq!(acc.progress_percent(), 0);
        match acc.handle(FeedMessage::DumpEnd).unwrap() {
            FeedUpdate::Complete(dataset) => assert_eq!(dataset.metadata.sample_count, 60),
            other => panic!("unexpected {:?}", other),
        }
    }
}
