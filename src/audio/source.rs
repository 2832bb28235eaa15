//! Capture source abstraction.

use crate::error::{PolyvoxError, Result};
use std::collections::VecDeque;

/// A source of live audio chunks in the canonical format (16kHz mono i16).
///
/// This trait allows swapping implementations (real microphone vs mock).
pub trait CaptureSource: Send {
    /// Begin producing audio.
    fn start(&mut self) -> Result<()>;

    /// Stop producing audio. Must be safe to call more than once.
    fn stop(&mut self) -> Result<()>;

    /// Read the next chunk of samples.
    ///
    /// Returns `Ok(Some(chunk))` with whatever is buffered (possibly empty
    /// when a live device has produced nothing since the last read), or
    /// `Ok(None)` when the source is exhausted. Live microphones never
    /// return `None`; file- or test-backed sources do at end of stream.
    fn read_chunk(&mut self) -> Result<Option<Vec<i16>>>;
}

/// Mock capture source for testing: plays back a fixed queue of chunks,
/// then reports end of stream.
#[derive(Debug, Default)]
pub struct MockCaptureSource {
    chunks: VecDeque<Vec<i16>>,
    started: bool,
    should_fail_start: bool,
    should_fail_read: bool,
}

impl MockCaptureSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue chunks to be returned by successive reads.
    pub fn with_chunks(mut self, chunks: Vec<Vec<i16>>) -> Self {
        self.chunks = chunks.into();
        self
    }

    /// Configure the mock to fail on start.
    pub fn with_start_failure(mut self) -> Self {
        self.should_fail_start = true;
        self
    }

    /// Configure the mock to fail on read.
    pub fn with_read_failure(mut self) -> Self {
        self.should_fail_read = true;
        self
    }

    pub fn is_started(&self) -> bool {
        self.started
    }
}

impl CaptureSource for MockCaptureSource {
    fn start(&mut self) -> Result<()> {
        if self.should_fail_start {
            return Err(PolyvoxError::AudioCapture {
                message: "mock capture failure".to_string(),
            });
        }
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.started = false;
        Ok(())
    }

    fn read_chunk(&mut self) -> Result<Option<Vec<i16>>> {
        if self.should_fail_read {
            return Err(PolyvoxError::AudioCapture {
                message: "mock capture failure".to_string(),
            });
        }
        Ok(self.chunks.pop_front())
    }
}
