//! Utterance end-point detection.
//!
//! An RMS state machine that watches a capture stream and decides when the
//! speaker has finished: speech must last at least `min_speech_ms`, and the
//! utterance ends once `trailing_silence_ms` of silence follows it. Timing is
//! derived from sample counts, not wall clock, so the detector behaves
//! identically on live and replayed audio.

use crate::audio::source::CaptureSource;
use crate::defaults;
use crate::error::{PolyvoxError, Result};
use std::time::{Duration, Instant};

/// Poll interval while a live source has no buffered samples.
const IDLE_POLL: Duration = Duration::from_millis(10);

/// Configuration for the end-pointer.
#[derive(Debug, Clone, Copy)]
pub struct EndPointConfig {
    /// RMS threshold (0.0 to 1.0) above which a chunk counts as speech.
    pub speech_threshold: f32,
    /// Trailing silence before the utterance is considered ended.
    pub trailing_silence_ms: u32,
    /// Minimum speech duration before trailing silence may end it.
    pub min_speech_ms: u32,
    /// Sample rate used to convert sample counts to durations.
    pub sample_rate: u32,
}

impl Default for EndPointConfig {
    fn default() -> Self {
        Self {
            speech_threshold: defaults::SPEECH_THRESHOLD,
            trailing_silence_ms: defaults::TRAILING_SILENCE_MS,
            min_speech_ms: defaults::MIN_SPEECH_MS,
            sample_rate: defaults::SAMPLE_RATE,
        }
    }
}

/// What the detector concluded from the latest chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtteranceEvent {
    /// Still waiting for speech to begin.
    Pending,
    /// Speech crossed the threshold for the first time.
    SpeechStart,
    /// Speech (or a pause shorter than the silence window) is ongoing.
    Speech,
    /// Enough trailing silence accumulated; the utterance is complete.
    Complete,
}

/// Sample-count-based utterance end-pointer.
#[derive(Debug)]
pub struct EndPointer {
    config: EndPointConfig,
    speech_samples: u64,
    silence_run_samples: u64,
    saw_speech: bool,
    complete: bool,
}

impl EndPointer {
    pub fn new(config: EndPointConfig) -> Self {
        Self {
            config,
            speech_samples: 0,
            silence_run_samples: 0,
            saw_speech: false,
            complete: false,
        }
    }

    fn ms_to_samples(&self, ms: u32) -> u64 {
        u64::from(ms) * u64::from(self.config.sample_rate) / 1000
    }

    /// Feed the next chunk and learn whether the utterance is over.
    pub fn push(&mut self, chunk: &[i16]) -> UtteranceEvent {
        if self.complete {
            return UtteranceEvent::Complete;
        }
        let level = rms(chunk);
        let is_speech = level > self.config.speech_threshold;

        if is_speech {
            let started = !self.saw_speech;
            self.saw_speech = true;
            self.speech_samples += chunk.len() as u64;
            self.silence_run_samples = 0;
            if started {
                return UtteranceEvent::SpeechStart;
            }
            return UtteranceEvent::Speech;
        }

        if !self.saw_speech {
            return UtteranceEvent::Pending;
        }

        self.silence_run_samples += chunk.len() as u64;
        let min_speech = self.ms_to_samples(self.config.min_speech_ms);
        let silence_window = self.ms_to_samples(self.config.trailing_silence_ms);
        if self.speech_samples >= min_speech && self.silence_run_samples >= silence_window {
            self.complete = true;
            return UtteranceEvent::Complete;
        }
        UtteranceEvent::Speech
    }

    /// Whether any chunk has crossed the speech threshold.
    pub fn saw_speech(&self) -> bool {
        self.saw_speech
    }
}

/// RMS of 16-bit samples, normalized to 0.0..=1.0.
pub fn rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples
        .iter()
        .map(|&s| {
            let v = f64::from(s) / f64::from(i16::MAX);
            v * v
        })
        .sum();
    (sum_sq / samples.len() as f64).sqrt() as f32
}

/// Record one utterance from a capture source.
///
/// Blocks until the end-pointer reports completion, the source is exhausted,
/// or `max_duration` of wall time passes. A timeout with no speech at all is
/// an error; a timeout after speech returns what was captured, leaving the
/// decision about usability to the transcriber.
pub fn record_utterance(
    source: &mut dyn CaptureSource,
    config: EndPointConfig,
    max_duration: Duration,
) -> Result<Vec<i16>> {
    source.start()?;
    let mut detector = EndPointer::new(config);
    let mut samples: Vec<i16> = Vec::new();
    let deadline = Instant::now() + max_duration;
    let mut timed_out = false;

    loop {
        if Instant::now() >= deadline {
            timed_out = true;
            break;
        }
        match source.read_chunk() {
            Ok(Some(chunk)) => {
                if chunk.is_empty() {
                    std::thread::sleep(IDLE_POLL);
                    continue;
                }
                let event = detector.push(&chunk);
                samples.extend_from_slice(&chunk);
                if event == UtteranceEvent::SpeechStart {
                    tracing::debug!("speech started");
                }
                if event == UtteranceEvent::Complete {
                    tracing::debug!(samples = samples.len(), "utterance complete");
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                let _ = source.stop();
                return Err(e);
            }
        }
    }

    let _ = source.stop();

    if timed_out && !detector.saw_speech() {
        return Err(PolyvoxError::timeout("capture", max_duration));
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::source::MockCaptureSource;

    /// 100ms of loud (speech-level) samples at 16kHz.
    fn loud_chunk() -> Vec<i16> {
        vec![8000i16; 1600]
    }

    /// 100ms of silence at 16kHz.
    fn quiet_chunk() -> Vec<i16> {
        vec![0i16; 1600]
    }

    fn fast_config() -> EndPointConfig {
        EndPointConfig {
            speech_threshold: 0.02,
            trailing_silence_ms: 300,
            min_speech_ms: 100,
            sample_rate: 16000,
        }
    }

    #[test]
    fn test_rms_of_silence_is_zero() {
        assert_eq!(rms(&[0i16; 100]), 0.0);
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn test_rms_of_full_scale_is_one() {
        let full = vec![i16::MAX; 64];
        assert!((rms(&full) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_pending_until_speech() {
        let mut detector = EndPointer::new(fast_config());
        assert_eq!(detector.push(&quiet_chunk()), UtteranceEvent::Pending);
        assert_eq!(detector.push(&quiet_chunk()), UtteranceEvent::Pending);
        assert!(!detector.saw_speech());
    }

    #[test]
    fn test_speech_start_then_ongoing() {
        let mut detector = EndPointer::new(fast_config());
        assert_eq!(detector.push(&loud_chunk()), UtteranceEvent::SpeechStart);
        assert_eq!(detector.push(&loud_chunk()), UtteranceEvent::Speech);
        assert!(detector.saw_speech());
    }

    #[test]
    fn test_completes_after_trailing_silence() {
        let mut detector = EndPointer::new(fast_config());
        detector.push(&loud_chunk());
        detector.push(&loud_chunk());
        // 300ms window = 3 quiet 100ms chunks
        assert_eq!(detector.push(&quiet_chunk()), UtteranceEvent::Speech);
        assert_eq!(detector.push(&quiet_chunk()), UtteranceEvent::Speech);
        assert_eq!(detector.push(&quiet_chunk()), UtteranceEvent::Complete);
    }

    #[test]
    fn test_short_pause_does_not_end_utterance() {
        let mut detector = EndPointer::new(fast_config());
        detector.push(&loud_chunk());
        detector.push(&quiet_chunk());
        // Speech resumes, resetting the silence run
        assert_eq!(detector.push(&loud_chunk()), UtteranceEvent::Speech);
        assert_eq!(detector.push(&quiet_chunk()), UtteranceEvent::Speech);
        assert_eq!(detector.push(&quiet_chunk()), UtteranceEvent::Speech);
        assert_eq!(detector.push(&quiet_chunk()), UtteranceEvent::Complete);
    }

    #[test]
    fn test_transient_shorter_than_min_speech_cannot_complete() {
        let config = EndPointConfig {
            min_speech_ms: 500,
            ..fast_config()
        };
        let mut detector = EndPointer::new(config);
        // 100ms of "speech" (a click), then lots of silence
        detector.push(&loud_chunk());
        for _ in 0..20 {
            assert_ne!(detector.push(&quiet_chunk()), UtteranceEvent::Complete);
        }
    }

    #[test]
    fn test_complete_is_sticky() {
        let mut detector = EndPointer::new(fast_config());
        detector.push(&loud_chunk());
        detector.push(&loud_chunk());
        for _ in 0..3 {
            detector.push(&quiet_chunk());
        }
        assert_eq!(detector.push(&loud_chunk()), UtteranceEvent::Complete);
    }

    #[test]
    fn test_record_utterance_collects_until_complete() {
        let mut chunks = vec![loud_chunk(), loud_chunk()];
        chunks.extend(std::iter::repeat_n(quiet_chunk(), 4));
        let mut source = MockCaptureSource::new().with_chunks(chunks);

        let samples =
            record_utterance(&mut source, fast_config(), Duration::from_secs(5)).unwrap();

        // 2 loud + 3 quiet chunks consumed before Complete
        assert_eq!(samples.len(), 5 * 1600);
        assert!(!source.is_started(), "source must be stopped afterwards");
    }

    #[test]
    fn test_record_utterance_end_of_stream_returns_partial() {
        let mut source = MockCaptureSource::new().with_chunks(vec![loud_chunk()]);

        let samples =
            record_utterance(&mut source, fast_config(), Duration::from_secs(5)).unwrap();

        assert_eq!(samples.len(), 1600);
    }

    #[test]
    fn test_record_utterance_silent_stream_returns_empty() {
        let mut source = MockCaptureSource::new().with_chunks(vec![quiet_chunk(), quiet_chunk()]);

        let samples =
            record_utterance(&mut source, fast_config(), Duration::from_secs(5)).unwrap();

        // No speech, but the stream ended cleanly: the transcriber decides
        assert_eq!(samples.len(), 2 * 1600);
    }

    #[test]
    fn test_record_utterance_timeout_without_speech_errors() {
        // A source that keeps yielding empty chunks simulates a silent
        // live microphone.
        struct SilentLiveSource;
        impl CaptureSource for SilentLiveSource {
            fn start(&mut self) -> crate::error::Result<()> {
                Ok(())
            }
            fn stop(&mut self) -> crate::error::Result<()> {
                Ok(())
            }
            fn read_chunk(&mut self) -> crate::error::Result<Option<Vec<i16>>> {
                Ok(Some(Vec::new()))
            }
        }

        let mut source = SilentLiveSource;
        let result = record_utterance(&mut source, fast_config(), Duration::from_millis(50));

        assert!(matches!(
            result,
            Err(PolyvoxError::Timeout { ref stage, .. }) if stage == "capture"
        ));
    }

    #[test]
    fn test_record_utterance_propagates_read_error_and_stops() {
        let mut source = MockCaptureSource::new().with_read_failure();
        let result = record_utterance(&mut source, fast_config(), Duration::from_secs(1));
        assert!(matches!(result, Err(PolyvoxError::AudioCapture { .. })));
    }
}
