//! Audio input: capture sources, utterance end-pointing, and upload
//! transcoding to the canonical waveform.

#[cfg(feature = "cpal-audio")]
pub mod capture;
pub mod endpoint;
pub mod source;
pub mod transcode;

pub use endpoint::{EndPointConfig, EndPointer, UtteranceEvent, record_utterance};
pub use source::{CaptureSource, MockCaptureSource};
pub use transcode::{AudioTranscoder, Waveform};

#[cfg(feature = "cpal-audio")]
pub use capture::{MicrophoneSource, list_devices};
