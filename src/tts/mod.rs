//! Speech synthesis: voice selection and audio generation.

pub mod google;
pub mod router;
pub mod synthesizer;

pub use google::GoogleTranslateSynthesizer;
pub use router::{PlaybackHandle, SpeechSynthesisRouter};
pub use synthesizer::{MockSynthesizer, SpeechSynthesizer};
