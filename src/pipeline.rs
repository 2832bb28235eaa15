//! The question-answering pipeline.
//!
//! Normalizes the three input modalities into a [`Question`], exchanges it
//! with the chat model, and synthesizes the answer. One logical request runs
//! at a time per session; blocking stages (capture, transcription, decode)
//! run on the blocking thread pool and every stage has an explicit deadline.

use crate::artifact::{ArtifactFormat, ArtifactLifecycleManager, ArtifactScope};
use crate::audio::endpoint::{EndPointConfig, record_utterance};
use crate::audio::source::CaptureSource;
use crate::audio::transcode::{AudioTranscoder, Waveform};
use crate::chat::dispatcher::ConversationDispatcher;
use crate::chat::history::{Answer, InputSource, Question, Session};
use crate::chat::model::ChatModel;
use crate::config::LimitsConfig;
use crate::error::{PolyvoxError, Result};
use crate::lang::LanguageIdentifier;
use crate::stt::transcriber::{SpeechTranscriber, Transcript};
use crate::tts::router::{PlaybackHandle, SpeechSynthesisRouter};
use crate::tts::synthesizer::SpeechSynthesizer;
use std::fmt;
use std::sync::Arc;

/// One user input, in whichever modality it arrived.
pub enum InputPayload {
    /// Question typed as text.
    Typed(String),
    /// Live capture handle; recording runs until end of utterance.
    Microphone(Box<dyn CaptureSource>),
    /// Raw bytes of an uploaded audio container.
    Uploaded(Vec<u8>),
}

impl fmt::Debug for InputPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputPayload::Typed(text) => f.debug_tuple("Typed").field(text).finish(),
            InputPayload::Microphone(_) => f.write_str("Microphone(..)"),
            InputPayload::Uploaded(bytes) => {
                f.debug_tuple("Uploaded").field(&bytes.len()).finish()
            }
        }
    }
}

/// The outcome of one pipeline run: the answer, plus audio when synthesis
/// succeeded. `playback` is `None` when synthesis is disabled, the answer is
/// empty, or synthesis failed and the run degraded to text-only.
#[derive(Debug)]
pub struct Exchange {
    pub question: Question,
    pub answer: Answer,
    pub playback: Option<PlaybackHandle>,
}

pub struct Pipeline {
    transcoder: AudioTranscoder,
    transcriber: Arc<dyn SpeechTranscriber>,
    identifier: LanguageIdentifier,
    dispatcher: ConversationDispatcher,
    router: Option<SpeechSynthesisRouter>,
    artifacts: Arc<ArtifactLifecycleManager>,
    endpoint_config: EndPointConfig,
    limits: LimitsConfig,
}

impl Pipeline {
    /// Assemble a pipeline. `synthesizer` of `None` runs text-only.
    pub fn new(
        transcriber: Arc<dyn SpeechTranscriber>,
        model: Arc<dyn ChatModel>,
        synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
        limits: LimitsConfig,
    ) -> Self {
        let dispatcher = ConversationDispatcher::new(model, limits.model());
        let router = synthesizer.map(|s| SpeechSynthesisRouter::new(s, limits.synthesis()));
        Self {
            transcoder: AudioTranscoder::default(),
            transcriber,
            identifier: LanguageIdentifier::new(),
            dispatcher,
            router,
            artifacts: Arc::new(ArtifactLifecycleManager::new()),
            endpoint_config: EndPointConfig::default(),
            limits,
        }
    }

    /// Override the utterance end-pointer settings.
    pub fn with_endpoint_config(mut self, config: EndPointConfig) -> Self {
        self.endpoint_config = config;
        self
    }

    /// The artifact manager owning all ephemeral audio for this pipeline.
    pub fn artifacts(&self) -> &Arc<ArtifactLifecycleManager> {
        &self.artifacts
    }

    /// Normalize one input into a [`Question`].
    ///
    /// Audio modalities register every intermediate buffer with the artifact
    /// manager before any fallible step, so failed transcriptions leave
    /// nothing behind.
    pub async fn normalize(&self, payload: InputPayload) -> Result<Question> {
        match payload {
            InputPayload::Typed(text) => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    return Err(PolyvoxError::EmptyInput);
                }
                let language = self.identifier.identify(&text);
                tracing::debug!(%language, "typed question normalized");
                Ok(Question::new(text, InputSource::Typed, language))
            }
            InputPayload::Microphone(mut source) => {
                let endpoint_config = self.endpoint_config;
                let capture_limit = self.limits.capture();
                let samples = tokio::task::spawn_blocking(move || {
                    record_utterance(source.as_mut(), endpoint_config, capture_limit)
                })
                .await
                .map_err(|e| PolyvoxError::AudioCapture {
                    message: format!("capture task failed: {e}"),
                })??;
                let waveform = Waveform::new(samples, self.endpoint_config.sample_rate);

                let mut scope = self.artifacts.scope();
                let text = self.transcribe_scoped(&mut scope, waveform).await?;
                drop(scope);

                let language = self.identifier.identify(&text);
                tracing::debug!(%language, "spoken question normalized");
                Ok(Question::new(text, InputSource::Microphone, language))
            }
            InputPayload::Uploaded(bytes) => {
                let mut scope = self.artifacts.scope();
                // Register the raw container before the fallible decode
                let upload = scope.register_memory(bytes, ArtifactFormat::Container);

                let container = self.artifacts.bytes(upload)?;
                let transcoder = self.transcoder.clone();
                let waveform =
                    tokio::task::spawn_blocking(move || transcoder.decode(&container))
                        .await
                        .map_err(|e| PolyvoxError::Transcoding {
                            message: format!("decode task failed: {e}"),
                        })??;

                let text = self.transcribe_scoped(&mut scope, waveform).await?;
                drop(scope);

                let language = self.identifier.identify(&text);
                tracing::debug!(%language, "uploaded question normalized");
                Ok(Question::new(text, InputSource::Uploaded, language))
            }
        }
    }

    /// Register a canonical waveform in the scope, then transcribe it under
    /// the transcription deadline.
    async fn transcribe_scoped(
        &self,
        scope: &mut ArtifactScope<'_>,
        waveform: Waveform,
    ) -> Result<String> {
        scope.register_memory(waveform.to_wav_bytes()?, ArtifactFormat::Wav);

        let transcriber = Arc::clone(&self.transcriber);
        let deadline = self.limits.transcription();
        let transcript = tokio::time::timeout(
            deadline,
            tokio::task::spawn_blocking(move || transcriber.transcribe(&waveform)),
        )
        .await
        .map_err(|_| PolyvoxError::timeout("transcription", deadline))?
        .map_err(|e| PolyvoxError::Transcription {
            message: format!("transcription task failed: {e}"),
        })??;

        match transcript {
            Transcript::Text(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
            Transcript::Text(_) | Transcript::NoSpeech => Err(PolyvoxError::UnrecognizedSpeech {
                message: "no confident transcript, please try again".to_string(),
            }),
        }
    }

    /// Run one full exchange: normalize, ask, synthesize.
    ///
    /// Synthesis failure degrades to text-only: the answer is still
    /// returned, with `playback` unset.
    pub async fn handle(&self, session: &mut Session, payload: InputPayload) -> Result<Exchange> {
        let question = self.normalize(payload).await?;
        let answer = self.dispatcher.ask(session, question.clone()).await?;

        let playback = match &self.router {
            Some(router) if !answer.text.is_empty() => {
                match router.synthesize(&answer, &self.artifacts).await {
                    Ok(handle) => Some(handle),
                    Err(e) => {
                        tracing::warn!(error = %e, "synthesis failed, degrading to text-only");
                        None
                    }
                }
            }
            _ => None,
        };

        Ok(Exchange {
            question,
            answer,
            playback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::source::MockCaptureSource;
    use crate::chat::model::MockChatModel;
    use crate::lang::LanguageCode;
    use crate::stt::transcriber::MockTranscriber;
    use crate::tts::synthesizer::MockSynthesizer;

    fn pipeline_with(
        transcriber: MockTranscriber,
        model: MockChatModel,
        synthesizer: Option<MockSynthesizer>,
    ) -> Pipeline {
        Pipeline::new(
            Arc::new(transcriber),
            Arc::new(model),
            synthesizer.map(|s| Arc::new(s) as Arc<dyn SpeechSynthesizer>),
            LimitsConfig::default(),
        )
    }

    fn speech_chunks() -> Vec<Vec<i16>> {
        // Loud burst followed by trailing silence
        let mut chunks = vec![vec![8000i16; 1600]; 3];
        chunks.extend(vec![vec![0i16; 1600]; 16]);
        chunks
    }

    /// A WAV file symphonia can decode, for upload tests.
    fn valid_wav_upload() -> Vec<u8> {
        Waveform::new(vec![1000i16; 1600], 16000).to_wav_bytes().unwrap()
    }

    #[tokio::test]
    async fn test_typed_empty_input_is_rejected() {
        let pipeline = pipeline_with(MockTranscriber::new(), MockChatModel::new(), None);

        for input in ["", "   ", "\n\t"] {
            let result = pipeline
                .normalize(InputPayload::Typed(input.to_string()))
                .await;
            assert!(matches!(result, Err(PolyvoxError::EmptyInput)));
        }
    }

    #[tokio::test]
    async fn test_typed_input_passes_through_verbatim() {
        let pipeline = pipeline_with(MockTranscriber::new(), MockChatModel::new(), None);

        let question = pipeline
            .normalize(InputPayload::Typed("Wie geht es dir?".to_string()))
            .await
            .unwrap();

        assert_eq!(question.raw_text, "Wie geht es dir?");
        assert_eq!(question.source, InputSource::Typed);
        assert_eq!(question.language, LanguageCode::De);
    }

    #[tokio::test]
    async fn test_microphone_input_transcribes_utterance() {
        let pipeline = pipeline_with(
            MockTranscriber::new().with_text("What is the weather?"),
            MockChatModel::new(),
            None,
        );
        let source = MockCaptureSource::new().with_chunks(speech_chunks());

        let question = pipeline
            .normalize(InputPayload::Microphone(Box::new(source)))
            .await
            .unwrap();

        assert_eq!(question.raw_text, "What is the weather?");
        assert_eq!(question.source, InputSource::Microphone);
        // Intermediate waveform artifact released on success
        assert_eq!(pipeline.artifacts().outstanding(), 0);
    }

    #[tokio::test]
    async fn test_microphone_no_speech_surfaces_typed_error() {
        let pipeline = pipeline_with(
            MockTranscriber::new().with_no_speech(),
            MockChatModel::new(),
            None,
        );
        let source = MockCaptureSource::new().with_chunks(speech_chunks());

        let result = pipeline
            .normalize(InputPayload::Microphone(Box::new(source)))
            .await;

        assert!(matches!(
            result,
            Err(PolyvoxError::UnrecognizedSpeech { .. })
        ));
        assert_eq!(pipeline.artifacts().outstanding(), 0);
    }

    #[tokio::test]
    async fn test_blank_transcript_is_unrecognized_speech() {
        let pipeline = pipeline_with(
            MockTranscriber::new().with_text("   "),
            MockChatModel::new(),
            None,
        );
        let source = MockCaptureSource::new().with_chunks(speech_chunks());

        let result = pipeline
            .normalize(InputPayload::Microphone(Box::new(source)))
            .await;

        assert!(matches!(
            result,
            Err(PolyvoxError::UnrecognizedSpeech { .. })
        ));
    }

    #[tokio::test]
    async fn test_uploaded_valid_container_transcribes() {
        let pipeline = pipeline_with(
            MockTranscriber::new().with_text("¿Qué hora es?"),
            MockChatModel::new(),
            None,
        );

        let question = pipeline
            .normalize(InputPayload::Uploaded(valid_wav_upload()))
            .await
            .unwrap();

        assert_eq!(question.raw_text, "¿Qué hora es?");
        assert_eq!(question.source, InputSource::Uploaded);
        assert_eq!(question.language, LanguageCode::Es);
        assert_eq!(pipeline.artifacts().outstanding(), 0);
    }

    #[tokio::test]
    async fn test_uploaded_corrupt_container_fails_without_leaks() {
        let pipeline = pipeline_with(MockTranscriber::new(), MockChatModel::new(), None);

        let result = pipeline
            .normalize(InputPayload::Uploaded(vec![0xDE, 0xAD, 0xBE, 0xEF]))
            .await;

        assert!(matches!(result, Err(PolyvoxError::Transcoding { .. })));
        // The registered upload artifact must have been released
        assert_eq!(pipeline.artifacts().outstanding(), 0);
    }

    #[tokio::test]
    async fn test_uploaded_transcription_failure_releases_all_artifacts() {
        let pipeline = pipeline_with(
            MockTranscriber::new().with_failure(),
            MockChatModel::new(),
            None,
        );

        let result = pipeline
            .normalize(InputPayload::Uploaded(valid_wav_upload()))
            .await;

        assert!(matches!(result, Err(PolyvoxError::Transcription { .. })));
        // Both the container and the canonical waveform were in scope
        assert_eq!(pipeline.artifacts().outstanding(), 0);
    }

    #[tokio::test]
    async fn test_handle_synthesizes_answer_in_its_language() {
        let pipeline = pipeline_with(
            MockTranscriber::new(),
            MockChatModel::new().with_response("Mir geht es gut, schönen Dank!"),
            Some(MockSynthesizer::new()),
        );
        let mut session = Session::new();

        let exchange = pipeline
            .handle(
                &mut session,
                InputPayload::Typed("Wie geht es dir?".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(exchange.answer.language, LanguageCode::De);
        let playback = exchange.playback.expect("synthesis should run");
        assert_eq!(playback.voice, LanguageCode::De);
        assert_eq!(session.history.len(), 1);
    }

    #[tokio::test]
    async fn test_handle_degrades_to_text_only_on_synthesis_failure() {
        let pipeline = pipeline_with(
            MockTranscriber::new(),
            MockChatModel::new().with_response("the answer"),
            Some(MockSynthesizer::new().with_failure()),
        );
        let mut session = Session::new();

        let exchange = pipeline
            .handle(&mut session, InputPayload::Typed("question".to_string()))
            .await
            .unwrap();

        assert_eq!(exchange.answer.text, "the answer");
        assert!(exchange.playback.is_none());
        assert_eq!(pipeline.artifacts().outstanding(), 0);
    }

    #[tokio::test]
    async fn test_handle_without_synthesizer_is_text_only() {
        let pipeline = pipeline_with(
            MockTranscriber::new(),
            MockChatModel::new().with_response("text only"),
            None,
        );
        let mut session = Session::new();

        let exchange = pipeline
            .handle(&mut session, InputPayload::Typed("q".to_string()))
            .await
            .unwrap();

        assert!(exchange.playback.is_none());
    }

    #[tokio::test]
    async fn test_handle_model_failure_leaves_session_clean() {
        let pipeline = pipeline_with(
            MockTranscriber::new(),
            MockChatModel::new().with_failure(),
            Some(MockSynthesizer::new()),
        );
        let mut session = Session::new();

        let result = pipeline
            .handle(&mut session, InputPayload::Typed("q".to_string()))
            .await;

        assert!(matches!(result, Err(PolyvoxError::RemoteService { .. })));
        assert!(session.history.is_empty());
        assert_eq!(pipeline.artifacts().outstanding(), 0);
    }

    #[test]
    fn test_input_payload_debug_does_not_dump_audio() {
        let payload = InputPayload::Uploaded(vec![0u8; 4096]);
        let debug = format!("{payload:?}");
        assert!(debug.contains("4096"));
        assert!(debug.len() < 64);
    }
}
