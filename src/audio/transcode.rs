//! Upload transcoding to the canonical waveform.
//!
//! Uploaded questions arrive as arbitrary containers (wav/mp3/m4a/flac/ogg).
//! The transcoder probes the container, decodes it, downmixes to mono and
//! resamples, producing the fixed format every downstream stage expects.

use crate::defaults;
use crate::error::{PolyvoxError, Result};
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// A decoded audio signal in the canonical sample format (mono 16-bit PCM).
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / u64::from(self.sample_rate)
    }

    /// Serialize as a WAV container, e.g. for artifact registration.
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer =
                hound::WavWriter::new(&mut cursor, spec).map_err(|e| PolyvoxError::Transcoding {
                    message: format!("Failed to assemble WAV: {}", e),
                })?;
            for &sample in &self.samples {
                writer
                    .write_sample(sample)
                    .map_err(|e| PolyvoxError::Transcoding {
                        message: format!("Failed to write WAV sample: {}", e),
                    })?;
            }
            writer.finalize().map_err(|e| PolyvoxError::Transcoding {
                message: format!("Failed to finalize WAV: {}", e),
            })?;
        }
        Ok(cursor.into_inner())
    }
}

/// Decodes arbitrary audio containers to the canonical waveform.
#[derive(Debug, Clone)]
pub struct AudioTranscoder {
    target_rate: u32,
}

impl Default for AudioTranscoder {
    fn default() -> Self {
        Self {
            target_rate: defaults::SAMPLE_RATE,
        }
    }
}

impl AudioTranscoder {
    pub fn new(target_rate: u32) -> Self {
        Self { target_rate }
    }

    /// Probe and decode container bytes into the canonical waveform.
    ///
    /// The container format is sniffed from the bytes themselves; no file
    /// extension is trusted. Unsupported or corrupt input fails with
    /// `Transcoding`.
    pub fn decode(&self, bytes: &[u8]) -> Result<Waveform> {
        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());
        let hint = Hint::new();
        let format_opts = FormatOptions::default();
        let metadata_opts = MetadataOptions::default();
        let decoder_opts = DecoderOptions::default();

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &format_opts, &metadata_opts)
            .map_err(|e| PolyvoxError::Transcoding {
                message: format!("unrecognized container: {}", e),
            })?;
        let mut format = probed.format;

        let track = format
            .default_track()
            .ok_or_else(|| PolyvoxError::Transcoding {
                message: "no audio track found".to_string(),
            })?;
        let track_id = track.id;
        let codec_params = track.codec_params.clone();
        let source_rate = codec_params
            .sample_rate
            .ok_or_else(|| PolyvoxError::Transcoding {
                message: "unknown sample rate".to_string(),
            })?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &decoder_opts)
            .map_err(|e| PolyvoxError::Transcoding {
                message: format!("unsupported codec: {}", e),
            })?;

        let mut mono: Vec<i16> = Vec::new();
        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(symphonia::core::errors::Error::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => {
                    return Err(PolyvoxError::Transcoding {
                        message: format!("packet read failed: {}", e),
                    });
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                Err(symphonia::core::errors::Error::DecodeError(e)) => {
                    tracing::warn!(error = %e, "skipping corrupt audio frame");
                    continue;
                }
                Err(e) => {
                    return Err(PolyvoxError::Transcoding {
                        message: format!("decode failed: {}", e),
                    });
                }
            };

            let spec = *decoded.spec();
            let num_frames = decoded.frames();
            if num_frames == 0 {
                continue;
            }
            let channels = spec.channels.count().max(1);

            let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
            sample_buf.copy_interleaved_ref(decoded);

            for frame in sample_buf.samples().chunks_exact(channels) {
                let sum: f32 = frame.iter().sum();
                let avg = sum / channels as f32;
                mono.push((avg.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16);
            }
        }

        if mono.is_empty() {
            return Err(PolyvoxError::Transcoding {
                message: "no audio samples decoded".to_string(),
            });
        }

        let samples = if source_rate != self.target_rate {
            resample(&mono, source_rate, self.target_rate)
        } else {
            mono
        };
        tracing::debug!(
            source_rate,
            target_rate = self.target_rate,
            samples = samples.len(),
            "upload transcoded"
        );
        Ok(Waveform::new(samples, self.target_rate))
    }
}

/// Simple linear interpolation resampling.
pub(crate) fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = source_pos.floor() as usize;
            let fraction = source_pos - source_idx as f64;

            if source_idx + 1 >= samples.len() {
                samples[samples.len() - 1]
            } else {
                let left = samples[source_idx] as f64;
                let right = samples[source_idx + 1] as f64;
                (left + (right - left) * fraction) as i16
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_wav_data(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_decode_16khz_mono_wav_passes_through() {
        let input = vec![100i16, 200, 300, 400, 500];
        let wav = make_wav_data(16000, 1, &input);

        let waveform = AudioTranscoder::default().decode(&wav).unwrap();

        assert_eq!(waveform.sample_rate, 16000);
        assert_eq!(waveform.samples.len(), input.len());
        // PCM wav decodes losslessly through the f32 path within 1 LSB
        for (out, exp) in waveform.samples.iter().zip(&input) {
            assert!((i32::from(*out) - i32::from(*exp)).abs() <= 1);
        }
    }

    #[test]
    fn test_decode_stereo_downmixes() {
        // Stereo pairs: (1000, 3000) -> 2000, (-500, 500) -> 0
        let wav = make_wav_data(16000, 2, &[1000i16, 3000, -500, 500]);

        let waveform = AudioTranscoder::default().decode(&wav).unwrap();

        assert_eq!(waveform.samples.len(), 2);
        assert!((i32::from(waveform.samples[0]) - 2000).abs() <= 2);
        assert!(i32::from(waveform.samples[1]).abs() <= 2);
    }

    #[test]
    fn test_decode_48khz_resamples_to_16khz() {
        let input = vec![1000i16; 48000]; // 1 second at 48kHz
        let wav = make_wav_data(48000, 1, &input);

        let waveform = AudioTranscoder::default().decode(&wav).unwrap();

        assert_eq!(waveform.sample_rate, 16000);
        assert!(waveform.samples.len() >= 15900 && waveform.samples.len() <= 16100);
        assert!(
            waveform
                .samples
                .iter()
                .all(|&s| (900..=1100).contains(&i32::from(s)))
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let mut garbage = Vec::new();
        for i in 0..500 {
            garbage.push(((i * 17 + 42) % 256) as u8);
        }

        let result = AudioTranscoder::default().decode(&garbage);

        assert!(matches!(result, Err(PolyvoxError::Transcoding { .. })));
    }

    #[test]
    fn test_decode_rejects_empty_input() {
        let result = AudioTranscoder::default().decode(&[]);
        assert!(matches!(result, Err(PolyvoxError::Transcoding { .. })));
    }

    #[test]
    fn test_decode_rejects_truncated_header() {
        let result = AudioTranscoder::default().decode(b"RIFF\x00\x00");
        assert!(matches!(result, Err(PolyvoxError::Transcoding { .. })));
    }

    #[test]
    fn test_resample_identity_same_rate() {
        let samples = vec![100i16, 200, 300];
        assert_eq!(resample(&samples, 16000, 16000), samples);
    }

    #[test]
    fn test_resample_upsample_doubles_count() {
        let samples = vec![0i16, 1000, 2000];
        let resampled = resample(&samples, 8000, 16000);
        assert_eq!(resampled.len(), 6);
        assert_eq!(resampled[0], 0);
        assert!(resampled[1] > 0 && resampled[1] < 1000);
    }

    #[test]
    fn test_resample_downsample_halves_count() {
        let samples = vec![500i16; 3200];
        let resampled = resample(&samples, 16000, 8000);
        assert_eq!(resampled.len(), 1600);
        assert!(resampled.iter().all(|&s| (499..=501).contains(&s)));
    }

    #[test]
    fn test_resample_edge_cases() {
        assert!(resample(&[], 16000, 8000).is_empty());
        let single = resample(&[100i16], 16000, 8000);
        assert_eq!(single, vec![100i16]);
    }

    #[test]
    fn test_waveform_duration() {
        let waveform = Waveform::new(vec![0i16; 16000], 16000);
        assert_eq!(waveform.duration_ms(), 1000);
        assert_eq!(Waveform::new(vec![], 16000).duration_ms(), 0);
    }

    #[test]
    fn test_waveform_wav_round_trip() {
        let waveform = Waveform::new(vec![-100i16, 0, 100, 32000], 16000);
        let wav = waveform.to_wav_bytes().unwrap();

        let decoded = AudioTranscoder::default().decode(&wav).unwrap();
        assert_eq!(decoded.samples.len(), waveform.samples.len());
        for (out, exp) in decoded.samples.iter().zip(&waveform.samples) {
            assert!((i32::from(*out) - i32::from(*exp)).abs() <= 1);
        }
    }
}
