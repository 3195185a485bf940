//! **Speech-to-Text (STT)**: turn a captured phrase into a command string.
//!
//! [`ApiRecognizer`] captures one phrase from the [`Microphone`] on a blocking thread,
//! encodes it as 16-bit WAV and uploads it to an OpenAI-compatible
//! `/audio/transcriptions` endpoint. Failures map onto [`RecognitionError`] so the
//! input channel can retry them.

use crate::error::{RecognitionError, VoiceError, VoiceResult};
use crate::input::SpeechRecognizer;
use crate::microphone::Microphone;
use crate::turn::AudioTurn;
use async_trait::async_trait;
use herald_core::AssistantConfig;
use std::time::Duration;
use tracing::{debug, warn};

/// Encode f32 PCM (mono) to 16-bit WAV bytes for API upload.
pub fn pcm_f32_to_wav(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32; // 16-bit = 2 bytes per sample
    let mut buf = Vec::with_capacity(44 + data_len as usize);
    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&(36 + data_len).to_le_bytes());
    buf.extend_from_slice(b"WAVE");
    // fmt subchunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&1u16.to_le_bytes()); // mono
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&(sample_rate * 2).to_le_bytes()); // byte rate
    buf.extend_from_slice(&2u16.to_le_bytes()); // block align
    buf.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
    // data subchunk
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_len.to_le_bytes());
    for &s in samples {
        let i = (s.clamp(-1.0, 1.0) * 32767.0).round() as i16;
        buf.extend_from_slice(&i.to_le_bytes());
    }
    buf
}

/// Recognizer backed by an OpenAI-compatible transcription API (Whisper and friends).
#[derive(Debug, Clone)]
pub struct ApiRecognizer {
    microphone: Microphone,
    /// Base URL without trailing slash (e.g. https://api.openai.com/v1).
    base_url: String,
    api_key: String,
    /// whisper-1, gpt-4o-transcribe, ...
    model: String,
    client: reqwest::Client,
}

impl ApiRecognizer {
    pub fn new(
        microphone: Microphone,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> VoiceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| VoiceError::Stt(e.to_string()))?;
        Ok(Self {
            microphone,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        })
    }

    /// Build from `stt_api_url`, `stt_api_key` (or `STT_API_KEY`) and `stt_model`.
    pub fn from_config(config: &AssistantConfig, microphone: Microphone) -> VoiceResult<Self> {
        let api_key = config.resolved_stt_api_key().ok_or_else(|| {
            VoiceError::Config("speech recognition requires stt_api_key or STT_API_KEY".to_string())
        })?;
        Self::new(microphone, &config.stt_api_url, api_key, &config.stt_model)
    }

    /// Upload one phrase and return the trimmed transcript.
    pub async fn transcribe(
        &self,
        turn: &AudioTurn,
        language: &str,
    ) -> Result<String, RecognitionError> {
        if turn.samples.is_empty() {
            return Err(RecognitionError::Unintelligible);
        }
        let wav = pcm_f32_to_wav(&turn.samples, turn.sample_rate);
        let url = format!("{}/audio/transcriptions", self.base_url.trim_end_matches('/'));
        let part = reqwest::multipart::Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| RecognitionError::NetworkFailure(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("language", language.to_string());

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| RecognitionError::NetworkFailure(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(RecognitionError::NetworkFailure(format!(
                "STT API error {}: {}",
                status, body
            )));
        }
        let json: serde_json::Value = res
            .json()
            .await
            .map_err(|e| RecognitionError::NetworkFailure(e.to_string()))?;
        let text = json
            .get("text")
            .and_then(|t| t.as_str())
            .unwrap_or("")
            .trim()
            .to_string();
        if text.is_empty() {
            return Err(RecognitionError::Unintelligible);
        }
        debug!(target: "herald::stt", "Transcribed: {}", text);
        Ok(text)
    }
}

#[async_trait]
impl SpeechRecognizer for ApiRecognizer {
    async fn listen(&self, language: &str) -> Result<String, RecognitionError> {
        let microphone = self.microphone.clone();
        let turn = tokio::task::spawn_blocking(move || microphone.capture_phrase())
            .await
            .map_err(|e| RecognitionError::Capture(e.to_string()))?
            .map_err(|e| {
                warn!(target: "herald::stt", "Microphone capture failed: {}", e);
                RecognitionError::Capture(e.to_string())
            })?;
        self.transcribe(&turn, language).await
    }
}
