//! **VoiceOutput**: the devices that actually render speech.
//!
//! [`SystemSpeechDevice`] shells out to the platform synthesizer (`say` on macOS,
//! `espeak-ng` elsewhere). [`ApiSpeechDevice`] synthesizes through an OpenAI-compatible
//! `/audio/speech` endpoint and plays the result on the default output with rodio.
//! Both block until the audio has finished; serialization is the gate's job.

use crate::error::{VoiceError, VoiceResult};
use crate::gate::SpeechDevice;
use herald_core::AssistantConfig;
use rodio::{Decoder, OutputStream, Sink};
use std::io::Cursor;
use std::process::Command;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Words-per-minute rate that maps to an API speed of 1.0.
const NORMAL_SPEECH_RATE: f32 = 160.0;

/// Voices accepted by OpenAI-compatible `/audio/speech` endpoints.
const API_VOICES: &[&str] = &[
    "alloy", "ash", "ballad", "coral", "echo", "fable", "nova", "onyx", "sage", "shimmer",
];

const DEFAULT_API_VOICE: &str = "alloy";

/// Command-line synthesizer available on this platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Synthesizer {
    /// macOS `say`
    Say,
    /// `espeak-ng` (Linux and others)
    EspeakNg,
}

impl Synthesizer {
    pub fn for_platform() -> Self {
        if cfg!(target_os = "macos") {
            Synthesizer::Say
        } else {
            Synthesizer::EspeakNg
        }
    }

    pub fn program(&self) -> &'static str {
        match self {
            Synthesizer::Say => "say",
            Synthesizer::EspeakNg => "espeak-ng",
        }
    }

    fn list_args(&self) -> &'static [&'static str] {
        match self {
            Synthesizer::Say => &["-v", "?"],
            Synthesizer::EspeakNg => &["--voices"],
        }
    }

    fn speak_args(&self, voice: &str, rate: u32, text: &str) -> Vec<String> {
        let rate_flag = match self {
            Synthesizer::Say => "-r",
            Synthesizer::EspeakNg => "-s",
        };
        vec![
            "-v".to_string(),
            voice.to_string(),
            rate_flag.to_string(),
            rate.to_string(),
            text.to_string(),
        ]
    }
}

/// One entry from the synthesizer's voice listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceInfo {
    /// Identifier passed back to the synthesizer with `-v`.
    pub id: String,
    /// Human-readable name, e.g. `English (America)`.
    pub name: String,
    /// Locale or language tag as reported by the synthesizer.
    pub language: String,
}

/// Parse `say -v ?` or `espeak-ng --voices` output.
pub fn parse_voice_listing(synth: Synthesizer, listing: &str) -> Vec<VoiceInfo> {
    match synth {
        Synthesizer::Say => listing.lines().filter_map(parse_say_line).collect(),
        // First line is the column header.
        Synthesizer::EspeakNg => listing.lines().skip(1).filter_map(parse_espeak_line).collect(),
    }
}

// "Samantha            en_US    # Hello, my name is Samantha."
fn parse_say_line(line: &str) -> Option<VoiceInfo> {
    let head = line.split('#').next()?.trim_end();
    let (name, locale) = head.rsplit_once(char::is_whitespace)?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some(VoiceInfo {
        id: name.to_string(),
        name: name.to_string(),
        language: locale.trim().to_string(),
    })
}

// "Pty Language       Age/Gender VoiceName          File                 Other Languages"
// " 5  en-us           --/M      English_(America)  gmw/en-US            (en 2)(en-r 5)"
fn parse_espeak_line(line: &str) -> Option<VoiceInfo> {
    let cols: Vec<&str> = line.split_whitespace().collect();
    if cols.len() < 4 {
        return None;
    }
    Some(VoiceInfo {
        id: cols[1].to_string(),
        name: cols[3].replace('_', " "),
        language: cols[1].to_string(),
    })
}

/// Enumerate the voices the platform synthesizer offers.
pub fn list_voices(synth: Synthesizer) -> VoiceResult<Vec<VoiceInfo>> {
    let output = Command::new(synth.program())
        .args(synth.list_args())
        .output()
        .map_err(|e| VoiceError::Synthesizer(format!("{}: {}", synth.program(), e)))?;
    if !output.status.success() {
        return Err(VoiceError::Synthesizer(format!(
            "{} exited with {}",
            synth.program(),
            output.status
        )));
    }
    Ok(parse_voice_listing(
        synth,
        &String::from_utf8_lossy(&output.stdout),
    ))
}

/// Map a configured voice (id or display name) onto a synthesizer voice id.
pub fn resolve_voice<'a>(voices: &'a [VoiceInfo], wanted: &'a str) -> &'a str {
    voices
        .iter()
        .find(|v| v.id.eq_ignore_ascii_case(wanted) || v.name.eq_ignore_ascii_case(wanted))
        .map(|v| v.id.as_str())
        .unwrap_or(wanted)
}

/// Speaks through `say` / `espeak-ng`, waiting for the process to exit.
#[derive(Debug, Clone)]
pub struct SystemSpeechDevice {
    synth: Synthesizer,
    voice: String,
    rate: u32,
}

impl SystemSpeechDevice {
    pub fn new(synth: Synthesizer, voice: impl Into<String>, rate: u32) -> Self {
        Self {
            synth,
            voice: voice.into(),
            rate,
        }
    }

    /// Platform synthesizer with the configured voice resolved against its listing.
    pub fn from_config(config: &AssistantConfig) -> Self {
        let synth = Synthesizer::for_platform();
        let voice = match list_voices(synth) {
            Ok(voices) => resolve_voice(&voices, &config.voice).to_string(),
            Err(e) => {
                warn!(target: "herald::voice_output", "Could not list voices: {}", e);
                config.voice.clone()
            }
        };
        debug!(target: "herald::voice_output", "Using {} voice '{}'", synth.program(), voice);
        Self::new(synth, voice, config.speech_rate)
    }

    pub fn voice(&self) -> &str {
        &self.voice
    }
}

impl SpeechDevice for SystemSpeechDevice {
    fn render(&mut self, text: &str) -> VoiceResult<()> {
        let status = Command::new(self.synth.program())
            .args(self.synth.speak_args(&self.voice, self.rate, text))
            .status()
            .map_err(|e| VoiceError::Synthesizer(format!("{}: {}", self.synth.program(), e)))?;
        if !status.success() {
            return Err(VoiceError::Synthesizer(format!(
                "{} exited with {}",
                self.synth.program(),
                status
            )));
        }
        Ok(())
    }
}

/// Backend that turns text into encoded audio (WAV/MP3).
pub trait TtsBackend: Send + Sync {
    /// Synthesize text to audio bytes. Empty bytes mean nothing to play.
    fn synthesize(&self, text: &str) -> VoiceResult<Vec<u8>>;
}

/// OpenAI-compatible TTS (OpenAI, OpenRouter, local servers).
#[derive(Debug, Clone)]
pub struct OpenAiTts {
    /// Base URL without trailing slash (e.g. https://api.openai.com/v1).
    pub base_url: String,
    pub api_key: String,
    /// tts-1 (fast) or tts-1-hd (higher quality).
    pub model: String,
    pub voice: String,
    /// Playback speed, 1.0 = normal.
    pub speed: f32,
    client: reqwest::blocking::Client,
}

impl OpenAiTts {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        voice: &str,
        speech_rate: u32,
    ) -> VoiceResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| VoiceError::Tts(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            voice: api_voice(voice).to_string(),
            speed: api_speed(speech_rate),
            client,
        })
    }

    /// Build from `tts_api_url`, `tts_api_key` (or `TTS_API_KEY`), `tts_model`, `voice`, `speech_rate`.
    pub fn from_config(config: &AssistantConfig) -> VoiceResult<Self> {
        let api_key = config.resolved_tts_api_key().ok_or_else(|| {
            VoiceError::Config("API speech requires tts_api_key or TTS_API_KEY".to_string())
        })?;
        Self::new(
            &config.tts_api_url,
            api_key,
            &config.tts_model,
            &config.voice,
            config.speech_rate,
        )
    }
}

/// Known API voice names pass through; anything else (a system voice name) becomes the default.
fn api_voice(configured: &str) -> &'static str {
    API_VOICES
        .iter()
        .find(|v| v.eq_ignore_ascii_case(configured.trim()))
        .copied()
        .unwrap_or(DEFAULT_API_VOICE)
}

/// Words per minute to the API's 0.25..=4.0 speed factor.
fn api_speed(rate: u32) -> f32 {
    (rate as f32 / NORMAL_SPEECH_RATE).clamp(0.25, 4.0)
}

impl TtsBackend for OpenAiTts {
    fn synthesize(&self, text: &str) -> VoiceResult<Vec<u8>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/audio/speech", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
            "voice": self.voice,
            "speed": self.speed,
        });
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| VoiceError::Tts(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().unwrap_or_default();
            return Err(VoiceError::Tts(format!("TTS API error {}: {}", status, body)));
        }
        let bytes = res.bytes().map_err(|e| VoiceError::Tts(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Synthesizes with a [`TtsBackend`] and plays on the default output device.
///
/// The rodio output stream is opened per render on the calling (blocking) thread,
/// since it cannot be moved across threads.
pub struct ApiSpeechDevice {
    tts: Box<dyn TtsBackend>,
}

impl ApiSpeechDevice {
    pub fn new(tts: Box<dyn TtsBackend>) -> Self {
        Self { tts }
    }

    fn play_bytes(bytes: Vec<u8>) -> VoiceResult<()> {
        let (_stream, handle) =
            OutputStream::try_default().map_err(|e| VoiceError::Playback(e.to_string()))?;
        let sink = Sink::try_new(&handle).map_err(|e| VoiceError::Playback(e.to_string()))?;
        let source = Decoder::new(Cursor::new(bytes))
            .map_err(|e| VoiceError::Playback(format!("Decode failed: {}", e)))?;
        sink.append(source);
        sink.sleep_until_end();
        Ok(())
    }
}

impl SpeechDevice for ApiSpeechDevice {
    fn render(&mut self, text: &str) -> VoiceResult<()> {
        let bytes = self.tts.synthesize(text)?;
        if bytes.is_empty() {
            return Ok(());
        }
        Self::play_bytes(bytes)
    }
}

/// Write the synthesizer's voices to `path`, one `id<TAB>name<TAB>language` per line.
pub fn write_voice_list(synth: Synthesizer, path: &std::path::Path) -> VoiceResult<usize> {
    let voices = list_voices(synth)?;
    let body: String = voices
        .iter()
        .map(|v| format!("{}\t{}\t{}\n", v.id, v.name, v.language))
        .collect();
    std::fs::write(path, body)?;
    info!(target: "herald::voice_output", "Wrote {} voices to {}", voices.len(), path.display());
    Ok(voices.len())
}
