//! Herald: a voice/text assistant on the command line.
//!
//! `herald [--config <path>] [--text | --voice] [--list-voices]`
//!
//! Loads the configuration, wires the chat model, web search, speech output and
//! recognition, then runs the command loop until the user says goodbye.

use anyhow::Context;
use herald_core::{AssistantConfig, ChatBackend, Mode, OpenAiChat, SearchBackend, Session, SpeechEngine};
use herald_skills::BraveSearch;
use herald_voice::{
    write_voice_list, ApiRecognizer, ApiSpeechDevice, CommandRouter, InputChannel, Microphone,
    OpenAiTts, SpeechDevice, SpeechOutputGate, StdConsole, Synthesizer, SystemSpeechDevice,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const VOICES_FILE: &str = "voices.txt";

const USAGE: &str = "usage: herald [--config <path>] [--text | --voice] [--list-voices]";

/// Parsed command line.
#[derive(Debug, Default, PartialEq, Eq)]
struct CliArgs {
    config: Option<PathBuf>,
    mode: Option<Mode>,
    list_voices: bool,
}

impl CliArgs {
    fn parse<I: IntoIterator<Item = String>>(args: I) -> anyhow::Result<Self> {
        let mut parsed = CliArgs::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    let path = args.next().context("--config needs a path")?;
                    parsed.config = Some(PathBuf::from(path));
                }
                "--text" => parsed.mode = Some(Mode::Text),
                "--voice" => parsed.mode = Some(Mode::Voice),
                "--list-voices" => parsed.list_voices = true,
                "-h" | "--help" => anyhow::bail!(USAGE),
                other => anyhow::bail!("unknown argument '{}'\n{}", other, USAGE),
            }
        }
        Ok(parsed)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before any env::var calls)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[herald] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse(std::env::args().skip(1))?;

    if args.list_voices {
        let count = write_voice_list(Synthesizer::for_platform(), Path::new(VOICES_FILE))?;
        println!("Wrote {} voices to {}", count, VOICES_FILE);
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => AssistantConfig::load_from(path),
        None => AssistantConfig::load(),
    }
    .context("load configuration")?;
    if let Some(mode) = args.mode {
        config.command_mode = mode;
    }

    let chat: Arc<dyn ChatBackend> =
        Arc::new(OpenAiChat::from_config(&config).context("create chat backend")?);
    let search: Arc<dyn SearchBackend> = Arc::new(
        BraveSearch::from_config(&config, Arc::clone(&chat)).context("create search backend")?,
    );

    let device: Box<dyn SpeechDevice> = match config.speech_engine {
        SpeechEngine::System => Box::new(SystemSpeechDevice::from_config(&config)),
        SpeechEngine::Api => Box::new(ApiSpeechDevice::new(Box::new(
            OpenAiTts::from_config(&config).context("create speech synthesis")?,
        ))),
    };
    let gate = Arc::new(SpeechOutputGate::new(device));

    // Text mode can run without a recognition key; switching to voice then fails per attempt.
    let recognizer = match ApiRecognizer::from_config(&config, Microphone::default()) {
        Ok(recognizer) => recognizer,
        Err(e) if config.command_mode == Mode::Text => {
            tracing::warn!(target: "herald::daemon", "Speech recognition unavailable: {}", e);
            ApiRecognizer::new(
                Microphone::default(),
                &config.stt_api_url,
                "",
                &config.stt_model,
            )?
        }
        Err(e) => return Err(e).context("create speech recognition"),
    };
    let recognizer = Arc::new(recognizer);
    let input = InputChannel::new(Arc::new(StdConsole::new()), recognizer);
    let router = CommandRouter::new(input, gate, chat, search);

    tracing::info!(
        target: "herald::daemon",
        bot = %config.bot_name,
        model = %config.model,
        mode = %config.command_mode,
        engine = ?config.speech_engine,
        "Herald started"
    );

    let mut session = Session::from_config(&config);
    tokio::select! {
        result = router.run(&mut session) => result.context("interaction loop")?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(target: "herald::daemon", "CTRL-C received; shutting down");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<CliArgs> {
        CliArgs::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn no_arguments_keeps_configured_mode() {
        assert_eq!(parse(&[]).unwrap(), CliArgs::default());
    }

    #[test]
    fn flags_are_parsed() {
        let args = parse(&["--config", "alt.json", "--text"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("alt.json")));
        assert_eq!(args.mode, Some(Mode::Text));
        assert!(parse(&["--list-voices"]).unwrap().list_voices);
        assert_eq!(parse(&["--text", "--voice"]).unwrap().mode, Some(Mode::Voice));
    }

    #[test]
    fn bad_arguments_are_rejected() {
        assert!(parse(&["--config"]).is_err());
        assert!(parse(&["--loud"]).is_err());
    }
}
