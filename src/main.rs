//! Application entry point for Interview Coach.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create the [`tokio`] runtime (multi-thread).
//! 4. Build the conversation agent from config.  A config that cannot reach
//!    an agent still launches; the error surfaces when an interview starts.
//! 5. Build the recogniser (Whisper + microphone) and the synthesiser
//!    (speech endpoint + rodio), each degrading to a stand-in when
//!    unavailable.
//! 6. Run [`eframe::run_native`], which blocks the main thread until the window
//!    is closed.

use std::sync::Arc;

use anyhow::Context as _;
use eframe::egui;
use interview_coach::{
    agent::{ApiAgent, ConversationAgent, UnconfiguredAgent},
    app::InterviewApp,
    config::{AppConfig, AppPaths},
    session::SessionOrchestrator,
    speech::{
        RecognitionProvider, SpeechCapture, SpeechPlayback, SynthesisProvider,
        UnavailableRecognizer,
    },
    stt::{find_model_by_id, ModelPaths, TranscribeParams, WhisperEngine, WhisperRecognizer},
    tts::{AudioOutput, OpenAiSpeech, SilentSynthesizer, VoiceSynthesizer},
};

// ---------------------------------------------------------------------------
// Provider construction
// ---------------------------------------------------------------------------

fn build_agent(config: &AppConfig) -> Arc<dyn ConversationAgent> {
    match ApiAgent::from_config(&config.agent) {
        Ok(agent) => {
            log::info!(
                "agent: {:?} at {} (model {})",
                config.agent.provider,
                config.agent.base_url,
                config.agent.model
            );
            Arc::new(agent)
        }
        Err(e) => {
            log::warn!("agent: not configured ({e}); interviews cannot start until it is");
            Arc::new(UnconfiguredAgent::new(e))
        }
    }
}

fn build_recognizer(config: &AppConfig) -> Box<dyn RecognitionProvider> {
    if !config.speech.enabled {
        return Box::new(UnavailableRecognizer::new("dictation is disabled in settings"));
    }

    let paths = ModelPaths::from_app_paths(&AppPaths::new());
    let model_path = match find_model_by_id(&config.speech.model) {
        Some(info) => {
            if !info.supports(&config.speech.language) {
                log::warn!(
                    "stt: model {} is English-only but language is {:?}",
                    info.id,
                    config.speech.language
                );
            }
            if !paths.is_available(info) {
                log::warn!(
                    "stt: {} is not installed; download {} into {}. Dictation disabled.",
                    info.display_name,
                    info.download_url(),
                    paths.models_dir.display()
                );
                return Box::new(UnavailableRecognizer::new(format!(
                    "{} is not installed",
                    info.display_name
                )));
            }
            paths.model_path(info)
        }
        None => paths.models_dir.join(format!("ggml-{}.bin", config.speech.model)),
    };

    match WhisperEngine::load(&model_path, TranscribeParams::from_config(&config.speech)) {
        Ok(engine) => Box::new(WhisperRecognizer::new(Arc::new(engine), &config.audio)),
        Err(e) => {
            log::warn!(
                "stt: could not load Whisper model ({}): {e}. Dictation disabled.",
                model_path.display()
            );
            Box::new(UnavailableRecognizer::new(e.to_string()))
        }
    }
}

fn build_synthesizer(
    config: &AppConfig,
    runtime: &tokio::runtime::Runtime,
) -> Box<dyn SynthesisProvider> {
    if !config.playback.enabled {
        log::info!("playback: disabled in settings");
        return Box::new(SilentSynthesizer);
    }

    let speech = OpenAiSpeech::from_config(&config.playback);
    if !speech.has_api_key() && config.playback.base_url.contains("api.openai.com") {
        log::warn!(
            "playback: no API key for {}; replies will not be spoken",
            config.playback.base_url
        );
        return Box::new(SilentSynthesizer);
    }

    match AudioOutput::open_default() {
        Ok(output) => Box::new(VoiceSynthesizer::new(
            Arc::new(speech),
            Arc::new(output),
            runtime.handle().clone(),
        )),
        Err(e) => {
            log::warn!("playback: {e}; replies will not be spoken");
            Box::new(SilentSynthesizer)
        }
    }
}

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let (w, h) = config.ui.window_size;
    let vp = egui::ViewportBuilder::default()
        .with_title("Interview Coach")
        .with_inner_size([w, h])
        .with_min_inner_size([640.0, 480.0]);

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Interview Coach starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    // 4-5. Providers and the orchestrator
    let agent = build_agent(&config);
    let capture = SpeechCapture::new(build_recognizer(&config));
    let playback = SpeechPlayback::new(build_synthesizer(&config, &rt));
    let orchestrator = Arc::new(
        SessionOrchestrator::new(agent, capture, playback)
            .with_interviewer_name(config.interview.interviewer_name.clone()),
    );

    // 6. Window (blocks until closed)
    let app = InterviewApp::new(orchestrator, rt.handle().clone(), &config);
    let font_scale = config.ui.font_scale;
    eframe::run_native(
        "Interview Coach",
        native_options(&config),
        Box::new(move |cc| {
            cc.egui_ctx.set_zoom_factor(font_scale);
            Ok(Box::new(app))
        }),
    )
    .map_err(|e| anyhow::anyhow!("window error: {e}"))?;

    log::info!("Interview Coach shut down");
    Ok(())
}
