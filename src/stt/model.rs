//! Whisper model registry and path resolution.
//!
//! [`WHISPER_MODELS`] lists the ggml files published with whisper.cpp that
//! are reasonable for live dictation.  [`ModelPaths`] resolves where a model
//! lives on disk given [`crate::config::AppPaths`].

use std::path::PathBuf;

use crate::config::AppPaths;

const DOWNLOAD_BASE: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// Approximate capacity tier of a Whisper model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelSize {
    Tiny,
    Base,
    Small,
    Medium,
}

/// Static metadata for a single GGML model file.
#[derive(Debug)]
pub struct ModelInfo {
    /// Identifier used in `SpeechConfig::model` (e.g. `"base.en"`).
    pub id: &'static str,
    pub display_name: &'static str,
    pub size: ModelSize,
    /// File name under the models directory.
    pub file_name: &'static str,
    pub file_size_mb: u64,
    /// Trained on English only; faster and more accurate for English.
    pub english_only: bool,
}

impl ModelInfo {
    pub fn download_url(&self) -> String {
        format!("{DOWNLOAD_BASE}/{}", self.file_name)
    }

    /// Whether this model can transcribe `language` (`"auto"` included).
    pub fn supports(&self, language: &str) -> bool {
        !self.english_only || language == "en"
    }
}

pub const WHISPER_MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "tiny.en",
        display_name: "Whisper Tiny (English)",
        size: ModelSize::Tiny,
        file_name: "ggml-tiny.en.bin",
        file_size_mb: 75,
        english_only: true,
    },
    ModelInfo {
        id: "base.en",
        display_name: "Whisper Base (English) [Recommended]",
        size: ModelSize::Base,
        file_name: "ggml-base.en.bin",
        file_size_mb: 142,
        english_only: true,
    },
    ModelInfo {
        id: "small.en",
        display_name: "Whisper Small (English)",
        size: ModelSize::Small,
        file_name: "ggml-small.en.bin",
        file_size_mb: 466,
        english_only: true,
    },
    ModelInfo {
        id: "medium.en",
        display_name: "Whisper Medium (English)",
        size: ModelSize::Medium,
        file_name: "ggml-medium.en.bin",
        file_size_mb: 1_500,
        english_only: true,
    },
    ModelInfo {
        id: "base",
        display_name: "Whisper Base (Multilingual)",
        size: ModelSize::Base,
        file_name: "ggml-base.bin",
        file_size_mb: 142,
        english_only: false,
    },
    ModelInfo {
        id: "small",
        display_name: "Whisper Small (Multilingual)",
        size: ModelSize::Small,
        file_name: "ggml-small.bin",
        file_size_mb: 466,
        english_only: false,
    },
];

pub fn find_model_by_id(id: &str) -> Option<&'static ModelInfo> {
    WHISPER_MODELS.iter().find(|m| m.id == id)
}

// ---------------------------------------------------------------------------
// ModelPaths
// ---------------------------------------------------------------------------

/// Resolves the on-disk location of model files.
///
/// ```rust,no_run
/// use interview_coach::config::AppPaths;
/// use interview_coach::stt::{find_model_by_id, ModelPaths};
///
/// let paths = ModelPaths::from_app_paths(&AppPaths::new());
/// let base = find_model_by_id("base.en").unwrap();
/// if !paths.is_available(base) {
///     println!("download {} into {}", base.download_url(), paths.models_dir.display());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ModelPaths {
    pub models_dir: PathBuf,
}

impl ModelPaths {
    pub fn from_app_paths(app_paths: &AppPaths) -> Self {
        Self {
            models_dir: app_paths.models_dir.clone(),
        }
    }

    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    pub fn model_path(&self, model: &ModelInfo) -> PathBuf {
        self.models_dir.join(model.file_name)
    }

    pub fn is_available(&self, model: &ModelInfo) -> bool {
        self.model_path(model).exists()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
