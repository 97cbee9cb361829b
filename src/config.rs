use crate::error::{Result, YtWhisperError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Vtt,
    Srt,
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Vtt => write!(f, "vtt"),
            OutputFormat::Srt => write!(f, "srt"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vtt" => Ok(OutputFormat::Vtt),
            "srt" => Ok(OutputFormat::Srt),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!(
                "Unknown format: {}. Use 'vtt', 'srt', or 'csv'",
                s
            )),
        }
    }
}

/// How output files are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameFormat {
    /// Slugified video title.
    #[default]
    Title,
    /// Video id as reported by the download tool.
    Id,
}

impl std::fmt::Display for NameFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NameFormat::Title => write!(f, "title"),
            NameFormat::Id => write!(f, "id"),
        }
    }
}

impl std::str::FromStr for NameFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "title" => Ok(NameFormat::Title),
            "id" => Ok(NameFormat::Id),
            _ => Err(format!("Unknown name format: {}. Use 'title' or 'id'", s)),
        }
    }
}

/// Speech recognition task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    /// Transcribe in the spoken language.
    #[default]
    Transcribe,
    /// Translate the speech to English.
    Translate,
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Task::Transcribe => write!(f, "transcribe"),
            Task::Translate => write!(f, "translate"),
        }
    }
}

impl std::str::FromStr for Task {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "transcribe" => Ok(Task::Transcribe),
            "translate" => Ok(Task::Translate),
            _ => Err(format!(
                "Unknown task: {}. Use 'transcribe' or 'translate'",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub api_base_url: Option<String>,
    pub model: String,
    pub default_format: OutputFormat,
    pub output_dir: PathBuf,
    pub name_format: NameFormat,
    /// Maximum caption line width; 0 disables line breaking.
    pub break_lines: usize,
    pub concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            api_base_url: None,
            model: "whisper-1".to_string(),
            default_format: OutputFormat::default(),
            output_dir: PathBuf::from("."),
            name_format: NameFormat::default(),
            break_lines: 0,
            concurrency: 1,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        // Load from config file if it exists
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                match toml::from_str::<Config>(&contents) {
                    Ok(file_config) => config = file_config,
                    Err(e) => warn!("Ignoring invalid config file {:?}: {}", config_path, e),
                }
            }
        }

        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Override fields from environment variables looked up through `var`.
    fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = var("OPENAI_API_KEY") {
            self.openai_api_key = Some(key);
        }
        if let Some(url) = var("OPENAI_BASE_URL") {
            self.api_base_url = Some(url);
        }
        if let Some(model) = var("YT_WHISPER_MODEL") {
            self.model = model;
        }
        if let Some(format) = var("YT_WHISPER_FORMAT") {
            if let Ok(f) = format.parse() {
                self.default_format = f;
            }
        }
        if let Some(width) = var("YT_WHISPER_BREAK_LINES") {
            if let Ok(w) = width.parse() {
                self.break_lines = w;
            }
        }
        if let Some(concurrency) = var("YT_WHISPER_CONCURRENCY") {
            if let Ok(c) = concurrency.parse() {
                self.concurrency = c;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.openai_api_key.is_none() {
            return Err(YtWhisperError::Config(
                "OPENAI_API_KEY not set. Export it with: export OPENAI_API_KEY=sk-...".to_string(),
            ));
        }

        if self.model.trim().is_empty() {
            return Err(YtWhisperError::Config("Model name is empty".to_string()));
        }

        if self.concurrency == 0 {
            return Err(YtWhisperError::Config(
                "Concurrency must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("yt-whisper").join("config.toml"))
    }
}
