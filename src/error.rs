use thiserror::Error;

#[derive(Error, Debug)]
pub enum YtWhisperError {
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Caption text is empty")]
    EmptyCaption,

    #[error("Audio download failed: {0}")]
    Download(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to persist output file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

pub type Result<T> = std::result::Result<T, YtWhisperError>;
