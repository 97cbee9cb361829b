pub mod whisper;

pub use whisper::WhisperClient;

use crate::config::Task;
use crate::error::Result;
use crate::subtitle::Segment;
use async_trait::async_trait;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct TranscribeOptions {
    pub task: Task,
    /// Spoken language (ISO 639-1). `None` lets the model detect it.
    pub language: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Transcript {
    /// Segments in chronological order.
    pub segments: Vec<Segment>,
    pub language: Option<String>,
}

/// Speech-to-text backend turning a local audio file into timed segments.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &Path, options: &TranscribeOptions) -> Result<Transcript>;
    fn name(&self) -> &'static str;
}
