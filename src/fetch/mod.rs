pub mod ytdlp;

pub use ytdlp::{check_ffmpeg, check_ytdlp, YtDlpFetcher};

use crate::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;

/// Audio downloaded for one requested source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedAudio {
    /// Local audio file.
    pub path: PathBuf,
    /// Stable identifier of the source video.
    pub id: String,
    pub title: String,
}

/// Resolves a remote video URL to a local audio file.
#[async_trait]
pub trait AudioFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedAudio>;
}
