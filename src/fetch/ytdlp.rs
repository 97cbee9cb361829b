use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{Result, YtWhisperError};

use super::{AudioFetcher, FetchedAudio};

/// Audio codec requested from the extractor.
const AUDIO_FORMAT: &str = "mp3";

/// Audio bitrate requested from the extractor.
const AUDIO_QUALITY: &str = "192K";

/// Check that `program` runs and exits successfully with `version_flag`.
async fn check_tool(program: &str, version_flag: &str, hint: &str) -> Result<()> {
    let output = Command::new(program)
        .arg(version_flag)
        .output()
        .await
        .map_err(|e| YtWhisperError::Download(format!("{program} not found. {hint} Error: {e}")))?;

    if !output.status.success() {
        return Err(YtWhisperError::Download(format!("{program} check failed")));
    }

    debug!("{} is available", program);
    Ok(())
}

/// Check if yt-dlp is installed and accessible.
pub async fn check_ytdlp() -> Result<()> {
    check_tool(
        "yt-dlp",
        "--version",
        "Install it with: pip install yt-dlp (or your package manager).",
    )
    .await
}

/// Check if FFmpeg is installed. yt-dlp needs it to extract audio.
pub async fn check_ffmpeg() -> Result<()> {
    check_tool(
        "ffmpeg",
        "-version",
        "Install it with: brew install ffmpeg (macOS) or apt install ffmpeg (Linux).",
    )
    .await
}

/// Downloads the best audio stream of a video with yt-dlp and converts it to mp3.
pub struct YtDlpFetcher {
    program: String,
    output_dir: PathBuf,
}

impl YtDlpFetcher {
    /// Download into `output_dir`, naming files after the video id.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: "yt-dlp".to_string(),
            output_dir: output_dir.into(),
        }
    }

    /// Use another yt-dlp compatible executable.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn output_template(&self) -> PathBuf {
        self.output_dir.join("%(id)s.%(ext)s")
    }

    fn audio_path(&self, id: &str) -> PathBuf {
        self.output_dir.join(format!("{id}.{AUDIO_FORMAT}"))
    }
}

#[async_trait]
impl AudioFetcher for YtDlpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedAudio> {
        debug!("Downloading audio for {}", url);

        let output = Command::new(&self.program)
            .args([
                "--quiet",
                "--no-warnings",
                "--no-playlist",
                "--format",
                "bestaudio",
                "--extract-audio",
                "--audio-format",
                AUDIO_FORMAT,
                "--audio-quality",
                AUDIO_QUALITY,
                "--dump-json",
                "--no-simulate",
                "--output",
            ])
            .arg(self.output_template())
            .arg(url)
            .output()
            .await
            .map_err(|e| {
                YtWhisperError::Download(format!("Failed to run {}: {e}", self.program))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(YtWhisperError::Download(format!(
                "{} failed for {}: {}",
                self.program,
                url,
                stderr.trim()
            )));
        }

        let info = parse_info(&String::from_utf8_lossy(&output.stdout))?;
        let path = self.audio_path(&info.id);

        if !path.exists() {
            return Err(YtWhisperError::Download(format!(
                "{} reported success but {} was not created",
                self.program,
                path.display()
            )));
        }

        info!(
            "Downloaded video \"{}\". Generating subtitles...",
            info.title
        );

        Ok(FetchedAudio {
            path,
            id: info.id,
            title: info.title,
        })
    }
}

#[derive(Debug, Deserialize)]
struct VideoInfo {
    id: String,
    #[serde(default)]
    title: Option<String>,
}

struct ParsedInfo {
    id: String,
    title: String,
}

/// Read the info JSON yt-dlp prints on stdout. The last JSON line wins.
fn parse_info(stdout: &str) -> Result<ParsedInfo> {
    let info: VideoInfo = stdout
        .lines()
        .rev()
        .map(str::trim)
        .filter(|line| line.starts_with('{'))
        .find_map(|line| serde_json::from_str(line).ok())
        .ok_or_else(|| {
            YtWhisperError::Download("yt-dlp printed no video information".to_string())
        })?;

    if info.id.is_empty()
        || info.id.starts_with('.')
        || Path::new(&info.id).components().count() != 1
    {
        return Err(YtWhisperError::Download(format!(
            "yt-dlp reported an unusable video id: {:?}",
            info.id
        )));
    }

    let title = info
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| info.id.clone());

    Ok(ParsedInfo { id: info.id, title })
}
