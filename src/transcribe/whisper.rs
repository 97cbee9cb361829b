use crate::config::Task;
use crate::error::{Result, YtWhisperError};
use crate::subtitle::Segment;
use crate::transcribe::{TranscribeOptions, Transcriber, Transcript};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, warn};

/// Default OpenAI API base URL.
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Maximum file size for the Whisper API (25 MB).
const MAX_FILE_SIZE: u64 = 25 * 1024 * 1024;

/// Maximum attempts for API calls.
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (milliseconds).
const BASE_DELAY_MS: u64 = 1000;

/// OpenAI-compatible Whisper API client.
pub struct WhisperClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    retry_delay: Duration,
}

/// Outcome of a single API attempt.
enum Attempt {
    Done(WhisperResponse),
    Retry(YtWhisperError),
    Fatal(YtWhisperError),
}

impl WhisperClient {
    /// Create a new Whisper client with the given API key.
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: "whisper-1".to_string(),
            retry_delay: Duration::from_millis(BASE_DELAY_MS),
        }
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the client at another OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the base backoff delay between retries.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self, task: Task) -> String {
        match task {
            Task::Transcribe => format!("{}/audio/transcriptions", self.base_url),
            Task::Translate => format!("{}/audio/translations", self.base_url),
        }
    }

    /// Build the multipart form for the API request.
    async fn build_form(&self, audio_path: &Path, options: &TranscribeOptions) -> Result<Form> {
        let file_bytes = fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();

        let mime_type = match audio_path.extension().and_then(|e| e.to_str()) {
            Some("wav") => "audio/wav",
            Some("mp3") => "audio/mpeg",
            Some("m4a") => "audio/mp4",
            Some("flac") => "audio/flac",
            Some("ogg") | Some("opus") => "audio/ogg",
            Some("webm") => "audio/webm",
            _ => "application/octet-stream",
        };

        let file_part = Part::bytes(file_bytes)
            .file_name(file_name)
            .mime_str(mime_type)?;

        let mut form = Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json");

        // The translations endpoint always answers in English.
        if options.task == Task::Transcribe {
            form = form.text("timestamp_granularities[]", "segment");
            if let Some(ref lang) = options.language {
                form = form.text("language", lang.clone());
            }
        }

        Ok(form)
    }

    /// Make one API request (the form is consumed, so retries rebuild it).
    async fn call_api(&self, form: Form, task: Task) -> Attempt {
        let response = match self
            .client
            .post(self.endpoint(task))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Attempt::Retry(e.into()),
        };

        let status = response.status();
        debug!("Whisper API response status: {}", status);

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return Attempt::Retry(e.into()),
        };

        if status.is_success() {
            debug!("Whisper API response: {}", truncate(&body, 500));
            return match serde_json::from_str::<WhisperResponse>(&body) {
                Ok(parsed) => Attempt::Done(parsed),
                Err(e) => Attempt::Fatal(e.into()),
            };
        }

        let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
            Ok(api_error) => format!(
                "Whisper API error ({}): {} ({})",
                status, api_error.error.message, api_error.error.r#type
            ),
            Err(_) => format!("Whisper API error ({}): {}", status, body),
        };
        let error = YtWhisperError::Api(message);

        // Client errors will not change on retry, except rate limiting.
        if status.is_client_error() && status.as_u16() != 429 {
            Attempt::Fatal(error)
        } else {
            Attempt::Retry(error)
        }
    }

    async fn request_with_retry(
        &self,
        audio: &Path,
        options: &TranscribeOptions,
    ) -> Result<WhisperResponse> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = self.retry_delay * 2u32.pow(attempt - 1);
                debug!("Retry attempt {} after {:?}", attempt, delay);
                tokio::time::sleep(delay).await;
            }

            let form = self.build_form(audio, options).await?;

            match self.call_api(form, options.task).await {
                Attempt::Done(response) => return Ok(response),
                Attempt::Fatal(e) => return Err(e),
                Attempt::Retry(e) => {
                    warn!("Attempt {} failed: {}", attempt + 1, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| YtWhisperError::Api("Unknown error".to_string())))
    }

    /// Convert a Whisper API response into a transcript.
    fn parse_response(&self, response: WhisperResponse) -> Transcript {
        let segments = match response.segments {
            Some(api_segments) => api_segments
                .into_iter()
                .map(|seg| Segment::new(seg.start, seg.end, seg.text.trim()))
                .filter(|seg| {
                    if seg.text.is_empty() {
                        debug!(
                            "Dropping blank segment {:.3}s-{:.3}s",
                            seg.start, seg.end
                        );
                    }
                    !seg.text.is_empty()
                })
                .collect(),
            None if !response.text.trim().is_empty() => vec![Segment::new(
                0.0,
                response.duration.unwrap_or(0.0),
                response.text.trim(),
            )],
            None => Vec::new(),
        };

        Transcript {
            segments,
            language: response.language,
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

#[async_trait]
impl Transcriber for WhisperClient {
    async fn transcribe(&self, audio: &Path, options: &TranscribeOptions) -> Result<Transcript> {
        debug!("Transcribing {:?} with Whisper ({})", audio, options.task);

        let metadata = fs::metadata(audio).await?;
        if metadata.len() > MAX_FILE_SIZE {
            return Err(YtWhisperError::Transcription(format!(
                "File too large for Whisper API: {} bytes (max {} bytes)",
                metadata.len(),
                MAX_FILE_SIZE
            )));
        }

        let response = self.request_with_retry(audio, options).await?;
        let transcript = self.parse_response(response);

        debug!("Whisper returned {} segments", transcript.segments.len());

        Ok(transcript)
    }

    fn name(&self) -> &'static str {
        "OpenAI Whisper"
    }
}

// API response types

#[derive(Debug, Deserialize)]
struct WhisperResponse {
    text: String,
    #[serde(default)]
    segments: Option<Vec<WhisperSegment>>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    #[serde(default)]
    r#type: String,
}
