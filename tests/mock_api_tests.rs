//! Mock API tests for the transcription client and the pipeline
//!
//! The Whisper client is pointed at a local wiremock server; the pipeline runs
//! against in-memory fetchers and transcribers.

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use yt_whisper::config::{NameFormat, OutputFormat, Task};
use yt_whisper::fetch::{AudioFetcher, FetchedAudio};
use yt_whisper::subtitle::Segment;
use yt_whisper::transcribe::{TranscribeOptions, Transcriber, Transcript, WhisperClient};
use yt_whisper::{generate_subtitles, PipelineConfig, Result, YtWhisperError};

fn audio_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".mp3")
        .tempfile()
        .unwrap();
    std::io::Write::write_all(&mut file, b"ID3 fake audio").unwrap();
    file
}

fn verbose_json() -> serde_json::Value {
    json!({
        "task": "transcribe",
        "language": "english",
        "duration": 2.5,
        "text": "Hello world Goodbye",
        "segments": [
            {"id": 0, "seek": 0, "start": 0.0, "end": 1.0, "text": " Hello world"},
            {"id": 1, "seek": 0, "start": 1.0, "end": 2.5, "text": " Goodbye"}
        ]
    })
}

// ============================================================================
// Whisper API Mock Tests
// ============================================================================

mod whisper_tests {
    use super::*;

    fn client(server: &MockServer) -> WhisperClient {
        WhisperClient::new("test-api-key".to_string())
            .with_base_url(format!("{}/v1", server.uri()))
            .with_retry_delay(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_whisper_client_creation() {
        let client = WhisperClient::new("test-api-key".to_string()).with_model("whisper-large");
        assert_eq!(client.name(), "OpenAI Whisper");
        assert_eq!(client.model(), "whisper-large");
    }

    #[tokio::test]
    async fn test_transcribe_parses_segments() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/audio/transcriptions"))
            .and(header("authorization", "Bearer test-api-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(verbose_json()))
            .expect(1)
            .mount(&server)
            .await;

        let audio = audio_file();
        let options = TranscribeOptions {
            task: Task::Transcribe,
            language: Some("en".to_string()),
        };
        let transcript = client(&server)
            .transcribe(audio.path(), &options)
            .await
            .unwrap();

        assert_eq!(
            transcript.segments,
            vec![
                Segment::new(0.0, 1.0, "Hello world"),
                Segment::new(1.0, 2.5, "Goodbye"),
            ]
        );
        assert_eq!(transcript.language.as_deref(), Some("english"));
    }

    #[tokio::test]
    async fn test_translate_uses_translation_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/audio/translations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(verbose_json()))
            .expect(1)
            .mount(&server)
            .await;

        let audio = audio_file();
        let options = TranscribeOptions {
            task: Task::Translate,
            language: None,
        };
        let transcript = client(&server)
            .transcribe(audio.path(), &options)
            .await
            .unwrap();

        assert_eq!(transcript.segments.len(), 2);
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(verbose_json()))
            .expect(1)
            .mount(&server)
            .await;

        let audio = audio_file();
        let transcript = client(&server)
            .transcribe(audio.path(), &TranscribeOptions::default())
            .await
            .unwrap();

        assert_eq!(transcript.segments.len(), 2);
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {
                    "message": "Rate limit reached",
                    "type": "requests"
                }
            })))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(verbose_json()))
            .expect(1)
            .mount(&server)
            .await;

        let audio = audio_file();
        let transcript = client(&server)
            .transcribe(audio.path(), &TranscribeOptions::default())
            .await
            .unwrap();

        assert_eq!(transcript.segments.len(), 2);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {
                    "message": "Incorrect API key provided",
                    "type": "invalid_request_error",
                    "code": "invalid_api_key"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let audio = audio_file();
        let result = client(&server)
            .transcribe(audio.path(), &TranscribeOptions::default())
            .await;

        match result {
            Err(YtWhisperError::Api(message)) => {
                assert!(message.contains("Incorrect API key provided"))
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_whisper_handles_missing_file() {
        let client = WhisperClient::new("test-api-key".to_string());
        let result = client
            .transcribe(
                Path::new("/tmp/nonexistent_yt_whisper_test.mp3"),
                &TranscribeOptions::default(),
            )
            .await;

        assert!(matches!(result, Err(YtWhisperError::Io(_))));
    }
}

// ============================================================================
// Pipeline Tests
// ============================================================================

mod pipeline_tests {
    use super::*;

    struct FakeFetcher {
        videos: HashMap<String, FetchedAudio>,
    }

    impl FakeFetcher {
        fn new(entries: &[(&str, &str, &str)]) -> Self {
            let videos = entries
                .iter()
                .map(|(url, id, title)| {
                    (
                        url.to_string(),
                        FetchedAudio {
                            path: PathBuf::from(format!("/audio/{id}.mp3")),
                            id: id.to_string(),
                            title: title.to_string(),
                        },
                    )
                })
                .collect();
            Self { videos }
        }
    }

    #[async_trait]
    impl AudioFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedAudio> {
            self.videos
                .get(url)
                .cloned()
                .ok_or_else(|| YtWhisperError::Download(format!("unknown url {url}")))
        }
    }

    /// Returns a fixed transcript per audio file name.
    struct FakeTranscriber {
        transcripts: HashMap<PathBuf, Vec<Segment>>,
        fallback: Vec<Segment>,
    }

    impl FakeTranscriber {
        fn always(segments: Vec<Segment>) -> Self {
            Self {
                transcripts: HashMap::new(),
                fallback: segments,
            }
        }
    }

    #[async_trait]
    impl Transcriber for FakeTranscriber {
        async fn transcribe(&self, audio: &Path, _options: &TranscribeOptions) -> Result<Transcript> {
            tracing::warn!("model warning that should be suppressed");
            tokio::time::sleep(Duration::from_millis(5)).await;
            let segments = self
                .transcripts
                .get(audio)
                .cloned()
                .unwrap_or_else(|| self.fallback.clone());
            Ok(Transcript {
                segments,
                language: Some("en".to_string()),
            })
        }

        fn name(&self) -> &'static str {
            "fake"
        }
    }

    fn sample_segments() -> Vec<Segment> {
        vec![
            Segment::new(0.0, 1.0, "Hello world"),
            Segment::new(1.0, 2.5, "Goodbye"),
        ]
    }

    fn config(dir: &Path, format: OutputFormat) -> PipelineConfig {
        PipelineConfig {
            format,
            output_dir: dir.to_path_buf(),
            show_progress: false,
            ..Default::default()
        }
    }

    fn not_cancelled() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(false))
    }

    #[tokio::test]
    async fn test_writes_vtt_named_after_title() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::new(&[("https://v/1", "vid1", "My First Video!")]);
        let transcriber = FakeTranscriber::always(sample_segments());

        let result = generate_subtitles(
            &["https://v/1".to_string()],
            &fetcher,
            &transcriber,
            &config(dir.path(), OutputFormat::Vtt),
            not_cancelled(),
        )
        .await
        .unwrap();

        let expected_path = dir.path().join("my-first-video.vtt");
        assert_eq!(result.outputs.len(), 1);
        assert_eq!(result.outputs[0].output_path, expected_path);
        assert_eq!(result.outputs[0].segments, 2);
        assert_eq!(
            std::fs::read_to_string(expected_path).unwrap(),
            "WEBVTT\n\n00:00:00.000 --> 00:00:01.000\nHello world\n\n\
             00:00:01.000 --> 00:00:02.500\nGoodbye\n"
        );
    }

    #[tokio::test]
    async fn test_writes_wrapped_srt_named_after_id() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::new(&[("https://v/1", "vid1", "Title")]);
        let transcriber = FakeTranscriber::always(vec![Segment::new(
            0.0,
            3.0,
            "The quick brown fox jumps over",
        )]);
        let config = PipelineConfig {
            name_format: NameFormat::Id,
            break_lines: 20,
            ..config(dir.path(), OutputFormat::Srt)
        };

        generate_subtitles(
            &["https://v/1".to_string()],
            &fetcher,
            &transcriber,
            &config,
            not_cancelled(),
        )
        .await
        .unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join("vid1.srt")).unwrap(),
            "1\n00:00:00,000 --> 00:00:03,000\nThe quick\nbrown fox jumps over\n\n"
        );
    }

    #[tokio::test]
    async fn test_outputs_keep_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::new(&[
            ("https://v/a", "a", "Alpha"),
            ("https://v/b", "b", "Bravo"),
            ("https://v/c", "c", "Charlie"),
        ]);
        let transcriber = FakeTranscriber::always(sample_segments());
        let urls: Vec<String> = ["https://v/a", "https://v/b", "https://v/c"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let config = PipelineConfig {
            concurrency: 3,
            ..config(dir.path(), OutputFormat::Csv)
        };

        let result = generate_subtitles(&urls, &fetcher, &transcriber, &config, not_cancelled())
            .await
            .unwrap();

        let ids: Vec<&str> = result.outputs.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        for name in ["alpha.csv", "bravo.csv", "charlie.csv"] {
            assert!(dir.path().join(name).exists(), "{name} missing");
        }
    }

    #[tokio::test]
    async fn test_bad_transcript_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::new(&[("https://v/1", "vid1", "Broken")]);
        let transcriber = FakeTranscriber::always(vec![
            Segment::new(0.0, 1.0, "fine"),
            Segment::new(1.0, 2.0, "   "),
        ]);

        let result = generate_subtitles(
            &["https://v/1".to_string()],
            &fetcher,
            &transcriber,
            &config(dir.path(), OutputFormat::Srt),
            not_cancelled(),
        )
        .await;

        assert!(matches!(result, Err(YtWhisperError::EmptyCaption)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::new(&[]);
        let transcriber = FakeTranscriber::always(sample_segments());

        let result = generate_subtitles(
            &["https://v/missing".to_string()],
            &fetcher,
            &transcriber,
            &config(dir.path(), OutputFormat::Vtt),
            not_cancelled(),
        )
        .await;

        assert!(matches!(result, Err(YtWhisperError::Download(_))));
    }

    #[tokio::test]
    async fn test_cancelled_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::new(&[("https://v/1", "vid1", "Title")]);
        let transcriber = FakeTranscriber::always(sample_segments());
        let cancelled = not_cancelled();
        cancelled.store(true, Ordering::Relaxed);

        let result = generate_subtitles(
            &["https://v/1".to_string()],
            &fetcher,
            &transcriber,
            &config(dir.path(), OutputFormat::Vtt),
            cancelled,
        )
        .await;

        assert!(matches!(result, Err(YtWhisperError::Cancelled)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_per_file_transcripts() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::new(&[
            ("https://v/1", "one", "One"),
            ("https://v/2", "two", "Two"),
        ]);
        let mut transcriber = FakeTranscriber::always(Vec::new());
        transcriber.transcripts.insert(
            PathBuf::from("/audio/one.mp3"),
            vec![Segment::new(0.0, 1.0, "first video")],
        );

        let result = generate_subtitles(
            &["https://v/1".to_string(), "https://v/2".to_string()],
            &fetcher,
            &transcriber,
            &config(dir.path(), OutputFormat::Srt),
            not_cancelled(),
        )
        .await
        .unwrap();

        assert_eq!(result.outputs[0].segments, 1);
        assert_eq!(result.outputs[1].segments, 0);
        assert_eq!(std::fs::read_to_string(dir.path().join("two.srt")).unwrap(), "");
    }
}
