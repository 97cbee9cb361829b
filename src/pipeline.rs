use crate::config::{NameFormat, OutputFormat, Task};
use crate::error::{Result, YtWhisperError};
use crate::fetch::AudioFetcher;
use crate::subtitle::{create_writer, Segment, SubtitleWriter};
use crate::transcribe::{TranscribeOptions, Transcriber, Transcript};
use futures::stream::{FuturesUnordered, StreamExt};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use regex::Regex;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tokio::sync::Semaphore;
use tracing::instrument::WithSubscriber;
use tracing::{debug, error, info, Level};

/// Configuration for the subtitle generation pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Output file format.
    pub format: OutputFormat,
    /// Directory receiving the output files.
    pub output_dir: PathBuf,
    /// How output files are named.
    pub name_format: NameFormat,
    /// Maximum caption line width; 0 disables line breaking.
    pub break_lines: usize,
    /// Transcribe or translate to English.
    pub task: Task,
    /// Spoken language, `None` to let the model detect it.
    pub language: Option<String>,
    /// Number of sources processed at once.
    pub concurrency: usize,
    /// Show progress spinners.
    pub show_progress: bool,
    /// Let warnings from the transcription backend through.
    pub verbose: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            output_dir: PathBuf::from("."),
            name_format: NameFormat::default(),
            break_lines: 0,
            task: Task::default(),
            language: None,
            concurrency: 1,
            show_progress: true,
            verbose: false,
        }
    }
}

/// Outcome for one requested source.
#[derive(Debug, Clone)]
pub struct SourceOutput {
    pub url: String,
    pub id: String,
    pub title: String,
    pub output_path: PathBuf,
    pub segments: usize,
    /// Language reported by the transcription backend.
    pub language: Option<String>,
    pub download_time: Duration,
    pub transcription_time: Duration,
}

/// Result of the subtitle generation pipeline, outputs in input order.
#[derive(Debug)]
pub struct PipelineResult {
    pub outputs: Vec<SourceOutput>,
    pub format: OutputFormat,
    pub total_time: Duration,
}

/// Generate one subtitle file per URL.
///
/// For each source this:
/// 1. Fetches the audio
/// 2. Transcribes it, with backend warnings silenced unless verbose
/// 3. Writes the subtitle file atomically into the output directory
///
/// The first failing source, in input order, fails the whole run. Files of
/// sources that completed stay in place; a failed source never leaves a file.
pub async fn generate_subtitles(
    urls: &[String],
    fetcher: &dyn AudioFetcher,
    transcriber: &dyn Transcriber,
    config: &PipelineConfig,
    cancelled: Arc<AtomicBool>,
) -> Result<PipelineResult> {
    let start_time = Instant::now();

    if config.concurrency == 0 {
        return Err(YtWhisperError::Config(
            "Concurrency must be greater than 0".to_string(),
        ));
    }

    fs::create_dir_all(&config.output_dir)?;

    let multi_progress = config.show_progress.then(MultiProgress::new);
    let semaphore = Arc::new(Semaphore::new(config.concurrency));
    let writer = create_writer(config.format, config.break_lines);

    info!(
        "Processing {} source(s) with {} (concurrency: {})",
        urls.len(),
        transcriber.name(),
        config.concurrency
    );

    let mut futures = FuturesUnordered::new();

    for (index, url) in urls.iter().enumerate() {
        let sem = semaphore.clone();
        let cancelled = cancelled.clone();
        let progress = multi_progress.clone();
        let writer = writer.as_ref();

        futures.push(async move {
            let _permit = sem
                .acquire()
                .await
                .map_err(|_| YtWhisperError::Cancelled)?;
            let result = process_source(
                url,
                fetcher,
                transcriber,
                writer,
                config,
                &cancelled,
                progress.as_ref(),
            )
            .await;
            Ok::<_, YtWhisperError>((index, result))
        });
    }

    let mut results: Vec<(usize, Result<SourceOutput>)> = Vec::with_capacity(urls.len());
    while let Some(result) = futures.next().await {
        results.push(result?);
    }
    results.sort_by_key(|(index, _)| *index);

    let mut outputs = Vec::with_capacity(results.len());
    for (index, result) in results {
        match result {
            Ok(output) => outputs.push(output),
            Err(e) => {
                error!("Failed to generate subtitles for {}: {}", urls[index], e);
                return Err(e);
            }
        }
    }

    Ok(PipelineResult {
        outputs,
        format: config.format,
        total_time: start_time.elapsed(),
    })
}

async fn process_source(
    url: &str,
    fetcher: &dyn AudioFetcher,
    transcriber: &dyn Transcriber,
    writer: &dyn SubtitleWriter,
    config: &PipelineConfig,
    cancelled: &AtomicBool,
    progress: Option<&MultiProgress>,
) -> Result<SourceOutput> {
    check_cancelled(cancelled)?;

    // Download
    let download_start = Instant::now();
    let pb = progress.map(|mp| spinner(mp, format!("Downloading {url}...")));
    let audio = fetcher.fetch(url).await?;
    let download_time = download_start.elapsed();
    if let Some(pb) = pb {
        pb.finish_with_message(format!("✓ Downloaded \"{}\"", audio.title));
    }
    debug!("Fetched {:?} for {} in {:.2}s", audio.path, url, download_time.as_secs_f64());

    check_cancelled(cancelled)?;

    // Transcribe
    let transcription_start = Instant::now();
    let pb = progress.map(|mp| spinner(mp, format!("Transcribing \"{}\"...", audio.title)));
    let options = TranscribeOptions {
        task: config.task,
        language: config.language.clone(),
    };
    let transcript = transcribe_scoped(transcriber, &audio.path, &options, config.verbose).await?;
    let transcription_time = transcription_start.elapsed();
    if let Some(pb) = pb {
        pb.finish_with_message(format!(
            "✓ Transcribed {} segments",
            transcript.segments.len()
        ));
    }

    check_cancelled(cancelled)?;

    // Write
    let name = output_name(config.name_format, &audio.title, &audio.id);
    let output_path = config
        .output_dir
        .join(format!("{}.{}", name, writer.extension()));
    write_atomically(&output_path, writer, &transcript.segments)?;

    let shown = fs::canonicalize(&output_path).unwrap_or_else(|_| output_path.clone());
    info!(
        "Saved {} to {}",
        config.format.to_string().to_uppercase(),
        shown.display()
    );

    Ok(SourceOutput {
        url: url.to_string(),
        id: audio.id,
        title: audio.title,
        output_path,
        segments: transcript.segments.len(),
        language: transcript.language,
        download_time,
        transcription_time,
    })
}

/// Run the transcription. Unless verbose, only ERROR events emitted while it
/// runs reach the log; the restriction ends with the call.
async fn transcribe_scoped(
    transcriber: &dyn Transcriber,
    audio: &Path,
    options: &TranscribeOptions,
    verbose: bool,
) -> Result<Transcript> {
    if verbose {
        return transcriber.transcribe(audio, options).await;
    }

    let errors_only = tracing_subscriber::fmt()
        .with_max_level(Level::ERROR)
        .with_target(false)
        .compact()
        .finish();

    transcriber
        .transcribe(audio, options)
        .with_subscriber(errors_only)
        .await
}

/// Write the file body to a temporary file beside `path` and move it into
/// place only once everything was written.
pub fn write_atomically(
    path: &Path,
    writer: &dyn SubtitleWriter,
    segments: &[Segment],
) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temp = NamedTempFile::new_in(dir)?;
    {
        let mut sink = BufWriter::new(temp.as_file_mut());
        writer.write_to(&mut sink, segments)?;
        sink.flush()?;
    }
    temp.persist(path)?;

    Ok(())
}

fn check_cancelled(cancelled: &AtomicBool) -> Result<()> {
    if cancelled.load(Ordering::Relaxed) {
        return Err(YtWhisperError::Cancelled);
    }
    Ok(())
}

fn spinner(mp: &MultiProgress, message: String) -> ProgressBar {
    let pb = mp.add(ProgressBar::new_spinner());
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// File name stem for a source, without extension.
pub fn output_name(format: NameFormat, title: &str, id: &str) -> String {
    match format {
        NameFormat::Title => {
            let slug = slugify(title);
            if slug.is_empty() {
                id.to_string()
            } else {
                slug
            }
        }
        NameFormat::Id => id.to_string(),
    }
}

/// Turn a title into a file-name friendly slug: lowercase, word characters
/// only, words joined by single hyphens.
pub fn slugify(title: &str) -> String {
    static NON_WORD: OnceLock<Regex> = OnceLock::new();
    static SEPARATORS: OnceLock<Regex> = OnceLock::new();

    let non_word = NON_WORD.get_or_init(|| Regex::new(r"[^\w\s-]").expect("valid regex"));
    let separators = SEPARATORS.get_or_init(|| Regex::new(r"[-\s]+").expect("valid regex"));

    let lowered = title.to_lowercase();
    let cleaned = non_word.replace_all(&lowered, "");
    let joined = separators.replace_all(&cleaned, "-");
    joined.trim_matches(|c| c == '-' || c == '_').to_string()
}

/// Print a summary of the pipeline results.
pub fn print_summary(result: &PipelineResult) {
    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                    Subtitle Generation Complete               ");
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    for output in &result.outputs {
        println!("  {}", output.title);
        println!("    Output:      {}", output.output_path.display());
        println!("    Captions:    {}", output.segments);
        if let Some(ref lang) = output.language {
            println!("    Language:    {}", lang);
        }
        println!(
            "    Download:    {:.2}s",
            output.download_time.as_secs_f64()
        );
        println!(
            "    Transcribe:  {:.2}s",
            output.transcription_time.as_secs_f64()
        );
        println!();
    }
    println!(
        "  {} {} file(s) in {:.2}s",
        result.outputs.len(),
        result.format.to_string().to_uppercase(),
        result.total_time.as_secs_f64()
    );
    println!();
    println!("═══════════════════════════════════════════════════════════════");
}
