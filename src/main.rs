use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use yt_whisper::config::{Config, NameFormat, OutputFormat, Task};
use yt_whisper::fetch::{check_ffmpeg, check_ytdlp, YtDlpFetcher};
use yt_whisper::transcribe::WhisperClient;
use yt_whisper::{generate_subtitles, print_summary, PipelineConfig};

#[derive(Parser)]
#[command(name = "yt-whisper")]
#[command(version, about = "Generate subtitles for online videos with Whisper")]
#[command(
    long_about = "Download the audio of one or more videos with yt-dlp, transcribe it with an OpenAI-compatible Whisper API and write VTT, SRT or CSV subtitles."
)]
struct Cli {
    /// Video URLs to transcribe
    #[arg(required = true)]
    video: Vec<String>,

    /// Name of the Whisper model to use
    #[arg(long)]
    model: Option<String>,

    /// Subtitle format to output: vtt, srt, csv
    #[arg(short, long)]
    format: Option<String>,

    /// Directory to save the outputs
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// How to name output files: title, id
    #[arg(long)]
    output_name_format: Option<String>,

    /// Print progress and debug messages
    #[arg(short, long)]
    verbose: bool,

    /// Speech recognition ('transcribe') or translation to English ('translate')
    #[arg(long, default_value = "transcribe")]
    task: String,

    /// Language spoken in the audio; omit to detect it
    #[arg(short, long)]
    language: Option<String>,

    /// Break captions into a bottom-heavy pyramid of lines at most N characters wide. 0 disables line breaking.
    #[arg(long)]
    break_lines: Option<usize>,

    /// Number of videos processed at once
    #[arg(short, long)]
    concurrency: Option<usize>,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(model) = cli.model {
        config.model = model;
    }
    if let Some(concurrency) = cli.concurrency {
        config.concurrency = concurrency;
    }
    config
        .validate()
        .context("Configuration validation failed")?;

    let format: OutputFormat = match cli.format {
        Some(ref f) => f.parse().map_err(|e: String| anyhow::anyhow!(e))?,
        None => config.default_format,
    };
    let name_format: NameFormat = match cli.output_name_format {
        Some(ref f) => f.parse().map_err(|e: String| anyhow::anyhow!(e))?,
        None => config.name_format,
    };
    let task: Task = cli.task.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    check_ytdlp().await.context("yt-dlp is required to download audio")?;
    check_ffmpeg().await.context("FFmpeg is required to extract audio")?;

    let pipeline_config = PipelineConfig {
        format,
        output_dir: cli.output_dir.unwrap_or(config.output_dir.clone()),
        name_format,
        break_lines: cli.break_lines.unwrap_or(config.break_lines),
        task,
        language: cli.language,
        concurrency: config.concurrency,
        show_progress: !cli.verbose,
        verbose: cli.verbose,
    };

    info!("Videos:   {}", cli.video.len());
    info!("Output:   {}", pipeline_config.output_dir.display());
    info!("Format:   {}", format);
    info!("Model:    {}", config.model);
    info!("Task:     {}", task);
    if let Some(ref language) = pipeline_config.language {
        info!("Language: {}", language);
    }
    if pipeline_config.break_lines > 0 {
        info!("Break lines at {} characters", pipeline_config.break_lines);
    }

    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = cancelled.clone();
    ctrlc::set_handler(move || {
        warn!("Interrupted, finishing up...");
        flag.store(true, Ordering::Relaxed);
    })
    .context("Failed to install Ctrl+C handler")?;

    // Downloaded audio lives only as long as this directory.
    let download_dir = tempfile::Builder::new()
        .prefix("yt-whisper-")
        .tempdir()
        .context("Failed to create download directory")?;
    let fetcher = YtDlpFetcher::new(download_dir.path());

    let api_key = config
        .openai_api_key
        .clone()
        .context("OPENAI_API_KEY not set")?;
    let mut transcriber = WhisperClient::new(api_key).with_model(config.model.clone());
    if let Some(ref base_url) = config.api_base_url {
        transcriber = transcriber.with_base_url(base_url.clone());
    }

    let result = generate_subtitles(
        &cli.video,
        &fetcher,
        &transcriber,
        &pipeline_config,
        cancelled,
    )
    .await
    .context("Subtitle generation failed")?;

    print_summary(&result);

    Ok(())
}
