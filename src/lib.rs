pub mod config;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod subtitle;
pub mod transcribe;

pub use config::Config;
pub use error::{Result, YtWhisperError};
pub use pipeline::{generate_subtitles, print_summary, PipelineConfig, PipelineResult, SourceOutput};
pub use subtitle::{Dialect, Segment};
