pub mod caption;
pub mod csv;
pub mod timestamp;
pub mod wrap;

pub use caption::{render_caption, write_captions, CaptionWriter};
pub use csv::CsvWriter;
pub use timestamp::format_timestamp;
pub use wrap::wrap_text;

use crate::config::OutputFormat;
use crate::error::{Result, YtWhisperError};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// A timed piece of transcribed speech. Offsets are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl Segment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    /// Check the offsets are finite, non-negative and ordered.
    pub fn validate_times(&self) -> Result<()> {
        for (name, value) in [("start", self.start), ("end", self.end)] {
            if !value.is_finite() || value < 0.0 {
                return Err(YtWhisperError::InvalidTimestamp(format!(
                    "segment {name} {value} is not a non-negative finite offset"
                )));
            }
        }

        if self.end < self.start {
            return Err(YtWhisperError::InvalidTimestamp(format!(
                "segment ends at {} before it starts at {}",
                self.end, self.start
            )));
        }

        Ok(())
    }
}

/// Caption file dialects sharing the block renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// WebVTT: `WEBVTT` header, dot before milliseconds, unnumbered cues.
    WebVtt,
    /// SubRip: numbered cues, comma before milliseconds, no header.
    Srt,
}

impl Dialect {
    pub fn millis_separator(&self) -> char {
        match self {
            Dialect::WebVtt => '.',
            Dialect::Srt => ',',
        }
    }

    pub fn header(&self) -> Option<&'static str> {
        match self {
            Dialect::WebVtt => Some("WEBVTT"),
            Dialect::Srt => None,
        }
    }

    pub fn is_numbered(&self) -> bool {
        matches!(self, Dialect::Srt)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Dialect::WebVtt => "vtt",
            Dialect::Srt => "srt",
        }
    }
}

pub trait SubtitleWriter: Send + Sync {
    /// Write the complete file body for `segments` to `sink`.
    fn write_to(&self, sink: &mut dyn Write, segments: &[Segment]) -> Result<()>;

    fn extension(&self) -> &'static str;

    /// Render the file body into a string.
    fn format(&self, segments: &[Segment]) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer, segments)?;
        String::from_utf8(buffer).map_err(|e| {
            YtWhisperError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }
}

pub fn create_writer(format: OutputFormat, max_width: usize) -> Box<dyn SubtitleWriter> {
    match format {
        OutputFormat::Vtt => Box::new(CaptionWriter::new(Dialect::WebVtt, max_width)),
        OutputFormat::Srt => Box::new(CaptionWriter::new(Dialect::Srt, max_width)),
        OutputFormat::Csv => Box::new(CsvWriter),
    }
}
