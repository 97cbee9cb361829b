use super::{format_timestamp, wrap_text, Dialect, Segment, SubtitleWriter};
use crate::error::Result;
use std::io::Write;

/// Render one caption block: the optional cue number, the time-code line and
/// the wrapped text lines. No separating blank line is included.
///
/// The cue number is only emitted for dialects that number their cues.
pub fn render_caption(
    segment: &Segment,
    index: Option<usize>,
    dialect: Dialect,
    max_width: usize,
) -> Result<Vec<String>> {
    segment.validate_times()?;

    let mut lines = Vec::new();

    if let Some(index) = index.filter(|_| dialect.is_numbered()) {
        lines.push(index.to_string());
    }

    lines.push(format!(
        "{} --> {}",
        format_timestamp(segment.start, dialect)?,
        format_timestamp(segment.end, dialect)?
    ));

    // A literal cue arrow in the text would read as a time-code line.
    lines.extend(
        wrap_text(segment.text.trim(), max_width)?
            .into_iter()
            .map(|line| line.replace("-->", "->")),
    );

    Ok(lines)
}

/// Write a whole caption file body to `sink`, one block per segment in input order.
///
/// Header dialects get the header line and a blank line before every block.
/// Numbered dialects get 1-based cue numbers and a blank line after every block.
pub fn write_captions(
    sink: &mut dyn Write,
    segments: &[Segment],
    dialect: Dialect,
    max_width: usize,
) -> Result<()> {
    if let Some(header) = dialect.header() {
        writeln!(sink, "{header}")?;
    }

    for (i, segment) in segments.iter().enumerate() {
        let block = render_caption(segment, Some(i + 1), dialect, max_width)?;

        if dialect.header().is_some() {
            writeln!(sink)?;
        }
        for line in &block {
            writeln!(sink, "{line}")?;
        }
        if dialect.is_numbered() {
            writeln!(sink)?;
        }
    }

    sink.flush()?;
    Ok(())
}

/// Writes WebVTT or SRT files.
pub struct CaptionWriter {
    dialect: Dialect,
    max_width: usize,
}

impl CaptionWriter {
    pub fn new(dialect: Dialect, max_width: usize) -> Self {
        Self { dialect, max_width }
    }
}

impl SubtitleWriter for CaptionWriter {
    fn write_to(&self, sink: &mut dyn Write, segments: &[Segment]) -> Result<()> {
        write_captions(sink, segments, self.dialect, self.max_width)
    }

    fn extension(&self) -> &'static str {
        self.dialect.extension()
    }
}
