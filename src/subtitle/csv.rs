// Tabular segment dump: start,end,text
use super::{Segment, SubtitleWriter};
use crate::error::{Result, YtWhisperError};
use std::io::Write;

pub struct CsvWriter;

impl SubtitleWriter for CsvWriter {
    fn write_to(&self, sink: &mut dyn Write, segments: &[Segment]) -> Result<()> {
        writeln!(sink, "start,end,text")?;

        for segment in segments {
            segment.validate_times()?;
            let text = segment.text.trim();
            if text.is_empty() {
                return Err(YtWhisperError::EmptyCaption);
            }
            writeln!(sink, "{},{},{}", segment.start, segment.end, quote_field(text))?;
        }

        sink.flush()?;
        Ok(())
    }

    fn extension(&self) -> &'static str {
        "csv"
    }
}

fn quote_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
