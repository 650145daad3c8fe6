use std::path::Path;
use std::process::{Command, Stdio};

use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use tracing::debug;

use super::{ContentDate, DateResolver};
use crate::{Error, Result};

/// External tool used to read video container metadata
pub const FFPROBE: &str = "ffprobe";

/// Fails with [`Error::ToolNotFound`] unless `tool` can be spawned from `PATH`
pub fn ensure_tool_available(tool: &str) -> Result<()> {
    let status = Command::new(tool)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match status {
        Ok(_) => Ok(()),
        Err(_) => Err(Error::ToolNotFound {
            tool: tool.to_string(),
        }),
    }
}

/// Reads `creation_time` from video containers via ffprobe
#[derive(Debug)]
pub struct FfprobeDateResolver {
    program: String,
}

impl Default for FfprobeDateResolver {
    fn default() -> Self {
        Self {
            program: FFPROBE.to_string(),
        }
    }
}

impl FfprobeDateResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different ffprobe binary
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

impl DateResolver for FfprobeDateResolver {
    fn resolve(&self, path: &Path) -> Option<ContentDate> {
        let output = Command::new(&self.program)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_entries",
                "format_tags=creation_time:stream_tags=creation_time",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .ok()?;

        if !output.status.success() {
            debug!("{} failed for {}", self.program, path.display());
            return None;
        }

        parse_ffprobe_output(&output.stdout)
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeSection>,
    #[serde(default)]
    streams: Vec<FfprobeSection>,
}

#[derive(Debug, Deserialize)]
struct FfprobeSection {
    #[serde(default)]
    tags: Option<FfprobeTags>,
}

#[derive(Debug, Deserialize)]
struct FfprobeTags {
    creation_time: Option<String>,
}

/// Container-level creation time wins over per-stream values
fn parse_ffprobe_output(stdout: &[u8]) -> Option<ContentDate> {
    let output: FfprobeOutput = serde_json::from_slice(stdout).ok()?;

    output
        .format
        .iter()
        .chain(output.streams.iter())
        .filter_map(|section| section.tags.as_ref()?.creation_time.as_deref())
        .find_map(parse_creation_time)
}

fn parse_creation_time(value: &str) -> Option<ContentDate> {
    let date = DateTime::parse_from_rfc3339(value.trim()).ok()?.date_naive();
    // Some cameras write the epoch when no clock was set
    if date == NaiveDate::from_ymd_opt(1970, 1, 1)? {
        return None;
    }
    Some(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format_creation_time() {
        let json = br#"{"streams":[{"tags":{"creation_time":"2021-01-02T00:00:00.000000Z"}}],
            "format":{"tags":{"creation_time":"2023-06-15T18:04:11.000000Z"}}}"#;
        assert_eq!(parse_ffprobe_output(json), NaiveDate::from_ymd_opt(2023, 6, 15));
    }

    #[test]
    fn test_falls_back_to_stream_tags() {
        let json = br#"{"streams":[{},{"tags":{"creation_time":"2022-11-30T23:59:59Z"}}],"format":{}}"#;
        assert_eq!(parse_ffprobe_output(json), NaiveDate::from_ymd_opt(2022, 11, 30));
    }

    #[test]
    fn test_missing_or_bogus_dates() {
        assert_eq!(parse_ffprobe_output(b"{}"), None);
        assert_eq!(parse_ffprobe_output(b"not json"), None);
        assert_eq!(parse_creation_time("1970-01-01T00:00:00Z"), None);
        assert_eq!(parse_creation_time("yesterday"), None);
    }

    #[test]
    fn test_missing_tool_detected() {
        let err = ensure_tool_available("definitely-not-a-real-tool").unwrap_err();
        assert!(matches!(err, Error::ToolNotFound { .. }));
    }

    #[test]
    fn test_missing_program_resolves_absent() {
        let resolver = FfprobeDateResolver::new().with_program("definitely-not-a-real-tool");
        assert_eq!(resolver.resolve(Path::new("/tmp/clip.mp4")), None);
    }
}
