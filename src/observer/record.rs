//! Timestamped output line records.

use std::fmt;

use chrono::{DateTime, Local, Timelike};
use serde::ser::{Serialize, SerializeStruct, Serializer};

/// Timestamp format used for display and serialization.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Stream a line was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

impl StreamKind {
    /// Short lowercase name, used in log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One captured line of process output.
///
/// A record carries text from exactly one stream; [`LineRecord::stdout`]
/// and [`LineRecord::stderr`] are projections of that single text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRecord {
    time: DateTime<Local>,
    kind: StreamKind,
    text: String,
}

impl LineRecord {
    /// Create a record stamped with the current time.
    pub fn new(kind: StreamKind, text: impl Into<String>) -> Self {
        Self::at(Local::now(), kind, text)
    }

    /// Create a record with an explicit capture time, truncated to
    /// whole seconds.
    pub fn at(time: DateTime<Local>, kind: StreamKind, text: impl Into<String>) -> Self {
        let time = time.with_nanosecond(0).unwrap_or(time);
        Self {
            time,
            kind,
            text: text.into(),
        }
    }

    /// Create a stdout record.
    pub fn stdout_line(text: impl Into<String>) -> Self {
        Self::new(StreamKind::Stdout, text)
    }

    /// Create a stderr record.
    pub fn stderr_line(text: impl Into<String>) -> Self {
        Self::new(StreamKind::Stderr, text)
    }

    /// Capture time.
    pub fn time(&self) -> DateTime<Local> {
        self.time
    }

    /// Capture time formatted as `YYYY-MM-DD HH:MM:SS`.
    pub fn time_string(&self) -> String {
        self.time.format(TIME_FORMAT).to_string()
    }

    /// Stream this record came from.
    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    /// Line text, whichever stream it came from.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Text if this record came from stdout.
    pub fn stdout(&self) -> Option<&str> {
        (self.kind == StreamKind::Stdout).then_some(self.text.as_str())
    }

    /// Text if this record came from stderr.
    pub fn stderr(&self) -> Option<&str> {
        (self.kind == StreamKind::Stderr).then_some(self.text.as_str())
    }

    /// Check if this record came from stdout.
    pub fn is_stdout(&self) -> bool {
        self.kind == StreamKind::Stdout
    }

    /// Check if this record came from stderr.
    pub fn is_stderr(&self) -> bool {
        self.kind == StreamKind::Stderr
    }
}

impl fmt::Display for LineRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.kind {
            StreamKind::Stdout => "out",
            StreamKind::Stderr => "err",
        };
        write!(f, "[{}] {}| {}", self.time_string(), tag, self.text)
    }
}

impl Serialize for LineRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut record = serializer.serialize_struct("LineRecord", 3)?;
        record.serialize_field("time", &self.time_string())?;
        record.serialize_field("stdout", &self.stdout())?;
        record.serialize_field("stderr", &self.stderr())?;
        record.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 3, 9, 14, 5, 7)
            .single()
            .expect("unambiguous local time")
    }

    #[test]
    fn test_exactly_one_field() {
        let out = LineRecord::stdout_line("hello");
        assert_eq!(out.stdout(), Some("hello"));
        assert_eq!(out.stderr(), None);
        assert!(out.is_stdout());

        let err = LineRecord::stderr_line("oops");
        assert_eq!(err.stdout(), None);
        assert_eq!(err.stderr(), Some("oops"));
        assert!(err.is_stderr());
    }

    #[test]
    fn test_second_resolution() {
        let record = LineRecord::new(StreamKind::Stdout, "x");
        assert_eq!(record.time().nanosecond(), 0);
    }

    #[test]
    fn test_time_string() {
        let record = LineRecord::at(fixed_time(), StreamKind::Stdout, "x");
        assert_eq!(record.time_string(), "2024-03-09 14:05:07");
    }

    #[test]
    fn test_display() {
        let out = LineRecord::at(fixed_time(), StreamKind::Stdout, "built");
        assert_eq!(out.to_string(), "[2024-03-09 14:05:07] out| built");

        let err = LineRecord::at(fixed_time(), StreamKind::Stderr, "warning");
        assert_eq!(err.to_string(), "[2024-03-09 14:05:07] err| warning");
    }

    #[test]
    fn test_serialize() {
        let record = LineRecord::at(fixed_time(), StreamKind::Stderr, "disk full");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["time"], "2024-03-09 14:05:07");
        assert!(json["stdout"].is_null());
        assert_eq!(json["stderr"], "disk full");
    }

    #[test]
    fn test_stream_kind_display() {
        assert_eq!(StreamKind::Stdout.to_string(), "stdout");
        assert_eq!(StreamKind::Stderr.to_string(), "stderr");
    }
}
