use std::fmt::{self, Display};
use std::str::FromStr;

/// What a run does when one incident cannot be decoded or delivered.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RecordErrorPolicy {
    /// Stop the batch at the first bad record.
    #[default]
    Abort,
    /// Log the bad record and keep going.
    Skip,
}

impl RecordErrorPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Abort => "abort",
            Self::Skip => "skip",
        }
    }
}

impl Display for RecordErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" | "fail-fast" | "fail_fast" => Ok(Self::Abort),
            "skip" | "continue" => Ok(Self::Skip),
            other => Err(format!("unknown record error policy: {other}")),
        }
    }
}

/// Tally of one run, logged when the batch ends.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RunSummary {
    pub listed: usize,
    pub forwarded: usize,
    /// Delivered, but answered with a non-2xx status.
    pub rejected: usize,
    pub skipped: usize,
    pub failed: usize,
}
