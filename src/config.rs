use clap::ValueEnum;
use std::fmt;
use std::path::PathBuf;

/// Extension of every converted (structured) record.
pub const CONVERTED_EXT: &str = "json";

/// Which remote endpoint a log is fetched from, and so what the raw record looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum LogType {
    #[default]
    Xml,
    Json,
}

impl LogType {
    pub fn raw_ext(self) -> &'static str {
        match self {
            LogType::Xml => "xml",
            LogType::Json => "json",
        }
    }
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.raw_ext())
    }
}

/// Zero-points used when re-expressing a score snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Baseline {
    /// Starting score the record was played with.
    pub start_score: i64,
    /// Starting score the record is rewritten towards.
    pub canonical: i64,
}

impl Baseline {
    pub const DEFAULT_START_SCORE: i64 = 30000;
    pub const CANONICAL: i64 = 25000;

    pub fn delta(&self) -> i64 {
        self.start_score - self.canonical
    }
}

impl Default for Baseline {
    fn default() -> Self {
        Self {
            start_score: Self::DEFAULT_START_SCORE,
            canonical: Self::CANONICAL,
        }
    }
}

/// Everything the pipeline needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub output_dir: PathBuf,
    pub log_type: LogType,
    pub converter: Option<PathBuf>,
    pub normalize: bool,
    pub baseline: Baseline,
}

impl Config {
    pub fn raw_dir(&self) -> PathBuf {
        self.output_dir.join("raw")
    }

    pub fn converted_dir(&self) -> PathBuf {
        self.output_dir.join("converted")
    }
}
