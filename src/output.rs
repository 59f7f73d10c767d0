use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::{CONVERTED_EXT, Config};
use crate::parsers::LogId;

/// `{output}/raw/{base id}.{xml|json}`
pub fn raw_path(config: &Config, id: &LogId) -> PathBuf {
    config
        .raw_dir()
        .join(format!("{}.{}", id.base(), config.log_type.raw_ext()))
}

/// `{output}/converted/{base id}.json`
pub fn converted_path(config: &Config, id: &LogId) -> PathBuf {
    config
        .converted_dir()
        .join(format!("{}.{}", id.base(), CONVERTED_EXT))
}

/// A file counts as present only when it exists and is non-empty.
pub fn is_materialized(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file() && m.len() > 0).unwrap_or(false)
}

pub fn create_parent_dirs(file_path: &Path) -> io::Result<()> {
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Write through a `.part` sibling and rename it into place, so `path` is never seen half written.
pub fn write_atomically(path: &Path, contents: &str) -> io::Result<()> {
    let mut part = path.as_os_str().to_owned();
    part.push(".part");
    let part = PathBuf::from(part);
    fs::write(&part, contents)?;
    if let Err(e) = fs::rename(&part, path) {
        let _ = fs::remove_file(&part);
        return Err(e);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Skipped,
    Failed,
}

/// One line of the run report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    pub timestamp: DateTime<Utc>,
    pub link: String,
    pub id: Option<String>,
    pub status: Status,
    pub cache_hit: bool,
    pub hands_normalized: Option<usize>,
    pub detail: Option<String>,
}

pub enum Report {
    Disabled,
    JsonlFile(BufWriter<File>),
}

impl Report {
    pub fn write_entry(&mut self, entry: &ReportEntry) -> Result<()> {
        match self {
            Report::Disabled => {}
            Report::JsonlFile(writer) => {
                let serialized = serde_json::to_string(entry)?;
                writeln!(writer, "{}", serialized)?;
            }
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        if let Report::JsonlFile(ref mut writer) = self {
            writer.flush()?;
        }
        Ok(())
    }
}

pub fn create_report(path: Option<&Path>) -> Result<Report> {
    match path {
        None => Ok(Report::Disabled),
        Some(path) => {
            create_parent_dirs(path)?;
            let file = File::create(path)?;
            Ok(Report::JsonlFile(BufWriter::new(file)))
        }
    }
}
