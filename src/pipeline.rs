use anyhow::Result;
use chrono::Utc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::converter::{self, Conversion, Converter};
use crate::error::ItemError;
use crate::fetcher::{self, LogSource};
use crate::output::{self, Report, ReportEntry, Status};
use crate::parsers::{self, EXAMPLE_LINK, LogId};
use crate::record;

/// What happened to one link that made it through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub id: LogId,
    pub cache_hit: bool,
    /// The converter exited non-zero but left a usable record behind.
    pub converter_warned: bool,
    pub hands_normalized: Option<usize>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub succeeded: usize,
    pub converter_warnings: usize,
    pub normalized: usize,
    pub cache_hits: usize,
    pub skipped: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

/// Extract, fetch, convert and optionally normalize, one link at a time.
pub struct Pipeline {
    config: Config,
    source: Box<dyn LogSource>,
    converter: Box<dyn Converter>,
}

impl Pipeline {
    pub fn new(config: Config, source: Box<dyn LogSource>, converter: Box<dyn Converter>) -> Self {
        Self {
            config,
            source,
            converter,
        }
    }

    /// Process a single link. Artifacts written before a failure stay on disk.
    pub fn process(&self, link: &str) -> Result<Outcome, ItemError> {
        let id = parsers::extract(link)?;
        info!(id = %id, seat = ?id.seat(), "extracted log id from url");

        let fetched = fetcher::fetch(self.source.as_ref(), id, &self.config)?;
        let converted = converter::convert(self.converter.as_ref(), &fetched.id, &self.config)?;
        let target = converted.path;

        let hands_normalized = if self.config.normalize {
            if !output::is_materialized(&target) {
                return Err(ItemError::MissingConverted(target.display().to_string()));
            }
            Some(record::normalize_file(&target, self.config.baseline)?)
        } else {
            if !output::is_materialized(&target) {
                warn!(path = %target.display(), "converted record is missing or empty");
            }
            None
        };

        Ok(Outcome {
            id: fetched.id,
            cache_hit: fetched.cache_hit,
            converter_warned: converted.conversion == Conversion::Warned,
            hands_normalized,
        })
    }

    /// Process every link in order. A failing link never stops the batch; only report I/O can.
    pub fn run(&self, links: &[String], report: &mut Report) -> Result<Summary> {
        let start = Instant::now();
        let mut summary = Summary {
            total: links.len(),
            ..Default::default()
        };

        for link in links {
            info!("Downloading url {}", link);
            let entry = match self.process(link) {
                Ok(outcome) => {
                    summary.succeeded += 1;
                    summary.converter_warnings += usize::from(outcome.converter_warned);
                    summary.cache_hits += usize::from(outcome.cache_hit);
                    summary.normalized += usize::from(outcome.hands_normalized.is_some());
                    entry_for(
                        link,
                        Some(outcome.id.to_string()),
                        Status::Ok,
                        outcome.cache_hit,
                        outcome.hands_normalized,
                        outcome
                            .converter_warned
                            .then(|| "converter exited unsuccessfully".to_string()),
                    )
                }
                Err(e) if e.is_skip() => {
                    summary.skipped += 1;
                    error!("Cannot extract log id from url: {}", e);
                    error!("Url format must be '{}'", EXAMPLE_LINK);
                    error!("Skipping url {}", link);
                    entry_for(link, None, Status::Skipped, false, None, Some(e.to_string()))
                }
                Err(e) => {
                    summary.failed += 1;
                    if let ItemError::Normalize { source, .. } = &e {
                        if source.is_internal() {
                            error!("Internal consistency failure, record left unnormalized");
                        }
                    }
                    error!("Failed to process url {}: {}", link, e);
                    let id = parsers::extract(link).ok().map(|id| id.to_string());
                    entry_for(link, id, Status::Failed, false, None, Some(e.to_string()))
                }
            };
            report.write_entry(&entry)?;
        }

        summary.elapsed = start.elapsed();
        Ok(summary)
    }
}

fn entry_for(
    link: &str,
    id: Option<String>,
    status: Status,
    cache_hit: bool,
    hands_normalized: Option<usize>,
    detail: Option<String>,
) -> ReportEntry {
    ReportEntry {
        timestamp: Utc::now(),
        link: link.to_string(),
        id,
        status,
        cache_hit,
        hands_normalized,
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogType;
    use crate::converter::{ExternalConverter, PassthroughConverter};
    use crate::fetcher::tests::{FakeSource, test_config};
    use std::fs;
    use tempfile::TempDir;

    const BASE: &str = "2025010203gm-0029-0000-0123abcd";
    const RECORD: &str = r#"{"title":["",""],"log":[[[0,0,0],[30000,30000,30000,30000],[]],[[1,0,0],[500,30500,29500,29500],[]]]}"#;

    fn link(base: &str) -> String {
        format!("https://tenhou.net/0/?log={base}&tw=0")
    }

    fn json_pipeline(dir: &TempDir, source: FakeSource, normalize: bool) -> Pipeline {
        let mut config = test_config(dir);
        config.log_type = LogType::Json;
        config.normalize = normalize;
        Pipeline::new(config, Box::new(source), Box::new(PassthroughConverter))
    }

    #[test]
    fn converts_and_normalizes() {
        let dir = TempDir::new().unwrap();
        let pipeline = json_pipeline(&dir, FakeSource::with(BASE, RECORD), true);

        let outcome = pipeline.process(&link(BASE)).unwrap();
        assert_eq!(outcome.hands_normalized, Some(2));
        assert!(!outcome.cache_hit);

        let converted = dir.path().join("converted").join(format!("{BASE}.json"));
        let text = fs::read_to_string(converted).unwrap();
        assert!(text.contains("[25000,25000,25000,25000]"));
        assert!(text.contains("[1200,23600,22600,22600]"));

        let raw = dir.path().join("raw").join(format!("{BASE}.json"));
        assert_eq!(fs::read_to_string(raw).unwrap(), RECORD);
    }

    #[test]
    fn rerun_rederives_from_cached_raw() {
        let dir = TempDir::new().unwrap();
        let pipeline = json_pipeline(&dir, FakeSource::with(BASE, RECORD), true);

        pipeline.process(&link(BASE)).unwrap();
        let again = pipeline.process(&link(BASE)).unwrap();
        assert!(again.cache_hit);

        // converted record is rebuilt from raw, so the shift is not applied twice
        let converted = dir.path().join("converted").join(format!("{BASE}.json"));
        assert!(fs::read_to_string(converted).unwrap().contains("[25000,25000,25000,25000]"));
    }

    #[test]
    fn batch_survives_bad_links_and_failed_downloads() {
        let dir = TempDir::new().unwrap();
        let pipeline = json_pipeline(&dir, FakeSource::with(BASE, RECORD), false);
        let links = vec![
            "not a link".to_string(),
            link("2025010203gm-0029-0000-deadbeef"),
            link(BASE),
        ];

        let mut report = output::create_report(Some(&dir.path().join("report.jsonl"))).unwrap();
        let summary = pipeline.run(&links, &mut report).unwrap();
        report.finish().unwrap();

        assert_eq!(summary.total, 3);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.converter_warnings, 0);
        assert_eq!(summary.normalized, 0);

        let report = fs::read_to_string(dir.path().join("report.jsonl")).unwrap();
        let statuses: Vec<String> = report
            .lines()
            .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap()["status"].to_string())
            .collect();
        assert_eq!(statuses, vec!["\"skipped\"", "\"failed\"", "\"ok\""]);
    }

    #[test]
    fn normalization_failure_leaves_converted_file() {
        let dir = TempDir::new().unwrap();
        let record = r#"{"log":[[[0,0,0],[6000,6000,5600,5000]]]}"#;
        let pipeline = json_pipeline(&dir, FakeSource::with(BASE, record), true);

        let err = pipeline.process(&link(BASE)).unwrap_err();
        assert!(matches!(err, ItemError::Normalize { hand: 0, .. }));
        let converted = dir.path().join("converted").join(format!("{BASE}.json"));
        assert_eq!(fs::read_to_string(converted).unwrap(), record);
    }

    #[cfg(unix)]
    #[test]
    fn missing_converter_output_fails_before_normalizing() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.normalize = true;
        let pipeline = Pipeline::new(
            config,
            Box::new(FakeSource::with(BASE, "<mjloggm/>")),
            Box::new(ExternalConverter::new("false")),
        );

        let err = pipeline.process(&link(BASE)).unwrap_err();
        assert!(matches!(err, ItemError::MissingConverted(_)));
        assert!(dir.path().join("raw").join(format!("{BASE}.xml")).exists());
    }

    #[cfg(unix)]
    #[test]
    fn stale_converted_record_is_not_normalized_again() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.normalize = true;
        let raw = dir.path().join("raw").join(format!("{BASE}.xml"));
        let converted = dir.path().join("converted").join(format!("{BASE}.json"));
        fs::create_dir_all(raw.parent().unwrap()).unwrap();
        fs::create_dir_all(converted.parent().unwrap()).unwrap();
        fs::write(&raw, "<mjloggm/>").unwrap();
        fs::write(&converted, r#"{"log":[[[0,0,0],[25000,25000,25000,25000]]]}"#).unwrap();

        let pipeline = Pipeline::new(
            config,
            Box::new(FakeSource::default()),
            Box::new(ExternalConverter::new("false")),
        );

        let err = pipeline.process(&link(BASE)).unwrap_err();
        assert!(matches!(err, ItemError::MissingConverted(_)));
        assert!(!converted.exists());
    }

    #[cfg(unix)]
    #[test]
    fn converter_warnings_are_counted_separately() {
        let dir = TempDir::new().unwrap();
        let pipeline = Pipeline::new(
            test_config(&dir),
            Box::new(FakeSource::with(BASE, "<mjloggm/>")),
            Box::new(ExternalConverter::new("false")),
        );

        let outcome = pipeline.process(&link(BASE)).unwrap();
        assert!(outcome.converter_warned);

        let summary = pipeline.run(&[link(BASE)], &mut Report::Disabled).unwrap();
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.converter_warnings, 1);
    }
}
