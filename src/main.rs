mod config;
mod converter;
mod error;
mod fetcher;
mod normalizer;
mod output;
mod parsers;
mod pipeline;
mod record;

use anyhow::{Context, Result, bail};
use clap::{ArgGroup, Parser};
use std::fs;
use std::path::PathBuf;
use tracing::info;

use config::{Baseline, Config, LogType};
use fetcher::HttpSource;
use pipeline::{Pipeline, Summary};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("source").required(true).multiple(false).args(["url", "input_file"])))]
struct Args {
    /// Single tenhou link
    #[arg(short, long)]
    url: Option<String>,

    /// File with one tenhou link per line
    #[arg(short, long)]
    input_file: Option<PathBuf>,

    #[arg(short, long)]
    output_dir: PathBuf,

    #[arg(short = 't', long = "type", value_enum, default_value_t = LogType::Xml)]
    log_type: LogType,

    /// Executable turning a raw xml log into json (`<converter> <input> -o <output>`)
    #[arg(short, long, env = "TENLOGNORM_CONVERTER")]
    converter: Option<PathBuf>,

    /// Rewrite scores as if the game had started from the canonical baseline
    #[arg(short, long)]
    normalize: bool,

    #[arg(long, default_value_t = Baseline::DEFAULT_START_SCORE)]
    start_score: i64,

    #[arg(long, default_value_t = Baseline::CANONICAL)]
    canonical_baseline: i64,

    /// Write a JSON Lines report with one entry per link
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tenlognorm=info".into()),
        )
        .init();

    let args = Args::parse();
    let links = read_links(&args)?;

    if args.log_type == LogType::Xml && args.converter.is_none() {
        bail!("--converter (or TENLOGNORM_CONVERTER) is required for --type xml");
    }

    let config = Config {
        output_dir: args.output_dir.clone(),
        log_type: args.log_type,
        converter: args.converter.clone(),
        normalize: args.normalize,
        baseline: Baseline {
            start_score: args.start_score,
            canonical: args.canonical_baseline,
        },
    };

    for dir in [config.raw_dir(), config.converted_dir()] {
        fs::create_dir_all(&dir)
            .with_context(|| format!("cannot create output dir {}", dir.display()))?;
    }
    info!("Use output dir: {}", config.output_dir.display());
    info!("Log type: {}", config.log_type);
    if config.normalize {
        info!(
            "Normalizing scores from {} to {}",
            config.baseline.start_score, config.baseline.canonical
        );
    }

    let converter = converter::for_log_type(config.log_type, config.converter.as_deref())
        .context("no converter available for this log type")?;
    let source = HttpSource::new(config.log_type).context("cannot build http client")?;
    let pipeline = Pipeline::new(config, Box::new(source), converter);

    let mut report = output::create_report(args.report.as_deref())
        .context("cannot open report file")?;
    let summary = pipeline.run(&links, &mut report)?;
    report.finish()?;

    print_summary(&summary);
    info!("Finished script");
    Ok(())
}

fn read_links(args: &Args) -> Result<Vec<String>> {
    match (&args.url, &args.input_file) {
        (Some(url), None) => {
            info!("Will download one url specified in command line");
            Ok(vec![url.trim().to_string()])
        }
        (None, Some(path)) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("cannot read input file {}", path.display()))?;
            let links = parsers::parse_link_list(&text);
            info!("Will download {} urls from file {}", links.len(), path.display());
            Ok(links)
        }
        _ => bail!("exactly one of --url and --input-file must be given"),
    }
}

fn print_summary(summary: &Summary) {
    info!(
        total = summary.total,
        succeeded = summary.succeeded,
        converter_warnings = summary.converter_warnings,
        normalized = summary.normalized,
        cache_hits = summary.cache_hits,
        skipped = summary.skipped,
        failed = summary.failed,
        elapsed_secs = summary.elapsed.as_secs_f64(),
        "batch finished"
    );
}
