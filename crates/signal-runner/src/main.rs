//! signal-runner: score a batch of preprocessed news articles per ticker.
//!
//! Reads the ticker reference table and the article batch as JSON, runs the
//! detection/scoring/aggregation pipeline, and writes the batch report as JSON.
//!
//! Usage:
//!   cargo run -p signal-runner -- --tickers demos/tickers.json --articles demos/articles.json
//!   cargo run -p signal-runner -- --tickers t.json --articles a.json --output report.json --pretty
//!   cargo run -p signal-runner -- --tickers t.json --articles a.json --general-signal lexicon

use analysis_core::{ArticleInput, EngineConfig};
use analysis_orchestrator::{BatchReport, SignalPipeline};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};
use sentiment_analysis::{LexiconSignal, PrecomputedSignal};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use ticker_detection::TickerTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum GeneralSignal {
    /// Keyword score only
    #[value(name = "none")]
    Off,
    /// Use `general_signal` carried on each article
    Precomputed,
    /// Built-in financial word list
    Lexicon,
}

#[derive(Debug, Parser)]
#[command(name = "signal-runner", version, about = "Per-ticker news sentiment signals")]
struct Args {
    /// Ticker table: JSON array of records or a {"SYMBOL": "Company"} object
    #[arg(long)]
    tickers: PathBuf,

    /// JSON array of preprocessed articles
    #[arg(long)]
    articles: PathBuf,

    /// Write the report here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Reference time for recency weighting (RFC 3339). Defaults to now.
    #[arg(long)]
    now: Option<String>,

    /// Source of the optional general sentiment signal
    #[arg(long, value_enum, default_value_t = GeneralSignal::Precomputed)]
    general_signal: GeneralSignal,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "signal_runner=info,analysis_orchestrator=info".into());
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    // Logs go to stderr so stdout carries only the report
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn parse_now(raw: Option<&str>) -> Result<DateTime<Utc>> {
    match raw {
        Some(raw) => Ok(DateTime::parse_from_rfc3339(raw)
            .with_context(|| format!("--now {raw:?} is not an RFC 3339 timestamp"))?
            .with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}

fn load_articles(path: &Path) -> Result<Vec<ArticleInput>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading articles from {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing articles in {}", path.display()))
}

fn load_tickers(path: &Path) -> Result<TickerTable> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading tickers from {}", path.display()))?;
    TickerTable::from_json(&raw).with_context(|| format!("loading ticker table {}", path.display()))
}

fn write_report(report: &BatchReport, output: Option<&Path>, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(report)?
    } else {
        serde_json::to_string(report)?
    };

    match output {
        Some(path) => std::fs::write(path, json + "\n")
            .with_context(|| format!("writing report to {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}").context("writing report to stdout")?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    let now = parse_now(args.now.as_deref())?;

    let config = EngineConfig::from_env().context("invalid engine configuration")?;
    tracing::info!(
        "Config: floor={} window={:?} blend={} W={} decay={:?} buy={} sell={}",
        config.min_mention_confidence,
        config.context_window,
        config.general_signal_weight,
        config.window_size,
        config.recency_decay,
        config.threshold_buy,
        config.threshold_sell
    );

    let table = Arc::new(load_tickers(&args.tickers)?);
    let articles = load_articles(&args.articles)?;
    tracing::info!("Loaded {} tickers and {} articles", table.len(), articles.len());

    let mut pipeline = SignalPipeline::new(table, &config)?;
    pipeline = match args.general_signal {
        GeneralSignal::Off => pipeline,
        GeneralSignal::Precomputed => pipeline.with_general_source(Arc::new(PrecomputedSignal)),
        GeneralSignal::Lexicon => pipeline.with_general_source(Arc::new(LexiconSignal::new())),
    };

    let report = pipeline.run(&articles, now)?;
    for aggregate in &report.per_ticker {
        tracing::info!(
            "{:<6} {:>4} score={:+.3} confidence={:.2} articles={}",
            aggregate.ticker,
            aggregate.recommendation.as_str(),
            aggregate.score,
            aggregate.confidence,
            aggregate.article_count
        );
    }

    write_report(&report, args.output.as_deref(), args.pretty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_now() {
        let parsed = parse_now(Some("2024-06-10T14:00:00+02:00")).unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-06-10T12:00:00+00:00");
        assert!(parse_now(Some("yesterday")).is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "signal-runner",
            "--tickers",
            "t.json",
            "--articles",
            "a.json",
            "--general-signal",
            "lexicon",
            "--pretty",
        ])
        .unwrap();
        assert_eq!(args.general_signal, GeneralSignal::Lexicon);
        assert!(args.pretty);
        assert!(args.output.is_none());

        assert!(Args::try_parse_from(["signal-runner", "--tickers", "t.json"]).is_err());
    }
}
