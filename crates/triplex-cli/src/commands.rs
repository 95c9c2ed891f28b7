//! CLI command implementations

use crate::output::{self, OutputFormat};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tabled::{settings::Style, Table, Tabled};
use tracing::debug;
use triplex_core::catalog::{self, StreamCategory, StreamConfig};
use triplex_core::{
    CapabilityReport, ComparisonReport, ComparisonSession, HarnessMode, PlayerMetrics,
    ResultStore, SimEnvironment, SimOptions, SlotKind, SlotStatus, StreamProber, TestResult,
    TestStatus,
};

#[derive(Tabled)]
struct StreamRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Resolution")]
    resolution: String,
    #[tabled(rename = "Type")]
    stream_type: String,
    #[tabled(rename = "Source")]
    source: String,
}

/// List the built-in stream catalog
pub fn streams(category: &str, format: &str) -> anyhow::Result<()> {
    let category = StreamCategory::from_str(category).ok_or_else(|| {
        anyhow::anyhow!(
            "unknown category '{}' (expected all, vod, live, low-res, high-res, mobile)",
            category
        )
    })?;

    let all = catalog::test_streams();
    let total = all.len();
    // Keep full-catalog indices so the # column works with `run` and `probe`
    let entries: Vec<(usize, StreamConfig)> = all
        .into_iter()
        .enumerate()
        .filter(|(_, s)| category.matches(s))
        .map(|(i, s)| (i + 1, s))
        .collect();

    if let OutputFormat::Json = OutputFormat::from(format) {
        let streams: Vec<&StreamConfig> = entries.iter().map(|(_, s)| s).collect();
        return output::print_json(&streams);
    }

    if entries.is_empty() {
        println!("No streams in category '{}'", category.label());
        return Ok(());
    }

    println!("{} ({} of {})", category.label(), entries.len(), total);
    let rows: Vec<StreamRow> = entries
        .iter()
        .map(|(index, s)| StreamRow {
            index: *index,
            name: s.name.clone(),
            resolution: s.resolution.clone(),
            stream_type: s.stream_type.to_string(),
            source: s.source.clone(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);
    println!("\nPass the # or a name fragment to `triplex run` or `triplex probe`.");
    Ok(())
}

/// Report what a host profile can play
pub fn env(no_native: bool, no_engine: bool, format: &str) -> anyhow::Result<()> {
    let sim = SimEnvironment::new(SimOptions {
        native_hls: !no_native,
        engine: !no_engine,
        ..Default::default()
    });
    let report = CapabilityReport::detect(&sim);

    if let OutputFormat::Json = OutputFormat::from(format) {
        return output::print_json(&report);
    }

    println!("Capability Report");
    println!("  user agent: {}", report.user_agent);
    println!("  os:         {}/{}", report.os, report.arch);
    println!("  device:     {}", report.device_class);
    println!("  native HLS: {}", if report.native_hls { "yes" } else { "no" });
    println!("  engine:     {}", if report.engine { "yes" } else { "no" });
    println!("  strategy:   {}", report.strategy);
    println!("              {}", report.strategy.description());

    println!("\nSimulated ladder:");
    for (i, level) in sim.options().ladder.iter().enumerate() {
        println!(
            "  {}. {}x{} @ {}kbps",
            i + 1,
            level.width,
            level.height,
            (level.bitrate + 500) / 1000
        );
    }
    Ok(())
}

/// Check a stream for basic reachability
pub async fn probe(
    query: &str,
    record: bool,
    store: &ResultStore,
    format: &str,
) -> anyhow::Result<()> {
    let stream = catalog::resolve(query)?;
    let prober = StreamProber::new();
    let outcome = prober.check(&stream.url).await;
    let result = TestResult::connectivity(&outcome);

    if record {
        store.push(result.clone())?;
    }

    match OutputFormat::from(format) {
        OutputFormat::Json => output::print_json(&result)?,
        OutputFormat::Text => {
            println!("Probing: {}", stream.name);
            println!("  url: {}", stream.url);
            if outcome.success {
                println!(
                    "  {} in {}ms",
                    style("reachable").green(),
                    outcome.elapsed_ms
                );
            } else {
                let detail = outcome.detail.as_deref().unwrap_or("unknown error");
                println!(
                    "  {}: {} ({}ms)",
                    style("unreachable").red(),
                    detail,
                    outcome.elapsed_ms
                );
            }
            if record {
                println!("  recorded to {}", store.path().display());
            }
        }
    }

    if !outcome.success {
        std::process::exit(1);
    }
    Ok(())
}

/// Options for a comparison run
pub struct RunOptions {
    pub mode: String,
    pub duration: u64,
    pub seek_to: Option<f64>,
    pub no_native: bool,
    pub no_engine: bool,
    pub record: bool,
}

#[derive(Serialize)]
struct SlotReport {
    slot: SlotKind,
    status: SlotStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    metrics: PlayerMetrics,
}

#[derive(Serialize)]
struct RunReport {
    stream: StreamConfig,
    mode: HarnessMode,
    duration_secs: u64,
    slots: Vec<SlotReport>,
    comparison: ComparisonReport,
    host_errors: Vec<String>,
}

/// Drive a timed comparison session against the simulated host
pub async fn run(
    query: &str,
    options: RunOptions,
    store: &ResultStore,
    format: &str,
) -> anyhow::Result<()> {
    let mode = HarnessMode::from_str(&options.mode).ok_or_else(|| {
        anyhow::anyhow!(
            "unknown mode '{}' (expected single, dual, triple)",
            options.mode
        )
    })?;
    let stream = catalog::resolve(query)?;
    let text = matches!(OutputFormat::from(format), OutputFormat::Text);
    debug!(mode = %mode, stream = %stream.name, "starting comparison run");

    let env = Arc::new(SimEnvironment::new(SimOptions {
        native_hls: !options.no_native,
        engine: !options.no_engine,
        ..Default::default()
    }));
    let clock = env.start_clock();
    let session = ComparisonSession::new(env.clone(), mode);

    if text {
        println!("Running {} comparison: {}", mode, stream.name);
        println!("  url: {}", stream.url);
        println!("  host: {}", env.options().user_agent);
        let slots: Vec<String> = mode.slots().iter().map(|s| s.to_string()).collect();
        println!("  slots: {}", slots.join(", "));
    }

    if let Err(e) = session.initialize(stream.clone()).await {
        for line in session.host_errors().await {
            eprintln!("  {}", style(line).red());
        }
        session.teardown().await;
        clock.abort();
        anyhow::bail!("comparison session failed to start: {}", e);
    }

    session.play_all().await?;

    let bar = if text {
        let bar = ProgressBar::new(options.duration);
        bar.set_style(
            ProgressStyle::with_template("  [{bar:30.cyan/blue}] {pos}/{len}s {msg}")?
                .progress_chars("=>-"),
        );
        Some(bar)
    } else {
        None
    };

    let seek_at = (options.duration / 2).max(1);
    for second in 1..=options.duration {
        tokio::time::sleep(Duration::from_secs(1)).await;
        if let Some(target) = options.seek_to {
            if second == seek_at {
                debug!(target, "seeking all slots");
                session.seek_all(target).await?;
                if let Some(bar) = &bar {
                    bar.set_message(format!("seeked to {}s", target));
                }
            }
        }
        if let Some(bar) = &bar {
            bar.inc(1);
        }
    }

    session.pause_all().await?;
    // Let the pollers take one final sample before reading
    tokio::time::sleep(Duration::from_millis(1100)).await;
    if let Some(bar) = &bar {
        bar.finish_and_clear();
    }

    let snapshot = session.snapshot().await?;
    let comparison = session.comparison().await?;
    let host_errors = session.host_errors().await;

    let mut slots = Vec::new();
    for slot in snapshot.slot_kinds() {
        let status = session.slot_status(slot).await?;
        let error = session.slot_error(slot).await;
        let metrics = snapshot.get(slot).cloned().unwrap_or_default();
        slots.push(SlotReport {
            slot,
            status,
            error,
            metrics,
        });
    }

    session.teardown().await;
    clock.abort();

    if options.record {
        for report in &slots {
            store.push(slot_result(&stream, report))?;
        }
    }

    if text {
        for report in &slots {
            print_slot_panel(report);
        }
        print_comparison(&comparison);
        if !host_errors.is_empty() {
            println!("\n{}", style("Host errors").bold());
            for line in &host_errors {
                println!("  {}", style(line).red());
            }
        }
        if options.record {
            println!(
                "\nRecorded {} results to {}",
                slots.len(),
                store.path().display()
            );
        }
    } else {
        output::print_json(&RunReport {
            stream,
            mode,
            duration_secs: options.duration,
            slots,
            comparison,
            host_errors,
        })?;
    }

    Ok(())
}

fn slot_result(stream: &StreamConfig, report: &SlotReport) -> TestResult {
    TestResult {
        stream_name: format!("{} [{}]", stream.name, report.slot),
        url: stream.url.clone(),
        timestamp: chrono::Utc::now(),
        status: if report.error.is_some() {
            TestStatus::Error
        } else {
            TestStatus::Success
        },
        load_time_ms: report.metrics.load_time_ms,
        error_message: report.error.clone(),
        player_type: Some(report.metrics.player_type),
        quality: Some(report.metrics.quality.clone()),
    }
}

fn print_slot_panel(report: &SlotReport) {
    println!("\n{}", style(report.slot.panel_title()).bold());
    println!("  status:    {}", output::styled_status(report.status));
    println!("  tech:      {}", report.metrics.player_type);
    println!("  position:  {:.2}s", report.metrics.current_time);
    println!("  buffered:  {:.2}s ahead", report.metrics.buffered);
    println!("  quality:   {}", report.metrics.quality);
    if report.metrics.bitrate > 0 {
        println!("  bitrate:   {}kbps", (report.metrics.bitrate + 500) / 1000);
    }
    println!("  load time: {}ms", report.metrics.load_time_ms);
    if let Some(error) = &report.error {
        println!("  error:     {}", style(error).red());
    }
    if !report.metrics.events.is_empty() {
        println!("  events:");
        for line in &report.metrics.events {
            println!("    {}", line);
        }
    }
}

fn print_comparison(report: &ComparisonReport) {
    println!("\n{}", style("Comparison").bold());
    println!("  max sync drift:  {:.3}s", report.max_sync_drift);
    println!("  load time range: {}ms", report.load_time_range_ms);
    println!("  buffered range:  {:.2}s", report.buffered_range);
    println!("  bitrate range:   {}kbps", (report.bitrate_range + 500) / 1000);
}

#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Stream")]
    stream: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Load")]
    load: String,
    #[tabled(rename = "Player")]
    player: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

impl From<&TestResult> for ResultRow {
    fn from(result: &TestResult) -> Self {
        Self {
            time: result
                .timestamp
                .with_timezone(&chrono::Local)
                .format("%m-%d %H:%M:%S")
                .to_string(),
            stream: result.stream_name.clone(),
            status: result.status.to_string(),
            load: format!("{}ms", result.load_time_ms),
            player: result
                .player_type
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string()),
            detail: result
                .error_message
                .clone()
                .or_else(|| result.quality.clone())
                .unwrap_or_default(),
        }
    }
}

/// Show the recorded result log, newest first
pub fn results(limit: usize, store: &ResultStore, format: &str) -> anyhow::Result<()> {
    let all = store.load()?;
    let shown = &all[..limit.min(all.len())];

    if let OutputFormat::Json = OutputFormat::from(format) {
        return output::print_json(&shown);
    }

    if shown.is_empty() {
        println!("No results recorded in {}", store.path().display());
        return Ok(());
    }

    let rows: Vec<ResultRow> = shown.iter().map(ResultRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);
    println!(
        "\n{} of {} results (log: {})",
        shown.len(),
        all.len(),
        store.path().display()
    );
    Ok(())
}

/// Append an operator note to the result log
pub fn note(
    text: &str,
    stream: Option<&str>,
    store: &ResultStore,
    _format: &str,
) -> anyhow::Result<()> {
    let url = match stream {
        Some(query) => Some(catalog::resolve(query)?.url),
        None => None,
    };
    store.push(TestResult::note(text, url.as_deref()))?;
    println!("Note recorded to {}", store.path().display());
    Ok(())
}

/// Export the result log as dated, pretty-printed JSON
pub fn export(dir: &Path, store: &ResultStore, _format: &str) -> anyhow::Result<()> {
    let count = store.load()?.len();
    let path = store.export(dir)?;
    println!("Exported {} results to {}", count, path.display());
    Ok(())
}

/// Delete the result log
pub fn clear(store: &ResultStore, _format: &str) -> anyhow::Result<()> {
    store.clear()?;
    println!("Cleared {}", store.path().display());
    Ok(())
}
