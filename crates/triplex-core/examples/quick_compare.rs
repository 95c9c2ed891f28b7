//! Side-by-side comparison example
//!
//! Runs a three-slot session against the simulated host, drives playback for
//! a few seconds, and prints the per-slot metrics with the cross-slot
//! statistics.
//!
//! Run with: cargo run -p triplex-core --example quick_compare

use std::sync::Arc;
use std::time::Duration;
use triplex_core::{catalog, ComparisonSession, HarnessMode, SimEnvironment, SimOptions};

#[tokio::main]
async fn main() -> triplex_core::Result<()> {
    println!("Triplex Core - Quick Compare Example");
    println!("====================================\n");

    let env = Arc::new(SimEnvironment::new(SimOptions::default()));
    let clock = env.start_clock();

    let stream = catalog::resolve("bunny")?;
    println!("Stream: {}", stream.name);
    println!("  URL:        {}", stream.url);
    println!("  Resolution: {}", stream.resolution);
    println!("  Type:       {}", stream.stream_type);
    println!();

    let session = ComparisonSession::new(env.clone(), HarnessMode::Triple);
    session.initialize(stream).await?;
    session.play_all().await?;
    tokio::time::sleep(Duration::from_secs(3)).await;

    session.seek_all(30.0).await?;
    tokio::time::sleep(Duration::from_secs(2)).await;

    let snapshot = session.snapshot().await?;
    println!("Per-Slot Metrics:");
    println!("-----------------");
    for slot in snapshot.slot_kinds() {
        let metrics = snapshot.get(slot).expect("configured slot");
        let status = session.slot_status(slot).await?;
        println!(
            "  {:<16} tech={:<11} pos={:>6.1}s buffer={:>5.1}s quality={:<18} status={}",
            slot.panel_title(),
            metrics.player_type.to_string(),
            metrics.current_time,
            metrics.buffered,
            metrics.quality,
            status
        );
    }
    println!();

    println!("Recent Events (ABR slot):");
    println!("-------------------------");
    if let Some(abr) = snapshot.get(triplex_core::SlotKind::Abr) {
        for line in abr.events.iter().rev().take(5).rev() {
            println!("  {}", line);
        }
    }
    println!();

    let report = session.comparison().await?;
    println!("Cross-Slot Statistics:");
    println!("----------------------");
    println!("  Max sync drift:  {:.3}s", report.max_sync_drift);
    println!("  Load time range: {}ms", report.load_time_range_ms);
    println!("  Buffered range:  {:.1}s", report.buffered_range);
    println!("  Bitrate range:   {}bps", report.bitrate_range);
    println!();

    session.pause_all().await?;
    session.teardown().await;
    clock.abort();

    println!("Session torn down cleanly.");
    Ok(())
}
