//! Integration tests for Triplex Core

use std::sync::Arc;
use std::time::Duration;
use triplex_core::{
    catalog, CapabilityReport, ComparisonSession, FaultKind, HarnessMode, PlaybackStrategy,
    PlayerTech, ProbeOutcome, ResultStore, SessionState, SimEnvironment, SimOptions, SlotKind,
    SlotStatus, StreamCategory, TestResult, TestStatus, EVENT_LOG_CAPACITY,
};

async fn settle() {
    tokio::time::sleep(Duration::from_millis(200)).await;
}

// =============================================================================
// Stream Catalog Tests
// =============================================================================

#[test]
fn test_catalog_resolution_paths() {
    let streams = catalog::test_streams();
    assert_eq!(streams.len(), 5);

    let by_index = catalog::resolve("1").unwrap();
    assert_eq!(by_index.name, streams[0].name);

    let by_fragment = catalog::resolve("bunny").unwrap();
    assert_eq!(by_fragment.name, "Big Buck Bunny (fMP4)");

    let custom = catalog::resolve("https://example.com/live/master.m3u8").unwrap();
    assert_eq!(custom.name, "Custom Stream");
    assert_eq!(custom.url, "https://example.com/live/master.m3u8");

    assert!(catalog::resolve("no-such-stream").is_err());
    assert!(catalog::resolve("99").is_err());
}

#[test]
fn test_catalog_category_facets() {
    assert_eq!(catalog::streams_in_category(StreamCategory::All).len(), 5);
    assert_eq!(catalog::streams_in_category(StreamCategory::Vod).len(), 5);
    assert!(catalog::streams_in_category(StreamCategory::Live).is_empty());
    assert_eq!(catalog::streams_in_category(StreamCategory::HighRes).len(), 2);
}

// =============================================================================
// Capability Detection Tests
// =============================================================================

#[test]
fn test_strategy_prefers_native() {
    let env = SimEnvironment::new(SimOptions::default());
    let report = CapabilityReport::detect(&env);
    assert!(report.native_hls);
    assert!(report.engine);
    assert_eq!(report.strategy, PlaybackStrategy::Native);
}

#[test]
fn test_strategy_falls_through_engine_to_limited() {
    let engine_only = SimEnvironment::new(SimOptions {
        native_hls: false,
        ..Default::default()
    });
    assert_eq!(
        CapabilityReport::detect(&engine_only).strategy,
        PlaybackStrategy::Engine
    );

    let nothing = SimEnvironment::new(SimOptions {
        native_hls: false,
        engine: false,
        ..Default::default()
    });
    let report = CapabilityReport::detect(&nothing);
    assert_eq!(report.strategy, PlaybackStrategy::LimitedSupport);
    assert!(!report.native_hls);
    assert!(!report.engine);
}

// =============================================================================
// Session Round Trip Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_triple_session_full_run() {
    let env = Arc::new(SimEnvironment::new(SimOptions::default()));
    let session = ComparisonSession::new(env.clone(), HarnessMode::Triple);

    let stream = catalog::resolve("bunny").unwrap();
    session.initialize(stream).await.unwrap();
    settle().await;
    assert_eq!(session.state().await, SessionState::Ready);

    session.play_all().await.unwrap();
    env.advance(5.0).await;
    tokio::time::sleep(Duration::from_millis(1100)).await;

    let snapshot = session.snapshot().await.unwrap();
    for slot in [SlotKind::Native, SlotKind::Standard, SlotKind::Abr] {
        let metrics = snapshot.get(slot).unwrap();
        assert!(metrics.is_playing, "slot {} should be playing", slot);
        assert!(metrics.current_time >= 5.0);
        assert!(metrics.buffered > 0.0);
    }
    assert_eq!(
        snapshot.get(SlotKind::Native).unwrap().player_type,
        PlayerTech::Native
    );
    assert_eq!(
        snapshot.get(SlotKind::Standard).unwrap().player_type,
        PlayerTech::Engine
    );

    // Slots advanced in lockstep, so the drift statistic stays at zero
    let report = session.comparison().await.unwrap();
    assert!(report.max_sync_drift.abs() < 1e-9);

    session.teardown().await;
    assert_eq!(session.state().await, SessionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_seek_realigns_and_drift_is_visible() {
    let env = Arc::new(SimEnvironment::new(SimOptions::default()));
    let session = ComparisonSession::new(env.clone(), HarnessMode::Triple);
    session.initialize(catalog::resolve("2").unwrap()).await.unwrap();
    settle().await;

    session.seek_all(30.0).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let report = session.comparison().await.unwrap();
    assert!(report.max_sync_drift.abs() < 1e-9);

    // Nudge one slot off the common position and the drift shows up
    env.sink(SlotKind::Native).unwrap().set_position(31.2).await;
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let report = session.comparison().await.unwrap();
    assert!((report.max_sync_drift - 1.2).abs() < 1e-9);

    session.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn test_dual_session_with_native_fallback() {
    let env = Arc::new(SimEnvironment::new(SimOptions {
        native_hls: false,
        ..Default::default()
    }));
    let session = ComparisonSession::new(env.clone(), HarnessMode::Dual);
    session.initialize(catalog::resolve("1").unwrap()).await.unwrap();
    settle().await;

    let snapshot = session.snapshot().await.unwrap();
    // The native slot stays in the layout but the engine serves it
    assert_eq!(
        snapshot.get(SlotKind::Native).unwrap().player_type,
        PlayerTech::Engine
    );
    assert_eq!(
        snapshot.get(SlotKind::Standard).unwrap().player_type,
        PlayerTech::Engine
    );

    session.play_all().await.unwrap();
    settle().await;
    let snapshot = session.snapshot().await.unwrap();
    assert!(snapshot.get(SlotKind::Native).unwrap().is_playing);
    assert!(snapshot.get(SlotKind::Standard).unwrap().is_playing);

    session.teardown().await;
}

// =============================================================================
// Fault Handling Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_element_error_sets_status_and_host_feed() {
    let env = Arc::new(SimEnvironment::new(SimOptions::default()));
    let session = ComparisonSession::new(env.clone(), HarnessMode::Triple);
    session.initialize(catalog::resolve("1").unwrap()).await.unwrap();
    settle().await;
    session.play_all().await.unwrap();
    settle().await;

    env.sink(SlotKind::Native).unwrap().fail(3, "decode failure").await;
    settle().await;

    // Error outranks playing on the status lamp
    assert_eq!(
        session.slot_status(SlotKind::Native).await.unwrap(),
        SlotStatus::Error
    );
    assert_eq!(
        session.slot_error(SlotKind::Native).await.as_deref(),
        Some("Video error: 3 - decode failure")
    );
    let host = session.host_errors().await;
    assert!(host
        .iter()
        .any(|line| line.contains("native: Video error: 3 - decode failure")));

    // Siblings keep playing
    assert_eq!(
        session.slot_status(SlotKind::Standard).await.unwrap(),
        SlotStatus::Playing
    );

    session.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn test_fatal_network_fault_recovers_within_session() {
    let env = Arc::new(SimEnvironment::new(SimOptions::default()));
    let session = ComparisonSession::new(env.clone(), HarnessMode::Triple);
    session.initialize(catalog::resolve("1").unwrap()).await.unwrap();
    settle().await;

    let engine = env.engine(SlotKind::Standard).unwrap();
    engine
        .inject_fault(FaultKind::Network, true, "manifest load timeout")
        .await;
    settle().await;

    assert_eq!(engine.start_load_calls(), 1);
    let host = session.host_errors().await;
    assert!(host
        .iter()
        .any(|line| line.contains("standard: Engine error: network - manifest load timeout")));

    let snapshot = session.snapshot().await.unwrap();
    let joined = snapshot.get(SlotKind::Standard).unwrap().events.join("\n");
    assert!(joined.contains("Attempting network error recovery"));

    session.teardown().await;
}

// =============================================================================
// Event Log Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_event_log_is_bounded_fifo() {
    let env = Arc::new(SimEnvironment::new(SimOptions::default()));
    let session = ComparisonSession::new(env.clone(), HarnessMode::Single);
    session.initialize(catalog::resolve("1").unwrap()).await.unwrap();
    settle().await;

    for _ in 0..4 {
        session.play_all().await.unwrap();
        settle().await;
        session.pause_all().await.unwrap();
        settle().await;
    }

    let snapshot = session.snapshot().await.unwrap();
    let events = &snapshot.get(SlotKind::Native).unwrap().events;
    assert_eq!(events.len(), EVENT_LOG_CAPACITY);
    // The initialization lines rolled off the front long ago
    assert!(!events
        .iter()
        .any(|line| line.contains("Initializing native player")));
    assert!(events
        .iter()
        .any(|line| line.contains("Sync pause triggered")));

    session.teardown().await;
}

// =============================================================================
// Result Log Tests
// =============================================================================

#[test]
fn test_result_log_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = ResultStore::new(dir.path().join("hls-test-results.json"));

    store
        .push(TestResult::connectivity(&ProbeOutcome {
            url: "https://example.com/master.m3u8".to_string(),
            success: true,
            elapsed_ms: 140,
            detail: None,
        }))
        .unwrap();
    store
        .push(TestResult::note("stutter at 0:42 on the ABR slot", None))
        .unwrap();

    let results = store.load().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].stream_name, "Test Note");
    assert_eq!(results[0].status, TestStatus::Warning);
    assert_eq!(results[1].stream_name, "Stream Connectivity Test");
    assert_eq!(results[1].status, TestStatus::Success);

    let exported = store.export(dir.path()).unwrap();
    let raw = std::fs::read_to_string(exported).unwrap();
    assert!(raw.contains("\"streamName\""));

    store.clear().unwrap();
    assert!(store.load().unwrap().is_empty());
}
