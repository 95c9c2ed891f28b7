//! Cross-slot comparison statistics
//!
//! Pure functions over a [`Snapshot`]. No state, no side effects, no failure
//! modes beyond ordinary arithmetic; metric fields default to zero so the
//! math stays NaN-free.

use crate::types::Snapshot;
use serde::{Deserialize, Serialize};

/// Derived statistics for the current snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    /// Largest pairwise absolute difference in playback position, seconds
    pub max_sync_drift: f64,
    /// Spread between the fastest and slowest initialization, milliseconds
    pub load_time_range_ms: u64,
    /// Spread in forward buffer depth, seconds
    pub buffered_range: f64,
    /// Spread in reported bitrate, bits/sec
    ///
    /// Slots with an unknown bitrate participate as zero; display layers
    /// decide how to label them.
    pub bitrate_range: u64,
}

/// Maximum pairwise absolute difference across positions
///
/// Zero for fewer than two samples. For sorted values this is simply
/// max minus min, but the contract is pairwise so it holds for any order.
pub fn max_pairwise_drift(positions: &[f64]) -> f64 {
    let mut max = 0.0f64;
    for (i, a) in positions.iter().enumerate() {
        for b in positions.iter().skip(i + 1) {
            let diff = (a - b).abs();
            if diff > max {
                max = diff;
            }
        }
    }
    max
}

fn range_f64(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mut min = f64::MAX;
    let mut max = f64::MIN;
    for v in values {
        min = min.min(*v);
        max = max.max(*v);
    }
    max - min
}

fn range_u64(values: &[u64]) -> u64 {
    match (values.iter().max(), values.iter().min()) {
        (Some(max), Some(min)) if values.len() >= 2 => max - min,
        _ => 0,
    }
}

/// Compute the full comparison report for a snapshot
pub fn compare(snapshot: &Snapshot) -> ComparisonReport {
    let positions: Vec<f64> = snapshot.slots.values().map(|m| m.current_time).collect();
    let load_times: Vec<u64> = snapshot.slots.values().map(|m| m.load_time_ms).collect();
    let buffers: Vec<f64> = snapshot.slots.values().map(|m| m.buffered).collect();
    let bitrates: Vec<u64> = snapshot.slots.values().map(|m| m.bitrate).collect();

    ComparisonReport {
        max_sync_drift: max_pairwise_drift(&positions),
        load_time_range_ms: range_u64(&load_times),
        buffered_range: range_f64(&buffers),
        bitrate_range: range_u64(&bitrates),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PlayerMetrics, SlotKind};

    fn snapshot_with(values: &[(SlotKind, f64, u64, f64, u64)]) -> Snapshot {
        let mut snapshot = Snapshot::default();
        for (slot, time, load, buffered, bitrate) in values {
            snapshot.slots.insert(
                *slot,
                PlayerMetrics {
                    current_time: *time,
                    load_time_ms: *load,
                    buffered: *buffered,
                    bitrate: *bitrate,
                    ..Default::default()
                },
            );
        }
        snapshot
    }

    #[test]
    fn test_max_drift_three_slots() {
        let drift = max_pairwise_drift(&[10.0, 10.2, 9.8]);
        assert!((drift - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_drift_degenerate_inputs() {
        assert_eq!(max_pairwise_drift(&[]), 0.0);
        assert_eq!(max_pairwise_drift(&[5.0]), 0.0);
    }

    #[test]
    fn test_load_time_range() {
        let snapshot = snapshot_with(&[
            (SlotKind::Native, 0.0, 120, 0.0, 0),
            (SlotKind::Standard, 0.0, 340, 0.0, 0),
            (SlotKind::Abr, 0.0, 200, 0.0, 0),
        ]);
        assert_eq!(compare(&snapshot).load_time_range_ms, 220);
    }

    #[test]
    fn test_full_report() {
        let snapshot = snapshot_with(&[
            (SlotKind::Native, 10.0, 120, 12.0, 0),
            (SlotKind::Standard, 10.2, 340, 30.0, 2_500_000),
            (SlotKind::Abr, 9.8, 200, 18.5, 800_000),
        ]);
        let report = compare(&snapshot);
        assert!((report.max_sync_drift - 0.4).abs() < 1e-9);
        assert_eq!(report.load_time_range_ms, 220);
        assert!((report.buffered_range - 18.0).abs() < 1e-9);
        // Unknown bitrate counts as zero rather than being filtered
        assert_eq!(report.bitrate_range, 2_500_000);
    }

    #[test]
    fn test_single_slot_reports_zero_spread() {
        let snapshot = snapshot_with(&[(SlotKind::Native, 42.0, 300, 9.0, 1_000_000)]);
        let report = compare(&snapshot);
        assert_eq!(report.max_sync_drift, 0.0);
        assert_eq!(report.load_time_range_ms, 0);
        assert_eq!(report.buffered_range, 0.0);
        assert_eq!(report.bitrate_range, 0);
    }

    #[test]
    fn test_empty_snapshot() {
        assert_eq!(compare(&Snapshot::default()), ComparisonReport::default());
    }
}
