//! In-memory generation counters
//!
//! Aggregates stay inside the process; `log_summary` is the only way they
//! leave it, as a tracing event.

use crate::input::InputMode;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

static METRICS: OnceLock<Mutex<MetricsState>> = OnceLock::new();

fn state() -> &'static Mutex<MetricsState> {
    METRICS.get_or_init(|| Mutex::new(MetricsState::new()))
}

/// Record the outcome of a generation cycle.
pub fn record(duration: Duration, success: bool, mode: InputMode) {
    let mut state = state().lock().expect("metrics mutex poisoned");
    state.total += 1;
    if success {
        state.successes += 1;
        state.success_duration += duration;
    } else {
        state.failures += 1;
    }

    let entry = state.per_mode.entry(mode).or_default();
    if success {
        entry.successes += 1;
    } else {
        entry.failures += 1;
    }
}

/// Copy of the counters accumulated so far
pub fn snapshot() -> Snapshot {
    state().lock().expect("metrics mutex poisoned").snapshot()
}

/// Emit the current counters as a single info event.
pub fn log_summary() {
    let snapshot = snapshot();
    if snapshot.total == 0 {
        return;
    }

    tracing::info!(
        target: "qrstudio::metrics",
        total = snapshot.total,
        successes = snapshot.successes,
        failures = snapshot.failures,
        success_rate = format_args!("{:.1}%", snapshot.success_rate()),
        avg_latency_ms = format_args!("{:.2}", snapshot.avg_latency_ms),
        uptime_secs = snapshot.uptime_secs,
        "Generation summary"
    );
}

struct MetricsState {
    total: u64,
    successes: u64,
    failures: u64,
    success_duration: Duration,
    per_mode: HashMap<InputMode, ModeCounters>,
    started: Instant,
}

#[derive(Default)]
struct ModeCounters {
    successes: u64,
    failures: u64,
}

impl MetricsState {
    fn new() -> Self {
        Self {
            total: 0,
            successes: 0,
            failures: 0,
            success_duration: Duration::ZERO,
            per_mode: HashMap::new(),
            started: Instant::now(),
        }
    }

    fn snapshot(&self) -> Snapshot {
        let avg_latency_ms = if self.successes == 0 {
            0.0
        } else {
            self.success_duration.as_secs_f64() * 1_000.0 / self.successes as f64
        };

        let mut per_mode: Vec<ModeSnapshot> = self
            .per_mode
            .iter()
            .map(|(mode, counters)| ModeSnapshot {
                mode: *mode,
                successes: counters.successes,
                failures: counters.failures,
            })
            .collect();
        per_mode.sort_by_key(|entry| entry.mode.as_str());

        Snapshot {
            total: self.total,
            successes: self.successes,
            failures: self.failures,
            avg_latency_ms,
            uptime_secs: self.started.elapsed().as_secs(),
            per_mode,
        }
    }
}

/// Serializable view of the counters
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// Generation cycles recorded
    pub total: u64,
    /// Cycles that produced a raster
    pub successes: u64,
    /// Cycles that failed (including validation)
    pub failures: u64,
    /// Mean duration of successful cycles
    pub avg_latency_ms: f64,
    /// Seconds since the first recorded metric
    pub uptime_secs: u64,
    /// Breakdown by input mode
    pub per_mode: Vec<ModeSnapshot>,
}

impl Snapshot {
    /// Share of successful cycles, 0-100
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.successes as f64 / self.total as f64) * 100.0
        }
    }
}

/// Counters for one input mode
#[derive(Debug, Clone, Serialize)]
pub struct ModeSnapshot {
    /// Input mode
    pub mode: InputMode,
    /// Successful cycles
    pub successes: u64,
    /// Failed cycles
    pub failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_accumulate() {
        let before = snapshot();
        record(Duration::from_millis(12), true, InputMode::Contact);
        record(Duration::from_millis(3), false, InputMode::Contact);

        let after = snapshot();
        assert!(after.total >= before.total + 2);
        assert!(after.successes > before.successes);
        assert!(after.failures > before.failures);
        assert!(
            after
                .per_mode
                .iter()
                .any(|entry| entry.mode == InputMode::Contact && entry.successes >= 1)
        );
    }

    #[test]
    fn empty_snapshot_rate_is_zero() {
        let empty = MetricsState::new().snapshot();
        assert_eq!(empty.success_rate(), 0.0);
        assert_eq!(empty.avg_latency_ms, 0.0);
    }
}
