//! Engine failure-rate tracking for smart rotation.
//!
//! Process-local and advisory: counters reset with the worker process and
//! only influence selection, never correctness.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::warn;

use rforge_models::{EngineId, RotationConfig};

#[derive(Debug, Default)]
struct Samples {
    /// (when, success) pairs, oldest first.
    events: Vec<(Instant, bool)>,
}

/// Rolling per-engine success/failure tracker.
#[derive(Debug, Default)]
pub struct FailureTracker {
    inner: Mutex<HashMap<EngineId, Samples>>,
}

impl FailureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an attempt outcome.
    pub fn record(&self, engine: EngineId, success: bool) {
        let mut inner = self.inner.lock().expect("tracker lock");
        inner
            .entry(engine)
            .or_default()
            .events
            .push((Instant::now(), success));
    }

    fn window_counts(&self, engine: EngineId, window: Duration) -> (usize, usize) {
        let cutoff = Instant::now().checked_sub(window);
        let inner = self.inner.lock().expect("tracker lock");
        let Some(samples) = inner.get(&engine) else {
            return (0, 0);
        };
        let mut failures = 0;
        let mut successes = 0;
        for (when, success) in &samples.events {
            let in_window = match cutoff {
                Some(cutoff) => *when > cutoff,
                None => true,
            };
            if in_window {
                if *success {
                    successes += 1;
                } else {
                    failures += 1;
                }
            }
        }
        (failures, successes)
    }

    /// Recent failure rate within a window, 0.0 with no samples.
    pub fn failure_rate(&self, engine: EngineId, window: Duration) -> f64 {
        let (failures, successes) = self.window_counts(engine, window);
        let total = failures + successes;
        if total == 0 {
            return 0.0;
        }
        failures as f64 / total as f64
    }

    /// Whether selection should rotate away from this engine.
    pub fn should_rotate(&self, engine: EngineId, config: &RotationConfig) -> bool {
        if !config.enabled || engine == EngineId::Local {
            return false;
        }
        let window = Duration::from_secs(config.window_seconds);
        let (failures, successes) = self.window_counts(engine, window);
        let total = failures + successes;
        if total < config.min_attempts {
            return false;
        }
        let rate = failures as f64 / total as f64;
        if rate >= config.failure_threshold {
            warn!(engine = %engine, failure_rate = rate, "engine rotation triggered");
            true
        } else {
            false
        }
    }

    /// First engine in `chain` that is not `excluded` and not itself
    /// rotating away.
    pub fn healthy_alternative(
        &self,
        excluded: EngineId,
        chain: &[EngineId],
        config: &RotationConfig,
    ) -> Option<EngineId> {
        chain
            .iter()
            .copied()
            .find(|e| *e != excluded && !self.should_rotate(*e, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(enabled: bool) -> RotationConfig {
        RotationConfig {
            enabled,
            failure_threshold: 0.5,
            window_seconds: 300,
            min_attempts: 3,
        }
    }

    #[test]
    fn test_no_rotation_when_disabled() {
        let tracker = FailureTracker::new();
        for _ in 0..5 {
            tracker.record(EngineId::Runway, false);
        }
        assert!(!tracker.should_rotate(EngineId::Runway, &config(false)));
    }

    #[test]
    fn test_rotation_needs_min_attempts() {
        let tracker = FailureTracker::new();
        tracker.record(EngineId::Runway, false);
        tracker.record(EngineId::Runway, false);
        assert!(!tracker.should_rotate(EngineId::Runway, &config(true)));

        tracker.record(EngineId::Runway, false);
        assert!(tracker.should_rotate(EngineId::Runway, &config(true)));
    }

    #[test]
    fn test_failure_rate_mixed() {
        let tracker = FailureTracker::new();
        tracker.record(EngineId::Pika, false);
        tracker.record(EngineId::Pika, true);
        tracker.record(EngineId::Pika, true);
        tracker.record(EngineId::Pika, true);
        let rate = tracker.failure_rate(EngineId::Pika, Duration::from_secs(300));
        assert!((rate - 0.25).abs() < 1e-9);
        assert!(!tracker.should_rotate(EngineId::Pika, &config(true)));
    }

    #[test]
    fn test_healthy_alternative_skips_failing_engines() {
        let tracker = FailureTracker::new();
        for _ in 0..4 {
            tracker.record(EngineId::Runway, false);
            tracker.record(EngineId::Pika, false);
        }
        let chain = [EngineId::Runway, EngineId::Pika, EngineId::Luma];
        let alt = tracker.healthy_alternative(EngineId::Runway, &chain, &config(true));
        assert_eq!(alt, Some(EngineId::Luma));
    }
}
