use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::models::AgentMetrics;

/// Smoothing factor for the exponentially weighted estimators.
const EWMA_ALPHA: f64 = 0.2;

/// Rolling usage statistics, owned by a single agent.
#[derive(Debug, Clone, Default)]
pub(crate) struct RollingStats {
    messages: u64,
    successes: u64,
    failures: u64,
    success_rate: Option<f64>,
    avg_response_ms: Option<f64>,
    last_activity: Option<DateTime<Utc>>,
}

impl RollingStats {
    /// Count an incoming unit of work.
    pub fn begin(&mut self) {
        self.messages += 1;
        self.last_activity = Some(Utc::now());
    }

    /// Fold the outcome of a finished unit of work into the estimators.
    pub fn record(&mut self, success: bool, elapsed: Duration) {
        if success {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
        let sample = if success { 1.0 } else { 0.0 };
        self.success_rate = Some(ewma(self.success_rate, sample));
        self.avg_response_ms = Some(ewma(self.avg_response_ms, elapsed.as_secs_f64() * 1000.0));
        self.last_activity = Some(Utc::now());
    }

    pub fn snapshot(&self) -> AgentMetrics {
        AgentMetrics {
            messages_processed: self.messages,
            successes: self.successes,
            failures: self.failures,
            success_rate: self.success_rate,
            avg_response_time_ms: self.avg_response_ms,
            last_activity: self.last_activity,
        }
    }
}

fn ewma(previous: Option<f64>, sample: f64) -> f64 {
    match previous {
        None => sample,
        Some(prev) => prev + EWMA_ALPHA * (sample - prev),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_observation_seeds_estimate() {
        let mut stats = RollingStats::default();
        stats.begin();
        stats.record(true, Duration::from_millis(40));
        let m = stats.snapshot();
        assert_eq!(m.messages_processed, 1);
        assert_eq!(m.success_rate, Some(1.0));
        assert_eq!(m.avg_response_time_ms, Some(40.0));
    }

    #[test]
    fn test_failure_decays_success_rate() {
        let mut stats = RollingStats::default();
        stats.begin();
        stats.record(true, Duration::from_millis(10));
        stats.begin();
        stats.record(false, Duration::from_millis(10));
        let m = stats.snapshot();
        assert_eq!(m.failures, 1);
        let rate = m.success_rate.unwrap();
        assert!((rate - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_untouched_agent_has_no_rates() {
        let m = RollingStats::default().snapshot();
        assert_eq!(m.messages_processed, 0);
        assert!(m.success_rate.is_none());
        assert!(m.last_activity.is_none());
    }
}
