// Orchestration metrics
//
// Counts orchestration attempts per operation and outcome and tracks provider call latency.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use utoipa::ToSchema;

use crate::reservations::models::OperationKind;

/// Provider calls slower than this are logged at warn level
const SLOW_PROVIDER_CALL_THRESHOLD_MS: u64 = 5_000;

#[derive(Debug, Default)]
struct OperationCounters {
    succeeded: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
}

impl OperationCounters {
    fn snapshot(&self) -> OperationCounts {
        OperationCounts {
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Default)]
struct MetricsInner {
    reservations: OperationCounters,
    amendments: OperationCounters,
    cancellations: OperationCounters,

    provider_calls: AtomicU64,
    provider_failures: AtomicU64,
    slow_provider_calls: AtomicU64,
    // microseconds
    total_provider_time_us: AtomicU64,
}

/// Outcome classes recorded per orchestration attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    /// Provider or consistency failure after the request was accepted
    Failed,
    /// Rejected before any provider call (validation, routing, preconditions)
    Rejected,
}

/// Shared orchestration metrics; cloning shares the same counters
#[derive(Debug, Clone, Default)]
pub struct OrchestrationMetrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OperationCounts {
    pub succeeded: u64,
    pub failed: u64,
    pub rejected: u64,
}

/// Point-in-time view of the counters
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub reservations: OperationCounts,
    pub amendments: OperationCounts,
    pub cancellations: OperationCounts,
    pub provider_calls: u64,
    pub provider_failures: u64,
    pub slow_provider_calls: u64,
    pub average_provider_time_ms: f64,
}

impl OrchestrationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn counters(&self, operation: OperationKind) -> &OperationCounters {
        match operation {
            OperationKind::Reservation => &self.inner.reservations,
            OperationKind::Amend => &self.inner.amendments,
            OperationKind::Cancel => &self.inner.cancellations,
        }
    }

    pub fn record_outcome(&self, operation: OperationKind, outcome: Outcome) {
        let counters = self.counters(operation);
        let counter = match outcome {
            Outcome::Succeeded => &counters.succeeded,
            Outcome::Failed => &counters.failed,
            Outcome::Rejected => &counters.rejected,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Start timing a provider call; the timer records itself when finished
    pub fn start_provider_call(&self, provider: &'static str) -> ProviderCallTimer {
        ProviderCallTimer {
            metrics: self.clone(),
            provider,
            started: Instant::now(),
        }
    }

    fn record_provider_call(&self, provider: &str, duration: Duration, failed: bool) {
        self.inner.provider_calls.fetch_add(1, Ordering::Relaxed);
        self.inner
            .total_provider_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        if failed {
            self.inner.provider_failures.fetch_add(1, Ordering::Relaxed);
        }

        if duration.as_millis() as u64 > SLOW_PROVIDER_CALL_THRESHOLD_MS {
            self.inner.slow_provider_calls.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(provider, "Slow provider call: {}ms", duration.as_millis());
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let calls = self.inner.provider_calls.load(Ordering::Relaxed);
        let total_us = self.inner.total_provider_time_us.load(Ordering::Relaxed);
        let average_provider_time_ms = if calls == 0 {
            0.0
        } else {
            total_us as f64 / calls as f64 / 1000.0
        };

        MetricsSnapshot {
            reservations: self.inner.reservations.snapshot(),
            amendments: self.inner.amendments.snapshot(),
            cancellations: self.inner.cancellations.snapshot(),
            provider_calls: calls,
            provider_failures: self.inner.provider_failures.load(Ordering::Relaxed),
            slow_provider_calls: self.inner.slow_provider_calls.load(Ordering::Relaxed),
            average_provider_time_ms,
        }
    }
}

/// Times a single provider call
pub struct ProviderCallTimer {
    metrics: OrchestrationMetrics,
    provider: &'static str,
    started: Instant,
}

impl ProviderCallTimer {
    pub fn finish(self, failed: bool) {
        self.metrics
            .record_provider_call(self.provider, self.started.elapsed(), failed);
    }
}
