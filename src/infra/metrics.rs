//! Lock-free duty metrics and periodic reporting
//!
//! Uses atomics so a host can share one collector between the session and a
//! reporter without locking the chart.
//!
//! NOTE: All atomics use Relaxed ordering intentionally; these are statistical
//! counters only. Do NOT use them for coordination or logic decisions.

use crate::domain::warning::{FraudWarning, WarningKind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Exponential bucket boundaries (microseconds)
/// Buckets: ≤100, ≤200, ≤400, ≤800, ≤1600, ≤3200, ≤6400, ≤12800, ≤25600, ≤51200, >51200
const BUCKET_BOUNDS: [u64; 10] = [100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600, 51200];
const NUM_BUCKETS: usize = 11;

/// Compute bucket index for a latency value using binary search
#[inline]
fn bucket_index(latency_us: u64) -> usize {
    BUCKET_BOUNDS.partition_point(|&bound| bound < latency_us)
}

/// Update an atomic max value using compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

/// Swap all buckets to zero and return their values
#[inline]
fn swap_buckets(buckets: &[AtomicU64; NUM_BUCKETS]) -> [u64; NUM_BUCKETS] {
    let mut result = [0u64; NUM_BUCKETS];
    for (i, bucket) in buckets.iter().enumerate() {
        result[i] = bucket.swap(0, Ordering::Relaxed);
    }
    result
}

/// Compute percentile from histogram buckets
/// Returns the upper bound of the bucket containing the percentile
fn percentile_from_buckets(buckets: &[u64; NUM_BUCKETS], percentile: f64) -> u64 {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return 0;
    }

    let target = (total as f64 * percentile) as u64;
    let mut cumulative = 0u64;

    // Upper bounds for each bucket (last bucket uses 2x the previous bound)
    const BUCKET_UPPER_BOUNDS: [u64; NUM_BUCKETS] =
        [100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600, 51200, 102400];

    for (i, &count) in buckets.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return BUCKET_UPPER_BOUNDS[i];
        }
    }
    BUCKET_UPPER_BOUNDS[NUM_BUCKETS - 1]
}

/// Lock-free metrics collector
pub struct Metrics {
    /// Total session events applied or rejected (monotonic)
    events_total: AtomicU64,
    /// Events since last report (reset on report)
    events_since_report: AtomicU64,
    /// Sum of reducer latencies in microseconds (reset on report)
    latency_sum_us: AtomicU64,
    /// Max reducer latency in microseconds (reset on report)
    latency_max_us: AtomicU64,
    /// Reducer latency histogram buckets (reset on report)
    latency_buckets: [AtomicU64; NUM_BUCKETS],
    /// Mutations refused because a handover held the lock
    rejected_locked_total: AtomicU64,
    /// Events refused for validation, not-found or illegal transition
    rejected_other_total: AtomicU64,
    scans_total: AtomicU64,
    /// Warnings raised, indexed by `WarningKind::index`
    warnings_by_kind: [AtomicU64; WarningKind::COUNT],
    verifications_total: AtomicU64,
    no_shows_total: AtomicU64,
    swaps_total: AtomicU64,
    rac_upgrades_total: AtomicU64,
    /// Upgrade requests that found no RAC passenger or no seat
    rac_noop_total: AtomicU64,
    penalties_total: AtomicU64,
    penalty_inr_total: AtomicU64,
    incidents_total: AtomicU64,
    handovers_completed_total: AtomicU64,
    /// Last report time (only accessed from reporter)
    last_report_time: parking_lot::Mutex<Instant>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            events_total: AtomicU64::new(0),
            events_since_report: AtomicU64::new(0),
            latency_sum_us: AtomicU64::new(0),
            latency_max_us: AtomicU64::new(0),
            latency_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            rejected_locked_total: AtomicU64::new(0),
            rejected_other_total: AtomicU64::new(0),
            scans_total: AtomicU64::new(0),
            warnings_by_kind: std::array::from_fn(|_| AtomicU64::new(0)),
            verifications_total: AtomicU64::new(0),
            no_shows_total: AtomicU64::new(0),
            swaps_total: AtomicU64::new(0),
            rac_upgrades_total: AtomicU64::new(0),
            rac_noop_total: AtomicU64::new(0),
            penalties_total: AtomicU64::new(0),
            penalty_inr_total: AtomicU64::new(0),
            incidents_total: AtomicU64::new(0),
            handovers_completed_total: AtomicU64::new(0),
            last_report_time: parking_lot::Mutex::new(Instant::now()),
        }
    }

    /// Record an event was processed with given latency (lock-free)
    #[inline]
    pub fn record_event_processed(&self, latency_us: u64) {
        self.events_total.fetch_add(1, Ordering::Relaxed);
        self.events_since_report.fetch_add(1, Ordering::Relaxed);
        self.latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);

        let bucket = bucket_index(latency_us);
        self.latency_buckets[bucket].fetch_add(1, Ordering::Relaxed);

        update_atomic_max(&self.latency_max_us, latency_us);
    }

    #[inline]
    pub fn record_locked_rejection(&self) {
        self.rejected_locked_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_rejection(&self) {
        self.rejected_other_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a scan or lookup and the warnings it raised
    pub fn record_scan(&self, warnings: &[FraudWarning]) {
        self.scans_total.fetch_add(1, Ordering::Relaxed);
        for w in warnings {
            self.warnings_by_kind[w.kind.index()].fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_verifications(&self, count: u64) {
        self.verifications_total.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_no_show(&self) {
        self.no_shows_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_swap(&self) {
        self.swaps_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_rac_upgrade(&self, upgraded: bool) {
        if upgraded {
            self.rac_upgrades_total.fetch_add(1, Ordering::Relaxed);
        } else {
            self.rac_noop_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_penalty(&self, amount_inr: u64) {
        self.penalties_total.fetch_add(1, Ordering::Relaxed);
        self.penalty_inr_total.fetch_add(amount_inr, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_incident(&self) {
        self.incidents_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_handover_completed(&self) {
        self.handovers_completed_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn events_total(&self) -> u64 {
        self.events_total.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn rejected_locked_total(&self) -> u64 {
        self.rejected_locked_total.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn warnings_of(&self, kind: WarningKind) -> u64 {
        self.warnings_by_kind[kind.index()].load(Ordering::Relaxed)
    }

    /// Calculate and return metrics summary, then reset periodic counters
    ///
    /// This is the only method that resets counters. Duty counters are
    /// monotonic and never reset.
    pub fn report(&self) -> MetricsSummary {
        let events_count = self.events_since_report.swap(0, Ordering::Relaxed);
        let latency_sum = self.latency_sum_us.swap(0, Ordering::Relaxed);
        let max_latency = self.latency_max_us.swap(0, Ordering::Relaxed);
        let lat_buckets = swap_buckets(&self.latency_buckets);

        let elapsed = {
            let mut last = self.last_report_time.lock();
            let elapsed = last.elapsed();
            *last = Instant::now();
            elapsed
        };

        let events_per_sec = if elapsed.as_secs_f64() > 0.0 {
            events_count as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };
        let avg_latency = if events_count > 0 { latency_sum / events_count } else { 0 };

        let warnings_by_kind: [u64; WarningKind::COUNT] =
            std::array::from_fn(|i| self.warnings_by_kind[i].load(Ordering::Relaxed));

        MetricsSummary {
            events_total: self.events_total.load(Ordering::Relaxed),
            events_per_sec,
            avg_process_latency_us: avg_latency,
            max_process_latency_us: max_latency,
            lat_p50_us: percentile_from_buckets(&lat_buckets, 0.50),
            lat_p99_us: percentile_from_buckets(&lat_buckets, 0.99),
            rejected_locked_total: self.rejected_locked_total.load(Ordering::Relaxed),
            rejected_other_total: self.rejected_other_total.load(Ordering::Relaxed),
            scans_total: self.scans_total.load(Ordering::Relaxed),
            warnings_by_kind,
            verifications_total: self.verifications_total.load(Ordering::Relaxed),
            no_shows_total: self.no_shows_total.load(Ordering::Relaxed),
            swaps_total: self.swaps_total.load(Ordering::Relaxed),
            rac_upgrades_total: self.rac_upgrades_total.load(Ordering::Relaxed),
            rac_noop_total: self.rac_noop_total.load(Ordering::Relaxed),
            penalties_total: self.penalties_total.load(Ordering::Relaxed),
            penalty_inr_total: self.penalty_inr_total.load(Ordering::Relaxed),
            incidents_total: self.incidents_total.load(Ordering::Relaxed),
            handovers_completed_total: self.handovers_completed_total.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub events_total: u64,
    pub events_per_sec: f64,
    pub avg_process_latency_us: u64,
    pub max_process_latency_us: u64,
    pub lat_p50_us: u64,
    pub lat_p99_us: u64,
    pub rejected_locked_total: u64,
    pub rejected_other_total: u64,
    pub scans_total: u64,
    /// Indexed by `WarningKind::index`
    pub warnings_by_kind: [u64; WarningKind::COUNT],
    pub verifications_total: u64,
    pub no_shows_total: u64,
    pub swaps_total: u64,
    pub rac_upgrades_total: u64,
    pub rac_noop_total: u64,
    pub penalties_total: u64,
    pub penalty_inr_total: u64,
    pub incidents_total: u64,
    pub handovers_completed_total: u64,
}

impl MetricsSummary {
    pub fn warnings_total(&self) -> u64 {
        self.warnings_by_kind.iter().sum()
    }

    pub fn log(&self) {
        let w = &self.warnings_by_kind;
        info!(
            events_total = %self.events_total,
            events_per_sec = format!("{:.1}", self.events_per_sec),
            avg_latency_us = %self.avg_process_latency_us,
            max_latency_us = %self.max_process_latency_us,
            p99_us = %self.lat_p99_us,
            rejected_locked = %self.rejected_locked_total,
            rejected_other = %self.rejected_other_total,
            scans = %self.scans_total,
            warn_not_found = %w[WarningKind::NotFound.index()],
            warn_duplicate = %w[WarningKind::DuplicateQr.index()],
            warn_expired = %w[WarningKind::ExpiredJourney.index()],
            warn_wrong_date = %w[WarningKind::WrongDate.index()],
            warn_blacklisted = %w[WarningKind::Blacklisted.index()],
            verifications = %self.verifications_total,
            no_shows = %self.no_shows_total,
            swaps = %self.swaps_total,
            rac_upgrades = %self.rac_upgrades_total,
            penalties = %self.penalties_total,
            penalty_inr = %self.penalty_inr_total,
            incidents = %self.incidents_total,
            "metrics"
        );
    }
}
