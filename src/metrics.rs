use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Operation metrics collector for a dayfile database
#[derive(Debug)]
pub struct MetricsCollector {
    // Operation counts
    /// Number of records appended
    write_count: AtomicUsize,
    /// Number of range queries
    range_query_count: AtomicUsize,
    /// Number of last-N queries
    last_query_count: AtomicUsize,
    /// Number of point lookups
    point_query_count: AtomicUsize,

    // Data metrics
    /// Total payload bytes appended
    bytes_written: AtomicUsize,
    /// Records decoded while scanning shards
    records_scanned: AtomicUsize,
    /// Records handed back to callers
    records_returned: AtomicUsize,
    /// Shards resolved for writes and queries
    shards_resolved: AtomicUsize,

    // Timing metrics
    /// Total write duration in nanoseconds
    write_duration_ns: AtomicU64,
    /// Total query duration in nanoseconds
    query_duration_ns: AtomicU64,

    /// Start time of the metrics collector
    start_time: Instant,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            write_count: AtomicUsize::new(0),
            range_query_count: AtomicUsize::new(0),
            last_query_count: AtomicUsize::new(0),
            point_query_count: AtomicUsize::new(0),

            bytes_written: AtomicUsize::new(0),
            records_scanned: AtomicUsize::new(0),
            records_returned: AtomicUsize::new(0),
            shards_resolved: AtomicUsize::new(0),

            write_duration_ns: AtomicU64::new(0),
            query_duration_ns: AtomicU64::new(0),

            start_time: Instant::now(),
        }
    }

    /// Record one appended record
    pub fn record_write(&self, bytes: usize, duration: Duration) {
        self.write_count.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
        self.write_duration_ns.fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Increment range query count
    pub fn increment_range_queries(&self) {
        self.range_query_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment last-N query count
    pub fn increment_last_queries(&self) {
        self.last_query_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment point lookup count
    pub fn increment_point_queries(&self) {
        self.point_query_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Add to the number of records decoded by scans
    pub fn add_records_scanned(&self, count: usize) {
        self.records_scanned.fetch_add(count, Ordering::Relaxed);
    }

    /// Add to the number of records returned to callers
    pub fn add_records_returned(&self, count: usize) {
        self.records_returned.fetch_add(count, Ordering::Relaxed);
    }

    /// Add to the number of shards resolved
    pub fn add_shards_resolved(&self, count: usize) {
        self.shards_resolved.fetch_add(count, Ordering::Relaxed);
    }

    /// Record query duration
    pub fn record_query_duration(&self, duration: Duration) {
        self.query_duration_ns.fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Get write count
    pub fn get_write_count(&self) -> usize {
        self.write_count.load(Ordering::Relaxed)
    }

    /// Get total query count across all kinds
    pub fn get_query_count(&self) -> usize {
        self.get_range_query_count() + self.get_last_query_count() + self.get_point_query_count()
    }

    /// Get range query count
    pub fn get_range_query_count(&self) -> usize {
        self.range_query_count.load(Ordering::Relaxed)
    }

    /// Get last-N query count
    pub fn get_last_query_count(&self) -> usize {
        self.last_query_count.load(Ordering::Relaxed)
    }

    /// Get point lookup count
    pub fn get_point_query_count(&self) -> usize {
        self.point_query_count.load(Ordering::Relaxed)
    }

    /// Get payload bytes written
    pub fn get_bytes_written(&self) -> usize {
        self.bytes_written.load(Ordering::Relaxed)
    }

    /// Get records scanned
    pub fn get_records_scanned(&self) -> usize {
        self.records_scanned.load(Ordering::Relaxed)
    }

    /// Get records returned
    pub fn get_records_returned(&self) -> usize {
        self.records_returned.load(Ordering::Relaxed)
    }

    /// Get shards resolved
    pub fn get_shards_resolved(&self) -> usize {
        self.shards_resolved.load(Ordering::Relaxed)
    }

    /// Get total write duration
    pub fn get_write_duration(&self) -> Duration {
        Duration::from_nanos(self.write_duration_ns.load(Ordering::Relaxed))
    }

    /// Get total query duration
    pub fn get_query_duration(&self) -> Duration {
        Duration::from_nanos(self.query_duration_ns.load(Ordering::Relaxed))
    }

    /// Get uptime of the collector
    pub fn get_uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Reset all counters
    pub fn reset(&self) {
        self.write_count.store(0, Ordering::Relaxed);
        self.range_query_count.store(0, Ordering::Relaxed);
        self.last_query_count.store(0, Ordering::Relaxed);
        self.point_query_count.store(0, Ordering::Relaxed);

        self.bytes_written.store(0, Ordering::Relaxed);
        self.records_scanned.store(0, Ordering::Relaxed);
        self.records_returned.store(0, Ordering::Relaxed);
        self.shards_resolved.store(0, Ordering::Relaxed);

        self.write_duration_ns.store(0, Ordering::Relaxed);
        self.query_duration_ns.store(0, Ordering::Relaxed);
    }

    /// Get a report of all metrics
    pub fn get_report(&self) -> String {
        let mut report = String::new();

        report.push_str("=== dayfile Metrics Report ===\n\n");
        report.push_str(&format!("Uptime: {:?}\n\n", self.get_uptime()));

        report.push_str("Operation Counts:\n");
        report.push_str(&format!("  Writes: {}\n", self.get_write_count()));
        report.push_str(&format!("  Range Queries: {}\n", self.get_range_query_count()));
        report.push_str(&format!("  Last Queries: {}\n", self.get_last_query_count()));
        report.push_str(&format!("  Point Queries: {}\n\n", self.get_point_query_count()));

        report.push_str("Data Metrics:\n");
        report.push_str(&format!("  Bytes Written: {}\n", self.get_bytes_written()));
        report.push_str(&format!("  Records Scanned: {}\n", self.get_records_scanned()));
        report.push_str(&format!("  Records Returned: {}\n", self.get_records_returned()));
        report.push_str(&format!("  Shards Resolved: {}\n\n", self.get_shards_resolved()));

        report.push_str("Performance Metrics:\n");
        if self.get_write_count() > 0 {
            let avg_write = self.get_write_duration().as_micros() / self.get_write_count() as u128;
            report.push_str(&format!("  Avg. Write Time: {}µs\n", avg_write));
        }
        if self.get_query_count() > 0 {
            let avg_query = self.get_query_duration().as_micros() / self.get_query_count() as u128;
            report.push_str(&format!("  Avg. Query Time: {}µs\n", avg_query));
        }

        report
    }
}
