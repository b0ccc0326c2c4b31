//! Link statistics collection

use std::sync::atomic::{AtomicU64, Ordering};

/// Link statistics
///
/// Counters are shared between the reconnect loop, the read loop, pollers
/// and senders, so they are atomics. Use [`LinkStatistics::snapshot`] to read
/// a consistent-enough copy for monitoring.
#[derive(Debug, Default)]
pub struct LinkStatistics {
    connect_attempts: AtomicU64,
    connect_failures: AtomicU64,
    connections: AtomicU64,
    disconnects: AtomicU64,
    read_faults: AtomicU64,
    detect_terminates: AtomicU64,
    bytes_received: AtomicU64,
    bytes_sent: AtomicU64,
    bytes_discarded: AtomicU64,
}

/// Point-in-time copy of [`LinkStatistics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStatisticsSnapshot {
    /// Total number of connect attempts started
    pub connect_attempts: u64,
    /// Number of failed connect attempts
    pub connect_failures: u64,
    /// Number of links established
    pub connections: u64,
    /// Number of links torn down
    pub disconnects: u64,
    /// Number of read loops ended by a read fault
    pub read_faults: u64,
    /// Number of writes that observed zero progress
    pub detect_terminates: u64,
    /// Total bytes appended to the byte queue
    pub bytes_received: u64,
    /// Total bytes written by senders
    pub bytes_sent: u64,
    /// Bytes skipped by filtered polls while scanning for a requested byte
    pub bytes_discarded: u64,
}

impl LinkStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_connect_attempt(&self) {
        self.connect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_connect_failure(&self) {
        self.connect_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_connection(&self) {
        self.connections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_read_fault(&self) {
        self.read_faults.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_detect_terminate(&self) {
        self.detect_terminates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_bytes_received(&self, n: usize) {
        self.bytes_received.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub(crate) fn add_bytes_sent(&self, n: usize) {
        self.bytes_sent.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub(crate) fn add_bytes_discarded(&self, n: usize) {
        self.bytes_discarded.fetch_add(n as u64, Ordering::Relaxed);
    }

    /// Copy all counters
    pub fn snapshot(&self) -> LinkStatisticsSnapshot {
        LinkStatisticsSnapshot {
            connect_attempts: self.connect_attempts.load(Ordering::Relaxed),
            connect_failures: self.connect_failures.load(Ordering::Relaxed),
            connections: self.connections.load(Ordering::Relaxed),
            disconnects: self.disconnects.load(Ordering::Relaxed),
            read_faults: self.read_faults.load(Ordering::Relaxed),
            detect_terminates: self.detect_terminates.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_discarded: self.bytes_discarded.load(Ordering::Relaxed),
        }
    }
}

impl LinkStatisticsSnapshot {
    /// Fraction of connect attempts that failed, as a percentage
    ///
    /// Returns 0.0 if no attempt has been made.
    pub fn connect_failure_rate(&self) -> f64 {
        if self.connect_attempts == 0 {
            0.0
        } else {
            (self.connect_failures as f64 / self.connect_attempts as f64) * 100.0
        }
    }
}
