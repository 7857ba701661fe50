use std::sync::atomic::{AtomicU64, Ordering};

use super::channel::DropReason;

/// 管道计数器，生产端和 worker 共享
#[derive(Debug, Default)]
pub struct ClickStats {
    enqueued: AtomicU64,
    dropped_full: AtomicU64,
    dropped_timeout: AtomicU64,
    dropped_closed: AtomicU64,
    persisted: AtomicU64,
    failed: AtomicU64,
}

/// 某一时刻的计数快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickStatsSnapshot {
    pub enqueued: u64,
    pub dropped_full: u64,
    pub dropped_timeout: u64,
    pub dropped_closed: u64,
    pub persisted: u64,
    pub failed: u64,
}

impl ClickStatsSnapshot {
    /// 溢出丢弃总数
    pub fn dropped(&self) -> u64 {
        self.dropped_full + self.dropped_timeout + self.dropped_closed
    }
}

impl ClickStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self, reason: DropReason) {
        let counter = match reason {
            DropReason::Full => &self.dropped_full,
            DropReason::Timeout => &self.dropped_timeout,
            DropReason::Closed => &self.dropped_closed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persisted(&self) {
        self.persisted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dropped(&self) -> u64 {
        self.snapshot().dropped()
    }

    pub fn snapshot(&self) -> ClickStatsSnapshot {
        ClickStatsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dropped_full: self.dropped_full.load(Ordering::Relaxed),
            dropped_timeout: self.dropped_timeout.load(Ordering::Relaxed),
            dropped_closed: self.dropped_closed.load(Ordering::Relaxed),
            persisted: self.persisted.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}
