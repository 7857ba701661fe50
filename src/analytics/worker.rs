//! 点击记录 worker 池
//!
//! 固定数量的 tokio 任务共享同一个 [`ClickReceiver`]，逐个取出事件并调用
//! [`ClickRepository::create_click`]。单个事件写入失败只记日志和计数，worker 继续运行；
//! 生产端关闭且队列排空后 worker 自然退出。

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::{ClickReceiver, ClickStats, ClickStatsSnapshot};
use crate::errors::{ClicklinkerError, Result};
use crate::storage::ClickRepository;

/// 关闭阶段的排空结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainReport {
    pub finished_workers: usize,
    /// 宽限期结束时仍未退出的 worker，已被分离而非中止
    pub unfinished_workers: usize,
    /// 宽限期结束时队列中剩余的事件数
    pub pending: usize,
    pub stats: ClickStatsSnapshot,
}

impl DrainReport {
    pub fn is_complete(&self) -> bool {
        self.unfinished_workers == 0 && self.pending == 0
    }
}

pub struct ClickWorkerPool {
    handles: Vec<JoinHandle<u64>>,
    receiver: ClickReceiver,
    stats: Arc<ClickStats>,
}

impl ClickWorkerPool {
    /// 启动 `worker_count` 个 worker
    pub fn start(
        worker_count: usize,
        receiver: ClickReceiver,
        repo: Arc<dyn ClickRepository>,
    ) -> Result<Self> {
        if worker_count == 0 {
            return Err(ClicklinkerError::configuration(
                "click worker count must be greater than 0",
            ));
        }

        let stats = receiver.stats();
        let handles = (0..worker_count)
            .map(|worker_id| {
                let rx = receiver.clone();
                let repo = Arc::clone(&repo);
                let stats = Arc::clone(&stats);
                tokio::spawn(run_worker(worker_id, rx, repo, stats))
            })
            .collect();

        info!("ClickWorkerPool: started {} workers", worker_count);
        Ok(Self {
            handles,
            receiver,
            stats,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }

    pub fn stats(&self) -> ClickStatsSnapshot {
        self.stats.snapshot()
    }

    /// 等待所有 worker 在宽限期内退出
    ///
    /// 调用前生产端应已关闭，否则 worker 不会结束，只能等到宽限期耗尽。
    pub async fn wait_for_drain(self, grace: Duration) -> DrainReport {
        // 宽限期过大无法表示为时刻时，不设截止时间，等到全部 worker 退出
        let deadline = tokio::time::Instant::now().checked_add(grace);
        if deadline.is_none() {
            warn!(
                "ClickWorkerPool: grace period {:?} is out of range, waiting without deadline",
                grace
            );
        }
        let mut finished = 0;
        let mut unfinished = 0;

        for (worker_id, handle) in self.handles.into_iter().enumerate() {
            let joined = match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, handle).await,
                None => Ok(handle.await),
            };
            match joined {
                Ok(Ok(processed)) => {
                    trace!("ClickWorkerPool: worker {} processed {} events", worker_id, processed);
                    finished += 1;
                }
                Ok(Err(e)) => {
                    warn!("ClickWorkerPool: worker {} terminated abnormally: {}", worker_id, e);
                    finished += 1;
                }
                Err(_) => {
                    // 超时：JoinHandle 被丢弃，任务分离继续运行
                    unfinished += 1;
                }
            }
        }

        let report = DrainReport {
            finished_workers: finished,
            unfinished_workers: unfinished,
            pending: self.receiver.pending(),
            stats: self.stats.snapshot(),
        };

        if report.is_complete() {
            debug!("ClickWorkerPool: all workers drained");
        } else {
            warn!(
                "ClickWorkerPool: grace period of {:?} elapsed with {} workers still running and {} events pending",
                grace, report.unfinished_workers, report.pending
            );
        }
        report
    }
}

async fn run_worker(
    worker_id: usize,
    receiver: ClickReceiver,
    repo: Arc<dyn ClickRepository>,
    stats: Arc<ClickStats>,
) -> u64 {
    let mut processed = 0u64;
    while let Some(event) = receiver.recv().await {
        match repo.create_click(event.link_id, event.occurred_at).await {
            Ok(()) => stats.record_persisted(),
            Err(e) => {
                stats.record_failed();
                warn!(
                    "ClickWorker {}: failed to record click for '{}' (link {}): {}",
                    worker_id, event.short_code, event.link_id, e
                );
            }
        }
        processed += 1;
    }
    trace!("ClickWorker {}: channel closed, exiting", worker_id);
    processed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{ClickEvent, OverflowPolicy, click_channel};
    use crate::storage::LinkId;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use parking_lot::Mutex;

    /// 记录写入顺序，可配置让某个 link_id 写入失败
    #[derive(Default)]
    struct RecordingRepo {
        written: Mutex<Vec<LinkId>>,
        fail_for: Option<LinkId>,
    }

    #[async_trait]
    impl ClickRepository for RecordingRepo {
        async fn create_click(&self, link_id: LinkId, _timestamp: DateTime<Utc>) -> Result<()> {
            if self.fail_for == Some(link_id) {
                return Err(ClicklinkerError::persistence("simulated write failure"));
            }
            self.written.lock().push(link_id);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_zero_workers_rejected() {
        let (_recorder, receiver) = click_channel(4, OverflowPolicy::Drop).unwrap();
        let repo = Arc::new(RecordingRepo::default());
        assert!(ClickWorkerPool::start(0, receiver, repo).is_err());
    }

    #[tokio::test]
    async fn test_single_worker_preserves_order() {
        let (recorder, receiver) = click_channel(16, OverflowPolicy::Drop).unwrap();
        let repo = Arc::new(RecordingRepo::default());
        let pool = ClickWorkerPool::start(1, receiver, repo.clone()).unwrap();

        for id in 1..=10 {
            recorder.record(ClickEvent::new(id, "abc")).await;
        }
        recorder.close();

        let report = pool.wait_for_drain(Duration::from_secs(5)).await;
        assert!(report.is_complete());
        assert_eq!(*repo.written.lock(), (1..=10).collect::<Vec<_>>());
        assert_eq!(report.stats.persisted, 10);
    }

    #[tokio::test]
    async fn test_failed_write_does_not_stop_worker() {
        let (recorder, receiver) = click_channel(16, OverflowPolicy::Drop).unwrap();
        let repo = Arc::new(RecordingRepo {
            written: Mutex::new(Vec::new()),
            fail_for: Some(2),
        });
        let pool = ClickWorkerPool::start(1, receiver, repo.clone()).unwrap();

        for id in 1..=3 {
            recorder.record(ClickEvent::new(id, "abc")).await;
        }
        recorder.close();

        let report = pool.wait_for_drain(Duration::from_secs(5)).await;
        assert_eq!(*repo.written.lock(), vec![1, 3]);
        assert_eq!(report.stats.persisted, 2);
        assert_eq!(report.stats.failed, 1);
        assert_eq!(report.finished_workers, 1);
    }

    #[tokio::test]
    async fn test_unrepresentable_grace_still_drains() {
        let (recorder, receiver) = click_channel(8, OverflowPolicy::Drop).unwrap();
        let repo = Arc::new(RecordingRepo::default());
        let pool = ClickWorkerPool::start(2, receiver, repo.clone()).unwrap();

        for id in 1..=4 {
            recorder.record(ClickEvent::new(id, "abc")).await;
        }
        recorder.close();

        let report = pool.wait_for_drain(Duration::MAX).await;
        assert!(report.is_complete());
        assert_eq!(report.stats.persisted, 4);
        assert_eq!(repo.written.lock().len(), 4);
    }

    #[tokio::test]
    async fn test_drain_times_out_when_producer_still_open() {
        let (_recorder, receiver) = click_channel(4, OverflowPolicy::Drop).unwrap();
        let repo = Arc::new(RecordingRepo::default());
        let pool = ClickWorkerPool::start(2, receiver, repo).unwrap();

        let report = pool.wait_for_drain(Duration::from_millis(50)).await;
        assert_eq!(report.finished_workers, 0);
        assert_eq!(report.unfinished_workers, 2);
        assert!(!report.is_complete());
    }
}
