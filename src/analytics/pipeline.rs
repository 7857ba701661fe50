use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::{
    ClickRecorder, ClickStats, ClickWorkerPool, DrainReport, OverflowPolicy, click_channel,
};
use crate::config::{AnalyticsConfig, MAX_SHUTDOWN_GRACE_SECS, OverflowPolicyKind};
use crate::errors::{ClicklinkerError, Result};
use crate::storage::ClickRepository;

/// 管道运行参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickPipelineConfig {
    pub capacity: usize,
    pub worker_count: usize,
    pub policy: OverflowPolicy,
    pub shutdown_grace: Duration,
}

impl Default for ClickPipelineConfig {
    fn default() -> Self {
        Self::from(&AnalyticsConfig::default())
    }
}

impl From<&AnalyticsConfig> for ClickPipelineConfig {
    fn from(config: &AnalyticsConfig) -> Self {
        let policy = match config.overflow_policy {
            OverflowPolicyKind::Drop => OverflowPolicy::Drop,
            OverflowPolicyKind::BlockWithTimeout => {
                OverflowPolicy::BlockWithTimeout(Duration::from_millis(config.enqueue_timeout_ms))
            }
        };
        Self {
            capacity: config.buffer_size,
            worker_count: config.worker_count,
            policy,
            shutdown_grace: Duration::from_secs(config.shutdown_grace_secs),
        }
    }
}

/// 队列与 worker 池的组合，拥有两者的生命周期
pub struct ClickPipeline {
    recorder: ClickRecorder,
    workers: ClickWorkerPool,
    shutdown_grace: Duration,
}

impl ClickPipeline {
    pub fn start(config: ClickPipelineConfig, repo: Arc<dyn ClickRepository>) -> Result<Self> {
        if config.shutdown_grace > Duration::from_secs(MAX_SHUTDOWN_GRACE_SECS) {
            return Err(ClicklinkerError::configuration(format!(
                "click pipeline shutdown grace must be at most {}s, got {:?}",
                MAX_SHUTDOWN_GRACE_SECS, config.shutdown_grace
            )));
        }
        let (recorder, receiver) = click_channel(config.capacity, config.policy)?;
        let workers = ClickWorkerPool::start(config.worker_count, receiver, repo)?;

        info!(
            "Click pipeline started: capacity={}, workers={}, policy={:?}",
            config.capacity, config.worker_count, config.policy
        );

        Ok(Self {
            recorder,
            workers,
            shutdown_grace: config.shutdown_grace,
        })
    }

    /// 生产端句柄，可克隆给任意数量的重定向处理器
    pub fn recorder(&self) -> ClickRecorder {
        self.recorder.clone()
    }

    pub fn stats(&self) -> Arc<ClickStats> {
        self.recorder.stats()
    }

    /// 关闭生产端，等待 worker 在宽限期内排空队列
    pub async fn shutdown(self) -> DrainReport {
        self.recorder.close();
        self.workers.wait_for_drain(self.shutdown_grace).await
    }
}
