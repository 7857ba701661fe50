//! 链接巡检
//!
//! 按固定间隔读取全部链接交给 [`LinkProbe`]。探测逻辑本身可替换，
//! 默认实现只记录链接数量。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::storage::{Link, LinkRepository};

#[async_trait]
pub trait LinkProbe: Send + Sync {
    async fn probe(&self, links: &[Link]) -> anyhow::Result<()>;
}

/// 默认探测器：只输出日志
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingProbe;

#[async_trait]
impl LinkProbe for LoggingProbe {
    async fn probe(&self, links: &[Link]) -> anyhow::Result<()> {
        info!("Link monitor: {} links registered", links.len());
        for link in links {
            debug!("Link monitor: {} -> {}", link.short_code, link.long_url);
        }
        Ok(())
    }
}

pub struct UrlMonitor {
    repo: Arc<dyn LinkRepository>,
    probe: Arc<dyn LinkProbe>,
    interval: Duration,
}

impl UrlMonitor {
    pub fn new(
        repo: Arc<dyn LinkRepository>,
        probe: Arc<dyn LinkProbe>,
        interval: Duration,
    ) -> Self {
        Self {
            repo,
            probe,
            interval,
        }
    }

    /// 执行一次巡检，返回本次检查的链接数
    pub async fn check_once(&self) -> anyhow::Result<usize> {
        let links = self.repo.get_all_links().await?;
        self.probe.probe(&links).await?;
        Ok(links.len())
    }

    /// 周期运行直到 token 被取消；单次失败只记录日志
    pub async fn run(self, token: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Link monitor started, interval {:?}", self.interval);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.check_once().await {
                        warn!("Link monitor check failed: {:#}", e);
                    }
                }
            }
        }
        info!("Link monitor stopped");
    }
}
