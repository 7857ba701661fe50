//! 有界点击事件队列
//!
//! 基于 flume 的 MPMC 有界通道：每个事件只会被一个 worker 取走。
//! 生产端句柄 [`ClickRecorder`] 可自由克隆，所有克隆共享同一个 Sender，
//! [`ClickRecorder::close`] 取走该 Sender 后通道关闭，worker 排空剩余事件后退出。

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, trace};

use super::{ClickEvent, ClickStats};
use crate::errors::{ClicklinkerError, Result};

/// 队列满时的处理策略，构造时确定，之后对所有生产者一致生效
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// 立即丢弃并计数（默认）
    #[default]
    Drop,
    /// 最多等待给定时长，仍无空位则丢弃并计数
    BlockWithTimeout(Duration),
}

/// 丢弃原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Full,
    Timeout,
    Closed,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::Full => "full",
            DropReason::Timeout => "timeout",
            DropReason::Closed => "closed",
        }
    }
}

/// 入队结果，永远不会作为错误返回给重定向调用方
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Accepted,
    Dropped(DropReason),
}

impl EnqueueOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, EnqueueOutcome::Accepted)
    }

    /// 转换为 `QueueOverflow` 错误，供需要显式失败的调用方使用
    pub fn into_result(self) -> Result<()> {
        match self {
            EnqueueOutcome::Accepted => Ok(()),
            EnqueueOutcome::Dropped(reason) => Err(ClicklinkerError::queue_overflow(format!(
                "click event dropped ({})",
                reason.as_str()
            ))),
        }
    }
}

/// 生产端句柄
#[derive(Clone)]
pub struct ClickRecorder {
    sender: Arc<RwLock<Option<flume::Sender<ClickEvent>>>>,
    policy: OverflowPolicy,
    capacity: usize,
    stats: Arc<ClickStats>,
}

/// 消费端句柄，交给 worker 池
#[derive(Clone)]
pub struct ClickReceiver {
    receiver: flume::Receiver<ClickEvent>,
    stats: Arc<ClickStats>,
}

/// 创建点击事件队列，容量为 0 视为配置错误
pub fn click_channel(
    capacity: usize,
    policy: OverflowPolicy,
) -> Result<(ClickRecorder, ClickReceiver)> {
    if capacity == 0 {
        return Err(ClicklinkerError::configuration(
            "click channel capacity must be greater than 0",
        ));
    }
    if let OverflowPolicy::BlockWithTimeout(timeout) = policy
        && timeout.is_zero()
    {
        return Err(ClicklinkerError::configuration(
            "block-with-timeout policy requires a non-zero timeout",
        ));
    }

    let (tx, rx) = flume::bounded(capacity);
    let stats = Arc::new(ClickStats::new());

    let recorder = ClickRecorder {
        sender: Arc::new(RwLock::new(Some(tx))),
        policy,
        capacity,
        stats: Arc::clone(&stats),
    };
    let receiver = ClickReceiver {
        receiver: rx,
        stats,
    };
    Ok((recorder, receiver))
}

impl ClickRecorder {
    /// 按策略入队
    ///
    /// `Drop` 策略下不会挂起；`BlockWithTimeout` 策略下最多挂起给定时长。
    pub async fn record(&self, event: ClickEvent) -> EnqueueOutcome {
        let outcome = match self.policy {
            OverflowPolicy::Drop => self.try_send(event),
            OverflowPolicy::BlockWithTimeout(timeout) => {
                self.send_with_timeout(event, timeout).await
            }
        };

        match outcome {
            EnqueueOutcome::Accepted => self.stats.record_enqueued(),
            EnqueueOutcome::Dropped(reason) => {
                self.stats.record_dropped(reason);
                debug!(
                    reason = reason.as_str(),
                    dropped_total = self.stats.dropped(),
                    "ClickRecorder: click event dropped"
                );
            }
        }
        outcome
    }

    fn try_send(&self, event: ClickEvent) -> EnqueueOutcome {
        let guard = self.sender.read();
        let Some(tx) = guard.as_ref() else {
            return EnqueueOutcome::Dropped(DropReason::Closed);
        };
        match tx.try_send(event) {
            Ok(()) => EnqueueOutcome::Accepted,
            Err(flume::TrySendError::Full(_)) => EnqueueOutcome::Dropped(DropReason::Full),
            Err(flume::TrySendError::Disconnected(_)) => {
                EnqueueOutcome::Dropped(DropReason::Closed)
            }
        }
    }

    async fn send_with_timeout(&self, event: ClickEvent, timeout: Duration) -> EnqueueOutcome {
        // 不能跨 await 持有读锁，克隆一个 Sender 出来
        let tx = match self.sender.read().as_ref() {
            Some(tx) => tx.clone(),
            None => return EnqueueOutcome::Dropped(DropReason::Closed),
        };

        // 有空位时直接入队，避免创建定时器
        let event = match tx.try_send(event) {
            Ok(()) => return EnqueueOutcome::Accepted,
            Err(flume::TrySendError::Disconnected(_)) => {
                return EnqueueOutcome::Dropped(DropReason::Closed);
            }
            Err(flume::TrySendError::Full(event)) => event,
        };

        trace!("ClickRecorder: channel full, waiting up to {:?}", timeout);
        match tokio::time::timeout(timeout, tx.send_async(event)).await {
            Ok(Ok(())) => EnqueueOutcome::Accepted,
            Ok(Err(_)) => EnqueueOutcome::Dropped(DropReason::Closed),
            Err(_) => EnqueueOutcome::Dropped(DropReason::Timeout),
        }
    }

    /// 关闭生产端，之后的入队都会以 `Closed` 丢弃
    ///
    /// 返回 `true` 表示本次调用完成了关闭。
    pub fn close(&self) -> bool {
        let closed = self.sender.write().take().is_some();
        if closed {
            debug!("ClickRecorder: producer side closed");
        }
        closed
    }

    pub fn is_closed(&self) -> bool {
        self.sender.read().is_none()
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> Arc<ClickStats> {
        Arc::clone(&self.stats)
    }
}

impl ClickReceiver {
    /// 取出一个事件；队列为空时挂起，通道关闭且排空后返回 `None`
    pub async fn recv(&self) -> Option<ClickEvent> {
        self.receiver.recv_async().await.ok()
    }

    /// 队列中待处理的事件数
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    pub fn stats(&self) -> Arc<ClickStats> {
        Arc::clone(&self.stats)
    }
}
