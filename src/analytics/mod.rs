//! 点击事件采集管道
//!
//! 重定向路径通过 [`ClickRecorder`] 把 [`ClickEvent`] 放入有界队列，
//! [`ClickWorkerPool`] 中固定数量的 worker 从队列取出事件并写入点击记录。
//! 队列满时按 [`OverflowPolicy`] 处理，被丢弃的事件计入溢出计数器。

pub mod channel;
pub mod pipeline;
pub mod stats;
pub mod worker;

pub use channel::{
    ClickReceiver, ClickRecorder, DropReason, EnqueueOutcome, OverflowPolicy, click_channel,
};
pub use pipeline::{ClickPipeline, ClickPipelineConfig};
pub use stats::{ClickStats, ClickStatsSnapshot};
pub use worker::{ClickWorkerPool, DrainReport};

use chrono::{DateTime, Utc};

use crate::storage::{Link, LinkId};

/// 一次成功重定向的观测，仅存在于队列和 worker 之间
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickEvent {
    pub link_id: LinkId,
    pub short_code: String,
    pub occurred_at: DateTime<Utc>,
}

impl ClickEvent {
    pub fn new(link_id: LinkId, short_code: impl Into<String>) -> Self {
        Self {
            link_id,
            short_code: short_code.into(),
            occurred_at: Utc::now(),
        }
    }

    pub fn for_link(link: &Link) -> Self {
        Self::new(link.id, link.short_code.clone())
    }
}
