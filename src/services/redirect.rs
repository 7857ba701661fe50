use std::sync::Arc;

use tracing::{debug, instrument, trace};

use crate::analytics::{ClickEvent, ClickRecorder, EnqueueOutcome};
use crate::errors::{ClicklinkerError, Result};
use crate::storage::{Link, LinkRepository, LookupResult};
use crate::utils::validate_short_code_query;

/// 重定向解析：查找短码，成功时把点击事件交给采集管道
pub struct RedirectService {
    repo: Arc<dyn LinkRepository>,
    recorder: ClickRecorder,
}

impl RedirectService {
    pub fn new(repo: Arc<dyn LinkRepository>, recorder: ClickRecorder) -> Self {
        Self { repo, recorder }
    }

    /// 返回目标链接；点击入队失败只计数，不影响重定向结果
    #[instrument(skip(self))]
    pub async fn resolve(&self, short_code: &str) -> Result<Link> {
        validate_short_code_query(short_code)?;

        let link = match self.repo.get_link_by_short_code(short_code).await {
            LookupResult::Found(link) => link,
            LookupResult::NotFound => {
                debug!("Redirect link not found: {}", short_code);
                return Err(ClicklinkerError::not_found(format!(
                    "short code '{}' does not exist",
                    short_code
                )));
            }
            LookupResult::Error(e) => return Err(e),
        };

        match self.recorder.record(ClickEvent::for_link(&link)).await {
            EnqueueOutcome::Accepted => trace!("Click queued for {}", link.short_code),
            EnqueueOutcome::Dropped(reason) => debug!(
                "Click for {} not recorded ({})",
                link.short_code,
                reason.as_str()
            ),
        }

        Ok(link)
    }
}
