use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// 显式持有的后台任务，带取消令牌，关闭时被 join
pub struct SupervisedTask {
    name: &'static str,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl SupervisedTask {
    /// 用一个新的取消令牌启动任务，`make` 接收该令牌的克隆
    pub fn spawn<F, Fut>(name: &'static str, make: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let handle = tokio::spawn(make(token.clone()));
        debug!("Supervised task '{}' spawned", name);
        Self {
            name,
            token,
            handle,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// 取消并等待任务退出；超时后中止任务
    ///
    /// 返回 `true` 表示任务在超时前正常退出。
    pub async fn shutdown(self, timeout: Duration) -> bool {
        self.token.cancel();
        let abort = self.handle.abort_handle();
        match tokio::time::timeout(timeout, self.handle).await {
            Ok(Ok(())) => {
                debug!("Supervised task '{}' stopped", self.name);
                true
            }
            Ok(Err(e)) => {
                warn!("Supervised task '{}' ended abnormally: {}", self.name, e);
                false
            }
            Err(_) => {
                warn!(
                    "Supervised task '{}' did not stop within {:?}, aborting",
                    self.name, timeout
                );
                abort.abort();
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_stops_cooperative_task() {
        let task = SupervisedTask::spawn("cooperative", |token| async move {
            token.cancelled().await;
        });
        assert_eq!(task.name(), "cooperative");
        assert!(!task.is_finished());
        assert!(task.shutdown(Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn test_unresponsive_task_times_out() {
        let task = SupervisedTask::spawn("stubborn", |_token| async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });
        assert!(!task.shutdown(Duration::from_millis(20)).await);
    }
}
