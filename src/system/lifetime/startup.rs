use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::analytics::{ClickPipeline, ClickPipelineConfig};
use crate::config::{MonitorConfig, StaticConfig};
use crate::errors::{ClicklinkerError, Result};
use crate::services::{LinkService, LinkServiceConfig, LoggingProbe, RedirectService, UrlMonitor};
use crate::storage::{LinkRepository, Storage, StorageFactory};
use crate::system::lifetime::SupervisedTask;
use crate::utils::ShortCodeGenerator;

/// 服务器模式运行期间持有的全部组件
pub struct AppContext {
    pub storage: Arc<dyn Storage>,
    pub link_service: Arc<LinkService>,
    pub redirect_service: Arc<RedirectService>,
    pub pipeline: ClickPipeline,
    pub monitor: Option<SupervisedTask>,
}

/// 基于已创建的存储构造链接服务，CLI 子命令也走这里
pub fn build_link_service(config: &StaticConfig, storage: &Arc<dyn Storage>) -> LinkService {
    let repo: Arc<dyn LinkRepository> = storage.clone();
    LinkService::new(
        repo,
        ShortCodeGenerator::default(),
        LinkServiceConfig::from(&config.links),
    )
}

/// 准备服务器启动的上下文
/// 包括存储、点击采集管道和巡检任务
pub async fn prepare_server_startup(config: &StaticConfig) -> Result<AppContext> {
    config.validate()?;

    let storage = StorageFactory::create(&config.storage).await?;
    warn!("Using storage backend: {}", storage.backend_name());

    let pipeline = ClickPipeline::start(
        ClickPipelineConfig::from(&config.analytics),
        storage.clone(),
    )?;

    let link_repo: Arc<dyn LinkRepository> = storage.clone();
    let link_service = Arc::new(build_link_service(config, &storage));
    let redirect_service = Arc::new(RedirectService::new(
        Arc::clone(&link_repo),
        pipeline.recorder(),
    ));

    let monitor = spawn_monitor(&config.monitor, link_repo)?;

    info!("Server components initialized");
    Ok(AppContext {
        storage,
        link_service,
        redirect_service,
        pipeline,
        monitor,
    })
}

fn spawn_monitor(
    config: &MonitorConfig,
    repo: Arc<dyn LinkRepository>,
) -> Result<Option<SupervisedTask>> {
    if !config.enabled {
        warn!("Link monitor is disabled in configuration");
        return Ok(None);
    }

    let interval = monitor_interval(config)?;
    let monitor = UrlMonitor::new(repo, Arc::new(LoggingProbe), interval);
    Ok(Some(SupervisedTask::spawn("link-monitor", |token| {
        monitor.run(token)
    })))
}

fn monitor_interval(config: &MonitorConfig) -> Result<Duration> {
    config
        .interval_minutes
        .checked_mul(60)
        .map(Duration::from_secs)
        .ok_or_else(|| {
            ClicklinkerError::configuration(format!(
                "monitor.interval_minutes is out of range: {}",
                config.interval_minutes
            ))
        })
}
