use serde::{Deserialize, Serialize};

use crate::errors::{ClicklinkerError, Result};

/// 短码最大列宽（存储层约束）
pub const MAX_SHORT_CODE_LENGTH: usize = 10;

/// 关闭宽限期上限（秒）
pub const MAX_SHUTDOWN_GRACE_SECS: u64 = 3600;

/// 巡检间隔上限（分钟），一周
pub const MAX_MONITOR_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

/// 入队等待上限（毫秒）
pub const MAX_ENQUEUE_TIMEOUT_MS: u64 = 60_000;

/// 静态配置（从 TOML 加载，启动时使用）
///
/// 包含：
/// - server: 对外访问地址
/// - storage: 持久化文件路径
/// - links: 短码生成参数
/// - analytics: 点击采集管道参数
/// - monitor: 链接巡检参数
/// - logging: 日志配置
///
/// 配置只在启动时读取一次，然后以显式参数的形式传入各组件构造函数。
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub links: LinksConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config.toml > 默认值
    /// ENV 前缀：CL，分隔符：__
    /// 示例：CL__ANALYTICS__WORKER_COUNT=8
    pub fn load(path: &str) -> Result<Self> {
        use config::{Config, Environment, File};

        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("CL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config = settings.try_deserialize::<StaticConfig>()?;
        if std::path::Path::new(path).exists() {
            eprintln!("[INFO] Configuration loaded from: {}", path);
        }
        Ok(config)
    }

    /// 校验配置；任何错误都应在启动阶段终止进程
    pub fn validate(&self) -> Result<()> {
        if self.analytics.buffer_size == 0 {
            return Err(ClicklinkerError::configuration(
                "analytics.buffer_size must be greater than 0",
            ));
        }
        if self.analytics.worker_count == 0 {
            return Err(ClicklinkerError::configuration(
                "analytics.worker_count must be greater than 0",
            ));
        }
        if self.links.code_length == 0 || self.links.code_length > MAX_SHORT_CODE_LENGTH {
            return Err(ClicklinkerError::configuration(format!(
                "links.code_length must be between 1 and {}, got {}",
                MAX_SHORT_CODE_LENGTH, self.links.code_length
            )));
        }
        if self.links.max_retries == 0 {
            return Err(ClicklinkerError::configuration(
                "links.max_retries must be greater than 0",
            ));
        }
        if self.analytics.overflow_policy == OverflowPolicyKind::BlockWithTimeout
            && self.analytics.enqueue_timeout_ms == 0
        {
            return Err(ClicklinkerError::configuration(
                "analytics.enqueue_timeout_ms must be greater than 0 with block_with_timeout",
            ));
        }
        if self.analytics.enqueue_timeout_ms > MAX_ENQUEUE_TIMEOUT_MS {
            return Err(ClicklinkerError::configuration(format!(
                "analytics.enqueue_timeout_ms must be at most {}, got {}",
                MAX_ENQUEUE_TIMEOUT_MS, self.analytics.enqueue_timeout_ms
            )));
        }
        if self.analytics.shutdown_grace_secs > MAX_SHUTDOWN_GRACE_SECS {
            return Err(ClicklinkerError::configuration(format!(
                "analytics.shutdown_grace_secs must be at most {}, got {}",
                MAX_SHUTDOWN_GRACE_SECS, self.analytics.shutdown_grace_secs
            )));
        }
        if self.monitor.enabled
            && (self.monitor.interval_minutes == 0
                || self.monitor.interval_minutes > MAX_MONITOR_INTERVAL_MINUTES)
        {
            return Err(ClicklinkerError::configuration(format!(
                "monitor.interval_minutes must be between 1 and {}, got {}",
                MAX_MONITOR_INTERVAL_MINUTES, self.monitor.interval_minutes
            )));
        }
        Ok(())
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ClicklinkerError::serialization(e.to_string()))?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// 服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 拼接完整短链接时使用的前缀
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

/// 持久化配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_file")]
    pub file_path: String,
}

/// 短码生成配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinksConfig {
    #[serde(default = "default_code_length")]
    pub code_length: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

/// 队列满时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicyKind {
    /// 立即丢弃并计数
    #[default]
    Drop,
    /// 最多等待 enqueue_timeout_ms，超时丢弃并计数
    BlockWithTimeout,
}

/// 点击采集管道配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default)]
    pub overflow_policy: OverflowPolicyKind,
    #[serde(default = "default_enqueue_timeout_ms")]
    pub enqueue_timeout_ms: u64,
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

/// 链接巡检配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_monitor_enabled")]
    pub enabled: bool,
    #[serde(default = "default_monitor_interval")]
    pub interval_minutes: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

// ============================================================
// Default value functions
// ============================================================

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_storage_file() -> String {
    "clicklinker.json".to_string()
}

fn default_code_length() -> usize {
    6
}

fn default_max_retries() -> u32 {
    5
}

fn default_buffer_size() -> usize {
    100
}

fn default_worker_count() -> usize {
    5
}

fn default_enqueue_timeout_ms() -> u64 {
    50
}

fn default_shutdown_grace_secs() -> u64 {
    5
}

fn default_monitor_enabled() -> bool {
    true
}

fn default_monitor_interval() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            file_path: default_storage_file(),
        }
    }
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            code_length: default_code_length(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            worker_count: default_worker_count(),
            overflow_policy: OverflowPolicyKind::default(),
            enqueue_timeout_ms: default_enqueue_timeout_ms(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: default_monitor_enabled(),
            interval_minutes: default_monitor_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}
