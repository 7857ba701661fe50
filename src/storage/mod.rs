//! Persistence ports and the bundled backends.
//!
//! The core only talks to [`LinkRepository`] and [`ClickRepository`]. Both
//! backends shipped here (`memory`, `file`) enforce short-code uniqueness on
//! insert and report violations as `DuplicateShortCode`, which the creation
//! algorithm treats as a retriable collision.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::Result;

pub mod backend;
pub mod models;

pub use backend::{FileStorage, MemoryStorage};
pub use models::{Click, Link, LinkId, LookupResult, NewLink};

/// 链接持久化接口
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// 插入新链接；短码已存在时返回 `DuplicateShortCode`
    async fn create_link(&self, new_link: NewLink) -> Result<Link>;

    async fn get_link_by_short_code(&self, short_code: &str) -> LookupResult;

    /// 供巡检任务使用
    async fn get_all_links(&self) -> Result<Vec<Link>>;

    async fn count_clicks_by_link_id(&self, link_id: LinkId) -> Result<u64>;
}

/// 点击记录持久化接口，需支持多个 worker 并发调用
#[async_trait]
pub trait ClickRepository: Send + Sync {
    async fn create_click(&self, link_id: LinkId, timestamp: DateTime<Utc>) -> Result<()>;
}

/// 同时实现两个接口的存储后端
pub trait Storage: LinkRepository + ClickRepository {
    fn backend_name(&self) -> &'static str;
}

pub struct StorageFactory;

impl StorageFactory {
    /// 根据配置创建存储后端；路径为 `:memory:` 时使用内存后端
    pub async fn create(config: &crate::config::StorageConfig) -> Result<Arc<dyn Storage>> {
        if config.file_path == ":memory:" {
            return Ok(Arc::new(MemoryStorage::new()));
        }
        let storage = FileStorage::open(&config.file_path).await?;
        Ok(Arc::new(storage))
    }
}
