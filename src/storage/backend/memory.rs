use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::trace;

use crate::errors::{ClicklinkerError, Result};
use crate::storage::{
    Click, ClickRepository, Link, LinkId, LinkRepository, LookupResult, NewLink, Storage,
};

/// 进程内存储，适合测试和临时运行
///
/// 短码唯一性由 DashMap 的 entry API 保证（同一分片内原子）。
pub struct MemoryStorage {
    /// short_code -> Link
    links: DashMap<String, Link>,
    /// 已存在的 link id，用于点击记录的引用完整性校验
    link_ids: DashMap<LinkId, ()>,
    /// link_id -> 点击记录
    clicks: DashMap<LinkId, Vec<Click>>,
    next_link_id: AtomicU64,
    next_click_id: AtomicU64,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            links: DashMap::new(),
            link_ids: DashMap::new(),
            clicks: DashMap::new(),
            next_link_id: AtomicU64::new(1),
            next_click_id: AtomicU64::new(1),
        }
    }

    /// 获取某个链接的全部点击记录（按写入顺序）
    pub fn clicks_for(&self, link_id: LinkId) -> Vec<Click> {
        self.clicks
            .get(&link_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// 全部点击记录总数
    pub fn total_clicks(&self) -> usize {
        self.clicks.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}

#[async_trait]
impl LinkRepository for MemoryStorage {
    async fn create_link(&self, new_link: NewLink) -> Result<Link> {
        match self.links.entry(new_link.short_code.clone()) {
            Entry::Occupied(_) => Err(ClicklinkerError::duplicate_short_code(format!(
                "Short code '{}' already exists",
                new_link.short_code
            ))),
            Entry::Vacant(slot) => {
                let link = Link {
                    id: self.next_link_id.fetch_add(1, Ordering::Relaxed),
                    short_code: new_link.short_code,
                    long_url: new_link.long_url,
                    created_at: new_link.created_at,
                };
                self.link_ids.insert(link.id, ());
                slot.insert(link.clone());
                trace!("MemoryStorage: inserted link {} ({})", link.short_code, link.id);
                Ok(link)
            }
        }
    }

    async fn get_link_by_short_code(&self, short_code: &str) -> LookupResult {
        match self.links.get(short_code) {
            Some(entry) => LookupResult::Found(entry.value().clone()),
            None => LookupResult::NotFound,
        }
    }

    async fn get_all_links(&self) -> Result<Vec<Link>> {
        let mut links: Vec<Link> = self.links.iter().map(|e| e.value().clone()).collect();
        links.sort_by_key(|link| link.id);
        Ok(links)
    }

    async fn count_clicks_by_link_id(&self, link_id: LinkId) -> Result<u64> {
        Ok(self
            .clicks
            .get(&link_id)
            .map(|entry| entry.value().len() as u64)
            .unwrap_or(0))
    }
}

#[async_trait]
impl ClickRepository for MemoryStorage {
    async fn create_click(&self, link_id: LinkId, timestamp: DateTime<Utc>) -> Result<()> {
        if !self.link_ids.contains_key(&link_id) {
            return Err(ClicklinkerError::persistence(format!(
                "Click references unknown link id {}",
                link_id
            )));
        }
        let click = Click {
            id: self.next_click_id.fetch_add(1, Ordering::Relaxed),
            link_id,
            timestamp,
        };
        self.clicks.entry(link_id).or_default().push(click);
        Ok(())
    }
}

impl Storage for MemoryStorage {
    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
