//! JSON 文件存储
//!
//! 整个数据集保存在一个 JSON 快照中，每次写操作后落盘（先写临时文件再 rename）。
//! 每个操作先取得 `<file>.lock` 上的跨进程排他锁，再从磁盘重新加载快照，
//! 因此多个进程共用同一文件时，短码唯一性和点击引用完整性仍在锁内检查。

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::errors::{ClicklinkerError, Result};
use crate::storage::{
    Click, ClickRepository, Link, LinkId, LinkRepository, LookupResult, NewLink, Storage,
};

/// 磁盘上的快照格式
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    next_link_id: u64,
    next_click_id: u64,
    links: Vec<Link>,
    clicks: Vec<Click>,
}

#[derive(Default)]
struct FileState {
    next_link_id: u64,
    next_click_id: u64,
    links: HashMap<String, Link>,
    link_ids: HashSet<LinkId>,
    clicks: Vec<Click>,
}

impl FileState {
    fn from_snapshot(snapshot: Snapshot) -> Self {
        let link_ids = snapshot.links.iter().map(|link| link.id).collect();
        let links = snapshot
            .links
            .into_iter()
            .map(|link| (link.short_code.clone(), link))
            .collect();
        Self {
            next_link_id: snapshot.next_link_id.max(1),
            next_click_id: snapshot.next_click_id.max(1),
            links,
            link_ids,
            clicks: snapshot.clicks,
        }
    }

    fn empty() -> Self {
        Self {
            next_link_id: 1,
            next_click_id: 1,
            ..Default::default()
        }
    }

    fn to_snapshot(&self) -> Snapshot {
        let mut links: Vec<Link> = self.links.values().cloned().collect();
        links.sort_by_key(|link| link.id);
        Snapshot {
            next_link_id: self.next_link_id,
            next_click_id: self.next_click_id,
            links,
            clicks: self.clicks.clone(),
        }
    }
}

pub struct FileStorage {
    file_path: PathBuf,
    lock_path: PathBuf,
    state: Mutex<FileState>,
}

impl FileStorage {
    /// 打开（或初始化）存储文件
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file_path = path.as_ref().to_path_buf();
        let lock_path = sibling_path(&file_path, ".lock");
        let _lock = lock_exclusive(&lock_path).await?;

        let state = match Self::read_state(&file_path).await? {
            Some(state) => {
                info!(
                    "Loaded {} links and {} clicks from {}",
                    state.links.len(),
                    state.clicks.len(),
                    file_path.display()
                );
                state
            }
            None => {
                info!(
                    "Storage file not found, creating empty storage: {}",
                    file_path.display()
                );
                let state = FileState::empty();
                Self::write_snapshot(&file_path, &state.to_snapshot()).await?;
                state
            }
        };

        Ok(Self {
            file_path,
            lock_path,
            state: Mutex::new(state),
        })
    }

    /// 读取磁盘快照，文件不存在时返回 `None`
    async fn read_state(path: &Path) -> Result<Option<FileState>> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                let snapshot: Snapshot = serde_json::from_str(&content).map_err(|e| {
                    error!("Failed to parse storage file {}: {}", path.display(), e);
                    ClicklinkerError::serialization(format!(
                        "Failed to parse storage file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                Ok(Some(FileState::from_snapshot(snapshot)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ClicklinkerError::file_operation(format!(
                "Failed to read storage file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// 取得跨进程锁并用磁盘上的最新快照替换内存状态
    ///
    /// 返回的文件句柄即锁，drop 时释放。
    async fn sync_locked(&self, state: &mut FileState) -> Result<std::fs::File> {
        let lock = lock_exclusive(&self.lock_path).await?;
        *state = Self::read_state(&self.file_path)
            .await?
            .unwrap_or_else(FileState::empty);
        Ok(lock)
    }

    async fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
        let json = serde_json::to_string_pretty(snapshot)?;
        let tmp = sibling_path(path, ".tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn persist(&self, state: &FileState) -> Result<()> {
        Self::write_snapshot(&self.file_path, &state.to_snapshot())
            .await
            .map_err(|e| ClicklinkerError::persistence(format!("Failed to save storage: {}", e)))
    }
}

fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// 在 `path` 上取得排他的建议锁，阻塞等待其他持有者释放
async fn lock_exclusive(path: &Path) -> Result<std::fs::File> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        std::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .and_then(|file| file.lock().map(|()| file))
            .map_err(|e| {
                ClicklinkerError::file_operation(format!(
                    "Failed to lock storage file {}: {}",
                    path.display(),
                    e
                ))
            })
    })
    .await
    .map_err(|e| ClicklinkerError::file_operation(format!("Storage lock task failed: {}", e)))?
}

#[async_trait]
impl LinkRepository for FileStorage {
    async fn create_link(&self, new_link: NewLink) -> Result<Link> {
        let mut state = self.state.lock().await;
        let _lock = self.sync_locked(&mut state).await?;
        if state.links.contains_key(&new_link.short_code) {
            return Err(ClicklinkerError::duplicate_short_code(format!(
                "Short code '{}' already exists",
                new_link.short_code
            )));
        }

        let link = Link {
            id: state.next_link_id,
            short_code: new_link.short_code,
            long_url: new_link.long_url,
            created_at: new_link.created_at,
        };
        state.next_link_id += 1;
        state.link_ids.insert(link.id);
        state.links.insert(link.short_code.clone(), link.clone());

        if let Err(e) = self.persist(&state).await {
            // 未落盘则回滚，保证短码没有被占用
            state.links.remove(&link.short_code);
            state.link_ids.remove(&link.id);
            return Err(e);
        }

        debug!("FileStorage: created link '{}' ({})", link.short_code, link.id);
        Ok(link)
    }

    async fn get_link_by_short_code(&self, short_code: &str) -> LookupResult {
        let mut state = self.state.lock().await;
        let _lock = match self.sync_locked(&mut state).await {
            Ok(lock) => lock,
            Err(e) => return LookupResult::Error(e),
        };
        match state.links.get(short_code) {
            Some(link) => LookupResult::Found(link.clone()),
            None => LookupResult::NotFound,
        }
    }

    async fn get_all_links(&self) -> Result<Vec<Link>> {
        let mut state = self.state.lock().await;
        let _lock = self.sync_locked(&mut state).await?;
        Ok(state.to_snapshot().links)
    }

    async fn count_clicks_by_link_id(&self, link_id: LinkId) -> Result<u64> {
        let mut state = self.state.lock().await;
        let _lock = self.sync_locked(&mut state).await?;
        Ok(state.clicks.iter().filter(|c| c.link_id == link_id).count() as u64)
    }
}

#[async_trait]
impl ClickRepository for FileStorage {
    async fn create_click(&self, link_id: LinkId, timestamp: DateTime<Utc>) -> Result<()> {
        let mut state = self.state.lock().await;
        let _lock = self.sync_locked(&mut state).await?;
        if !state.link_ids.contains(&link_id) {
            return Err(ClicklinkerError::persistence(format!(
                "Click references unknown link id {}",
                link_id
            )));
        }

        let click = Click {
            id: state.next_click_id,
            link_id,
            timestamp,
        };
        state.next_click_id += 1;
        state.clicks.push(click);

        if let Err(e) = self.persist(&state).await {
            state.clicks.pop();
            return Err(e);
        }
        Ok(())
    }
}

impl Storage for FileStorage {
    fn backend_name(&self) -> &'static str {
        "file"
    }
}
