use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ClicklinkerError;

pub type LinkId = u64;

/// 已持久化的短链接，创建后不可变
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub short_code: String,
    pub long_url: String,
    pub created_at: DateTime<Utc>,
}

/// 待插入的短链接（id 由存储层分配）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLink {
    pub short_code: String,
    pub long_url: String,
    pub created_at: DateTime<Utc>,
}

/// 已持久化的点击记录，只追加
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Click {
    pub id: u64,
    pub link_id: LinkId,
    pub timestamp: DateTime<Utc>,
}

/// 按短码查询的结果
///
/// `NotFound` 与 `Error` 分开建模，避免把存储故障误判为"短码可用"。
#[derive(Debug, Clone)]
pub enum LookupResult {
    Found(Link),
    NotFound,
    Error(ClicklinkerError),
}
