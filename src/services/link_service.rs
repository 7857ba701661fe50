//! Link management service
//!
//! Creation resolves short-code uniqueness with a bounded check-then-insert
//! loop; the stats read path combines a lookup with a click count.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::config::LinksConfig;
use crate::errors::{ClicklinkerError, Result};
use crate::storage::{Link, LinkRepository, LookupResult, NewLink};
use crate::utils::{ShortCodeGenerator, validate_long_url, validate_short_code_query};

/// 创建算法参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkServiceConfig {
    pub code_length: usize,
    pub max_retries: u32,
}

impl Default for LinkServiceConfig {
    fn default() -> Self {
        Self::from(&LinksConfig::default())
    }
}

impl From<&LinksConfig> for LinkServiceConfig {
    fn from(config: &LinksConfig) -> Self {
        Self {
            code_length: config.code_length,
            max_retries: config.max_retries,
        }
    }
}

/// 链接及其点击总数
#[derive(Debug, Clone, PartialEq)]
pub struct LinkStats {
    pub link: Link,
    pub total_clicks: u64,
}

pub struct LinkService {
    repo: Arc<dyn LinkRepository>,
    generator: ShortCodeGenerator,
    config: LinkServiceConfig,
}

impl LinkService {
    pub fn new(
        repo: Arc<dyn LinkRepository>,
        generator: ShortCodeGenerator,
        config: LinkServiceConfig,
    ) -> Self {
        Self {
            repo,
            generator,
            config,
        }
    }

    pub fn config(&self) -> LinkServiceConfig {
        self.config
    }

    /// 为长链接生成唯一短码并持久化
    ///
    /// 每次尝试先查询候选短码是否已存在，未占用才插入。查询失败立即返回
    /// `Persistence`，不做重试；插入时遇到唯一约束冲突视为碰撞，进入下一次尝试。
    /// 全部尝试用完返回 `ExhaustedRetries`。
    ///
    /// 保存的是去掉首尾空白后的原始输入，不做 URL 规范化。
    pub async fn create_link(&self, long_url: &str) -> Result<Link> {
        validate_long_url(long_url)?;
        let long_url = long_url.trim();

        for attempt in 1..=self.config.max_retries {
            let candidate = self.generator.generate(self.config.code_length)?;

            match self.repo.get_link_by_short_code(&candidate).await {
                LookupResult::NotFound => {}
                LookupResult::Found(_) => {
                    warn!(
                        "Short code collision on '{}' (attempt {}/{})",
                        candidate, attempt, self.config.max_retries
                    );
                    continue;
                }
                LookupResult::Error(e) => {
                    error!("Existence check failed for '{}': {}", candidate, e);
                    return Err(ClicklinkerError::persistence(format!(
                        "existence check failed: {}",
                        e.message()
                    )));
                }
            }

            let new_link = NewLink {
                short_code: candidate.clone(),
                long_url: long_url.to_string(),
                created_at: Utc::now(),
            };

            match self.repo.create_link(new_link).await {
                Ok(link) => {
                    info!("Link created: {} -> {}", link.short_code, link.long_url);
                    return Ok(link);
                }
                Err(ClicklinkerError::DuplicateShortCode(_)) => {
                    warn!(
                        "Short code '{}' was taken concurrently (attempt {}/{})",
                        candidate, attempt, self.config.max_retries
                    );
                }
                Err(ClicklinkerError::Persistence(msg)) => {
                    return Err(ClicklinkerError::Persistence(msg));
                }
                Err(e) => {
                    return Err(ClicklinkerError::persistence(format!(
                        "failed to store link: {}",
                        e.message()
                    )));
                }
            }
        }

        error!(
            "Could not find a free short code after {} attempts",
            self.config.max_retries
        );
        Err(ClicklinkerError::exhausted_retries(format!(
            "no unique short code found after {} attempts",
            self.config.max_retries
        )))
    }

    pub async fn get_link_by_short_code(&self, short_code: &str) -> Result<Link> {
        validate_short_code_query(short_code)?;
        match self.repo.get_link_by_short_code(short_code).await {
            LookupResult::Found(link) => Ok(link),
            LookupResult::NotFound => Err(ClicklinkerError::not_found(format!(
                "short code '{}' does not exist",
                short_code
            ))),
            LookupResult::Error(e) => Err(e),
        }
    }

    /// 查询链接及其点击总数，结果可能略落后于仍在队列中的点击
    pub async fn get_link_stats(&self, short_code: &str) -> Result<LinkStats> {
        let link = self.get_link_by_short_code(short_code).await?;
        let total_clicks = self.repo.count_clicks_by_link_id(link.id).await?;
        debug!("Stats for '{}': {} clicks", link.short_code, total_clicks);
        Ok(LinkStats { link, total_clicks })
    }
}

/// 根据 base_url 拼出完整短链接
pub fn full_short_url(base_url: &str, short_code: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), short_code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LinkId;
    use crate::utils::{EntropySource, is_short_code_alphabet};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 每次查询都返回固定结果，并统计调用次数
    struct ScriptedRepo {
        lookup: fn() -> LookupResult,
        insert_duplicate: bool,
        lookups: AtomicUsize,
        inserts: AtomicUsize,
    }

    impl ScriptedRepo {
        fn new(lookup: fn() -> LookupResult) -> Self {
            Self {
                lookup,
                insert_duplicate: false,
                lookups: AtomicUsize::new(0),
                inserts: AtomicUsize::new(0),
            }
        }
    }

    fn existing_link() -> Link {
        Link {
            id: 1,
            short_code: "taken".to_string(),
            long_url: "https://example.com/".to_string(),
            created_at: Utc::now(),
        }
    }

    #[async_trait]
    impl LinkRepository for ScriptedRepo {
        async fn create_link(&self, new_link: NewLink) -> Result<Link> {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            if self.insert_duplicate {
                return Err(ClicklinkerError::duplicate_short_code(new_link.short_code));
            }
            Ok(Link {
                id: 42,
                short_code: new_link.short_code,
                long_url: new_link.long_url,
                created_at: new_link.created_at,
            })
        }

        async fn get_link_by_short_code(&self, _short_code: &str) -> LookupResult {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            (self.lookup)()
        }

        async fn get_all_links(&self) -> Result<Vec<Link>> {
            Ok(Vec::new())
        }

        async fn count_clicks_by_link_id(&self, _link_id: LinkId) -> Result<u64> {
            Ok(7)
        }
    }

    struct BrokenEntropy;

    impl EntropySource for BrokenEntropy {
        fn next_below(&self, _bound: u32) -> Result<u32> {
            Err(ClicklinkerError::entropy("no entropy"))
        }
    }

    fn service(repo: Arc<ScriptedRepo>, max_retries: u32) -> LinkService {
        LinkService::new(
            repo,
            ShortCodeGenerator::default(),
            LinkServiceConfig {
                code_length: 6,
                max_retries,
            },
        )
    }

    #[tokio::test]
    async fn test_create_link_stores_url_as_given() {
        let repo = Arc::new(ScriptedRepo::new(|| LookupResult::NotFound));
        let link = service(repo, 5)
            .create_link("  HTTPS://Example.COM  ")
            .await
            .unwrap();
        assert_eq!(link.long_url, "HTTPS://Example.COM");
    }

    #[tokio::test]
    async fn test_create_link_generates_valid_code() {
        let repo = Arc::new(ScriptedRepo::new(|| LookupResult::NotFound));
        let link = service(repo.clone(), 5)
            .create_link("https://example.com/page")
            .await
            .unwrap();

        assert_eq!(link.short_code.len(), 6);
        assert!(is_short_code_alphabet(&link.short_code));
        assert_eq!(link.long_url, "https://example.com/page");
        assert_eq!(repo.lookups.load(Ordering::SeqCst), 1);
        assert_eq!(repo.inserts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausts_after_exact_retry_bound() {
        let repo = Arc::new(ScriptedRepo::new(|| LookupResult::Found(existing_link())));
        let err = service(repo.clone(), 5)
            .create_link("https://example.com")
            .await
            .unwrap_err();

        assert!(matches!(err, ClicklinkerError::ExhaustedRetries(_)));
        assert_eq!(repo.lookups.load(Ordering::SeqCst), 5);
        assert_eq!(repo.inserts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_lookup_error_is_not_retried() {
        let repo = Arc::new(ScriptedRepo::new(|| {
            LookupResult::Error(ClicklinkerError::persistence("connection reset"))
        }));
        let err = service(repo.clone(), 5)
            .create_link("https://example.com")
            .await
            .unwrap_err();

        assert!(matches!(err, ClicklinkerError::Persistence(_)));
        assert_eq!(repo.lookups.load(Ordering::SeqCst), 1);
        assert_eq!(repo.inserts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_duplicate_on_insert_is_retried() {
        let mut repo = ScriptedRepo::new(|| LookupResult::NotFound);
        repo.insert_duplicate = true;
        let repo = Arc::new(repo);
        let err = service(repo.clone(), 3)
            .create_link("https://example.com")
            .await
            .unwrap_err();

        assert!(matches!(err, ClicklinkerError::ExhaustedRetries(_)));
        assert_eq!(repo.inserts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_invalid_url_rejected_before_lookup() {
        let repo = Arc::new(ScriptedRepo::new(|| LookupResult::NotFound));
        let err = service(repo.clone(), 5)
            .create_link("ftp://example.com")
            .await
            .unwrap_err();

        assert!(matches!(err, ClicklinkerError::Validation(_)));
        assert_eq!(repo.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_entropy_failure_surfaces() {
        let repo = Arc::new(ScriptedRepo::new(|| LookupResult::NotFound));
        let svc = LinkService::new(
            repo.clone(),
            ShortCodeGenerator::new(Arc::new(BrokenEntropy)),
            LinkServiceConfig::default(),
        );
        let err = svc.create_link("https://example.com").await.unwrap_err();
        assert!(matches!(err, ClicklinkerError::Entropy(_)));
        assert_eq!(repo.inserts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stats_not_found() {
        let repo = Arc::new(ScriptedRepo::new(|| LookupResult::NotFound));
        let err = service(repo, 5).get_link_stats("nope").await.unwrap_err();
        assert!(matches!(err, ClicklinkerError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_stats_combines_link_and_count() {
        let repo = Arc::new(ScriptedRepo::new(|| LookupResult::Found(existing_link())));
        let stats = service(repo, 5).get_link_stats("taken").await.unwrap();
        assert_eq!(stats.link.short_code, "taken");
        assert_eq!(stats.total_clicks, 7);
    }

    #[test]
    fn test_full_short_url() {
        assert_eq!(
            full_short_url("http://localhost:8080/", "abc123"),
            "http://localhost:8080/abc123"
        );
        assert_eq!(full_short_url("https://s.io", "x"), "https://s.io/x");
    }
}
