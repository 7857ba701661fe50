//! 长链接校验
//!
//! 在进入创建流程之前拒绝格式错误的 URL：只接受带主机名的 http / https 地址。

use url::Url;

use crate::errors::{ClicklinkerError, Result};

/// 长链接最大长度
pub const MAX_URL_LENGTH: usize = 2048;

pub fn validate_long_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ClicklinkerError::validation("URL cannot be empty"));
    }
    if trimmed.len() > MAX_URL_LENGTH {
        return Err(ClicklinkerError::validation(format!(
            "URL exceeds {} characters",
            MAX_URL_LENGTH
        )));
    }

    let parsed = Url::parse(trimmed)
        .map_err(|e| ClicklinkerError::validation(format!("Invalid URL format: {}", e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ClicklinkerError::validation(format!(
                "Unsupported scheme '{}', only http and https are allowed",
                other
            )));
        }
    }

    if parsed.host_str().is_none_or(|host| host.is_empty()) {
        return Err(ClicklinkerError::validation("URL must contain a host"));
    }

    Ok(parsed)
}

/// 校验用户传入的短码查询参数
pub fn validate_short_code_query(code: &str) -> Result<()> {
    if code.trim().is_empty() {
        return Err(ClicklinkerError::validation("short code cannot be empty"));
    }
    Ok(())
}
