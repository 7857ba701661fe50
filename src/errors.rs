use std::fmt;

#[derive(Debug, Clone)]
pub enum ClicklinkerError {
    Validation(String),
    Entropy(String),
    ExhaustedRetries(String),
    Persistence(String),
    NotFound(String),
    DuplicateShortCode(String),
    QueueOverflow(String),
    Configuration(String),
    FileOperation(String),
    Serialization(String),
}

impl ClicklinkerError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            ClicklinkerError::Validation(_) => "E001",
            ClicklinkerError::Entropy(_) => "E002",
            ClicklinkerError::ExhaustedRetries(_) => "E003",
            ClicklinkerError::Persistence(_) => "E004",
            ClicklinkerError::NotFound(_) => "E005",
            ClicklinkerError::DuplicateShortCode(_) => "E006",
            ClicklinkerError::QueueOverflow(_) => "E007",
            ClicklinkerError::Configuration(_) => "E008",
            ClicklinkerError::FileOperation(_) => "E009",
            ClicklinkerError::Serialization(_) => "E010",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            ClicklinkerError::Validation(_) => "Validation Error",
            ClicklinkerError::Entropy(_) => "Entropy Source Error",
            ClicklinkerError::ExhaustedRetries(_) => "Short Code Retries Exhausted",
            ClicklinkerError::Persistence(_) => "Persistence Error",
            ClicklinkerError::NotFound(_) => "Resource Not Found",
            ClicklinkerError::DuplicateShortCode(_) => "Duplicate Short Code",
            ClicklinkerError::QueueOverflow(_) => "Click Queue Overflow",
            ClicklinkerError::Configuration(_) => "Configuration Error",
            ClicklinkerError::FileOperation(_) => "File Operation Error",
            ClicklinkerError::Serialization(_) => "Serialization Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            ClicklinkerError::Validation(msg) => msg,
            ClicklinkerError::Entropy(msg) => msg,
            ClicklinkerError::ExhaustedRetries(msg) => msg,
            ClicklinkerError::Persistence(msg) => msg,
            ClicklinkerError::NotFound(msg) => msg,
            ClicklinkerError::DuplicateShortCode(msg) => msg,
            ClicklinkerError::QueueOverflow(msg) => msg,
            ClicklinkerError::Configuration(msg) => msg,
            ClicklinkerError::FileOperation(msg) => msg,
            ClicklinkerError::Serialization(msg) => msg,
        }
    }

    /// 格式化为彩色输出（用于 Server 模式）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出（用于 CLI 模式）
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for ClicklinkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for ClicklinkerError {}

// 便捷的构造函数
impl ClicklinkerError {
    pub fn validation<T: Into<String>>(msg: T) -> Self {
        ClicklinkerError::Validation(msg.into())
    }

    pub fn entropy<T: Into<String>>(msg: T) -> Self {
        ClicklinkerError::Entropy(msg.into())
    }

    pub fn exhausted_retries<T: Into<String>>(msg: T) -> Self {
        ClicklinkerError::ExhaustedRetries(msg.into())
    }

    pub fn persistence<T: Into<String>>(msg: T) -> Self {
        ClicklinkerError::Persistence(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        ClicklinkerError::NotFound(msg.into())
    }

    pub fn duplicate_short_code<T: Into<String>>(msg: T) -> Self {
        ClicklinkerError::DuplicateShortCode(msg.into())
    }

    pub fn queue_overflow<T: Into<String>>(msg: T) -> Self {
        ClicklinkerError::QueueOverflow(msg.into())
    }

    pub fn configuration<T: Into<String>>(msg: T) -> Self {
        ClicklinkerError::Configuration(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        ClicklinkerError::FileOperation(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        ClicklinkerError::Serialization(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<std::io::Error> for ClicklinkerError {
    fn from(err: std::io::Error) -> Self {
        ClicklinkerError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for ClicklinkerError {
    fn from(err: serde_json::Error) -> Self {
        ClicklinkerError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for ClicklinkerError {
    fn from(err: config::ConfigError) -> Self {
        ClicklinkerError::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClicklinkerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_unique() {
        let errors = [
            ClicklinkerError::validation("a"),
            ClicklinkerError::entropy("a"),
            ClicklinkerError::exhausted_retries("a"),
            ClicklinkerError::persistence("a"),
            ClicklinkerError::not_found("a"),
            ClicklinkerError::duplicate_short_code("a"),
            ClicklinkerError::queue_overflow("a"),
            ClicklinkerError::configuration("a"),
            ClicklinkerError::file_operation("a"),
            ClicklinkerError::serialization("a"),
        ];
        let mut codes: Vec<&str> = errors.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_format_simple() {
        let err = ClicklinkerError::not_found("Link 'abc123' not found");
        assert_eq!(
            err.format_simple(),
            "Resource Not Found: Link 'abc123' not found"
        );
        assert_eq!(err.to_string(), err.format_simple());
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ClicklinkerError = io.into();
        assert!(matches!(err, ClicklinkerError::FileOperation(_)));
    }
}
