//! 短码生成
//!
//! 每个字符独立、均匀地从 62 个字符中抽取，随机源必须是密码学安全的。
//! 随机源不可用时直接返回 `Entropy` 错误，不会退化到弱随机数。

use std::sync::Arc;

use rand::TryRngCore;
use rand::rngs::OsRng;

use crate::errors::{ClicklinkerError, Result};

/// 短码字符集：小写字母 + 大写字母 + 数字
pub const SHORT_CODE_ALPHABET: &[u8; 62] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// 密码学安全的随机整数来源
pub trait EntropySource: Send + Sync {
    /// 返回 `[0, bound)` 内均匀分布的整数，`bound` 必须大于 0
    fn next_below(&self, bound: u32) -> Result<u32>;
}

/// 基于操作系统随机源的实现
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn next_below(&self, bound: u32) -> Result<u32> {
        if bound == 0 {
            return Err(ClicklinkerError::validation("entropy bound must be > 0"));
        }
        // 拒绝采样，消除取模偏差
        let zone = u32::MAX - (u32::MAX % bound);
        loop {
            let value = OsRng
                .try_next_u32()
                .map_err(|e| ClicklinkerError::entropy(format!("OS random source failed: {}", e)))?;
            if value < zone {
                return Ok(value % bound);
            }
        }
    }
}

/// 短码生成器
#[derive(Clone)]
pub struct ShortCodeGenerator {
    entropy: Arc<dyn EntropySource>,
}

impl Default for ShortCodeGenerator {
    fn default() -> Self {
        Self::new(Arc::new(OsEntropy))
    }
}

impl ShortCodeGenerator {
    pub fn new(entropy: Arc<dyn EntropySource>) -> Self {
        Self { entropy }
    }

    /// 生成长度为 `length` 的短码
    pub fn generate(&self, length: usize) -> Result<String> {
        if length == 0 {
            return Err(ClicklinkerError::validation(
                "short code length must be at least 1",
            ));
        }

        let bound = SHORT_CODE_ALPHABET.len() as u32;
        let mut code = String::with_capacity(length);
        for _ in 0..length {
            let index = self.entropy.next_below(bound)?;
            let symbol = SHORT_CODE_ALPHABET.get(index as usize).ok_or_else(|| {
                ClicklinkerError::entropy(format!(
                    "entropy source returned {} for bound {}",
                    index, bound
                ))
            })?;
            code.push(*symbol as char);
        }
        Ok(code)
    }
}

/// 判断字符串是否完全由短码字符集组成
pub fn is_short_code_alphabet(code: &str) -> bool {
    !code.is_empty() && code.bytes().all(|b| SHORT_CODE_ALPHABET.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FailingEntropy;

    impl EntropySource for FailingEntropy {
        fn next_below(&self, _bound: u32) -> Result<u32> {
            Err(ClicklinkerError::entropy("source unavailable"))
        }
    }

    /// 依次返回 0, 1, 2, ...
    struct SequenceEntropy(AtomicU32);

    impl EntropySource for SequenceEntropy {
        fn next_below(&self, bound: u32) -> Result<u32> {
            Ok(self.0.fetch_add(1, Ordering::Relaxed) % bound)
        }
    }

    /// 无视上界，总是返回越界值
    struct OutOfRangeEntropy;

    impl EntropySource for OutOfRangeEntropy {
        fn next_below(&self, bound: u32) -> Result<u32> {
            Ok(bound)
        }
    }

    #[test]
    fn test_out_of_range_entropy_is_an_error() {
        let generator = ShortCodeGenerator::new(Arc::new(OutOfRangeEntropy));
        assert!(matches!(
            generator.generate(6),
            Err(ClicklinkerError::Entropy(_))
        ));
    }

    #[test]
    fn test_alphabet_has_62_unique_symbols() {
        let unique: HashSet<u8> = SHORT_CODE_ALPHABET.iter().copied().collect();
        assert_eq!(unique.len(), 62);
    }

    #[test]
    fn test_generate_length_and_alphabet() {
        let generator = ShortCodeGenerator::default();
        for length in [1, 6, 10] {
            let code = generator.generate(length).unwrap();
            assert_eq!(code.len(), length);
            assert!(is_short_code_alphabet(&code), "bad code: {}", code);
        }
    }

    #[test]
    fn test_zero_length_rejected() {
        let generator = ShortCodeGenerator::default();
        assert!(matches!(
            generator.generate(0),
            Err(ClicklinkerError::Validation(_))
        ));
    }

    #[test]
    fn test_entropy_failure_is_surfaced() {
        let generator = ShortCodeGenerator::new(Arc::new(FailingEntropy));
        assert!(matches!(
            generator.generate(6),
            Err(ClicklinkerError::Entropy(_))
        ));
    }

    #[test]
    fn test_indices_map_to_alphabet() {
        let generator = ShortCodeGenerator::new(Arc::new(SequenceEntropy(AtomicU32::new(0))));
        assert_eq!(generator.generate(3).unwrap(), "abc");
        let generator = ShortCodeGenerator::new(Arc::new(SequenceEntropy(AtomicU32::new(61))));
        assert_eq!(generator.generate(2).unwrap(), "9a");
    }

    #[test]
    fn test_os_entropy_stays_below_bound() {
        let entropy = OsEntropy;
        for _ in 0..1000 {
            assert!(entropy.next_below(62).unwrap() < 62);
        }
        assert!(entropy.next_below(0).is_err());
    }

    #[test]
    fn test_os_entropy_covers_alphabet() {
        // 6200 次抽样下任一字符缺失的概率可忽略
        let entropy = OsEntropy;
        let seen: HashSet<u32> = (0..6200).map(|_| entropy.next_below(62).unwrap()).collect();
        assert_eq!(seen.len(), 62);
    }
}
