pub mod short_code;
pub mod url_validator;

pub use short_code::{
    EntropySource, OsEntropy, SHORT_CODE_ALPHABET, ShortCodeGenerator, is_short_code_alphabet,
};
pub use url_validator::{validate_long_url, validate_short_code_query};
