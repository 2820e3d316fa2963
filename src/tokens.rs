//! Token estimates for the generated document.
//!
//! Uses tiktoken-rs when the encoding tables load, otherwise a
//! four-characters-per-token estimate.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use tiktoken_rs::CoreBPE;

/// Token encoding to count with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// cl100k_base: GPT-4, GPT-3.5-turbo
    #[default]
    Cl100kBase,
    /// o200k_base: GPT-4o
    O200kBase,
}

impl Encoding {
    pub fn name(self) -> &'static str {
        match self {
            Encoding::Cl100kBase => "cl100k_base",
            Encoding::O200kBase => "o200k_base",
        }
    }

    fn bpe(self) -> Option<&'static CoreBPE> {
        static CL100K: OnceLock<Option<CoreBPE>> = OnceLock::new();
        static O200K: OnceLock<Option<CoreBPE>> = OnceLock::new();

        match self {
            Encoding::Cl100kBase => CL100K.get_or_init(|| tiktoken_rs::cl100k_base().ok()),
            Encoding::O200kBase => O200K.get_or_init(|| tiktoken_rs::o200k_base().ok()),
        }
        .as_ref()
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cl100k" | "cl100k_base" => Ok(Encoding::Cl100kBase),
            "o200k" | "o200k_base" => Ok(Encoding::O200kBase),
            _ => Err(format!("unknown encoding: {}", s)),
        }
    }
}

/// Rough estimate used when no tokenizer is available.
fn estimate(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Count tokens in `text`. Never fails.
///
/// # Examples
///
/// ```
/// use promptdump::tokens::{count_tokens, Encoding};
///
/// assert_eq!(count_tokens("", Encoding::default()), 0);
/// assert!(count_tokens("fn main() {}", Encoding::O200kBase) > 0);
/// ```
pub fn count_tokens(text: &str, encoding: Encoding) -> usize {
    if text.is_empty() {
        return 0;
    }
    match encoding.bpe() {
        Some(bpe) => bpe.encode_ordinary(text).len(),
        None => estimate(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate() {
        assert_eq!(estimate(""), 0);
        assert_eq!(estimate("a"), 1);
        assert_eq!(estimate("abcd"), 1);
        assert_eq!(estimate("abcde"), 2);
        assert_eq!(estimate("ééééé"), 2);
    }

    #[test]
    fn test_count_small_text() {
        let count = count_tokens("Hello, world!", Encoding::Cl100kBase);
        assert!(count > 0 && count < 10);
    }

    #[test]
    fn test_encoding_parse_and_display() {
        assert_eq!("cl100k".parse::<Encoding>().unwrap(), Encoding::Cl100kBase);
        assert_eq!("O200K_BASE".parse::<Encoding>().unwrap(), Encoding::O200kBase);
        assert!("p50k".parse::<Encoding>().is_err());
        assert_eq!(Encoding::O200kBase.to_string(), "o200k_base");
    }
}
