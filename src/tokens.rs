use anyhow::Context as _;
use tiktoken_rs::CoreBPE;

/// Estimates how many model tokens a piece of text consumes.
pub trait TokenEstimator: Send + Sync {
    fn estimate(&self, text: &str) -> usize;
}

/// Exact token count under the `cl100k_base` encoding used by the chat models.
pub struct Cl100k {
    bpe: CoreBPE,
}

impl Cl100k {
    pub fn new() -> anyhow::Result<Self> {
        let bpe = tiktoken_rs::cl100k_base().context("load cl100k_base encoding")?;
        Ok(Self { bpe })
    }
}

impl std::fmt::Debug for Cl100k {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cl100k").finish_non_exhaustive()
    }
}

impl TokenEstimator for Cl100k {
    fn estimate(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

/// Roughly four characters per token, rounded up. Cheap, but undercounts
/// non-Latin scripts; used where exact counts do not matter.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharHeuristic;

impl TokenEstimator for CharHeuristic {
    fn estimate(&self, text: &str) -> usize {
        text.chars().count().div_ceil(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cl100k_matches_known_counts() {
        let est = Cl100k::new().unwrap();
        assert_eq!(est.estimate(""), 0);
        assert_eq!(est.estimate("hello world"), 2);
        assert_eq!(est.estimate("Hello, world!"), 4);
    }

    #[test]
    fn cl100k_counts_cjk_well_above_the_heuristic() {
        let est = Cl100k::new().unwrap();
        let text = "日本語のテキスト".repeat(100);
        let exact = est.estimate(&text);
        assert!(
            exact > CharHeuristic.estimate(&text) * 2,
            "exact={exact} chars={}",
            text.chars().count()
        );
    }

    #[test]
    fn char_heuristic_rounds_up() {
        let est = CharHeuristic;
        assert_eq!(est.estimate(""), 0);
        assert_eq!(est.estimate("a"), 1);
        assert_eq!(est.estimate("abcd"), 1);
        assert_eq!(est.estimate("abcde"), 2);
        assert_eq!(est.estimate(&"x".repeat(4000)), 1000);
    }

    #[test]
    fn char_heuristic_counts_chars_not_bytes() {
        let est = CharHeuristic;
        assert_eq!(est.estimate("日本語です"), 2);
    }
}
