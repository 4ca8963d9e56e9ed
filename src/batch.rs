//! Packs article fragments into prompt bodies under a token ceiling.
//!
//! Packing is greedy and order preserving. Every batch starts with the task
//! preamble; a fragment that would push the current batch over the ceiling
//! seals it and seeds the next one.
//!
//! A batch exceeds the ceiling only when it holds exactly one fragment and
//! `preamble + fragment` alone already exceeds it. Such a batch is emitted as
//! is, never split. The fragment itself may be under the ceiling.

use std::ops::Range;

use crate::tokens::TokenEstimator;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Preamble followed by the fragments, ready to send as one prompt.
    pub text: String,
    /// Indices of the articles this batch covers.
    pub articles: Range<usize>,
}

impl Batch {
    pub fn article_count(&self) -> usize {
        self.articles.len()
    }
}

pub fn pack(
    preamble: &str,
    fragments: &[String],
    max_tokens: usize,
    estimator: &dyn TokenEstimator,
) -> Vec<Batch> {
    fragments
        .iter()
        .enumerate()
        .fold(Packing::new(preamble), |state, (idx, fragment)| {
            state.push(idx, fragment, max_tokens, estimator)
        })
        .finish()
}

struct Packing<'a> {
    preamble: &'a str,
    sealed: Vec<Batch>,
    text: String,
    start: usize,
    end: usize,
}

impl<'a> Packing<'a> {
    fn new(preamble: &'a str) -> Self {
        Self {
            preamble,
            sealed: Vec::new(),
            text: preamble.to_owned(),
            start: 0,
            end: 0,
        }
    }

    fn has_fragments(&self) -> bool {
        self.end > self.start
    }

    fn push(
        mut self,
        idx: usize,
        fragment: &str,
        max_tokens: usize,
        estimator: &dyn TokenEstimator,
    ) -> Self {
        let candidate = format!("{}{fragment}", self.text);
        if self.has_fragments() && estimator.estimate(&candidate) > max_tokens {
            let seed = format!("{}{fragment}", self.preamble);
            let text = std::mem::replace(&mut self.text, seed);
            self.sealed.push(Batch {
                text,
                articles: self.start..self.end,
            });
            self.start = idx;
        } else {
            self.text = candidate;
        }
        self.end = idx + 1;
        self
    }

    fn finish(mut self) -> Vec<Batch> {
        if self.has_fragments() {
            self.sealed.push(Batch {
                text: self.text,
                articles: self.start..self.end,
            });
        }
        self.sealed
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    /// One token per char keeps the arithmetic obvious.
    struct PerChar;

    impl TokenEstimator for PerChar {
        fn estimate(&self, text: &str) -> usize {
            text.chars().count()
        }
    }

    fn sizes(batches: &[Batch]) -> Vec<usize> {
        batches.iter().map(Batch::article_count).collect()
    }

    #[test]
    fn packs_two_two_one_under_3000() {
        let preamble = "p".repeat(500);
        let fragments = (0..5)
            .map(|i| char::from(b'a' + i).to_string().repeat(1000))
            .collect::<Vec<_>>();

        let batches = pack(&preamble, &fragments, 3000, &PerChar);

        assert_eq!(sizes(&batches), vec![2, 2, 1]);
        for batch in &batches {
            assert!(batch.text.starts_with(&preamble));
            assert!(PerChar.estimate(&batch.text) <= 3000);
        }
        assert_eq!(batches[2].articles, 4..5);
        assert!(batches[2].text.ends_with(&"e".repeat(1000)));
    }

    #[test]
    fn no_fragments_means_no_batches() {
        assert!(pack("preamble", &[], 10, &PerChar).is_empty());
    }

    #[test]
    fn large_ceiling_yields_one_batch() {
        let fragments = vec!["one\n".to_owned(), "two\n".to_owned(), "three\n".to_owned()];
        let batches = pack("do it:\n", &fragments, 10_000, &PerChar);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].text, "do it:\none\ntwo\nthree\n");
        assert_eq!(batches[0].articles, 0..3);
    }

    #[test]
    fn oversized_fragment_is_emitted_alone() {
        let fragments = vec!["aa".to_owned(), "b".repeat(50), "cc".to_owned()];
        let batches = pack("P", &fragments, 10, &PerChar);

        assert_eq!(sizes(&batches), vec![1, 1, 1]);
        assert_eq!(batches[1].text, format!("P{}", "b".repeat(50)));
    }

    #[test]
    fn fragment_over_ceiling_only_with_preamble_is_emitted_alone() {
        let preamble = "p".repeat(500);
        let fragments = vec!["a".repeat(1000), "b".repeat(2600)];

        let batches = pack(&preamble, &fragments, 3000, &PerChar);

        assert_eq!(sizes(&batches), vec![1, 1]);
        let estimates = batches
            .iter()
            .map(|b| PerChar.estimate(&b.text))
            .collect::<Vec<_>>();
        assert_eq!(estimates, vec![1500, 3100]);
        assert_eq!(batches[1].text, format!("{preamble}{}", fragments[1]));
    }

    #[test]
    fn oversized_first_fragment_does_not_emit_bare_preamble() {
        let fragments = vec!["x".repeat(40), "y".to_owned()];
        let batches = pack("P", &fragments, 10, &PerChar);

        assert_eq!(sizes(&batches), vec![1, 1]);
        assert_eq!(batches[0].text, format!("P{}", "x".repeat(40)));
        assert_eq!(batches[1].text, "Py");
    }

    #[test]
    fn ceiling_is_inclusive() {
        let fragments = vec!["abc".to_owned(), "def".to_owned()];
        let batches = pack("P", &fragments, 7, &PerChar);
        assert_eq!(sizes(&batches), vec![2]);
    }

    proptest! {
        #[test]
        fn batches_respect_ceiling_unless_single_oversized(
            lens in proptest::collection::vec(1usize..60, 0..30),
            preamble_len in 0usize..20,
            max_tokens in 1usize..200,
        ) {
            let preamble = "p".repeat(preamble_len);
            let fragments = lens.iter().map(|n| "f".repeat(*n)).collect::<Vec<_>>();
            let batches = pack(&preamble, &fragments, max_tokens, &PerChar);

            for batch in &batches {
                prop_assert!(batch.article_count() >= 1);
                if PerChar.estimate(&batch.text) > max_tokens {
                    prop_assert_eq!(batch.article_count(), 1);
                    let alone = format!("{preamble}{}", fragments[batch.articles.start]);
                    prop_assert!(PerChar.estimate(&alone) > max_tokens);
                    prop_assert_eq!(&batch.text, &alone);
                }
            }
        }

        #[test]
        fn batches_preserve_article_order(
            lens in proptest::collection::vec(1usize..40, 0..30),
            max_tokens in 1usize..150,
        ) {
            let fragments = lens
                .iter()
                .enumerate()
                .map(|(i, n)| format!("<{i}>{}", "f".repeat(*n)))
                .collect::<Vec<_>>();
            let batches = pack("P:", &fragments, max_tokens, &PerChar);

            let mut next = 0usize;
            let mut rebuilt = String::new();
            for batch in &batches {
                prop_assert_eq!(batch.articles.start, next);
                next = batch.articles.end;
                rebuilt.push_str(batch.text.strip_prefix("P:").unwrap_or(&batch.text));
            }
            prop_assert_eq!(next, fragments.len());
            prop_assert_eq!(rebuilt, fragments.concat());
        }

        #[test]
        fn tiny_ceiling_gives_one_batch_per_article(
            lens in proptest::collection::vec(5usize..30, 1..20),
        ) {
            let fragments = lens.iter().map(|n| "f".repeat(*n)).collect::<Vec<_>>();
            // Smaller than any two fragments combined.
            let batches = pack("", &fragments, 9, &PerChar);
            prop_assert_eq!(batches.len(), fragments.len());
        }
    }
}
