//! q-gram index for approximate prefix matching.
//!
//! Every keyword is padded on the left with `q - 1` blanks and cut into
//! length-`q` windows, one per character of the keyword. A query word shares
//! most of its grams with any keyword it nearly prefixes, so the gram index
//! narrows the candidates before the edit distance check runs.

use std::collections::HashMap;

use super::distance::check_prefix_edit_distance;
use super::prefix::PrefixIndex;

/// Gram -> occurrences per keyword.
pub type GramCounts = HashMap<String, u32>;

/// Split `word` into its padded q-grams and count each one.
pub fn qgrams(word: &str, q: usize) -> GramCounts {
    let padded: Vec<char> = std::iter::repeat(' ')
        .take(q.saturating_sub(1))
        .chain(word.chars())
        .collect();

    let mut grams = GramCounts::new();
    for window in padded.windows(q.max(1)) {
        *grams.entry(window.iter().collect()).or_insert(0) += 1;
    }
    grams
}

#[derive(Debug, Clone)]
pub struct GramIndex {
    q: usize,
    grams: HashMap<String, HashMap<String, u32>>,
}

impl GramIndex {
    pub fn new(q: usize) -> Self {
        Self {
            q,
            grams: HashMap::new(),
        }
    }

    /// Derive the gram index from every keyword of `prefix`.
    pub fn build(q: usize, prefix: &PrefixIndex) -> Self {
        let mut index = Self::new(q);
        for keyword in prefix.keywords() {
            index.insert(keyword);
        }
        index
    }

    /// Index a keyword. Must be called once per distinct keyword.
    pub fn insert(&mut self, keyword: &str) {
        for (gram, count) in qgrams(keyword, self.q) {
            *self
                .grams
                .entry(gram)
                .or_default()
                .entry(keyword.to_string())
                .or_insert(0) += count;
        }
    }

    /// Items with a keyword that `word` prefixes within `budget` edits,
    /// scored by gram overlap times keyword weight.
    pub fn word_matches(
        &self,
        word: &str,
        budget: usize,
        prefix: &PrefixIndex,
    ) -> HashMap<usize, u64> {
        let word_chars: Vec<char> = word.chars().collect();

        // A keyword can share no more of a gram than the word holds.
        let mut overlap: HashMap<&str, u32> = HashMap::new();
        for (gram, count) in qgrams(word, self.q) {
            let Some(keywords) = self.grams.get(&gram) else {
                continue;
            };
            for (keyword, keyword_count) in keywords {
                *overlap.entry(keyword.as_str()).or_insert(0) += count.min(*keyword_count);
            }
        }

        // Each edit destroys at most q grams of the word.
        let lower_bound = word_chars.len().saturating_sub(budget.saturating_mul(self.q));

        let mut matches = HashMap::new();
        for (keyword, shared) in overlap {
            if (shared as usize) < lower_bound {
                continue;
            }
            let keyword_chars: Vec<char> = keyword.chars().collect();
            if !check_prefix_edit_distance(&word_chars, &keyword_chars, budget) {
                continue;
            }
            let Some(postings) = prefix.postings(keyword) else {
                continue;
            };
            for (&slot, &weight) in postings {
                *matches.entry(slot).or_insert(0u64) +=
                    u64::from(shared) * u64::from(weight.max(1));
            }
        }
        matches
    }

    pub fn clear(&mut self) {
        self.grams.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qgrams_padding() {
        let grams = qgrams("fox", 3);
        assert_eq!(grams.len(), 3);
        assert_eq!(grams["  f"], 1);
        assert_eq!(grams[" fo"], 1);
        assert_eq!(grams["fox"], 1);
    }

    #[test]
    fn test_qgrams_count_repeats() {
        let grams = qgrams("aaaa", 2);
        assert_eq!(grams[" a"], 1);
        assert_eq!(grams["aa"], 3);
    }

    #[test]
    fn test_short_word_still_has_a_gram() {
        let grams = qgrams("x", 3);
        assert_eq!(grams.len(), 1);
        assert_eq!(grams["  x"], 1);
    }

    #[test]
    fn test_word_matches_typo() {
        let mut prefix = PrefixIndex::default();
        prefix.insert("firefox", 0, 1);
        prefix.insert("thunderbird", 1, 1);
        let grams = GramIndex::build(3, &prefix);

        let matches = grams.word_matches("firefix", 1, &prefix);
        assert_eq!(matches.len(), 1);
        // "  f", " fi", "fir", "ire", "ref" are shared
        assert_eq!(matches[&0], 5);

        assert!(grams.word_matches("firefix", 0, &prefix).is_empty());
        assert!(grams.word_matches("xyzxyz", 1, &prefix).is_empty());
    }

    #[test]
    fn test_repeated_grams_are_bounded() {
        let mut prefix = PrefixIndex::default();
        prefix.insert("aa", 0, 1);
        let grams = GramIndex::build(2, &prefix);

        // "aaaa" holds "aa" three times but the keyword only once.
        let matches = grams.word_matches("aaaa", 2, &prefix);
        assert_eq!(matches[&0], 2);
    }
}
