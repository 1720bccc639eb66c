//! In-memory keyword index for extensions.
//!
//! An extension adds its items together with weighted keywords once, then
//! answers every query from the index instead of re-scanning its data set.
//! Two modes:
//!
//! - **exact**: every query word must prefix a keyword of the item
//!   (case-insensitive).
//! - **fuzzy**: every query word must prefix a keyword within an error
//!   budget derived from `delta`. Candidates come from a q-gram index and
//!   are verified with a bounded prefix edit distance.
//!
//! The index is not synchronized. The owning extension keeps rebuilds and
//! queries apart, usually with an `RwLock` around it.

mod distance;
mod fuzzy;
mod prefix;

use std::collections::HashMap;

pub use distance::check_prefix_edit_distance;
pub use fuzzy::qgrams;

use fuzzy::GramIndex;
use prefix::PrefixIndex;

/// Default q-gram length.
pub const DEFAULT_Q: usize = 3;

/// Largest accepted q-gram length.
pub const MAX_Q: usize = 8;

/// Default error tolerance: about one typo per three characters.
pub const DEFAULT_DELTA: f64 = 0.34;

/// A keyword and its relevance for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedKeyword {
    pub keyword: String,
    pub weight: u32,
}

impl WeightedKeyword {
    pub fn new(keyword: impl Into<String>, weight: u32) -> Self {
        Self {
            keyword: keyword.into(),
            weight,
        }
    }
}

/// Keyword index over items of type `T` (typically `Arc<Item>` or an id).
#[derive(Debug, Clone)]
pub struct FuzzyIndex<T> {
    items: Vec<T>,
    prefix: PrefixIndex,
    /// Present only in fuzzy mode.
    grams: Option<GramIndex>,
    delta: f64,
    q: usize,
}

impl<T: Clone> Default for FuzzyIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> FuzzyIndex<T> {
    /// An empty index in exact mode.
    pub fn new() -> Self {
        Self::with_q(DEFAULT_Q)
    }

    /// An empty index in exact mode using grams of length `q` once fuzzy
    /// mode is enabled. `q` is clamped to `1..=MAX_Q`.
    pub fn with_q(q: usize) -> Self {
        Self {
            items: Vec::new(),
            prefix: PrefixIndex::default(),
            grams: None,
            delta: DEFAULT_DELTA,
            q: q.clamp(1, MAX_Q),
        }
    }

    /// Switch modes. Indexed items are kept; the gram index is derived from
    /// the keywords already present.
    pub fn set_fuzzy(&mut self, fuzzy: bool) {
        match (fuzzy, self.grams.is_some()) {
            (true, false) => self.grams = Some(GramIndex::build(self.q, &self.prefix)),
            (false, true) => self.grams = None,
            _ => {}
        }
    }

    pub fn fuzzy(&self) -> bool {
        self.grams.is_some()
    }

    /// Error tolerance for fuzzy mode. Below 1 it is a fraction of each
    /// query word's length, from 1 up an absolute number of edits. Negative
    /// or NaN values become 0.
    pub fn set_delta(&mut self, delta: f64) {
        self.delta = if delta >= 0.0 { delta } else { 0.0 };
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn q(&self) -> usize {
        self.q
    }

    /// Index `item` under `keywords`. Keywords are split into words on
    /// non-alphanumeric characters and lower-cased.
    pub fn add(&mut self, item: T, keywords: &[WeightedKeyword]) {
        let slot = self.items.len();
        self.items.push(item);

        for keyword in keywords {
            for word in split_words(&keyword.keyword) {
                let is_new = self.prefix.insert(&word, slot, keyword.weight);
                if is_new {
                    if let Some(grams) = self.grams.as_mut() {
                        grams.insert(&word);
                    }
                }
            }
        }
    }

    /// Drop every item and keyword. The mode and tuning are kept.
    pub fn clear(&mut self) {
        self.items.clear();
        self.prefix.clear();
        if let Some(grams) = self.grams.as_mut() {
            grams.clear();
        }
    }

    /// Items matching every word of `query`, best first.
    pub fn search(&self, query: &str) -> Vec<T> {
        self.search_scored(query)
            .into_iter()
            .map(|(item, _)| item)
            .collect()
    }

    /// Like [`search`](Self::search), with each item's accumulated score.
    /// Equal scores keep insertion order.
    pub fn search_scored(&self, query: &str) -> Vec<(T, u64)> {
        let words: Vec<String> = split_words(query).collect();
        if words.is_empty() || self.items.is_empty() {
            return Vec::new();
        }

        let per_word: Vec<HashMap<usize, u64>> = words
            .iter()
            .map(|word| match &self.grams {
                Some(grams) => {
                    let budget = error_budget(word.chars().count(), self.delta);
                    grams.word_matches(word, budget, &self.prefix)
                }
                None => self.prefix.prefix_matches(word),
            })
            .collect();

        let mut scored: Vec<(usize, u64)> = intersect(per_word).into_iter().collect();
        scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        scored
            .into_iter()
            .filter_map(|(slot, score)| self.items.get(slot).map(|item| (item.clone(), score)))
            .collect()
    }

    /// Number of indexed items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct indexed words.
    pub fn keyword_count(&self) -> usize {
        self.prefix.len()
    }
}

/// Lower-cased words of `text`, split on anything not alphanumeric.
pub fn split_words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
}

/// Edits allowed for a query word of `len` characters.
pub fn error_budget(len: usize, delta: f64) -> usize {
    if delta < 1.0 {
        (len as f64 * delta).floor() as usize
    } else {
        delta.floor() as usize
    }
}

/// Keep the slots present in every map, summing their scores. Walks the
/// smallest map.
fn intersect(mut per_word: Vec<HashMap<usize, u64>>) -> HashMap<usize, u64> {
    if per_word.len() <= 1 {
        return per_word.pop().unwrap_or_default();
    }

    let smallest = per_word
        .iter()
        .enumerate()
        .min_by_key(|(_, matches)| matches.len())
        .map(|(i, _)| i)
        .unwrap_or(0);
    let base = per_word.swap_remove(smallest);

    base.into_iter()
        .filter_map(|(slot, score)| {
            per_word.iter().try_fold(score, |total, matches| {
                matches.get(&slot).map(|s| total + s)
            })
            .map(|total| (slot, total))
        })
        .collect()
}
