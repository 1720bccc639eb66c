//! Sorted inverted index: lower-cased keyword -> items that carry it.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

/// Item slot -> best weight the keyword was added with for that item.
pub type Postings = BTreeMap<usize, u32>;

#[derive(Debug, Clone, Default)]
pub struct PrefixIndex {
    keywords: BTreeMap<String, Postings>,
}

impl PrefixIndex {
    /// Record that item `slot` carries `keyword`. Returns true if the keyword
    /// was not indexed before.
    pub fn insert(&mut self, keyword: &str, slot: usize, weight: u32) -> bool {
        let is_new = !self.keywords.contains_key(keyword);
        let postings = self.keywords.entry(keyword.to_string()).or_default();
        let best = postings.entry(slot).or_insert(weight);
        *best = (*best).max(weight);
        is_new
    }

    pub fn postings(&self, keyword: &str) -> Option<&Postings> {
        self.keywords.get(keyword)
    }

    /// All indexed keywords in sorted order.
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.keywords.keys().map(String::as_str)
    }

    /// Items having a keyword that starts with `word`, scored by the best
    /// weight among those keywords.
    pub fn prefix_matches(&self, word: &str) -> HashMap<usize, u64> {
        let mut matches = HashMap::new();
        let range = self
            .keywords
            .range::<str, _>((Bound::Included(word), Bound::Unbounded))
            .take_while(|(keyword, _)| keyword.starts_with(word));
        for (_, postings) in range {
            for (&slot, &weight) in postings {
                let score = matches.entry(slot).or_insert(0u64);
                *score = (*score).max(u64::from(weight));
            }
        }
        matches
    }

    pub fn clear(&mut self) {
        self.keywords.clear();
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }
}
