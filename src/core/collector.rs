//! Thread-safe accumulator of matches for one in-flight query.
//!
//! Every extension task of a query writes into the same collector. All
//! mutation happens under one internal lock that is held only for the append
//! itself; callers never see the lock.
//!
//! The collector also remembers how much of its list has been handed to the
//! presentation layer. Everything before that point is frozen: it is never
//! reordered or retracted again.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::item::{Item, Match};

/// Origin tag for matches added outside a dispatched extension task.
pub(crate) const UNTRACKED_ORIGIN: usize = 0;

/// Ranking order: urgency, then usage count, then match score, all
/// descending. Equal matches compare equal so a stable sort keeps insertion
/// order.
pub fn compare_matches(lhs: &Match, rhs: &Match) -> Ordering {
    rhs.item
        .urgency
        .cmp(&lhs.item.urgency)
        .then_with(|| rhs.item.usage.cmp(&lhs.item.usage))
        .then_with(|| rhs.score.cmp(&lhs.score))
}

/// Stable-sort a match list with [`compare_matches`].
pub fn sort_matches(matches: &mut [Match]) {
    matches.sort_by(compare_matches);
}

#[derive(Debug, Clone)]
struct Entry {
    origin: usize,
    m: Match,
}

#[derive(Debug, Default)]
struct Entries {
    list: Vec<Entry>,
    published: usize,
}

#[derive(Debug)]
pub struct ResultCollector {
    valid: AtomicBool,
    entries: Mutex<Entries>,
}

impl Default for ResultCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultCollector {
    pub fn new() -> Self {
        Self {
            valid: AtomicBool::new(true),
            entries: Mutex::new(Entries::default()),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid.load(AtomicOrdering::Acquire)
    }

    /// Stop accepting matches. Once this returns no append can land.
    pub fn invalidate(&self) {
        let _guard = self.entries.lock();
        self.valid.store(false, AtomicOrdering::Release);
    }

    /// Append one match. No-op once invalidated.
    pub fn add_match(&self, item: Arc<Item>, score: u16) {
        self.add_match_from(UNTRACKED_ORIGIN, item, score);
    }

    /// Append a batch under a single lock acquisition. No-op once invalidated.
    pub fn add_matches<I>(&self, batch: I)
    where
        I: IntoIterator<Item = (Arc<Item>, u16)>,
    {
        self.add_matches_from(UNTRACKED_ORIGIN, batch);
    }

    pub(crate) fn add_match_from(&self, origin: usize, item: Arc<Item>, score: u16) {
        if !self.is_valid() {
            return;
        }
        let mut entries = self.entries.lock();
        if self.is_valid() {
            entries.list.push(Entry {
                origin,
                m: Match::new(item, score),
            });
        }
    }

    pub(crate) fn add_matches_from<I>(&self, origin: usize, batch: I)
    where
        I: IntoIterator<Item = (Arc<Item>, u16)>,
    {
        if !self.is_valid() {
            return;
        }
        // Materialize first so caller code never runs while the lock is held.
        let batch: Vec<Entry> = batch
            .into_iter()
            .map(|(item, score)| Entry {
                origin,
                m: Match::new(item, score),
            })
            .collect();
        if batch.is_empty() {
            return;
        }

        let mut entries = self.entries.lock();
        if self.is_valid() {
            entries.list.extend(batch);
        }
    }

    /// Stable-sort the matches not yet published. The published prefix keeps
    /// its order.
    pub fn sort(&self) {
        let mut entries = self.entries.lock();
        let published = entries.published;
        entries.list[published..].sort_by(|a, b| compare_matches(&a.m, &b.m));
    }

    pub fn size(&self) -> usize {
        self.entries.lock().list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Copy of the current match list. Writers may keep appending afterwards.
    pub fn snapshot(&self) -> Vec<Match> {
        self.entries
            .lock()
            .list
            .iter()
            .map(|e| e.m.clone())
            .collect()
    }

    /// Sort the not-yet-published tail, mark everything published and return
    /// the full list. Sorting and copying happen under one lock.
    pub(crate) fn publish_sorted(&self) -> Vec<Match> {
        let mut entries = self.entries.lock();
        let published = entries.published;
        entries.list[published..].sort_by(|a, b| compare_matches(&a.m, &b.m));
        entries.published = entries.list.len();
        entries.list.iter().map(|e| e.m.clone()).collect()
    }

    /// Matches added since the last publication, in insertion order. Marks
    /// them published.
    pub(crate) fn take_unpublished(&self) -> Vec<Match> {
        let mut entries = self.entries.lock();
        let published = entries.published;
        entries.published = entries.list.len();
        entries.list[published..]
            .iter()
            .map(|e| e.m.clone())
            .collect()
    }

    /// Drop every unpublished match that came from `origin`. Returns how many
    /// were removed.
    pub(crate) fn retract(&self, origin: usize) -> usize {
        let mut entries = self.entries.lock();
        let published = entries.published;
        let mut tail = entries.list.split_off(published);
        let before = tail.len();
        tail.retain(|e| e.origin != origin);
        let removed = before - tail.len();
        entries.list.append(&mut tail);
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::item::{Urgency, MAX_SCORE};
    use std::thread;

    fn item(id: &str, urgency: Urgency, usage: u32) -> Arc<Item> {
        Item::new(id, id)
            .with_urgency(urgency)
            .with_usage(usage)
            .into_shared()
    }

    fn ids(matches: &[Match]) -> Vec<String> {
        matches.iter().map(|m| m.item.id.clone()).collect()
    }

    #[test]
    fn test_add_and_snapshot() {
        let collector = ResultCollector::new();
        collector.add_match(item("a", Urgency::Normal, 0), 10);
        collector.add_matches(vec![
            (item("b", Urgency::Normal, 0), 20),
            (item("c", Urgency::Normal, 0), 30),
        ]);

        assert_eq!(collector.size(), 3);
        assert_eq!(ids(&collector.snapshot()), ["a", "b", "c"]);
    }

    #[test]
    fn test_invalidated_collector_drops_matches() {
        let collector = ResultCollector::new();
        collector.add_match(item("a", Urgency::Normal, 0), 1);
        collector.invalidate();

        collector.add_match(item("b", Urgency::Normal, 0), 1);
        collector.add_matches(vec![(item("c", Urgency::Normal, 0), 1)]);

        assert!(!collector.is_valid());
        assert_eq!(collector.size(), 1);
    }

    #[test]
    fn test_urgency_beats_usage_and_score() {
        let collector = ResultCollector::new();
        collector.add_match(item("m2", Urgency::Normal, 1000), MAX_SCORE);
        collector.add_match(item("m1", Urgency::Alert, 0), 0);
        collector.sort();

        assert_eq!(ids(&collector.snapshot()), ["m1", "m2"]);
    }

    #[test]
    fn test_usage_then_score() {
        let collector = ResultCollector::new();
        collector.add_match(item("low-score", Urgency::Normal, 0), 10);
        collector.add_match(item("used", Urgency::Normal, 5), 1);
        collector.add_match(item("high-score", Urgency::Normal, 0), 500);
        collector.sort();

        assert_eq!(
            ids(&collector.snapshot()),
            ["used", "high-score", "low-score"]
        );
    }

    #[test]
    fn test_sort_is_stable_for_ties() {
        let collector = ResultCollector::new();
        for id in ["first", "second", "third"] {
            collector.add_match(item(id, Urgency::Notification, 2), 7);
        }
        collector.sort();

        assert_eq!(ids(&collector.snapshot()), ["first", "second", "third"]);
    }

    #[test]
    fn test_published_prefix_is_frozen() {
        let collector = ResultCollector::new();
        collector.add_match(item("low", Urgency::Normal, 0), 1);
        collector.add_match(item("high", Urgency::Normal, 0), 100);
        assert_eq!(ids(&collector.publish_sorted()), ["high", "low"]);

        // Late arrivals are handed out as-is and never sorted into the prefix.
        collector.add_match(item("late-low", Urgency::Normal, 0), 1);
        collector.add_match(item("late-alert", Urgency::Alert, 0), 1);
        assert_eq!(ids(&collector.take_unpublished()), ["late-low", "late-alert"]);
        assert!(collector.take_unpublished().is_empty());

        assert_eq!(
            ids(&collector.snapshot()),
            ["high", "low", "late-low", "late-alert"]
        );
    }

    #[test]
    fn test_sort_leaves_published_prefix_alone() {
        let collector = ResultCollector::new();
        collector.add_match(item("low", Urgency::Normal, 0), 1);
        collector.add_match(item("high", Urgency::Normal, 0), 100);
        collector.publish_sorted();

        collector.add_match(item("late-low", Urgency::Normal, 0), 1);
        collector.add_match(item("late-alert", Urgency::Alert, 0), 1);
        collector.sort();

        assert_eq!(
            ids(&collector.snapshot()),
            ["high", "low", "late-alert", "late-low"]
        );
    }

    #[test]
    fn test_retract_only_touches_unpublished() {
        let collector = ResultCollector::new();
        collector.add_match_from(1, item("a", Urgency::Normal, 0), 1);
        collector.publish_sorted();

        collector.add_match_from(1, item("b", Urgency::Normal, 0), 1);
        collector.add_match_from(2, item("c", Urgency::Normal, 0), 1);

        assert_eq!(collector.retract(1), 1);
        assert_eq!(ids(&collector.snapshot()), ["a", "c"]);
    }

    #[test]
    fn test_concurrent_insertion() {
        const TASKS: usize = 8;
        const PER_TASK: usize = 500;

        let collector = Arc::new(ResultCollector::new());
        let handles: Vec<_> = (0..TASKS)
            .map(|t| {
                let collector = Arc::clone(&collector);
                thread::spawn(move || {
                    for i in 0..PER_TASK {
                        let id = format!("{}-{}", t, i);
                        collector.add_match(Item::new(id.clone(), id).into_shared(), 1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.len(), TASKS * PER_TASK);

        let mut seen = ids(&snapshot);
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), TASKS * PER_TASK);
    }
}
