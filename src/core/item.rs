//! Result records shared between extensions and the dispatcher.

use std::sync::Arc;

use crate::executor::ExecutionAction;

/// Highest possible match score (a perfect match).
pub const MAX_SCORE: u16 = u16::MAX;

/// How urgently an item wants the user's attention. Only used for ranking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Urgency {
    #[default]
    Normal,
    Notification,
    Alert,
}

/// A named activation target of an [`Item`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub text: String,
    pub execution: ExecutionAction,
}

impl Action {
    pub fn new(text: impl Into<String>, execution: ExecutionAction) -> Self {
        Self {
            text: text.into(),
            execution,
        }
    }
}

/// One candidate result.
///
/// Items are created by extensions and shared read-only (behind an `Arc`)
/// with the dispatcher for the lifetime of a query. An empty `id` marks an
/// ephemeral item whose activations are not tracked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Item {
    pub id: String,
    pub text: String,
    pub subtext: String,
    /// Text placed into the input box on tab completion.
    pub completion: String,
    pub urgency: Urgency,
    /// How often this item was activated before.
    pub usage: u32,
    pub actions: Vec<Action>,
}

impl Item {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_subtext(mut self, subtext: impl Into<String>) -> Self {
        self.subtext = subtext.into();
        self
    }

    pub fn with_completion(mut self, completion: impl Into<String>) -> Self {
        self.completion = completion.into();
        self
    }

    pub fn with_urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = urgency;
        self
    }

    pub fn with_usage(mut self, usage: u32) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Whether activations of this item can be recorded.
    pub fn is_tracked(&self) -> bool {
        !self.id.is_empty()
    }

    /// The execution behind the action at `index`, if there is one.
    pub fn action(&self, index: usize) -> Option<&ExecutionAction> {
        self.actions.get(index).map(|a| &a.execution)
    }

    /// The default (first) action.
    pub fn default_action(&self) -> Option<&ExecutionAction> {
        self.action(0)
    }

    pub fn into_shared(self) -> Arc<Item> {
        Arc::new(self)
    }
}

/// An item paired with how well it matched the search term.
#[derive(Debug, Clone)]
pub struct Match {
    pub item: Arc<Item>,
    /// Strength of the match, `0..=MAX_SCORE`. Zero means "claimed, but no
    /// textual match".
    pub score: u16,
}

impl Match {
    pub fn new(item: Arc<Item>, score: u16) -> Self {
        Self { item, score }
    }
}

/// Scale `matched / total` onto `0..=MAX_SCORE`.
pub fn score_from_ratio(matched: usize, total: usize) -> u16 {
    if total == 0 || matched == 0 {
        return 0;
    }
    let ratio = (matched.min(total) as f64) / (total as f64);
    (ratio * MAX_SCORE as f64).round() as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urgency_order() {
        assert!(Urgency::Normal < Urgency::Notification);
        assert!(Urgency::Notification < Urgency::Alert);
        assert_eq!(Urgency::default(), Urgency::Normal);
    }

    #[test]
    fn test_item_builder() {
        let item = Item::new("app:firefox", "Firefox")
            .with_subtext("Web Browser")
            .with_usage(3)
            .with_action(Action::new(
                "Launch",
                ExecutionAction::LaunchApp {
                    exec: "firefox".into(),
                    name: "Firefox".into(),
                },
            ));

        assert_eq!(item.subtext, "Web Browser");
        assert_eq!(item.usage, 3);
        assert!(item.is_tracked());
        assert!(matches!(
            item.default_action(),
            Some(ExecutionAction::LaunchApp { .. })
        ));
        assert!(item.action(1).is_none());
    }

    #[test]
    fn test_ephemeral_item() {
        assert!(!Item::new("", "= 4").is_tracked());
    }

    #[test]
    fn test_score_from_ratio() {
        assert_eq!(score_from_ratio(0, 10), 0);
        assert_eq!(score_from_ratio(5, 0), 0);
        assert_eq!(score_from_ratio(10, 10), MAX_SCORE);
        assert_eq!(score_from_ratio(20, 10), MAX_SCORE);
        let half = score_from_ratio(1, 2);
        assert!(half > 32000 && half < 33000);
    }
}
