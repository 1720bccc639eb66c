//! Web search engines behind short triggers (`gg rust traits`).

use crate::config::WebSearchConfig;
use crate::core::{Action, Extension, Item, QueryHandle, MAX_SCORE};
use crate::executor::ExecutionAction;

use super::usage::SharedUsage;

pub struct WebSearchExtension {
    engines: Vec<WebSearchConfig>,
    usage: SharedUsage,
}

impl WebSearchExtension {
    pub const ID: &'static str = "websearch";

    pub fn new(engines: &[WebSearchConfig], usage: SharedUsage) -> Self {
        Self {
            engines: engines.to_vec(),
            usage,
        }
    }

    fn engine_for(&self, trigger: &str) -> Option<&WebSearchConfig> {
        self.engines.iter().find(|e| e.trigger.trim() == trigger)
    }

    fn item(&self, engine: &WebSearchConfig, term: &str, text: String) -> Item {
        let id = format!("{}:{}", Self::ID, engine.trigger.trim());
        let usage = self.usage.read().count(&id);

        Item::new(id, text)
            .with_subtext(engine.resolve_url(term))
            .with_completion(format!("{} {}", engine.trigger.trim(), term))
            .with_usage(usage)
            .with_action(Action::new(
                format!("Open {}", engine.name),
                ExecutionAction::OpenUrl {
                    url: engine.resolve_url(term),
                },
            ))
    }
}

impl Extension for WebSearchExtension {
    fn id(&self) -> &str {
        Self::ID
    }

    fn triggers(&self) -> Vec<String> {
        self.engines
            .iter()
            .map(|e| e.trigger.trim().to_string())
            .collect()
    }

    fn is_trigger_exclusive(&self) -> bool {
        true
    }

    fn handle_query(&self, query: &QueryHandle) {
        let Some(engine) = self.engine_for(query.trigger()) else {
            return;
        };
        let term = query.search_term().trim();

        let item = if term.is_empty() {
            // Just the trigger so far: offer the engine itself.
            self.item(engine, term, engine.name.clone())
        } else {
            self.item(engine, term, format!("{}: {}", engine.name, term))
        };
        query.add_match(item.into_shared(), MAX_SCORE);
    }

    fn fallbacks(&self, search_term: &str) -> Vec<Item> {
        let term = search_term.trim();
        if term.is_empty() {
            return Vec::new();
        }

        self.engines
            .iter()
            .map(|engine| {
                self.item(
                    engine,
                    term,
                    format!("Search '{}' using {}", term, engine.name),
                )
            })
            .collect()
    }
}
