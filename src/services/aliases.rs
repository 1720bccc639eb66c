//! User-defined aliases: a keyword and a name pointing at a command or URL.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::{AliasConfig, IndexConfig};
use crate::core::{score_from_ratio, Action, Extension, Item, QueryHandle};
use crate::executor::ExecutionAction;
use crate::index::{FuzzyIndex, WeightedKeyword};

use super::usage::SharedUsage;

const KEYWORD_WEIGHT: u32 = 100;
const NAME_WEIGHT: u32 = 50;

pub struct AliasExtension {
    aliases: Vec<Arc<AliasConfig>>,
    index: RwLock<FuzzyIndex<Arc<AliasConfig>>>,
    usage: SharedUsage,
}

impl AliasExtension {
    pub const ID: &'static str = "aliases";

    pub fn new(aliases: &[AliasConfig], index: &IndexConfig, usage: SharedUsage) -> Self {
        let mut fuzzy = FuzzyIndex::with_q(index.q);
        fuzzy.set_fuzzy(index.fuzzy);
        fuzzy.set_delta(index.delta);

        let extension = Self {
            aliases: aliases.iter().cloned().map(Arc::new).collect(),
            index: RwLock::new(fuzzy),
            usage,
        };
        extension.rebuild();
        extension
    }

    /// Rebuild the index from the configured aliases. Queries wait for it.
    pub fn rebuild(&self) {
        let mut index = self.index.write();
        index.clear();
        for alias in &self.aliases {
            index.add(
                Arc::clone(alias),
                &[
                    WeightedKeyword::new(alias.keyword.as_str(), KEYWORD_WEIGHT),
                    WeightedKeyword::new(alias.name.as_str(), NAME_WEIGHT),
                ],
            );
        }
        tracing::debug!(
            aliases = index.len(),
            keywords = index.keyword_count(),
            "Indexed aliases"
        );
    }

    fn item(&self, alias: &AliasConfig) -> Item {
        let execution = if alias.is_url() {
            ExecutionAction::OpenUrl {
                url: alias.target.clone(),
            }
        } else {
            ExecutionAction::RunShellCommand {
                command: alias.target.clone(),
            }
        };
        let id = format!("{}:{}", Self::ID, alias.keyword);
        let usage = self.usage.read().count(&id);

        Item::new(id, alias.name.clone())
            .with_subtext(alias.target.clone())
            .with_completion(alias.keyword.clone())
            .with_usage(usage)
            .with_action(Action::new("Run", execution))
    }
}

impl Extension for AliasExtension {
    fn id(&self) -> &str {
        Self::ID
    }

    fn setup_session(&self) {
        self.rebuild();
    }

    fn handle_query(&self, query: &QueryHandle) {
        let term = query.search_term().trim();
        if term.is_empty() {
            return;
        }
        let term_len = term.chars().count();

        let found = self.index.read().search(term);
        let mut matches = Vec::with_capacity(found.len());
        for alias in found {
            if !query.is_valid() {
                return;
            }
            let keyword_len = alias.keyword.chars().count();
            let score = if alias.keyword.eq_ignore_ascii_case(term) {
                score_from_ratio(1, 1)
            } else {
                score_from_ratio(term_len, keyword_len.max(alias.name.chars().count()))
            };
            matches.push((self.item(&alias).into_shared(), score));
        }
        query.add_matches(matches);
    }
}
