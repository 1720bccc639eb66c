//! Built-in extensions and the usage store they rank with.

pub mod aliases;
pub mod calculator;
pub mod usage;
pub mod websearch;

use std::sync::Arc;

use crate::config::Config;
use crate::core::Extension;

pub use aliases::AliasExtension;
pub use calculator::CalculatorExtension;
pub use usage::{SharedUsage, UsageStore};
pub use websearch::WebSearchExtension;

/// Open the usage store configured in `config`, or an in-memory one when
/// usage tracking is disabled.
pub fn open_usage(config: &Config) -> SharedUsage {
    let store = if config.usage.enabled {
        UsageStore::open(&config.usage.resolved_path())
    } else {
        UsageStore::new()
    };
    store.into_shared()
}

/// The built-in extensions enabled by `config`.
pub fn builtin_extensions(config: &Config, usage: &SharedUsage) -> Vec<Arc<dyn Extension>> {
    let mut extensions: Vec<Arc<dyn Extension>> = Vec::new();

    if config.calculator.enabled {
        extensions.push(Arc::new(CalculatorExtension::new()));
    }
    if !config.aliases.is_empty() {
        extensions.push(Arc::new(AliasExtension::new(
            &config.aliases,
            &config.index,
            Arc::clone(usage),
        )));
    }
    if !config.websearch.is_empty() {
        extensions.push(Arc::new(WebSearchExtension::new(
            &config.websearch,
            Arc::clone(usage),
        )));
    }

    extensions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AliasConfig;

    fn ids(extensions: &[Arc<dyn Extension>]) -> Vec<&str> {
        extensions.iter().map(|e| e.id()).collect()
    }

    #[test]
    fn test_default_extensions() {
        let config = Config::default();
        let usage = UsageStore::new().into_shared();
        assert_eq!(
            ids(&builtin_extensions(&config, &usage)),
            ["calculator", "websearch"]
        );
    }

    #[test]
    fn test_configured_extensions() {
        let mut config = Config::default();
        config.calculator.enabled = false;
        config.websearch.clear();
        config.aliases.push(AliasConfig {
            keyword: "gh".into(),
            name: "GitHub".into(),
            target: "https://github.com".into(),
        });

        let usage = UsageStore::new().into_shared();
        assert_eq!(ids(&builtin_extensions(&config, &usage)), ["aliases"]);
    }
}
