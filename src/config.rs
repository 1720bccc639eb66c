use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::DispatchConfig;
use crate::error::OrbitResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub query: QueryConfig,
    pub index: IndexConfig,
    pub usage: UsageConfig,
    pub calculator: CalculatorConfig,
    #[serde(default)]
    pub aliases: Vec<AliasConfig>,
    #[serde(default = "default_websearch")]
    pub websearch: Vec<WebSearchConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Response-time budget before partial results are shown
    pub budget_ms: u64,
    /// Cadence at which late and realtime matches are appended
    pub flush_interval_ms: u64,
    /// Session hooks slower than this are logged
    pub hook_warn_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub fuzzy: bool,
    pub delta: f64,
    pub q: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageConfig {
    pub path: String,
    pub enabled: bool,
}

impl UsageConfig {
    /// The store path with `~` and environment variables expanded
    pub fn resolved_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.path).as_ref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculatorConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasConfig {
    pub keyword: String,
    pub name: String,
    pub target: String,
}

impl AliasConfig {
    pub fn is_url(&self) -> bool {
        self.target.starts_with("http://") || self.target.starts_with("https://")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebSearchConfig {
    pub name: String,
    pub trigger: String,
    pub url: String,
}

impl WebSearchConfig {
    pub fn new(name: &str, trigger: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            trigger: trigger.to_string(),
            url: url.to_string(),
        }
    }

    pub fn has_query_placeholder(&self) -> bool {
        self.url.contains("{query}")
    }

    pub fn resolve_url(&self, query: &str) -> String {
        if self.has_query_placeholder() {
            self.url.replace("{query}", &urlencoding::encode(query))
        } else {
            self.url.clone()
        }
    }
}

fn default_websearch() -> Vec<WebSearchConfig> {
    vec![
        WebSearchConfig::new("Google", "gg", "https://www.google.com/search?q={query}"),
        WebSearchConfig::new(
            "Wikipedia",
            "wiki",
            "https://en.wikipedia.org/wiki/Special:Search?search={query}",
        ),
        WebSearchConfig::new(
            "YouTube",
            "yt",
            "https://www.youtube.com/results?search_query={query}",
        ),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            query: QueryConfig::default(),
            index: IndexConfig::default(),
            usage: UsageConfig::default(),
            calculator: CalculatorConfig::default(),
            aliases: Vec::new(),
            websearch: default_websearch(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            budget_ms: 100,
            flush_interval_ms: 50,
            hook_warn_ms: 50,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            fuzzy: false,
            delta: crate::index::DEFAULT_DELTA,
            q: crate::index::DEFAULT_Q,
        }
    }
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            path: "~/.local/share/orbit/usage.json".to_string(),
            enabled: true,
        }
    }
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| {
                // Fallback: ~ is not expanded by PathBuf, so use dirs::home_dir
                dirs::home_dir()
                    .map(|h| h.join(".config"))
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
            })
            .join("orbit")
            .join("config.toml")
    }

    /// Load config from the default location, or return defaults if it is
    /// missing or broken
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), "Failed to load config: {}", e);
                Self::default()
            }
        }
    }

    /// Load and validate config from `path`
    pub fn load_from(path: &Path) -> OrbitResult<Self> {
        let content = fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.validate();
        Ok(config)
    }

    /// Validate and clamp config values to acceptable ranges
    fn validate(&mut self) {
        // Budget must leave room for at least one extension to answer
        self.query.budget_ms = self.query.budget_ms.clamp(10, 2000);
        self.query.flush_interval_ms = self.query.flush_interval_ms.clamp(10, 1000);

        if !(self.index.delta >= 0.0) {
            self.index.delta = 0.0;
        }
        self.index.q = self.index.q.clamp(1, crate::index::MAX_Q);

        // Engines without a trigger could never be reached
        self.websearch.retain(|engine| {
            let keep = !engine.trigger.trim().is_empty();
            if !keep {
                tracing::warn!(engine = %engine.name, "Ignoring web search engine without trigger");
            }
            keep
        });
    }

    /// Timing knobs for the dispatcher
    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            budget: Duration::from_millis(self.query.budget_ms),
            flush_interval: Duration::from_millis(self.query.flush_interval_ms),
            hook_warn: Duration::from_millis(self.query.hook_warn_ms),
        }
    }

    /// Save config to the default location
    pub fn save(&self) -> OrbitResult<()> {
        self.save_to(&Self::config_path())
    }

    /// Save config to `path`, creating parent directories as needed
    pub fn save_to(&self, path: &Path) -> OrbitResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.query.budget_ms, 100);
        assert_eq!(config.query.flush_interval_ms, 50);
        assert!(!config.index.fuzzy);
        assert_eq!(config.index.q, 3);
        assert!(config.calculator.enabled);

        let triggers: Vec<&str> = config.websearch.iter().map(|w| w.trigger.as_str()).collect();
        assert_eq!(triggers, ["gg", "wiki", "yt"]);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[index]
fuzzy = true

[[aliases]]
keyword = "gh"
name = "GitHub"
target = "https://github.com"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert!(config.index.fuzzy);
        assert_eq!(config.index.q, 3);
        assert_eq!(config.query.budget_ms, 100);
        assert_eq!(config.aliases.len(), 1);
        assert!(config.aliases[0].is_url());
        assert_eq!(config.websearch.len(), 3);
    }

    #[test]
    fn test_values_are_clamped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[query]
budget_ms = 1
flush_interval_ms = 99999

[index]
delta = -3.0
q = 0

[[websearch]]
name = "Broken"
trigger = " "
url = "https://example.com/?q={query}"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.query.budget_ms, 10);
        assert_eq!(config.query.flush_interval_ms, 1000);
        assert_eq!(config.index.delta, 0.0);
        assert_eq!(config.index.q, 1);
        assert!(config.websearch.is_empty());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[query\nbudget_ms = ").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.query.budget_ms = 250;
        config.aliases.push(AliasConfig {
            keyword: "term".to_string(),
            name: "Terminal".to_string(),
            target: "alacritty".to_string(),
        });
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.query.budget_ms, 250);
        assert_eq!(loaded.aliases, config.aliases);
        assert_eq!(loaded.websearch, config.websearch);
    }

    #[test]
    fn test_dispatch_config() {
        let config = Config::default();
        let dispatch = config.dispatch_config();
        assert_eq!(dispatch.budget, Duration::from_millis(100));
        assert_eq!(dispatch.flush_interval, Duration::from_millis(50));
        assert_eq!(dispatch.hook_warn, Duration::from_millis(50));
    }

    #[test]
    fn test_websearch_url() {
        let engine = WebSearchConfig::new("Google", "gg", "https://www.google.com/search?q={query}");
        assert_eq!(
            engine.resolve_url("rust lang"),
            "https://www.google.com/search?q=rust%20lang"
        );

        let plain = WebSearchConfig::new("Home", "home", "https://example.com");
        assert_eq!(plain.resolve_url("ignored"), "https://example.com");
    }

    #[test]
    fn test_usage_path_expands_tilde() {
        let usage = UsageConfig::default();
        let path = usage.resolved_path();
        assert!(!path.to_string_lossy().starts_with('~'));
        assert!(path.ends_with("orbit/usage.json"));
    }
}
