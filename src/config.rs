//! Configuration for shelfwise.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (SHELFWISE_HOME, GOOGLE_BOOKS_API_KEY)
//! 2. Config file (.shelfwise/config.yaml)
//! 3. Defaults (~/.shelfwise, public API endpoints)
//!
//! Config file discovery:
//! - Searches current directory and parents for .shelfwise/config.yaml
//! - `paths.home` in the config file is relative to the .shelfwise/ directory

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::{google_books, open_library, OrderBy};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub catalog: Option<CatalogConfig>,
    #[serde(default)]
    pub enrichment: Option<EnrichmentConfig>,
    #[serde(default)]
    pub search: Option<SearchConfig>,
    #[serde(default)]
    pub explore: Option<ExploreConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to the .shelfwise/ directory)
    pub home: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnrichmentConfig {
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub debounce_ms: Option<u64>,
    pub max_results: Option<u32>,
    pub order_by: Option<OrderBy>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExploreConfig {
    pub stagger_ms: Option<u64>,
    pub max_results: Option<u32>,
}

/// Resolved configuration with absolute paths and defaults applied
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to shelfwise home (persisted state)
    pub home: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub catalog: CatalogSettings,
    pub enrichment: EnrichmentSettings,
    pub search: SearchSettings,
    pub explore: ExploreSettings,
}

impl ResolvedConfig {
    /// Key-value store directory ($SHELFWISE_HOME/store)
    pub fn store_dir(&self) -> PathBuf {
        self.home.join("store")
    }
}

#[derive(Debug, Clone)]
pub struct CatalogSettings {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            base_url: google_books::DEFAULT_BASE_URL.to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnrichmentSettings {
    pub base_url: String,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            base_url: open_library::DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub debounce_ms: u64,
    pub max_results: u32,
    pub order_by: OrderBy,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            max_results: 20,
            order_by: OrderBy::Relevance,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExploreSettings {
    pub stagger_ms: u64,
    pub max_results: u32,
}

impl Default for ExploreSettings {
    fn default() -> Self {
        Self {
            stagger_ms: 500,
            max_results: 10,
        }
    }
}

/// Values taken from the environment
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub home: Option<PathBuf>,
    pub api_key: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            home: std::env::var("SHELFWISE_HOME").ok().map(PathBuf::from),
            api_key: std::env::var("GOOGLE_BOOKS_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
        }
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".shelfwise").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to `base`
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Merge file, environment and defaults
fn resolve(
    file: Option<(PathBuf, ConfigFile)>,
    env: EnvOverrides,
    default_home: PathBuf,
) -> ResolvedConfig {
    let (config_file, config) = match file {
        Some((path, config)) => (Some(path), Some(config)),
        None => (None, None),
    };

    let home = if let Some(home) = env.home {
        home
    } else if let (Some(path), Some(home)) = (
        config_file.as_ref(),
        config.as_ref().and_then(|c| c.paths.home.as_ref()),
    ) {
        let dot_dir = path.parent().unwrap_or(Path::new("."));
        resolve_path(dot_dir, home)
    } else {
        default_home
    };

    let catalog_cfg = config.as_ref().and_then(|c| c.catalog.as_ref());
    let catalog = CatalogSettings {
        base_url: catalog_cfg
            .and_then(|c| c.base_url.clone())
            .unwrap_or_else(|| google_books::DEFAULT_BASE_URL.to_string()),
        api_key: env
            .api_key
            .or_else(|| catalog_cfg.and_then(|c| c.api_key.clone()))
            .filter(|k| !k.is_empty()),
    };

    let enrichment = EnrichmentSettings {
        base_url: config
            .as_ref()
            .and_then(|c| c.enrichment.as_ref())
            .and_then(|e| e.base_url.clone())
            .unwrap_or_else(|| open_library::DEFAULT_BASE_URL.to_string()),
    };

    let search_cfg = config.as_ref().and_then(|c| c.search.as_ref());
    let search_defaults = SearchSettings::default();
    let search = SearchSettings {
        debounce_ms: search_cfg
            .and_then(|s| s.debounce_ms)
            .unwrap_or(search_defaults.debounce_ms),
        max_results: search_cfg
            .and_then(|s| s.max_results)
            .unwrap_or(search_defaults.max_results),
        order_by: search_cfg
            .and_then(|s| s.order_by)
            .unwrap_or(search_defaults.order_by),
    };

    let explore_cfg = config.as_ref().and_then(|c| c.explore.as_ref());
    let explore_defaults = ExploreSettings::default();
    let explore = ExploreSettings {
        stagger_ms: explore_cfg
            .and_then(|e| e.stagger_ms)
            .unwrap_or(explore_defaults.stagger_ms),
        max_results: explore_cfg
            .and_then(|e| e.max_results)
            .unwrap_or(explore_defaults.max_results),
    };

    ResolvedConfig {
        home,
        config_file,
        catalog,
        enrichment,
        search,
        explore,
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".shelfwise");

    let file = match find_config_file() {
        Some(path) => {
            let config = load_config_file(&path)?;
            Some((path, config))
        }
        None => None,
    };

    Ok(resolve(file, EnvOverrides::from_env(), default_home))
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}
