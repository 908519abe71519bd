//! Configuration management with TOML, environment variables, and CLI overrides.

use crate::pricing::LocalSeller;
use crate::sources::abebooks::ItemCondition;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Currency every price is converted into
    #[serde(default = "default_home_currency")]
    pub home_currency: String,

    /// Home-per-foreign rates used when the live rate service is unreachable
    #[serde(default = "default_fallback_rates")]
    pub fallback_rates: BTreeMap<String, f64>,

    /// Exchange-rate service root; `None` uses the fallback rates only
    #[serde(default = "default_rate_api_url")]
    pub rate_api_url: Option<String>,

    /// Proxy URL (e.g., socks5://host:port)
    #[serde(default)]
    pub proxy: Option<String>,

    /// Minimum delay between two requests to the same source in batch mode
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Random jitter added to delay (0 to this value)
    #[serde(default = "default_delay_jitter_ms")]
    pub delay_jitter_ms: u64,

    /// Per-source fetch timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Output format
    #[serde(default)]
    pub format: OutputFormat,

    /// Sources to search; empty means every registered source
    #[serde(default)]
    pub sources: Vec<String>,

    /// BiblioCommons subdomains, one catalog source each
    #[serde(default = "default_libraries")]
    pub libraries: Vec<String>,

    #[serde(default)]
    pub marketplace: MarketplaceConfig,

    /// Sellers treated as local: free pickup, possibly mis-tagged currency
    #[serde(default = "default_local_sellers")]
    pub local_sellers: Vec<LocalSeller>,

    /// Sellers located in this city are also treated as local
    #[serde(default = "default_home_city")]
    pub home_city: Option<String>,

    /// Kobo store locale path
    #[serde(default = "default_kobo_store")]
    pub kobo_store: String,

    /// Currency the Kobo store prices in
    #[serde(default = "default_home_currency")]
    pub kobo_currency: String,

    /// Keep Anna's Archive results listed after its "partial match" banner
    #[serde(default)]
    pub include_partial_matches: bool,

    /// Maximum rows printed per table
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
}

/// Settings for the used-book marketplace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketplaceConfig {
    #[serde(default)]
    pub condition: ItemCondition,

    /// Listings must ship to this destination
    #[serde(default = "default_ship_to")]
    pub ship_to: String,

    /// Currency listings are expected to be priced in
    #[serde(default = "default_marketplace_currency")]
    pub currency: String,

    /// Restrict results to these seller ids; empty means all sellers
    #[serde(default)]
    pub seller_ids: Vec<u64>,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            condition: ItemCondition::default(),
            ship_to: default_ship_to(),
            currency: default_marketplace_currency(),
            seller_ids: Vec::new(),
        }
    }
}

fn default_home_currency() -> String {
    "CAD".to_string()
}

fn default_fallback_rates() -> BTreeMap<String, f64> {
    BTreeMap::from([("USD".to_string(), 1.35)])
}

fn default_rate_api_url() -> Option<String> {
    Some("https://open.er-api.com/v6".to_string())
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_delay_jitter_ms() -> u64 {
    500
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_libraries() -> Vec<String> {
    vec!["epl".to_string(), "calgary".to_string()]
}

fn default_local_sellers() -> Vec<LocalSeller> {
    vec![
        LocalSeller::new("Alhambra Books", Some("alhambra"), false),
        LocalSeller::new("Mister-Seekers Books", Some("misterseeker"), false),
        LocalSeller::new("The Bookseller", Some("bookseller"), false),
        LocalSeller::new("The Great Catsby's Rare Books", Some("catsby"), false),
        // Lists Canadian prices under a USD tag
        LocalSeller::new("Edmonton Book Store", Some("edmonton"), true),
    ]
}

fn default_home_city() -> Option<String> {
    Some("Edmonton".to_string())
}

fn default_kobo_store() -> String {
    "ca/en".to_string()
}

fn default_ship_to() -> String {
    "Canada".to_string()
}

fn default_marketplace_currency() -> String {
    "USD".to_string()
}

fn default_max_rows() -> usize {
    20
}

impl Default for Config {
    fn default() -> Self {
        Self {
            home_currency: default_home_currency(),
            fallback_rates: default_fallback_rates(),
            rate_api_url: default_rate_api_url(),
            proxy: None,
            delay_ms: default_delay_ms(),
            delay_jitter_ms: default_delay_jitter_ms(),
            timeout_secs: default_timeout_secs(),
            format: OutputFormat::Table,
            sources: Vec::new(),
            libraries: default_libraries(),
            marketplace: MarketplaceConfig::default(),
            local_sellers: default_local_sellers(),
            home_city: default_home_city(),
            kobo_store: default_kobo_store(),
            kobo_currency: default_home_currency(),
            include_partial_matches: false,
            max_rows: default_max_rows(),
        }
    }
}

impl Config {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads configuration with fallback to default locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        // 1. Explicit path takes precedence
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        // 2. Try current directory
        let local_config = Path::new("config.toml");
        if local_config.exists() {
            debug!("Found config.toml in current directory");
            return Self::from_file(local_config);
        }

        // 3. Try XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("book-scout").join("config.toml");
            if xdg_config.exists() {
                debug!("Found config in XDG config directory");
                return Self::from_file(xdg_config);
            }
        }

        // 4. Return default config
        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Applies environment variable overrides.
    pub fn with_env(mut self) -> Self {
        if let Ok(proxy) = std::env::var("BOOK_SCOUT_PROXY") {
            self.proxy = Some(proxy);
        }

        if let Ok(delay) = std::env::var("BOOK_SCOUT_DELAY") {
            if let Ok(d) = delay.parse() {
                self.delay_ms = d;
            }
        }

        if let Ok(timeout) = std::env::var("BOOK_SCOUT_TIMEOUT") {
            if let Ok(t) = timeout.parse() {
                self.timeout_secs = t;
            }
        }

        if let Ok(currency) = std::env::var("BOOK_SCOUT_HOME_CURRENCY") {
            if currency.len() == 3 && currency.chars().all(|c| c.is_ascii_alphabetic()) {
                self.home_currency = currency.to_uppercase();
            }
        }

        self
    }
}

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Markdown,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use: table, json, markdown, csv", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}
