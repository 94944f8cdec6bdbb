use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::RecommenderConfig;
use crate::models::ScoringWeights;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub catalog: CatalogSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub knowledge: KnowledgeSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

/// Where the college catalog comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSource {
    #[default]
    File,
    Http,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSettings {
    #[serde(default)]
    pub source: CatalogSource,
    /// JSON catalog for the `file` source
    #[serde(default = "default_catalog_path")]
    pub path: PathBuf,
    /// Base URL for the `http` source
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    /// Connection string for the `postgres` source
    pub database_url: Option<String>,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            source: CatalogSource::default(),
            path: default_catalog_path(),
            endpoint: None,
            api_key: None,
            database_url: None,
            max_connections: None,
            min_connections: None,
            fetch_timeout_ms: default_fetch_timeout_ms(),
            refresh_secs: default_refresh_secs(),
        }
    }
}

impl CatalogSettings {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn refresh(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }
}

fn default_catalog_path() -> PathBuf { PathBuf::from("data/catalog.json") }
fn default_fetch_timeout_ms() -> u64 { 3000 }
fn default_refresh_secs() -> u64 { 300 }

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    /// Enables the Redis tier when set
    pub redis_url: Option<String>,
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_l1_cache_size")]
    pub l1_cache_size: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            redis_url: None,
            ttl_secs: default_cache_ttl_secs(),
            l1_cache_size: default_l1_cache_size(),
        }
    }
}

fn default_cache_ttl_secs() -> u64 { 600 }
fn default_l1_cache_size() -> u64 { 10_000 }

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_geo_limit")]
    pub geo_limit: usize,
    #[serde(default = "default_text_limit")]
    pub text_limit: usize,
    #[serde(default = "default_semantic_limit")]
    pub semantic_limit: usize,
    #[serde(default = "default_semantic_threshold")]
    pub semantic_threshold: f64,
    #[serde(default = "default_top_categories")]
    pub top_categories: usize,
    #[serde(default = "default_relaxed_max_distance_km")]
    pub relaxed_max_distance_km: f64,
    #[serde(default = "default_fallback_min_results")]
    pub fallback_min_results: usize,
    #[serde(default = "default_debug_top_n")]
    pub debug_top_n: usize,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            geo_limit: default_geo_limit(),
            text_limit: default_text_limit(),
            semantic_limit: default_semantic_limit(),
            semantic_threshold: default_semantic_threshold(),
            top_categories: default_top_categories(),
            relaxed_max_distance_km: default_relaxed_max_distance_km(),
            fallback_min_results: default_fallback_min_results(),
            debug_top_n: default_debug_top_n(),
        }
    }
}

fn default_geo_limit() -> usize { 500 }
fn default_text_limit() -> usize { 200 }
fn default_semantic_limit() -> usize { 200 }
fn default_semantic_threshold() -> f64 { 0.3 }
fn default_top_categories() -> usize { 3 }
fn default_relaxed_max_distance_km() -> f64 { 5000.0 }
fn default_fallback_min_results() -> usize { 1 }
fn default_debug_top_n() -> usize { 10 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub weights: WeightsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_semantic_weight")]
    pub semantic: f64,
    #[serde(default = "default_text_weight")]
    pub text: f64,
    #[serde(default = "default_distance_weight")]
    pub distance: f64,
    #[serde(default = "default_rating_weight")]
    pub rating: f64,
    #[serde(default = "default_availability_weight")]
    pub availability: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            semantic: default_semantic_weight(),
            text: default_text_weight(),
            distance: default_distance_weight(),
            rating: default_rating_weight(),
            availability: default_availability_weight(),
        }
    }
}

impl From<&WeightsConfig> for ScoringWeights {
    fn from(config: &WeightsConfig) -> Self {
        ScoringWeights {
            semantic: config.semantic,
            text: config.text,
            distance: config.distance,
            rating: config.rating,
            availability: config.availability,
        }
    }
}

fn default_semantic_weight() -> f64 { 0.35 }
fn default_text_weight() -> f64 { 0.25 }
fn default_distance_weight() -> f64 { 0.20 }
fn default_rating_weight() -> f64 { 0.15 }
fn default_availability_weight() -> f64 { 0.05 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KnowledgeSettings {
    /// Replacement knowledge table; the built-in one is used when unset
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

/// Output shape of the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event
    #[default]
    Json,
    Pretty,
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            other => Err(format!("unknown log format '{}' (expected json, pretty or compact)", other)),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with CAMPUS__)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., CAMPUS__SERVER__PORT -> server.port
            .add_source(env_source())
            .build()?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(env_source())
            .build()?;

        settings.try_deserialize()
    }

    /// Pipeline tunables derived from the `matching`, `catalog` and `cache` sections
    pub fn recommender_config(&self) -> RecommenderConfig {
        RecommenderConfig {
            geo_limit: self.matching.geo_limit,
            text_limit: self.matching.text_limit,
            semantic_limit: self.matching.semantic_limit,
            semantic_threshold: self.matching.semantic_threshold,
            top_categories: self.matching.top_categories,
            relaxed_max_distance_km: self.matching.relaxed_max_distance_km,
            fallback_min_results: self.matching.fallback_min_results,
            fetch_timeout: self.catalog.fetch_timeout(),
            cache_ttl: Duration::from_secs(self.cache.ttl_secs),
        }
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("CAMPUS")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}
