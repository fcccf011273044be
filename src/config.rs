use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::catalog::{StoreConfig, DEFAULT_CATALOG_URL};
use crate::predict::{
    Coordinate, WindowConfig, DEFAULT_FUTURE_SPAN, DEFAULT_PAST_SPAN, DEFAULT_RANGE_KM,
    DEFAULT_SAMPLES,
};
use crate::visibility::{RangeQuery, DEFAULT_TTL};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid reference coordinates: {0}")]
    InvalidCoordinates(String),
    #[error("Invalid value: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub reference: ReferenceConfig,
    #[serde(default = "default_range_km")]
    pub range_km: f64,
    #[serde(default)]
    pub windows: WindowsConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub web: WebConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceConfig {
    pub name: Option<String>,
    /// `"lat, lon"` in degrees
    pub coordinates: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WindowsConfig {
    #[serde(default = "default_samples")]
    pub samples: usize,
    #[serde(default = "default_past", deserialize_with = "deserialize_duration")]
    pub past: Duration,
    #[serde(default = "default_future", deserialize_with = "deserialize_duration")]
    pub future: Duration,
}

impl Default for WindowsConfig {
    fn default() -> Self {
        Self {
            samples: default_samples(),
            past: default_past(),
            future: default_future(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_url")]
    pub url: String,
    #[serde(default = "default_catalog_folder")]
    pub folder: PathBuf,
    #[serde(default = "default_catalog_prefix")]
    pub prefix: String,
    #[serde(default = "default_keep")]
    pub keep: usize,
    #[serde(default = "default_timeout", deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_backoff", deserialize_with = "deserialize_duration")]
    pub backoff: Duration,
    #[serde(default = "default_true")]
    pub serve_stale: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: default_catalog_url(),
            folder: default_catalog_folder(),
            prefix: default_catalog_prefix(),
            keep: default_keep(),
            timeout: default_timeout(),
            retries: default_retries(),
            backoff: default_backoff(),
            serve_stale: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
    #[serde(default = "default_ttl", deserialize_with = "deserialize_duration")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
            ttl: default_ttl(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_range_km() -> f64 {
    DEFAULT_RANGE_KM
}

fn default_samples() -> usize {
    DEFAULT_SAMPLES
}

fn default_past() -> Duration {
    DEFAULT_PAST_SPAN.to_std().unwrap_or_default()
}

fn default_future() -> Duration {
    DEFAULT_FUTURE_SPAN.to_std().unwrap_or_default()
}

fn default_catalog_url() -> String {
    DEFAULT_CATALOG_URL.to_string()
}

fn default_catalog_folder() -> PathBuf {
    PathBuf::from("catalog")
}

fn default_catalog_prefix() -> String {
    "gnss".to_string()
}

fn default_keep() -> usize {
    3
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_retries() -> u32 {
    3
}

fn default_backoff() -> Duration {
    Duration::from_secs(2)
}

fn default_true() -> bool {
    true
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("visibility_cache.bin")
}

fn default_ttl() -> Duration {
    DEFAULT_TTL.to_std().unwrap_or_default()
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom)
}

fn to_chrono(d: Duration, what: &str) -> Result<chrono::Duration, ConfigError> {
    chrono::Duration::from_std(d).map_err(|e| ConfigError::Invalid(format!("{}: {}", what, e)))
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Human-readable name of the reference point, falling back to its
    /// coordinates.
    pub fn reference_label(&self) -> &str {
        self.reference
            .name
            .as_deref()
            .unwrap_or(&self.reference.coordinates)
    }

    pub fn reference(&self) -> Result<Coordinate, ConfigError> {
        Coordinate::from_coordinates(&self.reference.coordinates)
            .ok_or_else(|| ConfigError::InvalidCoordinates(self.reference.coordinates.clone()))
    }

    pub fn default_query(&self) -> Result<RangeQuery, ConfigError> {
        let query = RangeQuery {
            reference: self.reference()?,
            radius_km: self.range_km,
        };
        query.validate().map_err(ConfigError::Invalid)?;
        Ok(query)
    }

    pub fn window_config(&self) -> Result<WindowConfig, ConfigError> {
        Ok(WindowConfig {
            samples: self.windows.samples,
            past_span: to_chrono(self.windows.past, "windows.past")?,
            future_span: to_chrono(self.windows.future, "windows.future")?,
        })
    }

    pub fn cache_ttl(&self) -> Result<chrono::Duration, ConfigError> {
        to_chrono(self.cache.ttl, "cache.ttl")
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            url: self.catalog.url.clone(),
            folder: self.catalog.folder.clone(),
            prefix: self.catalog.prefix.clone(),
            keep: self.catalog.keep,
            retries: self.catalog.retries,
            backoff: self.catalog.backoff,
            serve_stale: self.catalog.serve_stale,
        }
    }
}
