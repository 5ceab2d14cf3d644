use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_COUNTRIES_URL: &str =
    "https://restcountries.com/v2/all?fields=name,capital,region,population,flag,currencies";
const DEFAULT_RATES_URL: &str = "https://open.er-api.com/v6/latest/USD";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Directory holding the country snapshot
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory holding the rendered summary image
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    #[serde(default)]
    pub sources: SourcesConfig,

    #[serde(default)]
    pub gdp: GdpConfig,

    #[serde(default)]
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_countries_url")]
    pub countries_url: String,

    #[serde(default = "default_rates_url")]
    pub rates_url: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Bounds and overrides for the estimated GDP multiplier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GdpConfig {
    #[serde(default = "default_multiplier_min")]
    pub min: f64,

    #[serde(default = "default_multiplier_max")]
    pub max: f64,

    /// Seed for a reproducible multiplier sequence
    #[serde(default)]
    pub seed: Option<u64>,

    /// Use a constant multiplier instead of sampling
    #[serde(default)]
    pub fixed: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_font_dir")]
    pub font_dir: PathBuf,

    #[serde(default = "default_font_family")]
    pub font_family: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

fn default_countries_url() -> String {
    DEFAULT_COUNTRIES_URL.to_string()
}

fn default_rates_url() -> String {
    DEFAULT_RATES_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_multiplier_min() -> f64 {
    1000.0
}

fn default_multiplier_max() -> f64 {
    2000.0
}

fn default_font_dir() -> PathBuf {
    PathBuf::from("fonts")
}

fn default_font_family() -> String {
    "DejaVu Sans".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_dir: default_log_dir(),
            data_dir: default_data_dir(),
            cache_dir: default_cache_dir(),
            sources: SourcesConfig::default(),
            gdp: GdpConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            countries_url: default_countries_url(),
            rates_url: default_rates_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for GdpConfig {
    fn default() -> Self {
        Self {
            min: default_multiplier_min(),
            max: default_multiplier_max(),
            seed: None,
            fixed: None,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            font_dir: default_font_dir(),
            font_family: default_font_family(),
        }
    }
}

impl ServiceConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: ServiceConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the config file if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn summary_image_path(&self) -> PathBuf {
        self.cache_dir.join(crate::module::renderer::SUMMARY_IMAGE_FILE)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if !(self.gdp.min > 0.0 && self.gdp.min < self.gdp.max && self.gdp.max.is_finite()) {
            anyhow::bail!(
                "Invalid [gdp] bounds: expected 0 < min < max < inf, got min={} max={}",
                self.gdp.min,
                self.gdp.max
            );
        }
        if let Some(fixed) = self.gdp.fixed {
            if !(fixed.is_finite() && fixed > 0.0) {
                anyhow::bail!("Invalid [gdp] fixed multiplier: {}", fixed);
            }
        }
        if self.sources.request_timeout_secs == 0 {
            anyhow::bail!("sources.request_timeout_secs must be greater than zero");
        }
        Ok(())
    }
}
