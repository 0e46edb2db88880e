//! Configuration loading
//!
//! Resolution priority for the config file location:
//! 1. Command-line argument (highest priority)
//! 2. `SCAMLENS_CONFIG` environment variable
//! 3. Platform config directory (`<config_dir>/scamlens/config.toml`)
//! 4. Compiled defaults (fallback)
//!
//! A missing config file logs a warning and starts with compiled defaults;
//! only an unreadable or malformed file is an error.

use crate::{Error, Result};
use scamlens_fusion::{BandSet, BandSpec, BrandEntry, FusionPolicy, WeightTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Top-level application configuration, loaded once at startup and treated
/// as read-only for the lifetime of the process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub site: SiteConfig,
    pub phone: PhoneConfig,
    /// Fusion floors and brand-rule constants shared by both domains
    pub policy: FusionPolicy,
    pub providers: ProvidersConfig,
    /// Known brands with verified domains and detector aliases
    pub brands: Vec<BrandEntry>,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5711,
        }
    }
}

/// Site-clone analysis domain configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Base per-source weights, renormalized per request over the available
    /// sources
    pub weights: WeightTable,
    /// Decision ladder (safe first); invalid ladders fall back to defaults
    pub bands: Vec<BandSpec>,
    /// Weight added to the brand matcher when logos were detected
    pub logo_boost: f64,
    /// Weight added to the visual judge when extracted page text is long
    pub text_boost: f64,
    /// Page-text length that triggers `text_boost`
    pub text_boost_chars: usize,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            weights: WeightTable::from([
                ("visual_judge".to_string(), 0.4),
                ("brand_matcher".to_string(), 0.3),
                ("ml_classifier".to_string(), 0.15),
                ("url_heuristics".to_string(), 0.15),
            ]),
            bands: default_band_specs(&BandSet::site_default()),
            logo_boost: 0.1,
            text_boost: 0.1,
            text_boost_chars: 1000,
        }
    }
}

impl SiteConfig {
    /// Build the site band set, falling back to compiled defaults (with a
    /// warning) if the configured ladder is invalid.
    pub fn band_set(&self) -> BandSet {
        band_set_or_default(&self.bands, BandSet::site_default, "site")
    }
}

/// Phone-reputation domain configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhoneConfig {
    pub weights: WeightTable,
    pub bands: Vec<BandSpec>,
}

impl Default for PhoneConfig {
    fn default() -> Self {
        Self {
            weights: WeightTable::from([
                ("reputation:ipqs".to_string(), 0.4),
                ("reputation:telesign".to_string(), 0.35),
                ("user_reports".to_string(), 0.25),
            ]),
            bands: default_band_specs(&BandSet::phone_default()),
        }
    }
}

impl PhoneConfig {
    pub fn band_set(&self) -> BandSet {
        band_set_or_default(&self.bands, BandSet::phone_default, "phone")
    }
}

/// One external collaborator endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderEndpoint {
    pub endpoint: String,
    /// Per-call timeout; a collaborator that misses it counts as failed
    pub timeout_secs: u64,
    pub api_key: Option<String>,
    /// Outbound rate limit, when the provider's policy requires one
    pub requests_per_second: Option<u32>,
}

impl Default for ProviderEndpoint {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            timeout_secs: 15,
            api_key: None,
            requests_per_second: None,
        }
    }
}

impl ProviderEndpoint {
    pub fn new(endpoint: &str, timeout_secs: u64) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            timeout_secs,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub visual_judge: ProviderEndpoint,
    pub brand_matcher: ProviderEndpoint,
    pub ml_classifier: ProviderEndpoint,
    /// Phone reputation providers, keyed by provider name
    pub reputation: BTreeMap<String, ProviderEndpoint>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        let mut reputation = BTreeMap::new();
        reputation.insert(
            "ipqs".to_string(),
            ProviderEndpoint {
                requests_per_second: Some(2),
                ..ProviderEndpoint::new("http://127.0.0.1:5801/ipqs", 10)
            },
        );
        reputation.insert(
            "telesign".to_string(),
            ProviderEndpoint {
                requests_per_second: Some(2),
                ..ProviderEndpoint::new("http://127.0.0.1:5802/telesign", 10)
            },
        );
        Self {
            visual_judge: ProviderEndpoint::new("http://127.0.0.1:5003/judge", 30),
            brand_matcher: ProviderEndpoint::new("http://127.0.0.1:5000/detect", 60),
            ml_classifier: ProviderEndpoint::new("http://127.0.0.1:5001/predict", 15),
            reputation,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum reports held by the in-memory store before FIFO eviction
    pub report_store_capacity: usize,
    /// Maximum page-text length forwarded to collaborators
    pub page_text_limit: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            report_store_capacity: 10_000,
            page_text_limit: 3000,
        }
    }
}

impl AppConfig {
    /// Load configuration following the documented priority order.
    ///
    /// Missing file: warning + compiled defaults. Unreadable or malformed
    /// file: error.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let path = cli_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("SCAMLENS_CONFIG").ok().map(PathBuf::from))
            .or_else(default_config_path);

        match path {
            Some(path) if path.exists() => {
                tracing::info!(path = %path.display(), "loading configuration");
                Self::from_file(&path)
            }
            Some(path) => {
                tracing::warn!(
                    path = %path.display(),
                    "config file not found; using compiled defaults"
                );
                Ok(Self::default())
            }
            None => {
                tracing::warn!("no config directory available; using compiled defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Config(format!("invalid config: {e}")))
    }
}

/// Default config file path for the platform.
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("scamlens").join("config.toml"))
}

fn default_band_specs(bands: &BandSet) -> Vec<BandSpec> {
    bands.specs().to_vec()
}

fn band_set_or_default(
    specs: &[BandSpec],
    default: fn() -> BandSet,
    domain: &str,
) -> BandSet {
    match BandSet::try_new(specs.to_vec()) {
        Ok(bands) => bands,
        Err(e) => {
            tracing::warn!(domain, error = %e, "invalid band configuration; using defaults");
            default()
        }
    }
}
