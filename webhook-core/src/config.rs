use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{matcher::MatchPolicy, model::Location};

pub const DEFAULT_PORT: u16 = 10000;
pub const DEFAULT_WEBSITE_URL: &str = "https://nsp.no";
pub const DEFAULT_GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1";
pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

const DEFAULT_KEYWORDS: &[&str] = &[
    "pris",
    "priser",
    "betaling",
    "kontakt",
    "åpningstider",
    "telefon",
    "e-post",
    "adresse",
    "price",
    "payment",
    "contact",
    "hours",
    "phone",
    "email",
];

/// The fixed website scanned by the `get_website_info` intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebsiteConfig {
    pub url: String,
    pub policy: MatchPolicy,
    pub keywords: Vec<String>,
}

impl Default for WebsiteConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_WEBSITE_URL.to_string(),
            policy: MatchPolicy::default(),
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Base URLs of the Open-Meteo APIs. Overridable so tests can point at a mock server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub geocoding: String,
    pub forecast: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            geocoding: DEFAULT_GEOCODING_URL.to_string(),
            forecast: DEFAULT_FORECAST_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Upper bound for every outbound HTTP call.
    pub request_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            request_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Timeouts {
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// port = 10000
///
/// [website]
/// url = "https://nsp.no"
/// policy = "keyword"
///
/// [fallback]
/// name = "Oslo"
/// latitude = 59.91
/// longitude = 10.75
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub port: Option<u16>,
    pub website: WebsiteConfig,
    /// Used whenever geocoding fails or finds nothing.
    pub fallback: Location,
    pub endpoints: Endpoints,
    pub timeouts: Timeouts,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: None,
            website: WebsiteConfig::default(),
            fallback: default_fallback_location(),
            endpoints: Endpoints::default(),
            timeouts: Timeouts::default(),
        }
    }
}

pub fn default_fallback_location() -> Location {
    Location {
        name: "Oslo".to_string(),
        latitude: 59.91,
        longitude: 10.75,
    }
}

impl Config {
    /// Load config from the platform config directory, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    /// Load config from an explicit path; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the platform config directory.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save config to an explicit path, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-webhook", "weather-webhook")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Listening port: explicit flag, then the `PORT` environment value, then the
    /// config file, then [`DEFAULT_PORT`].
    pub fn resolve_port(&self, flag: Option<u16>, env: Option<&str>) -> u16 {
        if let Some(port) = flag {
            return port;
        }

        if let Some(raw) = env {
            match raw.trim().parse::<u16>() {
                Ok(port) => return port,
                Err(_) => tracing::warn!("Ignoring unparsable PORT value {raw:?}"),
            }
        }

        self.port.unwrap_or(DEFAULT_PORT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_deployed_service() {
        let cfg = Config::default();

        assert_eq!(cfg.fallback, default_fallback_location());
        assert_eq!(cfg.fallback.name, "Oslo");
        assert_eq!(cfg.website.url, DEFAULT_WEBSITE_URL);
        assert_eq!(cfg.website.policy, MatchPolicy::Keyword);
        assert!(cfg.website.keywords.iter().any(|k| k == "phone"));
        assert_eq!(cfg.timeouts.request(), Duration::from_secs(10));
    }

    #[test]
    fn partial_toml_keeps_remaining_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            port = 8080

            [website]
            policy = "first-paragraph"
            "#,
        )
        .expect("partial config should parse");

        assert_eq!(cfg.port, Some(8080));
        assert_eq!(cfg.website.policy, MatchPolicy::FirstParagraph);
        assert_eq!(cfg.website.url, DEFAULT_WEBSITE_URL);
        assert!(!cfg.website.keywords.is_empty());
        assert_eq!(cfg.endpoints.geocoding, DEFAULT_GEOCODING_URL);
    }

    #[test]
    fn port_precedence() {
        let mut cfg = Config::default();
        assert_eq!(cfg.resolve_port(None, None), DEFAULT_PORT);

        cfg.port = Some(9000);
        assert_eq!(cfg.resolve_port(None, None), 9000);
        assert_eq!(cfg.resolve_port(None, Some("3000")), 3000);
        assert_eq!(cfg.resolve_port(Some(4000), Some("3000")), 4000);
    }

    #[test]
    fn unparsable_port_env_is_ignored() {
        let cfg = Config::default();
        assert_eq!(cfg.resolve_port(None, Some("not-a-port")), DEFAULT_PORT);
    }

    #[test]
    fn load_from_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.port, None);
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.port = Some(1234);
        cfg.website.url = "https://example.org".to_string();
        cfg.website.policy = MatchPolicy::FirstParagraph;
        cfg.timeouts.request_secs = 3;
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.port, Some(1234));
        assert_eq!(loaded.website.url, "https://example.org");
        assert_eq!(loaded.website.policy, MatchPolicy::FirstParagraph);
        assert_eq!(loaded.timeouts.request_secs, 3);
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "port = \"high\"").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
