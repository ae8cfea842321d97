//! Settings layered from `trellis.toml`, `.env`/environment and flags

use anyhow::Context;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use trellis_model::Config;

pub const DEFAULT_FILE: &str = "trellis.toml";
pub const ROUTER_VAR: &str = "TRELLIS_ROUTER";
pub const TIMEOUT_VAR: &str = "TRELLIS_TIMEOUT_MS";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub router: Option<String>,
    pub timeout_ms: Option<u64>,
    pub headers: BTreeMap<String, String>,
    /// JSON file holding a graph seed.
    pub cache: Option<PathBuf>,
}

impl Settings {
    /// Load from `path`; a missing file gives the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!("No settings file at {}", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
    }

    /// Overlay `TRELLIS_*` variables.
    pub fn with_env<I>(mut self, vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            match name.as_str() {
                ROUTER_VAR => self.router = Some(value),
                TIMEOUT_VAR => {
                    let ms = value
                        .parse()
                        .with_context(|| format!("{TIMEOUT_VAR} must be milliseconds, got {value:?}"))?;
                    self.timeout_ms = Some(ms);
                }
                _ => {}
            }
        }
        Ok(self)
    }

    pub fn with_flags(
        mut self,
        router: Option<String>,
        timeout_ms: Option<u64>,
        headers: Vec<(String, String)>,
    ) -> Self {
        if router.is_some() {
            self.router = router;
        }
        if timeout_ms.is_some() {
            self.timeout_ms = timeout_ms;
        }
        self.headers.extend(headers);
        self
    }

    /// Build the binding options, reading the cache seed if one is named.
    pub fn to_config(&self) -> anyhow::Result<Config> {
        let mut config = Config::new();
        config.router = self.router.clone();
        config.timeout = self.timeout_ms.map(Duration::from_millis);
        if !self.headers.is_empty() {
            config.headers = Some(self.headers.clone());
        }
        if let Some(path) = &self.cache {
            config.cache = Some(read_json(path)?);
        }
        Ok(config)
    }
}

/// `.env` entries followed by the process environment, so the latter wins.
pub fn environment() -> Vec<(String, String)> {
    let mut vars: Vec<(String, String)> = match dotenvy::dotenv_iter() {
        Ok(iter) => iter.filter_map(Result::ok).collect(),
        Err(_) => Vec::new(),
    };
    vars.extend(std::env::vars().filter(|(name, _)| name.starts_with("TRELLIS_")));
    vars
}

pub fn read_json(path: &Path) -> anyhow::Result<serde_json::Value> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

/// Parse `name=value` header flags.
pub fn parse_header(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| format!("expected name=value, got {raw:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(&dir.path().join(DEFAULT_FILE)).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_layering_order() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "router = \"http://file/model.json\"\ntimeout_ms = 100\n\n[headers]\nx-app = \"trellis\""
        )
        .unwrap();

        let settings = Settings::load(file.path())
            .unwrap()
            .with_env(vars(&[(ROUTER_VAR, "http://env/model.json"), ("HOME", "/root")]))
            .unwrap()
            .with_flags(None, Some(250), vec![("x-user".into(), "ada".into())]);

        assert_eq!(settings.router.as_deref(), Some("http://env/model.json"));
        assert_eq!(settings.timeout_ms, Some(250));
        assert_eq!(settings.headers.len(), 2);

        let config = settings.to_config().unwrap();
        assert_eq!(config.timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.headers.unwrap().get("x-app").map(String::as_str), Some("trellis"));
    }

    #[test]
    fn test_bad_timeout_is_reported() {
        let err = Settings::default()
            .with_env(vars(&[(TIMEOUT_VAR, "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains(TIMEOUT_VAR));
    }

    #[test]
    fn test_cache_seed_is_read() {
        let dir = TempDir::new().unwrap();
        let seed = dir.path().join("seed.json");
        std::fs::write(&seed, r#"{ "a": { "$type": "atom", "value": 1 } }"#).unwrap();

        let settings = Settings {
            cache: Some(seed),
            ..Settings::default()
        };
        let config = settings.to_config().unwrap();
        assert!(config.cache.is_some());
        assert!(config.router.is_none());
    }

    #[test]
    fn test_parse_header() {
        assert_eq!(parse_header("x-user = ada"), Ok(("x-user".to_string(), "ada".to_string())));
        assert!(parse_header("novalue").is_err());
        assert!(parse_header("=x").is_err());
    }
}
