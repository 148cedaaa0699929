use crate::dates::Locale;
use crate::poller::PollOptions;
use crate::source::DEFAULT_PAYLOAD_FIELD;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Fichier lu s'il existe quand aucun `--config` n'est donné.
pub const DEFAULT_CONFIG_FILE: &str = "escala.toml";

/// Configuration : défauts, puis fichier TOML, puis variables `ESCALA_*`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Endpoint JSON des turnos
    pub endpoint: String,
    /// Champ enveloppant les lignes (`{ "turnos": [...] }`)
    pub payload_field: String,
    pub poll_interval_ms: u64,
    /// Pas de timeout par défaut : celui du transport s'applique.
    pub request_timeout_ms: Option<u64>,
    pub state_path: PathBuf,
    pub locale: Locale,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/api/turnos".to_string(),
            payload_field: DEFAULT_PAYLOAD_FIELD.to_string(),
            poll_interval_ms: 15_000,
            request_timeout_ms: None,
            state_path: PathBuf::from("escala-state.json"),
            locale: Locale::Es,
        }
    }
}

impl Config {
    /// Charge la configuration complète.
    ///
    /// Un chemin explicite doit exister ; le fichier par défaut est optionnel.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Applique les surcharges `ESCALA_*` fournies par `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("ESCALA_ENDPOINT") {
            self.endpoint = v;
        }
        if let Some(v) = lookup("ESCALA_PAYLOAD_FIELD") {
            self.payload_field = v;
        }
        if let Some(v) = lookup("ESCALA_POLL_INTERVAL_MS") {
            self.poll_interval_ms = v
                .trim()
                .parse()
                .with_context(|| format!("invalid ESCALA_POLL_INTERVAL_MS: {v}"))?;
        }
        if let Some(v) = lookup("ESCALA_REQUEST_TIMEOUT_MS") {
            let ms = v
                .trim()
                .parse()
                .with_context(|| format!("invalid ESCALA_REQUEST_TIMEOUT_MS: {v}"))?;
            self.request_timeout_ms = Some(ms);
        }
        if let Some(v) = lookup("ESCALA_STATE_PATH") {
            self.state_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("ESCALA_LOCALE") {
            self.locale = v.parse().map_err(anyhow::Error::msg)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            bail!("endpoint cannot be empty");
        }
        if self.payload_field.trim().is_empty() {
            bail!("payload_field cannot be empty");
        }
        if self.poll_interval_ms == 0 {
            bail!("poll_interval_ms must be > 0");
        }
        if self.request_timeout_ms == Some(0) {
            bail!("request_timeout_ms must be > 0 when set");
        }
        Ok(())
    }

    pub fn poll_options(&self) -> PollOptions {
        PollOptions {
            interval: Duration::from_millis(self.poll_interval_ms),
            locale: self.locale,
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}
