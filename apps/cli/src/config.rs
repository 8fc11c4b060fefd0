use std::{collections::HashMap, fs, path::PathBuf};

use anyhow::{bail, Context};
use client_core::DEFAULT_API_URL;
use url::Url;

pub const CONFIG_FILE: &str = "eventsphere.toml";
const DEFAULT_LOG: &str = "warn";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_url: String,
    pub session_file: PathBuf,
    pub log: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            session_file: default_session_file(),
            log: DEFAULT_LOG.into(),
        }
    }
}

/// Command-line values; each one set wins over file and environment.
#[derive(Debug, Default)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub session_file: Option<PathBuf>,
    pub log: Option<String>,
}

impl Settings {
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(v) = overrides.api_url {
            self.api_url = v;
        }
        if let Some(v) = overrides.session_file {
            self.session_file = v;
        }
        if let Some(v) = overrides.log {
            self.log = v;
        }
        self
    }
}

pub fn load_settings() -> Settings {
    let file = fs::read_to_string(CONFIG_FILE).ok();
    resolve(file.as_deref(), |key| std::env::var(key).ok())
}

fn resolve(file: Option<&str>, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = file {
        match toml::from_str::<HashMap<String, String>>(raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.get("api_url") {
                    settings.api_url = v.clone();
                }
                if let Some(v) = file_cfg.get("session_file") {
                    settings.session_file = PathBuf::from(v);
                }
                if let Some(v) = file_cfg.get("log") {
                    settings.log = v.clone();
                }
            }
            Err(err) => eprintln!("ignoring {CONFIG_FILE}: {err}"),
        }
    }

    if let Some(v) = env("EVENTSPHERE_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = env("APP__API_URL") {
        settings.api_url = v;
    }

    if let Some(v) = env("EVENTSPHERE_SESSION_FILE") {
        settings.session_file = PathBuf::from(v);
    }
    if let Some(v) = env("APP__SESSION_FILE") {
        settings.session_file = PathBuf::from(v);
    }

    if let Some(v) = env("EVENTSPHERE_LOG") {
        settings.log = v;
    }
    if let Some(v) = env("APP__LOG") {
        settings.log = v;
    }

    settings
}

fn default_session_file() -> PathBuf {
    dirs::data_local_dir()
        .map(|base| base.join("eventsphere").join("session.json"))
        .unwrap_or_else(|| PathBuf::from(".eventsphere-session.json"))
}

/// Accepts `host:port` shorthand and checks the result is an http(s) URL.
pub fn prepare_api_url(raw_api_url: &str) -> anyhow::Result<String> {
    let raw_api_url = raw_api_url.trim();
    if raw_api_url.is_empty() {
        return Ok(DEFAULT_API_URL.to_string());
    }

    let candidate = if raw_api_url.contains("://") {
        raw_api_url.to_string()
    } else {
        format!("http://{raw_api_url}")
    };

    let url = Url::parse(&candidate)
        .with_context(|| format!("invalid api url '{raw_api_url}'"))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        bail!("invalid api url '{raw_api_url}': expected http(s)://host[:port]");
    }
    Ok(candidate)
}
