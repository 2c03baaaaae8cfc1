// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use pendientes_export::{DEFAULT_EXPORT_FILE, validate_export_path};
use pendientes_sheets::{DEFAULT_DRIVE_BASE_URL, DEFAULT_SHEETS_BASE_URL, Endpoints};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

pub const APP_NAME: &str = "pendientes";
const CONFIG_VERSION: i64 = 1;
const CONFIG_PATH_ENV: &str = "PENDIENTES_CONFIG_PATH";
const DEFAULT_SHEET_NAME: &str = "pendientes";
const DEFAULT_CREDENTIALS_PATH: &str = "creed.json";
const DEFAULT_TIMEOUT: &str = "30s";
const DEFAULT_TITLE: &str = "Gestión Curtiembre";
const DEFAULT_LOGOS: [&str; 2] = ["logo.png", "logo1.png"];
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub sheet: Sheet,
    #[serde(default)]
    pub export: Export,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            sheet: Sheet::default(),
            export: Export::default(),
            ui: Ui::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sheet {
    pub name: Option<String>,
    pub credentials_path: Option<String>,
    pub secrets_path: Option<String>,
    pub timeout: Option<String>,
    pub sheets_base_url: Option<String>,
    pub drive_base_url: Option<String>,
    pub token_url: Option<String>,
}

impl Default for Sheet {
    fn default() -> Self {
        Self {
            name: Some(DEFAULT_SHEET_NAME.to_owned()),
            credentials_path: Some(DEFAULT_CREDENTIALS_PATH.to_owned()),
            secrets_path: None,
            timeout: Some(DEFAULT_TIMEOUT.to_owned()),
            sheets_base_url: None,
            drive_base_url: None,
            token_url: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Export {
    pub path: Option<String>,
}

impl Default for Export {
    fn default() -> Self {
        Self {
            path: Some(DEFAULT_EXPORT_FILE.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub title: Option<String>,
    pub logos: Option<Vec<String>>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            title: Some(DEFAULT_TITLE.to_owned()),
            logos: Some(DEFAULT_LOGOS.iter().map(|logo| (*logo).to_owned()).collect()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub path: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
            path: None,
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let app_dir = app_config_dir()?;
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and put values under [sheet], [export], [ui], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if self.sheet_name().trim().is_empty() {
            bail!("sheet.name in {} must not be empty", path.display());
        }

        if let Some(timeout) = &self.sheet.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "sheet.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        for (key, value) in [
            ("sheet.sheets_base_url", &self.sheet.sheets_base_url),
            ("sheet.drive_base_url", &self.sheet.drive_base_url),
            ("sheet.token_url", &self.sheet.token_url),
        ] {
            if let Some(url) = value
                && !(url.starts_with("http://") || url.starts_with("https://"))
            {
                bail!(
                    "{key} in {} must be an http(s) URL, got {url:?}",
                    path.display()
                );
            }
        }

        validate_export_path(&self.export_path())
            .with_context(|| format!("export.path in {}", path.display()))?;

        EnvFilter::try_new(self.log_level()).map_err(|error| {
            anyhow!(
                "log.level in {} is not a valid filter ({error}); use e.g. \"info\" or \"pendientes=debug\"",
                path.display()
            )
        })?;

        Ok(())
    }

    pub fn sheet_name(&self) -> &str {
        self.sheet.name.as_deref().unwrap_or(DEFAULT_SHEET_NAME)
    }

    pub fn credentials_path(&self) -> PathBuf {
        PathBuf::from(
            self.sheet
                .credentials_path
                .as_deref()
                .unwrap_or(DEFAULT_CREDENTIALS_PATH),
        )
    }

    pub fn secrets_path(&self) -> Result<PathBuf> {
        match &self.sheet.secrets_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => Ok(app_config_dir()?.join("secrets.toml")),
        }
    }

    pub fn timeout(&self) -> Result<Duration> {
        parse_duration(self.sheet.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            sheets: self
                .sheet
                .sheets_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_SHEETS_BASE_URL.to_owned()),
            drive: self
                .sheet
                .drive_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_DRIVE_BASE_URL.to_owned()),
            token: self.sheet.token_url.clone(),
        }
    }

    pub fn export_path(&self) -> PathBuf {
        PathBuf::from(self.export.path.as_deref().unwrap_or(DEFAULT_EXPORT_FILE))
    }

    pub fn title(&self) -> &str {
        self.ui.title.as_deref().unwrap_or(DEFAULT_TITLE)
    }

    /// Configured logos that exist on disk, in order.
    pub fn present_logos(&self) -> Vec<String> {
        let configured = match &self.ui.logos {
            Some(logos) => logos.clone(),
            None => DEFAULT_LOGOS.iter().map(|logo| (*logo).to_owned()).collect(),
        };
        configured
            .into_iter()
            .filter(|logo| Path::new(logo).is_file())
            .collect()
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        match &self.log.path {
            Some(path) => Ok(PathBuf::from(path)),
            None => {
                let data_root = dirs::data_local_dir().ok_or_else(|| {
                    anyhow!("cannot resolve data directory; set [log].path in the config")
                })?;
                Ok(data_root.join(APP_NAME).join("pendientes.log"))
            }
        }
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# pendientes config\n# Place this file at: {}\n\nversion = 1\n\n[sheet]\nname = \"{DEFAULT_SHEET_NAME}\"\n# Local service-account key, used when no hosted secret is found.\ncredentials_path = \"{DEFAULT_CREDENTIALS_PATH}\"\n# TOML file with a [gcp_service_account] table. Default is <config dir>/pendientes/secrets.toml\n# secrets_path = \"/absolute/path/to/secrets.toml\"\ntimeout = \"{DEFAULT_TIMEOUT}\"\n# sheets_base_url = \"{DEFAULT_SHEETS_BASE_URL}\"\n# drive_base_url = \"{DEFAULT_DRIVE_BASE_URL}\"\n\n[export]\npath = \"{DEFAULT_EXPORT_FILE}\"\n\n[ui]\ntitle = \"{DEFAULT_TITLE}\"\nlogos = [\"logo.png\", \"logo1.png\"]\n\n[log]\nlevel = \"{DEFAULT_LOG_LEVEL}\"\n# path = \"/absolute/path/to/pendientes.log\"\n",
            path.display(),
        )
    }
}

fn app_config_dir() -> Result<PathBuf> {
    let config_root = dirs::config_dir().ok_or_else(|| {
        anyhow!("cannot resolve config directory; set {CONFIG_PATH_ENV} to the config file")
    })?;
    Ok(config_root.join(APP_NAME))
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        let secs = mins
            .checked_mul(60)
            .ok_or_else(|| anyhow!("timeout duration {raw:?} is too large"))?;
        return Ok(Duration::from_secs(secs));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 30s)")
}
