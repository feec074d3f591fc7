// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tabula_app::{DEFAULT_PER_PAGE, FilteredBadge, PanelOptions, ResourceKind};
use tabula_client::DEFAULT_STEP_UP_PATH;

pub const APP_NAME: &str = "tabula";
const CONFIG_VERSION: i64 = 1;
const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";
const DEFAULT_TIMEOUT: &str = "10s";
const DEFAULT_TAB_SETTLE: &str = "50ms";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub search: Search,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            server: Server::default(),
            ui: Ui::default(),
            search: Search::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Server {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
    pub token: Option<String>,
    pub step_up_path: Option<String>,
    pub return_to: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ui {
    pub initial_tab: Option<String>,
    pub per_page: Option<i64>,
    pub filtered_badge: Option<String>,
    pub tab_settle: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Search {
    #[serde(default)]
    pub delays: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub file: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("TABULA_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set TABULA_CONFIG_PATH to the config file")
        })?;
        Ok(config_root.join(APP_NAME).join("config.toml"))
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
                    "config file {} has no version; add `version = 1` and keep values under [server], [ui], [search], and [log]",
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
        if self.base_url().is_empty() {
            bail!("server.base_url in {} must not be empty", path.display());
        }

        if let Some(timeout) = &self.server.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed.is_zero() {
                bail!(
                    "server.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(per_page) = self.ui.per_page
            && !(1..=i64::from(u32::MAX)).contains(&per_page)
        {
            bail!(
                "ui.per_page in {} must be positive, got {}",
                path.display(),
                per_page
            );
        }

        self.initial_tab()
            .with_context(|| format!("invalid [ui] in {}", path.display()))?;
        self.filtered_badge()
            .with_context(|| format!("invalid [ui] in {}", path.display()))?;
        self.tab_settle()
            .with_context(|| format!("invalid [ui] in {}", path.display()))?;
        self.search_delays()
            .with_context(|| format!("invalid [search] in {}", path.display()))?;
        Ok(())
    }

    /// The file value wins; `TABULA_BASE_URL` only fills in when the file
    /// leaves it unset.
    pub fn base_url(&self) -> String {
        let raw = match &self.server.base_url {
            Some(url) => url.clone(),
            None => env::var("TABULA_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned()),
        };
        raw.trim().trim_end_matches('/').to_owned()
    }

    pub fn timeout(&self) -> Result<Duration> {
        parse_duration(self.server.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn token(&self) -> Option<String> {
        self.server
            .token
            .as_ref()
            .map(|token| token.trim().to_owned())
            .filter(|token| !token.is_empty())
    }

    pub fn step_up_path(&self) -> &str {
        self.server
            .step_up_path
            .as_deref()
            .unwrap_or(DEFAULT_STEP_UP_PATH)
    }

    /// Base address of the admin screens, used as the step-up return
    /// target. `None` means the server origin.
    pub fn return_to(&self) -> Option<&str> {
        self.server
            .return_to
            .as_deref()
            .map(str::trim)
            .filter(|base| !base.is_empty())
    }

    pub fn initial_tab(&self) -> Result<ResourceKind> {
        match self.ui.initial_tab.as_deref() {
            None => Ok(ResourceKind::Admins),
            Some(raw) => parse_resource(raw).context("ui.initial_tab"),
        }
    }

    pub fn per_page(&self) -> u32 {
        self.ui
            .per_page
            .and_then(|per_page| u32::try_from(per_page).ok())
            .filter(|per_page| *per_page > 0)
            .unwrap_or(DEFAULT_PER_PAGE)
    }

    pub fn filtered_badge(&self) -> Result<FilteredBadge> {
        match self.ui.filtered_badge.as_deref() {
            None => Ok(FilteredBadge::default()),
            Some(raw) => FilteredBadge::parse(raw).ok_or_else(|| {
                anyhow!(
                    "ui.filtered_badge must be \"counts_differ\" or \"filter_active\", got {raw:?}"
                )
            }),
        }
    }

    pub fn tab_settle(&self) -> Result<Duration> {
        parse_duration(self.ui.tab_settle.as_deref().unwrap_or(DEFAULT_TAB_SETTLE))
            .context("ui.tab_settle")
    }

    pub fn search_delays(&self) -> Result<BTreeMap<ResourceKind, Duration>> {
        let mut delays = BTreeMap::new();
        for (name, raw) in &self.search.delays {
            let resource = parse_resource(name).context("search.delays")?;
            let delay =
                parse_duration(raw).with_context(|| format!("search.delays.{name}"))?;
            delays.insert(resource, delay);
        }
        Ok(delays)
    }

    pub fn panel_options(&self) -> Result<PanelOptions> {
        Ok(PanelOptions {
            tabs: ResourceKind::ALL.to_vec(),
            per_page: self.per_page(),
            badge: self.filtered_badge()?,
            settle: self.tab_settle()?,
            delays: self.search_delays()?,
        })
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_file(&self) -> Result<PathBuf> {
        if let Some(path) = &self.log.file {
            return Ok(PathBuf::from(path));
        }
        let data_root = dirs::data_dir().ok_or_else(|| {
            anyhow!("cannot resolve data directory; set [log].file to an absolute path")
        })?;
        Ok(data_root.join(APP_NAME).join("tabula.log"))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# tabula config\n# Place this file at: {}\n\nversion = 1\n\n[server]\nbase_url = \"{}\"\ntimeout = \"{}\"\n# token = \"bearer token sent with every request\"\nstep_up_path = \"{}\"\n# return_to = \"https://admin.example/console\"\n\n[ui]\ninitial_tab = \"admins\"\nper_page = {}\n# \"counts_differ\" or \"filter_active\"\nfiltered_badge = \"counts_differ\"\ntab_settle = \"{}\"\n\n[search.delays]\n# Per-tab search debounce, for example:\n# sessions = \"750ms\"\n# activity_logs = \"1s\"\n\n[log]\nlevel = \"{}\"\n# file = \"/absolute/path/to/tabula.log\"\n",
            path.display(),
            DEFAULT_BASE_URL,
            DEFAULT_TIMEOUT,
            DEFAULT_STEP_UP_PATH,
            DEFAULT_PER_PAGE,
            DEFAULT_TAB_SETTLE,
            DEFAULT_LOG_LEVEL,
        )
    }
}

pub fn parse_resource(raw: &str) -> Result<ResourceKind> {
    ResourceKind::parse(raw.trim()).ok_or_else(|| {
        let known = ResourceKind::ALL
            .iter()
            .map(|resource| resource.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        anyhow!("unknown resource {raw:?}; expected one of: {known}")
    })
}

pub fn parse_duration(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; write it as <N>ms, <N>s or <N>m, for example 750ms")
}
