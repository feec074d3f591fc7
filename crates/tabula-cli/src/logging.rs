// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::{Mutex, OnceLock};
use tracing_subscriber::EnvFilter;

static INIT: OnceLock<()> = OnceLock::new();

/// Sends tracing output to `path`. The terminal belongs to the table view, so
/// nothing is written to stdout or stderr. `RUST_LOG` overrides `level`.
pub fn init(level: &str, path: &Path) -> Result<()> {
    if INIT.get().is_some() {
        return Ok(());
    }

    let filter = build_filter(level, std::env::var("RUST_LOG").ok().as_deref())?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|error| anyhow!("install log subscriber: {error}"))?;
    INIT.set(()).ok();
    Ok(())
}

fn build_filter(level: &str, env_override: Option<&str>) -> Result<EnvFilter> {
    if let Some(directives) = env_override.map(str::trim).filter(|raw| !raw.is_empty()) {
        return EnvFilter::try_new(directives)
            .with_context(|| format!("invalid RUST_LOG value {directives:?}"));
    }
    EnvFilter::try_new(level.trim())
        .with_context(|| format!("invalid [log].level {level:?}; use error, warn, info, debug, or trace"))
}
