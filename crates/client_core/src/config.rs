use std::{env, fs, path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;

use crate::{
    dialog::DEFAULT_TICK_INTERVAL,
    notification::{ERROR_DURATION, SUCCESS_DURATION},
};

pub const SETTINGS_FILE: &str = "roster.toml";

/// Auto-dismiss durations and countdown refresh rate for every dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialogTimings {
    pub success: Duration,
    pub error: Duration,
    pub tick_interval: Duration,
}

impl Default for DialogTimings {
    fn default() -> Self {
        Self {
            success: SUCCESS_DURATION,
            error: ERROR_DURATION,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub search_debounce: Duration,
    pub request_timeout: Duration,
    pub dialogs: DialogTimings,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000/api".into(),
            search_debounce: Duration::from_millis(500),
            request_timeout: Duration::from_secs(30),
            dialogs: DialogTimings::default(),
        }
    }
}

/// Optional overrides read from `roster.toml`.
#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_base_url: Option<String>,
    search_debounce_ms: Option<u64>,
    request_timeout_secs: Option<u64>,
    success_dialog_ms: Option<u64>,
    error_dialog_ms: Option<u64>,
    dialog_tick_ms: Option<u64>,
}

/// Defaults, then `roster.toml` in the working directory, then environment
/// variables. Unreadable or invalid sources are skipped.
pub fn load_settings() -> ClientSettings {
    let mut settings = ClientSettings::default();

    match read_file_settings(Path::new(SETTINGS_FILE)) {
        Ok(Some(file_cfg)) => apply_file_settings(&mut settings, file_cfg),
        Ok(None) => {}
        Err(error) => warn!(%error, "ignoring unreadable settings file"),
    }

    apply_env_overrides(&mut settings, |key| env::var(key).ok());
    settings
}

fn read_file_settings(path: &Path) -> anyhow::Result<Option<FileSettings>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
    let parsed = toml::from_str(&raw)
        .with_context(|| format!("failed to parse settings file '{}'", path.display()))?;
    Ok(Some(parsed))
}

fn apply_file_settings(settings: &mut ClientSettings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.api_base_url {
        settings.api_base_url = v;
    }
    if let Some(v) = file_cfg.search_debounce_ms {
        settings.search_debounce = Duration::from_millis(v);
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout = Duration::from_secs(v);
    }
    if let Some(v) = file_cfg.success_dialog_ms {
        settings.dialogs.success = Duration::from_millis(v);
    }
    if let Some(v) = file_cfg.error_dialog_ms {
        settings.dialogs.error = Duration::from_millis(v);
    }
    if let Some(v) = file_cfg.dialog_tick_ms.filter(|v| *v > 0) {
        settings.dialogs.tick_interval = Duration::from_millis(v);
    }
}

fn apply_env_overrides(settings: &mut ClientSettings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("ROSTER_API_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = var("APP__API_URL") {
        settings.api_base_url = v;
    }

    let number = |key: &str| var(key).and_then(|v| v.trim().parse::<u64>().ok());

    if let Some(v) = number("APP__SEARCH_DEBOUNCE_MS") {
        settings.search_debounce = Duration::from_millis(v);
    }
    if let Some(v) = number("APP__REQUEST_TIMEOUT_SECS") {
        settings.request_timeout = Duration::from_secs(v);
    }
    if let Some(v) = number("APP__SUCCESS_DIALOG_MS") {
        settings.dialogs.success = Duration::from_millis(v);
    }
    if let Some(v) = number("APP__ERROR_DIALOG_MS") {
        settings.dialogs.error = Duration::from_millis(v);
    }
    if let Some(v) = number("APP__DIALOG_TICK_MS").filter(|v| *v > 0) {
        settings.dialogs.tick_interval = Duration::from_millis(v);
    }
}
