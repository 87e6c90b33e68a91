//! Light/dark preference, persisted per operator and broadcast to renderers.

use std::{
    fs,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};

pub const PREFERENCES_FILE: &str = "preferences.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

pub trait PreferenceStore: Send + Sync {
    fn load(&self) -> Result<Option<Theme>>;
    fn save(&self, theme: Theme) -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PreferenceFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    theme: Option<Theme>,
}

/// Stores the preference as `theme = "dark"` in a TOML file.
#[derive(Debug, Clone)]
pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/roster/preferences.toml` for the current user.
    pub fn default_location() -> Result<Self> {
        let base = dirs::config_dir()
            .ok_or_else(|| anyhow!("unable to resolve user config dir"))?;
        Ok(Self::new(base.join("roster").join(PREFERENCES_FILE)))
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn load(&self) -> Result<Option<Theme>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read preferences '{}'", self.path.display()))?;
        let file: PreferenceFile = toml::from_str(&raw)
            .with_context(|| format!("failed to parse preferences '{}'", self.path.display()))?;
        Ok(file.theme)
    }

    fn save(&self, theme: Theme) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create '{}'", parent.display()))?;
        }
        let raw = toml::to_string(&PreferenceFile { theme: Some(theme) })
            .context("failed to serialize preferences")?;
        fs::write(&self.path, raw)
            .with_context(|| format!("failed to write preferences '{}'", self.path.display()))
    }
}

pub struct ThemeService {
    store: Arc<dyn PreferenceStore>,
    persisted: AtomicBool,
    current: watch::Sender<Theme>,
}

impl ThemeService {
    /// Starts from the persisted preference, falling back to the system
    /// default when none has been saved or it cannot be read.
    pub fn init(store: Arc<dyn PreferenceStore>, system_default: Theme) -> Self {
        let (theme, persisted) = match store.load() {
            Ok(Some(theme)) => (theme, true),
            Ok(None) => (system_default, false),
            Err(error) => {
                warn!(%error, "ignoring unreadable theme preference");
                (system_default, false)
            }
        };
        info!(theme = theme.as_str(), persisted, "theme initialized");
        let (current, _) = watch::channel(theme);
        Self {
            store,
            persisted: AtomicBool::new(persisted),
            current,
        }
    }

    pub fn current(&self) -> Theme {
        *self.current.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Theme> {
        self.current.subscribe()
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted.load(Ordering::SeqCst)
    }

    /// Applies `theme` and saves it as the operator's explicit choice. The
    /// theme is applied even when saving fails.
    pub fn set(&self, theme: Theme) -> Result<()> {
        self.current.send_replace(theme);
        self.store.save(theme)?;
        self.persisted.store(true, Ordering::SeqCst);
        info!(theme = theme.as_str(), "theme preference saved");
        Ok(())
    }

    pub fn toggle(&self) -> Result<Theme> {
        let next = self.current().toggled();
        self.set(next)?;
        Ok(next)
    }

    /// Follows the system appearance until the operator picks a theme.
    /// Returns whether the change was applied.
    pub fn on_system_change(&self, theme: Theme) -> bool {
        if self.is_persisted() {
            return false;
        }
        self.current.send_replace(theme);
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct MemoryStore {
        saved: Mutex<Option<Theme>>,
    }

    impl PreferenceStore for MemoryStore {
        fn load(&self) -> Result<Option<Theme>> {
            Ok(*self.saved.lock().expect("lock"))
        }

        fn save(&self, theme: Theme) -> Result<()> {
            *self.saved.lock().expect("lock") = Some(theme);
            Ok(())
        }
    }

    #[test]
    fn persisted_preference_beats_system_default() {
        let store = Arc::new(MemoryStore::default());
        store.save(Theme::Dark).expect("save");

        let service = ThemeService::init(store, Theme::Light);
        assert_eq!(service.current(), Theme::Dark);
        assert!(!service.on_system_change(Theme::Light));
        assert_eq!(service.current(), Theme::Dark);
    }

    #[test]
    fn system_changes_apply_until_a_theme_is_chosen() {
        let store = Arc::new(MemoryStore::default());
        let service = ThemeService::init(store.clone(), Theme::Light);
        assert_eq!(service.current(), Theme::Light);

        assert!(service.on_system_change(Theme::Dark));
        assert_eq!(service.current(), Theme::Dark);
        assert_eq!(*store.saved.lock().expect("lock"), None);

        service.set(Theme::Light).expect("set");
        assert!(!service.on_system_change(Theme::Dark));
        assert_eq!(service.current(), Theme::Light);
    }

    #[test]
    fn set_notifies_subscribers() {
        let service = ThemeService::init(Arc::new(MemoryStore::default()), Theme::Light);
        let mut rx = service.subscribe();

        assert_eq!(service.toggle().expect("toggle"), Theme::Dark);
        assert!(rx.has_changed().expect("sender alive"));
        assert_eq!(*rx.borrow_and_update(), Theme::Dark);
    }

    #[test]
    fn file_store_round_trips_through_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join(PREFERENCES_FILE);
        let store = FilePreferenceStore::new(&path);

        assert_eq!(store.load().expect("load"), None);
        store.save(Theme::Dark).expect("save");
        assert_eq!(
            fs::read_to_string(&path).expect("read").trim(),
            "theme = \"dark\""
        );
        assert_eq!(store.load().expect("load"), Some(Theme::Dark));
    }

    #[test]
    fn unreadable_file_falls_back_to_system_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(PREFERENCES_FILE);
        fs::write(&path, "theme = \"sepia\"").expect("write");

        let service = ThemeService::init(Arc::new(FilePreferenceStore::new(&path)), Theme::Dark);
        assert_eq!(service.current(), Theme::Dark);
        assert!(!service.is_persisted());
    }
}
