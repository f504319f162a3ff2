//! Persisted theme preference

use crate::TrackiflyError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
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
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredPreferences {
    #[serde(default)]
    theme: Theme,
}

/// Single-key preference file holding the theme choice
#[derive(Debug, Clone)]
pub struct ThemeStore {
    path: PathBuf,
}

impl ThemeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored theme, or the default when the file is missing or unreadable.
    pub fn load(&self) -> Theme {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "No stored theme, using default");
                return Theme::default();
            }
        };
        match serde_json::from_str::<StoredPreferences>(&text) {
            Ok(stored) => stored.theme,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Stored theme is corrupt, using default");
                Theme::default()
            }
        }
    }

    pub fn save(&self, theme: Theme) -> Result<(), TrackiflyError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(&StoredPreferences { theme })?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    /// Flip the stored theme and persist it. The new theme is returned even
    /// if writing fails.
    pub fn toggle(&self) -> Theme {
        let theme = self.load().toggled();
        if let Err(e) = self.save(theme) {
            warn!(path = %self.path.display(), error = %e, "Could not persist theme");
        }
        theme
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_light() {
        let dir = tempfile::tempdir().unwrap();
        let store = ThemeStore::new(dir.path().join("prefs.json"));
        assert_eq!(store.load(), Theme::Light);
    }

    #[test]
    fn test_toggle_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = ThemeStore::new(dir.path().join("nested").join("prefs.json"));
        assert_eq!(store.toggle(), Theme::Dark);
        assert_eq!(store.load(), Theme::Dark);
        assert_eq!(store.toggle(), Theme::Light);
        assert_eq!(ThemeStore::new(store.path()).load(), Theme::Light);
    }

    #[test]
    fn test_corrupt_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(ThemeStore::new(&path).load(), Theme::Light);
    }

    #[test]
    fn test_saved_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        ThemeStore::new(&path).save(Theme::Dark).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), r#"{"theme":"dark"}"#);
    }
}
