//! Light/dark preference, persisted alongside history.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::PersistenceError;
use crate::storage::{KeyValueStore, THEME_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    Light,
    #[default]
    Dark,
}

impl ThemePreference {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    /// Read the stored preference, falling back to dark
    pub fn load(store: &dyn KeyValueStore) -> Self {
        match store.get(THEME_KEY) {
            Ok(Some(raw)) => raw.trim().parse().unwrap_or_else(|e| {
                warn!("Ignoring stored theme: {}", e);
                Self::default()
            }),
            Ok(None) => Self::default(),
            Err(e) => {
                warn!("Failed to read theme preference: {}", e);
                Self::default()
            }
        }
    }

    pub fn save(self, store: &dyn KeyValueStore) -> Result<(), PersistenceError> {
        debug!("Saving theme preference: {}", self.as_str());
        store.set(THEME_KEY, self.as_str())
    }
}

impl std::fmt::Display for ThemePreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ThemePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            _ => Err(format!("Unknown theme: {}", s)),
        }
    }
}
