// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Validated persistence for [`InteractionSettings`].
//!
//! Settings are stored under [`SETTINGS_KEY`]. Nothing invalid is ever
//! written, and a stored blob that fails validation is reported rather than
//! handed to the manager.

use reach_core::{InteractionSettings, SettingsError, SETTINGS_KEY};
use thiserror::Error;
use tracing::debug;

use crate::config::{ConfigError, ConfigService, ConfigStore};

/// Failure to load or store interaction settings.
#[derive(Debug, Error)]
pub enum SettingsStoreError {
    /// The underlying store failed.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The settings do not pass validation.
    #[error("invalid settings: {0}")]
    Invalid(#[from] SettingsError),
}

/// Loads and saves interaction settings through a [`ConfigStore`].
pub struct SettingsService<S> {
    config: ConfigService<S>,
}

impl<S: ConfigStore> SettingsService<S> {
    /// Wraps `store`.
    pub fn new(store: S) -> Self {
        Self {
            config: ConfigService::new(store),
        }
    }

    /// Borrow the inner store.
    pub fn store(&self) -> &S {
        self.config.store()
    }

    /// Stored settings, or the defaults when nothing is stored.
    pub fn load(&self) -> Result<InteractionSettings, SettingsStoreError> {
        let settings: InteractionSettings = self.config.load_or_default(SETTINGS_KEY)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validates `settings`, then stores them.
    pub fn save(&self, settings: &InteractionSettings) -> Result<(), SettingsStoreError> {
        settings.validate()?;
        self.config.save(SETTINGS_KEY, settings)?;
        debug!(key = SETTINGS_KEY, "interaction settings saved");
        Ok(())
    }

    /// Stores the defaults.
    pub fn reset(&self) -> Result<(), SettingsStoreError> {
        self.save(&InteractionSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapStore(RefCell<HashMap<String, Vec<u8>>>);

    impl ConfigStore for MapStore {
        fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
            self.0.borrow().get(key).cloned().ok_or(ConfigError::NotFound)
        }

        fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
            self.0.borrow_mut().insert(key.to_owned(), data.to_vec());
            Ok(())
        }
    }

    #[test]
    fn empty_store_yields_defaults() {
        let svc = SettingsService::new(MapStore::default());
        assert_eq!(svc.load().unwrap(), InteractionSettings::default());
    }

    #[test]
    fn saved_settings_come_back() {
        let svc = SettingsService::new(MapStore::default());
        let mut settings = InteractionSettings::default();
        settings.events.emit_stay_events = false;
        svc.save(&settings).unwrap();
        assert!(!svc.load().unwrap().events.emit_stay_events);
        svc.reset().unwrap();
        assert!(svc.load().unwrap().events.emit_stay_events);
    }

    #[test]
    fn invalid_settings_are_refused() {
        let svc = SettingsService::new(MapStore::default());
        let mut settings = InteractionSettings::default();
        settings.hover.hover_radius = -1.0;
        assert!(matches!(svc.save(&settings), Err(SettingsStoreError::Invalid(_))));
        assert!(svc.store().0.borrow().is_empty());
    }

    #[test]
    fn tampered_blob_fails_validation_on_load() {
        let store = MapStore::default();
        store
            .save_raw(SETTINGS_KEY, br#"{ "activity": { "max_depth": 0 } }"#)
            .unwrap();
        let svc = SettingsService::new(store);
        assert!(matches!(svc.load(), Err(SettingsStoreError::Invalid(_))));
    }
}
