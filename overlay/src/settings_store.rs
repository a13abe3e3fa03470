//! Persistence seam for [`Settings`].
//!
//! Settings are loaded fresh each time the panel opens and saved as a whole on every field change,
//! so the store never needs to merge partial updates.

use std::future::Future;
use std::sync::Mutex;
use std::sync::PoisonError;

use texty_protocol::Settings;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings storage is unavailable: {0}")]
    Unavailable(String),

    #[error("stored settings are malformed: {0}")]
    Malformed(String),
}

pub trait SettingsStore {
    /// Loads the stored settings. A store with nothing saved yields [`Settings::default`].
    fn load(&self) -> impl Future<Output = Result<Settings, SettingsError>>;

    fn save(&self, settings: &Settings) -> impl Future<Output = Result<(), SettingsError>>;
}

/// In-memory store; also records how many saves happened.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    inner: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    stored: Option<Settings>,
    saves: usize,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            inner: Mutex::new(MemoryState {
                stored: Some(settings),
                saves: 0,
            }),
        }
    }

    pub fn stored(&self) -> Option<Settings> {
        self.lock().stored.clone()
    }

    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SettingsStore for MemorySettingsStore {
    async fn load(&self) -> Result<Settings, SettingsError> {
        Ok(self.lock().stored.clone().unwrap_or_default())
    }

    async fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let mut state = self.lock();
        state.stored = Some(settings.clone());
        state.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn empty_store_loads_defaults() {
        let store = MemorySettingsStore::new();
        assert_eq!(store.load().await.expect("load"), Settings::default());
        assert_eq!(store.stored(), None);
    }

    #[tokio::test]
    async fn save_replaces_whole_value() {
        let store = MemorySettingsStore::with_settings(Settings {
            api_key: "old".to_string(),
            ..Settings::default()
        });
        let next = Settings {
            endpoint: "http://localhost:8080/v1/chat/completions".to_string(),
            api_key: "new".to_string(),
            model: "local".to_string(),
        };

        store.save(&next).await.expect("save");

        assert_eq!(store.load().await.expect("load"), next);
        assert_eq!(store.save_count(), 1);
    }
}
