//! ManageSettingsUseCase: the key translator and last-used address, kept in
//! sync with persistent storage.
//!
//! Every mutation is saved immediately through the injected
//! [`SettingsRepository`], so the file on disk always reflects the table the
//! next session will start with.

use std::sync::Arc;

use keyrelay_core::{keymap::parse_mapping_batch, KeyTranslator, RemapError, RemapOutcome};
use thiserror::Error;
use tracing::info;

use crate::infrastructure::storage::settings::{Settings, SettingsError};

/// Trait abstracting settings persistence.
///
/// The production implementation is the JSON file store; tests use an
/// in-memory store or a mock.
pub trait SettingsRepository: Send + Sync {
    /// Loads the stored settings, or defaults when nothing is stored yet.
    fn load(&self) -> Result<Settings, SettingsError>;
    /// Replaces the stored settings.
    fn save(&self, settings: &Settings) -> Result<(), SettingsError>;
}

/// Error type for remapping from batch text.
#[derive(Debug, Error)]
pub enum ManageSettingsError {
    #[error(transparent)]
    Remap(#[from] RemapError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// The Manage Settings use case.
pub struct ManageSettingsUseCase {
    repository: Arc<dyn SettingsRepository>,
    settings: Settings,
    translator: KeyTranslator,
}

impl ManageSettingsUseCase {
    /// Loads the settings and builds the translator from the stored mappings.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] if the stored settings cannot be read.
    pub fn load(repository: Arc<dyn SettingsRepository>) -> Result<Self, SettingsError> {
        let settings = repository.load()?;
        let translator = KeyTranslator::from_persisted(&settings.key_mappings);
        info!("loaded {} key mappings", translator.len());
        Ok(Self {
            repository,
            settings,
            translator,
        })
    }

    pub fn translator(&self) -> &KeyTranslator {
        &self.translator
    }

    /// Applies a remap batch and persists the resulting table.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] if saving fails.  The in-memory table keeps
    /// the new mappings either way.
    pub fn remap<I, K, V>(&mut self, batch: I) -> Result<RemapOutcome, SettingsError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let outcome = self.translator.remap(batch);
        self.settings.key_mappings = self.translator.to_persisted();
        self.repository.save(&self.settings)?;
        info!(
            "key mappings saved ({} applied, {} discarded, {} total)",
            outcome.applied,
            outcome.rejected,
            self.translator.len()
        );
        Ok(outcome)
    }

    /// Parses `a=b,c=d` text and applies it with [`Self::remap`].
    ///
    /// # Errors
    ///
    /// Returns [`ManageSettingsError::Remap`] for blank input, or
    /// [`ManageSettingsError::Settings`] if saving fails.
    pub fn remap_text(&mut self, text: &str) -> Result<RemapOutcome, ManageSettingsError> {
        let pairs = parse_mapping_batch(text)?;
        Ok(self.remap(pairs)?)
    }

    /// The address of the last host this machine joined, if any.
    pub fn last_used_address(&self) -> Option<&str> {
        self.settings.last_used_ip_address.as_deref()
    }

    /// Stores `address` as the last-used join target.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] if saving fails.
    pub fn remember_address(&mut self, address: &str) -> Result<(), SettingsError> {
        self.settings.last_used_ip_address = Some(address.to_string());
        self.repository.save(&self.settings)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
