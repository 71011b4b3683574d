//! Handle configuration.

use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Local, Utc};
use secrecy::{ExposeSecret, SecretString};

use crate::crypto::CryptoEngine;
use crate::storage::DEFAULT_DATASET_NAME;

/// Where a handle's data lives and how it is encrypted.
///
/// ```
/// use jsontables_core::StoreConfig;
///
/// let config = StoreConfig::new("data/people.json", "People")
///     .with_salt("YU7icKHkVp5aARqK")
///     .with_utc(false);
/// assert_eq!(config.dataset_name(), "People");
/// ```
#[derive(Debug)]
pub struct StoreConfig {
    path: PathBuf,
    dataset_name: String,
    salt: Option<SecretString>,
    use_utc: bool,
}

impl StoreConfig {
    /// A blank dataset name means `JsonTables`.
    pub fn new(path: impl Into<PathBuf>, dataset_name: impl Into<String>) -> Self {
        let dataset_name = dataset_name.into();
        let dataset_name = if dataset_name.trim().is_empty() {
            DEFAULT_DATASET_NAME.to_string()
        } else {
            dataset_name
        };
        Self {
            path: path.into(),
            dataset_name,
            salt: None,
            use_utc: true,
        }
    }

    /// Salt mixed into the key and IV of secure columns.
    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = Some(SecretString::from(salt.into()));
        self
    }

    /// Stamp timestamps in UTC (the default) or in local time.
    pub fn with_utc(mut self, use_utc: bool) -> Self {
        self.use_utc = use_utc;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dataset_name(&self) -> &str {
        &self.dataset_name
    }

    pub fn has_salt(&self) -> bool {
        self.salt.is_some()
    }

    pub fn use_utc(&self) -> bool {
        self.use_utc
    }

    pub(crate) fn crypto_engine(&self) -> CryptoEngine {
        match &self.salt {
            Some(salt) => CryptoEngine::with_salt(salt.expose_secret()),
            None => CryptoEngine::unsalted(),
        }
    }

    /// Current time for `CreatedDate`/`ModifiedDate` stamps.
    pub fn now(&self) -> DateTime<FixedOffset> {
        if self.use_utc {
            Utc::now().fixed_offset()
        } else {
            Local::now().fixed_offset()
        }
    }
}
