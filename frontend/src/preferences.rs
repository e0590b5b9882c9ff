use std::rc::Rc;

use crate::env::{Environment, KeyValueStore};
use crate::error::{Result, ShellError};

/// The single persisted preference, kept under one configurable key.
pub struct PreferenceStore {
    key: String,
    backend: Option<Rc<dyn KeyValueStore>>,
}

impl PreferenceStore {
    pub fn new(env: &dyn Environment, key: &str) -> Self {
        let backend = env.storage();
        if backend.is_none() {
            log::debug!("client storage unavailable, preferences will not persist");
        }
        Self {
            key: key.to_string(),
            backend,
        }
    }

    fn backend(&self) -> Result<&dyn KeyValueStore> {
        self.backend.as_deref().ok_or(ShellError::StorageUnavailable)
    }

    pub fn read(&self) -> Result<Option<String>> {
        self.backend()?.get(&self.key)
    }

    pub fn write(&self, value: &str) -> Result<()> {
        self.backend()?.set(&self.key, value)
    }

    /// Stored value, treating any storage failure as "nothing stored".
    pub fn stored(&self) -> Option<String> {
        match self.read() {
            Ok(value) => value,
            Err(e) => {
                log::debug!("reading {} failed: {}", self.key, e);
                None
            }
        }
    }
}
