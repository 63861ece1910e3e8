//! Option storage boundary
//!
//! The host owns persistence. It hands the settings store a named-blob API:
//! read a key, overwrite a key, delete a key. A single `update_option` call
//! is assumed to be atomic.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::value::Value;

/// Named-blob storage supplied by the host
pub trait OptionStore {
    /// Read the value stored under `key`, if any
    fn get_option(&self, key: &str) -> Result<Option<Value>>;

    /// Store `value` under `key`, replacing any previous value
    ///
    /// Returns true when the stored value changed.
    fn update_option(&mut self, key: &str, value: Value) -> Result<bool>;

    /// Remove `key`
    ///
    /// Returns true when something was removed.
    fn delete_option(&mut self, key: &str) -> Result<bool>;
}

impl<S: OptionStore + ?Sized> OptionStore for &mut S {
    fn get_option(&self, key: &str) -> Result<Option<Value>> {
        (**self).get_option(key)
    }

    fn update_option(&mut self, key: &str, value: Value) -> Result<bool> {
        (**self).update_option(key, value)
    }

    fn delete_option(&mut self, key: &str) -> Result<bool> {
        (**self).delete_option(key)
    }
}

/// In-process option store
#[derive(Debug, Clone, Default)]
pub struct MemoryOptionStore {
    options: IndexMap<String, Value>,
}

impl MemoryOptionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored options
    pub fn len(&self) -> usize {
        self.options.len()
    }

    /// Check whether nothing is stored
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

impl OptionStore for MemoryOptionStore {
    fn get_option(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.options.get(key).cloned())
    }

    fn update_option(&mut self, key: &str, value: Value) -> Result<bool> {
        if self.options.get(key) == Some(&value) {
            return Ok(false);
        }
        self.options.insert(key.to_string(), value);
        Ok(true)
    }

    fn delete_option(&mut self, key: &str) -> Result<bool> {
        Ok(self.options.shift_remove(key).is_some())
    }
}

/// Option store backed by one JSON object on disk
///
/// The whole file is rewritten on every mutation through a sibling temp
/// file and a rename, so readers never see a partial write.
#[derive(Debug, Clone)]
pub struct JsonFileOptionStore {
    path: PathBuf,
    options: IndexMap<String, Value>,
}

impl JsonFileOptionStore {
    /// Open the store at `path`; a missing file is an empty store
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let options = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => IndexMap::new(),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                Error::storage(path.display().to_string(), e.to_string())
                    .with_help("The option store must be a JSON object")
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("Option store {} does not exist yet", path.display());
                IndexMap::new()
            }
            Err(e) => return Err(Error::io(path.display().to_string(), &e)),
        };

        Ok(Self { path, options })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `options` to disk, then adopt them as the current state
    ///
    /// On failure the in-memory state and the file are both unchanged.
    fn commit(&mut self, options: IndexMap<String, Value>) -> Result<()> {
        let body = serde_json::to_string_pretty(&options)
            .map_err(|e| Error::internal(format!("Failed to serialize options: {}", e)))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, body).map_err(|e| Error::io(tmp.display().to_string(), &e))?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(Error::io(self.path.display().to_string(), &e));
        }

        self.options = options;
        Ok(())
    }
}

impl OptionStore for JsonFileOptionStore {
    fn get_option(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.options.get(key).cloned())
    }

    fn update_option(&mut self, key: &str, value: Value) -> Result<bool> {
        if self.options.get(key) == Some(&value) {
            return Ok(false);
        }
        let mut options = self.options.clone();
        options.insert(key.to_string(), value);
        self.commit(options)?;
        Ok(true)
    }

    fn delete_option(&mut self, key: &str) -> Result<bool> {
        if !self.options.contains_key(key) {
            return Ok(false);
        }
        let mut options = self.options.clone();
        options.shift_remove(key);
        self.commit(options)?;
        Ok(true)
    }
}
