//! The settings record and its store
//!
//! The record is read and written wholesale. Every save and every import
//! rebuilds the record from scratch through the sanitizer and overwrites
//! whatever was stored before; nothing is merged with earlier values.

use chrono::{Local, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fields::{self, BANNER_ENABLED};
use crate::sanitize::sanitize_record;
use crate::store::OptionStore;
use crate::value::Value;

/// Timestamp layout of `export_date`
pub const EXPORT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Flat mapping of field key to string value
///
/// Absent keys read as the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingsRecord(IndexMap<String, String>);

impl SettingsRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of a field, or "" when unset
    pub fn get(&self, key: &str) -> &str {
        self.raw(key).unwrap_or("")
    }

    /// Value of a field if it is present at all
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Whether a flag field is stored as "1"
    pub fn is_enabled(&self, key: &str) -> bool {
        self.get(key) == "1"
    }

    /// Whether the banner flag is on
    pub fn banner_enabled(&self) -> bool {
        self.is_enabled(BANNER_ENABLED)
    }

    /// Set a field value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Copy of this record with field defaults filled in where the value is empty
    ///
    /// Used for display; tag rendering works on the stored values.
    pub fn with_defaults(&self) -> SettingsRecord {
        let mut record = self.clone();
        for def in fields::fields() {
            if let Some(default) = def.default {
                if record.get(&def.key).is_empty() {
                    record.insert(def.key.clone(), default);
                }
            }
        }
        record
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// This record as sanitizer input
    pub fn to_input(&self) -> IndexMap<String, Value> {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect()
    }

    /// This record as a stored blob
    pub fn to_value(&self) -> Value {
        Value::Mapping(self.to_input())
    }

    /// Read a record back from a stored blob
    ///
    /// Returns `None` when the blob is not a mapping. Non-string scalars
    /// are kept in text form; nested containers are skipped.
    pub fn from_value(value: &Value) -> Option<SettingsRecord> {
        let map = value.as_mapping()?;
        Some(
            map.iter()
                .filter_map(|(k, v)| {
                    let text = match v {
                        Value::String(s) => s.clone(),
                        Value::Integer(_) | Value::Float(_) | Value::Bool(_) => v.to_string(),
                        Value::Null => String::new(),
                        Value::Sequence(_) | Value::Mapping(_) => return None,
                    };
                    Some((k.clone(), text))
                })
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SettingsRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Snapshot produced by export and consumed by import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: String,
    /// Host-local time of the export, `YYYY-MM-DD HH:MM:SS`
    pub export_date: String,
    pub data: SettingsRecord,
}

impl Snapshot {
    /// Serialize as the pretty-printed JSON body of an export file
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::internal(format!("Failed to serialize snapshot: {}", e)))
    }
}

/// Options for the settings store
#[derive(Debug, Clone)]
pub struct SettingsOptions {
    /// Option key of the settings record
    pub option_name: String,
    /// Option key of the uninstall cleanup flag
    pub cleanup_option: String,
    /// Version written into exports
    pub export_version: String,
}

impl Default for SettingsOptions {
    fn default() -> Self {
        Self {
            option_name: "global_options_data".into(),
            cleanup_option: "global_options_cleanup_on_delete".into(),
            export_version: "1.5".into(),
        }
    }
}

/// Parse an import body and return its `data` mapping
///
/// Fails with a malformed-input error when the body is not JSON, not an
/// object, or has no `data` mapping.
pub fn parse_snapshot(body: &str) -> Result<IndexMap<String, Value>> {
    let parsed: Value = serde_json::from_str(body).map_err(|e| Error::invalid_json(e.to_string()))?;

    let mut root = match parsed {
        Value::Mapping(root) => root,
        other => {
            return Err(Error::invalid_format(format!(
                "Expected an object, got {}",
                other.type_name()
            )))
        }
    };

    match root.shift_remove("data") {
        Some(Value::Mapping(data)) => Ok(data),
        Some(other) => Err(Error::invalid_format(format!(
            "\"data\" must be a mapping, got {}",
            other.type_name()
        ))
        .with_path("data")),
        None => Err(Error::invalid_format("Missing \"data\" field")),
    }
}

/// Reads and writes the settings record through a host option store
pub struct SettingsStore<S> {
    store: S,
    options: SettingsOptions,
}

impl<S: OptionStore> SettingsStore<S> {
    /// Create a settings store with default option keys
    pub fn new(store: S) -> Self {
        Self::with_options(store, SettingsOptions::default())
    }

    /// Create a settings store with custom options
    pub fn with_options(store: S, options: SettingsOptions) -> Self {
        Self { store, options }
    }

    pub fn options(&self) -> &SettingsOptions {
        &self.options
    }

    /// The underlying option store
    pub fn inner(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// Load the persisted record, or an empty one if nothing was saved
    pub fn load(&self) -> Result<SettingsRecord> {
        let key = &self.options.option_name;
        match self.store.get_option(key)? {
            None => Ok(SettingsRecord::new()),
            Some(value) => match SettingsRecord::from_value(&value) {
                Some(record) => Ok(record),
                None => {
                    log::warn!(
                        "Stored option '{}' is a {}, not a mapping; treating as empty",
                        key,
                        value.type_name()
                    );
                    Ok(SettingsRecord::new())
                }
            },
        }
    }

    /// Sanitize raw input and persist it as the whole record
    pub fn save(&mut self, input: &IndexMap<String, Value>) -> Result<SettingsRecord> {
        let record = sanitize_record(input);
        self.store
            .update_option(&self.options.option_name, record.to_value())?;
        log::debug!(
            "Saved settings record '{}' ({} fields)",
            self.options.option_name,
            record.len()
        );
        Ok(record)
    }

    /// Snapshot the current record, stamped with the current local time
    pub fn export(&self) -> Result<Snapshot> {
        self.export_at(Local::now().naive_local())
    }

    /// Snapshot the current record with an explicit timestamp
    pub fn export_at(&self, at: NaiveDateTime) -> Result<Snapshot> {
        let data = self.load()?;
        log::debug!("Exporting {} settings fields", data.len());
        Ok(Snapshot {
            version: self.options.export_version.clone(),
            export_date: at.format(EXPORT_DATE_FORMAT).to_string(),
            data,
        })
    }

    /// Replace the record with the sanitized `data` of an export body
    pub fn import(&mut self, body: &str) -> Result<SettingsRecord> {
        let data = parse_snapshot(body)?;
        let record = self.save(&data)?;
        log::debug!("Imported settings snapshot");
        Ok(record)
    }

    /// Whether uninstall should erase the stored data
    pub fn cleanup_enabled(&self) -> Result<bool> {
        let stored = self.store.get_option(&self.options.cleanup_option)?;
        Ok(match stored {
            Some(Value::String(s)) => s == "1",
            Some(Value::Bool(b)) => b,
            Some(Value::Integer(i)) => i == 1,
            _ => false,
        })
    }

    /// Persist the cleanup flag as "1"/"0"
    pub fn set_cleanup(&mut self, enabled: bool) -> Result<()> {
        let value = if enabled { "1" } else { "0" };
        self.store
            .update_option(&self.options.cleanup_option, Value::from(value))?;
        Ok(())
    }

    /// Remove the record and the cleanup flag if cleanup is enabled
    ///
    /// Returns true when data was erased.
    pub fn uninstall(&mut self) -> Result<bool> {
        if !self.cleanup_enabled()? {
            log::debug!("Cleanup disabled; keeping stored settings");
            return Ok(false);
        }

        self.store.delete_option(&self.options.option_name)?;
        self.store.delete_option(&self.options.cleanup_option)?;
        log::debug!("Removed stored settings and cleanup flag");
        Ok(true)
    }
}
