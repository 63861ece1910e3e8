//! Admin actions
//!
//! The admin page submits the settings form, downloads an export file,
//! uploads an import file, and toggles the cleanup flag. Every action
//! checks the caller's capability before it reads an upload or touches
//! storage.

use std::collections::HashSet;

use chrono::{Local, NaiveDateTime};
use indexmap::IndexMap;

use crate::error::{Error, ErrorKind, Result};
use crate::settings::{SettingsRecord, SettingsStore};
use crate::store::OptionStore;
use crate::value::Value;

/// Content type of export files
pub const EXPORT_CONTENT_TYPE: &str = "application/json";

/// Notice shown after a successful import
pub const IMPORT_SUCCESS: &str = "Settings imported successfully!";

/// Capabilities a caller may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Edit, export and import site-wide options
    ManageOptions,
}

/// The identity an admin request runs as
#[derive(Debug, Clone, Default)]
pub struct Caller {
    capabilities: HashSet<Capability>,
}

impl Caller {
    /// A caller holding the given capabilities
    pub fn new(capabilities: impl IntoIterator<Item = Capability>) -> Self {
        Self {
            capabilities: capabilities.into_iter().collect(),
        }
    }

    /// A caller allowed to manage options
    pub fn administrator() -> Self {
        Self::new([Capability::ManageOptions])
    }

    /// A caller with no capabilities
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    fn require(&self, capability: Capability, action: &str) -> Result<()> {
        if self.can(capability) {
            Ok(())
        } else {
            log::warn!("Rejected unauthorized {} request", action);
            Err(Error::unauthorized(action))
        }
    }
}

/// An uploaded import file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    /// Original file name, for messages only
    pub filename: String,
    /// Raw file body
    pub body: String,
}

impl Upload {
    pub fn new(filename: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            body: body.into(),
        }
    }
}

/// A downloadable export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    /// `global-options-<YYYY-MM-DD-HHMMSS>.json`
    pub filename: String,
    pub content_type: &'static str,
    /// Pretty-printed snapshot JSON
    pub body: String,
}

/// Severity of an admin notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A message shown on the admin page after an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    /// The notice for a failed action
    pub fn from_error(err: &Error) -> Self {
        Self::error(err.user_message())
    }
}

/// Capability-checked admin operations over a settings store
pub struct AdminActions<S> {
    settings: SettingsStore<S>,
}

impl<S: OptionStore> AdminActions<S> {
    pub fn new(settings: SettingsStore<S>) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SettingsStore<S> {
        &self.settings
    }

    pub fn into_settings(self) -> SettingsStore<S> {
        self.settings
    }

    /// Current record with display defaults, for rendering the form
    pub fn form_values(&self, caller: &Caller) -> Result<SettingsRecord> {
        caller.require(Capability::ManageOptions, "view")?;
        Ok(self.settings.load()?.with_defaults())
    }

    /// Save a submitted settings form
    pub fn submit(
        &mut self,
        caller: &Caller,
        form: &IndexMap<String, Value>,
    ) -> Result<SettingsRecord> {
        caller.require(Capability::ManageOptions, "save")?;
        self.settings.save(form)
    }

    /// Build the export download, stamped with the current local time
    pub fn export_file(&self, caller: &Caller) -> Result<ExportFile> {
        self.export_file_at(caller, Local::now().naive_local())
    }

    /// Build the export download with an explicit timestamp
    pub fn export_file_at(&self, caller: &Caller, at: NaiveDateTime) -> Result<ExportFile> {
        caller.require(Capability::ManageOptions, "export")?;
        let snapshot = self.settings.export_at(at)?;
        Ok(ExportFile {
            filename: export_filename(at),
            content_type: EXPORT_CONTENT_TYPE,
            body: snapshot.to_json()?,
        })
    }

    /// Import an uploaded export file
    ///
    /// Returns the success notice; on failure the error's
    /// [`Error::user_message`] is the notice to show.
    pub fn import_upload(&mut self, caller: &Caller, upload: Option<&Upload>) -> Result<Notice> {
        caller.require(Capability::ManageOptions, "import")?;

        let upload = match upload {
            Some(upload) if !upload.body.trim().is_empty() => upload,
            _ => return Err(Error::missing_file()),
        };

        self.settings.import(&upload.body).map_err(|e| {
            if matches!(e.kind, ErrorKind::MalformedInput(_)) {
                log::warn!("Rejected import file '{}': {}", upload.filename, e.kind);
                e.with_path(upload.filename.clone())
            } else {
                e
            }
        })?;

        Ok(Notice::success(IMPORT_SUCCESS))
    }

    /// Import and always produce a notice, as the admin page does
    pub fn import_notice(&mut self, caller: &Caller, upload: Option<&Upload>) -> Notice {
        self.import_upload(caller, upload)
            .unwrap_or_else(|e| Notice::from_error(&e))
    }

    /// Toggle whether uninstall erases stored data
    pub fn set_cleanup(&mut self, caller: &Caller, enabled: bool) -> Result<()> {
        caller.require(Capability::ManageOptions, "save")?;
        self.settings.set_cleanup(enabled)
    }
}

/// File name of an export taken at `at`
pub fn export_filename(at: NaiveDateTime) -> String {
    at.format("global-options-%Y-%m-%d-%H%M%S.json").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryOptionStore;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn admin_with(pairs: &[(&str, &str)]) -> AdminActions<MemoryOptionStore> {
        let mut settings = SettingsStore::new(MemoryOptionStore::new());
        let form: IndexMap<String, Value> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::from(*v)))
            .collect();
        settings.save(&form).unwrap();
        AdminActions::new(settings)
    }

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap()
    }

    #[test]
    fn test_export_file() {
        let admin = admin_with(&[("company_name", "Acme")]);
        let file = admin.export_file_at(&Caller::administrator(), at()).unwrap();

        assert_eq!(file.filename, "global-options-2025-01-02-030405.json");
        assert_eq!(file.content_type, "application/json");
        assert!(file.body.contains("\"export_date\": \"2025-01-02 03:04:05\""));
        assert!(file.body.contains("\"company_name\": \"Acme\""));
    }

    #[test]
    fn test_export_file_round_trips_through_import() {
        let mut admin = admin_with(&[("email", "a@b.com"), ("banner_enabled", "1")]);
        let caller = Caller::administrator();
        let before = admin.settings().load().unwrap();

        let file = admin.export_file(&caller).unwrap();
        let upload = Upload::new(file.filename, file.body);
        let notice = admin.import_upload(&caller, Some(&upload)).unwrap();

        assert_eq!(notice, Notice::success(IMPORT_SUCCESS));
        assert_eq!(admin.settings().load().unwrap(), before);
    }

    #[test]
    fn test_unauthorized_export_rejected() {
        let admin = admin_with(&[]);
        let err = admin.export_file(&Caller::anonymous()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }

    #[test]
    fn test_unauthorized_import_checked_before_upload() {
        let mut admin = admin_with(&[("city", "Oslo")]);

        // Even a missing file reports the authorization failure first
        let err = admin.import_upload(&Caller::anonymous(), None).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);

        let upload = Upload::new("x.json", r#"{"data": {"city": "Rome"}}"#);
        let err = admin
            .import_upload(&Caller::anonymous(), Some(&upload))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
        assert_eq!(admin.settings().load().unwrap().get("city"), "Oslo");
    }

    #[test]
    fn test_unauthorized_submit_rejected() {
        let mut admin = admin_with(&[("city", "Oslo")]);
        let form: IndexMap<String, Value> =
            [("city".to_string(), Value::from("Rome"))].into_iter().collect();

        assert!(admin.submit(&Caller::anonymous(), &form).is_err());
        assert!(admin.set_cleanup(&Caller::anonymous(), true).is_err());
        assert_eq!(admin.settings().load().unwrap().get("city"), "Oslo");
        assert!(!admin.settings().cleanup_enabled().unwrap());
    }

    #[test]
    fn test_missing_upload() {
        let mut admin = admin_with(&[]);
        let caller = Caller::administrator();

        let err = admin.import_upload(&caller, None).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingFile);

        let empty = Upload::new("empty.json", "  ");
        assert_eq!(
            admin.import_notice(&caller, Some(&empty)),
            Notice::error("Please select a file to import.")
        );
    }

    #[test]
    fn test_malformed_upload_notices() {
        let mut admin = admin_with(&[("city", "Oslo")]);
        let caller = Caller::administrator();

        let bad_json = Upload::new("bad.json", "{oops");
        assert_eq!(
            admin.import_notice(&caller, Some(&bad_json)),
            Notice::error("Invalid JSON file. Please upload a valid export file.")
        );

        let bad_shape = Upload::new("shape.json", r#"{"version":"1.5","data":"not-a-map"}"#);
        assert_eq!(
            admin.import_notice(&caller, Some(&bad_shape)),
            Notice::error("Invalid export file format.")
        );

        assert_eq!(admin.settings().load().unwrap().get("city"), "Oslo");
    }

    #[test]
    fn test_form_values_apply_defaults() {
        let admin = admin_with(&[("city", "Oslo")]);
        let values = admin.form_values(&Caller::administrator()).unwrap();

        assert_eq!(values.get("city"), "Oslo");
        assert_eq!(values.get("out_of_stock_badge"), "Out of stock");
        // Stored record is unchanged
        assert_eq!(admin.settings().load().unwrap().get("out_of_stock_badge"), "");
    }

    #[test]
    fn test_set_cleanup() {
        let mut admin = admin_with(&[]);
        admin.set_cleanup(&Caller::administrator(), true).unwrap();
        assert!(admin.settings().cleanup_enabled().unwrap());
    }
}
