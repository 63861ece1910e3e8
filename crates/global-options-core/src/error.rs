//! Error types for global-options
//!
//! Errors carry a kind, the option or field key they relate to, and an
//! actionable help message. Admin-facing failures also expose the short
//! notice text the host shows to the user.

use std::fmt;

/// Result type alias for global-options operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for global-options operations
#[derive(Debug, Clone)]
pub struct Error {
    /// The kind of error that occurred
    pub kind: ErrorKind,
    /// Option or field key the error relates to (e.g., "global_options_data")
    pub path: Option<String>,
    /// Actionable help message
    pub help: Option<String>,
    /// Underlying cause (as string for Clone compatibility)
    pub cause: Option<String>,
}

/// Categories of errors that can occur
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    /// An import payload could not be accepted
    #[error("Malformed input: {0}")]
    MalformedInput(MalformedInputKind),
    /// An import was requested without an uploaded file
    #[error("No import file provided")]
    MissingFile,
    /// The caller lacks the capability required for the action
    #[error("Unauthorized access")]
    Unauthorized,
    /// The option store rejected a read or write
    #[error("Option storage error")]
    Storage,
    /// I/O error (file not found, etc.)
    #[error("I/O error")]
    Io,
    /// Internal error (bug in global-options)
    #[error("Internal error")]
    Internal,
}

/// Why an import payload was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MalformedInputKind {
    /// The body is not valid JSON
    #[error("invalid JSON")]
    InvalidJson,
    /// Valid JSON, but not an object with a `data` mapping
    #[error("invalid export file format")]
    InvalidFormat,
}

impl Error {
    fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            path: None,
            help: None,
            cause: None,
        }
    }

    /// Create an error for an import body that is not JSON
    pub fn invalid_json(message: impl Into<String>) -> Self {
        Self {
            help: Some("Upload a file produced by the export action".into()),
            cause: Some(message.into()),
            ..Self::new(ErrorKind::MalformedInput(MalformedInputKind::InvalidJson))
        }
    }

    /// Create an error for a JSON import body with the wrong shape
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self {
            help: Some("The file must be an object with a \"data\" mapping of field values".into()),
            cause: Some(message.into()),
            ..Self::new(ErrorKind::MalformedInput(MalformedInputKind::InvalidFormat))
        }
    }

    /// Create a missing upload error
    pub fn missing_file() -> Self {
        Self {
            help: Some("Choose an export file before submitting the import form".into()),
            ..Self::new(ErrorKind::MissingFile)
        }
    }

    /// Create an authorization failure for the named action
    pub fn unauthorized(action: impl Into<String>) -> Self {
        Self {
            help: Some("This action requires the manage_options capability".into()),
            cause: Some(format!("Action: {}", action.into())),
            ..Self::new(ErrorKind::Unauthorized)
        }
    }

    /// Create a storage error for an option key
    pub fn storage(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: Some(key.into()),
            cause: Some(message.into()),
            ..Self::new(ErrorKind::Storage)
        }
    }

    /// Create an I/O error
    pub fn io(path: impl Into<String>, err: &std::io::Error) -> Self {
        Self {
            path: Some(path.into()),
            cause: Some(err.to_string()),
            ..Self::new(ErrorKind::Io)
        }
    }

    /// Create an internal error (bug in global-options)
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            help: Some("This is likely a bug in global-options. Please report it.".into()),
            cause: Some(message.into()),
            ..Self::new(ErrorKind::Internal)
        }
    }

    /// Add path context to the error
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add help message to the error
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Check whether this is a rejected import payload
    pub fn is_malformed_input(&self) -> bool {
        matches!(self.kind, ErrorKind::MalformedInput(_))
    }

    /// The short notice shown to an admin for this error
    pub fn user_message(&self) -> &'static str {
        match &self.kind {
            ErrorKind::MalformedInput(MalformedInputKind::InvalidJson) => {
                "Invalid JSON file. Please upload a valid export file."
            }
            ErrorKind::MalformedInput(MalformedInputKind::InvalidFormat) => {
                "Invalid export file format."
            }
            ErrorKind::MissingFile => "Please select a file to import.",
            ErrorKind::Unauthorized => "Unauthorized access",
            ErrorKind::Storage | ErrorKind::Io => "Settings could not be saved.",
            ErrorKind::Internal => "Something went wrong.",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;

        if let Some(path) = &self.path {
            write!(f, "\n  Path: {}", path)?;
        }

        if let Some(cause) = &self.cause {
            write!(f, "\n  {}", cause)?;
        }

        if let Some(help) = &self.help {
            write!(f, "\n  Help: {}", help)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_json_error_display() {
        let err = Error::invalid_json("expected value at line 1 column 1");
        let display = format!("{}", err);

        assert!(display.contains("Malformed input: invalid JSON"));
        assert!(display.contains("expected value at line 1 column 1"));
        assert!(display.contains("Help:"));
        assert!(err.is_malformed_input());
    }

    #[test]
    fn test_invalid_format_user_message() {
        let err = Error::invalid_format("\"data\" is not a mapping");
        assert_eq!(err.user_message(), "Invalid export file format.");
        assert_eq!(
            err.kind,
            ErrorKind::MalformedInput(MalformedInputKind::InvalidFormat)
        );
    }

    #[test]
    fn test_missing_file_user_message() {
        let err = Error::missing_file();
        assert_eq!(err.user_message(), "Please select a file to import.");
        assert!(!err.is_malformed_input());
    }

    #[test]
    fn test_unauthorized_error_display() {
        let err = Error::unauthorized("export");
        let display = format!("{}", err);

        assert!(display.contains("Unauthorized access"));
        assert!(display.contains("Action: export"));
        assert!(display.contains("manage_options"));
    }

    #[test]
    fn test_storage_error_with_path() {
        let err = Error::storage("global_options_data", "disk full");
        let display = format!("{}", err);

        assert!(display.contains("Option storage error"));
        assert!(display.contains("Path: global_options_data"));
        assert!(display.contains("disk full"));
    }

    #[test]
    fn test_with_help() {
        let err = Error::internal("bad state").with_help("Try again");
        let display = format!("{}", err);

        assert!(display.contains("Help: Try again"));
    }
}
