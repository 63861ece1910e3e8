//! global-options-core: site-wide settings with `{global_*}` tag substitution
//!
//! This crate stores a flat record of business, contact and e-commerce
//! fields through a host-supplied option store, and replaces
//! `{global_<field>}` tags in page-builder content with those values.
//!
//! # Example
//!
//! ```rust
//! use global_options_core::{MemoryOptionStore, SettingsStore, TagResolver, Value};
//! use indexmap::IndexMap;
//!
//! let mut store = SettingsStore::new(MemoryOptionStore::new());
//! let mut form = IndexMap::new();
//! form.insert("email".to_string(), Value::from("hello@example.com"));
//! store.save(&form).unwrap();
//!
//! let settings = store.load().unwrap();
//! let resolver = TagResolver::new(&settings);
//! assert_eq!(resolver.resolve_str("Mail {global_email}"), "Mail hello@example.com");
//! ```

pub mod admin;
pub mod error;
pub mod fields;
pub mod pipeline;
pub mod sanitize;
pub mod settings;
pub mod store;
pub mod tags;
pub mod value;

pub use admin::{AdminActions, Caller, Capability, ExportFile, Notice, Upload};
pub use error::{Error, ErrorKind, Result};
pub use pipeline::{ContentTransformer, Hook, RenderContext, TransformerRegistry};
pub use settings::{SettingsOptions, SettingsRecord, SettingsStore, Snapshot};
pub use store::{JsonFileOptionStore, MemoryOptionStore, OptionStore};
pub use tags::TagResolver;
pub use value::Value;
