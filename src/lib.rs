//! SQLite query utilities and a country table exporter.
//!
//! # Intention
//!
//! - Run literal SQL statements against one SQLite file and reflect its schema.
//! - Export a country table to CSV (or JSON) with a derived density column.
//!
//! # Architectural Boundaries
//!
//! - Only SQLite access and the export transform belong here.
//! - Connections are opened per call; nothing is pooled or cached.

pub mod config;
pub mod error;
pub mod export;
pub mod sqlite;

pub use config::ExportConfig;
pub use error::{ExportError, Result};
pub use export::{derive_records, export, ColumnMapping, DerivedRecord, OutputFormat};
pub use sqlite::{Row, SqliteConfig, SqliteStore, Value};
