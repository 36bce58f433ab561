use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{ExportError, Result};
use crate::export::ColumnMapping;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Path to the SQLite database file
    pub db_path: PathBuf,

    /// Table holding the country rows
    pub table: String,

    /// Default export destination
    pub output: PathBuf,

    pub name_column: String,
    pub area_column: String,
    pub population_column: String,
}

const EMPTY_CONFIG: &str = r#"### sqlite-export configuration file

### SQLite database to read from
# db_path = "./database.db"

### source table and its columns
# table = "countries"
# name_column = "name"
# area_column = "area"
# population_column = "population"

### export destination
# output = "./files/out_csv_file.csv"
"#;

impl Default for ExportConfig {
    fn default() -> Self {
        let mapping = ColumnMapping::default();
        Self {
            db_path: PathBuf::from("./database.db"),
            table: mapping.table,
            output: PathBuf::from("./files/out_csv_file.csv"),
            name_column: mapping.name,
            area_column: mapping.area,
            population_column: mapping.population,
        }
    }
}

impl ExportConfig {
    /// Builds the configuration from an optional TOML file, then environment
    /// variables prefixed with `SQLITE_EXPORT_`.
    ///
    /// A config path that does not exist yet is created with a commented
    /// template and the defaults apply.
    pub fn new(path: &Option<String>) -> Result<ExportConfig> {
        let mut builder = Config::builder();

        if let Some(p) = path {
            if Path::new(p).exists() {
                builder = builder.add_source(File::new(p, FileFormat::Toml));
            } else {
                std::fs::write(p, EMPTY_CONFIG).map_err(|e| ExportError::Config {
                    reason: format!("unable to create config file {}: {}", p, e),
                })?;
            }
        }

        // e.g. `SQLITE_EXPORT_DB_PATH=./other.db sqlite-export export`
        builder = builder.add_source(Environment::with_prefix("SQLITE_EXPORT"));

        builder
            .build()
            .and_then(|settings| settings.try_deserialize::<ExportConfig>())
            .map_err(|e| ExportError::Config {
                reason: e.to_string(),
            })
    }

    pub fn mapping(&self) -> ColumnMapping {
        ColumnMapping {
            table: self.table.clone(),
            name: self.name_column.clone(),
            area: self.area_column.clone(),
            population: self.population_column.clone(),
        }
    }
}
