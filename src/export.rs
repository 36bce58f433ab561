//! Country table export.
//!
//! Reads every row of a country table, derives `density = population / area`
//! and writes `name,area_sqkm,population_2013,density` to a file. Columns are
//! located by name through the store's schema, so the physical column order of
//! the source table does not matter and the index column never reaches the
//! output.

use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{ExportError, Result};
use crate::sqlite::{quote_identifier, Row, SqliteStore, Value};

/// Header of the exported CSV file
pub const CSV_HEADER: [&str; 4] = ["name", "area_sqkm", "population_2013", "density"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

/// Source table and the names of the columns read from it
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMapping {
    pub table: String,
    pub name: String,
    pub area: String,
    pub population: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            table: "countries".to_string(),
            name: "name".to_string(),
            area: "area".to_string(),
            population: "population".to_string(),
        }
    }
}

/// Positions of the mapped columns within a `select *` row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnPositions {
    name: usize,
    area: usize,
    population: usize,
}

impl ColumnMapping {
    fn resolve(&self, columns: &[String]) -> Result<ColumnPositions> {
        let position = |column: &str| {
            columns
                .iter()
                .position(|c| c == column)
                .ok_or_else(|| ExportError::MissingColumn {
                    table: self.table.clone(),
                    column: column.to_string(),
                })
        };
        Ok(ColumnPositions {
            name: position(self.name.as_str())?,
            area: position(self.area.as_str())?,
            population: position(self.population.as_str())?,
        })
    }
}

/// Numeric cell that keeps integers printed as integers
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Numeric {
    Integer(i64),
    Real(f64),
}

impl Numeric {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Integer(i) => Some(Numeric::Integer(*i)),
            Value::Real(r) => Some(Numeric::Real(*r)),
            _ => None,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Numeric::Integer(i) => i as f64,
            Numeric::Real(r) => r,
        }
    }
}

/// One row of a country table
#[derive(Debug, Clone, PartialEq)]
pub struct Country {
    pub name: String,
    pub area: Numeric,
    pub population: Numeric,
}

impl Country {
    fn from_row(row: &Row, positions: ColumnPositions, mapping: &ColumnMapping) -> Result<Self> {
        let name = match row.get(positions.name) {
            Some(Value::Text(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let numeric = |index: usize, column: &str| {
            row.get(index)
                .and_then(Numeric::from_value)
                .ok_or_else(|| ExportError::NonNumeric {
                    column: column.to_string(),
                    name: name.clone(),
                })
        };
        let area = numeric(positions.area, mapping.area.as_str())?;
        let population = numeric(positions.population, mapping.population.as_str())?;
        Ok(Self {
            name,
            area,
            population,
        })
    }

    /// Population per unit of area. A zero area or a non-finite input or
    /// result is an error, never `inf` or `NaN`.
    pub fn density(&self) -> Result<f64> {
        let area = self.area.as_f64();
        let population = self.population.as_f64();
        let non_finite = || ExportError::NonFinite {
            name: self.name.clone(),
        };
        if !area.is_finite() || !population.is_finite() {
            return Err(non_finite());
        }
        if area == 0.0 {
            return Err(ExportError::ZeroArea {
                name: self.name.clone(),
            });
        }
        let density = population / area;
        if !density.is_finite() {
            // subnormal areas overflow
            return Err(non_finite());
        }
        Ok(density)
    }
}

/// A written output row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedRecord {
    pub name: String,
    pub area_sqkm: Numeric,
    pub population_2013: Numeric,
    pub density: f64,
}

impl TryFrom<Country> for DerivedRecord {
    type Error = ExportError;

    fn try_from(country: Country) -> Result<Self> {
        let density = country.density()?;
        Ok(Self {
            name: country.name,
            area_sqkm: country.area,
            population_2013: country.population,
            density,
        })
    }
}

/// Reads `mapping.table` and derives one record per row, in table order.
pub fn derive_records(store: &SqliteStore, mapping: &ColumnMapping) -> Result<Vec<DerivedRecord>> {
    let columns = store.columns(&mapping.table)?;
    let positions = mapping.resolve(&columns)?;
    debug!(
        "resolved columns of {}: {:?} -> {:?}",
        mapping.table, columns, positions
    );

    let rows = store.execute(&format!("select * from {}", quote_identifier(&mapping.table)))?;
    rows.iter()
        .map(|row| DerivedRecord::try_from(Country::from_row(row, positions, mapping)?))
        .collect()
}

/// Exports `mapping.table` to `destination`, replacing any existing file.
///
/// Every record is derived before the file is opened, so a failing row leaves
/// the destination untouched.
pub fn export(
    store: &SqliteStore,
    destination: &Path,
    mapping: &ColumnMapping,
    format: OutputFormat,
) -> Result<usize> {
    let records = derive_records(store, mapping)?;

    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(destination)?;
    match format {
        OutputFormat::Csv => write_csv(file, &records)?,
        OutputFormat::Json => write_json(file, &records)?,
    }

    info!(
        "exported {} rows from {} to {}",
        records.len(),
        mapping.table,
        destination.display()
    );
    Ok(records.len())
}

/// Writes the header line followed by one line per record
pub fn write_csv<W: Write>(writer: W, records: &[DerivedRecord]) -> Result<()> {
    // header is written by hand so an empty table still gets one
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(CSV_HEADER)?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<W: Write>(mut writer: W, records: &[DerivedRecord]) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn country(name: &str, area: Numeric, population: Numeric) -> Country {
        Country {
            name: name.to_string(),
            area,
            population,
        }
    }

    #[test]
    fn test_density() {
        let andorra = country("Andorra", Numeric::Integer(470), Numeric::Integer(85000));
        assert_eq!(andorra.density().unwrap(), 85000.0 / 470.0);
    }

    #[test]
    fn test_density_zero_area() {
        let nowhere = country("Nowhere", Numeric::Real(0.0), Numeric::Integer(10));
        let err = nowhere.density().unwrap_err();
        assert!(matches!(err, ExportError::ZeroArea { ref name } if name == "Nowhere"));
    }

    #[test]
    fn test_density_rejects_non_finite() {
        let tiny = country("Tiny", Numeric::Real(5e-324), Numeric::Integer(10));
        assert!(
            matches!(tiny.density(), Err(ExportError::NonFinite { ref name }) if name == "Tiny")
        );

        let huge = country(
            "Huge",
            Numeric::Real(f64::INFINITY),
            Numeric::Real(f64::INFINITY),
        );
        assert!(matches!(huge.density(), Err(ExportError::NonFinite { .. })));

        let crowded = country("Crowded", Numeric::Integer(1), Numeric::Real(f64::INFINITY));
        assert!(matches!(crowded.density(), Err(ExportError::NonFinite { .. })));
    }

    #[test]
    fn test_resolve_by_name() {
        let columns: Vec<String> = ["population", "index", "area", "name"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let positions = ColumnMapping::default().resolve(&columns).unwrap();
        assert_eq!(
            positions,
            ColumnPositions {
                name: 3,
                area: 2,
                population: 0
            }
        );
    }

    #[test]
    fn test_resolve_missing_column() {
        let columns: Vec<String> = ["index", "name", "size", "population"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let err = ColumnMapping::default().resolve(&columns).unwrap_err();
        assert!(matches!(err, ExportError::MissingColumn { ref column, .. } if column == "area"));
    }

    #[test]
    fn test_from_row_rejects_text_area() {
        let row = Row::new(vec![
            Value::Integer(0),
            Value::from("Andorra"),
            Value::from("big"),
            Value::Integer(85000),
        ]);
        let positions = ColumnPositions {
            name: 1,
            area: 2,
            population: 3,
        };
        let err = Country::from_row(&row, positions, &ColumnMapping::default()).unwrap_err();
        assert!(matches!(err, ExportError::NonNumeric { ref column, .. } if column == "area"));
    }

    #[test]
    fn test_write_csv() {
        let records = vec![DerivedRecord::try_from(country(
            "Andorra",
            Numeric::Integer(470),
            Numeric::Integer(85000),
        ))
        .unwrap()];
        let mut out = Vec::new();
        write_csv(&mut out, &records).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "name,area_sqkm,population_2013,density\nAndorra,470,85000,180.85106382978722\n"
        );
    }

    #[test]
    fn test_write_csv_exponent_notation() {
        let records = vec![
            DerivedRecord {
                name: "Sparse".to_string(),
                area_sqkm: Numeric::Integer(1_000_000),
                population_2013: Numeric::Integer(1),
                density: 1e-6,
            },
            DerivedRecord {
                name: "Dense".to_string(),
                area_sqkm: Numeric::Real(1e-10),
                population_2013: Numeric::Integer(1_000_000),
                density: 1e16,
            },
        ];
        let mut out = Vec::new();
        write_csv(&mut out, &records).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "name,area_sqkm,population_2013,density\n\
             Sparse,1000000,1,1e-6\n\
             Dense,1e-10,1000000,1e16\n"
        );
    }

    #[test]
    fn test_write_csv_empty() {
        let mut out = Vec::new();
        write_csv(&mut out, &[]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "name,area_sqkm,population_2013,density\n"
        );
    }

    #[test]
    fn test_write_json() {
        let records = vec![DerivedRecord {
            name: "Tiny".to_string(),
            area_sqkm: Numeric::Real(2.5),
            population_2013: Numeric::Integer(10),
            density: 4.0,
        }];
        let mut out = Vec::new();
        write_json(&mut out, &records).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(
            parsed,
            serde_json::json!([
                {"name": "Tiny", "area_sqkm": 2.5, "population_2013": 10, "density": 4.0}
            ])
        );
    }
}
