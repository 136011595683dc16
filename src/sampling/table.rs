use std::path::Path;

use indexmap::IndexMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Row {row}, column '{column}': '{value}' is not a number")]
    Parse {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Column '{column}' has {found} values, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("Missing column '{0}'")]
    MissingColumn(String),
}

/// Named numeric columns of equal length, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleTable {
    columns: IndexMap<String, Vec<f64>>,
    rows: usize,
}

impl SampleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a column. The first column fixes the number of rows.
    pub fn insert_column(&mut self, name: &str, values: Vec<f64>) -> Result<(), TableError> {
        if !self.columns.is_empty() && values.len() != self.rows {
            return Err(TableError::LengthMismatch {
                column: name.to_string(),
                expected: self.rows,
                found: values.len(),
            });
        }
        self.rows = values.len();
        self.columns.insert(name.to_string(), values);
        Ok(())
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(|c| c.as_slice())
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Vec<f64>> {
        self.columns.get_mut(name)
    }

    pub fn require(&self, name: &str) -> Result<&[f64], TableError> {
        self.column(name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn row(&self, index: usize) -> Vec<f64> {
        self.columns.values().map(|c| c[index]).collect()
    }

    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        let reader = csv::Reader::from_path(path)?;
        Self::from_reader(reader)
    }

    pub fn from_reader<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Self, TableError> {
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let mut values = vec![Vec::new(); headers.len()];

        for (row_no, record) in reader.records().enumerate() {
            let record = record?;
            for (col, raw) in record.iter().enumerate().take(headers.len()) {
                let raw = raw.trim();
                let value = raw.parse::<f64>().map_err(|_| TableError::Parse {
                    row: row_no,
                    column: headers[col].clone(),
                    value: raw.to_string(),
                })?;
                values[col].push(value);
            }
        }

        let mut table = SampleTable::new();
        for (name, column) in headers.iter().zip(values) {
            table.insert_column(name, column)?;
        }
        Ok(table)
    }

    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), TableError> {
        let writer = csv::Writer::from_path(path)?;
        self.write(writer)
    }

    pub fn write<W: std::io::Write>(&self, mut writer: csv::Writer<W>) -> Result<(), TableError> {
        writer.write_record(self.columns.keys())?;
        for i in 0..self.rows {
            writer.write_record(self.row(i).iter().map(|v| v.to_string()))?;
        }
        writer.flush()?;
        Ok(())
    }
}
