//! Spectral data used by the leaf and canopy models
//!
//! The PROSPECT coefficients, the two soil endmembers and the direct/diffuse
//! solar irradiance are tabulated on a common wavelength grid (typically
//! 400-2500 nm at 1 nm) and loaded at runtime from a CSV file.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

pub mod response;
pub mod sensor;

pub use response::{BandAggregator, SpectralResponse};
pub use sensor::{Sensor, SensorBands};

#[derive(Debug, Error)]
pub enum SpectralError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing column '{0}'")]
    MissingColumn(String),

    #[error("Row {row}, column '{column}': '{value}' is not a number")]
    Parse {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Wavelengths must be strictly ascending (row {0})")]
    NotAscending(usize),

    #[error("Spectral table is empty")]
    Empty,

    #[error("Unknown band '{0}'")]
    UnknownBand(String),

    #[error("Band '{0}' has no response over the simulated wavelengths")]
    EmptyBand(String),

    #[error("Spectrum has {found} values, expected {expected}")]
    LengthMismatch { expected: usize, found: usize },
}

pub const LIBRARY_COLUMNS: [&str; 14] = [
    "wavelength",
    "nr",
    "kab",
    "kcar",
    "kant",
    "kbrown",
    "kw",
    "km",
    "kprot",
    "kcbc",
    "rsoil_dry",
    "rsoil_wet",
    "es",
    "ed",
];

/// PROSPECT refractive index and specific absorption coefficients, soil
/// endmembers and solar irradiance, one entry per wavelength (nm).
#[derive(Debug, Clone, Default)]
pub struct SpectralLibrary {
    pub wavelengths: Vec<f64>,
    pub nr: Vec<f64>,
    pub kab: Vec<f64>,
    pub kcar: Vec<f64>,
    pub kant: Vec<f64>,
    pub kbrown: Vec<f64>,
    pub kw: Vec<f64>,
    pub km: Vec<f64>,
    pub kprot: Vec<f64>,
    pub kcbc: Vec<f64>,
    pub rsoil_dry: Vec<f64>,
    pub rsoil_wet: Vec<f64>,
    pub es: Vec<f64>,
    pub ed: Vec<f64>,
}

impl SpectralLibrary {
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self, SpectralError> {
        let reader = csv::Reader::from_path(path)?;
        Self::from_reader(reader)
    }

    pub fn from_reader<R: std::io::Read>(
        mut reader: csv::Reader<R>,
    ) -> Result<Self, SpectralError> {
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();

        let mut index = HashMap::new();
        for name in LIBRARY_COLUMNS {
            let idx = headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| SpectralError::MissingColumn(name.to_string()))?;
            index.insert(name, idx);
        }

        let mut columns: HashMap<&str, Vec<f64>> =
            LIBRARY_COLUMNS.iter().map(|&name| (name, Vec::new())).collect();

        for (row_no, record) in reader.records().enumerate() {
            let record = record?;
            for name in LIBRARY_COLUMNS {
                let raw = record.get(index[name]).unwrap_or("").trim();
                let value = raw.parse::<f64>().map_err(|_| SpectralError::Parse {
                    row: row_no,
                    column: name.to_string(),
                    value: raw.to_string(),
                })?;
                if let Some(column) = columns.get_mut(name) {
                    column.push(value);
                }
            }
        }

        let mut take = |name: &str| columns.remove(name).unwrap_or_default();
        let library = SpectralLibrary {
            wavelengths: take("wavelength"),
            nr: take("nr"),
            kab: take("kab"),
            kcar: take("kcar"),
            kant: take("kant"),
            kbrown: take("kbrown"),
            kw: take("kw"),
            km: take("km"),
            kprot: take("kprot"),
            kcbc: take("kcbc"),
            rsoil_dry: take("rsoil_dry"),
            rsoil_wet: take("rsoil_wet"),
            es: take("es"),
            ed: take("ed"),
        };

        library.validate()?;
        log::info!(
            "Loaded spectral library with {} wavelengths ({}-{} nm)",
            library.len(),
            library.wavelengths[0],
            library.wavelengths[library.len() - 1]
        );

        Ok(library)
    }

    fn validate(&self) -> Result<(), SpectralError> {
        if self.wavelengths.is_empty() {
            return Err(SpectralError::Empty);
        }

        if let Some(row) = self
            .wavelengths
            .windows(2)
            .position(|pair| pair[1] <= pair[0])
        {
            return Err(SpectralError::NotAscending(row + 1));
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.wavelengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelengths.is_empty()
    }

    /// Indices of the wavelengths falling in `[start, end)`.
    pub fn window(&self, start: f64, end: f64) -> std::ops::Range<usize> {
        let lo = self.wavelengths.partition_point(|&wl| wl < start);
        let hi = self.wavelengths.partition_point(|&wl| wl < end);
        lo..hi.max(lo)
    }

    /// Soil reflectance as a brightness-scaled mix of the dry and wet endmembers.
    pub fn soil_reflectance(&self, rsoil: f64, psoil: f64) -> Vec<f64> {
        self.rsoil_dry
            .iter()
            .zip(&self.rsoil_wet)
            .map(|(dry, wet)| rsoil * (psoil * dry + (1.0 - psoil) * wet))
            .collect()
    }
}
