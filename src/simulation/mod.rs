//! Batch PROSAIL simulation of sampled input points
//!
//! Each row of a sample table is run through PROSPECT + 4SAIL. The canopy
//! reflectance is kept as a full spectrum, aggregated into sensor bands and
//! complemented by the fAPAR of the same canopy.

use std::ops::Range;
use std::path::Path;

use thiserror::Error;

pub mod batch_runner;

pub use batch_runner::{BatchOutput, BatchRunner};

use crate::config::{Config, ConfigError};
use crate::fapar::{FaparError, fapar_from_output};
use crate::prosail::{ModelOptions, ProsailParameters, ReflectanceFactor, run_prosail};
use crate::prospect::LeafParameters;
use crate::sail::{SailError, ViewGeometry};
use crate::sampling::{SampleTable, TableError};
use crate::spectral::{BandAggregator, SpectralError, SpectralLibrary, SpectralResponse};

pub const FAPAR_COLUMN: &str = "fAPAR";

/// Columns every input table must carry.
const REQUIRED_COLUMNS: [&str; 11] = [
    "n", "cab", "car", "cbrown", "cw", "cm", "lai", "lidfa", "hspot", "rsoil", "psoil",
];

/// PROSPECT-D/PRO pigments and proteins, zero when absent.
const OPTIONAL_COLUMNS: [&str; 3] = ["ant", "prot", "cbc"];

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Spectral(#[from] SpectralError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Model(#[from] SailError),

    #[error(transparent)]
    Fapar(#[from] FaparError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid input pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Cannot read input path: {0}")]
    Glob(#[from] glob::GlobError),

    #[error("No input table matches '{0}'")]
    NoInputs(String),
}

/// One simulated canopy.
#[derive(Debug, Clone)]
pub struct SimulatedPoint {
    pub spectrum: Vec<f64>,
    pub bands: Vec<f64>,
    pub fapar: f64,
}

pub struct Simulator {
    library: SpectralLibrary,
    aggregator: BandAggregator,
    geometry: ViewGeometry,
    options: ModelOptions,
    fapar_window: Range<usize>,
}

impl Simulator {
    pub fn new(
        library: SpectralLibrary,
        response: &SpectralResponse,
        bands: &[String],
        geometry: ViewGeometry,
        options: ModelOptions,
        fapar_window: (f64, f64),
    ) -> Result<Self, SimulationError> {
        let aggregator = response.aggregator(&library.wavelengths, bands)?;

        let window = library.window(fapar_window.0, fapar_window.1);
        if window.is_empty() {
            return Err(FaparError::EmptyWindow {
                start: fapar_window.0,
                end: fapar_window.1,
            }
            .into());
        }

        Ok(Self {
            library,
            aggregator,
            geometry,
            options,
            fapar_window: window,
        })
    }

    /// Loads the spectral library and the sensor response named in `config`.
    pub fn from_config(config: &Config) -> Result<Self, SimulationError> {
        let library_path = config.spectral_library_path()?;
        let response_path = config.spectral_response_path()?;
        log::info!("Spectral library: {}", library_path.display());
        log::info!("Spectral response: {}", response_path.display());

        let library = SpectralLibrary::from_csv(&library_path)?;
        let response = SpectralResponse::from_csv(&response_path)?;

        Self::new(
            library,
            &response,
            config.bands(),
            *config.geometry(),
            *config.model_options(),
            config.fapar_window(),
        )
    }

    pub fn bands(&self) -> &[String] {
        self.aggregator.bands()
    }

    pub fn wavelengths(&self) -> &[f64] {
        &self.library.wavelengths
    }

    pub fn simulate_point(
        &self,
        params: &ProsailParameters,
    ) -> Result<SimulatedPoint, SimulationError> {
        let output = run_prosail(params, &self.geometry, &self.options, &self.library, None)?;

        let spectrum = output.reflectance(ReflectanceFactor::Sdr).to_vec();
        let bands = self.aggregator.aggregate(&spectrum)?;
        let fapar = fapar_from_output(
            &output,
            &self.library,
            self.geometry.tts,
            self.fapar_window.clone(),
        );

        Ok(SimulatedPoint {
            spectrum,
            bands,
            fapar,
        })
    }

    pub fn simulate(&self, table: &SampleTable) -> Result<SimulationResult, SimulationError> {
        let rows = RowReader::new(table)?;
        let step = (table.len() / 10).max(1);

        log::info!(
            "Simulating {} canopies with {} ({} bands)",
            table.len(),
            self.options.version,
            self.bands().len()
        );

        let mut points = Vec::with_capacity(table.len());
        for i in 0..table.len() {
            points.push(self.simulate_point(&rows.parameters(i))?);
            if (i + 1) % step == 0 {
                log::debug!("{}/{} canopies simulated", i + 1, table.len());
            }
        }

        Ok(SimulationResult {
            inputs: table.clone(),
            bands: self.bands().to_vec(),
            wavelengths: self.library.wavelengths.clone(),
            points,
        })
    }
}

/// Column lookups resolved once per table.
struct RowReader<'a> {
    required: Vec<&'a [f64]>,
    optional: Vec<Option<&'a [f64]>>,
}

impl<'a> RowReader<'a> {
    fn new(table: &'a SampleTable) -> Result<Self, TableError> {
        let required = REQUIRED_COLUMNS
            .iter()
            .map(|name| table.require(name))
            .collect::<Result<Vec<_>, _>>()?;

        let optional: Vec<_> = OPTIONAL_COLUMNS.iter().map(|name| table.column(name)).collect();
        for (name, column) in OPTIONAL_COLUMNS.iter().zip(&optional) {
            if column.is_none() {
                log::warn!("No '{}' column in the input table, using 0", name);
            }
        }

        Ok(Self { required, optional })
    }

    fn parameters(&self, i: usize) -> ProsailParameters {
        let r = |k: usize| self.required[k][i];
        let o = |k: usize| self.optional[k].map_or(0.0, |c| c[i]);

        ProsailParameters {
            leaf: LeafParameters {
                n: r(0),
                cab: r(1),
                car: r(2),
                cbrown: r(3),
                cw: r(4),
                cm: r(5),
                ant: o(0),
                prot: o(1),
                cbc: o(2),
            },
            lai: r(6),
            lidfa: r(7),
            hspot: r(8),
            rsoil: r(9),
            psoil: r(10),
        }
    }
}

/// Inputs with their simulated spectra, band reflectance and fAPAR.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    inputs: SampleTable,
    bands: Vec<String>,
    wavelengths: Vec<f64>,
    points: Vec<SimulatedPoint>,
}

impl SimulationResult {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[SimulatedPoint] {
        &self.points
    }

    pub fn fapar(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.fapar).collect()
    }

    pub fn band(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.bands.iter().position(|b| b == name)?;
        Some(self.points.iter().map(|p| p.bands[idx]).collect())
    }

    /// Input columns followed by one column per band and `fAPAR`.
    pub fn to_table(&self) -> Result<SampleTable, TableError> {
        let mut table = self.inputs.clone();
        for (idx, band) in self.bands.iter().enumerate() {
            table.insert_column(band, self.points.iter().map(|p| p.bands[idx]).collect())?;
        }
        table.insert_column(FAPAR_COLUMN, self.fapar())?;
        Ok(table)
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), SimulationError> {
        self.to_table()?.to_csv(path)?;
        Ok(())
    }

    /// One row per canopy, one column per library wavelength.
    pub fn write_spectra_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), SimulationError> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(self.wavelengths.iter().map(|w| w.to_string()))?;
        for point in &self.points {
            writer.write_record(point.spectrum.iter().map(|v| v.to_string()))?;
        }
        writer.flush()?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{simulator, table};
    use super::*;
    use crate::fapar::{PAR_WINDOW, calculate_fapar};
    use crate::prosail::fixtures::{geometry, wheat};
    use tempfile::tempdir;

    #[test]
    fn test_point_matches_fapar_calculator() {
        let simulator = simulator();
        let point = simulator.simulate_point(&wheat()).unwrap();

        let expected = calculate_fapar(
            &wheat(),
            &geometry(),
            &ModelOptions::default(),
            &crate::spectral::test_library::synthetic(),
            PAR_WINDOW,
        )
        .unwrap();
        assert!((point.fapar - expected).abs() < 1e-12);
        assert_eq!(point.spectrum.len(), simulator.wavelengths().len());
        assert_eq!(point.bands.len(), 2);
        // NIR plateau above the red
        assert!(point.bands[1] > point.bands[0]);
    }

    #[test]
    fn test_simulate_table() {
        let simulator = simulator();
        let result = simulator.simulate(&table(&[0.5, 2.0, 5.0])).unwrap();

        assert_eq!(result.len(), 3);
        let fapar = result.fapar();
        assert!(fapar[0] < fapar[1] && fapar[1] < fapar[2], "{fapar:?}");

        let table = result.to_table().unwrap();
        let names: Vec<_> = table.names().collect();
        assert_eq!(&names[names.len() - 3..], &["B4", "B8", "fAPAR"]);
        assert_eq!(table.column("lai").unwrap(), &[0.5, 2.0, 5.0]);
        assert_eq!(result.band("B8").unwrap().len(), 3);
        assert!(result.band("B2").is_none());
    }

    #[test]
    fn test_rows_are_independent() {
        let simulator = simulator();
        let alone = simulator.simulate(&table(&[2.0])).unwrap();
        let mixed = simulator.simulate(&table(&[6.0, 2.0, 0.1])).unwrap();

        assert_eq!(alone.points()[0].bands, mixed.points()[1].bands);
        assert_eq!(alone.points()[0].fapar, mixed.points()[1].fapar);
    }

    #[test]
    fn test_missing_column() {
        let mut samples = SampleTable::new();
        samples.insert_column("lai", vec![1.0]).unwrap();
        let err = simulator().simulate(&samples).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::Table(TableError::MissingColumn(ref c)) if c == "n"
        ));
    }

    #[test]
    fn test_optional_columns_default_to_zero() {
        let simulator = simulator();
        let mut full = table(&[3.0]);
        for name in ["ant", "prot", "cbc"] {
            full.insert_column(name, vec![0.0]).unwrap();
        }

        let mut reduced = SampleTable::new();
        for name in full.names().filter(|n| !["ant", "prot", "cbc"].contains(n)) {
            reduced
                .insert_column(name, full.column(name).unwrap().to_vec())
                .unwrap();
        }

        let a = simulator.simulate(&full).unwrap();
        let b = simulator.simulate(&reduced).unwrap();
        assert_eq!(a.points()[0].bands, b.points()[0].bands);
    }

    #[test]
    fn test_empty_fapar_window() {
        let err = Simulator::new(
            crate::spectral::test_library::synthetic(),
            &super::fixtures::response(),
            &["B4".to_string()],
            geometry(),
            ModelOptions::default(),
            (2000.0, 2100.0),
        );
        assert!(matches!(err, Err(SimulationError::Fapar(FaparError::EmptyWindow { .. }))));
    }

    #[test]
    fn test_write_outputs() {
        let dir = tempdir().unwrap();
        let result = simulator().simulate(&table(&[1.0, 4.0])).unwrap();

        let simulated = dir.path().join("simulated.csv");
        result.write_csv(&simulated).unwrap();
        let read = SampleTable::from_csv(&simulated).unwrap();
        assert_eq!(read.len(), 2);
        assert_eq!(read.column(FAPAR_COLUMN).unwrap(), result.fapar().as_slice());

        let spectra = dir.path().join("spectra.csv");
        result.write_spectra_csv(&spectra).unwrap();
        let read = SampleTable::from_csv(&spectra).unwrap();
        assert_eq!(read.len(), 2);
        assert_eq!(read.width(), simulator().wavelengths().len());
    }
}
