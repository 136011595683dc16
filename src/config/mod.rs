use chrono::NaiveDateTime;
use indexmap::IndexMap;

use serde::Deserialize;
use serde::Deserializer;
use serde::de::Error;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::fapar::PAR_WINDOW;
use crate::prosail::ModelOptions;
use crate::prospect::ProspectVersion;
use crate::sail::ViewGeometry;
use crate::sampling::{DistributionLaw, ParameterRange, SamplingError};
use crate::solar::sun_zenith_angle;
use crate::spectral::{Sensor, SensorBands};
use crate::utils::resolve_data_file;

pub mod error;
pub use error::ConfigError;

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

#[derive(Debug, Clone)]
pub struct Config {
    num_samples: usize,
    lai_max: f64,
    seed: Option<u64>,
    parameters: IndexMap<String, ParameterRange>,
    distribution_laws: IndexMap<String, String>,
    geometry: ViewGeometry,
    options: ModelOptions,
    spectral_library: String,
    spectral_response: String,
    data_directory: Option<String>,
    bands: Vec<String>,
    fapar_window: (f64, f64),
    output_directory: String,
    input_pattern: Option<String>,
    write_spectra: bool,
}

// Deserializes a Config through a helper struct so that the sampling ranges,
// the distribution laws, the geometry and the model options are checked
// before anything is simulated.
impl<'de> Deserialize<'de> for Config {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ConfigHelper {
            num_samples: usize,
            lai_max: f64,
            seed: Option<u64>,
            parameters: IndexMap<String, ParameterRange>,
            distribution_laws: IndexMap<String, String>,
            geometry: GeometryHelper,
            leaf_model: Option<String>,
            canopy: Option<CanopyHelper>,
            spectral_library: String,
            spectral_response: String,
            data_directory: Option<String>,
            sensor: Option<Sensor>,
            bands: Option<Vec<String>>,
            fapar_window: Option<[f64; 2]>,
            output_directory: Option<String>,
            input_pattern: Option<String>,
            #[serde(default)]
            write_spectra: bool,
        }

        #[derive(Deserialize)]
        struct GeometryHelper {
            tts: Option<f64>,
            datetime: Option<String>,
            longitude: Option<f64>,
            latitude: Option<f64>,
            #[serde(default)]
            tto: f64,
            #[serde(default)]
            psi: f64,
        }

        #[derive(Deserialize)]
        struct CanopyHelper {
            typelidf: Option<u8>,
            lidfb: Option<f64>,
            alpha: Option<f64>,
        }

        let helper = ConfigHelper::deserialize(deserializer)?;

        if helper.num_samples == 0 {
            return Err(D::Error::custom(ConfigError::NonPositive("num_samples")));
        }
        if !(helper.lai_max > 0.0) {
            return Err(D::Error::custom(ConfigError::NonPositive("lai_max")));
        }

        // Every sampled parameter needs a valid range and a known law
        for (parameter, range) in &helper.parameters {
            range.validate(parameter).map_err(D::Error::custom)?;
            let name = helper.distribution_laws.get(parameter).ok_or_else(|| {
                D::Error::custom(ConfigError::Sampling(SamplingError::MissingDistribution(
                    parameter.clone(),
                )))
            })?;
            DistributionLaw::parse(parameter, name).map_err(D::Error::custom)?;
        }

        // Sun position: explicit angle, or computed from time and place
        let geometry = helper.geometry;
        let tts = match (
            geometry.tts,
            geometry.datetime,
            geometry.longitude,
            geometry.latitude,
        ) {
            (Some(tts), _, _, _) => tts,
            (None, Some(datetime), Some(longitude), Some(latitude)) => {
                let datetime = parse_datetime(&datetime).ok_or_else(|| {
                    D::Error::custom(ConfigError::Geometry(format!(
                        "cannot parse datetime '{}'",
                        datetime
                    )))
                })?;
                sun_zenith_angle(datetime, longitude, latitude)
            }
            _ => {
                return Err(D::Error::custom(ConfigError::Geometry(
                    "give either tts or datetime, longitude and latitude".to_string(),
                )));
            }
        };

        if !(0.0..90.0).contains(&tts) {
            return Err(D::Error::custom(ConfigError::Geometry(format!(
                "solar zenith angle {:.2} is not in [0, 90)",
                tts
            ))));
        }
        if !(0.0..90.0).contains(&geometry.tto) {
            return Err(D::Error::custom(ConfigError::Geometry(format!(
                "observer zenith angle {:.2} is not in [0, 90)",
                geometry.tto
            ))));
        }

        let version = match helper.leaf_model {
            Some(name) => name
                .parse::<ProspectVersion>()
                .map_err(|e| D::Error::custom(ConfigError::LeafModel(e)))?,
            None => ProspectVersion::default(),
        };

        let defaults = ModelOptions::default();
        let options = match helper.canopy {
            Some(canopy) => ModelOptions {
                version,
                alpha: canopy.alpha.unwrap_or(defaults.alpha),
                typelidf: canopy.typelidf.unwrap_or(defaults.typelidf),
                lidfb: canopy.lidfb.unwrap_or(defaults.lidfb),
            },
            None => ModelOptions {
                version,
                ..defaults
            },
        };
        if !matches!(options.typelidf, 1 | 2) {
            return Err(D::Error::custom(ConfigError::LidfType(options.typelidf)));
        }

        let bands = match helper.bands {
            Some(bands) => bands,
            None => SensorBands::new(helper.sensor.unwrap_or(Sensor::Sentinel2A)).band_names(),
        };

        let [start, end] = helper.fapar_window.unwrap_or([PAR_WINDOW.0, PAR_WINDOW.1]);
        if !(start < end) {
            return Err(D::Error::custom(ConfigError::FaparWindow(start, end)));
        }

        Ok(Config {
            num_samples: helper.num_samples,
            lai_max: helper.lai_max,
            seed: helper.seed,
            parameters: helper.parameters,
            distribution_laws: helper.distribution_laws,
            geometry: ViewGeometry {
                tts,
                tto: geometry.tto,
                psi: geometry.psi,
            },
            options,
            spectral_library: helper.spectral_library,
            spectral_response: helper.spectral_response,
            data_directory: helper.data_directory,
            bands,
            fapar_window: (start, end),
            output_directory: helper.output_directory.unwrap_or_else(|| "output".to_string()),
            input_pattern: helper.input_pattern,
            write_spectra: helper.write_spectra,
        })
    }
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let config: Config = serde_json::from_reader(reader).map_err(ConfigError::from)?;

        Ok(config)
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    pub fn lai_max(&self) -> f64 {
        self.lai_max
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn parameters(&self) -> &IndexMap<String, ParameterRange> {
        &self.parameters
    }

    pub fn distribution_laws(&self) -> &IndexMap<String, String> {
        &self.distribution_laws
    }

    pub fn geometry(&self) -> &ViewGeometry {
        &self.geometry
    }

    pub fn model_options(&self) -> &ModelOptions {
        &self.options
    }

    pub fn bands(&self) -> &[String] {
        &self.bands
    }

    pub fn fapar_window(&self) -> (f64, f64) {
        self.fapar_window
    }

    pub fn output_directory(&self) -> &str {
        &self.output_directory
    }

    pub fn input_pattern(&self) -> Option<&str> {
        self.input_pattern.as_deref()
    }

    pub fn write_spectra(&self) -> bool {
        self.write_spectra
    }

    pub fn spectral_library_path(&self) -> Result<PathBuf, ConfigError> {
        self.resolve(&self.spectral_library)
    }

    pub fn spectral_response_path(&self) -> Result<PathBuf, ConfigError> {
        self.resolve(&self.spectral_response)
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, ConfigError> {
        resolve_data_file(path, self.data_directory.as_deref())
            .ok_or_else(|| ConfigError::DataFile(path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    const MINIMAL: &str = r#"
    {
        "num_samples": 100,
        "lai_max": 7.0,
        "parameters": {
            "lai": {"min": 0, "max": 7, "mode": 2, "std": 3},
            "cab": {"min": 20, "max": 90, "mode": 45, "std": 30,
                    "Vmin(0)": 20, "Vmax(0)": 90, "Vmin(LAImax)": 45, "Vmax(LAImax)": 90}
        },
        "distribution_laws": {"lai": "gaussian", "cab": "uniform"},
        "geometry": {"tts": 30.0},
        "spectral_library": "library.csv",
        "spectral_response": "srf.csv"
    }
    "#;

    fn parse(json: &str) -> Result<Config, serde_json::Error> {
        serde_json::from_str(json)
    }

    fn with(key: &str, value: &str) -> String {
        let mut config: serde_json::Value = serde_json::from_str(MINIMAL).unwrap();
        config[key] = serde_json::from_str(value).unwrap();
        config.to_string()
    }

    #[test]
    fn test_from_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("config.json");
        let mut file = File::create(&file_path).unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = Config::from_file(file_path).unwrap();

        assert_eq!(config.num_samples(), 100);
        assert_eq!(config.seed(), None);
        assert_eq!(
            config.parameters().keys().collect::<Vec<_>>(),
            vec!["lai", "cab"]
        );
        assert_eq!(config.geometry().tts, 30.0);
        assert_eq!(config.geometry().tto, 0.0);
        assert_eq!(*config.model_options(), ModelOptions::default());
        assert_eq!(config.bands().len(), 10);
        assert_eq!(config.bands()[7], "B8A");
        assert_eq!(config.fapar_window(), (400.0, 700.0));
        assert_eq!(config.output_directory(), "output");
        assert!(!config.write_spectra());
    }

    #[test]
    fn test_model_options() {
        let json = with("canopy", r#"{"typelidf": 1, "lidfb": -0.15}"#);
        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["leaf_model"] = serde_json::Value::String("d".to_string());
        let config = parse(&value.to_string()).unwrap();

        let options = config.model_options();
        assert_eq!(options.version, ProspectVersion::D);
        assert_eq!(options.typelidf, 1);
        assert_eq!(options.lidfb, -0.15);
        assert_eq!(options.alpha, 40.0);
    }

    #[test]
    fn test_invalid_lidf_type() {
        let err = parse(&with("canopy", r#"{"typelidf": 3}"#)).unwrap_err();
        assert!(err.to_string().contains("typelidf"), "{err}");
    }

    #[test]
    fn test_invalid_leaf_model() {
        let err = parse(&with("leaf_model", r#""PROSPECT-7""#)).unwrap_err();
        assert!(err.to_string().contains("Unknown PROSPECT version"), "{err}");
    }

    #[test]
    fn test_invalid_distribution_names_parameter() {
        let err = parse(&with(
            "distribution_laws",
            r#"{"lai": "gaussian", "cab": "beta"}"#,
        ))
        .unwrap_err();
        assert!(
            err.to_string()
                .contains("Invalid distribution for parameter: cab"),
            "{err}"
        );

        let err = parse(&with("distribution_laws", r#"{"lai": "gaussian"}"#)).unwrap_err();
        assert!(err.to_string().contains("cab"), "{err}");
    }

    #[test]
    fn test_geometry_from_datetime() {
        let config = parse(&with(
            "geometry",
            r#"{"datetime": "2023-06-21T12:00:00", "longitude": 0.0, "latitude": 45.0, "tto": 5.0}"#,
        ))
        .unwrap();
        assert!((config.geometry().tts - 21.56).abs() < 0.5);
        assert_eq!(config.geometry().tto, 5.0);
    }

    #[test]
    fn test_invalid_geometry() {
        // Sun below the horizon
        let err = parse(&with(
            "geometry",
            r#"{"datetime": "2024-08-23 14:00:00", "longitude": 105.0, "latitude": 40.0}"#,
        ))
        .unwrap_err();
        assert!(err.to_string().contains("solar zenith angle"), "{err}");

        let err = parse(&with("geometry", r#"{"longitude": 0.0}"#)).unwrap_err();
        assert!(err.to_string().contains("Invalid geometry"), "{err}");

        assert!(parse(&with("geometry", r#"{"tts": 90.0}"#)).is_err());
    }

    #[test]
    fn test_non_positive_counts() {
        assert!(parse(&with("num_samples", "0")).is_err());
        assert!(parse(&with("lai_max", "0.0")).is_err());
        assert!(parse(&with("fapar_window", "[700, 400]")).is_err());
    }

    #[test]
    fn test_explicit_bands() {
        let config = parse(&with("bands", r#"["B4", "B8"]"#)).unwrap();
        assert_eq!(config.bands(), &["B4".to_string(), "B8".to_string()]);
    }

    #[test]
    fn test_data_file_lookup() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("spectra").join("s2");
        std::fs::create_dir_all(&nested).unwrap();
        File::create(nested.join("srf.csv")).unwrap();

        let json = with(
            "data_directory",
            &format!("{:?}", dir.path().to_string_lossy()),
        );
        let config = parse(&json).unwrap();

        assert_eq!(
            config.spectral_response_path().unwrap(),
            nested.join("srf.csv")
        );
        assert!(matches!(
            config.spectral_library_path(),
            Err(ConfigError::DataFile(_))
        ));
    }
}
