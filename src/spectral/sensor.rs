use std::fmt::Display;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Sensor {
    #[serde(rename(deserialize = "sentinel2a"))]
    Sentinel2A,
    #[serde(rename(deserialize = "sentinel2b"))]
    Sentinel2B,
}

#[derive(Debug)]
pub struct SensorBands {
    sensor: Sensor,
    bands: &'static [&'static str],
}

impl SensorBands {
    pub fn new(sensor: Sensor) -> Self {
        let bands: &'static [&'static str] = match sensor {
            // Land bands used for vegetation retrievals: 2-8, 8A, 11 and 12
            Sensor::Sentinel2A | Sensor::Sentinel2B => &[
                "B2", "B3", "B4", "B5", "B6", "B7", "B8", "B8A", "B11", "B12",
            ],
        };
        Self { sensor, bands }
    }

    pub fn bands(&self) -> &[&'static str] {
        self.bands
    }

    pub fn band_names(&self) -> Vec<String> {
        self.bands.iter().map(|b| b.to_string()).collect()
    }
}

impl Display for Sensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sensor::Sentinel2A => write!(f, "Sentinel-2A MSI"),
            Sensor::Sentinel2B => write!(f, "Sentinel-2B MSI"),
        }
    }
}

impl Display for SensorBands {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sensor: {}, Bands: {:?}", self.sensor, self.bands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel2_land_bands() {
        let bands = SensorBands::new(Sensor::Sentinel2A);
        assert_eq!(bands.bands().len(), 10);
        assert_eq!(bands.bands()[7], "B8A");
        assert!(!bands.bands().contains(&"B1"));
        assert!(!bands.bands().contains(&"B10"));
    }

    #[test]
    fn test_sensor_from_json() {
        let sensor: Sensor = serde_json::from_str("\"sentinel2a\"").unwrap();
        assert_eq!(sensor, Sensor::Sentinel2A);
        assert!(serde_json::from_str::<Sensor>("\"landsat8\"").is_err());
    }
}
