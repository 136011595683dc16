//! Sensor spectral response functions and band aggregation
//!
//! A response file holds one wavelength column followed by one column per
//! band, e.g. the ESA Sentinel-2A SRF sheet (`SR_WL, S2A_SR_AV_B1, ...`).
//! Band labels are the header suffix after the last underscore.

use std::path::Path;

use super::SpectralError;

#[derive(Debug, Clone)]
pub struct SpectralResponse {
    wavelengths: Vec<f64>,
    bands: Vec<String>,
    // [band][wavelength]
    responses: Vec<Vec<f64>>,
}

fn band_label(header: &str) -> String {
    let header = header.trim();
    header
        .rsplit_once('_')
        .map(|(_, label)| label)
        .unwrap_or(header)
        .to_uppercase()
}

impl SpectralResponse {
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self, SpectralError> {
        let reader = csv::Reader::from_path(path)?;
        Self::from_reader(reader)
    }

    pub fn from_reader<R: std::io::Read>(
        mut reader: csv::Reader<R>,
    ) -> Result<Self, SpectralError> {
        let headers = reader.headers()?.clone();
        if headers.len() < 2 {
            return Err(SpectralError::MissingColumn("band".to_string()));
        }

        let bands: Vec<String> = headers.iter().skip(1).map(band_label).collect();
        let mut wavelengths = Vec::new();
        let mut responses = vec![Vec::new(); bands.len()];

        for (row_no, record) in reader.records().enumerate() {
            let record = record?;
            for (col, raw) in record.iter().enumerate() {
                let raw = raw.trim();
                let value = raw.parse::<f64>().map_err(|_| SpectralError::Parse {
                    row: row_no,
                    column: headers.get(col).unwrap_or("").to_string(),
                    value: raw.to_string(),
                })?;
                match col {
                    0 => wavelengths.push(value),
                    c if c <= bands.len() => responses[c - 1].push(value),
                    _ => {}
                }
            }
        }

        if wavelengths.is_empty() {
            return Err(SpectralError::Empty);
        }
        if let Some(short) = responses.iter().find(|r| r.len() != wavelengths.len()) {
            return Err(SpectralError::LengthMismatch {
                expected: wavelengths.len(),
                found: short.len(),
            });
        }

        log::info!(
            "Loaded spectral response with {} bands over {} wavelengths",
            bands.len(),
            wavelengths.len()
        );

        Ok(Self {
            wavelengths,
            bands,
            responses,
        })
    }

    pub fn bands(&self) -> &[String] {
        &self.bands
    }

    pub fn band_response(&self, band: &str) -> Option<&[f64]> {
        let wanted = band_label(band);
        self.bands
            .iter()
            .position(|b| *b == wanted)
            .map(|idx| self.responses[idx].as_slice())
    }

    /// Builds the per-band weights on the simulated wavelength grid.
    pub fn aggregator(
        &self,
        wavelengths: &[f64],
        bands: &[String],
    ) -> Result<BandAggregator, SpectralError> {
        let mut weights = Vec::with_capacity(bands.len());

        for band in bands {
            let response = self
                .band_response(band)
                .ok_or_else(|| SpectralError::UnknownBand(band.clone()))?;

            // Responses are sampled on the sensor grid; pick the value at each
            // simulated wavelength, zero where the sheet does not cover it.
            let mut band_weights: Vec<f64> = wavelengths
                .iter()
                .map(|&wl| {
                    self.wavelengths
                        .iter()
                        .position(|&w| (w - wl).abs() < 1e-6)
                        .map(|idx| response[idx].max(0.0))
                        .unwrap_or(0.0)
                })
                .collect();

            let total: f64 = band_weights.iter().sum();
            if total <= 0.0 {
                return Err(SpectralError::EmptyBand(band.clone()));
            }
            band_weights.iter_mut().for_each(|w| *w /= total);
            weights.push(band_weights);
        }

        Ok(BandAggregator {
            bands: bands.iter().map(|b| band_label(b)).collect(),
            weights,
        })
    }
}

/// Normalised band weights aligned on a simulated spectrum.
#[derive(Debug, Clone)]
pub struct BandAggregator {
    bands: Vec<String>,
    weights: Vec<Vec<f64>>,
}

impl BandAggregator {
    pub fn bands(&self) -> &[String] {
        &self.bands
    }

    pub fn weights(&self, band: usize) -> &[f64] {
        &self.weights[band]
    }

    /// Band reflectance rounded to 5 decimals.
    pub fn aggregate(&self, spectrum: &[f64]) -> Result<Vec<f64>, SpectralError> {
        let expected = self.weights.first().map_or(spectrum.len(), |w| w.len());
        if spectrum.len() != expected {
            return Err(SpectralError::LengthMismatch {
                expected,
                found: spectrum.len(),
            });
        }

        Ok(self
            .weights
            .iter()
            .map(|w| {
                let value: f64 = w.iter().zip(spectrum).map(|(w, r)| w * r).sum();
                crate::utils::round_to(value, 5)
            })
            .collect())
    }
}
