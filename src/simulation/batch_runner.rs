use std::fs;
use std::path::{Path, PathBuf};

use glob::glob;

use super::{SimulationError, Simulator};
use crate::config::Config;
use crate::sampling::SampleTable;

/// Output of one simulated input table.
#[derive(Debug, Clone)]
pub struct BatchOutput {
    pub input: PathBuf,
    pub output: PathBuf,
    pub spectra: Option<PathBuf>,
    pub fapar: Vec<f64>,
}

pub struct BatchRunner {
    simulator: Simulator,
    output_directory: PathBuf,
    write_spectra: bool,
}

impl BatchRunner {
    pub fn new<P: AsRef<Path>>(
        simulator: Simulator,
        output_directory: P,
        write_spectra: bool,
    ) -> Self {
        Self {
            simulator,
            output_directory: output_directory.as_ref().to_path_buf(),
            write_spectra,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, SimulationError> {
        let simulator = Simulator::from_config(config)?;
        Ok(Self::new(
            simulator,
            config.output_directory(),
            config.write_spectra(),
        ))
    }

    pub fn simulator(&self) -> &Simulator {
        &self.simulator
    }

    /// Input files matching `pattern`, sorted by path.
    fn find_inputs(pattern: &str) -> Result<Vec<PathBuf>, SimulationError> {
        let mut inputs = Vec::new();
        for entry in glob(pattern)? {
            let path = entry?;
            if path.is_file() {
                inputs.push(path);
            }
        }
        inputs.sort();

        if inputs.is_empty() {
            return Err(SimulationError::NoInputs(pattern.to_string()));
        }
        Ok(inputs)
    }

    /// Simulates every table matching `pattern`.
    pub fn process(&self, pattern: &str) -> Result<Vec<BatchOutput>, SimulationError> {
        let inputs = Self::find_inputs(pattern)?;
        log::info!("Found {} input tables matching {}", inputs.len(), pattern);

        let mut outputs = Vec::with_capacity(inputs.len());
        for (index, input) in inputs.iter().enumerate() {
            log::info!("[{}/{}] {}", index + 1, inputs.len(), input.display());
            outputs.push(self.process_file(input)?);
        }

        Ok(outputs)
    }

    /// Simulates one table and writes `<stem>_simulated.csv`, plus
    /// `<stem>_spectra.csv` when spectra are requested.
    pub fn process_file<P: AsRef<Path>>(&self, input: P) -> Result<BatchOutput, SimulationError> {
        let input = input.as_ref();
        let table = SampleTable::from_csv(input)?;
        let result = self.simulator.simulate(&table)?;

        fs::create_dir_all(&self.output_directory)?;
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "samples".to_string());

        let output = self.output_directory.join(format!("{}_simulated.csv", stem));
        result.write_csv(&output)?;
        log::info!("Wrote {}", output.display());

        let spectra = if self.write_spectra {
            let path = self.output_directory.join(format!("{}_spectra.csv", stem));
            result.write_spectra_csv(&path)?;
            log::info!("Wrote {}", path.display());
            Some(path)
        } else {
            None
        };

        Ok(BatchOutput {
            input: input.to_path_buf(),
            output,
            spectra,
            fapar: result.fapar(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::fixtures::{simulator, table};
    use tempfile::tempdir;

    #[test]
    fn test_process_pattern() {
        let dir = tempdir().unwrap();
        let inputs = dir.path().join("inputs");
        fs::create_dir_all(&inputs).unwrap();
        table(&[1.0, 3.0]).to_csv(inputs.join("field_a.csv")).unwrap();
        table(&[5.0]).to_csv(inputs.join("field_b.csv")).unwrap();
        fs::write(inputs.join("notes.txt"), "not a table").unwrap();

        let out_dir = dir.path().join("out");
        let runner = BatchRunner::new(simulator(), &out_dir, true);
        let pattern = format!("{}/*.csv", inputs.display());
        let outputs = runner.process(&pattern).unwrap();

        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].output, out_dir.join("field_a_simulated.csv"));
        assert_eq!(outputs[1].spectra, Some(out_dir.join("field_b_spectra.csv")));
        assert_eq!(outputs[0].fapar.len(), 2);

        let written = SampleTable::from_csv(&outputs[1].output).unwrap();
        assert_eq!(written.column("fAPAR").unwrap(), outputs[1].fapar.as_slice());
    }

    #[test]
    fn test_no_inputs() {
        let dir = tempdir().unwrap();
        let runner = BatchRunner::new(simulator(), dir.path(), false);
        let pattern = format!("{}/*.csv", dir.path().display());
        assert!(matches!(
            runner.process(&pattern),
            Err(SimulationError::NoInputs(_))
        ));
        assert!(matches!(
            runner.process("[invalid"),
            Err(SimulationError::Pattern(_))
        ));
    }
}
