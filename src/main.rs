use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use nret::config::Config;
use nret::sampling::{generate_input_samples, rng_from_seed};
use nret::simulation::BatchRunner;
use nret::utils::print_summary;

const SAMPLES_FILE: &str = "samples.csv";

#[derive(Parser)]
#[command(version, about = "PROSAIL training sets with LAI-linked inputs and fAPAR")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct ConfigArg {
    /// JSON run configuration
    #[arg(short, long, default_value = "./data/config/config.json")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Draw the input samples and write them to samples.csv
    Generate(ConfigArg),
    /// Simulate band reflectance and fAPAR for input tables
    Simulate {
        #[command(flatten)]
        config: ConfigArg,
        /// Input table; defaults to the configured input_pattern
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Generate then simulate
    Run(ConfigArg),
}

fn generate(config: &Config) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut rng = rng_from_seed(config.seed());
    let samples = generate_input_samples(
        config.parameters(),
        config.distribution_laws(),
        config.num_samples(),
        config.lai_max(),
        &mut rng,
    )?;

    fs::create_dir_all(config.output_directory())?;
    let path = Path::new(config.output_directory()).join(SAMPLES_FILE);
    samples.to_csv(&path)?;
    println!("Wrote {} input samples to {}", samples.len(), path.display());

    Ok(path)
}

fn simulate(config: &Config, input: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let runner = BatchRunner::from_config(config)?;

    let outputs = match input {
        Some(path) => vec![runner.process_file(path)?],
        None => {
            let pattern = config
                .input_pattern()
                .ok_or("No --input given and no input_pattern configured")?;
            runner.process(pattern)?
        }
    };

    for output in &outputs {
        println!("{} -> {}", output.input.display(), output.output.display());
    }

    let fapar: Vec<f64> = outputs.iter().flat_map(|o| o.fapar.iter().copied()).collect();
    print_summary("fAPAR", &fapar);

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Generate(args) => {
            let config = Config::from_file(&args.config)?;
            generate(&config)?;
        }
        Command::Simulate { config, input } => {
            let config = Config::from_file(&config.config)?;
            simulate(&config, input.as_deref())?;
        }
        Command::Run(args) => {
            let config = Config::from_file(&args.config)?;
            let samples = generate(&config)?;
            simulate(&config, Some(&samples))?;
        }
    }

    Ok(())
}
