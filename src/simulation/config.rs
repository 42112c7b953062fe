use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineArgs {
    #[arg(long, short)]
    pub config: String,
}

impl CommandLineArgs {
    pub fn new_with_path(path: impl ToString) -> Self {
        CommandLineArgs {
            config: path.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_path_to_error::Error<serde_yaml::Error>),
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub simulation: Simulation,
    pub parking: Parking,
    pub output: Output,
    pub network: NetworkFile,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Config, ConfigError> {
        let content = fs::read_to_string(path)?;
        let deserializer = serde_yaml::Deserializer::from_str(&content);
        let config = serde_path_to_error::deserialize(deserializer)?;
        Ok(config)
    }
}

impl From<CommandLineArgs> for Config {
    fn from(args: CommandLineArgs) -> Self {
        Config::from_file(Path::new(&args.config))
            .unwrap_or_else(|e| panic!("Failed to load config from {}: {e}", args.config))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Simulation {
    pub start_time: u32,
    pub end_time: u32,
    pub sample_size: f32,
}

impl Default for Simulation {
    fn default() -> Self {
        Simulation {
            start_time: 0,
            end_time: 86400,
            sample_size: 1.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Parking {
    /// Footprint length one parked vehicle occupies along the link.
    pub vehicle_length: f32,
    pub seed: u64,
    pub weights: SamplingWeights,
    /// Number of searching vehicles spawned by the demo binary.
    pub fleet_size: u32,
}

impl Default for Parking {
    fn default() -> Self {
        Parking {
            vehicle_length: 8.0,
            seed: 4711,
            weights: SamplingWeights::default(),
            fleet_size: 0,
        }
    }
}

/// Un-normalized sampling weights for the next-link draw during parking search.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct SamplingWeights {
    /// Candidate link with free parking supply.
    pub available: u32,
    /// No supply, but not on the vehicle's recent history.
    pub unvisited: u32,
    /// No supply and recently visited. Small but never zero, so that dead ends
    /// cannot trap a vehicle.
    pub visited: u32,
}

impl Default for SamplingWeights {
    fn default() -> Self {
        SamplingWeights {
            available: 99,
            unvisited: 33,
            visited: 1,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Output {
    pub output_dir: PathBuf,
    pub logging: Logging,
}

impl Default for Output {
    fn default() -> Self {
        Output {
            output_dir: PathBuf::from("./output"),
            logging: Logging::Info,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logging {
    Info,
    None,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct NetworkFile {
    pub path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_weights() {
        let config = Config::default();
        assert_eq!(99, config.parking.weights.available);
        assert_eq!(33, config.parking.weights.unvisited);
        assert_eq!(1, config.parking.weights.visited);
        assert_eq!(8.0, config.parking.vehicle_length);
    }

    #[test]
    fn load_partial_yaml() {
        let yaml = r#"
simulation:
  start_time: 10
  end_time: 100
parking:
  seed: 99
"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(10, config.simulation.start_time);
        assert_eq!(100, config.simulation.end_time);
        assert_eq!(1.0, config.simulation.sample_size);
        assert_eq!(99, config.parking.seed);
        // untouched sections fall back to defaults
        assert_eq!(SamplingWeights::default(), config.parking.weights);
        assert_eq!(Logging::Info, config.output.logging);
    }

    #[test]
    fn parse_error_reports_path() {
        let yaml = "simulation:\n  start_time: not-a-number\n";
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        let message = format!("{err}");
        assert!(message.contains("start_time"), "was: {message}");
    }
}
