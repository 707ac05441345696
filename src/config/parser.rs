use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::io::BufRead;
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use site_freezer::config::load_config;
///
/// let config = load_config(Path::new("freeze.toml")).unwrap();
/// println!("Writing to: {}", config.output.destination.display());
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Recorded with each ledger run so runs can be matched to the configuration
/// that produced them.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(hash_content(&content))
}

/// Hex-encoded SHA-256 of a configuration string
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok((config, hash_content(&content)))
}

/// Reads a seed list: one URL or path per line
///
/// Blank lines and lines starting with `#` are skipped; surrounding
/// whitespace is trimmed.
pub fn read_seeds(reader: impl BufRead) -> Result<Vec<String>, ConfigError> {
    let mut seeds = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let seed = line.trim();
        if seed.is_empty() || seed.starts_with('#') {
            continue;
        }
        seeds.push(seed.to_string());
    }
    Ok(seeds)
}

/// All seeds for a configuration: the inline list followed by the seed file
pub fn load_seeds(config: &Config) -> Result<Vec<String>, ConfigError> {
    let mut seeds = config.crawl.seeds.clone();

    if let Some(path) = &config.crawl.seed_file {
        let file = std::fs::File::open(path)?;
        let from_file = read_seeds(std::io::BufReader::new(file))?;
        tracing::debug!("Read {} seeds from {}", from_file.len(), path.display());
        seeds.extend(from_file);
    }

    Ok(seeds)
}
