use crate::config::types::{Config, CrawlConfig, OutputConfig, ParallelConfig};
use crate::url::CrawlTarget;
use crate::ConfigError;

/// Upper bound on parallel workers
pub const MAX_WORKERS: usize = 64;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_output_config(&config.output)?;
    validate_crawl_config(&config.crawl)?;
    validate_parallel_config(&config.parallel)?;
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.destination.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "destination cannot be empty".to_string(),
        ));
    }

    if config.named_destination().is_none() {
        return Err(ConfigError::Validation(format!(
            "destination must name a directory, got '{}'",
            config.destination.display()
        )));
    }

    let index = config.index_name.as_str();
    if index.is_empty() || index == "." || index == ".." {
        return Err(ConfigError::Validation(format!(
            "index-name must be a plain file name, got '{}'",
            index
        )));
    }

    if index.contains('/') || index.contains('\\') {
        return Err(ConfigError::Validation(format!(
            "index-name cannot contain path separators, got '{}'",
            index
        )));
    }

    Ok(())
}

/// Validates crawl configuration
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    for pattern in &config.allowed_hosts {
        validate_host_pattern(pattern)?;
    }

    for seed in &config.seeds {
        CrawlTarget::parse(seed).map_err(|e| {
            ConfigError::Validation(format!("Invalid seed '{}': {}", seed, e))
        })?;
    }

    Ok(())
}

/// Validates parallel configuration
fn validate_parallel_config(config: &ParallelConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and {}, got {}",
            MAX_WORKERS, config.workers
        )));
    }

    if config.poll_interval_ms < 1 {
        return Err(ConfigError::Validation(
            "poll-interval-ms must be >= 1".to_string(),
        ));
    }

    if config.lock_timeout_ms < 1 {
        return Err(ConfigError::Validation(
            "lock-timeout-ms must be >= 1".to_string(),
        ));
    }

    if config.join_timeout_secs == Some(0) {
        return Err(ConfigError::Validation(
            "join-timeout-secs must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates a host allow-list pattern (`*` wildcards allowed anywhere)
fn validate_host_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Host pattern cannot be empty".to_string(),
        ));
    }

    if !pattern
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == '*' || c == '_')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Host pattern '{}' contains invalid characters",
            pattern
        )));
    }

    if pattern.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Host pattern '{}' cannot contain consecutive dots",
            pattern
        )));
    }

    Ok(())
}
