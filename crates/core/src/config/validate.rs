use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Processor pool has at least one slot
/// - Bitrates are within what the mp3 encoders accept
/// - Separator device is one demucs understands
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.processor.max_parallel_jobs == 0 {
        return Err(ConfigError::ValidationError(
            "processor.max_parallel_jobs must be at least 1".to_string(),
        ));
    }

    for (field, kbps) in [
        ("separator.mp3_bitrate_kbps", config.separator.mp3_bitrate_kbps),
        ("transcoder.bitrate_kbps", config.transcoder.bitrate_kbps),
    ] {
        if !(32..=320).contains(&kbps) {
            return Err(ConfigError::ValidationError(format!(
                "{} must be between 32 and 320, got {}",
                field, kbps
            )));
        }
    }

    if !is_valid_device(&config.separator.device) {
        return Err(ConfigError::ValidationError(format!(
            "separator.device must be cpu, cuda, cuda:N or mps, got {:?}",
            config.separator.device
        )));
    }

    Ok(())
}

fn is_valid_device(device: &str) -> bool {
    match device {
        "cpu" | "cuda" | "mps" => true,
        other => other
            .strip_prefix("cuda:")
            .is_some_and(|idx| !idx.is_empty() && idx.chars().all(|c| c.is_ascii_digit())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = Config::default();
        config.server.port = 0;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_zero_parallel_jobs_fails() {
        let mut config = Config::default();
        config.processor.max_parallel_jobs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_bitrate_out_of_range() {
        let mut config = Config::default();
        config.transcoder.bitrate_kbps = 640;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("transcoder.bitrate_kbps"));
    }

    #[test]
    fn test_validate_devices() {
        assert!(is_valid_device("cpu"));
        assert!(is_valid_device("cuda"));
        assert!(is_valid_device("cuda:1"));
        assert!(is_valid_device("mps"));
        assert!(!is_valid_device("cuda:"));
        assert!(!is_valid_device("gpu"));
    }
}
