use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Batch concurrency is at least 1
/// - Archive name is a `.zip` file name
/// - Raster scale, JPEG quality and slide size are in range
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let processor = &config.processor;
    if processor.concurrency == 0 {
        return Err(ConfigError::ValidationError(
            "processor.concurrency must be at least 1".to_string(),
        ));
    }
    if processor.archive_name.len() <= ".zip".len()
        || !processor.archive_name.to_ascii_lowercase().ends_with(".zip")
    {
        return Err(ConfigError::ValidationError(format!(
            "processor.archive_name must end in .zip, got {:?}",
            processor.archive_name
        )));
    }

    let converter = &config.converter;
    if !(0.1..=4.0).contains(&converter.raster_scale) {
        return Err(ConfigError::ValidationError(format!(
            "converter.raster_scale must be between 0.1 and 4.0, got {}",
            converter.raster_scale
        )));
    }
    if !(1..=100).contains(&converter.jpeg_quality) {
        return Err(ConfigError::ValidationError(format!(
            "converter.jpeg_quality must be between 1 and 100, got {}",
            converter.jpeg_quality
        )));
    }
    if converter.slide_char_limit == 0 {
        return Err(ConfigError::ValidationError(
            "converter.slide_char_limit cannot be 0".to_string(),
        ));
    }

    Ok(())
}
