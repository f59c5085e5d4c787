use serde::{Deserialize, Serialize};

use crate::converter::ConverterConfig;
use crate::processor::ProcessorConfig;

/// Engine configuration. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Strategy settings: rendering, slides and the video tool.
    #[serde(default)]
    pub converter: ConverterConfig,

    /// Batch settings: concurrency and archive naming.
    #[serde(default)]
    pub processor: ProcessorConfig,
}
