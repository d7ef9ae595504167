use flate2::Compression;
use schem_logger::LogSeverity;
use serde::Deserialize;

fn default_compression_level() -> u32 {
    6
}

/// Codec settings, usually loaded from a JSON file next to the application.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SchemConfig {
    /// Gzip level for written schematics, 0 (store) to 9 (best).
    pub compression_level: u32,
    pub log_level: LogSeverity,
}

impl Default for SchemConfig {
    fn default() -> Self {
        Self {
            compression_level: default_compression_level(),
            log_level: LogSeverity::default(),
        }
    }
}

impl SchemConfig {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Compression for the writer, with out-of-range levels clamped to 9.
    pub fn compression(&self) -> Compression {
        Compression::new(self.compression_level.min(9))
    }

    /// Installs `log_level` as the process-wide threshold. Returns false if one was
    /// already installed.
    pub fn apply_logging(&self) -> bool {
        schem_logger::init(self.log_level)
    }
}
