//! Writer configuration, with environment-variable overrides

use crate::zip::compression::DEFAULT_LEVEL;

/// Environment variable holding a DEFLATE level (0-9)
pub const COMPRESSION_LEVEL_ENV: &str = "ZIPSHEET_COMPRESSION_LEVEL";

/// Environment variable holding the minimum sheet count for parallel generation
pub const PARALLEL_THRESHOLD_ENV: &str = "ZIPSHEET_PARALLEL_THRESHOLD";

pub const DEFAULT_PARALLEL_THRESHOLD: usize = 2;

/// DEFLATE effort for compressed output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionProfile {
    /// Level 1: quickest, largest output
    Fast,
    /// Level 6 (default)
    #[default]
    Balanced,
    /// Level 9: smallest output
    Best,
    /// Explicit level, clamped to 0..=9
    Custom { level: u32 },
}

impl CompressionProfile {
    pub fn from_level(level: u32) -> Self {
        match level {
            1 => CompressionProfile::Fast,
            6 => CompressionProfile::Balanced,
            9 => CompressionProfile::Best,
            other => CompressionProfile::Custom {
                level: other.min(9),
            },
        }
    }

    /// Read from `ZIPSHEET_COMPRESSION_LEVEL`, falling back to `Balanced`
    pub fn from_env() -> Self {
        std::env::var(COMPRESSION_LEVEL_ENV)
            .ok()
            .and_then(|s| s.trim().parse::<u32>().ok())
            .map(Self::from_level)
            .unwrap_or_default()
    }

    pub fn level(&self) -> u32 {
        match self {
            CompressionProfile::Fast => 1,
            CompressionProfile::Balanced => DEFAULT_LEVEL,
            CompressionProfile::Best => 9,
            CompressionProfile::Custom { level } => (*level).min(9),
        }
    }
}

/// Options for [`XlsxWriter`](crate::xlsx::XlsxWriter)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterOptions {
    pub compression: CompressionProfile,
    /// Minimum worksheet count before generation goes through the
    /// parallel task engine
    pub parallel_threshold: usize,
}

impl Default for WriterOptions {
    fn default() -> Self {
        WriterOptions {
            compression: CompressionProfile::default(),
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

impl WriterOptions {
    /// Defaults overridden by `ZIPSHEET_COMPRESSION_LEVEL` and
    /// `ZIPSHEET_PARALLEL_THRESHOLD` where set
    pub fn from_env() -> Self {
        let parallel_threshold = std::env::var(PARALLEL_THRESHOLD_ENV)
            .ok()
            .and_then(|s| s.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_PARALLEL_THRESHOLD);

        WriterOptions {
            compression: CompressionProfile::from_env(),
            parallel_threshold,
        }
    }

    pub fn with_compression(mut self, compression: CompressionProfile) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Whether `sheet_count` sheets should use the parallel task engine
    pub fn use_parallel(&self, sheet_count: usize) -> bool {
        self.parallel_threshold > 0 && sheet_count >= self.parallel_threshold
    }
}
