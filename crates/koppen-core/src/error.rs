//! Error types for the koppen-core crate.

use std::path::PathBuf;

/// Error type for all fallible operations in koppen-core.
///
/// Missing per-cell data is not an error: those cells classify as code 0.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    /// Resolution string outside the supported set.
    #[error("invalid resolution {value:?}, valid resolutions are: {valid}")]
    InvalidResolution {
        /// The rejected value.
        value: String,
        /// Comma-separated list of accepted values.
        valid: String,
    },

    /// Chunk count of zero.
    #[error("chunk count must be >= 1, got 0")]
    InvalidChunkCount,

    /// Worker count of zero.
    #[error("worker count must be >= 1, got 0")]
    InvalidWorkerCount,

    /// A variable key required by the input mode is absent from the bundle.
    #[error("required variable {key} is missing from the bundle")]
    MissingVariable {
        /// The missing key, e.g. `tavg_07`.
        key: String,
    },

    /// A grid differs in shape or transform from the rest of the bundle.
    #[error("variable {key} is misaligned: expected {expected}, found {found}")]
    MisalignedInput {
        /// Offending variable key.
        key: String,
        /// Shape/transform of the reference grid.
        expected: String,
        /// Shape/transform of the offending grid.
        found: String,
    },

    /// Classified table does not form a complete rectangle.
    #[error("cannot assemble raster: {reason}")]
    MalformedPivot {
        /// What went wrong.
        reason: String,
    },

    /// Raster file lacks something the reader needs.
    #[error("invalid raster {}: {reason}", path.display())]
    InvalidRaster {
        /// File being read.
        path: PathBuf,
        /// What is wrong with it.
        reason: String,
    },

    /// Source data has not been fetched yet.
    #[error("missing source data at {} (download and extract {url})", path.display())]
    MissingData {
        /// Expected location on disk.
        path: PathBuf,
        /// Archive holding the data.
        url: String,
    },

    /// The bounded worker pool could not be built.
    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Tiff(#[from] tiff::TiffError),

    #[error("invalid configuration file: {0}")]
    Config(#[from] toml::de::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClassifyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_invalid_resolution_names_valid_set() {
        let e = ClassifyError::InvalidResolution {
            value: "1m".into(),
            valid: "30s, 2.5m, 5m, 10m".into(),
        };
        assert_eq!(
            e.to_string(),
            "invalid resolution \"1m\", valid resolutions are: 30s, 2.5m, 5m, 10m"
        );
    }

    #[test]
    fn error_invalid_counts() {
        assert_eq!(
            ClassifyError::InvalidChunkCount.to_string(),
            "chunk count must be >= 1, got 0"
        );
        assert_eq!(
            ClassifyError::InvalidWorkerCount.to_string(),
            "worker count must be >= 1, got 0"
        );
    }

    #[test]
    fn error_missing_variable() {
        let e = ClassifyError::MissingVariable { key: "prec_03".into() };
        assert_eq!(e.to_string(), "required variable prec_03 is missing from the bundle");
    }

    #[test]
    fn error_misaligned_input() {
        let e = ClassifyError::MisalignedInput {
            key: "bio_4".into(),
            expected: "4x2".into(),
            found: "4x3".into(),
        };
        assert_eq!(e.to_string(), "variable bio_4 is misaligned: expected 4x2, found 4x3");
    }

    #[test]
    fn error_malformed_pivot() {
        let e = ClassifyError::MalformedPivot { reason: "duplicate cell".into() };
        assert_eq!(e.to_string(), "cannot assemble raster: duplicate cell");
    }

    #[test]
    fn error_missing_data_mentions_url() {
        let e = ClassifyError::MissingData {
            path: PathBuf::from("data/bio_5m"),
            url: "https://example.org/bio.zip".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("data/bio_5m"), "{msg}");
        assert!(msg.contains("https://example.org/bio.zip"), "{msg}");
    }

    #[test]
    fn error_is_std_error() {
        fn assert_impl<T: std::error::Error>() {}
        assert_impl::<ClassifyError>();
    }
}
