//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - Console output with configurable log levels
//! - JSON-formatted local file logging with rotation
//!
//! # Example
//!
//! ```no_run
//! use shroud::logging::init_logging;
//! use shroud::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the completion of a detection pass
///
/// # Example
///
/// ```no_run
/// use shroud::log_detection_complete;
/// use std::time::Duration;
///
/// log_detection_complete!("EnsembleDetector", 3, Duration::from_millis(12));
/// ```
#[macro_export]
macro_rules! log_detection_complete {
    ($detector:expr, $count:expr, $duration:expr) => {
        tracing::info!(
            detector = $detector,
            detections = $count,
            duration_ms = $duration.as_millis() as u64,
            "Detection completed"
        );
    };
}

/// Log a detector that failed and was degraded to zero detections
///
/// # Example
///
/// ```no_run
/// use shroud::log_detector_failure;
/// use shroud::domain::DetectorFailure;
///
/// let failure = DetectorFailure::Analyzer("model unavailable".to_string());
/// log_detector_failure!("StatisticalDetector", failure);
/// ```
#[macro_export]
macro_rules! log_detector_failure {
    ($detector:expr, $error:expr) => {
        tracing::warn!(
            detector = $detector,
            error = %$error,
            "Detector failed, contributing no detections"
        );
    };
}

/// Log the completion of an anonymization request
///
/// # Example
///
/// ```no_run
/// use shroud::log_anonymization_complete;
///
/// log_anonymization_complete!("redact", 2, 15u64);
/// ```
#[macro_export]
macro_rules! log_anonymization_complete {
    ($mode:expr, $count:expr, $duration_ms:expr) => {
        tracing::info!(
            mode = %$mode,
            detections = $count,
            duration_ms = $duration_ms,
            "Anonymization completed"
        );
    };
}

#[cfg(test)]
mod tests {
    use crate::domain::DetectorFailure;
    use std::time::Duration;

    #[test]
    fn test_macros_compile() {
        let failure = DetectorFailure::Unavailable("offline".to_string());
        log_detection_complete!("PatternMatcher", 1usize, Duration::from_millis(3));
        log_detector_failure!("NeuralDetector", failure);
        log_anonymization_complete!("redact", 0usize, 1u64);
    }
}
