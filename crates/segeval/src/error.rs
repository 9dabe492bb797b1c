// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use crate::region::Role;

/// Error type for segmentation evaluation.
///
/// Only configuration problems and I/O failures are represented here. Invalid
/// polygons and empty region sets are recovered during evaluation and
/// reported as [`crate::Warning`] values attached to the score instead.
#[derive(Debug)]
pub enum Error {
    /// An I/O error occurred during file operations.
    IoError(std::io::Error),
    /// Configuration parsing or loading error.
    ConfigError(config::ConfigError),
    /// JSON serialization or deserialization error.
    JsonError(serde_json::Error),
    /// Report writing error.
    CsvError(csv::Error),
    /// XML parsing error.
    XmlError(roxmltree::Error),
    /// Significance threshold outside of `(0, 1]`.
    InvalidThreshold(f64),
    /// A threshold sweep was requested with no thresholds.
    EmptyThresholds,
    /// The region sets passed as reference and test do not have the
    /// expected roles.
    MismatchedPairing {
        /// Role of the set passed as reference.
        reference: Role,
        /// Role of the set passed as test.
        test: Role,
    },
    /// Document scores computed at different thresholds cannot be summed.
    MixedThresholds(f64, f64),
    /// Unsupported region file format.
    UnsupportedFormat(String),
    /// Region shape that is not a polygon.
    UnsupportedShape(String),
    /// Region label that does not follow the file's labeling scheme.
    InvalidLabel(String),
    /// Invalid parameters provided to an operation.
    InvalidParameters(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::ConfigError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::JsonError(err)
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::CsvError(err)
    }
}

impl From<roxmltree::Error> for Error {
    fn from(err: roxmltree::Error) -> Self {
        Error::XmlError(err)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "I/O error: {}", e),
            Error::ConfigError(e) => write!(f, "Configuration error: {}", e),
            Error::JsonError(e) => write!(f, "JSON error: {}", e),
            Error::CsvError(e) => write!(f, "Report error: {}", e),
            Error::XmlError(e) => write!(f, "XML error: {}", e),
            Error::InvalidThreshold(t) => {
                write!(f, "Invalid threshold {}: must be in (0, 1]", t)
            }
            Error::EmptyThresholds => write!(f, "Threshold sweep requires at least one threshold"),
            Error::MismatchedPairing { reference, test } => write!(
                f,
                "Mismatched pairing: expected reference and test sets, got {} and {}",
                reference, test
            ),
            Error::MixedThresholds(a, b) => {
                write!(f, "Cannot aggregate scores at thresholds {} and {}", a, b)
            }
            Error::UnsupportedFormat(s) => write!(f, "Unsupported format: {}", s),
            Error::UnsupportedShape(s) => write!(f, "Unsupported shape: {}", s),
            Error::InvalidLabel(s) => write!(f, "Invalid label: {}", s),
            Error::InvalidParameters(s) => write!(f, "Invalid parameters: {}", s),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            Error::ConfigError(e) => Some(e),
            Error::JsonError(e) => Some(e),
            Error::CsvError(e) => Some(e),
            Error::XmlError(e) => Some(e),
            _ => None,
        }
    }
}
