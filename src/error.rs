//! Error taxonomy (spec 7).
//!
//! Most failure kinds in spec 7 are *not* represented as `Err` returns:
//! stacked-neutral mismatches are diagnostics that drop the offending
//! candidate, base-assignment misses are an aggregated `bool`, and
//! disconnected-region path queries return an empty path rather than an
//! error. Only ingestion failures and use-before-init are exceptional.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid map dimensions: {width}x{height} tiles")]
    InvalidDimensions { width: i32, height: i32 },

    #[error("map queried before Initialize completed")]
    Uninitialized,
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
