//! Error types for converter setup
use thiserror::Error;

/// Failures that can happen while configuring a converter.
///
/// Conversion itself never fails: unmatched syntax falls through as text.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("unknown hook `{0}`")]
    UnknownHook(String),
    #[error("invalid converter options: {0}")]
    InvalidOptions(#[from] serde_json::Error),
}
