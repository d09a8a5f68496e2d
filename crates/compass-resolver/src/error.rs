//! Resolver error types

use thiserror::Error;

/// Why a single resolver invocation failed.
///
/// Never escapes a resolution cycle; it is flattened into
/// `Resolution::error` as a one-line message.
#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("{0}")]
    Failed(String),

    #[error("Resolver panicked: {0}")]
    Panicked(String),
}
