//! Resolver results and invocation context

use serde::{Deserialize, Serialize};

use compass_routing::ParameterMap;

use crate::error::ResolverError;

/// Outcome of one resolver invocation. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<ParameterMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

impl Resolution {
    pub fn ok() -> Self {
        Self {
            success: true,
            params: None,
            error: None,
            redirect: None,
        }
    }

    pub fn with_params(params: ParameterMap) -> Self {
        Self {
            params: Some(params),
            ..Self::ok()
        }
    }

    pub fn redirect(to: impl Into<String>) -> Self {
        Self {
            redirect: Some(to.into()),
            ..Self::ok()
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            params: None,
            error: Some(message.into()),
            redirect: None,
        }
    }
}

impl From<ResolverError> for Resolution {
    fn from(err: ResolverError) -> Self {
        Resolution::failure(err.to_string())
    }
}

/// How a resolver came to be selected for the current path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// Pattern string equals the normalized path
    Exact,
    /// Most specific parameterized pattern
    Pattern,
    /// Recursive resolver of an ancestor pattern
    Recursive,
}

/// Passed to every handler alongside the merged parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveContext {
    /// Normalized path being resolved
    pub path: String,
    /// Pattern the resolver was registered under
    pub pattern: String,
    pub match_kind: MatchKind,
    pub resolver_id: String,
}
