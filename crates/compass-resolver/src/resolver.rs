//! Resolver registrations

use chrono::{DateTime, Utc};
use futures_util::future::{self, BoxFuture, FutureExt};
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use compass_routing::ParameterMap;

use crate::error::ResolverError;
use crate::resolution::{Resolution, ResolveContext};

pub type HandlerFuture = BoxFuture<'static, anyhow::Result<Resolution>>;

pub type ResolverHandler = Arc<dyn Fn(ParameterMap, ResolveContext) -> HandlerFuture + Send + Sync>;

/// What a feature module hands to the registry
#[derive(Clone)]
pub struct ResolverRegistration {
    pub segment_pattern: String,
    /// Higher runs first within the same pattern
    pub priority: i32,
    /// Also fire for every path nested under the pattern
    pub recursive: bool,
    handler: ResolverHandler,
}

impl ResolverRegistration {
    pub fn new<F, Fut>(segment_pattern: impl Into<String>, handler: F) -> Self
    where
        F: Fn(ParameterMap, ResolveContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Resolution>> + Send + 'static,
    {
        Self {
            segment_pattern: segment_pattern.into(),
            priority: 0,
            recursive: false,
            handler: Arc::new(move |params, context| handler(params, context).boxed()),
        }
    }

    /// Handler that never suspends
    pub fn sync<F>(segment_pattern: impl Into<String>, handler: F) -> Self
    where
        F: Fn(ParameterMap, ResolveContext) -> anyhow::Result<Resolution> + Send + Sync + 'static,
    {
        Self::new(segment_pattern, move |params, context| {
            future::ready(handler(params, context))
        })
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn recursive(mut self) -> Self {
        self.recursive = true;
        self
    }

    pub(crate) fn handler(&self) -> ResolverHandler {
        Arc::clone(&self.handler)
    }
}

impl fmt::Debug for ResolverRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverRegistration")
            .field("segment_pattern", &self.segment_pattern)
            .field("priority", &self.priority)
            .field("recursive", &self.recursive)
            .finish_non_exhaustive()
    }
}

/// A registration owned by the registry
#[derive(Clone)]
pub struct RegisteredResolver {
    pub id: String,
    /// Normalized pattern
    pub segment_pattern: String,
    pub priority: i32,
    pub recursive: bool,
    pub registered_at: DateTime<Utc>,
    /// Registration order; breaks timestamp ties
    pub(crate) sequence: u64,
    handler: ResolverHandler,
}

impl RegisteredResolver {
    pub(crate) fn new(
        id: String,
        segment_pattern: String,
        registration: &ResolverRegistration,
        sequence: u64,
    ) -> Self {
        Self {
            id,
            segment_pattern,
            priority: registration.priority,
            recursive: registration.recursive,
            registered_at: Utc::now(),
            sequence,
            handler: registration.handler(),
        }
    }

    /// Run the handler. Errors and panics become a failed `Resolution`.
    pub async fn invoke(&self, params: ParameterMap, context: ResolveContext) -> Resolution {
        let handler = Arc::clone(&self.handler);
        let outcome = AssertUnwindSafe(async move { handler(params, context).await })
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(resolution)) => resolution,
            Ok(Err(e)) => ResolverError::Failed(e.to_string()).into(),
            Err(panic) => ResolverError::Panicked(panic_message(panic.as_ref())).into(),
        }
    }
}

impl fmt::Debug for RegisteredResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredResolver")
            .field("id", &self.id)
            .field("segment_pattern", &self.segment_pattern)
            .field("priority", &self.priority)
            .field("recursive", &self.recursive)
            .field("registered_at", &self.registered_at)
            .finish_non_exhaustive()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
