//! Resolver Registry
//!
//! Resolvers are bucketed by normalized pattern. Buckets keep the order in
//! which their pattern was first registered; inside a bucket resolvers are
//! sorted by descending priority, ties in registration order.

use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use uuid::Uuid;

use compass_routing::normalize_path;

use crate::resolver::{RegisteredResolver, ResolverRegistration};

#[derive(Default)]
struct RegistryInner {
    by_pattern: IndexMap<String, Vec<RegisteredResolver>>,
    next_sequence: u64,
}

impl RegistryInner {
    fn remove(&mut self, pattern: &str, id: &str) -> bool {
        let Some(bucket) = self.by_pattern.get_mut(pattern) else {
            return false;
        };

        let before = bucket.len();
        bucket.retain(|resolver| resolver.id != id);
        let removed = bucket.len() != before;

        if bucket.is_empty() {
            self.by_pattern.shift_remove(pattern);
        }

        removed
    }
}

#[derive(Clone, Default)]
pub struct ResolverRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resolver; keep the returned handle to remove it again
    pub fn register(&self, registration: ResolverRegistration) -> ResolverHandle {
        let pattern = normalize_path(&registration.segment_pattern);
        let id = Uuid::new_v4().to_string();

        {
            let mut inner = self.inner.write();
            let sequence = inner.next_sequence;
            inner.next_sequence += 1;

            let resolver =
                RegisteredResolver::new(id.clone(), pattern.clone(), &registration, sequence);
            let bucket = inner.by_pattern.entry(pattern.clone()).or_default();
            bucket.push(resolver);
            bucket.sort_by(|a, b| b.priority.cmp(&a.priority));
        }

        tracing::info!(
            resolver_id = %id,
            pattern = %pattern,
            priority = registration.priority,
            recursive = registration.recursive,
            "Registered resolver"
        );

        ResolverHandle {
            registry: Arc::downgrade(&self.inner),
            pattern,
            id,
            active: AtomicBool::new(true),
        }
    }

    pub fn has_resolver(&self, pattern: &str) -> bool {
        self.inner
            .read()
            .by_pattern
            .contains_key(normalize_path(pattern).as_str())
    }

    /// Every registered resolver, oldest first
    pub fn list_all(&self) -> Vec<RegisteredResolver> {
        let mut all: Vec<RegisteredResolver> = self
            .inner
            .read()
            .by_pattern
            .values()
            .flatten()
            .cloned()
            .collect();
        all.sort_by(|a, b| {
            a.registered_at
                .cmp(&b.registered_at)
                .then(a.sequence.cmp(&b.sequence))
        });
        all
    }

    /// Resolvers for one pattern, in invocation order
    pub fn resolvers_for(&self, pattern: &str) -> Vec<RegisteredResolver> {
        self.inner
            .read()
            .by_pattern
            .get(normalize_path(pattern).as_str())
            .cloned()
            .unwrap_or_default()
    }

    pub fn patterns(&self) -> Vec<String> {
        self.inner.read().by_pattern.keys().cloned().collect()
    }

    /// Point-in-time copy of every bucket.
    ///
    /// A resolution cycle iterates over this copy, so handlers may register
    /// or unregister resolvers while the cycle is running.
    pub fn snapshot(&self) -> IndexMap<String, Vec<RegisteredResolver>> {
        self.inner.read().by_pattern.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_pattern.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().by_pattern.is_empty()
    }

    /// Drop every registration (subsystem teardown)
    pub fn clear(&self) {
        self.inner.write().by_pattern.clear();
    }
}

/// Removes exactly one registration. Only the first call has an effect.
pub struct ResolverHandle {
    registry: Weak<RwLock<RegistryInner>>,
    pattern: String,
    id: String,
    active: AtomicBool,
}

impl ResolverHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns true if this call removed the resolver
    pub fn unregister(&self) -> bool {
        if !self.active.swap(false, Ordering::SeqCst) {
            return false;
        }

        let Some(inner) = self.registry.upgrade() else {
            return false;
        };

        let removed = inner.write().remove(&self.pattern, &self.id);
        if removed {
            tracing::info!(resolver_id = %self.id, pattern = %self.pattern, "Unregistered resolver");
        }
        removed
    }
}

impl std::fmt::Debug for ResolverHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverHandle")
            .field("pattern", &self.pattern)
            .field("id", &self.id)
            .field("active", &self.active.load(Ordering::SeqCst))
            .finish()
    }
}
