//! Resolution Orchestrator
//!
//! ```text
//! Idle --resolve_current_route--> Resolving --cycle finished--> Idle
//!                                     |
//!                 resolve_current_route while Resolving: dropped
//! ```

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use compass_routing::{
    build_url, decode, extract_path_params, find_best_matching_pattern, is_descendant,
    normalize_path, DecodeOptions, LocationProvider, ParamValue, ParameterMap,
};
use compass_session::NavigationStateStore;

use crate::registry::{ResolverHandle, ResolverRegistry};
use crate::resolution::{MatchKind, Resolution, ResolveContext};
use crate::resolver::{RegisteredResolver, ResolverRegistration};
use crate::update::{ParamUpdates, UpdateOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionPhase {
    Idle,
    Resolving,
}

impl ResolutionPhase {
    pub fn can_transition_to(&self, target: ResolutionPhase) -> bool {
        matches!(
            (self, target),
            (ResolutionPhase::Idle, ResolutionPhase::Resolving)
                | (ResolutionPhase::Resolving, ResolutionPhase::Idle)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionPhase::Idle => "idle",
            ResolutionPhase::Resolving => "resolving",
        }
    }
}

impl std::fmt::Display for ResolutionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parameters last seen on a path, kept for when the user comes back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationSnapshot {
    pub params: ParameterMap,
    pub timestamp: DateTime<Utc>,
}

/// Observable view of the engine
#[derive(Debug, Clone)]
pub struct RegistryState {
    pub resolvers_by_pattern: IndexMap<String, Vec<RegisteredResolver>>,
    pub phase: ResolutionPhase,
    pub active_segment: Option<String>,
    pub current_params: ParameterMap,
    pub last_error: Option<String>,
    /// Cycles refused because another one was in flight
    pub dropped_cycles: u64,
    pub completed_cycles: u64,
}

impl RegistryState {
    pub fn is_resolving(&self) -> bool {
        self.phase == ResolutionPhase::Resolving
    }
}

struct CycleState {
    phase: ResolutionPhase,
    active_segment: Option<String>,
    current_params: ParameterMap,
    last_error: Option<String>,
    snapshots: HashMap<String, LocationSnapshot>,
    dropped_cycles: u64,
    completed_cycles: u64,
}

impl Default for CycleState {
    fn default() -> Self {
        Self {
            phase: ResolutionPhase::Idle,
            active_segment: None,
            current_params: ParameterMap::new(),
            last_error: None,
            snapshots: HashMap::new(),
            dropped_cycles: 0,
            completed_cycles: 0,
        }
    }
}

/// Puts the phase back to `Idle` even if the cycle future is dropped mid-await
struct CycleGuard<'a> {
    state: &'a RwLock<CycleState>,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.state.write().phase = ResolutionPhase::Idle;
    }
}

pub struct ResolutionOrchestrator {
    registry: ResolverRegistry,
    location: Arc<dyn LocationProvider>,
    store: NavigationStateStore,
    decode_options: DecodeOptions,
    state: Arc<RwLock<CycleState>>,
}

impl ResolutionOrchestrator {
    pub fn new(
        registry: ResolverRegistry,
        location: Arc<dyn LocationProvider>,
        store: NavigationStateStore,
    ) -> Self {
        Self {
            registry,
            location,
            store,
            decode_options: DecodeOptions::default(),
            state: Arc::new(RwLock::new(CycleState::default())),
        }
    }

    pub fn with_decode_options(mut self, options: DecodeOptions) -> Self {
        self.decode_options = options;
        self
    }

    pub fn registry(&self) -> &ResolverRegistry {
        &self.registry
    }

    pub fn register(&self, registration: ResolverRegistration) -> ResolverHandle {
        self.registry.register(registration)
    }

    /// Resolve the live location. Returns an empty list without doing
    /// anything if another cycle is still running.
    pub async fn resolve_current_route(&self) -> Vec<Resolution> {
        let Some(_guard) = self.try_begin() else {
            return Vec::new();
        };

        let location = self.location.current();
        let path = normalize_path(&location.path);
        let live = decode(&location.query, &self.decode_options);

        let merged = {
            let mut state = self.state.write();

            if let Some(previous) = state.active_segment.clone() {
                if previous != path {
                    let snapshot = LocationSnapshot {
                        params: state.current_params.clone(),
                        timestamp: Utc::now(),
                    };
                    state.snapshots.insert(previous, snapshot);
                }
            }

            let saved = state
                .snapshots
                .get(&path)
                .map(|snapshot| snapshot.params.clone())
                .or_else(|| {
                    self.store
                        .restore_location_params(&location.path)
                        .map(|query| decode(&query, &self.decode_options))
                });

            match saved {
                Some(saved) => live.layered_over(&saved),
                None => live,
            }
        };

        let mut params = merged;
        let collected = self.collect_resolvers(&path, &mut params);
        let results = self.invoke_all(&path, &params, collected).await;

        let last_error = aggregate_errors(&results);
        {
            let mut state = self.state.write();
            state.active_segment = Some(path.clone());
            state.current_params = params;
            state.last_error = last_error.clone();
            state.completed_cycles += 1;
        }

        tracing::debug!(
            path = %path,
            resolvers = results.len(),
            failed = last_error.is_some(),
            "Resolution cycle finished"
        );

        results
    }

    /// Run every resolver that applies to `path` with `params` plus any path parameters
    pub async fn resolve_route(&self, path: &str, params: ParameterMap) -> Vec<Resolution> {
        let path = normalize_path(path);
        let mut params = params;
        let collected = self.collect_resolvers(&path, &mut params);
        self.invoke_all(&path, &params, collected).await
    }

    fn try_begin(&self) -> Option<CycleGuard<'_>> {
        let mut state = self.state.write();

        if !state.phase.can_transition_to(ResolutionPhase::Resolving) {
            state.dropped_cycles += 1;
            tracing::warn!(
                dropped_cycles = state.dropped_cycles,
                "Resolution already in progress, dropping request"
            );
            return None;
        }

        state.phase = ResolutionPhase::Resolving;
        state.last_error = None;
        Some(CycleGuard { state: &self.state })
    }

    /// Exact-match resolvers, then the best pattern match, then recursive ancestors
    fn collect_resolvers(
        &self,
        path: &str,
        params: &mut ParameterMap,
    ) -> Vec<(RegisteredResolver, MatchKind)> {
        let buckets = self.registry.snapshot();
        let mut collected = Vec::new();

        if let Some(bucket) = buckets.get(path) {
            collected.extend(bucket.iter().cloned().map(|r| (r, MatchKind::Exact)));
        }

        if let Some(best) = find_best_matching_pattern(buckets.keys().map(String::as_str), path) {
            if best != path {
                if let Some(path_params) = extract_path_params(best, path) {
                    params.overlay(&path_params);
                }
                if let Some(bucket) = buckets.get(best) {
                    collected.extend(bucket.iter().cloned().map(|r| (r, MatchKind::Pattern)));
                }
            }
        }

        for (pattern, bucket) in &buckets {
            if !is_descendant(pattern, path) {
                continue;
            }
            collected.extend(
                bucket
                    .iter()
                    .filter(|r| r.recursive)
                    .cloned()
                    .map(|r| (r, MatchKind::Recursive)),
            );
        }

        collected
    }

    async fn invoke_all(
        &self,
        path: &str,
        params: &ParameterMap,
        collected: Vec<(RegisteredResolver, MatchKind)>,
    ) -> Vec<Resolution> {
        let mut results = Vec::with_capacity(collected.len());

        for (resolver, match_kind) in collected {
            let context = ResolveContext {
                path: path.to_string(),
                pattern: resolver.segment_pattern.clone(),
                match_kind,
                resolver_id: resolver.id.clone(),
            };

            let resolution = resolver.invoke(params.clone(), context).await;
            if !resolution.success {
                tracing::warn!(
                    resolver_id = %resolver.id,
                    pattern = %resolver.segment_pattern,
                    error = resolution.error.as_deref().unwrap_or_default(),
                    "Resolver failed"
                );
            }
            results.push(resolution);
        }

        results
    }

    /// Rewrite the query string without waiting for a resolution cycle.
    ///
    /// Returns the URL navigated to.
    pub fn update_params(&self, updates: ParamUpdates, options: UpdateOptions) -> String {
        let location = self.location.current();
        let mut params = if options.merge {
            decode(&location.query, &self.decode_options)
        } else {
            ParameterMap::new()
        };
        updates.apply(&mut params);

        let url = build_url(&location.path, &params);
        if options.replace {
            self.location.replace(&url);
        } else {
            self.location.push(&url);
        }

        self.state.write().current_params = params;
        url
    }

    pub fn get_param(&self, key: &str) -> Option<ParamValue> {
        self.state.read().current_params.get(key).cloned()
    }

    pub fn get_params(&self) -> ParameterMap {
        self.state.read().current_params.clone()
    }

    /// Aggregated error of the last completed cycle, `"; "`-joined
    pub fn last_error(&self) -> Option<String> {
        self.state.read().last_error.clone()
    }

    pub fn phase(&self) -> ResolutionPhase {
        self.state.read().phase
    }

    pub fn dropped_cycles(&self) -> u64 {
        self.state.read().dropped_cycles
    }

    pub fn snapshot_for(&self, path: &str) -> Option<LocationSnapshot> {
        self.state.read().snapshots.get(&normalize_path(path)).cloned()
    }

    /// Forget every per-path snapshot (logout)
    pub fn clear_snapshots(&self) {
        self.state.write().snapshots.clear();
    }

    pub fn state(&self) -> RegistryState {
        let resolvers_by_pattern = self.registry.snapshot();
        let state = self.state.read();
        RegistryState {
            resolvers_by_pattern,
            phase: state.phase,
            active_segment: state.active_segment.clone(),
            current_params: state.current_params.clone(),
            last_error: state.last_error.clone(),
            dropped_cycles: state.dropped_cycles,
            completed_cycles: state.completed_cycles,
        }
    }
}

fn aggregate_errors(results: &[Resolution]) -> Option<String> {
    let errors: Vec<&str> = results
        .iter()
        .filter(|r| !r.success)
        .map(|r| r.error.as_deref().unwrap_or("resolver failed"))
        .collect();

    if errors.is_empty() {
        None
    } else {
        Some(errors.join("; "))
    }
}
