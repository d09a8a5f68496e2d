//! Compass Resolver Engine
//!
//! Feature modules register resolvers against segment patterns; on every
//! navigation the orchestrator works out which of them apply:
//! 1. resolvers registered for the exact path
//! 2. resolvers of the most specific matching pattern (path parameters bound)
//! 3. recursive resolvers of every ancestor pattern
//!
//! and runs them one after another, collecting a `Resolution` from each.
//! At most one resolution cycle runs at a time; overlapping requests are
//! dropped and counted.

mod error;
mod orchestrator;
mod registry;
mod resolution;
mod resolver;
mod update;

pub use error::ResolverError;
pub use orchestrator::{LocationSnapshot, RegistryState, ResolutionOrchestrator, ResolutionPhase};
pub use registry::{ResolverHandle, ResolverRegistry};
pub use resolution::{MatchKind, Resolution, ResolveContext};
pub use resolver::{HandlerFuture, RegisteredResolver, ResolverHandler, ResolverRegistration};
pub use update::{ParamUpdates, UpdateOptions};
