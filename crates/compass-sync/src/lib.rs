//! Compass Location Sync Controller
//!
//! The only component that rewrites the live location on its own. Two
//! independent reactions run on every location change:
//! - save: record the query string for the path, and the full location
//!   under its two-segment parent
//! - restore: when the path changed and the user arrived without a query
//!   string, put back the saved query, or resume the last visited child
//!
//! The restore reaction is guarded by a `restoring` flag that is released
//! on a fixed timer after each rewrite.

mod controller;

pub use controller::{
    LocationSyncController, RestoreAction, DEFAULT_SETTLE_DELAY, PARENT_PREFIX_DEPTH,
};
