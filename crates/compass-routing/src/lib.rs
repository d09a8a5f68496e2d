//! Compass Routing Primitives
//!
//! Pure building blocks shared by the resolver engine and the location
//! sync controller:
//! - segment patterns with `:name` parameters and specificity scoring
//! - query string <-> `ParameterMap` codec
//! - the live-location interface and an in-memory history implementation

pub mod codec;
mod location;
mod params;
pub mod pattern;

pub use codec::{build_url, decode, encode, DecodeOptions};
pub use location::{Location, LocationProvider, MemoryLocation};
pub use params::{ParamValue, ParameterMap};
pub use pattern::{
    extract_path_params, find_best_matching_pattern, is_child_route, is_descendant,
    matches_pattern, merge_params, normalize_path, score_specificity, split_segments,
};
