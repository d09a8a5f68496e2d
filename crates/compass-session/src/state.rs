//! Persisted schema

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Raw query string last seen on a path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredLocationParams {
    pub params: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

/// The JSON document written under the storage key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedState {
    pub location_params: HashMap<String, StoredLocationParams>,
    pub last_visited_child: HashMap<String, String>,
}

impl PersistedState {
    pub fn is_empty(&self) -> bool {
        self.location_params.is_empty() && self.last_visited_child.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_field_names() {
        let mut state = PersistedState::default();
        state.location_params.insert(
            "/admin/categories".to_string(),
            StoredLocationParams {
                params: "tab=deleted".to_string(),
                timestamp: 1,
            },
        );
        state
            .last_visited_child
            .insert("/admin/templates".to_string(), "/admin/templates/7/manage".to_string());

        let json: serde_json::Value = serde_json::to_value(&state).unwrap();
        assert_eq!(json["locationParams"]["/admin/categories"]["params"], "tab=deleted");
        assert_eq!(json["locationParams"]["/admin/categories"]["timestamp"], 1);
        assert_eq!(
            json["lastVisitedChild"]["/admin/templates"],
            "/admin/templates/7/manage"
        );
    }

    #[test]
    fn test_missing_sections_default() {
        let state: PersistedState = serde_json::from_str("{}").unwrap();
        assert!(state.is_empty());
    }
}
