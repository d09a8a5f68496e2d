//! Imperative parameter updates

use compass_routing::{ParamValue, ParameterMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Replace the current history entry instead of pushing a new one
    pub replace: bool,
    /// Start from the parameters currently in the query string
    pub merge: bool,
}

impl UpdateOptions {
    pub fn replace() -> Self {
        Self {
            replace: true,
            ..Self::default()
        }
    }

    pub fn without_merge(mut self) -> Self {
        self.merge = false;
        self
    }
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            replace: false,
            merge: true,
        }
    }
}

/// Keys to set or clear, applied in order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamUpdates(Vec<(String, Option<ParamValue>)>);

impl ParamUpdates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.0.push((key.into(), Some(value.into())));
        self
    }

    /// Remove `key` from the resulting query string
    pub fn clear(mut self, key: impl Into<String>) -> Self {
        self.0.push((key.into(), None));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn apply(self, params: &mut ParameterMap) {
        for (key, value) in self.0 {
            match value {
                Some(value) => params.insert(key, value),
                None => {
                    params.remove(&key);
                }
            }
        }
    }
}

impl From<ParameterMap> for ParamUpdates {
    fn from(params: ParameterMap) -> Self {
        Self(params.into_iter().map(|(k, v)| (k, Some(v))).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_sets_and_clears() {
        let mut params: ParameterMap = [("tab", "editor"), ("page", "2")].into_iter().collect();

        ParamUpdates::new()
            .set("tab", "preview")
            .clear("page")
            .set("tag", vec!["a", "b"])
            .apply(&mut params);

        assert_eq!(params.get_str("tab"), Some("preview"));
        assert!(!params.contains_key("page"));
        assert_eq!(params.get("tag"), Some(&ParamValue::from(vec!["a", "b"])));
    }

    #[test]
    fn test_options_default_to_merge_and_push() {
        let options = UpdateOptions::default();
        assert!(options.merge);
        assert!(!options.replace);

        let options = UpdateOptions::replace().without_merge();
        assert!(options.replace);
        assert!(!options.merge);
    }
}
