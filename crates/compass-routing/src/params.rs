//! Opaque parameter maps

use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;

/// A single query parameter value.
///
/// Repeated query keys become `List`; everything else is a `Scalar`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Scalar(String),
    List(Vec<String>),
}

impl ParamValue {
    /// First value, if any
    pub fn first(&self) -> Option<&str> {
        match self {
            ParamValue::Scalar(value) => Some(value),
            ParamValue::List(values) => values.first().map(String::as_str),
        }
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            ParamValue::Scalar(value) => Some(value),
            ParamValue::List(_) => None,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, ParamValue::List(_))
    }

    /// All values in arrival order
    pub fn values(&self) -> Vec<&str> {
        match self {
            ParamValue::Scalar(value) => vec![value.as_str()],
            ParamValue::List(values) => values.iter().map(String::as_str).collect(),
        }
    }

    /// Append `other`, coercing both sides into a list
    pub fn append(&mut self, other: ParamValue) {
        let mut values = match std::mem::replace(self, ParamValue::List(Vec::new())) {
            ParamValue::Scalar(value) => vec![value],
            ParamValue::List(values) => values,
        };
        match other {
            ParamValue::Scalar(value) => values.push(value),
            ParamValue::List(more) => values.extend(more),
        }
        *self = ParamValue::List(values);
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Scalar(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Scalar(value)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        ParamValue::List(values)
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(values: Vec<&str>) -> Self {
        ParamValue::List(values.into_iter().map(str::to_string).collect())
    }
}

/// Mapping from parameter name to value.
///
/// A cleared key is absent from the map; there is no null value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterMap(BTreeMap<String, ParamValue>);

impl ParameterMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    /// First value stored under `key`
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(ParamValue::first)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Add a value, turning an existing entry into a list
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        match self.0.entry(key.into()) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(value.into());
            }
            btree_map::Entry::Occupied(mut slot) => slot.get_mut().append(value.into()),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, ParamValue> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Copy every entry of `other` into `self`; `other` wins on collision
    pub fn overlay(&mut self, other: &ParameterMap) {
        for (key, value) in other.iter() {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// `self` laid over `base`: keys in `self` win
    pub fn layered_over(&self, base: &ParameterMap) -> ParameterMap {
        let mut merged = base.clone();
        merged.overlay(self);
        merged
    }
}

impl FromIterator<(String, ParamValue)> for ParameterMap {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for ParameterMap {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.to_string(), ParamValue::from(v)))
                .collect(),
        )
    }
}

impl IntoIterator for ParameterMap {
    type Item = (String, ParamValue);
    type IntoIter = btree_map::IntoIter<String, ParamValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ParameterMap {
    type Item = (&'a String, &'a ParamValue);
    type IntoIter = btree_map::Iter<'a, String, ParamValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
