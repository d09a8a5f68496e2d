//! Query string <-> `ParameterMap`
//!
//! Repeated keys accumulate into [`ParamValue::List`] on decode and are
//! written back as repeated `key=value` pairs on encode.

use std::fmt;
use std::sync::Arc;

use url::form_urlencoded;

use crate::params::{ParamValue, ParameterMap};

type KeyTransform = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Options for [`decode`]
#[derive(Clone)]
pub struct DecodeOptions {
    /// Apply percent-decoding (and `+` as space) to keys and values
    pub decode: bool,
    key_transform: Option<KeyTransform>,
}

impl DecodeOptions {
    /// Keep keys and values exactly as they appear in the query string
    pub fn raw() -> Self {
        Self {
            decode: false,
            key_transform: None,
        }
    }

    /// Rewrite every key before it is stored, e.g. to normalize casing
    pub fn with_key_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.key_transform = Some(Arc::new(transform));
        self
    }

    fn transform_key(&self, key: &str) -> String {
        match &self.key_transform {
            Some(transform) => transform(key),
            None => key.to_string(),
        }
    }
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            decode: true,
            key_transform: None,
        }
    }
}

impl fmt::Debug for DecodeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeOptions")
            .field("decode", &self.decode)
            .field("key_transform", &self.key_transform.is_some())
            .finish()
    }
}

/// Parse a raw query string. A leading `?` is ignored, as are empty pairs.
pub fn decode(query: &str, options: &DecodeOptions) -> ParameterMap {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut params = ParameterMap::new();

    if options.decode {
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            params.append(options.transform_key(&key), value.into_owned());
        }
    } else {
        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            params.append(options.transform_key(key), value);
        }
    }

    params
}

/// Serialize to a query string without the leading `?`
pub fn encode(params: &ParameterMap) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        match value {
            ParamValue::Scalar(value) => {
                serializer.append_pair(key, value);
            }
            ParamValue::List(values) => {
                for value in values {
                    serializer.append_pair(key, value);
                }
            }
        }
    }
    serializer.finish()
}

/// `base_path` alone when there is nothing to encode, else `base_path?query`
pub fn build_url(base_path: &str, params: &ParameterMap) -> String {
    let query = encode(params);
    if query.is_empty() {
        base_path.to_string()
    } else {
        format!("{}?{}", base_path, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_basic() {
        let params = decode("?tab=editor&id=42", &DecodeOptions::default());
        assert_eq!(params.get_str("tab"), Some("editor"));
        assert_eq!(params.get_str("id"), Some("42"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_decode_repeated_keys() {
        let params = decode("tag=a&tag=b&&tag=c&flag", &DecodeOptions::default());
        assert_eq!(params.get("tag"), Some(&ParamValue::from(vec!["a", "b", "c"])));
        assert_eq!(params.get_str("flag"), Some(""));
    }

    #[test]
    fn test_decode_percent_encoding() {
        let params = decode("q=rust%20lang&name=a+b", &DecodeOptions::default());
        assert_eq!(params.get_str("q"), Some("rust lang"));
        assert_eq!(params.get_str("name"), Some("a b"));

        let raw = decode("q=rust%20lang", &DecodeOptions::raw());
        assert_eq!(raw.get_str("q"), Some("rust%20lang"));
    }

    #[test]
    fn test_decode_key_transform() {
        let options = DecodeOptions::default().with_key_transform(|key| key.to_lowercase());
        let params = decode("Tab=editor&TAB=preview", &options);
        assert_eq!(params.get("tab"), Some(&ParamValue::from(vec!["editor", "preview"])));
    }

    #[test]
    fn test_encode_lists_as_repeated_pairs() {
        let mut params = ParameterMap::new();
        params.insert("tag", vec!["x", "y"]);
        params.insert("q", "a b&c");
        assert_eq!(encode(&params), "q=a+b%26c&tag=x&tag=y");
    }

    #[test]
    fn test_round_trip() {
        let mut params = ParameterMap::new();
        params.insert("tab", "deleted");
        params.insert("search", "name = 'x' & more");
        params.insert("ids", vec!["3", "1", "2"]);

        let decoded = decode(&encode(&params), &DecodeOptions::default());
        assert_eq!(decoded, params);
    }

    #[test]
    fn test_build_url() {
        assert_eq!(build_url("/admin/categories", &ParameterMap::new()), "/admin/categories");

        let params: ParameterMap = [("tab", "deleted")].into_iter().collect();
        assert_eq!(
            build_url("/admin/categories", &params),
            "/admin/categories?tab=deleted"
        );
    }
}
