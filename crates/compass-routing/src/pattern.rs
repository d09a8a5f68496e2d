//! Segment patterns
//!
//! A pattern is a `/`-delimited template such as `admin/templates/:id/manage`.
//! Segments starting with `:` bind the corresponding path segment under the
//! name that follows the colon; every other segment must match literally.
//!
//! Everything here is pure. A malformed pattern simply fails to match.

use crate::params::ParameterMap;

const PARAM_PREFIX: char = ':';

/// Split on `/`, discarding empty segments
pub fn split_segments(value: &str) -> Vec<&str> {
    value.split('/').filter(|s| !s.is_empty()).collect()
}

/// Strip leading/trailing slashes and collapse empty segments.
///
/// `"/admin//templates/"` becomes `"admin/templates"`.
pub fn normalize_path(value: &str) -> String {
    split_segments(value).join("/")
}

/// Bind the `:name` segments of `pattern` against `path`.
///
/// Returns `None` when the segment counts differ or a literal segment
/// does not match exactly.
///
/// ```
/// use compass_routing::extract_path_params;
///
/// let params = extract_path_params("admin/templates/:id/manage", "/admin/templates/42/manage")
///     .unwrap();
/// assert_eq!(params.get_str("id"), Some("42"));
/// assert!(extract_path_params("admin/:id", "admin/1/extra").is_none());
/// ```
pub fn extract_path_params(pattern: &str, path: &str) -> Option<ParameterMap> {
    let pattern_segments = split_segments(pattern);
    let path_segments = split_segments(path);

    if pattern_segments.len() != path_segments.len() {
        return None;
    }

    bind_segments(&pattern_segments, &path_segments)
}

fn bind_segments(pattern_segments: &[&str], path_segments: &[&str]) -> Option<ParameterMap> {
    let mut params = ParameterMap::new();
    for (expected, actual) in pattern_segments.iter().zip(path_segments) {
        match expected.strip_prefix(PARAM_PREFIX) {
            Some(name) => params.insert(name, *actual),
            None if expected == actual => {}
            None => return None,
        }
    }
    Some(params)
}

pub fn matches_pattern(pattern: &str, path: &str) -> bool {
    extract_path_params(pattern, path).is_some()
}

/// `segments * 10 - parameters`: literal segments outrank parameters
pub fn score_specificity(pattern: &str) -> i32 {
    let segments = split_segments(pattern);
    let parameters = segments
        .iter()
        .filter(|s| s.starts_with(PARAM_PREFIX))
        .count();
    (segments.len() * 10) as i32 - parameters as i32
}

/// Highest-scoring pattern that matches `path`.
///
/// Ties go to the pattern encountered first, so the result depends on the
/// iteration order of `patterns`.
pub fn find_best_matching_pattern<'a, I>(patterns: I, path: &str) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(&'a str, i32)> = None;

    for pattern in patterns {
        if !matches_pattern(pattern, path) {
            continue;
        }
        let score = score_specificity(pattern);
        match best {
            Some((_, best_score)) if best_score >= score => {}
            _ => best = Some((pattern, score)),
        }
    }

    best.map(|(pattern, _)| pattern)
}

/// True iff `path`, minus a trailing slash, starts with `parent_pattern + "/"`
pub fn is_child_route(parent_pattern: &str, path: &str) -> bool {
    let path = path.strip_suffix('/').unwrap_or(path);
    path.starts_with(&format!("{}/", parent_pattern))
}

/// True iff `path` is strictly nested under `pattern`.
///
/// Parameter segments in `pattern` match any value; literal patterns reduce
/// to [`is_child_route`] on the normalized forms.
pub fn is_descendant(pattern: &str, path: &str) -> bool {
    let pattern_segments = split_segments(pattern);
    if !pattern_segments.iter().any(|s| s.starts_with(PARAM_PREFIX)) {
        return is_child_route(&pattern_segments.join("/"), &normalize_path(path));
    }

    let path_segments = split_segments(path);
    path_segments.len() > pattern_segments.len()
        && bind_segments(&pattern_segments, &path_segments[..pattern_segments.len()]).is_some()
}

/// Left-to-right merge. Colliding keys are coerced into one list holding
/// every value in arrival order; other keys pass through unchanged.
pub fn merge_params<'a, I>(maps: I) -> ParameterMap
where
    I: IntoIterator<Item = &'a ParameterMap>,
{
    let mut merged = ParameterMap::new();
    for map in maps {
        for (key, value) in map.iter() {
            merged.append(key.clone(), value.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamValue;
    use pretty_assertions::assert_eq;

    fn substitute(pattern: &str, params: &ParameterMap) -> String {
        split_segments(pattern)
            .into_iter()
            .map(|segment| match segment.strip_prefix(':') {
                Some(name) => params.get_str(name).unwrap_or_default().to_string(),
                None => segment.to_string(),
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    #[test]
    fn test_extract_path_params() {
        let params = extract_path_params("admin/templates/:id/manage", "admin/templates/42/manage")
            .unwrap();
        assert_eq!(params.get_str("id"), Some("42"));
        assert_eq!(params.len(), 1);

        let params = extract_path_params("/users/:user/posts/:post/", "users/ann/posts/7").unwrap();
        assert_eq!(params.get_str("user"), Some("ann"));
        assert_eq!(params.get_str("post"), Some("7"));
    }

    #[test]
    fn test_extract_rejects_mismatches() {
        assert!(extract_path_params("admin/:id", "admin").is_none());
        assert!(extract_path_params("admin/:id", "admin/1/2").is_none());
        assert!(extract_path_params("admin/templates", "admin/categories").is_none());
        assert!(!matches_pattern("a/b", "a/c"));
    }

    #[test]
    fn test_extracted_values_reconstruct_path() {
        let cases = [
            ("admin/templates/:id/manage", "admin/templates/42/manage"),
            (":section/:page", "settings/profile"),
            ("files/:bucket/browse", "files/photos/browse"),
            ("static/path", "static/path"),
        ];

        for (pattern, path) in cases {
            let params = extract_path_params(pattern, path).unwrap();
            assert!(matches_pattern(pattern, path));
            assert_eq!(substitute(pattern, &params), path);
        }
    }

    #[test]
    fn test_score_specificity() {
        assert_eq!(score_specificity("a/b"), 20);
        assert_eq!(score_specificity("a/:id"), 19);
        assert_eq!(score_specificity("admin/templates/:id/manage"), 39);
        assert_eq!(score_specificity(""), 0);
    }

    #[test]
    fn test_best_match_prefers_literals() {
        let patterns = ["a/:id", "a/b"];
        assert_eq!(find_best_matching_pattern(patterns, "a/b"), Some("a/b"));
        assert_eq!(find_best_matching_pattern(patterns, "a/c"), Some("a/:id"));
        assert_eq!(find_best_matching_pattern(patterns, "x/y"), None);
    }

    #[test]
    fn test_best_match_tie_goes_to_first() {
        let patterns = [":section/edit", "users/:id"];
        assert_eq!(
            find_best_matching_pattern(patterns, "users/edit"),
            Some(":section/edit")
        );

        let reversed = ["users/:id", ":section/edit"];
        assert_eq!(
            find_best_matching_pattern(reversed, "users/edit"),
            Some("users/:id")
        );
    }

    #[test]
    fn test_is_child_route() {
        assert!(is_child_route("admin/templates", "admin/templates/7"));
        assert!(is_child_route("admin/templates", "admin/templates/7/manage/"));
        assert!(!is_child_route("admin/templates", "admin/templates"));
        assert!(!is_child_route("admin/templates", "admin/templates/"));
        assert!(!is_child_route("admin/templates", "admin/templatesX/7"));
    }

    #[test]
    fn test_is_descendant() {
        assert!(is_descendant("/admin/", "/admin/templates"));
        assert!(is_descendant("admin/templates/:id", "admin/templates/7/manage"));
        assert!(!is_descendant("admin/templates/:id", "admin/templates/7"));
        assert!(!is_descendant("admin/templates/:id", "admin/categories/7/manage"));
    }

    #[test]
    fn test_merge_params_coerces_collisions() {
        let first: ParameterMap = [("tab", "a"), ("page", "1")].into_iter().collect();
        let second: ParameterMap = [("tab", "b")].into_iter().collect();
        let mut third = ParameterMap::new();
        third.insert("tab", vec!["c", "d"]);

        let merged = merge_params([&first, &second, &third]);
        assert_eq!(
            merged.get("tab"),
            Some(&ParamValue::from(vec!["a", "b", "c", "d"]))
        );
        assert_eq!(merged.get("page"), Some(&ParamValue::from("1")));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/admin//templates/"), "admin/templates");
        assert_eq!(normalize_path("/"), "");
    }
}
