/// Splits a request target or route pattern into segments.
///
/// Strips a single optional leading `/`, splits on `/`, and drops any
/// resulting empty segment. A bare `/` or an empty string both yield the
/// empty list (the root). Total: never fails.
pub fn split_path(path: &str) -> Vec<String> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    trimmed
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// `true` if `segment` is a parameter placeholder (`:name`).
pub fn is_param_segment(segment: &str) -> bool {
    segment.starts_with(':')
}

/// The parameter name of a `:name` segment, without the leading colon.
pub fn param_name(segment: &str) -> &str {
    segment.strip_prefix(':').unwrap_or(segment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_forms_yield_empty_segments() {
        assert_eq!(split_path("/"), Vec::<String>::new());
        assert_eq!(split_path(""), Vec::<String>::new());
    }

    #[test]
    fn leading_and_trailing_slashes_are_normalized() {
        assert_eq!(split_path("/a/b"), vec!["a", "b"]);
        assert_eq!(split_path("a/b"), vec!["a", "b"]);
        assert_eq!(split_path("/a/b/"), vec!["a", "b"]);
        assert_eq!(split_path("//a//b"), vec!["a", "b"]);
    }

    #[test]
    fn param_segments_are_recognized() {
        assert!(is_param_segment(":id"));
        assert!(!is_param_segment("id"));
        assert_eq!(param_name(":id"), "id");
    }
}
