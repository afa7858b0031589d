//! Memoized regular expressions for the pattern functions.
//!
//! None of these ever fail: a pattern that does not compile behaves as if it
//! matched nothing.

use std::sync::Arc;

use regex::Regex;
use tracing::debug;

use crate::cache::TypedCache;

#[derive(Clone, Debug)]
pub struct Regexes {
    cache: TypedCache<String, Arc<Regex>>,
}

impl Regexes {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            cache: TypedCache::new("regexes", max_capacity),
        }
    }

    /// Compiled pattern, or `None` if it is not a valid expression.
    pub fn get(&self, pattern: &str) -> Option<Arc<Regex>> {
        self.cache
            .get_or_try_insert_with(pattern.to_string(), || Regex::new(pattern).map(Arc::new))
            .map_err(|e| debug!("Invalid pattern {:?}: {}", pattern, e))
            .ok()
    }

    pub fn is_match(&self, pattern: &str, text: &str) -> bool {
        self.get(pattern).is_some_and(|re| re.is_match(text))
    }

    /// Replace every match; `$1` style references are expanded.
    pub fn replace_all(&self, pattern: &str, text: &str, replacement: &str) -> String {
        match self.get(pattern) {
            Some(re) => re.replace_all(text, replacement).into_owned(),
            None => text.to_string(),
        }
    }

    /// Group `index` of the first match (0 is the whole match), or an empty string.
    pub fn find(&self, pattern: &str, text: &str, index: usize) -> String {
        self.get(pattern)
            .and_then(|re| {
                re.captures(text)
                    .and_then(|caps| caps.get(index).map(|m| m.as_str().to_string()))
            })
            .unwrap_or_default()
    }
}

impl Default for Regexes {
    fn default() -> Self {
        Self::new(512)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_match() {
        let regexes = Regexes::default();
        assert!(regexes.is_match("^a", "abc"));
        assert!(!regexes.is_match("^b", "abc"));
    }

    #[test]
    fn test_invalid_pattern_never_matches() {
        let regexes = Regexes::default();
        assert!(!regexes.is_match("(", "("));
        assert_eq!(regexes.replace_all("(", "text", "x"), "text");
        assert_eq!(regexes.find("(", "text", 0), "");
        assert!(regexes.get("(").is_none());
    }

    #[test]
    fn test_replace_all_with_groups() {
        let regexes = Regexes::default();
        assert_eq!(regexes.replace_all("a", "banana", "o"), "bonono");
        assert_eq!(
            regexes.replace_all(r"(\w+)@(\w+)", "me@host", "$2:$1"),
            "host:me"
        );
    }

    #[test]
    fn test_find() {
        let regexes = Regexes::default();
        assert_eq!(regexes.find(r"v(\d+)\.(\d+)", "git v2.43", 0), "v2.43");
        assert_eq!(regexes.find(r"v(\d+)\.(\d+)", "git v2.43", 2), "43");
        assert_eq!(regexes.find(r"v(\d+)", "git v2", 5), "");
        assert_eq!(regexes.find(r"x", "abc", 0), "");
    }

    #[test]
    fn test_compiled_once() {
        let regexes = Regexes::default();
        let first = regexes.get("^a+$").unwrap();
        let second = regexes.get("^a+$").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
