// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Compiled pattern cache for the `matches` operator

use crate::error::{ExpressionError, Result};
use lru::LruCache;
use parking_lot::Mutex;
use regex::Regex;
use std::num::NonZeroUsize;

/// Bounded cache of compiled regular expressions keyed by pattern source
///
/// Patterns may be bare (`^a+$`) or delimited with flags (`/^a+$/i`). The
/// flags `i`, `m`, `s` and `x` are supported.
#[derive(Debug)]
pub struct PatternCache {
    cache: Mutex<LruCache<String, Regex>>,
}

impl PatternCache {
    /// Create a cache holding up to `capacity` patterns (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Get the compiled form of `pattern`, compiling on first use
    pub fn get_or_compile(&self, pattern: &str) -> Result<Regex> {
        if let Some(regex) = self.cache.lock().get(pattern) {
            return Ok(regex.clone());
        }

        let regex = compile(pattern)?;
        self.cache.lock().put(pattern.to_string(), regex.clone());
        Ok(regex)
    }

    /// Test whether `subject` contains a match of `pattern`
    pub fn is_match(&self, subject: &str, pattern: &str) -> Result<bool> {
        Ok(self.get_or_compile(pattern)?.is_match(subject))
    }

    /// Number of compiled patterns currently held
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Check whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }
}

impl Default for PatternCache {
    fn default() -> Self {
        Self::new(64)
    }
}

fn invalid(pattern: &str, message: impl Into<String>) -> ExpressionError {
    ExpressionError::InvalidPattern {
        pattern: pattern.to_string(),
        message: message.into(),
    }
}

/// Translate `/body/flags` into inline flag syntax and compile
fn compile(pattern: &str) -> Result<Regex> {
    let source = match split_delimited(pattern) {
        Some((body, "")) => body.to_string(),
        Some((body, flags)) => {
            if let Some(flag) = flags.chars().find(|c| !"imsx".contains(*c)) {
                return Err(invalid(pattern, format!("unsupported flag '{flag}'")));
            }
            format!("(?{flags}){body}")
        }
        None => pattern.to_string(),
    };

    Regex::new(&source).map_err(|err| invalid(pattern, err.to_string()))
}

fn split_delimited(pattern: &str) -> Option<(&str, &str)> {
    let rest = pattern.strip_prefix('/')?;
    let end = rest.rfind('/')?;
    Some((&rest[..end], &rest[end + 1..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_and_delimited_patterns() {
        let cache = PatternCache::default();
        assert!(cache.is_match("hello world", "wor").unwrap());
        assert!(cache.is_match("Hello", "/^hello$/i").unwrap());
        assert!(!cache.is_match("Hello", "/^hello$/").unwrap());
        assert!(cache.is_match("a\nb", "/^b$/m").unwrap());
        assert!(cache.is_match("a/b", "/a/b/").unwrap());
    }

    #[test]
    fn test_invalid_patterns() {
        let cache = PatternCache::default();
        assert!(matches!(
            cache.is_match("x", "(").unwrap_err(),
            ExpressionError::InvalidPattern { .. }
        ));
        let err = cache.is_match("x", "/x/q").unwrap_err();
        assert_eq!(
            err,
            ExpressionError::InvalidPattern {
                pattern: "/x/q".to_string(),
                message: "unsupported flag 'q'".to_string(),
            }
        );
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_is_bounded() {
        let cache = PatternCache::new(2);
        for pattern in ["a", "b", "c"] {
            cache.get_or_compile(pattern).unwrap();
        }
        assert_eq!(cache.len(), 2);
        assert_eq!(PatternCache::new(0).cache.lock().cap().get(), 1);
    }
}
