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

//! Engine configuration options
//!
//! Configuration is a plain value handed to the engine at construction. It can
//! be built in code, taken from one of the presets, or read from JSON where
//! every field is optional:
//!
//! ```json
//! { "max_depth": 64, "cache": { "max_entries": 500, "entry_ttl_secs": 60 } }
//! ```

use crate::parser::ParseLimits;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the parse cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AstCacheConfig {
    /// Whether parsed expressions are cached at all
    pub enabled: bool,

    /// Maximum number of cached expressions
    pub max_entries: usize,

    /// Optional lifetime of a cache entry (None = never expire)
    #[serde(rename = "entry_ttl_secs", with = "ttl_seconds")]
    pub entry_ttl: Option<Duration>,
}

impl AstCacheConfig {
    /// Create a configuration optimized for high performance
    pub fn high_performance() -> Self {
        Self {
            enabled: true,
            max_entries: 10_000,
            entry_ttl: None, // No expiration
        }
    }

    /// Create a configuration optimized for low memory usage
    pub fn low_memory() -> Self {
        Self {
            enabled: true,
            max_entries: 100,
            entry_ttl: Some(Duration::from_secs(300)), // 5 minute TTL
        }
    }

    /// Create a configuration with caching disabled
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            max_entries: 0,
            entry_ttl: None,
        }
    }

    /// Create a configuration for testing
    pub fn testing() -> Self {
        Self {
            enabled: true,
            max_entries: 100,
            entry_ttl: Some(Duration::from_millis(100)), // Very short TTL for tests
        }
    }
}

impl Default for AstCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 1_000,
            entry_ttl: Some(Duration::from_secs(3600)), // 1 hour
        }
    }
}

/// Configuration for an expression engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum nesting depth of an expression tree
    pub max_depth: usize,

    /// Maximum number of nodes in an expression tree
    pub max_nodes: usize,

    /// Parse cache settings
    pub cache: AstCacheConfig,

    /// Number of compiled `matches` patterns kept per engine
    pub pattern_cache_size: usize,
}

impl EngineConfig {
    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Structural limits handed to the parser
    pub fn parse_limits(&self) -> ParseLimits {
        ParseLimits {
            max_depth: self.max_depth,
            max_nodes: self.max_nodes,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        let limits = ParseLimits::default();
        Self {
            max_depth: limits.max_depth,
            max_nodes: limits.max_nodes,
            cache: AstCacheConfig::default(),
            pattern_cache_size: 64,
        }
    }
}

/// `Option<Duration>` as fractional seconds
mod ttl_seconds {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(ttl: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match ttl {
            Some(ttl) => serializer.serialize_some(&ttl.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        let secs = Option::<f64>::deserialize(deserializer)?;
        secs.map(|secs| {
            Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_default() {
        let config = EngineConfig::default();
        assert_eq!(config.max_depth, 128);
        assert_eq!(config.max_nodes, 10_000);
        assert_eq!(config.pattern_cache_size, 64);
        assert!(config.cache.enabled);
        assert_eq!(config.cache.max_entries, 1_000);
        assert_eq!(config.cache.entry_ttl, Some(Duration::from_secs(3600)));
    }

    #[test]
    fn test_cache_config_presets() {
        assert_eq!(AstCacheConfig::high_performance().entry_ttl, None);
        assert_eq!(AstCacheConfig::low_memory().max_entries, 100);
        assert!(!AstCacheConfig::disabled().enabled);
        assert_eq!(
            AstCacheConfig::testing().entry_ttl,
            Some(Duration::from_millis(100))
        );
    }

    #[test]
    fn test_from_json_partial() {
        let config =
            EngineConfig::from_json_str(r#"{"max_depth": 16, "cache": {"entry_ttl_secs": 1.5}}"#)
                .unwrap();
        assert_eq!(config.max_depth, 16);
        assert_eq!(config.max_nodes, 10_000);
        assert_eq!(config.cache.entry_ttl, Some(Duration::from_millis(1500)));
        assert_eq!(config.cache.max_entries, 1_000);

        let config = EngineConfig::from_json_str(r#"{"cache": {"entry_ttl_secs": null}}"#).unwrap();
        assert_eq!(config.cache.entry_ttl, None);

        assert!(EngineConfig::from_json_str(r#"{"cache": {"entry_ttl_secs": -1}}"#).is_err());
        assert!(EngineConfig::from_json_str("[]").is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = EngineConfig {
            cache: AstCacheConfig::low_memory(),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(EngineConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_parse_limits() {
        let config = EngineConfig {
            max_depth: 3,
            max_nodes: 7,
            ..Default::default()
        };
        assert_eq!(
            config.parse_limits(),
            ParseLimits {
                max_depth: 3,
                max_nodes: 7
            }
        );
    }
}
