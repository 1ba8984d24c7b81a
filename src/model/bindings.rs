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

//! Binding environment: the named values an expression can reference

use super::value::Value;
use crate::error::{ExpressionError, Result};
use rustc_hash::FxHashMap;
use serde_json::Value as JsonValue;

/// Named values supplied to a single evaluation. Evaluation only reads them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    values: FxHashMap<String, Value>,
}

impl Bindings {
    /// Create an empty binding environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding, builder style
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Add or replace a binding, returning the previous value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(name.into(), value.into())
    }

    /// Look up a binding
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Check whether a name is bound
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if there are no bindings
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over the bound names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Build bindings from a JSON object; every top-level key becomes a name
    pub fn from_json(json: JsonValue) -> Result<Self> {
        match json {
            JsonValue::Object(entries) => Ok(entries
                .into_iter()
                .map(|(name, value)| (name, Value::from(value)))
                .collect()),
            JsonValue::Null => Ok(Self::new()),
            other => Err(ExpressionError::type_mismatch(
                "object",
                Value::from(other).type_name(),
                "bindings",
            )),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_and_lookup() {
        let bindings = Bindings::new().with("a", 1).with("b", "two");

        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings.get("a"), Some(&Value::Integer(1)));
        assert!(bindings.contains("b"));
        assert!(bindings.get("c").is_none());
    }

    #[test]
    fn test_from_json() {
        let bindings = Bindings::from_json(json!({"user": {"age": 30}})).unwrap();
        assert_eq!(
            bindings.get("user"),
            Some(&Value::from(json!({"age": 30})))
        );

        assert!(Bindings::from_json(JsonValue::Null).unwrap().is_empty());

        let err = Bindings::from_json(json!([1, 2])).unwrap_err();
        assert!(matches!(err, ExpressionError::TypeMismatch { .. }));
    }
}
