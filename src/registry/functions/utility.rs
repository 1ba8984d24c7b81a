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

//! array_get() function - safe nested access by dotted path

use crate::error::{ExpressionError, Result};
use crate::model::Value;
use crate::registry::function::ExpressionFunction;
use crate::registry::signature::{FunctionSignature, ParameterInfo};
use once_cell::sync::Lazy;

/// array_get(target, path, default = null)
///
/// Walks `target` along a dot separated `path`. Map segments are looked up
/// by key, sequence segments must be non-negative integer indices. Whenever a
/// segment cannot be resolved the default is returned instead of an error.
/// A null path returns the target itself, and a map key equal to the whole
/// path wins over the dotted walk.
pub struct ArrayGetFunction;

impl ExpressionFunction for ArrayGetFunction {
    fn name(&self) -> &str {
        "array_get"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: Lazy<FunctionSignature> = Lazy::new(|| {
            FunctionSignature::new(
                "array_get",
                vec![
                    ParameterInfo::required("target"),
                    ParameterInfo::required("path"),
                    ParameterInfo::optional("default"),
                ],
            )
        });
        &SIG
    }

    fn documentation(&self) -> &str {
        "Returns the value found by following a dotted path into nested maps and sequences, or the default (null unless given) when any segment is missing."
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        self.validate_args(args.len())?;
        let target = &args[0];
        let default = args.get(2).cloned().unwrap_or_default();

        let path = match &args[1] {
            Value::Null => return Ok(target.clone()),
            Value::String(path) => path.clone(),
            Value::Integer(index) => index.to_string(),
            other => {
                return Err(ExpressionError::type_mismatch(
                    "string path",
                    other.type_name(),
                    "array_get",
                ));
            }
        };

        if let Some(value) = target.as_map().and_then(|map| map.get(&path)) {
            return Ok(value.clone());
        }

        Ok(resolve_path(target, &path).cloned().unwrap_or(default))
    }
}

fn resolve_path<'a>(target: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(target, |current, segment| match current {
        Value::Map(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn call(args: Vec<Value>) -> Result<Value> {
        ArrayGetFunction.evaluate(&args)
    }

    #[test]
    fn test_nested_path() {
        let data = Value::from(json!({"a": {"b": [10, {"c": "deep"}]}}));
        assert_eq!(call(vec![data.clone(), "a.b.0".into()]).unwrap(), Value::Integer(10));
        assert_eq!(call(vec![data, "a.b.1.c".into()]).unwrap(), Value::from("deep"));
    }

    #[test]
    fn test_missing_returns_default() {
        let data = Value::from(json!({"a": {"b": 1}}));
        assert_eq!(call(vec![data.clone(), "a.x.y".into()]).unwrap(), Value::Null);
        assert_eq!(
            call(vec![data.clone(), "a.b.c".into(), "fallback".into()]).unwrap(),
            Value::from("fallback")
        );
        assert_eq!(call(vec![Value::Null, "missing.path".into()]).unwrap(), Value::Null);
        assert_eq!(call(vec![json!([1, 2]).into(), "5".into(), 0.into()]).unwrap(), Value::Integer(0));
    }

    #[test]
    fn test_literal_key_and_null_path() {
        let data = Value::from(json!({"a.b": 1, "a": {"b": 2}}));
        assert_eq!(call(vec![data.clone(), "a.b".into()]).unwrap(), Value::Integer(1));
        assert_eq!(call(vec![data.clone(), Value::Null]).unwrap(), data);
        assert_eq!(call(vec![json!(["x", "y"]).into(), 1.into()]).unwrap(), Value::from("y"));
    }

    #[test]
    fn test_invalid_path_type() {
        let err = call(vec![Value::Null, Value::Boolean(true)]).unwrap_err();
        assert!(matches!(err, ExpressionError::TypeMismatch { .. }));
    }
}
