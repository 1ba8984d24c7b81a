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

//! count() function - number of elements

use crate::error::Result;
use crate::model::Value;
use crate::registry::function::ExpressionFunction;
use crate::registry::signature::{FunctionSignature, ParameterInfo};
use once_cell::sync::Lazy;

/// count() function - returns the number of elements in a sequence or map
pub struct CountFunction;

impl ExpressionFunction for CountFunction {
    fn name(&self) -> &str {
        "count"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: Lazy<FunctionSignature> =
            Lazy::new(|| FunctionSignature::new("count", vec![ParameterInfo::required("value")]));
        &SIG
    }

    fn documentation(&self) -> &str {
        "Returns the number of items in a sequence or entries in a map. Null counts as 0 and any other single value as 1."
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        self.validate_args(args.len())?;
        let count = match &args[0] {
            Value::Array(items) => items.len(),
            Value::Map(map) => map.len(),
            Value::Null => 0,
            _ => 1,
        };
        Ok(Value::Integer(count as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(json!([1, 2, 3]), 3)]
    #[case(json!({"a": 1, "b": 2}), 2)]
    #[case(json!([]), 0)]
    #[case(json!(null), 0)]
    #[case(json!("text"), 1)]
    fn test_count(#[case] input: serde_json::Value, #[case] expected: i64) {
        assert_eq!(
            CountFunction.evaluate(&[input.into()]).unwrap(),
            Value::Integer(expected)
        );
    }
}
