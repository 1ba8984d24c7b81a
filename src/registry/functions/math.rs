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

//! Numeric functions: abs(), min(), max()

use crate::error::{ExpressionError, Result};
use crate::model::{Number, Value};
use crate::registry::function::ExpressionFunction;
use crate::registry::signature::{FunctionSignature, ParameterInfo};
use once_cell::sync::Lazy;
use std::cmp::Ordering;

/// abs() function - absolute value
pub struct AbsFunction;

impl ExpressionFunction for AbsFunction {
    fn name(&self) -> &str {
        "abs"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: Lazy<FunctionSignature> =
            Lazy::new(|| FunctionSignature::new("abs", vec![ParameterInfo::required("number")]));
        &SIG
    }

    fn documentation(&self) -> &str {
        "Returns the absolute value of a number. Numeric strings and booleans are coerced first."
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        self.validate_args(args.len())?;
        let number = args[0]
            .to_number()
            .ok_or_else(|| ExpressionError::type_mismatch("number", args[0].type_name(), "abs"))?;

        Ok(match number {
            Number::Integer(i) => i
                .checked_abs()
                .map_or(Value::Float((i as f64).abs()), Value::Integer),
            Number::Float(f) => Value::Float(f.abs()),
        })
    }
}

/// min() function - smallest of its arguments
///
/// A single sequence argument is treated as the list of candidates.
pub struct MinFunction;

impl ExpressionFunction for MinFunction {
    fn name(&self) -> &str {
        "min"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: Lazy<FunctionSignature> =
            Lazy::new(|| FunctionSignature::variadic("min", vec![ParameterInfo::required("value")]));
        &SIG
    }

    fn documentation(&self) -> &str {
        "Returns the smallest argument, or the smallest element when called with a single sequence."
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        self.validate_args(args.len())?;
        extremum(self.name(), args, Ordering::Less)
    }
}

/// max() function - largest of its arguments
///
/// A single sequence argument is treated as the list of candidates.
pub struct MaxFunction;

impl ExpressionFunction for MaxFunction {
    fn name(&self) -> &str {
        "max"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: Lazy<FunctionSignature> =
            Lazy::new(|| FunctionSignature::variadic("max", vec![ParameterInfo::required("value")]));
        &SIG
    }

    fn documentation(&self) -> &str {
        "Returns the largest argument, or the largest element when called with a single sequence."
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        self.validate_args(args.len())?;
        extremum(self.name(), args, Ordering::Greater)
    }
}

/// Pick the first candidate that no later candidate beats in direction `wanted`
fn extremum(name: &str, args: &[Value], wanted: Ordering) -> Result<Value> {
    let candidates = match args {
        [Value::Array(items)] => items.as_slice(),
        _ => args,
    };

    let (first, rest) = candidates
        .split_first()
        .ok_or_else(|| ExpressionError::function(name, "requires at least one value"))?;

    let mut best = first;
    for candidate in rest {
        let ordering = candidate.compare(best).ok_or_else(|| {
            ExpressionError::type_mismatch(best.ordering_name(), candidate.ordering_name(), name)
        })?;
        if ordering == wanted {
            best = candidate;
        }
    }
    Ok(best.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_abs() {
        assert_eq!(AbsFunction.evaluate(&[Value::Integer(-5)]).unwrap(), Value::Integer(5));
        assert_eq!(AbsFunction.evaluate(&[Value::Float(-2.5)]).unwrap(), Value::Float(2.5));
        assert_eq!(AbsFunction.evaluate(&["-3".into()]).unwrap(), Value::Integer(3));
        assert_eq!(
            AbsFunction.evaluate(&[Value::Integer(i64::MIN)]).unwrap(),
            Value::Float(9_223_372_036_854_775_808.0)
        );
        assert!(matches!(
            AbsFunction.evaluate(&[Value::Null]).unwrap_err(),
            ExpressionError::TypeMismatch { .. }
        ));
    }

    #[test]
    fn test_min_max_arguments() {
        let args = [Value::Integer(3), Value::Float(1.5), Value::Integer(7)];
        assert_eq!(MinFunction.evaluate(&args).unwrap(), Value::Float(1.5));
        assert_eq!(MaxFunction.evaluate(&args).unwrap(), Value::Integer(7));
    }

    #[test]
    fn test_min_max_single_sequence() {
        let list = Value::from(json!(["pear", "apple", "zucchini"]));
        assert_eq!(MinFunction.evaluate(&[list.clone()]).unwrap(), Value::from("apple"));
        assert_eq!(MaxFunction.evaluate(&[list]).unwrap(), Value::from("zucchini"));
    }

    #[test]
    fn test_min_errors() {
        assert!(matches!(
            MinFunction.evaluate(&[Value::Array(vec![])]).unwrap_err(),
            ExpressionError::Function { .. }
        ));
        assert!(matches!(
            MinFunction.evaluate(&[Value::Integer(1), "a".into()]).unwrap_err(),
            ExpressionError::TypeMismatch { .. }
        ));
        assert!(matches!(
            MaxFunction.evaluate(&[]).unwrap_err(),
            ExpressionError::ArityMismatch { .. }
        ));
    }
}
