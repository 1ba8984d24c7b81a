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

//! String case functions: lower(), upper()

use crate::error::{ExpressionError, Result};
use crate::model::Value;
use crate::registry::function::ExpressionFunction;
use crate::registry::signature::{FunctionSignature, ParameterInfo};
use once_cell::sync::Lazy;

fn map_string(name: &str, value: &Value, f: fn(&str) -> String) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(f(s))),
        Value::Null => Ok(Value::Null),
        other => Err(ExpressionError::type_mismatch("string", other.type_name(), name)),
    }
}

/// lower() function - lowercase a string
pub struct LowerFunction;

impl ExpressionFunction for LowerFunction {
    fn name(&self) -> &str {
        "lower"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: Lazy<FunctionSignature> =
            Lazy::new(|| FunctionSignature::new("lower", vec![ParameterInfo::required("text")]));
        &SIG
    }

    fn documentation(&self) -> &str {
        "Returns the string converted to lowercase. Null stays null."
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        self.validate_args(args.len())?;
        map_string(self.name(), &args[0], str::to_lowercase)
    }
}

/// upper() function - uppercase a string
pub struct UpperFunction;

impl ExpressionFunction for UpperFunction {
    fn name(&self) -> &str {
        "upper"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: Lazy<FunctionSignature> =
            Lazy::new(|| FunctionSignature::new("upper", vec![ParameterInfo::required("text")]));
        &SIG
    }

    fn documentation(&self) -> &str {
        "Returns the string converted to uppercase. Null stays null."
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        self.validate_args(args.len())?;
        map_string(self.name(), &args[0], str::to_uppercase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_conversion() {
        assert_eq!(LowerFunction.evaluate(&["HeLLo".into()]).unwrap(), Value::from("hello"));
        assert_eq!(UpperFunction.evaluate(&["straße".into()]).unwrap(), Value::from("STRASSE"));
        assert_eq!(UpperFunction.evaluate(&[Value::Null]).unwrap(), Value::Null);
        assert!(LowerFunction.evaluate(&[Value::Integer(1)]).is_err());
    }
}
