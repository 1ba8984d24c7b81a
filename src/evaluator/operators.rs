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

//! Operator semantics over [`Value`]
//!
//! Logical operators, `matches` and `??` need lazy operands or engine state
//! and live in the evaluator; everything here works on already evaluated
//! operands.

use crate::ast::{BinaryOperator, UnaryOperator};
use crate::error::{ExpressionError, Result};
use crate::model::{Number, Value};
use std::cmp::Ordering;

fn operator_context(op: impl std::fmt::Display) -> String {
    format!("operator '{op}'")
}

fn numeric_operand(op: BinaryOperator, value: &Value) -> Result<Number> {
    value
        .to_number()
        .ok_or_else(|| ExpressionError::type_mismatch("number", value.type_name(), operator_context(op)))
}

/// Apply an arithmetic operator (`+ - * / % **`)
pub fn arithmetic(op: BinaryOperator, left: &Value, right: &Value) -> Result<Value> {
    let lhs = numeric_operand(op, left)?;
    let rhs = numeric_operand(op, right)?;

    if matches!(op, BinaryOperator::Divide | BinaryOperator::Modulo) && rhs.is_zero() {
        return Err(ExpressionError::DivisionByZero);
    }

    let result = match (lhs, rhs) {
        (Number::Integer(a), Number::Integer(b)) => integer_arithmetic(op, a, b),
        _ => float_arithmetic(op, lhs.as_f64(), rhs.as_f64()),
    };
    Ok(result)
}

fn integer_arithmetic(op: BinaryOperator, a: i64, b: i64) -> Value {
    let checked = match op {
        BinaryOperator::Add => a.checked_add(b),
        BinaryOperator::Subtract => a.checked_sub(b),
        BinaryOperator::Multiply => a.checked_mul(b),
        // checked_rem also covers i64::MIN / -1, which promotes to float
        BinaryOperator::Divide if a.checked_rem(b) == Some(0) => a.checked_div(b),
        BinaryOperator::Divide => None,
        // i64::MIN % -1 overflows but is mathematically zero
        BinaryOperator::Modulo => Some(a.checked_rem(b).unwrap_or(0)),
        BinaryOperator::Power => u32::try_from(b).ok().and_then(|exp| a.checked_pow(exp)),
        _ => None,
    };

    match checked {
        Some(value) => Value::Integer(value),
        None => float_arithmetic(op, a as f64, b as f64),
    }
}

fn float_arithmetic(op: BinaryOperator, a: f64, b: f64) -> Value {
    let value = match op {
        BinaryOperator::Add => a + b,
        BinaryOperator::Subtract => a - b,
        BinaryOperator::Multiply => a * b,
        BinaryOperator::Divide => a / b,
        BinaryOperator::Modulo => a % b,
        BinaryOperator::Power => a.powf(b),
        _ => f64::NAN,
    };
    Value::Float(value)
}

/// String concatenation (`~`); null concatenates as the empty string
pub fn concatenate(left: &Value, right: &Value) -> Result<Value> {
    let context = || operator_context(BinaryOperator::Concatenate);
    let mut text = left
        .to_concat_string()
        .ok_or_else(|| ExpressionError::type_mismatch("scalar", left.type_name(), context()))?;
    let tail = right
        .to_concat_string()
        .ok_or_else(|| ExpressionError::type_mismatch("scalar", right.type_name(), context()))?;
    text.push_str(&tail);
    Ok(Value::String(text))
}

/// Equality family (`== != === !==`); never fails
pub fn equality(op: BinaryOperator, left: &Value, right: &Value) -> Value {
    let result = match op {
        BinaryOperator::Equal => left.loose_eq(right),
        BinaryOperator::NotEqual => !left.loose_eq(right),
        BinaryOperator::Identical => left == right,
        BinaryOperator::NotIdentical => left != right,
        _ => false,
    };
    Value::Boolean(result)
}

/// Relational comparison (`< <= > >=`) between values of the same kind
pub fn compare(op: BinaryOperator, left: &Value, right: &Value) -> Result<Value> {
    let ordering = left.compare(right).ok_or_else(|| {
        ExpressionError::type_mismatch(left.ordering_name(), right.ordering_name(), operator_context(op))
    })?;

    let result = match op {
        BinaryOperator::LessThan => ordering == Ordering::Less,
        BinaryOperator::LessThanOrEqual => ordering != Ordering::Greater,
        BinaryOperator::GreaterThan => ordering == Ordering::Greater,
        BinaryOperator::GreaterThanOrEqual => ordering != Ordering::Less,
        _ => false,
    };
    Ok(Value::Boolean(result))
}

/// Membership (`in` / `not in`): element of a sequence or key of a map
pub fn membership(op: BinaryOperator, needle: &Value, haystack: &Value) -> Result<Value> {
    let found = match haystack {
        Value::Array(items) => items.iter().any(|item| item.loose_eq(needle)),
        Value::Map(map) => match needle {
            Value::String(key) => map.contains_key(key),
            Value::Integer(_) | Value::Float(_) | Value::Boolean(_) => needle
                .to_concat_string()
                .is_some_and(|key| map.contains_key(&key)),
            _ => false,
        },
        other => {
            return Err(ExpressionError::type_mismatch(
                "array or map",
                other.type_name(),
                operator_context(op),
            ));
        }
    };

    Ok(Value::Boolean(if op == BinaryOperator::NotIn {
        !found
    } else {
        found
    }))
}

/// Apply a unary operator
pub fn unary(op: UnaryOperator, operand: &Value) -> Result<Value> {
    match op {
        UnaryOperator::Not => Ok(Value::Boolean(!operand.is_truthy())),
        UnaryOperator::Negate => match number_for_unary(op, operand)? {
            Number::Integer(i) => Ok(i
                .checked_neg()
                .map_or(Value::Float(-(i as f64)), Value::Integer)),
            Number::Float(f) => Ok(Value::Float(-f)),
        },
        UnaryOperator::Positive => Ok(number_for_unary(op, operand)?.into()),
        UnaryOperator::BitwiseNot => operand
            .to_integer()
            .map(|i| Value::Integer(!i))
            .ok_or_else(|| {
                ExpressionError::type_mismatch("integer", operand.type_name(), operator_context(op))
            }),
    }
}

fn number_for_unary(op: UnaryOperator, operand: &Value) -> Result<Number> {
    operand
        .to_number()
        .ok_or_else(|| ExpressionError::type_mismatch("number", operand.type_name(), operator_context(op)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    use BinaryOperator::*;

    #[rstest]
    #[case(Add, Value::Integer(2), Value::Integer(3), Value::Integer(5))]
    #[case(Add, Value::Integer(2), Value::Float(0.5), Value::Float(2.5))]
    #[case(Subtract, Value::from("10"), Value::Boolean(true), Value::Integer(9))]
    #[case(Divide, Value::Integer(6), Value::Integer(3), Value::Integer(2))]
    #[case(Divide, Value::Integer(7), Value::Integer(2), Value::Float(3.5))]
    #[case(Modulo, Value::Integer(7), Value::Integer(3), Value::Integer(1))]
    #[case(Modulo, Value::Float(7.5), Value::Integer(2), Value::Float(1.5))]
    #[case(Power, Value::Integer(2), Value::Integer(10), Value::Integer(1024))]
    #[case(Power, Value::Integer(2), Value::Integer(-1), Value::Float(0.5))]
    #[case(Add, Value::Integer(i64::MAX), Value::Integer(1), Value::Float(i64::MAX as f64 + 1.0))]
    #[case(Divide, Value::Integer(i64::MIN), Value::Integer(-1), Value::Float(9.223372036854775808e18))]
    #[case(Modulo, Value::Integer(i64::MIN), Value::Integer(-1), Value::Integer(0))]
    fn test_arithmetic(
        #[case] op: BinaryOperator,
        #[case] left: Value,
        #[case] right: Value,
        #[case] expected: Value,
    ) {
        assert_eq!(arithmetic(op, &left, &right).unwrap(), expected);
    }

    #[test]
    fn test_division_by_zero() {
        for (left, right) in [
            (Value::Integer(1), Value::Integer(0)),
            (Value::Float(1.0), Value::Float(0.0)),
        ] {
            assert_eq!(arithmetic(Divide, &left, &right).unwrap_err(), ExpressionError::DivisionByZero);
            assert_eq!(arithmetic(Modulo, &left, &right).unwrap_err(), ExpressionError::DivisionByZero);
        }
    }

    #[test]
    fn test_arithmetic_type_mismatch() {
        let err = arithmetic(Add, &Value::Integer(1), &Value::from(json!([1]))).unwrap_err();
        assert_eq!(
            err,
            ExpressionError::type_mismatch("number", "array", "operator '+'")
        );
        assert!(arithmetic(Multiply, &Value::Null, &Value::Integer(1)).is_err());
    }

    #[test]
    fn test_concatenate() {
        assert_eq!(
            concatenate(&Value::from("a"), &Value::Integer(1)).unwrap(),
            Value::from("a1")
        );
        assert_eq!(concatenate(&Value::Null, &Value::from("x")).unwrap(), Value::from("x"));
        assert!(concatenate(&Value::from("a"), &Value::from(json!({}))).is_err());
    }

    #[test]
    fn test_equality() {
        assert_eq!(equality(Equal, &Value::Integer(1), &Value::Float(1.0)), Value::Boolean(true));
        assert_eq!(equality(Identical, &Value::Integer(1), &Value::Float(1.0)), Value::Boolean(false));
        assert_eq!(equality(NotEqual, &Value::from("1"), &Value::Integer(1)), Value::Boolean(true));
        assert_eq!(
            equality(Equal, &Value::from(json!({"a": [1, 2]})), &Value::from(json!({"a": [1.0, 2]}))),
            Value::Boolean(true)
        );
    }

    #[test]
    fn test_compare() {
        assert_eq!(compare(LessThan, &Value::Integer(1), &Value::Float(1.5)).unwrap(), Value::Boolean(true));
        assert_eq!(compare(GreaterThanOrEqual, &Value::from("b"), &Value::from("a")).unwrap(), Value::Boolean(true));
        assert_eq!(compare(LessThanOrEqual, &Value::Null, &Value::Null).unwrap(), Value::Boolean(true));
        assert_eq!(
            compare(LessThan, &Value::from("a"), &Value::from(json!({}))).unwrap_err(),
            ExpressionError::type_mismatch("string", "map", "operator '<'")
        );
    }

    #[test]
    fn test_compare_agrees_with_equality_on_signed_zero_and_nan() {
        let (neg_zero, zero) = (Value::Float(-0.0), Value::Float(0.0));
        assert_eq!(equality(Equal, &neg_zero, &zero), Value::Boolean(true));
        assert_eq!(compare(LessThan, &neg_zero, &zero).unwrap(), Value::Boolean(false));
        assert_eq!(compare(GreaterThan, &Value::Integer(0), &neg_zero).unwrap(), Value::Boolean(false));
        assert_eq!(compare(GreaterThanOrEqual, &Value::Integer(0), &neg_zero).unwrap(), Value::Boolean(true));

        let nan = Value::Float(f64::NAN);
        assert_eq!(equality(Equal, &nan, &nan), Value::Boolean(false));
        assert_eq!(
            compare(LessThanOrEqual, &nan, &nan).unwrap_err(),
            ExpressionError::type_mismatch("NaN", "NaN", "operator '<='")
        );
        assert_eq!(
            compare(GreaterThan, &Value::Integer(1), &nan).unwrap_err(),
            ExpressionError::type_mismatch("integer", "NaN", "operator '>'")
        );
    }

    #[test]
    fn test_membership() {
        let list = Value::from(json!([1, "two"]));
        let map = Value::from(json!({"key": 1, "2": true}));
        assert_eq!(membership(In, &Value::Float(1.0), &list).unwrap(), Value::Boolean(true));
        assert_eq!(membership(NotIn, &Value::from("two"), &list).unwrap(), Value::Boolean(false));
        assert_eq!(membership(In, &Value::from("key"), &map).unwrap(), Value::Boolean(true));
        assert_eq!(membership(In, &Value::Integer(2), &map).unwrap(), Value::Boolean(true));
        assert!(membership(In, &Value::Integer(1), &Value::from("123")).is_err());
    }

    #[test]
    fn test_unary() {
        assert_eq!(unary(UnaryOperator::Not, &Value::from("")).unwrap(), Value::Boolean(true));
        assert_eq!(unary(UnaryOperator::Negate, &Value::Integer(5)).unwrap(), Value::Integer(-5));
        assert_eq!(unary(UnaryOperator::Positive, &Value::from("2.5")).unwrap(), Value::Float(2.5));
        assert_eq!(unary(UnaryOperator::BitwiseNot, &Value::Integer(0)).unwrap(), Value::Integer(-1));
        assert!(unary(UnaryOperator::BitwiseNot, &Value::Float(1.5)).is_err());
        assert!(unary(UnaryOperator::Negate, &Value::Null).is_err());
    }
}
