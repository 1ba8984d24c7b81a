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

//! Tree-walking evaluator
//!
//! Operands are evaluated left to right. `&&`, `||`, the conditional family
//! and `??` only evaluate the operands they need. On the left of `??` every
//! member or index access on null yields null, as if each step were `?.`.
//! Variable and member
//! lookups borrow from the bindings until a value has to be produced, so a
//! path like `order.customer.name` copies only the final string.

use super::operators;
use super::patterns::PatternCache;
use crate::ast::{BinaryOpData, BinaryOperator, ConditionalData, ExpressionNode, FunctionCallData, MapEntry};
use crate::error::{ExpressionError, Result};
use crate::model::{Bindings, Value, ValueMap};
use crate::registry::FunctionRegistry;
use smallvec::SmallVec;
use std::borrow::Cow;

/// Default bound on evaluation recursion
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Evaluates expression trees against one set of bindings
///
/// An evaluator is cheap to build and borrows everything it needs; build one
/// per evaluation call.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    registry: &'a FunctionRegistry,
    patterns: &'a PatternCache,
    bindings: &'a Bindings,
    max_depth: usize,
}

impl<'a> Evaluator<'a> {
    /// Create an evaluator over the given registry, pattern cache and bindings
    pub fn new(
        registry: &'a FunctionRegistry,
        patterns: &'a PatternCache,
        bindings: &'a Bindings,
    ) -> Self {
        Self {
            registry,
            patterns,
            bindings,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Set the maximum evaluation depth
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Evaluate an expression to a value
    pub fn evaluate(&self, expr: &ExpressionNode) -> Result<Value> {
        self.eval(expr, 1)
    }

    fn enter(&self, depth: usize) -> Result<usize> {
        if depth > self.max_depth {
            Err(ExpressionError::ExpressionTooComplex {
                what: "nesting depth",
                limit: self.max_depth,
            })
        } else {
            Ok(depth + 1)
        }
    }

    fn eval(&self, expr: &ExpressionNode, depth: usize) -> Result<Value> {
        let next = self.enter(depth)?;

        match expr {
            ExpressionNode::Literal(literal) => Ok(literal.to_value()),

            ExpressionNode::Variable(_)
            | ExpressionNode::ObjectAccess { .. }
            | ExpressionNode::ArrayAccess { .. } => Ok(self
                .resolve(expr, depth, false)?
                .map_or(Value::Null, Cow::into_owned)),

            ExpressionNode::UnaryOp { op, operand } => {
                let value = self.eval(operand, next)?;
                operators::unary(*op, &value)
            }

            ExpressionNode::BinaryOp(data) => self.eval_binary(data, next),

            ExpressionNode::Conditional(data) => self.eval_conditional(data, next),

            ExpressionNode::Coalesce { left, right } => {
                match self.eval_fallback_candidate(left, next) {
                    Ok(Value::Null) => self.eval(right, next),
                    Ok(value) => Ok(value),
                    Err(err) if err.is_missing_value() => self.eval(right, next),
                    Err(err) => Err(err),
                }
            }

            ExpressionNode::FunctionCall(call) => self.eval_function_call(call, next),

            ExpressionNode::ArrayLiteral(items) => items
                .iter()
                .map(|item| self.eval(item, next))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),

            ExpressionNode::MapLiteral(entries) => self.eval_map_literal(entries, next),
        }
    }

    /// Left operand of `??`: access chains treat a null base as absent
    fn eval_fallback_candidate(&self, expr: &ExpressionNode, depth: usize) -> Result<Value> {
        match expr {
            ExpressionNode::Variable(_)
            | ExpressionNode::ObjectAccess { .. }
            | ExpressionNode::ArrayAccess { .. } => Ok(self
                .resolve(expr, depth, true)?
                .map_or(Value::Null, Cow::into_owned)),
            other => self.eval(other, depth),
        }
    }

    /// Resolve a variable or access chain without copying intermediate
    /// containers. `None` means a null-safe access met null and the rest of
    /// the chain was skipped. With `lenient` every access is null-safe.
    fn resolve(
        &self,
        expr: &ExpressionNode,
        depth: usize,
        lenient: bool,
    ) -> Result<Option<Cow<'a, Value>>> {
        let next = self.enter(depth)?;

        match expr {
            ExpressionNode::Variable(name) => self
                .bindings
                .get(name)
                .map(|value| Some(Cow::Borrowed(value)))
                .ok_or_else(|| ExpressionError::UndefinedVariable { name: name.clone() }),

            ExpressionNode::ObjectAccess {
                base,
                member,
                null_safe,
            } => {
                let Some(base) = self.resolve(base, next, lenient)? else {
                    return Ok(None);
                };
                if (*null_safe || lenient) && base.is_null() {
                    return Ok(None);
                }
                project(base, |value| member_of(value, member)).map(Some)
            }

            ExpressionNode::ArrayAccess { base, index } => {
                let Some(base) = self.resolve(base, next, lenient)? else {
                    return Ok(None);
                };
                if lenient && base.is_null() {
                    return Ok(None);
                }
                let index = self.eval(index, next)?;
                project(base, |value| element_of(value, &index)).map(Some)
            }

            other => self.eval(other, depth).map(|value| Some(Cow::Owned(value))),
        }
    }

    fn eval_binary(&self, data: &BinaryOpData, depth: usize) -> Result<Value> {
        let op = data.op;

        match op {
            BinaryOperator::And => {
                let result = self.eval(&data.left, depth)?.is_truthy()
                    && self.eval(&data.right, depth)?.is_truthy();
                return Ok(Value::Boolean(result));
            }
            BinaryOperator::Or => {
                let result = self.eval(&data.left, depth)?.is_truthy()
                    || self.eval(&data.right, depth)?.is_truthy();
                return Ok(Value::Boolean(result));
            }
            _ => {}
        }

        let left = self.eval(&data.left, depth)?;
        let right = self.eval(&data.right, depth)?;

        match op {
            op if op.is_arithmetic() => operators::arithmetic(op, &left, &right),
            BinaryOperator::Concatenate => operators::concatenate(&left, &right),
            BinaryOperator::Equal
            | BinaryOperator::NotEqual
            | BinaryOperator::Identical
            | BinaryOperator::NotIdentical => Ok(operators::equality(op, &left, &right)),
            BinaryOperator::In | BinaryOperator::NotIn => {
                operators::membership(op, &left, &right)
            }
            BinaryOperator::Matches => self.eval_matches(&left, &right),
            _ => operators::compare(op, &left, &right),
        }
    }

    fn eval_matches(&self, subject: &Value, pattern: &Value) -> Result<Value> {
        match (subject, pattern) {
            (Value::String(subject), Value::String(pattern)) => {
                Ok(Value::Boolean(self.patterns.is_match(subject, pattern)?))
            }
            (Value::String(_), other) | (other, _) => Err(ExpressionError::type_mismatch(
                "string",
                other.type_name(),
                "operator 'matches'",
            )),
        }
    }

    fn eval_conditional(&self, data: &ConditionalData, depth: usize) -> Result<Value> {
        let condition = self.eval(&data.condition, depth)?;

        match (&data.then_expr, &data.else_expr) {
            // a ?: b
            (None, Some(fallback)) => {
                if condition.is_truthy() {
                    Ok(condition)
                } else {
                    self.eval(fallback, depth)
                }
            }
            (Some(then_expr), else_expr) => {
                if condition.is_truthy() {
                    self.eval(then_expr, depth)
                } else {
                    else_expr
                        .as_ref()
                        .map_or(Ok(Value::Null), |else_expr| self.eval(else_expr, depth))
                }
            }
            (None, None) => Ok(Value::Null),
        }
    }

    fn eval_function_call(&self, call: &FunctionCallData, depth: usize) -> Result<Value> {
        let function = self
            .registry
            .get(&call.name)
            .ok_or_else(|| ExpressionError::UndefinedFunction {
                name: call.name.clone(),
            })?;
        function.validate_args(call.args.len())?;

        let args = call
            .args
            .iter()
            .map(|arg| self.eval(arg, depth))
            .collect::<Result<SmallVec<[Value; 4]>>>()?;

        function.evaluate(&args)
    }

    fn eval_map_literal(&self, entries: &[MapEntry], depth: usize) -> Result<Value> {
        let mut map = ValueMap::with_capacity(entries.len());
        for entry in entries {
            let key = match self.eval(&entry.key, depth)? {
                Value::String(key) => key,
                key @ (Value::Integer(_) | Value::Float(_) | Value::Boolean(_)) => key.to_string(),
                other => {
                    return Err(ExpressionError::type_mismatch(
                        "string key",
                        other.type_name(),
                        "map literal",
                    ));
                }
            };
            let value = self.eval(&entry.value, depth)?;
            map.insert(key, value);
        }
        Ok(Value::Map(map))
    }
}

/// Apply a borrowing lookup to a possibly owned container
fn project<'v>(
    base: Cow<'v, Value>,
    lookup: impl for<'x> Fn(&'x Value) -> Result<&'x Value>,
) -> Result<Cow<'v, Value>> {
    match base {
        Cow::Borrowed(value) => lookup(value).map(Cow::Borrowed),
        Cow::Owned(value) => lookup(&value).map(|found| Cow::Owned(found.clone())),
    }
}

fn member_of<'x>(value: &'x Value, member: &str) -> Result<&'x Value> {
    match value {
        Value::Map(map) => map.get(member).ok_or_else(|| ExpressionError::KeyNotFound {
            key: member.to_string(),
        }),
        other => Err(ExpressionError::type_mismatch(
            "map",
            other.type_name(),
            format!("member access '.{member}'"),
        )),
    }
}

fn element_of<'x>(value: &'x Value, index: &Value) -> Result<&'x Value> {
    match value {
        Value::Array(items) => {
            let position = index.to_integer().ok_or_else(|| {
                ExpressionError::type_mismatch("integer index", index.type_name(), "index access")
            })?;
            usize::try_from(position)
                .ok()
                .and_then(|i| items.get(i))
                .ok_or(ExpressionError::IndexOutOfBounds {
                    index: position,
                    len: items.len(),
                })
        }
        Value::Map(map) => {
            let key = match index {
                Value::String(key) => Cow::Borrowed(key.as_str()),
                Value::Integer(_) | Value::Float(_) | Value::Boolean(_) => {
                    Cow::Owned(index.to_string())
                }
                other => {
                    return Err(ExpressionError::type_mismatch(
                        "string key",
                        other.type_name(),
                        "index access",
                    ));
                }
            };
            map.get(key.as_ref()).ok_or_else(|| ExpressionError::KeyNotFound {
                key: key.into_owned(),
            })
        }
        other => Err(ExpressionError::type_mismatch(
            "array or map",
            other.type_name(),
            "index access",
        )),
    }
}
