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

//! Expression AST node definitions

use super::operator::{BinaryOperator, UnaryOperator};
use crate::model::Value;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// AST representation of an expression
///
/// Each node owns its children; a tree is never mutated after the parser
/// builds it. Large variants are boxed to keep the enum small.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExpressionNode {
    /// Literal value (null, boolean, number, string)
    Literal(LiteralValue),

    /// Reference to a binding by name
    Variable(String),

    /// Prefix operation
    UnaryOp {
        /// The operator
        op: UnaryOperator,
        /// The operand
        operand: Box<ExpressionNode>,
    },

    /// Binary operation (boxed for size optimization)
    BinaryOp(Box<BinaryOpData>),

    /// Ternary, short ternary or elvis conditional (boxed for size optimization)
    Conditional(Box<ConditionalData>),

    /// Null coalescing (left ?? right)
    Coalesce {
        /// Value returned unless it is null or missing
        left: Box<ExpressionNode>,
        /// Fallback
        right: Box<ExpressionNode>,
    },

    /// Call of a registered function (boxed for size optimization)
    FunctionCall(Box<FunctionCallData>),

    /// Index access (base\[index\])
    ArrayAccess {
        /// Base expression
        base: Box<ExpressionNode>,
        /// Index expression
        index: Box<ExpressionNode>,
    },

    /// Member access (base.member or base?.member)
    ObjectAccess {
        /// Base expression
        base: Box<ExpressionNode>,
        /// Member name
        member: String,
        /// `?.` form: a null base ends the access chain with null
        null_safe: bool,
    },

    /// Array literal (\[a, b\])
    ArrayLiteral(Vec<ExpressionNode>),

    /// Map literal ({key: value})
    MapLiteral(Vec<MapEntry>),
}

/// Binary operation data (separate struct to optimize enum size)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryOpData {
    /// The operator
    pub op: BinaryOperator,
    /// Left operand
    pub left: ExpressionNode,
    /// Right operand
    pub right: ExpressionNode,
}

/// Conditional expression data
///
/// `c ? a : b` has both branches. `c ?: b` has no then branch and yields the
/// condition value when truthy. `c ? a` has no else branch and yields null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalData {
    /// Condition
    pub condition: ExpressionNode,
    /// Then branch
    pub then_expr: Option<ExpressionNode>,
    /// Else branch
    pub else_expr: Option<ExpressionNode>,
}

/// Function call data (separate struct to optimize enum size)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallData {
    /// Function name
    pub name: String,
    /// Function arguments (SmallVec for common case of 1-4 args)
    pub args: SmallVec<[ExpressionNode; 4]>,
}

/// One `key: value` pair of a map literal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapEntry {
    /// Key expression; bare identifiers and numbers are parsed as string literals
    pub key: ExpressionNode,
    /// Value expression
    pub value: ExpressionNode,
}

/// Literal values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LiteralValue {
    /// null
    Null,
    /// true / false
    Boolean(bool),
    /// Integer literal
    Integer(i64),
    /// Decimal or exponent literal, or an integer literal too large for i64
    Float(f64),
    /// String literal with escapes already processed
    String(String),
}

impl LiteralValue {
    /// Convert to a runtime value
    pub fn to_value(&self) -> Value {
        match self {
            LiteralValue::Null => Value::Null,
            LiteralValue::Boolean(b) => Value::Boolean(*b),
            LiteralValue::Integer(i) => Value::Integer(*i),
            LiteralValue::Float(f) => Value::Float(*f),
            LiteralValue::String(s) => Value::String(s.clone()),
        }
    }
}

/// Structural size of a tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Complexity {
    /// Total number of nodes
    pub nodes: usize,
    /// Length of the longest root-to-leaf path, counted in nodes
    pub depth: usize,
}

impl ExpressionNode {
    /// Create a literal expression
    pub fn literal(value: LiteralValue) -> Self {
        Self::Literal(value)
    }

    /// Create a variable reference
    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    /// Create a unary operation
    pub fn unary_op(op: UnaryOperator, operand: ExpressionNode) -> Self {
        Self::UnaryOp {
            op,
            operand: Box::new(operand),
        }
    }

    /// Create a binary operation
    pub fn binary_op(op: BinaryOperator, left: ExpressionNode, right: ExpressionNode) -> Self {
        Self::BinaryOp(Box::new(BinaryOpData { op, left, right }))
    }

    /// Create a conditional expression
    pub fn conditional(
        condition: ExpressionNode,
        then_expr: Option<ExpressionNode>,
        else_expr: Option<ExpressionNode>,
    ) -> Self {
        Self::Conditional(Box::new(ConditionalData {
            condition,
            then_expr,
            else_expr,
        }))
    }

    /// Create a null coalescing expression
    pub fn coalesce(left: ExpressionNode, right: ExpressionNode) -> Self {
        Self::Coalesce {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Create a function call expression
    pub fn function_call(
        name: impl Into<String>,
        args: impl Into<SmallVec<[ExpressionNode; 4]>>,
    ) -> Self {
        Self::FunctionCall(Box::new(FunctionCallData {
            name: name.into(),
            args: args.into(),
        }))
    }

    /// Create an index access expression
    pub fn array_access(base: ExpressionNode, index: ExpressionNode) -> Self {
        Self::ArrayAccess {
            base: Box::new(base),
            index: Box::new(index),
        }
    }

    /// Create a member access expression
    pub fn object_access(base: ExpressionNode, member: impl Into<String>, null_safe: bool) -> Self {
        Self::ObjectAccess {
            base: Box::new(base),
            member: member.into(),
            null_safe,
        }
    }

    /// Direct children in evaluation order
    pub fn children(&self) -> SmallVec<[&ExpressionNode; 4]> {
        let mut children = SmallVec::new();
        match self {
            Self::Literal(_) | Self::Variable(_) => {}
            Self::UnaryOp { operand, .. } => children.push(operand.as_ref()),
            Self::BinaryOp(data) => {
                children.push(&data.left);
                children.push(&data.right);
            }
            Self::Conditional(data) => {
                children.push(&data.condition);
                children.extend(data.then_expr.iter());
                children.extend(data.else_expr.iter());
            }
            Self::Coalesce { left, right } => {
                children.push(left.as_ref());
                children.push(right.as_ref());
            }
            Self::FunctionCall(data) => children.extend(data.args.iter()),
            Self::ArrayAccess { base, index } => {
                children.push(base.as_ref());
                children.push(index.as_ref());
            }
            Self::ObjectAccess { base, .. } => children.push(base.as_ref()),
            Self::ArrayLiteral(items) => children.extend(items.iter()),
            Self::MapLiteral(entries) => {
                for entry in entries {
                    children.push(&entry.key);
                    children.push(&entry.value);
                }
            }
        }
        children
    }

    /// Measure node count and depth without recursion, so arbitrarily deep
    /// trees can be measured safely
    pub fn complexity(&self) -> Complexity {
        let mut nodes = 0;
        let mut depth = 0;
        let mut stack = vec![(self, 1usize)];

        while let Some((node, level)) = stack.pop() {
            nodes += 1;
            depth = depth.max(level);
            stack.extend(node.children().into_iter().map(|child| (child, level + 1)));
        }

        Complexity { nodes, depth }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complexity() {
        let leaf = ExpressionNode::literal(LiteralValue::Integer(1));
        assert_eq!(leaf.complexity(), Complexity { nodes: 1, depth: 1 });

        // (1 + 1) * -x
        let tree = ExpressionNode::binary_op(
            BinaryOperator::Multiply,
            ExpressionNode::binary_op(BinaryOperator::Add, leaf.clone(), leaf.clone()),
            ExpressionNode::unary_op(UnaryOperator::Negate, ExpressionNode::variable("x")),
        );
        assert_eq!(tree.complexity(), Complexity { nodes: 6, depth: 3 });
    }

    #[test]
    fn test_children_order() {
        let node = ExpressionNode::conditional(
            ExpressionNode::variable("c"),
            None,
            Some(ExpressionNode::variable("e")),
        );
        let names: Vec<_> = node
            .children()
            .into_iter()
            .map(|child| match child {
                ExpressionNode::Variable(name) => name.as_str(),
                _ => "",
            })
            .collect();
        assert_eq!(names, vec!["c", "e"]);
    }

    #[test]
    fn test_literal_to_value() {
        assert_eq!(LiteralValue::Null.to_value(), Value::Null);
        assert_eq!(
            LiteralValue::String("s".to_string()).to_value(),
            Value::from("s")
        );
    }
}
