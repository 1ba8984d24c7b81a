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

//! Visitor pattern for AST traversal

use super::expression::{ExpressionNode, LiteralValue, MapEntry};
use super::operator::{BinaryOperator, UnaryOperator};
use indexmap::IndexSet;

/// Trait for visiting AST nodes
///
/// Every method defaults to walking the children, so implementors only
/// override the node kinds they care about.
pub trait Visitor: Sized {
    /// Visit an expression node
    fn visit_expression(&mut self, expr: &ExpressionNode) {
        walk_expression(self, expr)
    }

    /// Visit a literal expression
    fn visit_literal(&mut self, _literal: &LiteralValue) {}

    /// Visit a variable reference
    fn visit_variable(&mut self, _name: &str) {}

    /// Visit a unary operation
    fn visit_unary_op(&mut self, _op: UnaryOperator, operand: &ExpressionNode) {
        self.visit_expression(operand);
    }

    /// Visit a binary operation
    fn visit_binary_op(
        &mut self,
        _op: BinaryOperator,
        left: &ExpressionNode,
        right: &ExpressionNode,
    ) {
        self.visit_expression(left);
        self.visit_expression(right);
    }

    /// Visit a conditional expression
    fn visit_conditional(
        &mut self,
        condition: &ExpressionNode,
        then_expr: Option<&ExpressionNode>,
        else_expr: Option<&ExpressionNode>,
    ) {
        self.visit_expression(condition);
        if let Some(then_expr) = then_expr {
            self.visit_expression(then_expr);
        }
        if let Some(else_expr) = else_expr {
            self.visit_expression(else_expr);
        }
    }

    /// Visit a null coalescing expression
    fn visit_coalesce(&mut self, left: &ExpressionNode, right: &ExpressionNode) {
        self.visit_expression(left);
        self.visit_expression(right);
    }

    /// Visit a function call
    fn visit_function_call(&mut self, _name: &str, args: &[ExpressionNode]) {
        for arg in args {
            self.visit_expression(arg);
        }
    }

    /// Visit an index access
    fn visit_array_access(&mut self, base: &ExpressionNode, index: &ExpressionNode) {
        self.visit_expression(base);
        self.visit_expression(index);
    }

    /// Visit a member access
    fn visit_object_access(&mut self, base: &ExpressionNode, _member: &str, _null_safe: bool) {
        self.visit_expression(base);
    }

    /// Visit an array literal
    fn visit_array_literal(&mut self, items: &[ExpressionNode]) {
        for item in items {
            self.visit_expression(item);
        }
    }

    /// Visit a map literal
    fn visit_map_literal(&mut self, entries: &[MapEntry]) {
        for entry in entries {
            self.visit_expression(&entry.key);
            self.visit_expression(&entry.value);
        }
    }
}

/// Default implementation of walking an expression tree
pub fn walk_expression<V: Visitor>(visitor: &mut V, expr: &ExpressionNode) {
    match expr {
        ExpressionNode::Literal(lit) => visitor.visit_literal(lit),
        ExpressionNode::Variable(name) => visitor.visit_variable(name),
        ExpressionNode::UnaryOp { op, operand } => visitor.visit_unary_op(*op, operand),
        ExpressionNode::BinaryOp(data) => visitor.visit_binary_op(data.op, &data.left, &data.right),
        ExpressionNode::Conditional(data) => visitor.visit_conditional(
            &data.condition,
            data.then_expr.as_ref(),
            data.else_expr.as_ref(),
        ),
        ExpressionNode::Coalesce { left, right } => visitor.visit_coalesce(left, right),
        ExpressionNode::FunctionCall(data) => visitor.visit_function_call(&data.name, &data.args),
        ExpressionNode::ArrayAccess { base, index } => visitor.visit_array_access(base, index),
        ExpressionNode::ObjectAccess {
            base,
            member,
            null_safe,
        } => visitor.visit_object_access(base, member, *null_safe),
        ExpressionNode::ArrayLiteral(items) => visitor.visit_array_literal(items),
        ExpressionNode::MapLiteral(entries) => visitor.visit_map_literal(entries),
    }
}

/// Collects the variable and function names an expression references,
/// in order of first appearance
#[derive(Debug, Default)]
pub struct NameCollector {
    /// Referenced variables
    pub variables: IndexSet<String>,
    /// Called functions
    pub functions: IndexSet<String>,
}

impl NameCollector {
    /// Collect the names referenced by `expr`
    pub fn collect(expr: &ExpressionNode) -> Self {
        let mut collector = Self::default();
        collector.visit_expression(expr);
        collector
    }
}

impl Visitor for NameCollector {
    fn visit_variable(&mut self, name: &str) {
        if !self.variables.contains(name) {
            self.variables.insert(name.to_string());
        }
    }

    fn visit_function_call(&mut self, name: &str, args: &[ExpressionNode]) {
        if !self.functions.contains(name) {
            self.functions.insert(name.to_string());
        }
        for arg in args {
            self.visit_expression(arg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_collector() {
        // count(items) + x * count(x)
        let expr = ExpressionNode::binary_op(
            BinaryOperator::Add,
            ExpressionNode::function_call("count", vec![ExpressionNode::variable("items")]),
            ExpressionNode::binary_op(
                BinaryOperator::Multiply,
                ExpressionNode::variable("x"),
                ExpressionNode::function_call("count", vec![ExpressionNode::variable("x")]),
            ),
        );

        let names = NameCollector::collect(&expr);
        assert_eq!(
            names.variables.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["items", "x"]
        );
        assert_eq!(
            names.functions.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["count"]
        );
    }

    #[test]
    fn test_member_names_are_not_variables() {
        let expr = ExpressionNode::object_access(ExpressionNode::variable("user"), "age", false);
        let names = NameCollector::collect(&expr);
        assert_eq!(names.variables.len(), 1);
        assert!(names.variables.contains("user"));
    }
}
