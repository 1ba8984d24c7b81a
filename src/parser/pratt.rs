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

//! Pratt parser for expressions
//!
//! ### Precedence Levels (lowest to highest):
//! - **Conditional** (1): `c ? a : b`, `c ? a`, `a ?: b`, `a ?? b` (right-associative)
//! - **Or** (2): `||`, `or`
//! - **And** (3): `&&`, `and`
//! - **Equality** (4): `==`, `!=`, `===`, `!==`
//! - **Relational** (5): `<`, `<=`, `>`, `>=`, `in`, `not in`, `matches`
//! - **Additive** (6): `+`, `-`, `~`
//! - **Multiplicative** (7): `*`, `/`, `%`
//! - **Power** (8): `**` (right-associative)
//! - **Unary** (9): `!`, `not`, `-`, `+`, `~`
//! - **Postfix** (10): `.`, `?.`, `[]`, function call
//!
//! Parsing is bounded: tree depth, parser recursion and node count are all
//! checked while the tree is built, so oversized input is rejected before a
//! deep tree exists.

use super::ParseResult;
use super::lexer::TokenStream;
use super::span::Spanned;
use super::tokenizer::{Token, tokenize};
use crate::ast::{BinaryOperator, ExpressionNode, LiteralValue, MapEntry, UnaryOperator};
use crate::error::ExpressionError;
use smallvec::SmallVec;

/// Operator precedence levels (higher = tighter binding)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    /// Lowest precedence - conditional family (right associative)
    Conditional = 1,
    /// Logical OR
    Or = 2,
    /// Logical AND
    And = 3,
    /// Equality and identity
    Equality = 4,
    /// Ordering, membership and pattern matching
    Relational = 5,
    /// Additive operators and concatenation
    Additive = 6,
    /// Multiplicative operators
    Multiplicative = 7,
    /// Exponentiation (right associative)
    Power = 8,
    /// Prefix operators
    Unary = 9,
    /// Member access, indexing and calls
    Postfix = 10,
}

impl Precedence {
    /// Get the next higher precedence level for left-associative operators
    #[inline(always)]
    pub const fn next_level(self) -> Self {
        match self {
            Precedence::Conditional => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Relational,
            Precedence::Relational => Precedence::Additive,
            Precedence::Additive => Precedence::Multiplicative,
            Precedence::Multiplicative => Precedence::Power,
            Precedence::Power => Precedence::Unary,
            Precedence::Unary => Precedence::Postfix,
            Precedence::Postfix => Precedence::Postfix, // Already highest
        }
    }

    /// Check if this precedence is right associative
    #[inline(always)]
    pub const fn is_right_associative(self) -> bool {
        matches!(self, Precedence::Conditional | Precedence::Power)
    }
}

/// Structural limits enforced while parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseLimits {
    /// Maximum nesting depth of the tree (and of the source grouping)
    pub max_depth: usize,
    /// Maximum total number of nodes
    pub max_nodes: usize,
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self {
            max_depth: 128,
            max_nodes: 10_000,
        }
    }
}

impl ParseLimits {
    /// Reject a tree that exceeds these limits. The measurement is
    /// iterative, so it is safe on trees built by hand.
    pub fn check(&self, expr: &ExpressionNode) -> ParseResult<()> {
        let complexity = expr.complexity();
        if complexity.nodes > self.max_nodes {
            return Err(ExpressionError::ExpressionTooComplex {
                what: "node count",
                limit: self.max_nodes,
            });
        }
        if complexity.depth > self.max_depth {
            return Err(ExpressionError::ExpressionTooComplex {
                what: "nesting depth",
                limit: self.max_depth,
            });
        }
        Ok(())
    }
}

/// Binary operator for the token(s) at the head of the stream, with its
/// precedence and the number of tokens it spans
#[inline(always)]
fn binary_operator(tokens: &TokenStream<'_>) -> Option<(BinaryOperator, Precedence, usize)> {
    let op = match tokens.peek().value {
        Token::Or => (BinaryOperator::Or, Precedence::Or, 1),
        Token::And => (BinaryOperator::And, Precedence::And, 1),

        Token::Equal => (BinaryOperator::Equal, Precedence::Equality, 1),
        Token::NotEqual => (BinaryOperator::NotEqual, Precedence::Equality, 1),
        Token::Identical => (BinaryOperator::Identical, Precedence::Equality, 1),
        Token::NotIdentical => (BinaryOperator::NotIdentical, Precedence::Equality, 1),

        Token::LessThan => (BinaryOperator::LessThan, Precedence::Relational, 1),
        Token::LessThanOrEqual => (BinaryOperator::LessThanOrEqual, Precedence::Relational, 1),
        Token::GreaterThan => (BinaryOperator::GreaterThan, Precedence::Relational, 1),
        Token::GreaterThanOrEqual => {
            (BinaryOperator::GreaterThanOrEqual, Precedence::Relational, 1)
        }
        Token::In => (BinaryOperator::In, Precedence::Relational, 1),
        Token::Not if tokens.peek_ahead(1).value == Token::In => {
            (BinaryOperator::NotIn, Precedence::Relational, 2)
        }
        Token::Matches => (BinaryOperator::Matches, Precedence::Relational, 1),

        Token::Plus => (BinaryOperator::Add, Precedence::Additive, 1),
        Token::Minus => (BinaryOperator::Subtract, Precedence::Additive, 1),
        Token::Tilde => (BinaryOperator::Concatenate, Precedence::Additive, 1),

        Token::Multiply => (BinaryOperator::Multiply, Precedence::Multiplicative, 1),
        Token::Divide => (BinaryOperator::Divide, Precedence::Multiplicative, 1),
        Token::Modulo => (BinaryOperator::Modulo, Precedence::Multiplicative, 1),

        Token::Power => (BinaryOperator::Power, Precedence::Power, 1),

        _ => return None,
    };
    Some(op)
}

#[inline(always)]
fn unary_operator(token: &Token<'_>) -> Option<UnaryOperator> {
    match token {
        Token::Not => Some(UnaryOperator::Not),
        Token::Minus => Some(UnaryOperator::Negate),
        Token::Plus => Some(UnaryOperator::Positive),
        Token::Tilde => Some(UnaryOperator::BitwiseNot),
        _ => None,
    }
}

/// Reserved words that are still valid member names and map keys
fn keyword_name(token: &Token<'_>) -> Option<&'static str> {
    match token {
        Token::True => Some("true"),
        Token::False => Some("false"),
        Token::Null => Some("null"),
        Token::In => Some("in"),
        Token::Matches => Some("matches"),
        _ => None,
    }
}

/// A parsed subtree together with its depth
type Parsed = (ExpressionNode, usize);

/// Pratt parser over a token stream
pub struct PrattParser<'input> {
    tokens: TokenStream<'input>,
    limits: ParseLimits,
    /// Current recursion depth; parentheses count even though they build no node
    depth: usize,
    nodes: usize,
}

impl<'input> PrattParser<'input> {
    /// Create a parser over already tokenized input
    pub fn new(tokens: Vec<Spanned<Token<'input>>>, limits: ParseLimits) -> Self {
        Self {
            tokens: TokenStream::new(tokens),
            limits,
            depth: 0,
            nodes: 0,
        }
    }

    /// Parse a complete expression; trailing tokens are an error
    pub fn parse(mut self) -> ParseResult<ExpressionNode> {
        let (expr, _) = self.parse_expression(Precedence::Conditional)?;

        let trailing = self.tokens.peek();
        if trailing.value != Token::Eof {
            return Err(ExpressionError::syntax(
                trailing.start,
                "end of input",
                trailing.value.describe(),
            ));
        }

        Ok(expr)
    }

    /// Count a newly built node against the node budget and check its depth
    #[inline(always)]
    fn node(&mut self, node: ExpressionNode, depth: usize) -> ParseResult<Parsed> {
        self.nodes += 1;
        if self.nodes > self.limits.max_nodes {
            return Err(ExpressionError::ExpressionTooComplex {
                what: "node count",
                limit: self.limits.max_nodes,
            });
        }
        if depth > self.limits.max_depth {
            return Err(self.too_deep());
        }
        Ok((node, depth))
    }

    fn too_deep(&self) -> ExpressionError {
        ExpressionError::ExpressionTooComplex {
            what: "nesting depth",
            limit: self.limits.max_depth,
        }
    }

    /// Syntax error at the current token
    fn unexpected(&self, expected: &str) -> ExpressionError {
        let found = self.tokens.peek();
        ExpressionError::syntax(found.start, expected, found.value.describe())
    }

    /// Consume a closing delimiter. A missing delimiter at end of input is
    /// reported at the position of the opening one.
    fn expect_closing(&mut self, closing: &Token<'_>, opening: usize) -> ParseResult<()> {
        if self.tokens.check(closing) {
            self.tokens.next();
            return Ok(());
        }
        let found = self.tokens.peek();
        let position = if found.value == Token::Eof {
            opening
        } else {
            found.start
        };
        Err(ExpressionError::syntax(
            position,
            closing.describe(),
            found.value.describe(),
        ))
    }

    /// Core Pratt parsing algorithm
    fn parse_expression(&mut self, min_precedence: Precedence) -> ParseResult<Parsed> {
        self.depth += 1;
        if self.depth > self.limits.max_depth {
            return Err(self.too_deep());
        }

        let result = self.parse_expression_inner(min_precedence);
        self.depth -= 1;
        result
    }

    fn parse_expression_inner(&mut self, min_precedence: Precedence) -> ParseResult<Parsed> {
        let (mut left, mut left_depth) = self.parse_unary()?;

        loop {
            if min_precedence == Precedence::Conditional {
                match self.tokens.peek().value {
                    Token::Question => {
                        self.tokens.next();
                        (left, left_depth) = self.parse_ternary(left, left_depth)?;
                        continue;
                    }
                    Token::Elvis => {
                        self.tokens.next();
                        let (fallback, fallback_depth) =
                            self.parse_expression(Precedence::Conditional)?;
                        (left, left_depth) = self.node(
                            ExpressionNode::conditional(left, None, Some(fallback)),
                            left_depth.max(fallback_depth) + 1,
                        )?;
                        continue;
                    }
                    Token::Coalesce => {
                        self.tokens.next();
                        let (fallback, fallback_depth) =
                            self.parse_expression(Precedence::Conditional)?;
                        (left, left_depth) = self.node(
                            ExpressionNode::coalesce(left, fallback),
                            left_depth.max(fallback_depth) + 1,
                        )?;
                        continue;
                    }
                    _ => {}
                }
            }

            let (op, precedence, width) = match binary_operator(&self.tokens) {
                Some(found) if found.1 >= min_precedence => found,
                _ => break,
            };
            for _ in 0..width {
                self.tokens.next();
            }

            let next_min = if precedence.is_right_associative() {
                precedence
            } else {
                precedence.next_level()
            };
            let (right, right_depth) = self.parse_expression(next_min)?;
            (left, left_depth) = self.node(
                ExpressionNode::binary_op(op, left, right),
                left_depth.max(right_depth) + 1,
            )?;
        }

        Ok((left, left_depth))
    }

    /// Both ternary forms, after the `?` has been consumed
    fn parse_ternary(&mut self, condition: ExpressionNode, condition_depth: usize) -> ParseResult<Parsed> {
        let (then_expr, then_depth) = self.parse_expression(Precedence::Conditional)?;
        let mut depth = condition_depth.max(then_depth);

        let else_expr = if self.tokens.consume_if(|t| *t == Token::Colon).is_some() {
            let (else_expr, else_depth) = self.parse_expression(Precedence::Conditional)?;
            depth = depth.max(else_depth);
            Some(else_expr)
        } else {
            None
        };

        self.node(
            ExpressionNode::conditional(condition, Some(then_expr), else_expr),
            depth + 1,
        )
    }

    /// Prefix operators bind tighter than every binary operator
    fn parse_unary(&mut self) -> ParseResult<Parsed> {
        if let Some(op) = unary_operator(&self.tokens.peek().value) {
            self.tokens.next();
            let (operand, depth) = self.parse_expression(Precedence::Unary)?;
            return self.node(ExpressionNode::unary_op(op, operand), depth + 1);
        }

        let primary = self.parse_primary()?;
        self.parse_postfix(primary)
    }

    /// Parse primary expression (literals, identifiers, groups, collections)
    fn parse_primary(&mut self) -> ParseResult<Parsed> {
        let token = self.tokens.peek().clone();

        let node = match token.value {
            Token::Integer(i) => ExpressionNode::literal(LiteralValue::Integer(i)),
            Token::Float(f) => ExpressionNode::literal(LiteralValue::Float(f)),
            Token::String(s) => ExpressionNode::literal(LiteralValue::String(s.into_owned())),
            Token::True => ExpressionNode::literal(LiteralValue::Boolean(true)),
            Token::False => ExpressionNode::literal(LiteralValue::Boolean(false)),
            Token::Null => ExpressionNode::literal(LiteralValue::Null),

            Token::Identifier(name) => {
                self.tokens.next();
                return if self.tokens.check(&Token::LeftParen) {
                    self.parse_function_call(name)
                } else {
                    self.node(ExpressionNode::variable(name), 1)
                };
            }

            Token::LeftParen => {
                self.tokens.next();
                let parsed = self.parse_expression(Precedence::Conditional)?;
                self.expect_closing(&Token::RightParen, token.start)?;
                return Ok(parsed);
            }

            Token::LeftBracket => {
                self.tokens.next();
                return self.parse_array_literal(token.start);
            }

            Token::LeftBrace => {
                self.tokens.next();
                return self.parse_map_literal(token.start);
            }

            _ => return Err(self.unexpected("expression")),
        };

        self.tokens.next();
        self.node(node, 1)
    }

    /// Parse function call arguments after the function name
    fn parse_function_call(&mut self, name: &str) -> ParseResult<Parsed> {
        let open = self.tokens.next();
        let mut args: SmallVec<[ExpressionNode; 4]> = SmallVec::new();
        let mut depth = 0;

        if self.tokens.consume_if(|t| *t == Token::RightParen).is_none() {
            loop {
                let (arg, arg_depth) = self.parse_expression(Precedence::Conditional)?;
                args.push(arg);
                depth = depth.max(arg_depth);

                match self.tokens.peek().value {
                    Token::Comma => {
                        self.tokens.next();
                    }
                    Token::RightParen => {
                        self.tokens.next();
                        break;
                    }
                    Token::Eof => {
                        return Err(ExpressionError::syntax(
                            open.start,
                            "')'",
                            "end of input",
                        ));
                    }
                    _ => return Err(self.unexpected("',' or ')'")),
                }
            }
        }

        self.node(ExpressionNode::function_call(name, args), depth + 1)
    }

    /// Parse `[a, b, ...]` after the opening bracket; a trailing comma is allowed
    fn parse_array_literal(&mut self, open: usize) -> ParseResult<Parsed> {
        let mut items = Vec::new();
        let mut depth = 0;

        while !self.tokens.check(&Token::RightBracket) {
            let (item, item_depth) = self.parse_expression(Precedence::Conditional)?;
            items.push(item);
            depth = depth.max(item_depth);
            if self.tokens.consume_if(|t| *t == Token::Comma).is_none() {
                break;
            }
        }

        self.expect_closing(&Token::RightBracket, open)?;
        self.node(ExpressionNode::ArrayLiteral(items), depth + 1)
    }

    /// Parse `{key: value, ...}` after the opening brace; a trailing comma is allowed
    fn parse_map_literal(&mut self, open: usize) -> ParseResult<Parsed> {
        let mut entries = Vec::new();
        let mut depth = 0;

        while !self.tokens.check(&Token::RightBrace) {
            let (key, key_depth) = self.parse_map_key()?;
            self.tokens.expect(&Token::Colon)?;
            let (value, value_depth) = self.parse_expression(Precedence::Conditional)?;
            entries.push(MapEntry { key, value });
            depth = depth.max(key_depth).max(value_depth);

            if self.tokens.consume_if(|t| *t == Token::Comma).is_none() {
                break;
            }
        }

        self.expect_closing(&Token::RightBrace, open)?;
        self.node(ExpressionNode::MapLiteral(entries), depth + 1)
    }

    /// Map keys: bare names, strings and numbers are literal keys, `(expr)`
    /// is a computed key
    fn parse_map_key(&mut self) -> ParseResult<Parsed> {
        let token = self.tokens.peek().clone();
        let key = match &token.value {
            Token::Identifier(name) => (*name).to_string(),
            Token::String(s) => s.to_string(),
            Token::Integer(i) => i.to_string(),
            Token::Float(f) => f.to_string(),
            Token::LeftParen => {
                self.tokens.next();
                let parsed = self.parse_expression(Precedence::Conditional)?;
                self.expect_closing(&Token::RightParen, token.start)?;
                return Ok(parsed);
            }
            other => match keyword_name(other) {
                Some(name) => name.to_string(),
                None => return Err(self.unexpected("map key")),
            },
        };

        self.tokens.next();
        self.node(ExpressionNode::literal(LiteralValue::String(key)), 1)
    }

    /// Parse postfix expressions (member access, indexing)
    fn parse_postfix(&mut self, (mut left, mut depth): Parsed) -> ParseResult<Parsed> {
        loop {
            match self.tokens.peek().value {
                Token::Dot | Token::NullSafeDot => {
                    let null_safe = self.tokens.next().value == Token::NullSafeDot;
                    let member = self.parse_member_name()?;
                    (left, depth) = self.node(
                        ExpressionNode::object_access(left, member, null_safe),
                        depth + 1,
                    )?;
                }
                Token::LeftBracket => {
                    let open = self.tokens.next();
                    let (index, index_depth) = self.parse_expression(Precedence::Conditional)?;
                    self.expect_closing(&Token::RightBracket, open.start)?;
                    (left, depth) = self.node(
                        ExpressionNode::array_access(left, index),
                        depth.max(index_depth) + 1,
                    )?;
                }
                _ => break,
            }
        }
        Ok((left, depth))
    }

    fn parse_member_name(&mut self) -> ParseResult<String> {
        let name = match &self.tokens.peek().value {
            Token::Identifier(name) => (*name).to_string(),
            other => match keyword_name(other) {
                Some(name) => name.to_string(),
                None => return Err(self.unexpected("member name")),
            },
        };
        self.tokens.next();
        Ok(name)
    }
}

/// Parse source text with the given limits
pub fn parse_with_limits(input: &str, limits: ParseLimits) -> ParseResult<ExpressionNode> {
    PrattParser::new(tokenize(input)?, limits).parse()
}

/// Parse an already tokenized expression
pub fn parse_tokens(
    tokens: &[Spanned<Token<'_>>],
    limits: ParseLimits,
) -> ParseResult<ExpressionNode> {
    PrattParser::new(tokens.to_vec(), limits).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(input: &str) -> ParseResult<ExpressionNode> {
        parse_with_limits(input, ParseLimits::default())
    }

    fn int(i: i64) -> ExpressionNode {
        ExpressionNode::literal(LiteralValue::Integer(i))
    }

    fn var(name: &str) -> ExpressionNode {
        ExpressionNode::variable(name)
    }

    fn bin(op: BinaryOperator, left: ExpressionNode, right: ExpressionNode) -> ExpressionNode {
        ExpressionNode::binary_op(op, left, right)
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            parse("1 + 2 * 3").unwrap(),
            bin(
                BinaryOperator::Add,
                int(1),
                bin(BinaryOperator::Multiply, int(2), int(3))
            )
        );
        assert_eq!(
            parse("(1 + 2) * 3").unwrap(),
            bin(
                BinaryOperator::Multiply,
                bin(BinaryOperator::Add, int(1), int(2)),
                int(3)
            )
        );
        assert_eq!(
            parse("a || b && c").unwrap(),
            bin(
                BinaryOperator::Or,
                var("a"),
                bin(BinaryOperator::And, var("b"), var("c"))
            )
        );
        assert_eq!(
            parse("a == b < c").unwrap(),
            bin(
                BinaryOperator::Equal,
                var("a"),
                bin(BinaryOperator::LessThan, var("b"), var("c"))
            )
        );
    }

    #[test]
    fn test_associativity() {
        assert_eq!(
            parse("1 - 2 - 3").unwrap(),
            bin(
                BinaryOperator::Subtract,
                bin(BinaryOperator::Subtract, int(1), int(2)),
                int(3)
            )
        );
        assert_eq!(
            parse("2 ** 3 ** 2").unwrap(),
            bin(
                BinaryOperator::Power,
                int(2),
                bin(BinaryOperator::Power, int(3), int(2))
            )
        );
    }

    #[test]
    fn test_unary_binds_tighter_than_power() {
        assert_eq!(
            parse("-2 ** 2").unwrap(),
            bin(
                BinaryOperator::Power,
                ExpressionNode::unary_op(UnaryOperator::Negate, int(2)),
                int(2)
            )
        );
        assert_eq!(
            parse("2 ** -1").unwrap(),
            bin(
                BinaryOperator::Power,
                int(2),
                ExpressionNode::unary_op(UnaryOperator::Negate, int(1))
            )
        );
        assert_eq!(
            parse("not a.b").unwrap(),
            ExpressionNode::unary_op(
                UnaryOperator::Not,
                ExpressionNode::object_access(var("a"), "b", false)
            )
        );
    }

    #[test]
    fn test_conditionals() {
        assert_eq!(
            parse("a ? 1 : b ? 2 : 3").unwrap(),
            ExpressionNode::conditional(
                var("a"),
                Some(int(1)),
                Some(ExpressionNode::conditional(var("b"), Some(int(2)), Some(int(3))))
            )
        );
        assert_eq!(
            parse("a ?: b").unwrap(),
            ExpressionNode::conditional(var("a"), None, Some(var("b")))
        );
        assert_eq!(
            parse("a ? b").unwrap(),
            ExpressionNode::conditional(var("a"), Some(var("b")), None)
        );
        assert_eq!(
            parse("a ?? b ?? c").unwrap(),
            ExpressionNode::coalesce(var("a"), ExpressionNode::coalesce(var("b"), var("c")))
        );
        assert_eq!(
            parse("a || b ? 1 : 2").unwrap(),
            ExpressionNode::conditional(
                bin(BinaryOperator::Or, var("a"), var("b")),
                Some(int(1)),
                Some(int(2))
            )
        );
    }

    #[test]
    fn test_postfix_chain() {
        assert_eq!(
            parse("a.b[0]?.c").unwrap(),
            ExpressionNode::object_access(
                ExpressionNode::array_access(
                    ExpressionNode::object_access(var("a"), "b", false),
                    int(0)
                ),
                "c",
                true
            )
        );
        assert_eq!(
            parse("a.in.null").unwrap(),
            ExpressionNode::object_access(
                ExpressionNode::object_access(var("a"), "in", false),
                "null",
                false
            )
        );
    }

    #[test]
    fn test_function_calls() {
        assert_eq!(
            parse("f()").unwrap(),
            ExpressionNode::function_call("f", Vec::new())
        );
        assert_eq!(
            parse("array_get(data, 'a.b', 1 + 1)").unwrap(),
            ExpressionNode::function_call(
                "array_get",
                vec![
                    var("data"),
                    ExpressionNode::literal(LiteralValue::String("a.b".to_string())),
                    bin(BinaryOperator::Add, int(1), int(1)),
                ]
            )
        );
    }

    #[test]
    fn test_word_operators() {
        assert_eq!(
            parse("a not in [1, 2]").unwrap(),
            bin(
                BinaryOperator::NotIn,
                var("a"),
                ExpressionNode::ArrayLiteral(vec![int(1), int(2)])
            )
        );
        assert_eq!(
            parse("a and not b or c").unwrap(),
            bin(
                BinaryOperator::Or,
                bin(
                    BinaryOperator::And,
                    var("a"),
                    ExpressionNode::unary_op(UnaryOperator::Not, var("b"))
                ),
                var("c")
            )
        );
        assert_eq!(
            parse("'a' ~ 'b' matches '/x/'").unwrap(),
            bin(
                BinaryOperator::Matches,
                bin(
                    BinaryOperator::Concatenate,
                    ExpressionNode::literal(LiteralValue::String("a".to_string())),
                    ExpressionNode::literal(LiteralValue::String("b".to_string()))
                ),
                ExpressionNode::literal(LiteralValue::String("/x/".to_string()))
            )
        );
    }

    #[test]
    fn test_collection_literals() {
        assert_eq!(
            parse("[1, 2,]").unwrap(),
            ExpressionNode::ArrayLiteral(vec![int(1), int(2)])
        );
        assert_eq!(parse("[]").unwrap(), ExpressionNode::ArrayLiteral(vec![]));

        let key = |k: &str| ExpressionNode::literal(LiteralValue::String(k.to_string()));
        assert_eq!(
            parse("{a: 1, 'b c': 2, 3: x, (k): 4}").unwrap(),
            ExpressionNode::MapLiteral(vec![
                MapEntry {
                    key: key("a"),
                    value: int(1)
                },
                MapEntry {
                    key: key("b c"),
                    value: int(2)
                },
                MapEntry {
                    key: key("3"),
                    value: var("x")
                },
                MapEntry {
                    key: var("k"),
                    value: int(4)
                },
            ])
        );
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(
            parse("(1 + 2").unwrap_err(),
            ExpressionError::syntax(0, "')'", "end of input")
        );
        assert_eq!(
            parse("f(1, 2").unwrap_err(),
            ExpressionError::syntax(1, "')'", "end of input")
        );
        assert_eq!(
            parse("a[1").unwrap_err(),
            ExpressionError::syntax(1, "']'", "end of input")
        );
        assert_eq!(
            parse("1 2").unwrap_err(),
            ExpressionError::syntax(2, "end of input", "'2'")
        );
        assert_eq!(
            parse("").unwrap_err(),
            ExpressionError::syntax(0, "expression", "end of input")
        );
        assert_eq!(
            parse("1 +").unwrap_err(),
            ExpressionError::syntax(3, "expression", "end of input")
        );
        assert_eq!(
            parse("a.(b)").unwrap_err(),
            ExpressionError::syntax(2, "member name", "'('")
        );
        // Calls are only allowed directly after a name
        assert!(matches!(
            parse("a.b(1)").unwrap_err(),
            ExpressionError::Syntax { position: 3, .. }
        ));
    }

    #[test]
    fn test_limits() {
        let limits = ParseLimits {
            max_depth: 8,
            max_nodes: 10_000,
        };
        let nested = format!("{}1{}", "(".repeat(20), ")".repeat(20));
        assert!(matches!(
            parse_with_limits(&nested, limits).unwrap_err(),
            ExpressionError::ExpressionTooComplex {
                what: "nesting depth",
                ..
            }
        ));

        let chain = vec!["1"; 20].join(" + ");
        assert!(matches!(
            parse_with_limits(&chain, limits).unwrap_err(),
            ExpressionError::ExpressionTooComplex {
                what: "nesting depth",
                ..
            }
        ));

        let limits = ParseLimits {
            max_depth: 128,
            max_nodes: 10,
        };
        let wide = format!("[{}]", vec!["1"; 20].join(", "));
        assert!(matches!(
            parse_with_limits(&wide, limits).unwrap_err(),
            ExpressionError::ExpressionTooComplex {
                what: "node count",
                ..
            }
        ));
    }

    #[test]
    fn test_long_chain_is_rejected_without_overflow() {
        let chain = vec!["1"; 100_000].join(" + ");
        assert!(matches!(
            parse_with_limits(&chain, ParseLimits::default()).unwrap_err(),
            ExpressionError::ExpressionTooComplex { .. }
        ));
    }
}
