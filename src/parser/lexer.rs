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

//! Token stream with lookahead over tokenizer output

use super::ParseResult;
use super::span::Spanned;
use super::tokenizer::Token;
use crate::error::ExpressionError;
use std::mem;

/// Token stream with lookahead capability
///
/// The stream always ends with [`Token::Eof`]; reading past the end keeps
/// yielding that token.
#[derive(Debug, Clone)]
pub struct TokenStream<'input> {
    tokens: Vec<Spanned<Token<'input>>>,
    position: usize,
}

impl<'input> TokenStream<'input> {
    /// Create a new token stream, appending an end-of-input token if missing
    pub fn new(mut tokens: Vec<Spanned<Token<'input>>>) -> Self {
        if tokens.last().is_none_or(|token| token.value != Token::Eof) {
            let end = tokens.last().map_or(0, |token| token.end);
            tokens.push(Spanned::new(Token::Eof, end, end));
        }
        Self {
            tokens,
            position: 0,
        }
    }

    /// Peek at the current token without consuming
    pub fn peek(&self) -> &Spanned<Token<'input>> {
        self.peek_ahead(0)
    }

    /// Peek at a token n positions ahead
    pub fn peek_ahead(&self, n: usize) -> &Spanned<Token<'input>> {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.position + n).min(last)]
    }

    /// Consume and return the current token
    pub fn next(&mut self) -> Spanned<Token<'input>> {
        let token = self.peek().clone();
        if !self.is_eof() {
            self.position += 1;
        }
        token
    }

    /// Check if we're at the end of the stream
    pub fn is_eof(&self) -> bool {
        self.peek().value == Token::Eof
    }

    /// Get the current position in the stream
    pub fn position(&self) -> usize {
        self.position
    }

    /// Check whether the current token has the same variant as `expected`
    pub fn check(&self, expected: &Token<'_>) -> bool {
        mem::discriminant(&self.peek().value) == mem::discriminant(expected)
    }

    /// Consume a token if it matches the predicate
    pub fn consume_if<F>(&mut self, predicate: F) -> Option<Spanned<Token<'input>>>
    where
        F: FnOnce(&Token<'input>) -> bool,
    {
        if predicate(&self.peek().value) {
            Some(self.next())
        } else {
            None
        }
    }

    /// Expect a specific token type
    pub fn expect(&mut self, expected: &Token<'_>) -> ParseResult<Spanned<Token<'input>>> {
        if self.check(expected) {
            Ok(self.next())
        } else {
            let found = self.peek();
            Err(ExpressionError::syntax(
                found.start,
                expected.describe(),
                found.value.describe(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tokenize;

    #[test]
    fn test_lookahead_and_eof() {
        let mut stream = TokenStream::new(tokenize("a + 1").unwrap());

        assert_eq!(stream.peek().value, Token::Identifier("a"));
        assert_eq!(stream.peek_ahead(1).value, Token::Plus);
        assert_eq!(stream.peek_ahead(10).value, Token::Eof);

        stream.next();
        assert!(stream.consume_if(|t| *t == Token::Plus).is_some());
        assert!(stream.consume_if(|t| *t == Token::Plus).is_none());
        assert_eq!(stream.expect(&Token::Integer(0)).unwrap().value, Token::Integer(1));

        assert!(stream.is_eof());
        assert_eq!(stream.next().value, Token::Eof);
        assert_eq!(stream.position(), 3);
    }

    #[test]
    fn test_expect_error() {
        let mut stream = TokenStream::new(tokenize("a").unwrap());
        stream.next();
        let err = stream.expect(&Token::RightParen).unwrap_err();
        assert_eq!(err, ExpressionError::syntax(1, "')'", "end of input"));
    }

    #[test]
    fn test_missing_eof_is_appended() {
        let stream = TokenStream::new(vec![Spanned::new(Token::Integer(7), 0, 1)]);
        assert_eq!(stream.peek_ahead(1).value, Token::Eof);
        assert_eq!(stream.peek_ahead(1).start, 1);
    }
}
