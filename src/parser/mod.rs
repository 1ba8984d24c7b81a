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

//! Expression parser: tokenizer, token stream, Pratt parser and parse cache

mod ast_cache;
mod lexer;
mod pratt;
mod span;
mod tokenizer;

/// Result type for lexing and parsing
pub type ParseResult<T> = crate::error::Result<T>;

pub use ast_cache::{AstCache, AstCacheStats, SharedAst};
pub use lexer::TokenStream;
pub use pratt::{ParseLimits, PrattParser, Precedence, parse_tokens, parse_with_limits};
pub use span::Spanned;
pub use tokenizer::{Token, TokenKind, Tokenizer, tokenize};

/// Parse an expression string into an AST using the default limits
pub fn parse(input: &str) -> ParseResult<crate::ast::ExpressionNode> {
    parse_with_limits(input, ParseLimits::default())
}
