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

//! Tokenizer for expressions
//!
//! Turns source text into a vector of spanned tokens terminated by a single
//! [`Token::Eof`]. The tokenizer is a pure function of its input: it keeps no
//! state between calls and never allocates for identifiers or for string
//! literals without escapes.
//!
//! Recognized input:
//! - identifiers `[A-Za-z_][A-Za-z0-9_]*`
//! - integers, decimals and exponents (`42`, `3.14`, `1e-3`)
//! - single or double quoted strings with `\n \t \r \\ \' \" \uXXXX` escapes
//! - the operator and punctuation set of the language

use super::ParseResult;
use super::span::Spanned;
use crate::error::ExpressionError;
use std::borrow::Cow;
use std::fmt;

/// Token with zero-copy payloads where possible
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'input> {
    // Literals
    /// Integer literal (e.g., 42)
    Integer(i64),
    /// Decimal or exponent literal, or an integer too large for i64
    Float(f64),
    /// String literal with escapes processed; borrowed when it had none
    String(Cow<'input, str>),

    // Identifiers and keywords
    /// Identifier token (zero-copy string slice)
    Identifier(&'input str),
    /// `true`, any letter case
    True,
    /// `false`, any letter case
    False,
    /// `null`, any letter case
    Null,
    /// `&&` or `and`
    And,
    /// `||` or `or`
    Or,
    /// `!` or `not`
    Not,
    /// `in`
    In,
    /// `matches`
    Matches,

    // Operators
    /// Addition operator (+)
    Plus,
    /// Subtraction operator (-)
    Minus,
    /// Multiplication operator (*)
    Multiply,
    /// Division operator (/)
    Divide,
    /// Modulo operator (%)
    Modulo,
    /// Power operator (**)
    Power,
    /// Concatenation or bitwise complement (~)
    Tilde,
    /// Equality operator (==)
    Equal,
    /// Inequality operator (!=)
    NotEqual,
    /// Identity operator (===)
    Identical,
    /// Non-identity operator (!==)
    NotIdentical,
    /// Less than operator (<)
    LessThan,
    /// Less than or equal operator (<=)
    LessThanOrEqual,
    /// Greater than operator (>)
    GreaterThan,
    /// Greater than or equal operator (>=)
    GreaterThanOrEqual,
    /// Ternary question mark (?)
    Question,
    /// Null coalescing operator (??)
    Coalesce,
    /// Elvis operator (?:)
    Elvis,
    /// Null-safe member access (?.)
    NullSafeDot,

    // Punctuation
    /// Member access (.)
    Dot,
    /// Comma separator (,)
    Comma,
    /// Colon (:)
    Colon,
    /// Left parenthesis (
    LeftParen,
    /// Right parenthesis )
    RightParen,
    /// Left square bracket [
    LeftBracket,
    /// Right square bracket ]
    RightBracket,
    /// Left curly brace {
    LeftBrace,
    /// Right curly brace }
    RightBrace,

    /// End of input, always the last token
    Eof,
}

/// Coarse token classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Identifiers and the literal keywords true, false, null
    Identifier,
    /// Numeric literals
    Number,
    /// String literals
    String,
    /// Operators, including the word operators and, or, not, in, matches
    Operator,
    /// Brackets, dot, comma, colon
    Punctuation,
    /// End of input
    EndOfInput,
}

impl<'input> Token<'input> {
    /// Coarse class of this token
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Integer(_) | Token::Float(_) => TokenKind::Number,
            Token::String(_) => TokenKind::String,
            Token::Identifier(_) | Token::True | Token::False | Token::Null => {
                TokenKind::Identifier
            }
            Token::Dot
            | Token::Comma
            | Token::Colon
            | Token::LeftParen
            | Token::RightParen
            | Token::LeftBracket
            | Token::RightBracket
            | Token::LeftBrace
            | Token::RightBrace => TokenKind::Punctuation,
            Token::Eof => TokenKind::EndOfInput,
            _ => TokenKind::Operator,
        }
    }

    /// Get identifier string
    #[inline]
    pub fn as_identifier(&self) -> Option<&'input str> {
        match self {
            Token::Identifier(s) => Some(s),
            _ => None,
        }
    }

    /// Description used in syntax error messages
    pub fn describe(&self) -> String {
        match self {
            Token::Eof => "end of input".to_string(),
            other => format!("'{other}'"),
        }
    }

    /// Keyword lookup; literal keywords ignore letter case
    fn from_word(word: &str) -> Option<Token<'static>> {
        match word {
            "and" => Some(Token::And),
            "or" => Some(Token::Or),
            "not" => Some(Token::Not),
            "in" => Some(Token::In),
            "matches" => Some(Token::Matches),
            w if w.eq_ignore_ascii_case("true") => Some(Token::True),
            w if w.eq_ignore_ascii_case("false") => Some(Token::False),
            w if w.eq_ignore_ascii_case("null") => Some(Token::Null),
            _ => None,
        }
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Token::Integer(i) => return write!(f, "{i}"),
            Token::Float(x) => return write!(f, "{x}"),
            Token::String(s) => return write!(f, "{s:?}"),
            Token::Identifier(name) => name,
            Token::True => "true",
            Token::False => "false",
            Token::Null => "null",
            Token::And => "&&",
            Token::Or => "||",
            Token::Not => "!",
            Token::In => "in",
            Token::Matches => "matches",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Multiply => "*",
            Token::Divide => "/",
            Token::Modulo => "%",
            Token::Power => "**",
            Token::Tilde => "~",
            Token::Equal => "==",
            Token::NotEqual => "!=",
            Token::Identical => "===",
            Token::NotIdentical => "!==",
            Token::LessThan => "<",
            Token::LessThanOrEqual => "<=",
            Token::GreaterThan => ">",
            Token::GreaterThanOrEqual => ">=",
            Token::Question => "?",
            Token::Coalesce => "??",
            Token::Elvis => "?:",
            Token::NullSafeDot => "?.",
            Token::Dot => ".",
            Token::Comma => ",",
            Token::Colon => ":",
            Token::LeftParen => "(",
            Token::RightParen => ")",
            Token::LeftBracket => "[",
            Token::RightBracket => "]",
            Token::LeftBrace => "{",
            Token::RightBrace => "}",
            Token::Eof => "<eof>",
        };
        f.write_str(text)
    }
}

/// Identifier continuation lookup table
static ID_CHAR_TABLE: [bool; 256] = {
    let mut table = [false; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = matches!(i as u8, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_');
        i += 1;
    }
    table
};

/// Identifier start lookup table
static ID_START_TABLE: [bool; 256] = {
    let mut table = [false; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = matches!(i as u8, b'A'..=b'Z' | b'a'..=b'z' | b'_');
        i += 1;
    }
    table
};

/// Single-character punctuation and operators that never start a longer token
#[inline(always)]
fn lookup_single_char_operator(byte: u8) -> Option<Token<'static>> {
    match byte {
        b'.' => Some(Token::Dot),
        b'(' => Some(Token::LeftParen),
        b')' => Some(Token::RightParen),
        b',' => Some(Token::Comma),
        b'+' => Some(Token::Plus),
        b'-' => Some(Token::Minus),
        b'/' => Some(Token::Divide),
        b'%' => Some(Token::Modulo),
        b'~' => Some(Token::Tilde),
        b'[' => Some(Token::LeftBracket),
        b']' => Some(Token::RightBracket),
        b'{' => Some(Token::LeftBrace),
        b'}' => Some(Token::RightBrace),
        b':' => Some(Token::Colon),
        _ => None,
    }
}

/// Tokenizer over a single source string
#[derive(Clone)]
pub struct Tokenizer<'input> {
    input: &'input str,
    bytes: &'input [u8],
    pos: usize,
    end: usize,
}

impl<'input> Tokenizer<'input> {
    /// Create a new tokenizer
    #[inline]
    pub fn new(input: &'input str) -> Self {
        let bytes = input.as_bytes();
        Self {
            input,
            bytes,
            pos: 0,
            end: bytes.len(),
        }
    }

    /// Lookup for operators that may span several characters.
    /// Returns (token, consumed_bytes) or None if the bytes form no operator.
    #[inline(always)]
    fn lookup_multi_char_operator(rest: &[u8]) -> Option<(Token<'static>, usize)> {
        match rest {
            [b'=', b'=', b'=', ..] => Some((Token::Identical, 3)),
            [b'!', b'=', b'=', ..] => Some((Token::NotIdentical, 3)),
            [b'=', b'=', ..] => Some((Token::Equal, 2)),
            [b'!', b'=', ..] => Some((Token::NotEqual, 2)),
            [b'<', b'=', ..] => Some((Token::LessThanOrEqual, 2)),
            [b'>', b'=', ..] => Some((Token::GreaterThanOrEqual, 2)),
            [b'*', b'*', ..] => Some((Token::Power, 2)),
            [b'&', b'&', ..] => Some((Token::And, 2)),
            [b'|', b'|', ..] => Some((Token::Or, 2)),
            [b'?', b'?', ..] => Some((Token::Coalesce, 2)),
            [b'?', b':', ..] => Some((Token::Elvis, 2)),
            // `a?.5:1` is a ternary, not a null-safe access
            [b'?', b'.', next, ..] if !next.is_ascii_digit() => Some((Token::NullSafeDot, 2)),
            [b'?', b'.'] => Some((Token::NullSafeDot, 2)),

            [b'!', ..] => Some((Token::Not, 1)),
            [b'<', ..] => Some((Token::LessThan, 1)),
            [b'>', ..] => Some((Token::GreaterThan, 1)),
            [b'*', ..] => Some((Token::Multiply, 1)),
            [b'?', ..] => Some((Token::Question, 1)),

            _ => None,
        }
    }

    #[inline(always)]
    fn is_id_start(ch: u8) -> bool {
        ID_START_TABLE[ch as usize]
    }

    #[inline(always)]
    fn is_id_continue(ch: u8) -> bool {
        ID_CHAR_TABLE[ch as usize]
    }

    #[inline(always)]
    fn peek_byte(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    /// The character at the current position, for error reporting
    fn current_char(&self) -> char {
        self.input
            .get(self.pos..)
            .and_then(|rest| rest.chars().next())
            .unwrap_or('\0')
    }

    fn unexpected_character(&self) -> ExpressionError {
        ExpressionError::lex(self.pos, self.current_char(), "unexpected character")
    }

    /// Number parsing: digits, optional fraction, optional exponent
    fn parse_number(&mut self) -> Token<'input> {
        let start = self.pos;
        let mut is_float = false;

        while self.pos < self.end && self.bytes[self.pos].is_ascii_digit() {
            self.pos += 1;
        }

        // A dot only belongs to the number when a digit follows it
        if self.peek_byte(0) == Some(b'.') && self.peek_byte(1).is_some_and(|b| b.is_ascii_digit())
        {
            is_float = true;
            self.pos += 1;
            while self.pos < self.end && self.bytes[self.pos].is_ascii_digit() {
                self.pos += 1;
            }
        }

        // Exponent is only consumed when digits follow it
        if matches!(self.peek_byte(0), Some(b'e' | b'E')) {
            let digits_at = match self.peek_byte(1) {
                Some(b'+' | b'-') => 2,
                _ => 1,
            };
            if self.peek_byte(digits_at).is_some_and(|b| b.is_ascii_digit()) {
                is_float = true;
                self.pos += digits_at;
                while self.pos < self.end && self.bytes[self.pos].is_ascii_digit() {
                    self.pos += 1;
                }
            }
        }

        let text = &self.input[start..self.pos];
        if !is_float {
            if let Ok(value) = text.parse::<i64>() {
                return Token::Integer(value);
            }
        }
        // Digit-only text always parses; overflow saturates to infinity
        Token::Float(text.parse::<f64>().unwrap_or(f64::INFINITY))
    }

    /// Identifier or keyword
    fn parse_word(&mut self) -> Token<'input> {
        let start = self.pos;
        while self.pos < self.end && Self::is_id_continue(self.bytes[self.pos]) {
            self.pos += 1;
        }
        let word = &self.input[start..self.pos];
        Token::from_word(word).unwrap_or(Token::Identifier(word))
    }

    /// String literal with escape processing. The content is borrowed from
    /// the input unless an escape forces a copy.
    fn parse_string_literal(&mut self) -> ParseResult<Cow<'input, str>> {
        let quote_pos = self.pos;
        let quote = self.bytes[self.pos];
        self.pos += 1;

        let mut decoded: Option<String> = None;
        let mut chunk_start = self.pos;

        while self.pos < self.end {
            let byte = self.bytes[self.pos];
            if byte == quote {
                let tail = &self.input[chunk_start..self.pos];
                self.pos += 1;
                return Ok(match decoded {
                    Some(mut buf) => {
                        buf.push_str(tail);
                        Cow::Owned(buf)
                    }
                    None => Cow::Borrowed(tail),
                });
            }

            if byte != b'\\' {
                self.pos += 1;
                continue;
            }

            let buf = decoded.get_or_insert_with(String::new);
            buf.push_str(&self.input[chunk_start..self.pos]);
            let escape_pos = self.pos;
            self.pos += 1;

            let Some(escaped) = self.peek_byte(0) else {
                break;
            };
            match escaped {
                b'n' => buf.push('\n'),
                b't' => buf.push('\t'),
                b'r' => buf.push('\r'),
                b'\\' => buf.push('\\'),
                b'\'' => buf.push('\''),
                b'"' => buf.push('"'),
                b'u' => {
                    let ch = self
                        .input
                        .get(self.pos + 1..self.pos + 5)
                        .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
                        .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                        .and_then(char::from_u32)
                        .ok_or_else(|| {
                            ExpressionError::lex(escape_pos, '\\', "invalid unicode escape")
                        })?;
                    buf.push(ch);
                    self.pos += 4;
                }
                // Unknown escapes are kept as written
                _ => {
                    buf.push('\\');
                    chunk_start = self.pos;
                    continue;
                }
            }
            self.pos += 1;
            chunk_start = self.pos;
        }

        Err(ExpressionError::lex(
            quote_pos,
            quote as char,
            "unterminated string literal",
        ))
    }

    #[inline(always)]
    fn skip_whitespace(&mut self) {
        while self.pos < self.end && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    /// Produce the next token. Returns [`Token::Eof`] once the input is
    /// exhausted, and keeps returning it on further calls.
    pub fn next_token(&mut self) -> ParseResult<Spanned<Token<'input>>> {
        self.skip_whitespace();

        let start = self.pos;
        if self.pos >= self.end {
            return Ok(Spanned::new(Token::Eof, start, start));
        }

        let byte = self.bytes[self.pos];
        let token = if let Some((token, consumed)) =
            Self::lookup_multi_char_operator(&self.bytes[self.pos..])
        {
            self.pos += consumed;
            token
        } else if let Some(token) = lookup_single_char_operator(byte) {
            self.pos += 1;
            token
        } else {
            match byte {
                b'0'..=b'9' => self.parse_number(),
                b'\'' | b'"' => Token::String(self.parse_string_literal()?),
                ch if Self::is_id_start(ch) => self.parse_word(),
                _ => return Err(self.unexpected_character()),
            }
        };

        Ok(Spanned::new(token, start, self.pos))
    }

    /// Tokenize the whole input, including the trailing end-of-input token
    pub fn tokenize_all(&mut self) -> ParseResult<Vec<Spanned<Token<'input>>>> {
        let mut tokens = Vec::with_capacity(self.end / 2 + 1);

        loop {
            let token = self.next_token()?;
            let done = token.value == Token::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    /// Get current position in input
    #[inline(always)]
    pub fn position(&self) -> usize {
        self.pos
    }
}

/// Tokenize a source string
#[inline]
pub fn tokenize(input: &str) -> ParseResult<Vec<Spanned<Token<'_>>>> {
    Tokenizer::new(input).tokenize_all()
}
