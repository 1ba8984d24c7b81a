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

//! Error types for expression compilation and evaluation
//!
//! Every failure the engine can produce is a variant of [`ExpressionError`].
//! None of them is fatal to the process and none of them leaves shared state
//! (function registry, parse cache) modified.

use crate::registry::Arity;
use thiserror::Error;

/// Result type alias for expression operations
pub type Result<T> = std::result::Result<T, ExpressionError>;

/// Comprehensive error type for expression operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    /// The lexer met a character it cannot turn into a token
    #[error("Lex error at position {position}: {message} '{character}'")]
    Lex {
        /// Byte offset of the offending character
        position: usize,
        /// The offending character
        character: char,
        /// Human-readable description
        message: String,
    },

    /// The token sequence does not form a valid expression
    #[error("Syntax error at position {position}: expected {expected}, found {found}")]
    Syntax {
        /// Byte offset the error refers to
        position: usize,
        /// What the parser was looking for
        expected: String,
        /// What it found instead
        found: String,
    },

    /// A variable was referenced that is not present in the bindings
    #[error("Variable '{name}' is not defined")]
    UndefinedVariable {
        /// Variable name
        name: String,
    },

    /// A function was called that is not present in the registry
    #[error("Function '{name}' is not defined")]
    UndefinedFunction {
        /// Function name
        name: String,
    },

    /// A function was called with a number of arguments outside its arity
    #[error("Function '{name}' expects {expected} arguments, got {got}")]
    ArityMismatch {
        /// Function name
        name: String,
        /// Declared arity
        expected: Arity,
        /// Number of arguments supplied
        got: usize,
    },

    /// An operator or function received operands of an unsupported kind
    #[error("Type mismatch: expected {expected}, got {actual}{}", context.as_ref().map(|c| format!(" in {c}")).unwrap_or_default())]
    TypeMismatch {
        /// Expected kind of value
        expected: String,
        /// Kind of value actually received
        actual: String,
        /// Operator or function where the mismatch occurred
        context: Option<String>,
    },

    /// Division or modulo by zero
    #[error("Division by zero")]
    DivisionByZero,

    /// The expression exceeds a configured structural limit
    #[error("Expression too complex: {what} exceeds the limit of {limit}")]
    ExpressionTooComplex {
        /// Which measure was exceeded ("nesting depth", "node count")
        what: &'static str,
        /// The configured limit
        limit: usize,
    },

    /// Member access on a mapping without that key
    #[error("Key '{key}' does not exist")]
    KeyNotFound {
        /// The missing key
        key: String,
    },

    /// Index access outside a sequence
    #[error("Index {index} out of bounds for sequence of length {len}")]
    IndexOutOfBounds {
        /// Requested index
        index: i64,
        /// Sequence length
        len: usize,
    },

    /// A `matches` pattern failed to compile
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern {
        /// Pattern source
        pattern: String,
        /// Compiler message
        message: String,
    },

    /// A registered function failed for a reason not covered above
    #[error("Function '{name}' error: {message}")]
    Function {
        /// Function name
        name: String,
        /// Error message
        message: String,
    },
}

impl ExpressionError {
    /// Create a lex error
    pub fn lex(position: usize, character: char, message: impl Into<String>) -> Self {
        Self::Lex {
            position,
            character,
            message: message.into(),
        }
    }

    /// Create a syntax error
    pub fn syntax(position: usize, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::Syntax {
            position,
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create a type mismatch error with operator/function context
    pub fn type_mismatch(
        expected: impl Into<String>,
        actual: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
            context: Some(context.into()),
        }
    }

    /// Create a function error
    pub fn function(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Function {
            name: name.into(),
            message: message.into(),
        }
    }

    /// True for failures that happen before evaluation starts: the source
    /// could not be lexed, parsed, or exceeds the structural limits
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Self::Lex { .. } | Self::Syntax { .. } | Self::ExpressionTooComplex { .. }
        )
    }

    /// True for failures caused by a value that is simply not there
    pub fn is_missing_value(&self) -> bool {
        matches!(
            self,
            Self::UndefinedVariable { .. } | Self::KeyNotFound { .. } | Self::IndexOutOfBounds { .. }
        )
    }

    /// Source position for lex and syntax errors
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::Lex { position, .. } | Self::Syntax { position, .. } => Some(*position),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ExpressionError::syntax(3, "')'", "end of input");
        assert_eq!(
            err.to_string(),
            "Syntax error at position 3: expected ')', found end of input"
        );

        let err = ExpressionError::type_mismatch("number", "string", "operator '*'");
        assert_eq!(
            err.to_string(),
            "Type mismatch: expected number, got string in operator '*'"
        );

        let err = ExpressionError::ArityMismatch {
            name: "abs".to_string(),
            expected: Arity::exactly(1),
            got: 2,
        };
        assert_eq!(err.to_string(), "Function 'abs' expects exactly 1 arguments, got 2");
    }

    #[test]
    fn test_classification() {
        assert!(ExpressionError::lex(0, '#', "unexpected character").is_parse_error());
        assert!(
            ExpressionError::ExpressionTooComplex {
                what: "nesting depth",
                limit: 4
            }
            .is_parse_error()
        );
        assert!(!ExpressionError::DivisionByZero.is_parse_error());

        assert!(
            ExpressionError::UndefinedVariable {
                name: "x".to_string()
            }
            .is_missing_value()
        );
        assert!(!ExpressionError::DivisionByZero.is_missing_value());
        assert_eq!(ExpressionError::syntax(7, "a", "b").position(), Some(7));
    }
}
