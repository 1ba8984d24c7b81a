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

//! # expression-language
//!
//! A small, embeddable expression language. Source text is tokenized,
//! parsed with a precedence-climbing parser into an immutable tree, cached
//! by source, and evaluated against named bindings and a registry of pure
//! functions.
//!
//! ```
//! use expression_language::{Bindings, Value, evaluate};
//! use serde_json::json;
//!
//! let bindings = Bindings::from_json(json!({"a": {"b": {"c": 5}}})).unwrap();
//! assert_eq!(evaluate("a.b.c * 2", &bindings).unwrap(), Value::Integer(10));
//! assert_eq!(evaluate("array_get(a, 'x.y') ?? 'none'", &bindings).unwrap(), Value::from("none"));
//! ```
//!
//! Every failure is an [`ExpressionError`]; a null result is always a
//! success. Applications that want to tolerate unparsable input opt in
//! through [`ExpressionService`] and [`FailurePolicy`].

pub mod ast;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod model;
pub mod parser;
pub mod registry;
pub mod service;

pub use ast::ExpressionNode;
pub use config::{AstCacheConfig, EngineConfig};
pub use engine::{EngineBuilder, ExpressionEngine};
pub use error::{ExpressionError, Result};
pub use model::{Bindings, Value, ValueMap};
pub use parser::{AstCacheStats, SharedAst, parse, tokenize};
pub use registry::{Arity, ExpressionFunction, FunctionRegistry};
pub use service::{ExpressionService, FailurePolicy};

use once_cell::sync::Lazy;

static DEFAULT_ENGINE: Lazy<ExpressionEngine> = Lazy::new(ExpressionEngine::new);

/// Evaluate an expression with the process-wide default engine
///
/// The default engine has the built-in functions only and a shared parse
/// cache. Build an [`ExpressionEngine`] to register functions or change
/// limits.
pub fn evaluate(expression: &str, bindings: &Bindings) -> Result<Value> {
    DEFAULT_ENGINE.evaluate(expression, bindings)
}

/// The process-wide default engine used by [`evaluate`]
pub fn default_engine() -> &'static ExpressionEngine {
    &DEFAULT_ENGINE
}
