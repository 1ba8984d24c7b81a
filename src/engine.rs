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

//! Expression engine: compile, cache and evaluate expressions
//!
//! The engine ties the pieces together. Source text is compiled through the
//! shared parse cache, evaluated against caller supplied bindings and the
//! engine's function registry. Cloning an engine is cheap and the clones
//! share cache and registry.
//!
//! ```
//! use expression_language::{Bindings, ExpressionEngine, Value};
//!
//! let engine = ExpressionEngine::new();
//! let bindings = Bindings::new().with("price", 40).with("qty", 3);
//! assert_eq!(engine.evaluate("price * qty", &bindings).unwrap(), Value::Integer(120));
//! ```

use crate::ast::{ExpressionNode, NameCollector};
use crate::config::EngineConfig;
use crate::error::{ExpressionError, Result};
use crate::evaluator::{Evaluator, PatternCache};
use crate::model::{Bindings, Value};
use crate::parser::{AstCache, AstCacheStats, SharedAst, parse_with_limits};
use crate::registry::{Arity, ExpressionFunction, FunctionRegistry};
use std::sync::Arc;

/// Compiles and evaluates expressions
#[derive(Debug, Clone)]
pub struct ExpressionEngine {
    config: Arc<EngineConfig>,
    cache: Arc<AstCache>,
    registry: Arc<FunctionRegistry>,
    patterns: Arc<PatternCache>,
}

impl Default for ExpressionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionEngine {
    /// Create an engine with the default configuration and built-in functions
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with a custom configuration and built-in functions
    pub fn with_config(config: EngineConfig) -> Self {
        Self::from_parts(config, FunctionRegistry::with_builtins())
    }

    /// Start building an engine
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    fn from_parts(config: EngineConfig, registry: FunctionRegistry) -> Self {
        Self {
            cache: Arc::new(AstCache::with_config(config.cache.clone())),
            patterns: Arc::new(PatternCache::new(config.pattern_cache_size)),
            registry: Arc::new(registry),
            config: Arc::new(config),
        }
    }

    /// The engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The function registry used by evaluations
    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Compile source text, reusing a cached tree when one exists
    ///
    /// Failed compilations are not cached.
    pub fn compile(&self, source: &str) -> Result<SharedAst> {
        let limits = self.config.parse_limits();
        self.cache
            .get_or_parse(source, |source| parse_with_limits(source, limits))
    }

    /// Parse source text without consulting or filling the cache
    pub fn parse(&self, source: &str) -> Result<ExpressionNode> {
        parse_with_limits(source, self.config.parse_limits())
    }

    /// Compile and evaluate an expression
    pub fn evaluate(&self, source: &str, bindings: &Bindings) -> Result<Value> {
        let ast = self.compile(source)?;
        self.run(&ast, bindings)
    }

    /// Evaluate an already built tree
    ///
    /// Trees that did not come from this engine's parser are checked against
    /// the configured structural limits first.
    pub fn evaluate_ast(&self, ast: &ExpressionNode, bindings: &Bindings) -> Result<Value> {
        self.config.parse_limits().check(ast)?;
        self.run(ast, bindings)
    }

    fn run(&self, ast: &ExpressionNode, bindings: &Bindings) -> Result<Value> {
        Evaluator::new(&self.registry, &self.patterns, bindings)
            .with_max_depth(self.config.max_depth)
            .evaluate(ast)
    }

    /// Check an expression without evaluating it
    ///
    /// The source must parse, may only reference variables in `allowed` and
    /// may only call registered functions.
    pub fn validate(&self, source: &str, allowed: &[&str]) -> Result<()> {
        let ast = self.compile(source)?;
        let names = NameCollector::collect(&ast);

        if let Some(name) = names
            .variables
            .iter()
            .find(|name| !allowed.contains(&name.as_str()))
        {
            return Err(ExpressionError::UndefinedVariable { name: name.clone() });
        }

        if let Some(name) = names
            .functions
            .iter()
            .find(|name| !self.registry.contains(name))
        {
            return Err(ExpressionError::UndefinedFunction { name: name.clone() });
        }

        Ok(())
    }

    /// Register a function on this engine
    ///
    /// Clones of this engine made earlier keep the registry they had; the
    /// parse cache stays shared.
    pub fn register<F: ExpressionFunction + 'static>(&mut self, function: F) {
        Arc::make_mut(&mut self.registry).register(function);
    }

    /// Register a closure as a function on this engine
    pub fn register_function<F>(&mut self, name: impl Into<String>, arity: Arity, func: F)
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.registry).register_fn(name, arity, func);
    }

    /// Parse cache statistics
    pub fn cache_stats(&self) -> AstCacheStats {
        self.cache.stats()
    }

    /// Drop every cached tree
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

/// Builder for [`ExpressionEngine`]
#[derive(Debug)]
pub struct EngineBuilder {
    config: EngineConfig,
    registry: FunctionRegistry,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            registry: FunctionRegistry::with_builtins(),
        }
    }
}

impl EngineBuilder {
    /// Use the given configuration
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Start from an empty registry instead of the built-in functions
    pub fn without_builtins(mut self) -> Self {
        self.registry = FunctionRegistry::new();
        self
    }

    /// Register a trait-based function
    pub fn function<F: ExpressionFunction + 'static>(mut self, function: F) -> Self {
        self.registry.register(function);
        self
    }

    /// Register a closure as a function
    pub fn function_fn<F>(mut self, name: impl Into<String>, arity: Arity, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.registry.register_fn(name, arity, func);
        self
    }

    /// Build the engine
    pub fn build(self) -> ExpressionEngine {
        ExpressionEngine::from_parts(self.config, self.registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AstCacheConfig;
    use crate::parser::ParseLimits;
    use pretty_assertions::assert_eq;
    use std::thread;

    #[test]
    fn test_compile_uses_cache() {
        let engine = ExpressionEngine::new();
        let first = engine.compile("a + 1").unwrap();
        let second = engine.compile("a + 1").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*first, engine.parse("a + 1").unwrap());
        let stats = engine.cache_stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
    }

    #[test]
    fn test_failed_compile_is_not_cached() {
        let engine = ExpressionEngine::new();
        let first = engine.compile("(1 + 2").unwrap_err();
        let second = engine.compile("(1 + 2").unwrap_err();

        assert_eq!(first, second);
        assert_eq!(first, ExpressionError::syntax(0, "')'", "end of input"));
        assert_eq!(engine.cache_stats().entries, 0);
    }

    #[test]
    fn test_cache_disabled_gives_same_results() {
        let cached = ExpressionEngine::new();
        let uncached = ExpressionEngine::with_config(EngineConfig {
            cache: AstCacheConfig::disabled(),
            ..Default::default()
        });
        let bindings = Bindings::new().with("x", 4);

        for _ in 0..2 {
            assert_eq!(
                cached.evaluate("x * x + 1", &bindings).unwrap(),
                uncached.evaluate("x * x + 1", &bindings).unwrap()
            );
        }
        assert_eq!(uncached.cache_stats().entries, 0);
    }

    #[test]
    fn test_register_function_copy_on_write() {
        let mut engine = ExpressionEngine::new();
        let before = engine.clone();
        engine.register_function("triple", Arity::exactly(1), |args| {
            let n = args[0].to_integer().unwrap_or_default();
            Ok(Value::Integer(n * 3))
        });

        assert_eq!(engine.evaluate("triple(3)", &Bindings::new()).unwrap(), Value::Integer(9));
        assert_eq!(
            before.evaluate("triple(3)", &Bindings::new()).unwrap_err(),
            ExpressionError::UndefinedFunction {
                name: "triple".to_string()
            }
        );
    }

    #[test]
    fn test_builder() {
        let engine = ExpressionEngine::builder()
            .config(EngineConfig {
                max_depth: 8,
                ..Default::default()
            })
            .without_builtins()
            .function_fn("answer", Arity::exactly(0), |_| Ok(Value::Integer(42)))
            .build();

        assert_eq!(engine.config().max_depth, 8);
        assert_eq!(engine.registry().function_names(), vec!["answer"]);
        assert_eq!(engine.evaluate("answer()", &Bindings::new()).unwrap(), Value::Integer(42));
    }

    #[test]
    fn test_limits_are_enforced() {
        let engine = ExpressionEngine::with_config(EngineConfig {
            max_depth: 4,
            ..Default::default()
        });
        let err = engine
            .evaluate("((((((1))))))+ 1 + 2 + 3 + 4 + 5", &Bindings::new())
            .unwrap_err();
        assert!(matches!(err, ExpressionError::ExpressionTooComplex { .. }));

        let deep = engine.parse("1 + 2").unwrap();
        let mut tree = deep;
        for _ in 0..5 {
            tree = ExpressionNode::unary_op(crate::ast::UnaryOperator::Negate, tree);
        }
        assert_eq!(
            engine.evaluate_ast(&tree, &Bindings::new()).unwrap_err(),
            ExpressionError::ExpressionTooComplex {
                what: "nesting depth",
                limit: 4
            }
        );
        assert_eq!(ParseLimits::default().max_depth, 128);
    }

    #[test]
    fn test_validate() {
        let engine = ExpressionEngine::new();
        assert!(engine.validate("count(items) > limit", &["items", "limit"]).is_ok());
        assert_eq!(
            engine.validate("count(items) > limit", &["items"]).unwrap_err(),
            ExpressionError::UndefinedVariable {
                name: "limit".to_string()
            }
        );
        assert_eq!(
            engine.validate("shout(x)", &["x"]).unwrap_err(),
            ExpressionError::UndefinedFunction {
                name: "shout".to_string()
            }
        );
        assert!(engine.validate("1 +", &[]).unwrap_err().is_parse_error());
    }

    #[test]
    fn test_clones_share_cache_across_threads() {
        let engine = ExpressionEngine::new();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let engine = engine.clone();
                thread::spawn(move || {
                    let bindings = Bindings::new().with("n", i);
                    engine.evaluate("n * 2", &bindings).unwrap()
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap(), Value::Integer(i as i64 * 2));
        }
        assert_eq!(engine.cache_stats().entries, 1);
    }
}
