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

//! Function trait and registry

use super::signature::{Arity, FunctionSignature};
use crate::error::{ExpressionError, Result};
use crate::model::Value;
use log::debug;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// A callable available to expressions by name
///
/// Implementations are expected to be deterministic. They receive already
/// evaluated arguments whose count has been checked against the signature.
pub trait ExpressionFunction: Send + Sync {
    /// Get the function name
    fn name(&self) -> &str;

    /// Get the function signature
    fn signature(&self) -> &FunctionSignature;

    /// Evaluate the function with given arguments
    fn evaluate(&self, args: &[Value]) -> Result<Value>;

    /// Get function documentation
    fn documentation(&self) -> &str {
        ""
    }

    /// Check the argument count against the declared arity
    fn validate_args(&self, arg_count: usize) -> Result<()> {
        let arity = self.signature().arity;
        if arity.accepts(arg_count) {
            Ok(())
        } else {
            Err(ExpressionError::ArityMismatch {
                name: self.name().to_string(),
                expected: arity,
                got: arg_count,
            })
        }
    }
}

type ClosureFn = dyn Fn(&[Value]) -> Result<Value> + Send + Sync;

/// Function backed by a closure, created by [`FunctionRegistry::register_fn`]
pub struct ClosureFunction {
    signature: FunctionSignature,
    documentation: String,
    func: Arc<ClosureFn>,
}

impl ClosureFunction {
    /// Wrap a closure with the given name and arity
    pub fn new<F>(name: impl Into<String>, arity: Arity, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            signature: FunctionSignature::from_arity(name, arity),
            documentation: String::new(),
            func: Arc::new(func),
        }
    }

    /// Attach documentation text
    pub fn with_documentation(mut self, documentation: impl Into<String>) -> Self {
        self.documentation = documentation.into();
        self
    }
}

impl fmt::Debug for ClosureFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClosureFunction")
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

impl ExpressionFunction for ClosureFunction {
    fn name(&self) -> &str {
        &self.signature.name
    }

    fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        (self.func)(args)
    }

    fn documentation(&self) -> &str {
        &self.documentation
    }
}

/// Mapping from function name to implementation
///
/// A registry is filled once and then shared read-only by every evaluation.
/// Cloning is cheap: implementations are reference counted.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: FxHashMap<String, Arc<dyn ExpressionFunction>>,
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.function_names())
            .finish()
    }
}

impl FunctionRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in functions
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        super::functions::register_builtin_functions(&mut registry);
        registry
    }

    /// Register a trait-based function, replacing any function of the same name
    pub fn register<F: ExpressionFunction + 'static>(&mut self, function: F) {
        self.register_arc(Arc::new(function));
    }

    /// Register a shared function implementation
    pub fn register_arc(&mut self, function: Arc<dyn ExpressionFunction>) {
        let name = function.name().to_string();
        if self.functions.insert(name.clone(), function).is_some() {
            debug!("Replaced registered function '{name}'");
        } else {
            debug!("Registered function '{name}'");
        }
    }

    /// Register a closure as a function with the given arity
    pub fn register_fn<F>(&mut self, name: impl Into<String>, arity: Arity, func: F)
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.register(ClosureFunction::new(name, arity, func));
    }

    /// Get a function by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ExpressionFunction>> {
        self.functions.get(name)
    }

    /// Check if a function exists
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Get all registered function names, sorted
    pub fn function_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered functions
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Check whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Look up, arity-check and invoke a function
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        let function = self
            .get(name)
            .ok_or_else(|| ExpressionError::UndefinedFunction {
                name: name.to_string(),
            })?;
        function.validate_args(args.len())?;
        function.evaluate(args)
    }

    /// Generate markdown documentation for all registered functions
    pub fn generate_function_docs(&self) -> String {
        let mut docs = String::new();
        for name in self.function_names() {
            let Some(function) = self.get(name) else {
                continue;
            };
            docs.push_str(&format!("## `{}`\n\n", function.signature()));
            docs.push_str(&format!("Arguments: {}\n", function.signature().arity));
            let doc = function.documentation();
            if !doc.is_empty() {
                docs.push('\n');
                docs.push_str(doc);
                docs.push('\n');
            }
            docs.push('\n');
        }
        docs
    }
}
