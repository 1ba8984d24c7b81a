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

//! Host-facing evaluation service
//!
//! [`ExpressionService`] is what an application embeds: one engine, one
//! failure policy. A successful evaluation is always `Ok(Some(value))`,
//! including a legitimate null result. `Ok(None)` only ever appears under
//! [`FailurePolicy::SuppressParseErrors`] and means the source did not parse.

use crate::engine::ExpressionEngine;
use crate::error::Result;
use crate::model::{Bindings, Value};
use log::warn;
use serde::{Deserialize, Serialize};

/// What the service does with a failed evaluation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Return every error to the caller
    #[default]
    Propagate,
    /// Log lex, syntax and complexity errors and report them as `Ok(None)`;
    /// evaluation errors still propagate
    SuppressParseErrors,
}

/// Engine plus failure policy
#[derive(Debug, Clone, Default)]
pub struct ExpressionService {
    engine: ExpressionEngine,
    policy: FailurePolicy,
}

impl ExpressionService {
    /// Create a service with the default engine and [`FailurePolicy::Propagate`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing engine
    pub fn with_engine(engine: ExpressionEngine) -> Self {
        Self {
            engine,
            policy: FailurePolicy::default(),
        }
    }

    /// Set the failure policy
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The active failure policy
    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// The wrapped engine
    pub fn engine(&self) -> &ExpressionEngine {
        &self.engine
    }

    /// Mutable access to the wrapped engine, for registering functions
    pub fn engine_mut(&mut self) -> &mut ExpressionEngine {
        &mut self.engine
    }

    /// Evaluate an expression under the configured policy
    pub fn evaluate(&self, expression: &str, bindings: &Bindings) -> Result<Option<Value>> {
        match self.engine.evaluate(expression, bindings) {
            Ok(value) => Ok(Some(value)),
            Err(err)
                if err.is_parse_error() && self.policy == FailurePolicy::SuppressParseErrors =>
            {
                warn!("Suppressed error in expression '{expression}': {err}");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}
