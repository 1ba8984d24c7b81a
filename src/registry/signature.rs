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

//! Function signatures and arity

use serde::{Deserialize, Serialize};
use std::fmt;

/// Allowed number of arguments for a function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Arity {
    /// Minimum number of arguments
    pub min: usize,
    /// Maximum number of arguments (None for variadic)
    pub max: Option<usize>,
}

impl Arity {
    /// Exactly `n` arguments
    pub const fn exactly(n: usize) -> Self {
        Self { min: n, max: Some(n) }
    }

    /// Between `min` and `max` arguments, inclusive
    pub const fn range(min: usize, max: usize) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    /// `min` or more arguments
    pub const fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }

    /// Check whether `count` arguments satisfy this arity
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min && self.max.is_none_or(|max| count <= max)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "exactly {max}"),
            Some(max) => write!(f, "{} to {max}", self.min),
            None => write!(f, "at least {}", self.min),
        }
    }
}

/// Parameter information for functions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterInfo {
    /// Parameter name
    pub name: String,
    /// Whether this parameter is optional
    pub optional: bool,
}

impl ParameterInfo {
    /// Create a required parameter
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: false,
        }
    }

    /// Create an optional parameter
    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: true,
        }
    }
}

/// Function signature used for arity checking and documentation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionSignature {
    /// Function name
    pub name: String,
    /// Parameter information
    pub parameters: Vec<ParameterInfo>,
    /// Allowed argument count
    pub arity: Arity,
}

impl FunctionSignature {
    /// Create a signature whose arity follows from its parameters
    pub fn new(name: impl Into<String>, parameters: Vec<ParameterInfo>) -> Self {
        let required = parameters.iter().filter(|p| !p.optional).count();
        let arity = Arity::range(required, parameters.len());
        Self {
            name: name.into(),
            parameters,
            arity,
        }
    }

    /// Create a variadic signature: the listed required parameters, then any
    /// number of further arguments
    pub fn variadic(name: impl Into<String>, parameters: Vec<ParameterInfo>) -> Self {
        let required = parameters.iter().filter(|p| !p.optional).count();
        Self {
            name: name.into(),
            parameters,
            arity: Arity::at_least(required),
        }
    }

    /// Create a signature from a bare arity, naming parameters `arg0`, `arg1`, ...
    pub fn from_arity(name: impl Into<String>, arity: Arity) -> Self {
        let listed = arity.max.unwrap_or(arity.min);
        let parameters = (0..listed)
            .map(|i| {
                let name = format!("arg{i}");
                if i < arity.min {
                    ParameterInfo::required(name)
                } else {
                    ParameterInfo::optional(name)
                }
            })
            .collect();
        Self {
            name: name.into(),
            parameters,
            arity,
        }
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, param) in self.parameters.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if param.optional {
                write!(f, "[{}]", param.name)?;
            } else {
                write!(f, "{}", param.name)?;
            }
        }
        if self.arity.max.is_none() {
            if !self.parameters.is_empty() {
                write!(f, ", ")?;
            }
            write!(f, "...")?;
        }
        write!(f, ")")
    }
}
