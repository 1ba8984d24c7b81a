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

//! Built-in function implementations

pub mod collection;
pub mod math;
pub mod string;
pub mod utility;

pub use collection::CountFunction;
pub use math::{AbsFunction, MaxFunction, MinFunction};
pub use string::{LowerFunction, UpperFunction};
pub use utility::ArrayGetFunction;

use super::function::FunctionRegistry;

/// Register every built-in function
pub fn register_builtin_functions(registry: &mut FunctionRegistry) {
    registry.register(ArrayGetFunction);
    registry.register(CountFunction);
    registry.register(AbsFunction);
    registry.register(MinFunction);
    registry.register(MaxFunction);
    registry.register(LowerFunction);
    registry.register(UpperFunction);
}
