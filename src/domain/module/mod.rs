// Copyright 2025 Transpire Team.
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

//! Modules: definitions, loading and evaluation

pub mod context;
pub mod definition;
pub mod evaluator;
pub mod loader;
#[allow(clippy::module_inception)]
pub mod module;

pub use context::{
    current_context, current_module, current_namespace, global_config, with_context,
    with_context_sync, BuildContext, ModuleInfo,
};
pub use definition::{Image, ModuleDefinition, PipelineTask};
pub use evaluator::ModuleEvaluator;
pub use loader::{DeclarativeModule, MODULE_FILE};
pub use module::Module;
