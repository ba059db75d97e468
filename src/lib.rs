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

// Core modules
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod shared;

// Re-export commonly used types
pub use domain::build::{BuildReport, ClusterBuilder, ModuleOutcome};
pub use domain::config::{ClusterConfig, ModuleSource, RemoteSource};
pub use domain::manifest::{
    edit_manifests, Edits, EditKey, Manifest, ManifestError, ManifestIdentity,
    ManifestLike, ManifestStream,
};
pub use domain::module::{
    current_module, global_config, BuildContext, Image, Module, ModuleDefinition,
    ModuleEvaluator, ModuleInfo, PipelineTask,
};
pub use infrastructure::git::RepoCache;
pub use infrastructure::output::{ManifestWriter, Postprocessor};
pub use infrastructure::secrets::SecretsProvider;
pub use shared::{Result, TranspireError};
