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

use crate::domain::manifest::ManifestError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TranspireError>;

#[derive(Error, Debug)]
pub enum TranspireError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Failed to resolve module source '{repository}': {message}")]
    ModuleResolution { repository: String, message: String },

    #[error("Invalid module: {0}")]
    InvalidModule(String),

    #[error("Invalid output from module '{module}': {message}")]
    InvalidModuleOutput { module: String, message: String },

    #[error("Module '{module}' failed to build: {cause}")]
    ModuleBuildFailed {
        module: String,
        #[source]
        cause: anyhow::Error,
    },

    #[error("Build context unavailable: {0} was read outside of a module evaluation")]
    ContextUnavailable(&'static str),

    #[error("Unsupported manifest type: {0}")]
    UnsupportedManifestType(String),

    #[error("Missing path segment: '{0}'")]
    MissingSegment(String),

    #[error("Path segment '{0}' does not point to a map")]
    NotAMap(String),

    #[error("Some edits were not applied: {}", .0.join(", "))]
    UnappliedEdits(Vec<String>),

    #[error("{} manifest(s) in module '{module}' failed postprocessing", .errors.len())]
    ManifestErrors {
        module: String,
        errors: Vec<ManifestError>,
    },

    #[error("External tool '{tool}' failed: {message}")]
    ToolFailed { tool: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl TranspireError {
    pub fn config_error(context: impl Into<String>) -> Self {
        Self::ConfigError(context.into())
    }

    pub fn invalid_module(context: impl Into<String>) -> Self {
        Self::InvalidModule(context.into())
    }

    pub fn module_resolution(repository: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ModuleResolution {
            repository: repository.into(),
            message: message.into(),
        }
    }

    pub fn invalid_output(module: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidModuleOutput {
            module: module.into(),
            message: message.into(),
        }
    }

    pub fn build_failed(module: impl Into<String>, cause: impl Into<anyhow::Error>) -> Self {
        Self::ModuleBuildFailed {
            module: module.into(),
            cause: cause.into(),
        }
    }

    pub fn tool_failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }
}
