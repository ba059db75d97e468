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

use crate::domain::manifest::ManifestStream;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The entry points a module exposes to the build.
///
/// `objects`, `images` and `pipeline` run inside a build context bound to the
/// module, so helpers may call [`current_module`](super::current_module) and
/// [`global_config`](super::global_config).
#[async_trait]
pub trait ModuleDefinition: Send + Sync {
    fn name(&self) -> Option<&str>;

    fn namespace(&self) -> Option<&str> {
        None
    }

    async fn objects(&self) -> anyhow::Result<ManifestStream>;

    async fn images(&self) -> anyhow::Result<Vec<Image>> {
        Ok(Vec::new())
    }

    async fn pipeline(&self) -> anyhow::Result<Vec<PipelineTask>> {
        Ok(Vec::new())
    }
}

/// A container image built from a directory of the module source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub name: String,
    pub path: String,
}

impl Image {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// The build path relative to the repository root.
    pub fn resolved_path(&self) -> &str {
        self.path.strip_prefix('/').unwrap_or(&self.path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineTask {
    pub name: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
}
