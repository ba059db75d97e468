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

//! `kubectl kustomize` as a manifest source.

use crate::domain::manifest::{parse_documents, Manifest};
use crate::infrastructure::process;
use crate::shared::error::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Kustomization {
    pub repo: String,
    pub path: String,
    pub version: String,
}

impl Kustomization {
    /// Remote target for kustomize, `<repo>/<path>?ref=<version>`.
    pub fn url(&self) -> String {
        format!(
            "{}/{}?ref={}",
            self.repo.trim_end_matches('/'),
            self.path.trim_matches('/'),
            self.version
        )
    }

    pub async fn render(&self) -> Result<Vec<Manifest>> {
        process::ensure_tool("kubectl")?;
        let url = self.url();
        let output = process::run("kubectl", ["kustomize", url.as_str()], None, None).await?;
        let manifests = parse_documents(&output)?;
        info!("Rendered {} into {} manifests", url, manifests.len());
        Ok(manifests)
    }
}
