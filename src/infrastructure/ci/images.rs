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

//! Image build descriptions for git-backed modules.

use crate::domain::config::RemoteSource;
use crate::domain::module::{with_context_sync, Module};
use crate::infrastructure::constants::DEFAULT_IMAGE_TAG;
use crate::infrastructure::kubernetes::resources::image_ref;
use crate::shared::error::{Result, TranspireError};
use serde::Serialize;

/// One image a module builds, with where to build it from and how to tag it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageBuild {
    pub name: String,
    /// Build context relative to the repository root.
    pub path: String,
    /// Remote build context, `<repo>#<branch>:<path>`.
    pub context: String,
    pub tags: Vec<String>,
}

/// The module's repository, which must be remote.
pub fn remote_source(module: &Module) -> Result<&RemoteSource> {
    module.source().ok_or_else(|| {
        TranspireError::config_error(format!(
            "module '{}' is not a git module; image builds need a git source",
            module.name()
        ))
    })
}

/// Repository URL without a trailing `.git`.
pub fn clean_git_url(url: &str) -> &str {
    let url = url.trim().trim_end_matches('/');
    url.strip_suffix(".git").unwrap_or(url)
}

pub async fn image_builds(module: &Module) -> Result<Vec<ImageBuild>> {
    let source = remote_source(module)?;
    let images = module.images().await?;

    let mut git_url = format!("{}#", clean_git_url(&source.git));
    if let Some(branch) = &source.branch {
        git_url.push_str(branch);
    }

    images
        .iter()
        .map(|image| {
            let reference = with_context_sync(module.info().clone(), module.config().clone(), || {
                image_ref(&image.name)
            })?;
            let (base, tag) = reference
                .rsplit_once(':')
                .unwrap_or((reference.as_str(), DEFAULT_IMAGE_TAG));
            let mut tags = vec![format!("{}:{}", base, DEFAULT_IMAGE_TAG)];
            if tag != DEFAULT_IMAGE_TAG {
                tags.push(reference.clone());
            }
            Ok(ImageBuild {
                name: image.name.clone(),
                path: image.resolved_path().to_string(),
                context: format!("{}:{}", git_url, image.resolved_path()),
                tags,
            })
        })
        .collect()
}
