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

use crate::domain::module::{current_module, global_config};
use crate::infrastructure::constants::DEFAULT_IMAGE_TAG;
use crate::shared::error::{Result, TranspireError};

/// Registry reference for an image the current module builds:
/// `<registry>/<module>/<image>:<revision>`, tagged `latest` when the module
/// has no resolved revision.
pub fn image_ref(image: &str) -> Result<String> {
    let module = current_module()?;
    let config = global_config()?;
    let registry = config.defaults.registry.as_deref().ok_or_else(|| {
        TranspireError::config_error("defaults.registry is required to reference module images")
    })?;
    let tag = module.revision.as_deref().unwrap_or(DEFAULT_IMAGE_TAG);
    Ok(format!(
        "{}/{}/{}:{}",
        registry.trim_end_matches('/'),
        module.name,
        image,
        tag
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::cluster::tests::MINIMAL;
    use crate::domain::config::ClusterConfig;
    use crate::domain::module::{with_context_sync, ModuleInfo};
    use std::sync::Arc;

    #[test]
    fn test_image_ref() {
        let mut config = ClusterConfig::from_toml_str(MINIMAL, ".").unwrap();
        let mut info = ModuleInfo::new("echo", None);

        let missing = with_context_sync(
            Arc::new(info.clone()),
            Arc::new(config.clone()),
            || image_ref("web"),
        );
        assert!(missing.is_err());

        config.defaults.registry = Some("harbor.example.org/apps/".to_string());
        let config = Arc::new(config);
        let latest = with_context_sync(Arc::new(info.clone()), config.clone(), || image_ref("web"));
        assert_eq!(latest.unwrap(), "harbor.example.org/apps/echo/web:latest");

        info.revision = Some("abc123".to_string());
        let pinned = with_context_sync(Arc::new(info), config, || image_ref("web"));
        assert_eq!(pinned.unwrap(), "harbor.example.org/apps/echo/web:abc123");
    }
}
