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

use super::definition::ModuleDefinition;
use super::loader::DeclarativeModule;
use super::module::Module;
use crate::domain::config::ClusterConfig;
use crate::domain::manifest::Manifest;
use crate::shared::error::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Loads module code and runs its `objects` entry point inside a build context
/// bound to the module and the active cluster configuration.
#[derive(Debug, Clone)]
pub struct ModuleEvaluator {
    config: Arc<ClusterConfig>,
}

impl ModuleEvaluator {
    pub fn new(config: Arc<ClusterConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Arc<ClusterConfig> {
        &self.config
    }

    /// Load the declarative module rooted at `dir`.
    pub fn load_dir(&self, dir: &Path, expected_name: Option<&str>) -> Result<Module> {
        debug!("Loading module from {}", dir.display());
        let definition = DeclarativeModule::load(dir)?;
        self.load_definition(Arc::new(definition), expected_name)
    }

    pub fn load_definition(
        &self,
        definition: Arc<dyn ModuleDefinition>,
        expected_name: Option<&str>,
    ) -> Result<Module> {
        Module::new(definition, self.config.clone(), expected_name)
    }

    /// All manifests the module emits. Nothing is returned if any entry point
    /// or coercion fails.
    pub async fn evaluate(&self, module: &Module) -> Result<Vec<Manifest>> {
        info!("Evaluating module {}", module.name());
        let objects = module.objects().await?;
        debug!("Module {} emitted {} objects", module.name(), objects.len());
        Ok(objects.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::cluster::tests::MINIMAL;
    use crate::domain::manifest::{ManifestLike, ManifestStream};
    use crate::shared::error::TranspireError;
    use async_trait::async_trait;
    use serde_json::json;

    struct Mixed;

    #[async_trait]
    impl ModuleDefinition for Mixed {
        fn name(&self) -> Option<&str> {
            Some("mixed")
        }

        async fn objects(&self) -> anyhow::Result<ManifestStream> {
            Ok(ManifestStream::many(vec![
                ManifestLike::from(json!({"apiVersion": "v1", "kind": "ConfigMap", "metadata": {"name": "a"}})),
                ManifestLike::from(json!("not a manifest")),
            ]))
        }
    }

    fn evaluator() -> ModuleEvaluator {
        ModuleEvaluator::new(Arc::new(ClusterConfig::from_toml_str(MINIMAL, ".").unwrap()))
    }

    #[tokio::test]
    async fn test_no_partial_output_on_coercion_failure() {
        let evaluator = evaluator();
        let module = evaluator.load_definition(Arc::new(Mixed), Some("mixed")).unwrap();
        assert!(matches!(
            evaluator.evaluate(&module).await,
            Err(TranspireError::ModuleBuildFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_dir_checks_expected_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".transpire.yaml"),
            "name: echoserver\nobjects:\n  - inline: { apiVersion: v1, kind: ConfigMap, metadata: { name: cfg } }\n",
        )
        .unwrap();

        let evaluator = evaluator();
        assert!(matches!(
            evaluator.load_dir(dir.path(), Some("other")),
            Err(TranspireError::InvalidModule(_))
        ));

        let module = evaluator.load_dir(dir.path(), Some("echoserver")).unwrap();
        let objects = evaluator.evaluate(&module).await.unwrap();
        assert_eq!(objects.len(), 1);
    }
}
