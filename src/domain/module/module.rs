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

use super::context::{with_context, ModuleInfo};
use super::definition::{Image, ModuleDefinition, PipelineTask};
use crate::domain::config::{ClusterConfig, RemoteSource, RESERVED_MODULE_NAME};
use crate::domain::manifest::{coerce_many, Manifest};
use crate::shared::error::{Result, TranspireError};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// A loaded module. Entry points run at most once per instance; their results
/// are kept for the lifetime of the module.
pub struct Module {
    definition: Arc<dyn ModuleDefinition>,
    info: Arc<ModuleInfo>,
    config: Arc<ClusterConfig>,
    source: Option<RemoteSource>,
    objects: OnceCell<Vec<Manifest>>,
    images: OnceCell<Vec<Image>>,
    pipeline: OnceCell<Vec<PipelineTask>>,
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("info", &self.info)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl Module {
    /// Wrap a definition, checking its name. `expected_name` is the key the
    /// module is configured under, if any.
    pub fn new(
        definition: Arc<dyn ModuleDefinition>,
        config: Arc<ClusterConfig>,
        expected_name: Option<&str>,
    ) -> Result<Self> {
        let name = match definition.name() {
            None => return Err(TranspireError::invalid_module("module does not define a name")),
            Some(name) if name.trim().is_empty() => {
                return Err(TranspireError::invalid_module("module name is empty"))
            }
            Some(RESERVED_MODULE_NAME) => {
                return Err(TranspireError::invalid_module(format!(
                    "module name '{}' is reserved",
                    RESERVED_MODULE_NAME
                )))
            }
            Some(name) => name.to_string(),
        };

        if let Some(expected) = expected_name {
            if expected != name {
                return Err(TranspireError::invalid_module(format!(
                    "module is configured as '{}' but names itself '{}'",
                    expected, name
                )));
            }
        }

        let namespace = definition
            .namespace()
            .filter(|ns| !ns.is_empty())
            .map(str::to_string);

        Ok(Self {
            info: Arc::new(ModuleInfo::new(name, namespace)),
            definition,
            config,
            source: None,
            objects: OnceCell::new(),
            images: OnceCell::new(),
            pipeline: OnceCell::new(),
        })
    }

    pub fn with_revision(mut self, revision: Option<String>) -> Self {
        Arc::make_mut(&mut self.info).revision = revision;
        self
    }

    pub fn with_source(mut self, source: RemoteSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn namespace(&self) -> &str {
        &self.info.namespace
    }

    pub fn revision(&self) -> Option<&str> {
        self.info.revision.as_deref()
    }

    pub fn info(&self) -> &Arc<ModuleInfo> {
        &self.info
    }

    pub fn config(&self) -> &Arc<ClusterConfig> {
        &self.config
    }

    /// Remote repository the module was loaded from, if any.
    pub fn source(&self) -> Option<&RemoteSource> {
        self.source.as_ref()
    }

    /// The module's manifests, coerced to canonical maps.
    pub async fn objects(&self) -> Result<&[Manifest]> {
        let objects = self
            .objects
            .get_or_try_init(|| {
                self.run(async {
                    let stream = self.definition.objects().await?;
                    let manifests = coerce_many(stream).collect::<Result<Vec<_>>>()?;
                    Ok::<_, anyhow::Error>(manifests)
                })
            })
            .await?;
        Ok(objects)
    }

    pub async fn images(&self) -> Result<&[Image]> {
        let images = self
            .images
            .get_or_try_init(|| self.run(self.definition.images()))
            .await?;
        Ok(images)
    }

    pub async fn pipeline(&self) -> Result<&[PipelineTask]> {
        let pipeline = self
            .pipeline
            .get_or_try_init(|| self.run(self.definition.pipeline()))
            .await?;
        Ok(pipeline)
    }

    async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        with_context(self.info.clone(), self.config.clone(), fut)
            .await
            .map_err(|err| entry_point_error(self.name(), err))
    }
}

/// Invalid output is reported as such; everything else is a build failure of
/// the module.
fn entry_point_error(module: &str, err: anyhow::Error) -> TranspireError {
    match err.downcast::<TranspireError>() {
        Ok(err @ TranspireError::InvalidModuleOutput { .. }) => err,
        Ok(err) => TranspireError::build_failed(module, err),
        Err(err) => TranspireError::build_failed(module, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::cluster::tests::MINIMAL;
    use crate::domain::manifest::{ManifestLike, ManifestStream};
    use crate::domain::module::current_module;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        name: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl Counting {
        fn named(name: &'static str) -> Self {
            Self {
                name: Some(name),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ModuleDefinition for Counting {
        fn name(&self) -> Option<&str> {
            self.name
        }

        async fn objects(&self) -> anyhow::Result<ManifestStream> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let module = current_module()?;
            Ok(ManifestStream::optional(vec![
                Some(ManifestLike::from(json!({
                    "apiVersion": "v1",
                    "kind": "ConfigMap",
                    "metadata": {"name": module.name.clone()}
                }))),
                None,
            ]))
        }
    }

    struct Failing;

    #[async_trait]
    impl ModuleDefinition for Failing {
        fn name(&self) -> Option<&str> {
            Some("failing")
        }

        async fn objects(&self) -> anyhow::Result<ManifestStream> {
            anyhow::bail!("chart repository unreachable")
        }

        async fn images(&self) -> anyhow::Result<Vec<Image>> {
            Err(TranspireError::invalid_output("failing", "images is not a list").into())
        }
    }

    fn config() -> Arc<ClusterConfig> {
        Arc::new(ClusterConfig::from_toml_str(MINIMAL, ".").unwrap())
    }

    #[test]
    fn test_name_validation() {
        let missing = Counting {
            name: None,
            calls: AtomicUsize::new(0),
        };
        assert!(matches!(
            Module::new(Arc::new(missing), config(), None),
            Err(TranspireError::InvalidModule(_))
        ));
        assert!(Module::new(Arc::new(Counting::named("")), config(), None).is_err());
        assert!(Module::new(Arc::new(Counting::named("base")), config(), None).is_err());
        assert!(Module::new(Arc::new(Counting::named("echo")), config(), Some("other")).is_err());

        let module = Module::new(Arc::new(Counting::named("echo")), config(), Some("echo")).unwrap();
        assert_eq!(module.namespace(), "echo");
        assert_eq!(module.revision(), None);
        let module = module.with_revision(Some("abc123".to_string()));
        assert_eq!(module.revision(), Some("abc123"));
    }

    #[tokio::test]
    async fn test_objects_memoized_and_context_bound() {
        let definition = Arc::new(Counting::named("echo"));
        let module = Module::new(definition.clone(), config(), None).unwrap();

        let first = module.objects().await.unwrap().to_vec();
        let second = module.objects().await.unwrap().to_vec();
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0]["metadata"]["name"], "echo");
        assert_eq!(definition.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_entry_point_errors() {
        let module = Module::new(Arc::new(Failing), config(), None).unwrap();

        let err = module.objects().await.unwrap_err();
        assert!(
            matches!(&err, TranspireError::ModuleBuildFailed { module, .. } if module == "failing")
        );

        let err = module.images().await.unwrap_err();
        assert!(matches!(err, TranspireError::InvalidModuleOutput { .. }));

        assert!(module.pipeline().await.unwrap().is_empty());
    }
}
