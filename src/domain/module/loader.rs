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

//! Declarative modules loaded from a `.transpire.yaml` file.

use super::context::{current_module, global_config};
use super::definition::{Image, ModuleDefinition, PipelineTask};
use crate::domain::config::ClusterConfig;
use crate::domain::manifest::coerce::value_type_name;
use crate::domain::manifest::{
    coerce, edit_manifests, make_edit_manifest, parse_documents, EditFn, EditKey, Edits, Manifest,
    ManifestLike, ManifestStream, ToManifest,
};
use crate::infrastructure::kubernetes::resources::{DeploymentSpec, IngressSpec, ServiceSpec};
use crate::infrastructure::render::helm::HelmChart;
use crate::infrastructure::render::kustomize::Kustomization;
use crate::shared::error::{Result, TranspireError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

pub const MODULE_FILE: &str = ".transpire.yaml";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModuleFile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    images: Value,
    #[serde(default)]
    pipeline: Value,
    #[serde(default)]
    objects: Value,
    #[serde(default)]
    edits: Vec<EditSpec>,
}

/// One entry of `objects`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ObjectSource {
    Inline(Value),
    File(PathBuf),
    Helm(HelmChart),
    Kustomize(Kustomization),
    Deployment(DeploymentSpec),
    Service(ServiceSpec),
    Ingress(IngressSpec),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct EditSpec {
    kind: String,
    name: String,
    #[serde(default)]
    api_version: Option<String>,
    #[serde(default)]
    set: EditSet,
    #[serde(default)]
    create_parents: bool,
    #[serde(default)]
    delete: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum EditSet {
    Paths(Map<String, Value>),
    Pairs(Vec<EditPair>),
}

impl Default for EditSet {
    fn default() -> Self {
        Self::Paths(Map::new())
    }
}

impl EditSet {
    fn is_empty(&self) -> bool {
        match self {
            Self::Paths(map) => map.is_empty(),
            Self::Pairs(pairs) => pairs.is_empty(),
        }
    }

    fn into_pairs(self) -> Vec<(Vec<String>, Value)> {
        match self {
            Self::Paths(map) => map
                .into_iter()
                .map(|(path, value)| (EditPath::Dotted(path).into_segments(), value))
                .collect(),
            Self::Pairs(pairs) => pairs
                .into_iter()
                .map(|pair| (pair.path.into_segments(), pair.value))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct EditPair {
    path: EditPath,
    value: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum EditPath {
    Segments(Vec<String>),
    Dotted(String),
}

impl EditPath {
    fn into_segments(self) -> Vec<String> {
        match self {
            Self::Segments(segments) => segments,
            Self::Dotted(path) if path.is_empty() => Vec::new(),
            Self::Dotted(path) => split_dotted(&path),
        }
    }
}

/// Split a dotted path on unescaped `.`. `\.` is a literal dot and `\\` a
/// literal backslash, so `metadata.annotations.cert-manager\.io/issuer`
/// addresses an annotation key containing a dot.
fn split_dotted(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(next @ ('.' | '\\')) => current.push(next),
                Some(next) => {
                    current.push('\\');
                    current.push(next);
                }
                None => current.push('\\'),
            },
            '.' => segments.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    segments.push(current);
    segments
}

/// A module described by a `.transpire.yaml` file in `root`.
#[derive(Debug, Clone)]
pub struct DeclarativeModule {
    root: PathBuf,
    file: ModuleFile,
}

impl DeclarativeModule {
    pub fn load(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let path = root.join(MODULE_FILE);
        if !path.is_file() {
            return Err(TranspireError::invalid_module(format!(
                "no {} found in {}",
                MODULE_FILE,
                root.display()
            )));
        }
        let content = std::fs::read_to_string(&path)?;
        Self::from_yaml(&content, root)
    }

    pub fn from_yaml(content: &str, root: impl Into<PathBuf>) -> Result<Self> {
        // Go through serde_json so sources use the `{kind: body}` map form.
        let value: Value = serde_yaml::from_str(content)?;
        let file: ModuleFile = serde_json::from_value(value)
            .map_err(|e| TranspireError::invalid_module(format!("{}: {}", MODULE_FILE, e)))?;
        Ok(Self {
            root: root.into(),
            file,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn edits(&self, module: &str) -> Result<Edits> {
        let mut edits = Edits::new();
        for spec in self.file.edits.iter().cloned() {
            let key = match spec.api_version {
                Some(api_version) => EditKey::qualified(api_version, spec.kind, spec.name),
                None => EditKey::new(spec.kind, spec.name),
            };
            if spec.delete && !spec.set.is_empty() {
                return Err(TranspireError::invalid_output(
                    module,
                    format!("edit for {} both deletes and sets fields", key),
                ));
            }
            let edit: EditFn = if spec.delete {
                Box::new(|_| Ok(None))
            } else {
                make_edit_manifest(spec.set.into_pairs(), spec.create_parents)
            };
            if edits.contains_key(&key) {
                return Err(TranspireError::invalid_output(
                    module,
                    format!("more than one edit for {}", key),
                ));
            }
            edits.insert(key, edit);
        }
        Ok(edits)
    }

    /// Resolve a module-relative file, refusing paths that leave the module.
    fn module_file(&self, module: &str, path: &Path) -> Result<PathBuf> {
        let escapes = path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(TranspireError::invalid_output(
                module,
                format!("file source '{}' must stay inside the module", path.display()),
            ));
        }
        Ok(self.root.join(path))
    }

    async fn render(
        &self,
        module: &str,
        config: &ClusterConfig,
        source: ObjectSource,
    ) -> Result<Vec<Manifest>> {
        let manifests = match source {
            ObjectSource::Inline(value) => vec![coerce(ManifestLike::Value(value))?],
            ObjectSource::File(path) => {
                let path = self.module_file(module, &path)?;
                debug!("Reading manifests from {}", path.display());
                parse_documents(&tokio::fs::read_to_string(&path).await?)?
            }
            ObjectSource::Helm(chart) => chart.render(&config.cache_dir()).await?,
            ObjectSource::Kustomize(kustomization) => kustomization.render().await?,
            ObjectSource::Deployment(spec) => vec![spec.build()?.to_manifest()?],
            ObjectSource::Service(spec) => vec![spec.build()?.to_manifest()?],
            ObjectSource::Ingress(spec) => vec![spec.build()?.to_manifest()?],
        };
        Ok(manifests)
    }
}

fn list_entry<T: DeserializeOwned>(module: &str, field: &str, value: &Value) -> Result<Vec<T>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(_) => serde_json::from_value(value.clone())
            .map_err(|e| TranspireError::invalid_output(module, format!("'{}': {}", field, e))),
        other => Err(TranspireError::invalid_output(
            module,
            format!("'{}' must be a sequence, got {}", field, value_type_name(other)),
        )),
    }
}

#[async_trait]
impl ModuleDefinition for DeclarativeModule {
    fn name(&self) -> Option<&str> {
        self.file.name.as_deref()
    }

    fn namespace(&self) -> Option<&str> {
        self.file.namespace.as_deref()
    }

    async fn objects(&self) -> anyhow::Result<ManifestStream> {
        let module = current_module()?;
        let config = global_config()?;

        let sources = match &self.file.objects {
            Value::Null => Vec::new(),
            Value::Array(items) => items.clone(),
            single @ Value::Object(_) => vec![single.clone()],
            other => {
                return Err(TranspireError::invalid_output(
                    &module.name,
                    format!(
                        "'objects' must be a sequence of sources, got {}",
                        value_type_name(other)
                    ),
                )
                .into())
            }
        };

        let mut manifests = Vec::new();
        for (idx, source) in sources.into_iter().enumerate() {
            let source: ObjectSource = serde_json::from_value(source).map_err(|e| {
                TranspireError::invalid_output(&module.name, format!("objects[{}]: {}", idx, e))
            })?;
            manifests.extend(self.render(&module.name, &config, source).await?);
        }

        let edits = self.edits(&module.name)?;
        if !edits.is_empty() {
            manifests = edit_manifests(&edits, manifests)?;
        }

        debug!("Module {} produced {} manifests", module.name, manifests.len());
        Ok(ManifestStream::from(manifests))
    }

    async fn images(&self) -> anyhow::Result<Vec<Image>> {
        let module = current_module()?;
        Ok(list_entry(&module.name, "images", &self.file.images)?)
    }

    async fn pipeline(&self) -> anyhow::Result<Vec<PipelineTask>> {
        let module = current_module()?;
        Ok(list_entry(&module.name, "pipeline", &self.file.pipeline)?)
    }
}
