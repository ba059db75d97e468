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

use super::argocd::make_app;
use super::postprocess::Postprocessor;
use crate::domain::config::ArgoConfig;
use crate::domain::manifest::{Manifest, ManifestIdentity};
use crate::domain::module::ModuleInfo;
use crate::infrastructure::constants::BASE_DIR;
use crate::shared::error::{Result, TranspireError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Outcome of writing one output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub path: PathBuf,
    pub written: usize,
    pub preserved: usize,
}

/// Writes each module's manifests to `<output>/<module>/`, one file per object.
#[derive(Debug, Clone)]
pub struct ManifestWriter {
    output: PathBuf,
    postprocessor: Postprocessor,
}

impl ManifestWriter {
    pub fn new(output: impl Into<PathBuf>, postprocessor: Postprocessor) -> Self {
        Self {
            output: output.into(),
            postprocessor,
        }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn module_dir(&self, module: &str) -> PathBuf {
        self.output.join(module)
    }

    /// Postprocess every manifest of a module. All failures are collected and
    /// logged before the error is returned.
    pub async fn postprocess_all(
        &self,
        module: &ModuleInfo,
        manifests: Vec<Manifest>,
    ) -> Result<Vec<Manifest>> {
        let mut processed = Vec::with_capacity(manifests.len());
        let mut errors = Vec::new();

        for manifest in manifests {
            match self.postprocessor.postprocess(manifest, &module.namespace).await {
                Ok(manifest) => processed.push(manifest),
                Err(err) => {
                    error!("Error processing object {}: {}", err.object, err.message);
                    if let Some(suggestion) = &err.suggestion {
                        match serde_yaml::to_string(suggestion) {
                            Ok(yaml) => info!("Suggested replacement:\n{}", yaml),
                            Err(e) => debug!("Could not render suggestion: {}", e),
                        }
                    }
                    errors.push(err);
                }
            }
        }

        if !errors.is_empty() {
            error!(
                "Errors encountered in module {}, manifests will not be written",
                module.name
            );
            return Err(TranspireError::ManifestErrors {
                module: module.name.clone(),
                errors,
            });
        }
        Ok(processed)
    }

    /// Replace `<output>/<module>/` with the module's manifests.
    ///
    /// Nothing is touched unless every manifest postprocesses cleanly. Objects
    /// of the provider's encrypted kind whose file already exists keep the
    /// existing file, so re-sealing does not churn the output.
    pub async fn write(&self, module: &ModuleInfo, manifests: Vec<Manifest>) -> Result<WriteSummary> {
        let processed = self.postprocess_all(module, manifests).await?;
        let dir = self.module_dir(&module.name);
        let encrypted_kind = self.postprocessor.encrypted_kind();

        let mut files: BTreeMap<String, String> = BTreeMap::new();
        let mut preserved: BTreeMap<String, Vec<u8>> = BTreeMap::new();

        for manifest in &processed {
            let identity = ManifestIdentity::of(manifest)?;
            let file_name = identity.file_name(&module.namespace);

            if identity.kind == encrypted_kind {
                let existing = dir.join(&file_name);
                if existing.is_file() {
                    debug!("Keeping existing {}", existing.display());
                    preserved.insert(file_name, tokio::fs::read(&existing).await?);
                    continue;
                }
            }

            if files.contains_key(&file_name) || preserved.contains_key(&file_name) {
                warn!("Duplicate object {} in module {}", identity, module.name);
            }
            files.insert(file_name, serde_yaml::to_string(manifest)?);
        }

        recreate_dir(&dir).await?;
        for (file_name, content) in &preserved {
            tokio::fs::write(dir.join(file_name), content).await?;
        }
        for (file_name, content) in &files {
            if preserved.contains_key(file_name) {
                continue;
            }
            tokio::fs::write(dir.join(file_name), content).await?;
        }

        info!(
            "Wrote {} manifests for {} to {}",
            files.len(),
            module.name,
            dir.display()
        );
        Ok(WriteSummary {
            path: dir,
            written: files.len(),
            preserved: preserved.len(),
        })
    }

    fn base_dir(&self) -> PathBuf {
        self.output.join(BASE_DIR)
    }

    /// Write (or overwrite) one module's Application into `<output>/base/`.
    pub async fn write_base(&self, module: &ModuleInfo, argo: &ArgoConfig) -> Result<PathBuf> {
        let dir = self.base_dir();
        tokio::fs::create_dir_all(&dir).await?;
        write_app(&dir, module, argo).await
    }

    /// Regenerate `<output>/base/` with an Application for every module.
    ///
    /// Descriptors already on disk for the modules named in `keep` survive the
    /// regeneration unchanged, so a module that could not be loaded this time
    /// keeps its Application.
    pub async fn write_bases(
        &self,
        modules: &[ModuleInfo],
        keep: &[String],
        argo: &ArgoConfig,
    ) -> Result<WriteSummary> {
        let dir = self.base_dir();
        let kept = read_apps(&dir, keep).await?;
        recreate_dir(&dir).await?;
        for module in modules {
            write_app(&dir, module, argo).await?;
        }
        for (file, contents) in &kept {
            tokio::fs::write(dir.join(file), contents).await?;
        }
        info!(
            "Wrote {} applications to {} ({} kept)",
            modules.len(),
            dir.display(),
            kept.len()
        );
        Ok(WriteSummary {
            path: dir,
            written: modules.len(),
            preserved: kept.len(),
        })
    }
}

/// Existing Application files in `dir` belonging to the `modules` given.
async fn read_apps(dir: &Path, modules: &[String]) -> Result<BTreeMap<String, Vec<u8>>> {
    let mut apps = BTreeMap::new();
    if modules.is_empty() || !dir.is_dir() {
        return Ok(apps);
    }
    let prefixes: Vec<String> = modules
        .iter()
        .map(|m| format!("{}_Application_", m))
        .collect();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let file = entry.file_name().to_string_lossy().into_owned();
        if prefixes.iter().any(|p| file.starts_with(p.as_str())) {
            apps.insert(file, tokio::fs::read(entry.path()).await?);
        }
    }
    Ok(apps)
}

async fn write_app(dir: &Path, module: &ModuleInfo, argo: &ArgoConfig) -> Result<PathBuf> {
    let app = make_app(&module.name, &module.namespace, argo)?;
    let identity = ManifestIdentity::of(&app)?;
    let path = dir.join(identity.file_name(&argo.namespace));
    tokio::fs::write(&path, serde_yaml::to_string(&app)?).await?;
    Ok(path)
}

async fn recreate_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        tokio::fs::remove_dir_all(dir).await?;
    }
    tokio::fs::create_dir_all(dir).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::manifest::parse_documents;
    use crate::infrastructure::secrets::{SecretsProvider, VaultProvider};
    use serde_json::json;

    fn writer(dir: &Path) -> ManifestWriter {
        let postprocessor =
            Postprocessor::new(SecretsProvider::Vault(VaultProvider::new("kvv2")), false);
        ManifestWriter::new(dir, postprocessor)
    }

    fn argo() -> ArgoConfig {
        ArgoConfig {
            repo_url: "https://github.com/example/cluster.git".to_string(),
            branch: "HEAD".to_string(),
            namespace: "argocd".to_string(),
            project: "default".to_string(),
            auto_sync: false,
        }
    }

    fn objects() -> Vec<Manifest> {
        vec![
            json!({"apiVersion": "v1", "kind": "Service", "metadata": {"name": "web"}}),
            json!({"apiVersion": "v1", "kind": "ConfigMap", "metadata": {"generateName": "cfg-", "namespace": "other"}}),
            json!({"apiVersion": "v1", "kind": "Secret", "metadata": {"name": "db"}, "stringData": {"password": "x"}}),
        ]
    }

    #[tokio::test]
    async fn test_write_layout() {
        let out = tempfile::tempdir().unwrap();
        let writer = writer(out.path());
        let module = ModuleInfo::new("echo", None);

        std::fs::create_dir_all(out.path().join("echo")).unwrap();
        std::fs::write(out.path().join("echo/stale_Service_echo.yaml"), "stale").unwrap();

        let summary = writer.write(&module, objects()).await.unwrap();
        assert_eq!(summary.written, 3);

        let dir = out.path().join("echo");
        assert!(dir.join("web_Service_echo.yaml").is_file());
        assert!(dir.join("cfg-_ConfigMap_other.yaml").is_file());
        assert!(!dir.join("stale_Service_echo.yaml").exists());

        let secret = std::fs::read_to_string(dir.join("db_VaultSecret_echo.yaml")).unwrap();
        let docs = parse_documents(&secret).unwrap();
        assert_eq!(docs[0]["spec"]["path"], "kvv2/echo/db");
    }

    #[tokio::test]
    async fn test_existing_encrypted_files_are_preserved() {
        let out = tempfile::tempdir().unwrap();
        let writer = writer(out.path());
        let module = ModuleInfo::new("echo", None);

        writer.write(&module, objects()).await.unwrap();
        let path = out.path().join("echo/db_VaultSecret_echo.yaml");
        std::fs::write(&path, "sealed: previously\n").unwrap();

        let summary = writer.write(&module, objects()).await.unwrap();
        assert_eq!(summary.preserved, 1);
        assert_eq!(summary.written, 2);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "sealed: previously\n");
    }

    #[tokio::test]
    async fn test_failures_write_nothing() {
        let out = tempfile::tempdir().unwrap();
        let writer = writer(out.path());
        let module = ModuleInfo::new("echo", None);

        std::fs::create_dir_all(out.path().join("echo")).unwrap();
        std::fs::write(out.path().join("echo/old_Service_echo.yaml"), "old").unwrap();

        let mut objects = objects();
        objects.push(json!({"apiVersion": "v1", "kind": "Secret", "metadata": {"name": "bad"}, "data": {"k": "plain text"}}));
        objects.push(json!({"apiVersion": "v1", "kind": "Secret", "metadata": {"name": "bad2"}, "data": {"k": "also plain"}}));

        match writer.write(&module, objects).await.unwrap_err() {
            TranspireError::ManifestErrors { module, errors } => {
                assert_eq!(module, "echo");
                assert_eq!(errors.len(), 2);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(out.path().join("echo/old_Service_echo.yaml").exists());
        assert!(!out.path().join("echo/web_Service_echo.yaml").exists());
    }

    #[tokio::test]
    async fn test_bases() {
        let out = tempfile::tempdir().unwrap();
        let writer = writer(out.path());
        let echo = ModuleInfo::new("echo", None);
        let web = ModuleInfo::new("web", Some("frontend".to_string()));

        let path = writer.write_base(&echo, &argo()).await.unwrap();
        assert_eq!(path, out.path().join("base/echo_Application_argocd.yaml"));

        std::fs::write(out.path().join("base/gone_Application_argocd.yaml"), "x").unwrap();
        let summary = writer.write_bases(&[echo, web], &[], &argo()).await.unwrap();
        assert_eq!(summary.written, 2);
        assert!(!out.path().join("base/gone_Application_argocd.yaml").exists());

        let app = std::fs::read_to_string(out.path().join("base/web_Application_argocd.yaml")).unwrap();
        let app = parse_documents(&app).unwrap();
        assert_eq!(app[0]["spec"]["destination"]["namespace"], "frontend");
    }

    #[tokio::test]
    async fn test_bases_keep_unloaded_modules() {
        let out = tempfile::tempdir().unwrap();
        let writer = writer(out.path());
        let echo = ModuleInfo::new("echo", None);
        let flaky = ModuleInfo::new("flaky", None);
        writer.write_bases(&[echo.clone(), flaky], &[], &argo()).await.unwrap();
        let before = std::fs::read(out.path().join("base/flaky_Application_argocd.yaml")).unwrap();

        let summary = writer
            .write_bases(&[echo], &["flaky".to_string()], &argo())
            .await
            .unwrap();
        assert_eq!(summary.written, 1);
        assert_eq!(summary.preserved, 1);
        let after = std::fs::read(out.path().join("base/flaky_Application_argocd.yaml")).unwrap();
        assert_eq!(before, after);
        assert!(out.path().join("base/echo_Application_argocd.yaml").exists());
    }
}
