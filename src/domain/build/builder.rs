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

use super::report::{BuildReport, ModuleOutcome};
use crate::domain::config::{ClusterConfig, ModuleSource};
use crate::domain::manifest::Manifest;
use crate::domain::module::{Module, ModuleEvaluator, ModuleInfo};
use crate::infrastructure::git::{RepoCache, RepoLocks};
use crate::infrastructure::output::{ManifestWriter, WriteSummary};
use crate::shared::error::{Result, TranspireError};
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tracing::{error, info};

/// Builds the modules of a cluster configuration into an output tree.
///
/// Modules are built one after another. A failing module is recorded in the
/// report and does not stop the others.
#[derive(Debug, Clone)]
pub struct ClusterBuilder {
    config: Arc<ClusterConfig>,
    cache: RepoCache,
    locks: RepoLocks,
    evaluator: ModuleEvaluator,
}

impl ClusterBuilder {
    pub fn new(config: Arc<ClusterConfig>) -> Self {
        Self {
            cache: RepoCache::from_config(&config),
            locks: RepoLocks::new(),
            evaluator: ModuleEvaluator::new(config.clone()),
            config,
        }
    }

    pub fn with_cache(mut self, cache: RepoCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &Arc<ClusterConfig> {
        &self.config
    }

    pub fn evaluator(&self) -> &ModuleEvaluator {
        &self.evaluator
    }

    pub fn module_names(&self) -> Vec<String> {
        self.config.modules.keys().cloned().collect()
    }

    /// Resolve and load a configured module. `pinned` overrides the commit
    /// from the configuration for remote modules.
    pub async fn load_module(&self, name: &str, pinned: Option<&str>) -> Result<Module> {
        let (module, _guard) = self.load_locked(name, pinned).await?;
        Ok(module)
    }

    /// Like [`load_module`](Self::load_module), but a remote module comes
    /// back with the lock on its checkout. `file` sources are read from the
    /// checkout during evaluation, so the guard must outlive it.
    async fn load_locked(
        &self,
        name: &str,
        pinned: Option<&str>,
    ) -> Result<(Module, Option<OwnedMutexGuard<()>>)> {
        match self.config.module_source(name)? {
            ModuleSource::Local { path } => {
                let dir = self.config.root.join(path);
                Ok((self.evaluator.load_dir(&dir, Some(name))?, None))
            }
            ModuleSource::Remote(remote) => {
                let guard = self.locks.acquire(&remote.git).await;
                let checkout = self
                    .cache
                    .resolve(remote, pinned.or(remote.commit.as_deref()))
                    .await?;
                let dir = match &remote.dir {
                    Some(dir) => checkout.path.join(dir),
                    None => checkout.path.clone(),
                };
                let module = self
                    .evaluator
                    .load_dir(&dir, Some(name))?
                    .with_source(remote.clone())
                    .with_revision(Some(checkout.commit));
                Ok((module, Some(guard)))
            }
        }
    }

    /// Build every configured module, or only `only`, and regenerate the
    /// Application descriptors.
    ///
    /// Building everything rewrites `base/` from scratch, except that a
    /// module which failed to load keeps its existing descriptor. Building one
    /// module only updates that module's descriptor.
    pub async fn build(&self, writer: &ManifestWriter, only: Option<&str>) -> Result<BuildReport> {
        let names = match only {
            Some(name) => {
                self.config.module_source(name)?;
                vec![name.to_string()]
            }
            None => self.module_names(),
        };

        tokio::fs::create_dir_all(writer.output()).await?;

        let mut report = BuildReport::default();
        for name in names {
            info!("Building {}", name);
            let outcome = self.build_module(&name, writer).await;
            if let Err(e) = &outcome.result {
                error!("Module {} failed: {}", name, e);
            }
            report.outcomes.push(outcome);
        }

        let loaded: Vec<ModuleInfo> = report
            .outcomes
            .iter()
            .filter_map(|o| o.info.clone())
            .collect();
        let unloaded: Vec<String> = report
            .outcomes
            .iter()
            .filter(|o| o.info.is_none())
            .map(|o| o.name.clone())
            .collect();

        info!("Writing bases");
        if only.is_some() {
            for module in &loaded {
                writer.write_base(module, &self.config.argocd).await?;
            }
        } else {
            report.bases = Some(
                writer
                    .write_bases(&loaded, &unloaded, &self.config.argocd)
                    .await?,
            );
        }

        Ok(report)
    }

    async fn build_module(&self, name: &str, writer: &ManifestWriter) -> ModuleOutcome {
        let (module, _guard) = match self.load_locked(name, None).await {
            Ok(loaded) => loaded,
            Err(e) => {
                return ModuleOutcome {
                    name: name.to_string(),
                    info: None,
                    result: Err(e),
                }
            }
        };

        let info = module.info().as_ref().clone();
        let result = self.write_module(&module, writer).await;
        ModuleOutcome {
            name: name.to_string(),
            info: Some(info),
            result,
        }
    }

    async fn write_module(&self, module: &Module, writer: &ManifestWriter) -> Result<WriteSummary> {
        let manifests = self.evaluator.evaluate(module).await?;
        writer.write(module.info(), manifests).await
    }

    /// Load and evaluate a single module.
    pub async fn objects(&self, name: &str) -> Result<(Module, Vec<Manifest>)> {
        let (module, _guard) = self.load_locked(name, None).await?;
        let objects = self.evaluator.evaluate(&module).await?;
        Ok((module, objects))
    }

    /// Ensure `name` is configured as a git module.
    pub fn require_remote(&self, name: &str) -> Result<()> {
        match self.config.module_source(name)? {
            ModuleSource::Remote(_) => Ok(()),
            ModuleSource::Local { .. } => Err(TranspireError::config_error(format!(
                "module '{}' is not a git module",
                name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use std::time::Duration;

    fn git(dir: &std::path::Path, args: &[&str]) {
        let status = Command::new("git")
            .args(["-c", "user.name=Transpire Test", "-c", "user.email=test@example.org"])
            .args(["-c", "commit.gpgsign=false"])
            .args(args)
            .current_dir(dir)
            .status()
            .unwrap();
        assert!(status.success(), "git {:?} failed", args);
    }

    #[tokio::test]
    async fn test_checkout_lock_outlives_loading() {
        if which::which("git").is_err() {
            return;
        }
        let upstream = tempfile::tempdir().unwrap();
        git(upstream.path(), &["init", "-q", "-b", "main"]);
        std::fs::write(
            upstream.path().join(".transpire.yaml"),
            "name: remote-app\nobjects: []\n",
        )
        .unwrap();
        git(upstream.path(), &["add", "-A"]);
        git(upstream.path(), &["commit", "-q", "-m", "init"]);
        let url = format!("file://{}", upstream.path().display());

        let root = tempfile::tempdir().unwrap();
        let config = ClusterConfig::from_toml_str(
            &format!(
                r#"
cache_dir = "{cache}"

[secrets]
provider = "vault"

[secrets.vault]
kvstore = "kvv2"

[argocd]
repo_url = "https://github.com/example/cluster.git"

[modules.remote-app]
git = "{url}"
branch = "main"
"#,
                cache = root.path().join("cache").display(),
                url = url,
            ),
            root.path(),
        )
        .unwrap();
        let builder = ClusterBuilder::new(Arc::new(config));

        let (module, guard) = builder.load_locked("remote-app", None).await.unwrap();
        assert!(guard.is_some());
        assert!(builder.evaluator.evaluate(&module).await.unwrap().is_empty());

        let blocked =
            tokio::time::timeout(Duration::from_millis(50), builder.locks.acquire(&url)).await;
        assert!(blocked.is_err());

        drop(guard);
        let free =
            tokio::time::timeout(Duration::from_millis(50), builder.locks.acquire(&url)).await;
        assert!(free.is_ok());
    }
}
