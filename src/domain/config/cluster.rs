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

//! Cluster configuration (`cluster.toml`)

use crate::shared::error::{Result, TranspireError};
use crate::shared::validation::is_valid_dns_name;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const RESERVED_MODULE_NAME: &str = "base";

/// Global build configuration, read-only once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ClusterConfig {
    /// Where remote module checkouts live. Defaults to the user cache dir.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    pub secrets: SecretsConfig,
    #[serde(default)]
    pub defaults: EnvironmentDefaults,
    pub argocd: ArgoConfig,
    #[serde(default)]
    pub modules: BTreeMap<String, ModuleSource>,
    /// Directory local module paths are relative to.
    #[serde(skip)]
    pub root: PathBuf,
}

impl ClusterConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TranspireError::config_error(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let root = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::from_toml_str(&content, root)
    }

    pub fn from_toml_str(content: &str, root: impl Into<PathBuf>) -> Result<Self> {
        let mut config: Self = toml::from_str(content)
            .map_err(|e| TranspireError::config_error(format!("Failed to parse TOML: {}", e)))?;
        config.root = root.into();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for name in self.modules.keys() {
            if name == RESERVED_MODULE_NAME {
                return Err(TranspireError::config_error(format!(
                    "module name '{}' is reserved",
                    RESERVED_MODULE_NAME
                )));
            }
            if !is_valid_dns_name(name) {
                return Err(TranspireError::config_error(format!(
                    "module name '{}' is not a valid DNS label",
                    name
                )));
            }
        }

        match self.secrets.provider {
            SecretsProviderKind::Vault if self.secrets.vault.is_none() => Err(
                TranspireError::config_error("secrets.provider is 'vault' but [secrets.vault] is missing"),
            ),
            SecretsProviderKind::SealedSecrets if self.secrets.sealed_secrets.is_none() => {
                Err(TranspireError::config_error(
                    "secrets.provider is 'sealed-secrets' but [secrets.sealed_secrets] is missing",
                ))
            }
            _ => Ok(()),
        }?;

        if self.argocd.repo_url.trim().is_empty() {
            return Err(TranspireError::config_error("argocd.repo_url must not be empty"));
        }

        Ok(())
    }

    pub fn module_source(&self, name: &str) -> Result<&ModuleSource> {
        self.modules.get(name).ok_or_else(|| {
            TranspireError::config_error(format!("module '{}' is not configured", name))
        })
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("transpire")
        })
    }
}

/// Where a module's code comes from. Exactly one of `path` or `git` is set in
/// the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawModuleSource", into = "RawModuleSource")]
pub enum ModuleSource {
    Local { path: PathBuf },
    Remote(RemoteSource),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSource {
    pub git: String,
    pub branch: Option<String>,
    pub dir: Option<PathBuf>,
    pub commit: Option<String>,
}

impl RemoteSource {
    pub fn new(git: impl Into<String>) -> Self {
        Self {
            git: git.into(),
            branch: None,
            dir: None,
            commit: None,
        }
    }

    /// `git clone` arguments that fetch this source into the working directory.
    pub fn clone_args(&self) -> Vec<String> {
        let mut args = vec!["clone".to_string()];
        if self.commit.is_none() {
            args.extend(["--depth".to_string(), "1".to_string()]);
        }
        if let Some(branch) = &self.branch {
            args.extend(["--branch".to_string(), branch.clone()]);
        }
        args.push(self.git.clone());
        args
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawModuleSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    git: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    commit: Option<String>,
}

impl TryFrom<RawModuleSource> for ModuleSource {
    type Error = String;

    fn try_from(raw: RawModuleSource) -> std::result::Result<Self, Self::Error> {
        match (raw.path, raw.git) {
            (Some(path), None) => {
                if raw.branch.is_some() || raw.dir.is_some() || raw.commit.is_some() {
                    return Err("'branch', 'dir' and 'commit' only apply to git modules".into());
                }
                Ok(Self::Local { path })
            }
            (None, Some(git)) => Ok(Self::Remote(RemoteSource {
                git,
                branch: raw.branch,
                dir: raw.dir,
                commit: raw.commit,
            })),
            (Some(_), Some(_)) => Err("a module source sets both 'path' and 'git'".into()),
            (None, None) => Err("a module source needs either 'path' or 'git'".into()),
        }
    }
}

impl From<ModuleSource> for RawModuleSource {
    fn from(source: ModuleSource) -> Self {
        match source {
            ModuleSource::Local { path } => Self {
                path: Some(path),
                ..Default::default()
            },
            ModuleSource::Remote(remote) => Self {
                path: None,
                git: Some(remote.git),
                branch: remote.branch,
                dir: remote.dir,
                commit: remote.commit,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecretsProviderKind {
    Vault,
    SealedSecrets,
}

impl std::str::FromStr for SecretsProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "vault" => Ok(Self::Vault),
            "sealed-secrets" | "bitnami" => Ok(Self::SealedSecrets),
            other => Err(format!("unknown secrets provider '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretsConfig {
    pub provider: SecretsProviderKind,
    #[serde(default)]
    pub vault: Option<VaultConfig>,
    #[serde(default)]
    pub sealed_secrets: Option<SealedSecretsConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// KV mount secrets are stored under, e.g. `kvv2`.
    pub kvstore: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealedSecretsConfig {
    pub cert_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentDefaults {
    pub ingress_class: String,
    pub certificate_issuer: Option<String>,
    pub registry: Option<String>,
    pub storage_class: Option<String>,
}

impl Default for EnvironmentDefaults {
    fn default() -> Self {
        Self {
            ingress_class: "nginx".to_string(),
            certificate_issuer: None,
            registry: None,
            storage_class: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArgoConfig {
    pub repo_url: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_argocd_namespace")]
    pub namespace: String,
    #[serde(default = "default_project")]
    pub project: String,
    #[serde(default)]
    pub auto_sync: bool,
}

fn default_branch() -> String {
    "HEAD".to_string()
}

fn default_argocd_namespace() -> String {
    "argocd".to_string()
}

fn default_project() -> String {
    "default".to_string()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const MINIMAL: &str = r#"
[secrets]
provider = "vault"

[secrets.vault]
kvstore = "kvv2"

[argocd]
repo_url = "https://github.com/example/cluster.git"
"#;

    #[test]
    fn test_minimal_config_defaults() {
        let config = ClusterConfig::from_toml_str(MINIMAL, "/repo").unwrap();
        assert_eq!(config.defaults.ingress_class, "nginx");
        assert_eq!(config.argocd.branch, "HEAD");
        assert_eq!(config.argocd.namespace, "argocd");
        assert!(!config.argocd.auto_sync);
        assert!(config.modules.is_empty());
        assert_eq!(config.root, PathBuf::from("/repo"));
    }

    #[test]
    fn test_module_sources() {
        let content = format!(
            r#"{MINIMAL}
[modules.echoserver]
path = "modules/echoserver"

[modules.remote-app]
git = "https://github.com/example/remote-app.git"
branch = "main"
dir = "deploy"
commit = "0123abc"
"#
        );
        let config = ClusterConfig::from_toml_str(&content, ".").unwrap();
        assert_eq!(
            config.module_source("echoserver").unwrap(),
            &ModuleSource::Local {
                path: PathBuf::from("modules/echoserver")
            }
        );
        match config.module_source("remote-app").unwrap() {
            ModuleSource::Remote(remote) => {
                assert_eq!(remote.branch.as_deref(), Some("main"));
                assert_eq!(remote.dir, Some(PathBuf::from("deploy")));
                assert_eq!(remote.commit.as_deref(), Some("0123abc"));
            }
            other => panic!("unexpected source {other:?}"),
        }
        assert!(config.module_source("missing").is_err());
    }

    #[test]
    fn test_module_source_needs_exactly_one_variant() {
        let both = format!("{MINIMAL}\n[modules.x]\npath = \"a\"\ngit = \"https://b\"\n");
        assert!(ClusterConfig::from_toml_str(&both, ".").is_err());

        let neither = format!("{MINIMAL}\n[modules.x]\nbranch = \"main\"\n");
        assert!(ClusterConfig::from_toml_str(&neither, ".").is_err());
    }

    #[test]
    fn test_reserved_and_invalid_module_names() {
        let base = format!("{MINIMAL}\n[modules.base]\npath = \"a\"\n");
        assert!(matches!(
            ClusterConfig::from_toml_str(&base, "."),
            Err(TranspireError::ConfigError(_))
        ));
        let upper = format!("{MINIMAL}\n[modules.Echo]\npath = \"a\"\n");
        assert!(ClusterConfig::from_toml_str(&upper, ".").is_err());
    }

    #[test]
    fn test_provider_requires_parameters() {
        let content = r#"
[secrets]
provider = "sealed-secrets"

[argocd]
repo_url = "https://github.com/example/cluster.git"
"#;
        let err = ClusterConfig::from_toml_str(content, ".").unwrap_err();
        assert!(err.to_string().contains("sealed_secrets"));
    }

    #[test]
    fn test_clone_args() {
        let mut remote = RemoteSource::new("https://example.com/app.git");
        remote.branch = Some("main".to_string());
        assert_eq!(
            remote.clone_args(),
            ["clone", "--depth", "1", "--branch", "main", "https://example.com/app.git"]
        );
        remote.commit = Some("abc".to_string());
        assert_eq!(
            remote.clone_args(),
            ["clone", "--branch", "main", "https://example.com/app.git"]
        );
    }
}
