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

use crate::domain::config::{ClusterConfig, SecretsProviderKind};
use crate::shared::error::{Result, TranspireError};
use std::collections::HashMap;
use std::path::PathBuf;

/// Parse dynamic configuration properties from -D key=value format
pub fn parse_dynamic_configs(configs: &[String]) -> Result<HashMap<String, String>> {
    let mut map = HashMap::new();

    for config in configs {
        let (key, value) = config.split_once('=').ok_or_else(|| {
            TranspireError::config_error(format!(
                "Invalid config format: '{}'. Expected 'key=value'",
                config
            ))
        })?;

        let key = key.trim();
        if key.is_empty() {
            return Err(TranspireError::config_error(format!(
                "Empty key in config: '{}'",
                config
            )));
        }

        map.insert(key.to_string(), value.trim().to_string());
    }

    Ok(map)
}

/// Apply `-D` overrides on top of a loaded cluster configuration, then
/// re-validate it.
pub fn apply_to_cluster_config(
    configs: &HashMap<String, String>,
    config: &mut ClusterConfig,
) -> Result<()> {
    for (key, value) in configs {
        match key.as_str() {
            "cache_dir" | "cache-dir" => config.cache_dir = Some(PathBuf::from(value)),
            "defaults.ingress_class" | "defaults.ingress-class" => {
                config.defaults.ingress_class = value.clone()
            }
            "defaults.certificate_issuer" | "defaults.certificate-issuer" => {
                config.defaults.certificate_issuer = non_empty(value)
            }
            "defaults.registry" => config.defaults.registry = non_empty(value),
            "defaults.storage_class" | "defaults.storage-class" => {
                config.defaults.storage_class = non_empty(value)
            }
            "argocd.repo_url" | "argocd.repo-url" => config.argocd.repo_url = value.clone(),
            "argocd.branch" => config.argocd.branch = value.clone(),
            "argocd.namespace" => config.argocd.namespace = value.clone(),
            "argocd.project" => config.argocd.project = value.clone(),
            "argocd.auto_sync" | "argocd.auto-sync" => {
                config.argocd.auto_sync = value.parse::<bool>().map_err(|_| {
                    TranspireError::config_error(format!(
                        "argocd.auto_sync expects true or false, got '{}'",
                        value
                    ))
                })?
            }
            "secrets.provider" => {
                config.secrets.provider = value
                    .parse::<SecretsProviderKind>()
                    .map_err(TranspireError::config_error)?
            }
            "secrets.vault.kvstore" => {
                config
                    .secrets
                    .vault
                    .get_or_insert_with(|| crate::domain::config::VaultConfig {
                        kvstore: String::new(),
                    })
                    .kvstore = value.clone()
            }
            "secrets.sealed_secrets.cert_path" | "secrets.sealed-secrets.cert-path" => {
                config.secrets.sealed_secrets = Some(crate::domain::config::SealedSecretsConfig {
                    cert_path: PathBuf::from(value),
                })
            }
            other => {
                return Err(TranspireError::config_error(format!(
                    "Unknown override key '{}'",
                    other
                )))
            }
        }
    }

    config.validate()
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
