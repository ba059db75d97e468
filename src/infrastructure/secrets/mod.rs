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

//! Secret material providers.
//!
//! Plain `v1/Secret` objects never reach the output tree. The active provider
//! turns them into an object that is safe to commit, and can push the secret
//! values to wherever that object expects to find them.

pub mod sealed;
pub mod vault;

use crate::domain::config::{ClusterConfig, SecretsProviderKind};
use crate::domain::manifest::Manifest;
use crate::shared::error::{Result, TranspireError};
use async_trait::async_trait;

pub use sealed::SealedSecretsProvider;
pub use vault::VaultProvider;

#[async_trait]
pub trait ConvertSecret: Send + Sync {
    /// Kind of the objects `convert` produces.
    fn encrypted_kind(&self) -> &'static str;

    /// Replace a `v1/Secret` with its committed form. `namespace` is used when
    /// the secret does not name one.
    async fn convert(&self, secret: &Manifest, namespace: &str) -> Result<Manifest>;

    /// Store the secret's values with the provider.
    async fn push(&self, secret: &Manifest, namespace: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub enum SecretsProvider {
    Vault(VaultProvider),
    SealedSecrets(SealedSecretsProvider),
}

impl SecretsProvider {
    pub fn from_config(config: &ClusterConfig) -> Result<Self> {
        match config.secrets.provider {
            SecretsProviderKind::Vault => {
                let vault = config.secrets.vault.as_ref().ok_or_else(|| {
                    TranspireError::config_error("[secrets.vault] is required for vault")
                })?;
                Ok(Self::Vault(VaultProvider::new(vault.kvstore.clone())))
            }
            SecretsProviderKind::SealedSecrets => {
                let sealed = config.secrets.sealed_secrets.as_ref().ok_or_else(|| {
                    TranspireError::config_error(
                        "[secrets.sealed_secrets] is required for sealed-secrets",
                    )
                })?;
                Ok(Self::SealedSecrets(SealedSecretsProvider::new(
                    config.root.join(&sealed.cert_path),
                )))
            }
        }
    }

    fn inner(&self) -> &dyn ConvertSecret {
        match self {
            Self::Vault(provider) => provider,
            Self::SealedSecrets(provider) => provider,
        }
    }
}

#[async_trait]
impl ConvertSecret for SecretsProvider {
    fn encrypted_kind(&self) -> &'static str {
        self.inner().encrypted_kind()
    }

    async fn convert(&self, secret: &Manifest, namespace: &str) -> Result<Manifest> {
        self.inner().convert(secret, namespace).await
    }

    async fn push(&self, secret: &Manifest, namespace: &str) -> Result<()> {
        self.inner().push(secret, namespace).await
    }
}

/// `metadata.name` of a secret, required by every provider.
pub(crate) fn secret_name(secret: &Manifest) -> Result<&str> {
    secret
        .pointer("/metadata/name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| TranspireError::UnsupportedManifestType("Secret has no metadata.name".into()))
}

pub(crate) fn secret_namespace<'a>(secret: &'a Manifest, default: &'a str) -> &'a str {
    secret
        .pointer("/metadata/namespace")
        .and_then(|v| v.as_str())
        .unwrap_or(default)
}
