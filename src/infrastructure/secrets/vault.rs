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

use super::{secret_name, secret_namespace, ConvertSecret};
use crate::domain::manifest::Manifest;
use crate::infrastructure::process;
use crate::shared::error::{Result, TranspireError};
use async_trait::async_trait;
use base64::Engine;
use serde_json::{json, Map, Value};
use tracing::info;

pub const VAULT_SECRET_API_VERSION: &str = "ricoberger.de/v1alpha1";
pub const VAULT_SECRET_KIND: &str = "VaultSecret";

/// Secrets live in Vault under `<kvstore>/<namespace>/<name>` and are synced
/// into the cluster by vault-secrets-operator.
#[derive(Debug, Clone)]
pub struct VaultProvider {
    kvstore: String,
}

impl VaultProvider {
    pub fn new(kvstore: impl Into<String>) -> Self {
        Self {
            kvstore: kvstore.into(),
        }
    }

    pub fn secret_path(&self, namespace: &str, name: &str) -> String {
        format!("{}/{}/{}", self.kvstore, namespace, name)
    }

    /// Decoded `data` merged with `stringData`; `stringData` wins.
    fn secret_values(secret: &Manifest) -> Result<Map<String, Value>> {
        let mut values = Map::new();
        if let Some(data) = secret.get("data").and_then(Value::as_object) {
            for (key, value) in data {
                let encoded = value.as_str().unwrap_or_default();
                let decoded = base64::engine::general_purpose::STANDARD
                    .decode(encoded)
                    .map_err(|e| {
                        TranspireError::UnsupportedManifestType(format!(
                            "data.{} is not valid base64: {}",
                            key, e
                        ))
                    })?;
                let text = String::from_utf8(decoded).map_err(|_| {
                    TranspireError::UnsupportedManifestType(format!(
                        "data.{} is not valid UTF-8",
                        key
                    ))
                })?;
                values.insert(key.clone(), Value::String(text));
            }
        }
        if let Some(string_data) = secret.get("stringData").and_then(Value::as_object) {
            for (key, value) in string_data {
                values.insert(key.clone(), value.clone());
            }
        }
        Ok(values)
    }
}

#[async_trait]
impl ConvertSecret for VaultProvider {
    fn encrypted_kind(&self) -> &'static str {
        VAULT_SECRET_KIND
    }

    async fn convert(&self, secret: &Manifest, namespace: &str) -> Result<Manifest> {
        let name = secret_name(secret)?;
        let namespace = secret_namespace(secret, namespace);

        let keys: Vec<&String> = ["data", "stringData"]
            .iter()
            .filter_map(|field| secret.get(*field).and_then(Value::as_object))
            .flat_map(|map| map.keys())
            .collect();

        let mut metadata = json!({ "name": name });
        if secret.pointer("/metadata/namespace").is_some() {
            metadata["namespace"] = json!(namespace);
        }

        Ok(json!({
            "apiVersion": VAULT_SECRET_API_VERSION,
            "kind": VAULT_SECRET_KIND,
            "metadata": metadata,
            "spec": {
                "keys": keys,
                "path": self.secret_path(namespace, name),
                "type": "Opaque",
            },
        }))
    }

    async fn push(&self, secret: &Manifest, namespace: &str) -> Result<()> {
        let name = secret_name(secret)?;
        let path = self.secret_path(secret_namespace(secret, namespace), name);
        let values = Self::secret_values(secret)?;

        process::ensure_tool("vault")?;
        // Values go through stdin so they never show up in the process list.
        let payload = serde_json::to_vec(&values)?;
        process::run("vault", ["kv", "put", path.as_str(), "-"], None, Some(&payload)).await?;
        info!("Pushed {} keys to {}", values.len(), path);
        Ok(())
    }
}
