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

use super::{secret_namespace, ConvertSecret};
use crate::domain::manifest::yaml::to_documents;
use crate::domain::manifest::{parse_documents, Manifest};
use crate::infrastructure::process;
use crate::shared::error::{Result, TranspireError};
use async_trait::async_trait;
use serde_json::json;
use std::path::{Path, PathBuf};

pub const SEALED_SECRET_KIND: &str = "SealedSecret";

/// Seals secrets offline with `kubeseal` against the controller's public
/// certificate.
#[derive(Debug, Clone)]
pub struct SealedSecretsProvider {
    cert_path: PathBuf,
}

impl SealedSecretsProvider {
    pub fn new(cert_path: impl Into<PathBuf>) -> Self {
        Self {
            cert_path: cert_path.into(),
        }
    }

    pub fn cert_path(&self) -> &Path {
        &self.cert_path
    }
}

#[async_trait]
impl ConvertSecret for SealedSecretsProvider {
    fn encrypted_kind(&self) -> &'static str {
        SEALED_SECRET_KIND
    }

    async fn convert(&self, secret: &Manifest, namespace: &str) -> Result<Manifest> {
        // Sealing is namespace-scoped, so the namespace must be explicit.
        let mut secret = secret.clone();
        let namespace = secret_namespace(&secret, namespace).to_string();
        if let Some(metadata) = secret.get_mut("metadata").and_then(|m| m.as_object_mut()) {
            metadata
                .entry("namespace")
                .or_insert_with(|| json!(namespace));
        }

        let input = to_documents(std::slice::from_ref(&secret))?;
        let cert = self.cert_path.to_string_lossy().into_owned();
        let output = process::run(
            "kubeseal",
            ["--cert", cert.as_str(), "--format", "yaml"],
            None,
            Some(input.as_bytes()),
        )
        .await?;

        let mut documents = parse_documents(&output)?;
        match (documents.pop(), documents.is_empty()) {
            (Some(sealed), true) if sealed.is_object() => Ok(sealed),
            _ => Err(TranspireError::tool_failed(
                "kubeseal",
                "expected a single SealedSecret object on stdout",
            )),
        }
    }

    async fn push(&self, _secret: &Manifest, _namespace: &str) -> Result<()> {
        Err(TranspireError::config_error(
            "the sealed-secrets provider has no secret store to push to",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_push_is_unsupported() {
        let provider = SealedSecretsProvider::new("cert.pem");
        let secret = json!({"apiVersion": "v1", "kind": "Secret", "metadata": {"name": "db"}});
        assert!(provider.push(&secret, "echo").await.is_err());
    }

    #[tokio::test]
    async fn test_convert_reports_kubeseal_failure() {
        if which::which("kubeseal").is_err() {
            return;
        }
        let provider = SealedSecretsProvider::new("/nonexistent/cert.pem");
        let secret = json!({"apiVersion": "v1", "kind": "Secret", "metadata": {"name": "db"}});
        assert!(matches!(
            provider.convert(&secret, "echo").await,
            Err(TranspireError::ToolFailed { .. })
        ));
    }
}
