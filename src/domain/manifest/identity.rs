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

use super::Manifest;
use crate::domain::manifest::surgery::delve;
use crate::shared::error::{Result, TranspireError};
use std::fmt;

/// Stable identity of a manifest: `(apiVersion, kind, name, namespace)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ManifestIdentity {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub namespace: Option<String>,
}

impl ManifestIdentity {
    /// Reads the identity of a coerced manifest. `metadata.generateName` stands
    /// in for the name when no name is set.
    pub fn of(manifest: &Manifest) -> Result<Self> {
        let field = |path: &[&str]| delve(manifest, path).and_then(|v| v.as_str());

        let api_version = field(&["apiVersion"])
            .ok_or_else(|| missing_field("apiVersion"))?
            .to_string();
        let kind = field(&["kind"]).ok_or_else(|| missing_field("kind"))?.to_string();
        let name = field(&["metadata", "name"])
            .or_else(|| field(&["metadata", "generateName"]))
            .ok_or_else(|| missing_field("metadata.name"))?
            .to_string();
        let namespace = field(&["metadata", "namespace"]).map(str::to_string);

        Ok(Self {
            api_version,
            kind,
            name,
            namespace,
        })
    }

    pub fn namespace_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.namespace.as_deref().unwrap_or(default)
    }

    /// Output file name, `<name>_<kind>_<namespace>.yaml`.
    pub fn file_name(&self, default_namespace: &str) -> String {
        format!(
            "{}_{}_{}.yaml",
            self.name,
            self.kind,
            self.namespace_or(default_namespace)
        )
    }

    pub fn is_core_secret(&self) -> bool {
        self.api_version == "v1" && self.kind == "Secret"
    }
}

impl fmt::Display for ManifestIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} '{}'", self.api_version, self.kind, self.name)?;
        if let Some(ns) = &self.namespace {
            write!(f, " in namespace '{}'", ns)?;
        }
        Ok(())
    }
}

fn missing_field(field: &str) -> TranspireError {
    TranspireError::UnsupportedManifestType(format!("manifest is missing '{}'", field))
}

/// A per-object postprocessing failure.
///
/// These are collected across a whole module before anything is reported, so
/// one bad object does not hide problems in the others.
#[derive(Debug, Clone)]
pub struct ManifestError {
    pub object: String,
    pub message: String,
    pub suggestion: Option<Manifest>,
}

impl ManifestError {
    pub fn new(object: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: Manifest) -> Self {
        self.suggestion = Some(suggestion);
        self
    }
}

impl fmt::Display for ManifestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.object, self.message)
    }
}

impl std::error::Error for ManifestError {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identity_and_file_name() {
        let m = json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": "web", "namespace": "echo"}
        });
        let id = ManifestIdentity::of(&m).unwrap();
        assert_eq!(id.file_name("other"), "web_Deployment_echo.yaml");
        assert!(!id.is_core_secret());
    }

    #[test]
    fn test_identity_defaults_namespace_and_generate_name() {
        let m = json!({
            "apiVersion": "batch/v1",
            "kind": "Job",
            "metadata": {"generateName": "migrate-"}
        });
        let id = ManifestIdentity::of(&m).unwrap();
        assert_eq!(id.file_name("echo"), "migrate-_Job_echo.yaml");
    }

    #[test]
    fn test_identity_requires_kind() {
        let m = json!({"apiVersion": "v1", "metadata": {"name": "x"}});
        assert!(matches!(
            ManifestIdentity::of(&m),
            Err(TranspireError::UnsupportedManifestType(_))
        ));
    }
}
