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

//! `helm template` as a manifest source.

use crate::domain::manifest::{parse_documents, Manifest};
use crate::domain::module::current_namespace;
use crate::infrastructure::process;
use crate::shared::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ffi::OsString;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HelmChart {
    /// Chart repository URL.
    pub repo: String,
    pub chart: String,
    pub version: String,
    #[serde(default)]
    pub values: Value,
    /// Release name, defaults to the chart name.
    #[serde(default)]
    pub name: Option<String>,
    /// Extra capabilities passed as `--api-versions`.
    #[serde(default)]
    pub api_versions: Vec<String>,
}

impl HelmChart {
    pub fn release_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.chart)
    }

    /// Helm keeps its repository state under the transpire cache instead of
    /// the user's own helm configuration.
    fn global_args(cache_dir: &Path) -> Vec<OsString> {
        let helm = cache_dir.join("helm");
        vec![
            "--registry-config".into(),
            helm.join("registry.json").into(),
            "--repository-cache".into(),
            helm.join("repository").into(),
            "--repository-config".into(),
            helm.join("repositories.yaml").into(),
        ]
    }

    fn template_args(&self, namespace: &str) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "template".into(),
            "-n".into(),
            namespace.into(),
            "--values".into(),
            "-".into(),
            "--include-crds".into(),
            "--version".into(),
            self.version.as_str().into(),
            "--name-template".into(),
            self.release_name().into(),
        ];
        for api_version in &self.api_versions {
            args.push("--api-versions".into());
            args.push(api_version.into());
        }
        args.push(format!("{}/{}", self.release_name(), self.chart).into());
        args
    }

    /// Render the chart in the namespace of the module being built.
    pub async fn render(&self, cache_dir: &Path) -> Result<Vec<Manifest>> {
        process::ensure_tool("helm")?;
        let namespace = current_namespace()?;
        let global = Self::global_args(cache_dir);

        let mut add = global.clone();
        add.extend([
            OsString::from("repo"),
            "add".into(),
            "--force-update".into(),
            self.release_name().into(),
            self.repo.as_str().into(),
        ]);
        process::run("helm", add, None, None).await?;

        let values = match &self.values {
            Value::Null => String::from("{}"),
            values => serde_yaml::to_string(values)?,
        };
        let mut template = global;
        template.extend(self.template_args(&namespace));
        let output = process::run("helm", template, None, Some(values.as_bytes())).await?;

        let manifests = parse_documents(&output)?;
        info!(
            "Rendered chart {} {} into {} manifests",
            self.chart,
            self.version,
            manifests.len()
        );
        Ok(manifests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart() -> HelmChart {
        serde_yaml::from_str(
            "{ repo: 'https://helm.cilium.io/', chart: cilium, version: 1.12.2, apiVersions: [monitoring.coreos.com/v1] }",
        )
        .unwrap()
    }

    #[test]
    fn test_template_args() {
        let args: Vec<String> = chart()
            .template_args("kube-system")
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            [
                "template",
                "-n",
                "kube-system",
                "--values",
                "-",
                "--include-crds",
                "--version",
                "1.12.2",
                "--name-template",
                "cilium",
                "--api-versions",
                "monitoring.coreos.com/v1",
                "cilium/cilium",
            ]
        );
    }

    #[test]
    fn test_release_name_override() {
        let mut chart = chart();
        chart.name = Some("cni".to_string());
        assert_eq!(chart.release_name(), "cni");
        let args = chart.template_args("kube-system");
        assert_eq!(args.last().unwrap(), "cni/cilium");
    }

    #[test]
    fn test_global_args_use_cache_dir() {
        let args = HelmChart::global_args(Path::new("/cache"));
        assert_eq!(args[1], OsString::from("/cache/helm/registry.json"));
    }

    #[tokio::test]
    async fn test_render_needs_build_context() {
        if which::which("helm").is_err() {
            return;
        }
        assert!(chart().render(Path::new("/tmp")).await.is_err());
    }
}
