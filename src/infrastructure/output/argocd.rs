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

//! ArgoCD `Application` descriptors, one per module.

use crate::domain::config::ArgoConfig;
use crate::domain::manifest::Manifest;
use crate::infrastructure::constants::{
    ARGOPROJ_API_VERSION, ARGOCD_APPLICATION_KIND, ARGOCD_DESTINATION_SERVER,
};
use crate::shared::error::{Result, TranspireError};
use crate::shared::validation::is_valid_dns_name;
use serde_json::json;

/// The Application that syncs `<repo>/<module>` into the module's namespace.
pub fn make_app(module: &str, namespace: &str, argo: &ArgoConfig) -> Result<Manifest> {
    if !is_valid_dns_name(module) {
        return Err(TranspireError::invalid_module(format!(
            "Expected a valid DNS name, but got '{}' instead",
            module
        )));
    }

    let mut sync_policy = json!({
        "syncOptions": ["CreateNamespace=true", "ServerSideApply=true"],
    });
    if argo.auto_sync {
        sync_policy["automated"] = json!({});
    }

    Ok(json!({
        "apiVersion": ARGOPROJ_API_VERSION,
        "kind": ARGOCD_APPLICATION_KIND,
        "metadata": {
            "name": module,
            "namespace": argo.namespace,
        },
        "spec": {
            "project": argo.project,
            "destination": {
                "server": ARGOCD_DESTINATION_SERVER,
                "namespace": namespace,
            },
            "source": {
                "repoURL": argo.repo_url,
                "path": module,
                "targetRevision": argo.branch,
            },
            "syncPolicy": sync_policy,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argo(auto_sync: bool) -> ArgoConfig {
        ArgoConfig {
            repo_url: "https://github.com/example/cluster.git".to_string(),
            branch: "HEAD".to_string(),
            namespace: "argocd".to_string(),
            project: "default".to_string(),
            auto_sync,
        }
    }

    #[test]
    fn test_make_app() {
        let app = make_app("echoserver", "echo", &argo(false)).unwrap();
        assert_eq!(app["kind"], "Application");
        assert_eq!(app["metadata"]["namespace"], "argocd");
        assert_eq!(app["spec"]["destination"]["namespace"], "echo");
        assert_eq!(app["spec"]["source"]["path"], "echoserver");
        assert_eq!(app["spec"]["source"]["targetRevision"], "HEAD");
        assert_eq!(
            app["spec"]["syncPolicy"],
            json!({"syncOptions": ["CreateNamespace=true", "ServerSideApply=true"]})
        );
    }

    #[test]
    fn test_auto_sync() {
        let app = make_app("echoserver", "echo", &argo(true)).unwrap();
        assert_eq!(app["spec"]["syncPolicy"]["automated"], json!({}));
    }

    #[test]
    fn test_rejects_invalid_names() {
        assert!(make_app("Echo_Server", "echo", &argo(false)).is_err());
        assert!(make_app("-echo", "echo", &argo(false)).is_err());
    }
}
