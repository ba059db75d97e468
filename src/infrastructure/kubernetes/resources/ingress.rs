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

use super::module_labels;
use crate::domain::module::global_config;
use crate::infrastructure::constants::{
    ANNOTATION_CLUSTER_ISSUER, ANNOTATION_FORCE_SSL_REDIRECT, PATH_TYPE_PREFIX,
};
use crate::shared::error::Result;
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec as K8sIngressSpec, IngressTLS, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Routes `host` to a service port using the cluster's ingress class. TLS is
/// set up when the cluster has a certificate issuer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct IngressSpec {
    /// Defaults to the service name.
    #[serde(default)]
    pub name: Option<String>,
    pub host: String,
    pub service: String,
    pub port: i32,
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_path() -> String {
    "/".to_string()
}

impl IngressSpec {
    pub fn build(&self) -> Result<Ingress> {
        let config = global_config()?;
        let issuer = config.defaults.certificate_issuer.clone();

        let annotations = issuer.as_ref().map(|issuer| {
            BTreeMap::from([
                (ANNOTATION_CLUSTER_ISSUER.to_string(), issuer.clone()),
                (ANNOTATION_FORCE_SSL_REDIRECT.to_string(), "true".to_string()),
            ])
        });

        let tls = issuer.as_ref().map(|_| {
            vec![IngressTLS {
                hosts: Some(vec![self.host.clone()]),
                secret_name: Some(format!("{}-tls", self.service)),
            }]
        });

        Ok(Ingress {
            metadata: ObjectMeta {
                name: Some(self.name.clone().unwrap_or_else(|| self.service.clone())),
                labels: Some(module_labels()?),
                annotations,
                ..Default::default()
            },
            spec: Some(K8sIngressSpec {
                ingress_class_name: Some(config.defaults.ingress_class.clone()),
                rules: Some(vec![IngressRule {
                    host: Some(self.host.clone()),
                    http: Some(HTTPIngressRuleValue {
                        paths: vec![HTTPIngressPath {
                            path: Some(self.path.clone()),
                            path_type: PATH_TYPE_PREFIX.to_string(),
                            backend: IngressBackend {
                                service: Some(IngressServiceBackend {
                                    name: self.service.clone(),
                                    port: Some(ServiceBackendPort {
                                        number: Some(self.port),
                                        ..Default::default()
                                    }),
                                }),
                                ..Default::default()
                            },
                        }],
                    }),
                }]),
                tls,
                ..Default::default()
            }),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::cluster::tests::MINIMAL;
    use crate::domain::config::ClusterConfig;
    use crate::domain::manifest::ToManifest;
    use crate::domain::module::{with_context_sync, ModuleInfo};
    use std::sync::Arc;

    fn build(config: ClusterConfig) -> serde_json::Value {
        let spec: IngressSpec =
            serde_yaml::from_str("{ host: echo.example.org, service: web, port: 80 }").unwrap();
        with_context_sync(
            Arc::new(ModuleInfo::new("echo", None)),
            Arc::new(config),
            || spec.build(),
        )
        .unwrap()
        .to_manifest()
        .unwrap()
    }

    #[test]
    fn test_ingress_uses_cluster_defaults() {
        let mut config = ClusterConfig::from_toml_str(MINIMAL, ".").unwrap();
        config.defaults.ingress_class = "traefik".to_string();
        config.defaults.certificate_issuer = Some("letsencrypt".to_string());
        let manifest = build(config);

        assert_eq!(manifest["metadata"]["name"], "web");
        assert_eq!(manifest["spec"]["ingressClassName"], "traefik");
        assert_eq!(
            manifest["metadata"]["annotations"][ANNOTATION_CLUSTER_ISSUER],
            "letsencrypt"
        );
        assert_eq!(manifest["spec"]["tls"][0]["secretName"], "web-tls");
        let path = &manifest["spec"]["rules"][0]["http"]["paths"][0];
        assert_eq!(path["pathType"], "Prefix");
        assert_eq!(path["backend"]["service"]["port"]["number"], 80);
    }

    #[test]
    fn test_ingress_without_issuer_has_no_tls() {
        let manifest = build(ClusterConfig::from_toml_str(MINIMAL, ".").unwrap());
        assert_eq!(manifest["spec"]["ingressClassName"], "nginx");
        assert!(manifest["spec"].get("tls").is_none());
        assert!(manifest["metadata"].get("annotations").is_none());
    }
}
