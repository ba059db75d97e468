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

use super::deployment::DeploymentSpec;
use super::module_labels;
use crate::shared::error::Result;
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec as K8sServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A Service exposing one port of a workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ServiceSpec {
    pub name: String,
    pub port: i32,
    /// Port on the pod, defaults to `port`.
    #[serde(default)]
    pub target_port: Option<i32>,
    /// Pod selector. Defaults to the selector of the deployment named
    /// `deployment`, or of a deployment sharing the service name.
    #[serde(default)]
    pub selector: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub deployment: Option<String>,
    #[serde(default, rename = "type")]
    pub service_type: Option<String>,
}

impl ServiceSpec {
    pub fn build(&self) -> Result<Service> {
        let selector = self.selector.clone().unwrap_or_else(|| {
            DeploymentSpec::selector(self.deployment.as_deref().unwrap_or(&self.name))
        });

        Ok(Service {
            metadata: ObjectMeta {
                name: Some(self.name.clone()),
                labels: Some(module_labels()?),
                ..Default::default()
            },
            spec: Some(K8sServiceSpec {
                type_: self.service_type.clone(),
                selector: Some(selector),
                ports: Some(vec![ServicePort {
                    port: self.port,
                    target_port: Some(IntOrString::Int(self.target_port.unwrap_or(self.port))),
                    protocol: Some("TCP".to_string()),
                    ..Default::default()
                }]),
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
    use crate::infrastructure::constants::LABEL_DEPLOYMENT_SELECTOR;
    use std::sync::Arc;

    #[test]
    fn test_service_selects_deployment() {
        let spec: ServiceSpec =
            serde_yaml::from_str("{ name: web, port: 80, targetPort: 8080, type: NodePort }").unwrap();
        let config = Arc::new(ClusterConfig::from_toml_str(MINIMAL, ".").unwrap());
        let manifest = with_context_sync(Arc::new(ModuleInfo::new("echo", None)), config, || {
            spec.build()
        })
        .unwrap()
        .to_manifest()
        .unwrap();

        assert_eq!(manifest["kind"], "Service");
        assert_eq!(manifest["spec"]["type"], "NodePort");
        assert_eq!(manifest["spec"]["selector"][LABEL_DEPLOYMENT_SELECTOR], "web");
        assert_eq!(manifest["spec"]["ports"][0]["port"], 80);
        assert_eq!(manifest["spec"]["ports"][0]["targetPort"], 8080);
    }
}
