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

use super::image::image_ref;
use super::module_labels;
use crate::infrastructure::constants::{
    CONTAINER_NAME_MAIN, IMAGE_PULL_POLICY_IF_NOT_PRESENT, LABEL_DEPLOYMENT_SELECTOR,
};
use crate::shared::error::{Result, TranspireError};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec as K8sDeploymentSpec};
use k8s_openapi::api::core::v1::{Container, ContainerPort, EnvVar, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single-container Deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeploymentSpec {
    pub name: String,
    /// Full image reference.
    #[serde(default)]
    pub image: Option<String>,
    /// Name of an image built by this module, resolved against the registry.
    #[serde(default)]
    pub module_image: Option<String>,
    #[serde(default)]
    pub ports: Vec<i32>,
    #[serde(default = "default_replicas")]
    pub replicas: i32,
    #[serde(default)]
    pub args: Option<Vec<String>>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

fn default_replicas() -> i32 {
    1
}

impl DeploymentSpec {
    pub fn selector(name: &str) -> BTreeMap<String, String> {
        BTreeMap::from([(LABEL_DEPLOYMENT_SELECTOR.to_string(), name.to_string())])
    }

    fn image(&self) -> Result<String> {
        match (&self.image, &self.module_image) {
            (Some(image), None) => Ok(image.clone()),
            (None, Some(image)) => image_ref(image),
            _ => Err(TranspireError::invalid_module(format!(
                "deployment '{}' needs exactly one of image or moduleImage",
                self.name
            ))),
        }
    }

    pub fn build(&self) -> Result<Deployment> {
        let selector = Self::selector(&self.name);
        let mut labels = module_labels()?;
        labels.extend(selector.clone());

        let env = if self.env.is_empty() {
            None
        } else {
            Some(
                self.env
                    .iter()
                    .map(|(name, value)| EnvVar {
                        name: name.clone(),
                        value: Some(value.clone()),
                        ..Default::default()
                    })
                    .collect(),
            )
        };

        let container = Container {
            name: CONTAINER_NAME_MAIN.to_string(),
            image: Some(self.image()?),
            image_pull_policy: Some(IMAGE_PULL_POLICY_IF_NOT_PRESENT.to_string()),
            args: self.args.clone(),
            env,
            ports: if self.ports.is_empty() {
                None
            } else {
                Some(
                    self.ports
                        .iter()
                        .map(|port| ContainerPort {
                            container_port: *port,
                            ..Default::default()
                        })
                        .collect(),
                )
            },
            ..Default::default()
        };

        Ok(Deployment {
            metadata: ObjectMeta {
                name: Some(self.name.clone()),
                labels: Some(labels.clone()),
                ..Default::default()
            },
            spec: Some(K8sDeploymentSpec {
                replicas: Some(self.replicas),
                selector: LabelSelector {
                    match_labels: Some(selector),
                    ..Default::default()
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(labels),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        containers: vec![container],
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        })
    }
}
