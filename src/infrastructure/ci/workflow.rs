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

//! Argo Workflow that builds a git-backed module.
//!
//! The DAG clones the module repository, runs the module's pipeline tasks in
//! the checkout and then builds every declared image with buildkit.

use super::images::{image_builds, remote_source};
use crate::domain::manifest::Manifest;
use crate::domain::module::{Module, PipelineTask};
use crate::infrastructure::constants::{
    ARGOPROJ_API_VERSION, BUILDKIT_IMAGE, CI_SERVICE_ACCOUNT, CI_WORKSPACE, GIT_IMAGE,
};
use crate::shared::error::{Result, TranspireError};
use crate::shared::validation::is_valid_dns_name;
use serde_json::{json, Value};

const WORKSPACE_VOLUME: &str = "workspace";
const CLONE_TASK: &str = "clone";

pub async fn generate_workflow(module: &Module) -> Result<Manifest> {
    let source = remote_source(module)?;
    let pipeline = module.pipeline().await?;
    let images = image_builds(module).await?;

    let checkout = format!("{}/src", CI_WORKSPACE);
    let module_dir = match &source.dir {
        Some(dir) => format!("{}/{}", checkout, dir.to_string_lossy().trim_matches('/')),
        None => checkout.clone(),
    };

    let mut tasks = vec![json!({ "name": CLONE_TASK, "template": CLONE_TASK })];
    let mut templates = vec![clone_template(module, &checkout)?];

    let mut pipeline_names = Vec::with_capacity(pipeline.len());
    for task in pipeline {
        let name = task_name(module, "pipeline", &task.name)?;
        tasks.push(json!({ "name": name, "template": name, "depends": CLONE_TASK }));
        templates.push(pipeline_template(&name, task, &module_dir));
        pipeline_names.push(name);
    }

    let image_depends = if pipeline_names.is_empty() {
        CLONE_TASK.to_string()
    } else {
        pipeline_names.join(" && ")
    };
    for image in &images {
        let name = task_name(module, "image", &image.name)?;
        tasks.push(json!({ "name": name, "template": name, "depends": image_depends }));
        let context = format!("{}/{}", checkout, image.path);
        let outputs = image.tags.join(",");
        templates.push(json!({
            "name": name,
            "container": {
                "image": BUILDKIT_IMAGE,
                "command": ["buildctl-daemonless.sh"],
                "args": [
                    "build",
                    "--frontend", "dockerfile.v0",
                    "--local", format!("context={}", context),
                    "--local", format!("dockerfile={}", context),
                    "--output", format!("type=image,\"name={}\",push=true", outputs),
                ],
                "env": [{ "name": "BUILDKITD_FLAGS", "value": "--oci-worker-no-process-sandbox" }],
                "securityContext": { "privileged": true },
                "volumeMounts": [{ "name": WORKSPACE_VOLUME, "mountPath": CI_WORKSPACE }],
            },
        }));
    }

    let mut main = vec![json!({ "name": "main", "dag": { "tasks": tasks } })];
    main.extend(templates);

    Ok(json!({
        "apiVersion": ARGOPROJ_API_VERSION,
        "kind": "Workflow",
        "metadata": {
            "generateName": format!("{}-build-", module.name()),
            "namespace": module.namespace(),
        },
        "spec": {
            "entrypoint": "main",
            "serviceAccountName": CI_SERVICE_ACCOUNT,
            "volumeClaimTemplates": [{
                "metadata": { "name": WORKSPACE_VOLUME },
                "spec": {
                    "accessModes": ["ReadWriteOnce"],
                    "resources": { "requests": { "storage": "1Gi" } },
                },
            }],
            "volumeClaimGC": { "strategy": "OnWorkflowCompletion" },
            "templates": main,
        },
    }))
}

fn clone_template(module: &Module, checkout: &str) -> Result<Value> {
    let source = remote_source(module)?;
    let mut script = format!("git {} {}", source.clone_args().join(" "), checkout);
    if let Some(commit) = module.revision().or(source.commit.as_deref()) {
        script.push_str(&format!(" && git -C {} checkout {}", checkout, commit));
    }
    Ok(json!({
        "name": CLONE_TASK,
        "container": {
            "image": GIT_IMAGE,
            "command": ["sh", "-c"],
            "args": [script],
            "volumeMounts": [{ "name": WORKSPACE_VOLUME, "mountPath": CI_WORKSPACE }],
        },
    }))
}

fn pipeline_template(name: &str, task: &PipelineTask, working_dir: &str) -> Value {
    let mut container = json!({
        "image": task.image,
        "workingDir": working_dir,
        "volumeMounts": [{ "name": WORKSPACE_VOLUME, "mountPath": CI_WORKSPACE }],
    });
    if let Some(command) = &task.command {
        container["command"] = json!(command);
    }
    if let Some(args) = &task.args {
        container["args"] = json!(args);
    }
    json!({ "name": name, "container": container })
}

fn task_name(module: &Module, prefix: &str, name: &str) -> Result<String> {
    let task = format!("{}-{}", prefix, name);
    if is_valid_dns_name(&task) {
        Ok(task)
    } else {
        Err(TranspireError::invalid_output(
            module.name(),
            format!("'{}' is not a valid task name", name),
        ))
    }
}
