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

//! Context-aware constructors for common resources.
//!
//! Each builder reads the module being built and the cluster defaults from the
//! build context, so they must run inside a module evaluation.

pub mod deployment;
pub mod image;
pub mod ingress;
pub mod service;

pub use deployment::DeploymentSpec;
pub use image::image_ref;
pub use ingress::IngressSpec;
pub use service::ServiceSpec;

use crate::domain::module::current_module;
use crate::infrastructure::constants::{LABEL_MANAGED_BY, LABEL_PART_OF, MANAGED_BY_VALUE};
use crate::shared::error::Result;
use std::collections::BTreeMap;

/// Labels every helper-built resource carries.
pub(crate) fn module_labels() -> Result<BTreeMap<String, String>> {
    let module = current_module()?;
    Ok(BTreeMap::from([
        (LABEL_PART_OF.to_string(), module.name.clone()),
        (LABEL_MANAGED_BY.to_string(), MANAGED_BY_VALUE.to_string()),
    ]))
}
