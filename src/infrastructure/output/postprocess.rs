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

use crate::domain::manifest::{ManifestError, ManifestIdentity, Manifest};
use crate::infrastructure::secrets::{ConvertSecret, SecretsProvider};
use base64::Engine;
use serde_json::{Map, Value};

/// Final per-object transformation before anything is written.
///
/// Core `v1/Secret` objects are handed to the secrets provider unless running
/// in dev mode.
#[derive(Debug, Clone)]
pub struct Postprocessor {
    provider: SecretsProvider,
    dev: bool,
}

impl Postprocessor {
    pub fn new(provider: SecretsProvider, dev: bool) -> Self {
        Self { provider, dev }
    }

    pub fn provider(&self) -> &SecretsProvider {
        &self.provider
    }

    pub fn encrypted_kind(&self) -> &'static str {
        self.provider.encrypted_kind()
    }

    pub async fn postprocess(
        &self,
        manifest: Manifest,
        namespace: &str,
    ) -> Result<Manifest, ManifestError> {
        let identity = ManifestIdentity::of(&manifest)
            .map_err(|e| ManifestError::new(describe(&manifest), e.to_string()))?;
        if !identity.is_core_secret() {
            return Ok(manifest);
        }

        check_secret_data(&identity, &manifest)?;
        if self.dev {
            return Ok(manifest);
        }

        self.provider
            .convert(&manifest, namespace)
            .await
            .map_err(|e| ManifestError::new(identity.to_string(), e.to_string()))
    }
}

/// `data` values must be base64. Plain values are a common mistake, so the
/// error suggests the same secret with them moved to `stringData`.
fn check_secret_data(identity: &ManifestIdentity, secret: &Manifest) -> Result<(), ManifestError> {
    let Some(data) = secret.get("data").and_then(Value::as_object) else {
        return Ok(());
    };

    let engine = &base64::engine::general_purpose::STANDARD;
    let (valid, plain): (Map<String, Value>, Map<String, Value>) =
        data.clone().into_iter().partition(|(_, value)| {
            value
                .as_str()
                .is_some_and(|s| engine.decode(s).is_ok())
        });
    if plain.is_empty() {
        return Ok(());
    }

    let keys = plain.keys().cloned().collect::<Vec<_>>().join(", ");
    let mut suggestion = secret.clone();
    suggestion["data"] = Value::Object(valid);
    let string_data = suggestion
        .as_object_mut()
        .map(|obj| obj.entry("stringData").or_insert_with(|| Value::Object(Map::new())));
    if let Some(Value::Object(string_data)) = string_data {
        string_data.extend(plain);
    }
    if suggestion["data"].as_object().is_some_and(Map::is_empty) {
        if let Some(obj) = suggestion.as_object_mut() {
            obj.remove("data");
        }
    }

    Err(ManifestError::new(
        identity.to_string(),
        format!("data values are not base64 encoded: {}", keys),
    )
    .with_suggestion(suggestion))
}

fn describe(manifest: &Manifest) -> String {
    let field = |pointer: &str| {
        manifest
            .pointer(pointer)
            .and_then(Value::as_str)
            .unwrap_or("?")
            .to_string()
    };
    format!("{} '{}'", field("/kind"), field("/metadata/name"))
}
