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
use crate::shared::error::Result;
use serde::Deserialize;

/// Parses a multi-document YAML stream, skipping empty documents.
pub fn parse_documents(content: &str) -> Result<Vec<Manifest>> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(content) {
        let value = serde_json::Value::deserialize(document)?;
        if !value.is_null() {
            documents.push(value);
        }
    }
    Ok(documents)
}

/// Serializes manifests as one multi-document YAML stream.
pub fn to_documents(manifests: &[Manifest]) -> Result<String> {
    let mut out = String::new();
    for manifest in manifests {
        out.push_str("---\n");
        out.push_str(&serde_yaml::to_string(manifest)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_documents_skips_empty() {
        let content = "---\napiVersion: v1\nkind: Service\n---\n# only a comment\n---\napiVersion: v1\nkind: ConfigMap\n";
        let docs = parse_documents(content).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1]["kind"], "ConfigMap");
    }

    #[test]
    fn test_to_documents_separates_objects() {
        let docs = vec![serde_json::json!({"kind": "A"}), serde_json::json!({"kind": "B"})];
        let out = to_documents(&docs).unwrap();
        assert_eq!(out.matches("---\n").count(), 2);
        assert_eq!(parse_documents(&out).unwrap(), docs);
    }
}
