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

//! Manifest representation, coercion and surgery

pub mod coerce;
pub mod identity;
pub mod surgery;
pub mod yaml;

pub use coerce::{coerce, coerce_many, ManifestLike, ManifestStream, ToManifest};
pub use identity::{ManifestError, ManifestIdentity};
pub use surgery::{
    delve, edit_manifests, edit_stream, make_edit_manifest, shelve, EditFn, EditKey, Edits,
};
pub use yaml::parse_documents;

/// Canonical in-memory manifest. Always a JSON object after coercion.
pub type Manifest = serde_json::Value;
