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

//! Path-based manifest surgery.
//!
//! [`delve`] and [`shelve`] read and write nested maps by key path.
//! [`edit_manifests`] applies a set of per-object edits to a list of manifests
//! and fails if any edit did not match, so a patch that targets a renamed or
//! removed resource is caught at build time.

use super::coerce::{coerce_many, ManifestStream};
use super::Manifest;
use crate::shared::error::{Result, TranspireError};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Returns the value at `path`, or `None` as soon as a key is missing.
pub fn delve<'a, S: AsRef<str>>(obj: &'a Value, path: &[S]) -> Option<&'a Value> {
    let mut curr = obj;
    for key in path {
        curr = curr.as_object()?.get(key.as_ref())?;
    }
    Some(curr)
}

/// Sets the value at `path` in place.
///
/// Missing intermediate maps are created when `create_parents` is set,
/// otherwise the first missing key is reported as [`TranspireError::MissingSegment`].
/// The last key is always created. An empty path replaces `obj` entirely.
pub fn shelve<S: AsRef<str>>(
    obj: &mut Value,
    path: &[S],
    value: Value,
    create_parents: bool,
) -> Result<()> {
    let Some((last, parents)) = path.split_last() else {
        *obj = value;
        return Ok(());
    };

    let mut curr = obj;
    let mut curr_key = "<root>";
    for key in parents {
        let key = key.as_ref();
        let map = curr
            .as_object_mut()
            .ok_or_else(|| TranspireError::NotAMap(curr_key.to_string()))?;
        if !map.contains_key(key) {
            if !create_parents {
                return Err(TranspireError::MissingSegment(key.to_string()));
            }
            map.insert(key.to_string(), Value::Object(Map::new()));
        }
        curr = map
            .get_mut(key)
            .ok_or_else(|| TranspireError::MissingSegment(key.to_string()))?;
        curr_key = key;
    }

    curr.as_object_mut()
        .ok_or_else(|| TranspireError::NotAMap(curr_key.to_string()))?
        .insert(last.as_ref().to_string(), value);
    Ok(())
}

/// Target of an edit: `(kind, name)`, or `((apiVersion, kind), name)` when the
/// API version must match too.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EditKey {
    Kind {
        kind: String,
        name: String,
    },
    Qualified {
        api_version: String,
        kind: String,
        name: String,
    },
}

impl EditKey {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Kind {
            kind: kind.into(),
            name: name.into(),
        }
    }

    pub fn qualified(
        api_version: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::Qualified {
            api_version: api_version.into(),
            kind: kind.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for EditKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kind { kind, name } => write!(f, "{}/{}", kind, name),
            Self::Qualified {
                api_version,
                kind,
                name,
            } => write!(f, "{}/{}/{}", api_version, kind, name),
        }
    }
}

/// Edit function. Returning `Ok(None)` deletes the manifest.
pub type EditFn = Box<dyn Fn(Manifest) -> Result<Option<Manifest>> + Send + Sync>;

pub type Edits = BTreeMap<EditKey, EditFn>;

fn lookup_keys(manifest: &Manifest) -> Option<(EditKey, EditKey)> {
    let api_version = manifest.get("apiVersion")?.as_str()?;
    let kind = manifest.get("kind")?.as_str()?;
    let name = delve(manifest, &["metadata", "name"])?.as_str()?;
    Some((
        EditKey::qualified(api_version, kind, name),
        EditKey::new(kind, name),
    ))
}

/// Applies `edits` to `manifests` in a single pass.
///
/// The fully qualified key is looked up before the apiVersion-agnostic one.
/// Every edit must match at least one manifest, otherwise nothing is returned
/// and the unmatched keys are reported.
pub fn edit_manifests<I>(edits: &Edits, manifests: I) -> Result<Vec<Manifest>>
where
    I: IntoIterator<Item = Manifest>,
{
    let mut consumed: BTreeSet<&EditKey> = BTreeSet::new();
    let mut result = Vec::new();

    for manifest in manifests {
        let matched = lookup_keys(&manifest).and_then(|(qualified, agnostic)| {
            edits
                .get_key_value(&qualified)
                .or_else(|| edits.get_key_value(&agnostic))
        });

        match matched {
            Some((key, edit)) => {
                consumed.insert(key);
                if let Some(edited) = edit(manifest)? {
                    result.push(edited);
                }
            }
            None => result.push(manifest),
        }
    }

    let unapplied: Vec<String> = edits
        .keys()
        .filter(|key| !consumed.contains(key))
        .map(ToString::to_string)
        .collect();
    if !unapplied.is_empty() {
        return Err(TranspireError::UnappliedEdits(unapplied));
    }

    Ok(result)
}

/// Coerces one-or-many emitted values, then runs [`edit_manifests`] on them.
pub fn edit_stream(edits: &Edits, manifests: impl Into<ManifestStream>) -> Result<Vec<Manifest>> {
    let coerced = coerce_many(manifests).collect::<Result<Vec<_>>>()?;
    edit_manifests(edits, coerced)
}

/// Builds one edit function that applies a batch of [`shelve`] operations.
pub fn make_edit_manifest(pairs: Vec<(Vec<String>, Value)>, create_parents: bool) -> EditFn {
    Box::new(move |mut manifest| {
        for (path, value) in &pairs {
            shelve(&mut manifest, path, value.clone(), create_parents)?;
        }
        Ok(Some(manifest))
    })
}
