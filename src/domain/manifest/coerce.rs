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
use crate::shared::error::{Result, TranspireError};
use serde::Serialize;
use serde_json::Value;

/// Deterministic conversion of a structured object into a manifest map.
pub trait ToManifest {
    fn to_manifest(&self) -> Result<Manifest>;
}

impl<T> ToManifest for T
where
    T: k8s_openapi::Resource + Serialize,
{
    fn to_manifest(&self) -> Result<Manifest> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Anything a module may emit as a manifest.
pub enum ManifestLike {
    Value(Value),
    Object(Box<dyn ToManifest + Send>),
}

impl ManifestLike {
    pub fn object(obj: impl ToManifest + Send + 'static) -> Self {
        Self::Object(Box::new(obj))
    }
}

impl From<Value> for ManifestLike {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl std::fmt::Debug for ManifestLike {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Object(_) => f.write_str("Object(..)"),
        }
    }
}

pub(crate) fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "map",
    }
}

pub fn coerce(x: ManifestLike) -> Result<Manifest> {
    let value = match x {
        ManifestLike::Value(value) => value,
        ManifestLike::Object(obj) => obj.to_manifest()?,
    };
    if value.is_object() {
        Ok(value)
    } else {
        Err(TranspireError::UnsupportedManifestType(format!(
            "expected a map, got {}",
            value_type_name(&value)
        )))
    }
}

/// Lazy sequence of emitted values, consumed exactly once.
///
/// `None` entries stand for "nothing emitted here" and are dropped by
/// [`coerce_many`].
pub struct ManifestStream {
    inner: Box<dyn Iterator<Item = Option<ManifestLike>> + Send>,
}

impl ManifestStream {
    pub fn empty() -> Self {
        Self {
            inner: Box::new(std::iter::empty()),
        }
    }

    pub fn one(item: ManifestLike) -> Self {
        Self {
            inner: Box::new(std::iter::once(Some(item))),
        }
    }

    pub fn many<I>(items: I) -> Self
    where
        I: IntoIterator<Item = ManifestLike>,
        I::IntoIter: Send + 'static,
    {
        Self {
            inner: Box::new(items.into_iter().map(Some)),
        }
    }

    pub fn optional<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Option<ManifestLike>>,
        I::IntoIter: Send + 'static,
    {
        Self {
            inner: Box::new(items.into_iter()),
        }
    }

    /// One-or-many from a plain value: a sequence yields its elements, a map
    /// yields itself and null yields nothing. Scalars are rejected.
    pub fn from_value(value: Value) -> std::result::Result<Self, String> {
        match value {
            Value::Null => Ok(Self::empty()),
            Value::Array(items) => Ok(Self::optional(
                items
                    .into_iter()
                    .map(|v| (!v.is_null()).then_some(ManifestLike::Value(v))),
            )),
            Value::Object(_) => Ok(Self::one(ManifestLike::Value(value))),
            other => Err(format!(
                "expected a sequence of manifests, got {}",
                value_type_name(&other)
            )),
        }
    }
}

impl Iterator for ManifestStream {
    type Item = Option<ManifestLike>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

impl From<ManifestLike> for ManifestStream {
    fn from(item: ManifestLike) -> Self {
        Self::one(item)
    }
}

impl From<Vec<ManifestLike>> for ManifestStream {
    fn from(items: Vec<ManifestLike>) -> Self {
        Self::many(items)
    }
}

impl From<Vec<Manifest>> for ManifestStream {
    fn from(items: Vec<Manifest>) -> Self {
        Self::many(items.into_iter().map(ManifestLike::Value))
    }
}

impl FromIterator<ManifestLike> for ManifestStream {
    fn from_iter<I: IntoIterator<Item = ManifestLike>>(iter: I) -> Self {
        Self::many(iter.into_iter().collect::<Vec<_>>())
    }
}

pub fn coerce_many(objs: impl Into<ManifestStream>) -> impl Iterator<Item = Result<Manifest>> {
    objs.into().flatten().map(coerce)
}
