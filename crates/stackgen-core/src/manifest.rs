//! Synthesized manifest types.
//!
//! The manifest mirrors the declaration tree, but every reference has been
//! replaced either by a literal or by a [`DeferredExpression`] that the
//! apply-engine substitutes once the referenced resource exists.

use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::value::{Scalar, SecretRef};
use crate::LogicalName;

/// A value only known at apply time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferredExpression {
    /// Runtime attribute of a resource, e.g. the id of a user pool.
    Attribute {
        resource: LogicalName,
        attribute: String,
    },
    /// String concatenation where at least one part is deferred.
    Join(Vec<ManifestValue>),
    /// Value held in the external secret store.
    Secret(SecretRef),
}

#[derive(Serialize)]
struct AttributeTarget<'a> {
    resource: &'a LogicalName,
    attribute: &'a str,
}

// Serialized as single-key maps (`$ref`, `$join`, `$secret`) so JSON and
// YAML renderings look the same.
impl Serialize for DeferredExpression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            DeferredExpression::Attribute {
                resource,
                attribute,
            } => map.serialize_entry(
                "$ref",
                &AttributeTarget {
                    resource,
                    attribute,
                },
            )?,
            DeferredExpression::Join(parts) => map.serialize_entry("$join", parts)?,
            DeferredExpression::Secret(secret) => map.serialize_entry("$secret", secret)?,
        }
        map.end()
    }
}

/// A fully resolved manifest value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ManifestValue {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<ManifestValue>),
    Mapping(IndexMap<String, ManifestValue>),
    Deferred(DeferredExpression),
}

impl From<Scalar> for ManifestValue {
    fn from(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Null => ManifestValue::Null,
            Scalar::Bool(b) => ManifestValue::Bool(b),
            Scalar::Int(i) => ManifestValue::Int(i),
            Scalar::Str(s) => ManifestValue::Str(s),
        }
    }
}

impl From<&str> for ManifestValue {
    fn from(s: &str) -> Self {
        ManifestValue::Str(s.to_string())
    }
}

impl From<DeferredExpression> for ManifestValue {
    fn from(expr: DeferredExpression) -> Self {
        ManifestValue::Deferred(expr)
    }
}

/// One resource in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestResource {
    /// Provider type, e.g. `AWS::Cognito::UserPool`.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Direct dependencies, explicit and implied by references.
    #[serde(rename = "dependsOn", skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<LogicalName>,
    pub properties: IndexMap<String, ManifestValue>,
}

/// The synthesized document for one stack and environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Manifest {
    pub stack: String,
    pub environment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    /// Resources in build order.
    pub resources: IndexMap<LogicalName, ManifestResource>,
}

impl Manifest {
    pub fn resource(&self, name: &str) -> Option<&ManifestResource> {
        self.resources.get(name)
    }

    /// Position of a resource in build order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.resources.get_index_of(name)
    }

    pub fn order(&self) -> impl Iterator<Item = &LogicalName> {
        self.resources.keys()
    }
}
