//! Declaration values.
//!
//! A [`Value`] is what a resource property is declared as. It is resolved into
//! a [`ManifestValue`](crate::ManifestValue) during synthesis: references are
//! substituted, parameters are evaluated against the active environment and
//! secrets become deferred lookups.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::LogicalName;

/// Ordered property bag of a resource.
pub type Properties = IndexMap<String, Value>;

/// A scalar literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => Ok(()),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Str(s) => f.write_str(s),
        }
    }
}

/// Dotted path to an attribute of a resource (e.g. `id` or
/// `signInAliases.email`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributePath(Vec<String>);

impl AttributePath {
    pub fn parse(path: &str) -> Self {
        Self(path.split('.').map(str::to_string).collect())
    }

    /// First segment, which names either a declared property or a runtime
    /// attribute.
    pub fn head(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or_default()
    }

    pub fn tail(&self) -> &[String] {
        self.0.get(1..).unwrap_or_default()
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl From<&str> for AttributePath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

/// Reference to an attribute of another resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    pub target: LogicalName,
    pub attribute: AttributePath,
}

impl Reference {
    pub fn new(target: LogicalName, attribute: impl Into<AttributePath>) -> Self {
        Self {
            target,
            attribute: attribute.into(),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.target, self.attribute)
    }
}

/// Pointer into the external secret store. Never holds the secret itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl SecretRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Parse `name` or `name#key`.
    pub fn parse(spec: &str) -> Self {
        match spec.split_once('#') {
            Some((name, key)) => Self::new(name).with_key(key),
            None => Self::new(spec),
        }
    }
}

/// A value whose result depends on the active environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    /// String with `${env.NAME}`, `${environment.name}` or
    /// `${environment.stage}` placeholders. Other `${...}` sequences are
    /// passed through untouched.
    Template(String),
    /// Variant per environment name. When the active environment has no
    /// variant the enclosing property is omitted.
    Select(IndexMap<String, Value>),
}

/// A declared property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Literal(Scalar),
    Reference(Reference),
    List(Vec<Value>),
    Mapping(IndexMap<String, Value>),
    /// String concatenation of the parts.
    Join(Vec<Value>),
    Param(Param),
    Secret(SecretRef),
}

impl Value {
    pub fn null() -> Self {
        Value::Literal(Scalar::Null)
    }

    pub fn str(s: impl Into<String>) -> Self {
        Value::Literal(Scalar::Str(s.into()))
    }

    pub fn bool(b: bool) -> Self {
        Value::Literal(Scalar::Bool(b))
    }

    pub fn int(i: i64) -> Self {
        Value::Literal(Scalar::Int(i))
    }

    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    pub fn mapping<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Mapping(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn join<I, V>(parts: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::Join(parts.into_iter().map(Into::into).collect())
    }

    pub fn template(template: impl Into<String>) -> Self {
        Value::Param(Param::Template(template.into()))
    }

    /// Shorthand for a template reading a single environment variable.
    pub fn env(variable: &str) -> Self {
        Value::template(format!("${{env.{variable}}}"))
    }

    pub fn select<I, K, V>(variants: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Param(Param::Select(
            variants
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ))
    }

    pub fn secret(secret: SecretRef) -> Self {
        Value::Secret(secret)
    }

    /// Whether this value (or anything nested in it) is declared as
    /// depending on the environment. References are not followed; see
    /// [`Stack::is_parameterized`](crate::Stack::is_parameterized).
    pub fn is_parameterized(&self) -> bool {
        match self {
            Value::Param(_) => true,
            Value::List(items) | Value::Join(items) => items.iter().any(Value::is_parameterized),
            Value::Mapping(entries) => entries.values().any(Value::is_parameterized),
            Value::Literal(_) | Value::Reference(_) | Value::Secret(_) => false,
        }
    }

    /// All references in this value, in declaration order. Every variant of
    /// a `Select` is included so dependencies do not vary by environment.
    pub fn references(&self) -> Vec<&Reference> {
        let mut refs = Vec::new();
        self.collect_references(&mut refs);
        refs
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a Reference>) {
        match self {
            Value::Reference(r) => out.push(r),
            Value::List(items) | Value::Join(items) => {
                for item in items {
                    item.collect_references(out);
                }
            }
            Value::Mapping(entries) => {
                for value in entries.values() {
                    value.collect_references(out);
                }
            }
            Value::Param(Param::Select(variants)) => {
                for value in variants.values() {
                    value.collect_references(out);
                }
            }
            Value::Literal(_) | Value::Param(Param::Template(_)) | Value::Secret(_) => {}
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::int(i)
    }
}

impl From<Reference> for Value {
    fn from(r: Reference) -> Self {
        Value::Reference(r)
    }
}

impl From<SecretRef> for Value {
    fn from(s: SecretRef) -> Self {
        Value::Secret(s)
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Value::Literal(s)
    }
}

/// Build-phase command appending `KEY=VALUE` to a dotenv file.
///
/// The command is a [`Value::Join`], so a deferred value (an id that only
/// exists after creation, or a secret) stays deferred in the manifest.
pub fn dotenv_line(key: &str, value: impl Into<Value>, file: &str) -> Value {
    Value::Join(vec![
        Value::str(format!("echo \"{key}=")),
        value.into(),
        Value::str(format!("\" >> {file}")),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> LogicalName {
        LogicalName::new(s).unwrap()
    }

    #[test]
    fn test_references_walk_nested_values() {
        let value = Value::mapping([
            ("poolId", Value::from(Reference::new(name("pool"), "id"))),
            (
                "commands",
                Value::list([
                    Value::str("npm ci"),
                    dotenv_line(
                        "COGNITO_CLIENT_ID",
                        Reference::new(name("client"), "id"),
                        ".env.production",
                    ),
                ]),
            ),
        ]);

        let targets: Vec<_> = value
            .references()
            .into_iter()
            .map(|r| r.target.as_str())
            .collect();
        assert_eq!(targets, vec!["pool", "client"]);
    }

    #[test]
    fn test_select_references_include_all_variants() {
        let value = Value::select([
            ("main", Value::from(Reference::new(name("prod_pool"), "id"))),
            ("dev", Value::from(Reference::new(name("dev_pool"), "id"))),
        ]);
        assert_eq!(value.references().len(), 2);
        assert!(value.is_parameterized());
    }

    #[test]
    fn test_secret_ref_parse() {
        assert_eq!(SecretRef::parse("app"), SecretRef::new("app"));
        assert_eq!(
            SecretRef::parse("app#token"),
            SecretRef::new("app").with_key("token")
        );
    }

    #[test]
    fn test_attribute_path() {
        let path = AttributePath::parse("signInAliases.email");
        assert_eq!(path.head(), "signInAliases");
        assert_eq!(path.tail(), ["email".to_string()]);
        assert_eq!(path.to_string(), "signInAliases.email");
        assert!(AttributePath::parse("id").tail().is_empty());
    }

    #[test]
    fn test_env_shorthand() {
        assert_eq!(
            Value::env("NEXTAUTH_URL"),
            Value::Param(Param::Template("${env.NEXTAUTH_URL}".to_string()))
        );
    }
}
