//! Resource node model.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value::{Properties, Reference, Value};
use crate::LogicalName;

const POOL_ATTRIBUTES: &[&str] = &["id", "arn", "providerName", "providerUrl"];
const CLIENT_ATTRIBUTES: &[&str] = &["id", "clientSecret"];
const DOMAIN_ATTRIBUTES: &[&str] = &["domain", "cloudFrontDistribution"];
const APP_ATTRIBUTES: &[&str] = &["appId", "arn", "defaultDomain"];
const BRANCH_ATTRIBUTES: &[&str] = &["arn", "branchName"];

/// Kind of infrastructure resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// User directory / identity provider pool.
    IdentityPool,
    /// OAuth client registered against a pool.
    PoolClient,
    /// Hosted sign-in domain for a pool.
    PoolDomain,
    /// Continuous-deployment hosting application.
    HostingApp,
    /// Branch of a hosting application.
    HostingBranch,
    /// Any other provider type, e.g. `AWS::S3::Bucket`.
    Custom(String),
}

impl ResourceKind {
    /// Provider type string emitted into the manifest.
    pub fn provider_type(&self) -> &str {
        match self {
            ResourceKind::IdentityPool => "AWS::Cognito::UserPool",
            ResourceKind::PoolClient => "AWS::Cognito::UserPoolClient",
            ResourceKind::PoolDomain => "AWS::Cognito::UserPoolDomain",
            ResourceKind::HostingApp => "AWS::Amplify::App",
            ResourceKind::HostingBranch => "AWS::Amplify::Branch",
            ResourceKind::Custom(provider_type) => provider_type,
        }
    }

    /// Attributes assigned by the provider at creation time.
    ///
    /// `None` means the kind is not known to stackgen and any attribute that
    /// is not a declared property is treated as runtime-assigned.
    pub fn runtime_attributes(&self) -> Option<&'static [&'static str]> {
        match self {
            ResourceKind::IdentityPool => Some(POOL_ATTRIBUTES),
            ResourceKind::PoolClient => Some(CLIENT_ATTRIBUTES),
            ResourceKind::PoolDomain => Some(DOMAIN_ATTRIBUTES),
            ResourceKind::HostingApp => Some(APP_ATTRIBUTES),
            ResourceKind::HostingBranch => Some(BRANCH_ATTRIBUTES),
            ResourceKind::Custom(_) => None,
        }
    }

    pub fn has_runtime_attribute(&self, attribute: &str) -> bool {
        self.runtime_attributes()
            .map(|attrs| attrs.contains(&attribute))
            .unwrap_or(true)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::IdentityPool => write!(f, "IdentityPool"),
            ResourceKind::PoolClient => write!(f, "PoolClient"),
            ResourceKind::PoolDomain => write!(f, "PoolDomain"),
            ResourceKind::HostingApp => write!(f, "HostingApp"),
            ResourceKind::HostingBranch => write!(f, "HostingBranch"),
            ResourceKind::Custom(provider_type) => write!(f, "{provider_type}"),
        }
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "IdentityPool" | "AWS::Cognito::UserPool" => ResourceKind::IdentityPool,
            "PoolClient" | "AWS::Cognito::UserPoolClient" => ResourceKind::PoolClient,
            "PoolDomain" | "AWS::Cognito::UserPoolDomain" => ResourceKind::PoolDomain,
            "HostingApp" | "AWS::Amplify::App" => ResourceKind::HostingApp,
            "HostingBranch" | "AWS::Amplify::Branch" => ResourceKind::HostingBranch,
            other => ResourceKind::Custom(other.to_string()),
        })
    }
}

/// A single declared resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNode {
    name: LogicalName,
    kind: ResourceKind,
    properties: Properties,
    depends_on: IndexSet<LogicalName>,
    /// Property key -> stack output name.
    exports: IndexMap<String, String>,
}

impl ResourceNode {
    pub fn new(name: LogicalName, kind: ResourceKind) -> Self {
        Self {
            name,
            kind,
            properties: Properties::new(),
            depends_on: IndexSet::new(),
            exports: IndexMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties.extend(properties);
        self
    }

    pub fn depends_on(mut self, name: LogicalName) -> Self {
        self.depends_on.insert(name);
        self
    }

    /// Flag a property as a stack output.
    pub fn export(mut self, property: impl Into<String>, output: impl Into<String>) -> Self {
        self.exports.insert(property.into(), output.into());
        self
    }

    pub fn name(&self) -> &LogicalName {
        &self.name
    }

    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Explicitly declared dependencies.
    pub fn explicit_dependencies(&self) -> impl Iterator<Item = &LogicalName> {
        self.depends_on.iter()
    }

    pub fn exports(&self) -> impl Iterator<Item = (&str, &str)> {
        self.exports.iter().map(|(p, o)| (p.as_str(), o.as_str()))
    }

    /// References found in the properties, in declaration order.
    pub fn references(&self) -> Vec<&Reference> {
        self.properties
            .values()
            .flat_map(Value::references)
            .collect()
    }
}
