//! Named deployment environments (branches / stages).

use indexmap::IndexMap;
use std::fmt;

use crate::value::SecretRef;
use crate::{Error, Result};

/// A variable available to templates in one environment.
#[derive(Clone, PartialEq, Eq)]
pub enum Variable {
    Plain(String),
    /// Looked up by the apply-engine; only the pointer is known here.
    Secret(SecretRef),
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variable::Plain(value) => f.debug_tuple("Plain").field(value).finish(),
            Variable::Secret(_) => f.write_str("Secret(***)"),
        }
    }
}

/// A named environment, e.g. `main` at stage `PRODUCTION`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    name: String,
    stage: Option<String>,
    variables: IndexMap<String, Variable>,
}

impl Environment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stage: None,
            variables: IndexMap::new(),
        }
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables
            .insert(key.into(), Variable::Plain(value.into()));
        self
    }

    pub fn with_secret(mut self, key: impl Into<String>, secret: SecretRef) -> Self {
        self.variables.insert(key.into(), Variable::Secret(secret));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage(&self) -> Option<&str> {
        self.stage.as_deref()
    }

    pub fn variable(&self, key: &str) -> Option<&Variable> {
        self.variables.get(key)
    }

    pub fn variables(&self) -> impl Iterator<Item = (&str, &Variable)> {
        self.variables.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Ordered set of the environments a stack may be synthesized for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentSet {
    environments: IndexMap<String, Environment>,
}

impl EnvironmentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, environment: Environment) -> Result<()> {
        if self.environments.contains_key(environment.name()) {
            return Err(Error::DuplicateEnvironment(environment.name().to_string()));
        }
        self.environments
            .insert(environment.name().to_string(), environment);
        Ok(())
    }

    /// Select an environment by name. There is no fallback.
    pub fn select(&self, name: &str) -> Result<&Environment> {
        self.environments
            .get(name)
            .ok_or_else(|| Error::UnknownEnvironment(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.environments.contains_key(name)
    }

    /// First declared environment.
    pub fn first(&self) -> Option<&Environment> {
        self.environments.values().next()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.environments.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Environment> {
        self.environments.values()
    }

    pub fn len(&self) -> usize {
        self.environments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.environments.is_empty()
    }
}
