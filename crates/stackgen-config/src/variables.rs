//! Environment parameterization.
//!
//! Templates support:
//! - `${env.NAME}` - variable declared for the active environment
//! - `${environment.name}` - environment name (e.g. `main`)
//! - `${environment.stage}` - environment stage (e.g. `PRODUCTION`)
//!
//! Any other `${...}` sequence, such as the shell variable `${AWS_APP_ID}` in
//! a build command, is passed through untouched.

use indexmap::IndexMap;
use regex::Regex;
use stackgen_core::environment::{Environment, EnvironmentSet, Variable};
use stackgen_core::manifest::{DeferredExpression, ManifestValue};
use stackgen_core::value::{SecretRef, Value};
use stackgen_core::{Error, Result};
use std::sync::LazyLock;

// Matches ${env.NAME} and ${environment.KEY}; NAME may be any text up to `}`.
static VAR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{(env|environment)\.([^}]*)\}").unwrap());

enum Resolved<'a> {
    Text(String),
    Secret(&'a SecretRef),
}

fn resolve_variable<'a>(
    environment: &'a Environment,
    scope: &str,
    name: &str,
) -> Result<Resolved<'a>> {
    let missing = |variable: String| Error::MissingVariable {
        environment: environment.name().to_string(),
        variable,
    };

    match (scope, name) {
        ("env", name) => match environment.variable(name) {
            Some(Variable::Plain(value)) => Ok(Resolved::Text(value.clone())),
            Some(Variable::Secret(secret)) => Ok(Resolved::Secret(secret)),
            None => Err(missing(name.to_string())),
        },
        (_, "name") => Ok(Resolved::Text(environment.name().to_string())),
        (_, "stage") => environment
            .stage()
            .map(|stage| Resolved::Text(stage.to_string()))
            .ok_or_else(|| missing("environment.stage".to_string())),
        (_, other) => Err(missing(format!("environment.{other}"))),
    }
}

/// Interpolate a template against one environment.
///
/// Returns a plain string unless a secret variable was used; secrets become
/// deferred `$secret` parts so their values never pass through here.
pub fn apply(environment: &Environment, template: &str) -> Result<ManifestValue> {
    let mut parts = Vec::new();
    let mut text = String::new();
    let mut last = 0;

    for caps in VAR_REGEX.captures_iter(template) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        text.push_str(&template[last..whole.start()]);
        last = whole.end();

        match resolve_variable(environment, &caps[1], &caps[2])? {
            Resolved::Text(value) => text.push_str(&value),
            Resolved::Secret(secret) => {
                if !text.is_empty() {
                    parts.push(ManifestValue::Str(std::mem::take(&mut text)));
                }
                parts.push(ManifestValue::Deferred(DeferredExpression::Secret(
                    secret.clone(),
                )));
            }
        }
    }
    text.push_str(&template[last..]);

    if parts.is_empty() {
        return Ok(ManifestValue::Str(text));
    }
    if !text.is_empty() {
        parts.push(ManifestValue::Str(text));
    }
    if parts.len() == 1 {
        return Ok(parts.remove(0));
    }
    Ok(ManifestValue::Deferred(DeferredExpression::Join(parts)))
}

/// The active environment together with the set it was selected from.
#[derive(Debug, Clone, Copy)]
pub struct VariableContext<'a> {
    environments: &'a EnvironmentSet,
    environment: &'a Environment,
}

impl<'a> VariableContext<'a> {
    /// Select `name` from the declared environments.
    pub fn new(environments: &'a EnvironmentSet, name: &str) -> Result<Self> {
        let environment = environments.select(name)?;
        Ok(Self {
            environments,
            environment,
        })
    }

    pub fn environment(&self) -> &'a Environment {
        self.environment
    }

    pub fn interpolate(&self, template: &str) -> Result<ManifestValue> {
        apply(self.environment, template)
    }

    /// Pick the variant for the active environment.
    ///
    /// Every variant must name a declared environment, whichever one is
    /// active. `None` means the value is omitted in this environment.
    pub fn select<'v>(&self, variants: &'v IndexMap<String, Value>) -> Result<Option<&'v Value>> {
        if let Some(unknown) = variants
            .keys()
            .find(|name| !self.environments.contains(name))
        {
            return Err(Error::UnknownEnvironment(unknown.clone()));
        }
        Ok(variants.get(self.environment.name()))
    }
}
