//! Manifest synthesis.
//!
//! A synthesis run selects the environment, builds the dependency graph and
//! then walks the build order, turning every declared value into a manifest
//! value. Nothing is returned unless the whole run succeeds.

use crate::graph::DependencyGraph;
use crate::render::{OutputFormat, RenderError};
use crate::resolver::Resolver;
use indexmap::IndexMap;
use serde::Serialize;
use stackgen_config::VariableContext;
use stackgen_core::manifest::{DeferredExpression, Manifest, ManifestResource, ManifestValue};
use stackgen_core::value::{Param, Value};
use stackgen_core::{Error, LogicalName, Result, Stack, StackOutputs};
use std::fmt;
use tracing::{debug, info};

/// Lifecycle of one synthesis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Declaring,
    Building,
    Resolving,
    Synthesized,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Declaring => "declaring",
            Phase::Building => "building",
            Phase::Resolving => "resolving",
            Phase::Synthesized => "synthesized",
        };
        f.write_str(s)
    }
}

/// Result of a successful synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Synthesis {
    #[serde(flatten)]
    pub manifest: Manifest,
    #[serde(skip_serializing_if = "StackOutputs::is_empty")]
    pub outputs: StackOutputs,
}

impl Synthesis {
    /// Render the manifest together with the outputs.
    pub fn render(&self, format: OutputFormat) -> std::result::Result<String, RenderError> {
        format.render(self)
    }

    /// Render the stack outputs only.
    pub fn render_outputs(&self, format: OutputFormat) -> std::result::Result<String, RenderError> {
        format.render(&self.outputs)
    }
}

/// Drives synthesis of one stack.
#[derive(Debug)]
pub struct Synthesizer<'a> {
    stack: &'a Stack,
    phase: Phase,
}

impl<'a> Synthesizer<'a> {
    pub fn new(stack: &'a Stack) -> Self {
        Self {
            stack,
            phase: Phase::Declaring,
        }
    }

    /// Phase reached by the last run. A failed run stays in the phase it
    /// failed in.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Synthesize the stack for the named environment.
    pub fn synthesize(&mut self, environment: &str) -> Result<Synthesis> {
        self.phase = Phase::Declaring;
        let ctx = VariableContext::new(self.stack.environments(), environment)?;

        self.enter(Phase::Building, environment);
        let graph = DependencyGraph::build(self.stack)?;

        self.enter(Phase::Resolving, environment);
        let mut resources: IndexMap<LogicalName, ManifestResource> = IndexMap::new();
        let mut outputs = StackOutputs::new();

        for node in graph.order() {
            let from = format!("resource '{}'", node.name());
            let mut properties = IndexMap::new();
            {
                let resolver = Resolver::new(self.stack, &resources);
                for (key, value) in node.properties() {
                    let location = format!("{}.{}", node.name(), key);
                    if let Some(resolved) = resolve_value(&ctx, &resolver, &from, &location, value)? {
                        properties.insert(key.clone(), resolved);
                    }
                }
            }

            for (property, output) in node.exports() {
                match properties.get(property) {
                    Some(value) => outputs.record(output, value.clone())?,
                    None => debug!(
                        resource = %node.name(),
                        property,
                        output,
                        "exported property omitted in this environment"
                    ),
                }
            }

            debug!(
                resource = %node.name(),
                kind = %node.kind(),
                properties = properties.len(),
                "resolved resource"
            );

            resources.insert(
                node.name().clone(),
                ManifestResource {
                    resource_type: node.kind().provider_type().to_string(),
                    depends_on: graph
                        .dependencies(node.name().as_str())
                        .into_iter()
                        .cloned()
                        .collect(),
                    properties,
                },
            );
        }

        {
            let resolver = Resolver::new(self.stack, &resources);
            for (name, value) in self.stack.outputs() {
                let from = format!("output '{}'", name);
                if let Some(resolved) = resolve_value(&ctx, &resolver, &from, &from, value)? {
                    outputs.record(name, resolved)?;
                }
            }
        }

        let environment = ctx.environment();
        let manifest = Manifest {
            stack: self.stack.name().to_string(),
            environment: environment.name().to_string(),
            stage: environment.stage().map(str::to_string),
            resources,
        };

        self.enter(Phase::Synthesized, environment.name());
        info!(
            stack = self.stack.name(),
            environment = environment.name(),
            resources = manifest.resources.len(),
            outputs = outputs.len(),
            "synthesis complete"
        );

        Ok(Synthesis { manifest, outputs })
    }

    fn enter(&mut self, phase: Phase, environment: &str) {
        info!(
            stack = self.stack.name(),
            environment,
            from = %self.phase,
            to = %phase,
            "phase transition"
        );
        self.phase = phase;
    }
}

/// Synthesize `stack` for the named environment.
pub fn synthesize(stack: &Stack, environment: &str) -> Result<Synthesis> {
    Synthesizer::new(stack).synthesize(environment)
}

/// Resolve one declared value. `None` means a `Select` had no variant for
/// the active environment and the value is omitted.
fn resolve_value(
    ctx: &VariableContext<'_>,
    resolver: &Resolver<'_>,
    from: &str,
    location: &str,
    value: &Value,
) -> Result<Option<ManifestValue>> {
    let resolved = match value {
        Value::Literal(scalar) => ManifestValue::from(scalar.clone()),
        Value::Reference(reference) => resolver.resolve(from, reference)?,
        Value::List(items) => {
            let mut resolved = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let location = format!("{location}.{i}");
                if let Some(item) = resolve_value(ctx, resolver, from, &location, item)? {
                    resolved.push(item);
                }
            }
            ManifestValue::List(resolved)
        }
        Value::Mapping(entries) => {
            let mut resolved = IndexMap::with_capacity(entries.len());
            for (key, entry) in entries {
                let location = format!("{location}.{key}");
                if let Some(entry) = resolve_value(ctx, resolver, from, &location, entry)? {
                    resolved.insert(key.clone(), entry);
                }
            }
            ManifestValue::Mapping(resolved)
        }
        Value::Join(parts) => {
            let mut joined = Joined::default();
            for part in parts {
                if let Some(part) = resolve_value(ctx, resolver, from, location, part)? {
                    joined.push(part, location)?;
                }
            }
            joined.finish()
        }
        Value::Param(Param::Template(template)) => ctx.interpolate(template)?,
        Value::Param(Param::Select(variants)) => match ctx.select(variants)? {
            Some(variant) => return resolve_value(ctx, resolver, from, location, variant),
            None => return Ok(None),
        },
        Value::Secret(secret) => ManifestValue::Deferred(DeferredExpression::Secret(secret.clone())),
    };
    Ok(Some(resolved))
}

/// Accumulates the parts of a join, merging adjacent literal text.
#[derive(Default)]
struct Joined {
    parts: Vec<ManifestValue>,
    text: String,
}

impl Joined {
    fn push(&mut self, part: ManifestValue, location: &str) -> Result<()> {
        match part {
            ManifestValue::Null => {}
            ManifestValue::Bool(b) => self.text.push_str(&b.to_string()),
            ManifestValue::Int(i) => self.text.push_str(&i.to_string()),
            ManifestValue::Str(s) => self.text.push_str(&s),
            ManifestValue::Deferred(DeferredExpression::Join(inner)) => {
                for part in inner {
                    self.push(part, location)?;
                }
            }
            ManifestValue::Deferred(expr) => {
                self.flush();
                self.parts.push(ManifestValue::Deferred(expr));
            }
            ManifestValue::List(_) | ManifestValue::Mapping(_) => {
                return Err(Error::InvalidValue {
                    location: location.to_string(),
                    message: "only scalars and deferred values can be joined".to_string(),
                });
            }
        }
        Ok(())
    }

    fn flush(&mut self) {
        if !self.text.is_empty() {
            self.parts.push(ManifestValue::Str(std::mem::take(&mut self.text)));
        }
    }

    fn finish(mut self) -> ManifestValue {
        if self.parts.is_empty() {
            return ManifestValue::Str(self.text);
        }
        self.flush();
        if self.parts.len() == 1 {
            return self.parts.remove(0);
        }
        ManifestValue::Deferred(DeferredExpression::Join(self.parts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackgen_core::value::{SecretRef, dotenv_line};
    use stackgen_core::{Environment, Properties, Reference, ResourceKind, ResourceNode};

    fn name(s: &str) -> LogicalName {
        LogicalName::new(s).unwrap()
    }

    fn props<const N: usize>(entries: [(&str, Value); N]) -> Properties {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    /// Pool, client and app, declared in reverse dependency order.
    fn auth_stack() -> Stack {
        let mut stack = Stack::new("next-auth");
        stack
            .add_environment(
                Environment::new("main")
                    .with_stage("PRODUCTION")
                    .with_var("NEXTAUTH_URL", "https://main.example.com/")
                    .with_secret("NEXTAUTH_SECRET", SecretRef::new("next-auth").with_key("secret")),
            )
            .unwrap();
        stack
            .add_environment(
                Environment::new("dev")
                    .with_stage("DEVELOPMENT")
                    .with_var("NEXTAUTH_URL", "https://dev.example.com/")
                    .with_secret("NEXTAUTH_SECRET", SecretRef::new("next-auth-dev")),
            )
            .unwrap();

        stack
            .insert(
                ResourceNode::new(name("app"), ResourceKind::HostingApp).with_properties(props([
                    ("name", Value::str("next-auth-app")),
                    (
                        "buildCommands",
                        Value::list([
                            dotenv_line(
                                "COGNITO_ID",
                                Value::Reference(Reference::new(name("pool"), "id")),
                                ".env.production",
                            ),
                            dotenv_line("NEXTAUTH_URL", Value::env("NEXTAUTH_URL"), ".env.production"),
                            dotenv_line(
                                "NEXTAUTH_SECRET",
                                Value::env("NEXTAUTH_SECRET"),
                                ".env.production",
                            ),
                        ]),
                    ),
                    (
                        "performanceMode",
                        Value::select([("dev", Value::bool(true))]),
                    ),
                ])),
            )
            .unwrap();
        stack
            .insert(
                ResourceNode::new(name("client"), ResourceKind::PoolClient)
                    .with_properties(props([
                        ("userPoolId", Value::Reference(Reference::new(name("pool"), "id"))),
                        (
                            "userPoolName",
                            Value::Reference(Reference::new(name("pool"), "userPoolName")),
                        ),
                        ("generateSecret", Value::bool(false)),
                    ]))
                    .export("userPoolId", "CLIENT_POOL_ID"),
            )
            .unwrap();
        stack
            .add_node(
                "pool",
                ResourceKind::IdentityPool,
                props([
                    ("userPoolName", Value::str("next-userpool")),
                    ("selfSignUpEnabled", Value::bool(true)),
                ]),
                &[],
            )
            .unwrap();
        stack
            .add_output("COGNITO_ID", Reference::new(name("pool"), "id"))
            .unwrap();
        stack
    }

    fn deferred_ref(resource: &str, attribute: &str) -> ManifestValue {
        ManifestValue::Deferred(DeferredExpression::Attribute {
            resource: name(resource),
            attribute: attribute.to_string(),
        })
    }

    #[test]
    fn test_pool_and_client() {
        let stack = auth_stack();
        let synthesis = synthesize(&stack, "main").unwrap();
        let manifest = &synthesis.manifest;

        assert!(manifest.position("pool") < manifest.position("client"));
        assert!(manifest.position("pool") < manifest.position("app"));

        let client = manifest.resource("client").unwrap();
        assert_eq!(client.resource_type, "AWS::Cognito::UserPoolClient");
        assert_eq!(client.depends_on, vec![name("pool")]);
        assert_eq!(client.properties["userPoolId"], deferred_ref("pool", "id"));
        assert_eq!(
            client.properties["userPoolName"],
            ManifestValue::from("next-userpool")
        );
        assert_eq!(client.properties["generateSecret"], ManifestValue::Bool(false));
    }

    #[test]
    fn test_pool_ref_with_explicit_dependency() {
        let mut stack = Stack::new("scenario");
        stack.add_environment(Environment::new("main")).unwrap();
        let pool = stack
            .add_node("pool", ResourceKind::IdentityPool, Properties::new(), &[])
            .unwrap();
        stack
            .add_node(
                "client",
                ResourceKind::PoolClient,
                props([("poolRef", pool.reference("id"))]),
                &[&pool],
            )
            .unwrap();

        let manifest = synthesize(&stack, "main").unwrap().manifest;
        let order: Vec<_> = manifest.order().map(LogicalName::as_str).collect();
        assert_eq!(order, vec!["pool", "client"]);
        assert_eq!(
            manifest.resource("client").unwrap().properties["poolRef"],
            deferred_ref("pool", "id")
        );
    }

    #[test]
    fn test_outputs_recorded() {
        let stack = auth_stack();
        let synthesis = synthesize(&stack, "main").unwrap();

        let names: Vec<_> = synthesis.outputs.names().collect();
        assert_eq!(names, vec!["CLIENT_POOL_ID", "COGNITO_ID"]);
        assert_eq!(
            synthesis.outputs.get("COGNITO_ID"),
            Some(&deferred_ref("pool", "id"))
        );
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        let stack = auth_stack();
        let first = synthesize(&stack, "main").unwrap();
        let second = synthesize(&stack, "main").unwrap();

        assert_eq!(first, second);
        assert_eq!(
            first.render(OutputFormat::Json).unwrap(),
            second.render(OutputFormat::Json).unwrap()
        );
        assert_eq!(
            first.render(OutputFormat::Yaml).unwrap(),
            second.render(OutputFormat::Yaml).unwrap()
        );
    }

    #[test]
    fn test_manifest_is_topologically_sound() {
        let stack = auth_stack();
        let manifest = synthesize(&stack, "dev").unwrap().manifest;

        for (name, resource) in &manifest.resources {
            for dep in &resource.depends_on {
                assert!(
                    manifest.position(dep.as_str()) < manifest.position(name.as_str()),
                    "{dep} must come before {name}"
                );
            }
        }
    }

    #[test]
    fn test_environment_isolation() {
        let mut stack = auth_stack();
        let branch = stack
            .add_node(
                "branch",
                ResourceKind::HostingBranch,
                props([
                    ("branchName", Value::str("main")),
                    ("stage", Value::template("${environment.stage}")),
                ]),
                &[],
            )
            .unwrap();
        stack
            .add_node(
                "site",
                ResourceKind::Custom("Test::Site".into()),
                props([
                    ("label", branch.reference("stage")),
                    ("branch", branch.reference("branchName")),
                ]),
                &[],
            )
            .unwrap();

        let main = synthesize(&stack, "main").unwrap().manifest;
        let dev = synthesize(&stack, "dev").unwrap().manifest;

        assert_eq!(main.environment, "main");
        assert_eq!(main.stage.as_deref(), Some("PRODUCTION"));
        assert_eq!(dev.stage.as_deref(), Some("DEVELOPMENT"));

        for node in stack.nodes() {
            let main_props = &main.resource(node.name().as_str()).unwrap().properties;
            let dev_props = &dev.resource(node.name().as_str()).unwrap().properties;
            for (key, value) in node.properties() {
                if !stack.is_parameterized(value) {
                    assert_eq!(main_props.get(key), dev_props.get(key), "{}.{key}", node.name());
                }
            }
        }

        let main_app = main.resource("app").unwrap();
        let dev_app = dev.resource("app").unwrap();
        assert_ne!(
            main_app.properties["buildCommands"],
            dev_app.properties["buildCommands"]
        );
        assert!(!main_app.properties.contains_key("performanceMode"));
        assert_eq!(dev_app.properties["performanceMode"], ManifestValue::Bool(true));

        // An eager reference carries the target's per-environment value.
        let main_site = &main.resource("site").unwrap().properties;
        let dev_site = &dev.resource("site").unwrap().properties;
        assert_eq!(main_site["label"], ManifestValue::from("PRODUCTION"));
        assert_eq!(dev_site["label"], ManifestValue::from("DEVELOPMENT"));
        assert_eq!(main_site["branch"], dev_site["branch"]);
    }

    #[test]
    fn test_build_commands_join_deferred_values() {
        let stack = auth_stack();
        let manifest = synthesize(&stack, "main").unwrap().manifest;
        let ManifestValue::List(commands) = &manifest.resource("app").unwrap().properties["buildCommands"]
        else {
            panic!("buildCommands should be a list");
        };

        assert_eq!(
            commands[0],
            ManifestValue::Deferred(DeferredExpression::Join(vec![
                ManifestValue::from("echo \"COGNITO_ID="),
                deferred_ref("pool", "id"),
                ManifestValue::from("\" >> .env.production"),
            ]))
        );
        assert_eq!(
            commands[1],
            ManifestValue::from("echo \"NEXTAUTH_URL=https://main.example.com/\" >> .env.production")
        );
        assert_eq!(
            commands[2],
            ManifestValue::Deferred(DeferredExpression::Join(vec![
                ManifestValue::from("echo \"NEXTAUTH_SECRET="),
                ManifestValue::Deferred(DeferredExpression::Secret(
                    SecretRef::new("next-auth").with_key("secret")
                )),
                ManifestValue::from("\" >> .env.production"),
            ]))
        );
    }

    #[test]
    fn test_secret_rendered_as_lookup() {
        let stack = auth_stack();
        let json = synthesize(&stack, "main")
            .unwrap()
            .render(OutputFormat::Json)
            .unwrap();

        assert!(json.contains(r#""$secret": {"#));
        assert!(json.contains(r#""name": "next-auth""#));
        assert!(json.contains(r#""$ref": {"#));
    }

    #[test]
    fn test_logical_name_and_nested_joins() {
        let mut stack = Stack::new("joins");
        stack.add_environment(Environment::new("main")).unwrap();
        let pool = stack
            .add_node(
                "pool",
                ResourceKind::IdentityPool,
                props([("domain", Value::mapping([("prefix", "auth")]))]),
                &[],
            )
            .unwrap();
        stack
            .add_node(
                "site",
                ResourceKind::Custom("Test::Site".into()),
                props([
                    (
                        "url",
                        Value::join([
                            Value::str("https://"),
                            pool.reference("domain.prefix"),
                            Value::join([Value::str("."), Value::int(8080)]),
                            Value::null(),
                        ]),
                    ),
                    ("owner", pool.reference("logicalName")),
                ]),
                &[],
            )
            .unwrap();

        let manifest = synthesize(&stack, "main").unwrap().manifest;
        let site = manifest.resource("site").unwrap();
        assert_eq!(site.properties["url"], ManifestValue::from("https://auth.8080"));
        assert_eq!(site.properties["owner"], ManifestValue::from("pool"));
        assert_eq!(site.depends_on, vec![name("pool")]);
    }

    #[test]
    fn test_join_rejects_collections() {
        let mut stack = Stack::new("joins");
        stack.add_environment(Environment::new("main")).unwrap();
        stack
            .add_node(
                "site",
                ResourceKind::Custom("Test::Site".into()),
                props([("url", Value::join([Value::list(["a"])]))]),
                &[],
            )
            .unwrap();

        assert!(matches!(
            synthesize(&stack, "main"),
            Err(Error::InvalidValue { location, .. }) if location == "site.url"
        ));
    }

    #[test]
    fn test_cycle_aborts_in_building_phase() {
        let mut stack = Stack::new("cyclic");
        stack.add_environment(Environment::new("main")).unwrap();
        stack
            .add_node(
                "a",
                ResourceKind::Custom("Test::A".into()),
                props([("b", Value::Reference(Reference::new(name("b"), "id")))]),
                &[],
            )
            .unwrap();
        stack
            .add_node(
                "b",
                ResourceKind::Custom("Test::B".into()),
                props([("a", Value::Reference(Reference::new(name("a"), "id")))]),
                &[],
            )
            .unwrap();

        let mut synthesizer = Synthesizer::new(&stack);
        let err = synthesizer.synthesize("main").unwrap_err();
        assert_eq!(synthesizer.phase(), Phase::Building);

        assert!(matches!(err, Error::CycleDetected { .. }));
        assert!(err.to_string().contains("a -> b -> a"), "{err}");
    }

    #[test]
    fn test_phases() {
        let stack = auth_stack();
        let mut synthesizer = Synthesizer::new(&stack);
        assert_eq!(synthesizer.phase(), Phase::Declaring);

        synthesizer.synthesize("main").unwrap();
        assert_eq!(synthesizer.phase(), Phase::Synthesized);

        assert!(synthesizer.synthesize("qa").is_err());
        assert_eq!(synthesizer.phase(), Phase::Declaring);
    }

    #[test]
    fn test_unknown_environment() {
        let stack = auth_stack();
        assert_eq!(
            synthesize(&stack, "staging").unwrap_err(),
            Error::UnknownEnvironment("staging".to_string())
        );
    }

    #[test]
    fn test_missing_variable() {
        let mut stack = auth_stack();
        stack.add_environment(Environment::new("preview")).unwrap();

        assert!(matches!(
            synthesize(&stack, "preview"),
            Err(Error::MissingVariable { environment, variable })
                if environment == "preview" && variable == "NEXTAUTH_URL"
        ));
    }

    #[test]
    fn test_unknown_attribute_aborts() {
        let mut stack = auth_stack();
        stack
            .add_output("BAD", Reference::new(name("pool"), "appId"))
            .unwrap();

        assert!(matches!(
            synthesize(&stack, "main"),
            Err(Error::UnknownAttribute { resource, attribute })
                if resource == "pool" && attribute == "appId"
        ));
    }

    #[test]
    fn test_omitted_export_is_skipped() {
        let mut stack = auth_stack();
        stack
            .insert(
                ResourceNode::new(name("tuning"), ResourceKind::Custom("Test::Tuning".into()))
                    .with_properties(props([(
                        "mode",
                        Value::select([("dev", Value::str("fast"))]),
                    )]))
                    .export("mode", "TUNING_MODE"),
            )
            .unwrap();

        let main = synthesize(&stack, "main").unwrap();
        assert!(!main.manifest.resource("tuning").unwrap().properties.contains_key("mode"));
        assert_eq!(main.outputs.get("TUNING_MODE"), None);
        assert!(main.outputs.get("CLIENT_POOL_ID").is_some());

        let dev = synthesize(&stack, "dev").unwrap();
        assert_eq!(dev.outputs.get("TUNING_MODE"), Some(&ManifestValue::from("fast")));
    }

    #[test]
    fn test_omitted_output_is_skipped() {
        let mut stack = auth_stack();
        stack
            .add_output("PERFORMANCE_MODE", Value::select([("dev", Value::bool(true))]))
            .unwrap();

        let main = synthesize(&stack, "main").unwrap();
        let names: Vec<_> = main.outputs.names().collect();
        assert_eq!(names, vec!["CLIENT_POOL_ID", "COGNITO_ID"]);

        let dev = synthesize(&stack, "dev").unwrap();
        assert_eq!(
            dev.outputs.get("PERFORMANCE_MODE"),
            Some(&ManifestValue::Bool(true))
        );
    }

    #[test]
    fn test_reference_to_omitted_property_aborts() {
        let mut stack = auth_stack();
        stack
            .add_node(
                "site",
                ResourceKind::Custom("Test::Site".into()),
                props([(
                    "fast",
                    Value::Reference(Reference::new(name("app"), "performanceMode")),
                )]),
                &[],
            )
            .unwrap();

        assert!(matches!(
            synthesize(&stack, "main"),
            Err(Error::UnknownAttribute { resource, attribute })
                if resource == "app" && attribute == "performanceMode"
        ));

        let dev = synthesize(&stack, "dev").unwrap().manifest;
        assert_eq!(
            dev.resource("site").unwrap().properties["fast"],
            ManifestValue::Bool(true)
        );
    }

    #[test]
    fn test_duplicate_output() {
        let mut stack = auth_stack();
        stack
            .add_output("CLIENT_POOL_ID", Reference::new(name("pool"), "arn"))
            .unwrap();

        assert_eq!(
            synthesize(&stack, "main").unwrap_err(),
            Error::DuplicateOutput("CLIENT_POOL_ID".to_string())
        );
    }

    #[test]
    fn test_demo_stack() {
        let stack = stackgen_config::parse_stack(include_str!("../../../stacks/next-auth.kdl"))
            .unwrap();

        for environment in ["main", "dev"] {
            let synthesis = synthesize(&stack, environment).unwrap();
            let order: Vec<_> = synthesis.manifest.order().map(LogicalName::as_str).collect();
            assert_eq!(
                order,
                vec!["pool", "client", "domain", "app", "main-branch", "dev-branch"]
            );

            let main_branch = &synthesis.manifest.resource("main-branch").unwrap().properties;
            let dev_branch = &synthesis.manifest.resource("dev-branch").unwrap().properties;
            assert_eq!(main_branch["branchName"], ManifestValue::from("main"));
            assert_eq!(main_branch["stage"], ManifestValue::from("PRODUCTION"));
            assert!(!main_branch.contains_key("enablePerformanceMode"));
            assert_eq!(dev_branch["branchName"], ManifestValue::from("dev"));
            assert_eq!(dev_branch["stage"], ManifestValue::from("DEVELOPMENT"));
            assert_eq!(dev_branch["enablePerformanceMode"], ManifestValue::Bool(true));
            assert_eq!(main_branch["appId"], deferred_ref("app", "appId"));

            let outputs: Vec<_> = synthesis.outputs.names().collect();
            assert_eq!(outputs, vec!["COGNITO_ID", "COGNITO_CLIENT_ID"]);
            assert_eq!(
                synthesis.outputs.get("COGNITO_CLIENT_ID"),
                Some(&deferred_ref("client", "id"))
            );

            let json = synthesis.render(OutputFormat::Json).unwrap();
            assert!(json.contains("$secret"));
            assert!(json.contains("${AWS_APP_ID}"));
        }

        // Both manifests describe the same resources; only the build's
        // environment values differ.
        let main = synthesize(&stack, "main").unwrap().manifest;
        let dev = synthesize(&stack, "dev").unwrap().manifest;
        let main_names: Vec<_> = main.order().collect();
        let dev_names: Vec<_> = dev.order().collect();
        assert_eq!(main_names, dev_names);
        for name in ["pool", "client", "domain", "main-branch", "dev-branch"] {
            assert_eq!(main.resource(name), dev.resource(name), "{name}");
        }
        assert_ne!(main.resource("app"), dev.resource("app"));
    }
}
