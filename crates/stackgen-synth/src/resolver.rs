//! Reference resolution.
//!
//! A reference is resolved eagerly when it points at something declared: the
//! target's logical name, or one of its properties (which has already been
//! synthesized, because the target comes earlier in build order). Anything
//! else must be an attribute the provider assigns at creation time and
//! becomes a [`DeferredExpression::Attribute`].

use indexmap::IndexMap;
use stackgen_core::manifest::{DeferredExpression, ManifestResource, ManifestValue};
use stackgen_core::{Error, LogicalName, Reference, Result, Stack};

/// Attribute that resolves to the target's logical name.
pub const LOGICAL_NAME_ATTRIBUTE: &str = "logicalName";

/// Resolves references against the stack and the resources synthesized so
/// far.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    stack: &'a Stack,
    synthesized: &'a IndexMap<LogicalName, ManifestResource>,
}

impl<'a> Resolver<'a> {
    pub fn new(
        stack: &'a Stack,
        synthesized: &'a IndexMap<LogicalName, ManifestResource>,
    ) -> Self {
        Self { stack, synthesized }
    }

    /// Resolve `reference`, found in `from`, to a literal or a deferred
    /// expression.
    pub fn resolve(&self, from: &str, reference: &Reference) -> Result<ManifestValue> {
        let target = self
            .stack
            .node(reference.target.as_str())
            .map_err(|_| Error::UnresolvedReference {
                from: from.to_string(),
                target: reference.target.to_string(),
            })?;

        let attribute = &reference.attribute;
        let unknown = || Error::UnknownAttribute {
            resource: target.name().clone(),
            attribute: attribute.to_string(),
        };

        let head = attribute.head();
        if head.is_empty() {
            return Err(unknown());
        }

        if head == LOGICAL_NAME_ATTRIBUTE && attribute.tail().is_empty() {
            return Ok(ManifestValue::Str(target.name().to_string()));
        }

        if target.property(head).is_some() {
            // Omitted in this environment, or not synthesized yet.
            let mut value = self
                .synthesized
                .get(target.name())
                .and_then(|resource| resource.properties.get(head))
                .ok_or_else(unknown)?;

            for segment in attribute.tail() {
                value = match value {
                    ManifestValue::Mapping(entries) => entries.get(segment.as_str()),
                    ManifestValue::List(items) => segment
                        .parse::<usize>()
                        .ok()
                        .and_then(|index| items.get(index)),
                    _ => None,
                }
                .ok_or_else(unknown)?;
            }
            return Ok(value.clone());
        }

        if attribute.tail().is_empty() && target.kind().has_runtime_attribute(head) {
            return Ok(ManifestValue::Deferred(DeferredExpression::Attribute {
                resource: target.name().clone(),
                attribute: head.to_string(),
            }));
        }

        Err(unknown())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackgen_core::{Properties, ResourceKind, Value};

    fn name(s: &str) -> LogicalName {
        LogicalName::new(s).unwrap()
    }

    fn stack() -> Stack {
        let mut stack = Stack::new("test");
        let mut props = Properties::new();
        props.insert("userPoolName".into(), Value::str("next-userpool"));
        props.insert(
            "signInAliases".into(),
            Value::mapping([("email", true)]),
        );
        props.insert("callbacks".into(), Value::list(["https://a", "https://b"]));
        stack
            .add_node("pool", ResourceKind::IdentityPool, props, &[])
            .unwrap();
        stack
            .add_node(
                "bucket",
                ResourceKind::Custom("AWS::S3::Bucket".into()),
                Properties::new(),
                &[],
            )
            .unwrap();
        stack
    }

    fn synthesized() -> IndexMap<LogicalName, ManifestResource> {
        let mut properties = IndexMap::new();
        properties.insert("userPoolName".to_string(), ManifestValue::from("next-userpool"));
        let mut aliases = IndexMap::new();
        aliases.insert("email".to_string(), ManifestValue::Bool(true));
        properties.insert("signInAliases".to_string(), ManifestValue::Mapping(aliases));
        properties.insert(
            "callbacks".to_string(),
            ManifestValue::List(vec![
                ManifestValue::from("https://a"),
                ManifestValue::from("https://b"),
            ]),
        );

        let mut resources = IndexMap::new();
        resources.insert(
            name("pool"),
            ManifestResource {
                resource_type: "AWS::Cognito::UserPool".to_string(),
                depends_on: vec![],
                properties,
            },
        );
        resources
    }

    #[test]
    fn test_property_resolves_eagerly() {
        let stack = stack();
        let done = synthesized();
        let resolver = Resolver::new(&stack, &done);

        let value = resolver
            .resolve("client", &Reference::new(name("pool"), "userPoolName"))
            .unwrap();
        assert_eq!(value, ManifestValue::from("next-userpool"));

        let value = resolver
            .resolve("client", &Reference::new(name("pool"), "signInAliases.email"))
            .unwrap();
        assert_eq!(value, ManifestValue::Bool(true));

        let value = resolver
            .resolve("client", &Reference::new(name("pool"), "callbacks.1"))
            .unwrap();
        assert_eq!(value, ManifestValue::from("https://b"));
    }

    #[test]
    fn test_logical_name_resolves_eagerly() {
        let stack = stack();
        let done = synthesized();
        let resolver = Resolver::new(&stack, &done);

        let value = resolver
            .resolve("client", &Reference::new(name("pool"), "logicalName"))
            .unwrap();
        assert_eq!(value, ManifestValue::from("pool"));
    }

    #[test]
    fn test_runtime_attribute_is_deferred() {
        let stack = stack();
        let done = synthesized();
        let resolver = Resolver::new(&stack, &done);

        let value = resolver
            .resolve("client", &Reference::new(name("pool"), "id"))
            .unwrap();
        assert_eq!(
            value,
            ManifestValue::Deferred(DeferredExpression::Attribute {
                resource: name("pool"),
                attribute: "id".to_string(),
            })
        );

        // Unknown kinds accept any attribute.
        let value = resolver
            .resolve("client", &Reference::new(name("bucket"), "arn"))
            .unwrap();
        assert!(matches!(value, ManifestValue::Deferred(_)));
    }

    #[test]
    fn test_unknown_attribute() {
        let stack = stack();
        let done = synthesized();
        let resolver = Resolver::new(&stack, &done);

        for path in ["appId", "signInAliases.phone", "callbacks.9", "id.nested"] {
            assert!(
                matches!(
                    resolver.resolve("client", &Reference::new(name("pool"), path)),
                    Err(Error::UnknownAttribute { .. })
                ),
                "{path} should be unknown"
            );
        }
    }

    #[test]
    fn test_unresolved_reference() {
        let stack = stack();
        let done = synthesized();
        let resolver = Resolver::new(&stack, &done);

        assert_eq!(
            resolver
                .resolve("client", &Reference::new(name("ghost"), "id"))
                .unwrap_err(),
            Error::UnresolvedReference {
                from: "client".to_string(),
                target: "ghost".to_string(),
            }
        );
    }
}
