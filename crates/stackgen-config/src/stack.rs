//! Stack declaration parsing.

use crate::{ConfigError, ConfigResult};
use indexmap::IndexMap;
use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use stackgen_core::value::{Param, Reference, SecretRef, Value, dotenv_line};
use stackgen_core::{Environment, LogicalName, ResourceKind, ResourceNode, Stack};
use std::path::Path;
use tracing::debug;

const DEFAULT_DOTENV_FILE: &str = ".env";
const DOTENV_FILE_PROPERTY: &str = "file";
/// Named entry on a resource property that flags it as a stack output.
const EXPORT_PROPERTY: &str = "output";

/// Read and parse a stack declaration file.
pub fn read_stack(path: impl AsRef<Path>) -> ConfigResult<Stack> {
    let content = std::fs::read_to_string(path)?;
    parse_stack(&content)
}

/// Parse a stack declaration from KDL text.
pub fn parse_stack(kdl: &str) -> ConfigResult<Stack> {
    let doc: KdlDocument = kdl.parse()?;

    let mut name = None;
    let mut environments = Vec::new();
    let mut resources = Vec::new();
    let mut outputs = Vec::new();

    for node in doc.nodes() {
        match node.name().value() {
            "stack" => {
                name = Some(
                    get_first_string_arg(node)
                        .ok_or_else(|| ConfigError::MissingField("stack name".to_string()))?,
                );
            }
            "environment" => {
                environments.push(parse_environment(node)?);
            }
            "resource" => {
                resources.push(parse_resource(node)?);
            }
            "output" => {
                outputs.push(parse_output(node)?);
            }
            _ => {} // Ignore unknown nodes
        }
    }

    let name = name.ok_or_else(|| ConfigError::MissingField("stack name".to_string()))?;
    if environments.is_empty() {
        return Err(ConfigError::MissingField(format!(
            "environment for stack '{}'",
            name
        )));
    }

    let mut stack = Stack::new(name);
    for environment in environments {
        stack.add_environment(environment)?;
    }
    for resource in resources {
        stack.insert(resource)?;
    }
    for (output, value) in outputs {
        stack.add_output(output, value)?;
    }

    debug!(
        stack = stack.name(),
        resources = stack.len(),
        environments = stack.environments().len(),
        "parsed stack declaration"
    );
    Ok(stack)
}

fn parse_environment(node: &KdlNode) -> ConfigResult<Environment> {
    let name = get_first_string_arg(node)
        .ok_or_else(|| ConfigError::MissingField("environment name".to_string()))?;

    let mut environment = Environment::new(name.clone());
    if let Some(stage) = get_string_prop(node, "stage") {
        environment = environment.with_stage(stage);
    }

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "var" => {
                    let args = get_all_string_args(child);
                    let [key, value] = args.as_slice() else {
                        return Err(ConfigError::InvalidValue {
                            field: format!("var in environment '{}'", name),
                            message: "expected a name and a string value".to_string(),
                        });
                    };
                    environment = environment.with_var(key, value);
                }
                "secret" => {
                    let args = get_all_string_args(child);
                    let key = args.first().ok_or_else(|| {
                        ConfigError::MissingField(format!("secret name in environment '{}'", name))
                    })?;
                    let secret = match (args.get(1), get_string_prop(child, "name")) {
                        (Some(spec), _) => SecretRef::parse(spec),
                        (None, Some(secret_name)) => {
                            let secret = SecretRef::new(secret_name);
                            match get_string_prop(child, "key") {
                                Some(secret_key) => secret.with_key(secret_key),
                                None => secret,
                            }
                        }
                        (None, None) => {
                            return Err(ConfigError::MissingField(format!(
                                "store name for secret '{}' in environment '{}'",
                                key, name
                            )));
                        }
                    };
                    environment = environment.with_secret(key, secret);
                }
                _ => {}
            }
        }
    }

    Ok(environment)
}

fn parse_resource(node: &KdlNode) -> ConfigResult<ResourceNode> {
    let name = get_first_string_arg(node)
        .ok_or_else(|| ConfigError::MissingField("resource name".to_string()))?;
    let kind = get_string_prop(node, "kind")
        .ok_or_else(|| ConfigError::MissingField(format!("kind for resource '{}'", name)))?;
    let Ok(kind) = kind.parse::<ResourceKind>();

    let mut resource = ResourceNode::new(LogicalName::new(name.as_str())?, kind);
    for dep in get_string_list_prop(node, "depends-on") {
        resource = resource.depends_on(LogicalName::new(dep)?);
    }

    if let Some(children) = node.children() {
        for child in children.nodes() {
            let key = child.name().value();
            if key == "depends-on" {
                continue;
            }
            let path = format!("{}.{}", name, key);
            if resource.property(key).is_some() {
                return Err(ConfigError::InvalidValue {
                    field: path,
                    message: "property declared twice".to_string(),
                });
            }

            let value = property_value(child, &path, &[EXPORT_PROPERTY])?;
            if let Some(output) = get_string_prop(child, EXPORT_PROPERTY) {
                resource = resource.export(key, output);
            }
            resource = resource.with_property(key, value);
        }
    }

    Ok(resource)
}

fn parse_output(node: &KdlNode) -> ConfigResult<(String, Value)> {
    let args = positional_entries(node);
    let [name, value] = args.as_slice() else {
        return Err(ConfigError::InvalidValue {
            field: "output".to_string(),
            message: "expected a name and a value".to_string(),
        });
    };
    let name = name
        .value()
        .as_string()
        .ok_or_else(|| ConfigError::MissingField("output name".to_string()))?
        .to_string();
    let value = entry_value(value, &format!("output '{}'", name))?;
    Ok((name, value))
}

/// Convert a property node (and its children) into a value.
fn node_value(node: &KdlNode, path: &str) -> ConfigResult<Value> {
    property_value(node, path, &[])
}

/// Like [`node_value`], also accepting the named entries in `read_by_caller`.
fn property_value(node: &KdlNode, path: &str, read_by_caller: &[&str]) -> ConfigResult<Value> {
    let ty = node.ty().map(|ty| ty.value());
    let known: &[&str] = match ty {
        Some("dotenv") => &[DOTENV_FILE_PROPERTY],
        _ => &[],
    };
    for entry in node.entries() {
        let Some(name) = entry.name().map(|name| name.value()) else {
            continue;
        };
        if !known.contains(&name) && !read_by_caller.contains(&name) {
            return Err(ConfigError::InvalidValue {
                field: path.to_string(),
                message: format!("unknown property '{}'", name),
            });
        }
    }

    match ty {
        None => plain_value(node, path),
        Some("join") => join_value(node, path),
        Some("select") => select_value(node, path),
        Some("dotenv") => dotenv_value(node, path),
        Some(other) => Err(ConfigError::InvalidValue {
            field: path.to_string(),
            message: format!("unknown node type '{}'", other),
        }),
    }
}

fn plain_value(node: &KdlNode, path: &str) -> ConfigResult<Value> {
    let args = positional_entries(node);

    match (args.as_slice(), node.children()) {
        ([], None) => Ok(Value::null()),
        ([], Some(children)) => block_value(children, path),
        (_, Some(_)) => Err(ConfigError::InvalidValue {
            field: path.to_string(),
            message: "a property takes either arguments or a children block".to_string(),
        }),
        ([single], None) => entry_value(single, path),
        (many, None) => Ok(Value::List(
            many.iter()
                .map(|entry| entry_value(entry, path))
                .collect::<ConfigResult<_>>()?,
        )),
    }
}

/// A children block is a list when every child is named `-`, a mapping
/// otherwise.
fn block_value(children: &KdlDocument, path: &str) -> ConfigResult<Value> {
    let nodes = children.nodes();
    if !nodes.is_empty() && nodes.iter().all(|n| n.name().value() == "-") {
        let items = nodes
            .iter()
            .enumerate()
            .map(|(i, item)| node_value(item, &format!("{}.{}", path, i)))
            .collect::<ConfigResult<_>>()?;
        return Ok(Value::List(items));
    }

    let mut entries = IndexMap::new();
    for child in nodes {
        let key = child.name().value();
        let child_path = format!("{}.{}", path, key);
        if key == "-" {
            return Err(ConfigError::InvalidValue {
                field: child_path,
                message: "list items cannot be mixed with named entries".to_string(),
            });
        }
        if entries.contains_key(key) {
            return Err(ConfigError::InvalidValue {
                field: child_path,
                message: "key declared twice".to_string(),
            });
        }
        let value = node_value(child, &child_path)?;
        entries.insert(key.to_string(), value);
    }
    Ok(Value::Mapping(entries))
}

fn join_value(node: &KdlNode, path: &str) -> ConfigResult<Value> {
    let args = positional_entries(node);
    let parts = if !args.is_empty() {
        args.iter()
            .map(|entry| entry_value(entry, path))
            .collect::<ConfigResult<_>>()?
    } else {
        node.children()
            .map(|children| children.nodes())
            .unwrap_or_default()
            .iter()
            .map(|part| node_value(part, path))
            .collect::<ConfigResult<_>>()?
    };
    Ok(Value::Join(parts))
}

fn select_value(node: &KdlNode, path: &str) -> ConfigResult<Value> {
    let children = node.children().ok_or_else(|| ConfigError::InvalidValue {
        field: path.to_string(),
        message: "select needs one child per environment".to_string(),
    })?;

    let mut variants = IndexMap::new();
    for child in children.nodes() {
        let environment = child.name().value();
        if variants.contains_key(environment) {
            return Err(ConfigError::InvalidValue {
                field: path.to_string(),
                message: format!("environment '{}' selected twice", environment),
            });
        }
        let value = node_value(child, &format!("{}[{}]", path, environment))?;
        variants.insert(environment.to_string(), value);
    }
    Ok(Value::Param(Param::Select(variants)))
}

fn dotenv_value(node: &KdlNode, path: &str) -> ConfigResult<Value> {
    let args = positional_entries(node);
    let [key, value] = args.as_slice() else {
        return Err(ConfigError::InvalidValue {
            field: path.to_string(),
            message: "dotenv expects a variable name and a value".to_string(),
        });
    };
    let key = key
        .value()
        .as_string()
        .ok_or_else(|| ConfigError::InvalidValue {
            field: path.to_string(),
            message: "dotenv variable name must be a string".to_string(),
        })?;
    let value = entry_value(value, path)?;
    let file = get_string_prop(node, DOTENV_FILE_PROPERTY)
        .unwrap_or_else(|| DEFAULT_DOTENV_FILE.to_string());
    Ok(dotenv_line(key, value, &file))
}

/// Convert a single argument, honouring its type annotation.
fn entry_value(entry: &KdlEntry, path: &str) -> ConfigResult<Value> {
    let Some(ty) = entry.ty() else {
        return scalar_value(entry.value(), path);
    };

    let ty = ty.value();
    let text = entry
        .value()
        .as_string()
        .ok_or_else(|| ConfigError::InvalidValue {
            field: path.to_string(),
            message: format!("({}) values must be strings", ty),
        })?;

    match ty {
        "ref" => parse_reference(text, path),
        "tpl" => Ok(Value::template(text)),
        "env" => Ok(Value::env(text)),
        "secret" => Ok(Value::Secret(SecretRef::parse(text))),
        other => Err(ConfigError::InvalidValue {
            field: path.to_string(),
            message: format!("unknown value type '{}'", other),
        }),
    }
}

fn scalar_value(value: &KdlValue, path: &str) -> ConfigResult<Value> {
    match value {
        KdlValue::String(s) => Ok(Value::str(s.as_str())),
        KdlValue::Bool(b) => Ok(Value::bool(*b)),
        KdlValue::Null => Ok(Value::null()),
        KdlValue::Integer(i) => {
            let i = i64::try_from(*i).map_err(|_| ConfigError::InvalidValue {
                field: path.to_string(),
                message: format!("integer {} out of range", i),
            })?;
            Ok(Value::int(i))
        }
        KdlValue::Float(_) => Err(ConfigError::InvalidValue {
            field: path.to_string(),
            message: "floating point values are not supported; quote the value".to_string(),
        }),
    }
}

/// Parse `resource.attribute.path`.
fn parse_reference(text: &str, path: &str) -> ConfigResult<Value> {
    match text.split_once('.') {
        Some((target, attribute)) if !attribute.is_empty() => Ok(Value::Reference(
            Reference::new(LogicalName::new(target)?, attribute),
        )),
        _ => Err(ConfigError::InvalidValue {
            field: path.to_string(),
            message: format!("reference '{}' must look like <resource>.<attribute>", text),
        }),
    }
}

// Helper functions for extracting values from KDL nodes

fn positional_entries(node: &KdlNode) -> Vec<&KdlEntry> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .collect()
}

fn get_first_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

fn get_all_string_args(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| e.value().as_string())
        .map(|s| s.to_string())
        .collect()
}

fn get_string_prop(node: &KdlNode, name: &str) -> Option<String> {
    node.get(name)
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
}

fn get_string_list_prop(node: &KdlNode, name: &str) -> Vec<String> {
    // Repeated properties: depends-on="a" depends-on="b"
    let mut result: Vec<String> = node
        .entries()
        .iter()
        .filter(|e| e.name().is_some_and(|n| n.value() == name))
        .filter_map(|e| e.value().as_string())
        .map(|s| s.to_string())
        .collect();

    // Block syntax: depends-on "a" "b"
    if let Some(children) = node.children() {
        for child in children.nodes() {
            if child.name().value() == name {
                result.extend(get_all_string_args(child));
            }
        }
    }

    result
}
