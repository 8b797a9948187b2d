//! CLI command implementations.

pub mod synth;

use anyhow::{Context, Result, anyhow};
use stackgen_config::ConfigError;
use stackgen_core::Stack;
use stackgen_synth::{DependencyGraph, synthesize};
use std::path::Path;
use tracing::info;

/// Read and parse the stack declaration at `path`.
pub fn load_stack(path: &Path) -> Result<Stack> {
    let stack = stackgen_config::read_stack(path)
        .with_context(|| format!("failed to load stack declaration {}", path.display()))?;
    info!(stack = stack.name(), path = %path.display(), "loaded stack");
    Ok(stack)
}

/// The requested environment, or the first declared one.
pub fn environment_name(stack: &Stack, requested: Option<&str>) -> Result<String> {
    match requested {
        Some(name) => Ok(name.to_string()),
        None => stack
            .environments()
            .first()
            .map(|environment| environment.name().to_string())
            .ok_or_else(|| anyhow!("stack '{}' declares no environments", stack.name())),
    }
}

/// Logical names involved in the first stack error found in `err`'s chain,
/// without repeats.
pub fn involved_names(err: &anyhow::Error) -> Vec<String> {
    let Some(stack_error) = err.chain().find_map(|cause| {
        cause
            .downcast_ref::<stackgen_core::Error>()
            .or_else(|| match cause.downcast_ref::<ConfigError>() {
                Some(ConfigError::Stack(inner)) => Some(inner),
                _ => None,
            })
    }) else {
        return Vec::new();
    };

    let mut names: Vec<String> = Vec::new();
    for name in stack_error.names() {
        if !names.iter().any(|seen| seen == name) {
            names.push(name.to_string());
        }
    }
    names
}

pub fn validate(path: &Path) -> Result<()> {
    let stack = load_stack(path)?;
    for environment in stack.environments().names() {
        synthesize(&stack, environment)
            .with_context(|| format!("environment '{}' does not synthesize", environment))?;
    }
    println!("Configuration is valid");
    Ok(())
}

pub fn graph(path: &Path) -> Result<()> {
    let stack = load_stack(path)?;
    let graph = DependencyGraph::build(&stack).context("failed to build dependency graph")?;

    for (position, node) in graph.order().enumerate() {
        println!("{}. {} ({})", position + 1, node.name(), node.kind());
        let deps = graph.dependencies(node.name().as_str());
        if !deps.is_empty() {
            let deps: Vec<_> = deps.iter().map(|d| d.as_str()).collect();
            println!("   depends on: {}", deps.join(", "));
        }
        let varying: Vec<_> = node
            .properties()
            .iter()
            .filter(|(_, value)| stack.is_parameterized(value))
            .map(|(key, _)| key.as_str())
            .collect();
        if !varying.is_empty() {
            println!("   varies by environment: {}", varying.join(", "));
        }
    }
    Ok(())
}
