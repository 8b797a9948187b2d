//! Manifest and output commands.

use super::{environment_name, load_stack};
use anyhow::{Context, Result};
use stackgen_synth::{OutputFormat, synthesize};
use std::path::Path;
use tracing::info;

pub fn synth(
    path: &Path,
    environment: Option<&str>,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    let stack = load_stack(path)?;
    let environment = environment_name(&stack, environment)?;

    let synthesis = synthesize(&stack, &environment)
        .with_context(|| format!("failed to synthesize environment '{}'", environment))?;
    let rendered = synthesis
        .render(format)
        .context("failed to render manifest")?;

    match output {
        Some(output) => {
            std::fs::write(output, &rendered)
                .with_context(|| format!("failed to write {}", output.display()))?;
            info!(path = %output.display(), %format, "wrote manifest");
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

pub fn outputs(path: &Path, environment: Option<&str>, format: OutputFormat) -> Result<()> {
    let stack = load_stack(path)?;
    let environment = environment_name(&stack, environment)?;

    let synthesis = synthesize(&stack, &environment)
        .with_context(|| format!("failed to synthesize environment '{}'", environment))?;
    let rendered = synthesis
        .render_outputs(format)
        .context("failed to render outputs")?;
    print!("{}", rendered);
    Ok(())
}
