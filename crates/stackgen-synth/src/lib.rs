//! Manifest synthesis for stackgen.
//!
//! Builds the dependency graph of a declared stack, orders it, resolves
//! references and environment parameters, and produces the manifest together
//! with the stack outputs.

pub mod graph;
pub mod render;
pub mod resolver;
pub mod synthesizer;

pub use graph::DependencyGraph;
pub use render::{OutputFormat, RenderError};
pub use resolver::Resolver;
pub use synthesizer::{Phase, Synthesis, Synthesizer, synthesize};
