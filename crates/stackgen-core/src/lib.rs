//! Core types for stackgen.
//!
//! This crate contains:
//! - Logical names and the resource node model
//! - Declaration values (literals, references, joins, parameters, secrets)
//! - Stack declarations and environments
//! - The synthesized manifest and stack outputs

pub mod environment;
pub mod error;
pub mod manifest;
pub mod name;
pub mod output;
pub mod resource;
pub mod stack;
pub mod value;

pub use environment::{Environment, EnvironmentSet, Variable};
pub use error::{Error, Result};
pub use manifest::{DeferredExpression, Manifest, ManifestResource, ManifestValue};
pub use name::LogicalName;
pub use output::StackOutputs;
pub use resource::{ResourceKind, ResourceNode};
pub use stack::{NodeHandle, Stack};
pub use value::{
    AttributePath, Param, Properties, Reference, Scalar, SecretRef, Value, dotenv_line,
};
