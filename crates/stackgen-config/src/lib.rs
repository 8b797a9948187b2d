//! Stack declaration parsing and environment parameterization for stackgen.
//!
//! This crate handles:
//! - Stack declarations (stackgen.kdl)
//! - Environment variable interpolation and per-environment selection

pub mod error;
pub mod stack;
pub mod variables;

pub use error::{ConfigError, ConfigResult};
pub use stack::{parse_stack, read_stack};
pub use variables::{VariableContext, apply};
