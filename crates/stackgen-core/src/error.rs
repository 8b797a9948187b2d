//! Error types for stackgen.

use thiserror::Error;

use crate::LogicalName;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("invalid logical name: '{0}'")]
    InvalidName(String),

    #[error("duplicate resource name: {0}")]
    DuplicateName(LogicalName),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("cycle detected in dependencies: {}", format_cycle(.cycle))]
    CycleDetected { cycle: Vec<LogicalName> },

    #[error("unknown environment: {0}")]
    UnknownEnvironment(String),

    #[error("duplicate environment: {0}")]
    DuplicateEnvironment(String),

    #[error("duplicate output: {0}")]
    DuplicateOutput(String),

    #[error("unresolved reference: {from} refers to unknown resource '{target}'")]
    UnresolvedReference { from: String, target: String },

    #[error("unknown attribute '{attribute}' on resource '{resource}'")]
    UnknownAttribute {
        resource: LogicalName,
        attribute: String,
    },

    #[error("variable '{variable}' is not defined for environment '{environment}'")]
    MissingVariable {
        environment: String,
        variable: String,
    },

    #[error("invalid value in {location}: {message}")]
    InvalidValue { location: String, message: String },
}

impl Error {
    /// Logical names involved in the error, for callers that want to point
    /// at the offending declarations.
    pub fn names(&self) -> Vec<&str> {
        match self {
            Error::DuplicateName(name) => vec![name.as_str()],
            Error::NotFound(name) => vec![name.as_str()],
            Error::CycleDetected { cycle } => cycle.iter().map(LogicalName::as_str).collect(),
            Error::UnresolvedReference { target, .. } => vec![target.as_str()],
            Error::UnknownAttribute { resource, .. } => vec![resource.as_str()],
            _ => Vec::new(),
        }
    }
}

fn format_cycle(cycle: &[LogicalName]) -> String {
    cycle
        .iter()
        .map(LogicalName::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_contains_full_path() {
        let cycle = ["a", "b", "a"]
            .into_iter()
            .map(|n| LogicalName::new(n).unwrap())
            .collect();
        let err = Error::CycleDetected { cycle };
        assert_eq!(
            err.to_string(),
            "cycle detected in dependencies: a -> b -> a"
        );
        assert_eq!(err.names(), vec!["a", "b", "a"]);
    }
}
