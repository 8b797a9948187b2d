//! Stack output collection.

use indexmap::IndexMap;
use serde::Serialize;

use crate::manifest::ManifestValue;
use crate::{Error, Result};

/// Append-only, ordered named outputs of one synthesis run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StackOutputs {
    entries: IndexMap<String, ManifestValue>,
}

impl StackOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an output. Names cannot be reused.
    pub fn record(&mut self, name: impl Into<String>, value: ManifestValue) -> Result<()> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(Error::DuplicateOutput(name));
        }
        self.entries.insert(name, value);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ManifestValue> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ManifestValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_keeps_order_and_rejects_duplicates() {
        let mut outputs = StackOutputs::new();
        outputs.record("COGNITO_ID", ManifestValue::from("a")).unwrap();
        outputs
            .record("COGNITO_CLIENT_ID", ManifestValue::from("b"))
            .unwrap();

        let err = outputs
            .record("COGNITO_ID", ManifestValue::from("c"))
            .unwrap_err();
        assert_eq!(err, Error::DuplicateOutput("COGNITO_ID".to_string()));

        let names: Vec<_> = outputs.names().collect();
        assert_eq!(names, vec!["COGNITO_ID", "COGNITO_CLIENT_ID"]);
        assert_eq!(outputs.get("COGNITO_ID"), Some(&ManifestValue::from("a")));
    }
}
