//! Stack declarations.

use indexmap::IndexMap;

use crate::environment::{Environment, EnvironmentSet};
use crate::resource::{ResourceKind, ResourceNode};
use crate::value::{AttributePath, Properties, Reference, Value};
use crate::{Error, LogicalName, Result};

/// Handle returned when a node is added to a stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeHandle {
    name: LogicalName,
    index: usize,
}

impl NodeHandle {
    pub fn name(&self) -> &LogicalName {
        &self.name
    }

    /// Insertion index within the stack.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Reference to an attribute of this node.
    pub fn reference(&self, attribute: &str) -> Value {
        Value::Reference(Reference::new(
            self.name.clone(),
            AttributePath::parse(attribute),
        ))
    }
}

/// A declared stack: resources in insertion order, stack-level outputs and
/// the environments it can be synthesized for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stack {
    name: String,
    nodes: IndexMap<LogicalName, ResourceNode>,
    outputs: IndexMap<String, Value>,
    environments: EnvironmentSet,
}

impl Stack {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: IndexMap::new(),
            outputs: IndexMap::new(),
            environments: EnvironmentSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declare a resource.
    pub fn add_node(
        &mut self,
        name: &str,
        kind: ResourceKind,
        properties: Properties,
        depends_on: &[&NodeHandle],
    ) -> Result<NodeHandle> {
        let mut node = ResourceNode::new(LogicalName::new(name)?, kind).with_properties(properties);
        for dep in depends_on {
            node = node.depends_on(dep.name().clone());
        }
        self.insert(node)
    }

    /// Insert a fully built node. The first node with a given name wins;
    /// later duplicates are rejected and leave the stack unchanged.
    pub fn insert(&mut self, node: ResourceNode) -> Result<NodeHandle> {
        if self.nodes.contains_key(node.name()) {
            return Err(Error::DuplicateName(node.name().clone()));
        }
        let name = node.name().clone();
        let (index, _) = self.nodes.insert_full(name.clone(), node);
        Ok(NodeHandle { name, index })
    }

    pub fn node(&self, name: &str) -> Result<&ResourceNode> {
        self.nodes
            .get(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.nodes.get_index_of(name)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &ResourceNode> {
        self.nodes.values()
    }

    pub fn node_at(&self, index: usize) -> Option<&ResourceNode> {
        self.nodes.get_index(index).map(|(_, node)| node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Declare a stack-level output, e.g. `COGNITO_ID = pool.id`.
    pub fn add_output(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        let name = name.into();
        if self.outputs.contains_key(&name) {
            return Err(Error::DuplicateOutput(name));
        }
        self.outputs.insert(name, value.into());
        Ok(())
    }

    pub fn outputs(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.outputs.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether `value` can differ between environments: it is parameterized
    /// itself, or it references a declared property that is.
    pub fn is_parameterized(&self, value: &Value) -> bool {
        self.parameterized_within(value, self.nodes.len())
    }

    // `depth` bounds the walk on cyclic declarations.
    fn parameterized_within(&self, value: &Value, depth: usize) -> bool {
        if value.is_parameterized() {
            return true;
        }
        if depth == 0 {
            return false;
        }
        value.references().into_iter().any(|reference| {
            self.nodes
                .get(reference.target.as_str())
                .and_then(|node| node.property(reference.attribute.head()))
                .is_some_and(|property| self.parameterized_within(property, depth - 1))
        })
    }

    pub fn add_environment(&mut self, environment: Environment) -> Result<()> {
        self.environments.insert(environment)
    }

    pub fn environments(&self) -> &EnvironmentSet {
        &self.environments
    }
}
