//! Dependency graph and build order.

use stackgen_core::{Error, LogicalName, ResourceNode, Result, Stack};
use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap};
use tracing::debug;

/// Dependency graph of one stack, derived fresh for every synthesis.
///
/// Edges come from explicit `depends_on` declarations and from every
/// reference found in a node's properties.
#[derive(Debug)]
pub struct DependencyGraph<'a> {
    stack: &'a Stack,
    /// Direct dependencies per node, by insertion index, ascending.
    dependencies: Vec<Vec<usize>>,
    /// Build order, by insertion index.
    order: Vec<usize>,
}

impl<'a> DependencyGraph<'a> {
    /// Build the graph, reject cycles and compute the build order.
    pub fn build(stack: &'a Stack) -> Result<Self> {
        let mut dependencies = Vec::with_capacity(stack.len());

        for node in stack.nodes() {
            let mut deps = BTreeSet::new();
            for dep in node.explicit_dependencies() {
                let index = stack
                    .index_of(dep.as_str())
                    .ok_or_else(|| Error::NotFound(dep.to_string()))?;
                deps.insert(index);
            }
            for reference in node.references() {
                let index = stack.index_of(reference.target.as_str()).ok_or_else(|| {
                    Error::UnresolvedReference {
                        from: format!("resource '{}'", node.name()),
                        target: reference.target.to_string(),
                    }
                })?;
                deps.insert(index);
            }
            dependencies.push(deps.into_iter().collect::<Vec<_>>());
        }

        for (output, value) in stack.outputs() {
            if let Some(reference) = value
                .references()
                .into_iter()
                .find(|r| stack.index_of(r.target.as_str()).is_none())
            {
                return Err(Error::UnresolvedReference {
                    from: format!("output '{}'", output),
                    target: reference.target.to_string(),
                });
            }
        }

        if let Some(cycle) = find_cycle(&dependencies) {
            let cycle = cycle
                .into_iter()
                .filter_map(|i| stack.node_at(i))
                .map(|node| node.name().clone())
                .collect();
            return Err(Error::CycleDetected { cycle });
        }

        let order = topological_order(&dependencies);
        debug!(
            stack = stack.name(),
            nodes = order.len(),
            edges = dependencies.iter().map(Vec::len).sum::<usize>(),
            "built dependency graph"
        );

        Ok(Self {
            stack,
            dependencies,
            order,
        })
    }

    /// Nodes in build order: every node comes after all of its dependencies,
    /// ties broken by insertion order.
    pub fn order(&self) -> impl Iterator<Item = &'a ResourceNode> + '_ {
        self.order.iter().filter_map(|&i| self.stack.node_at(i))
    }

    /// Direct dependencies of a node, in insertion order.
    pub fn dependencies(&self, name: &str) -> Vec<&'a LogicalName> {
        self.stack
            .index_of(name)
            .and_then(|i| self.dependencies.get(i))
            .map(|deps| {
                deps.iter()
                    .filter_map(|&d| self.stack.node_at(d))
                    .map(ResourceNode::name)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Detect a cycle using DFS. Returns the cycle path with the first node
/// repeated at the end.
fn find_cycle(dependencies: &[Vec<usize>]) -> Option<Vec<usize>> {
    let mut marks = vec![Mark::Unvisited; dependencies.len()];
    let mut path = Vec::new();

    for node in 0..dependencies.len() {
        if marks[node] == Mark::Unvisited {
            if let Some(cycle) = dfs_find_cycle(node, dependencies, &mut marks, &mut path) {
                return Some(cycle);
            }
        }
    }
    None
}

fn dfs_find_cycle(
    node: usize,
    dependencies: &[Vec<usize>],
    marks: &mut [Mark],
    path: &mut Vec<usize>,
) -> Option<Vec<usize>> {
    marks[node] = Mark::InProgress;
    path.push(node);

    for &dep in &dependencies[node] {
        match marks[dep] {
            Mark::InProgress => {
                let start = path.iter().position(|&n| n == dep).unwrap_or(0);
                let mut cycle = path[start..].to_vec();
                cycle.push(dep);
                return Some(cycle);
            }
            Mark::Unvisited => {
                if let Some(cycle) = dfs_find_cycle(dep, dependencies, marks, path) {
                    return Some(cycle);
                }
            }
            Mark::Done => {}
        }
    }

    path.pop();
    marks[node] = Mark::Done;
    None
}

/// Kahn's algorithm; among ready nodes the earliest inserted goes first.
fn topological_order(dependencies: &[Vec<usize>]) -> Vec<usize> {
    let mut remaining: Vec<usize> = dependencies.iter().map(Vec::len).collect();
    let mut dependents = vec![Vec::new(); dependencies.len()];
    for (node, deps) in dependencies.iter().enumerate() {
        for &dep in deps {
            dependents[dep].push(node);
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = remaining
        .iter()
        .enumerate()
        .filter(|(_, count)| **count == 0)
        .map(|(node, _)| Reverse(node))
        .collect();

    let mut order = Vec::with_capacity(dependencies.len());
    while let Some(Reverse(node)) = ready.pop() {
        order.push(node);
        for &dependent in &dependents[node] {
            remaining[dependent] -= 1;
            if remaining[dependent] == 0 {
                ready.push(Reverse(dependent));
            }
        }
    }
    order
}
