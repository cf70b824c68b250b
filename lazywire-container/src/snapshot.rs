//! Read-only view of a container's provider graph.

use std::fmt;

use serde::Serialize;

use lazywire_support::rendering::{GraphLine, render_graph, shorten_type_name};

use crate::container::Phase;
use crate::factory::FactoryShape;
use crate::graph::Graph;

/// Snapshot returned by [`Container::graph`](crate::Container::graph).
///
/// Serializable with serde; `Display` prints one line per factory, ordered
/// by depth.
#[derive(Debug, Clone, Serialize)]
pub struct GraphSnapshot {
    pub phase: Phase,
    /// Types held in the value table, sorted.
    pub values: Vec<String>,
    pub bindings: Vec<BindingSnapshot>,
    /// Factories in registration order.
    pub nodes: Vec<NodeSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingSnapshot {
    pub interface: String,
    pub concrete: String,
}

/// One factory of the graph.
#[derive(Debug, Clone, Serialize)]
pub struct NodeSnapshot {
    pub output: String,
    pub inputs: Vec<String>,
    pub depth: i64,
    pub shape: FactoryShape,
    pub namespace: Option<String>,
    /// The factory ran, successfully or not.
    pub executed: bool,
    /// A cleanup is waiting for `clean()`.
    pub has_cleanup: bool,
}

impl GraphSnapshot {
    pub(crate) fn empty(phase: Phase) -> Self {
        Self {
            phase,
            values: Vec::new(),
            bindings: Vec::new(),
            nodes: Vec::new(),
        }
    }

    pub(crate) fn capture(phase: Phase, graph: &Graph) -> Self {
        let mut values: Vec<String> = graph.values.keys().map(|k| k.type_name().to_string()).collect();
        values.sort();

        let mut bindings: Vec<BindingSnapshot> = graph
            .bindings
            .iter()
            .map(|(interface, binding)| BindingSnapshot {
                interface: interface.type_name().to_string(),
                concrete: binding.concrete.type_name().to_string(),
            })
            .collect();
        bindings.sort_by(|a, b| a.interface.cmp(&b.interface));

        let nodes = graph
            .nodes
            .iter()
            .map(|node| NodeSnapshot {
                output: node.output().type_name().to_string(),
                inputs: node
                    .factory
                    .inputs
                    .iter()
                    .map(|k| k.type_name().to_string())
                    .collect(),
                depth: node.depth,
                shape: node.factory.shape,
                namespace: node.options.namespace.clone(),
                executed: node.is_executed(),
                has_cleanup: node.cleanup.lock().is_some(),
            })
            .collect();

        Self {
            phase,
            values,
            bindings,
            nodes,
        }
    }

    /// Looks up a node by the short name of its output type.
    pub fn node(&self, short_name: &str) -> Option<&NodeSnapshot> {
        self.nodes
            .iter()
            .find(|n| shorten_type_name(&n.output) == short_name)
    }
}

impl fmt::Display for GraphSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines: Vec<GraphLine> = self
            .nodes
            .iter()
            .map(|node| GraphLine {
                output: shorten_type_name(&node.output),
                depth: node.depth,
                inputs: node.inputs.iter().map(|i| shorten_type_name(i)).collect(),
                executed: node.executed,
            })
            .collect();
        lines.sort_by_key(|line| line.depth);

        writeln!(f, "Container ({})", self.phase)?;
        f.write_str(&render_graph(&lines))
    }
}
