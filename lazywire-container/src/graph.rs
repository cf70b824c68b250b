//! Provider graph construction and validation.
//!
//! Built once during `resolve()`, after matching:
//! - links every factory input to a value, a factory or a binding
//! - reports the first input nothing provides
//! - detects cycles and computes each node's depth
//!
//! After [`Graph::build`] succeeds the graph is immutable except for the
//! per-node execution state.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::{debug, instrument, warn};

use lazywire_support::rendering::suggest_similar;

use crate::error::{CircularDependencyError, InjectorError, NotRegisteredError, Result};
use crate::factory::{Cleanup, ErasedFactory};
use crate::interface::{CastFn, Instance};
use crate::key::DependencyKey;
use crate::matcher::{Binding, Literal, Tables};
use crate::provider::ProviderOptions;

const MAX_SUGGESTIONS: usize = 3;

/// Where an instance comes from.
#[derive(Clone)]
pub(crate) enum Source {
    Literal(Literal),
    Node(usize),
}

/// A located dependency: its source and, for interfaces reached through a
/// binding, the cast applied when the instance is handed out.
#[derive(Clone)]
pub(crate) struct ResolvedInput {
    /// The key that was asked for.
    pub key: DependencyKey,
    pub source: Source,
    pub cast: Option<CastFn>,
}

/// Memoized result of a node's single execution.
#[derive(Clone)]
pub(crate) enum Outcome {
    Produced(Instance),
    Failed(InjectorError),
}

impl Outcome {
    pub fn to_result(&self) -> Result<Instance> {
        match self {
            Self::Produced(instance) => Ok(Arc::clone(instance)),
            Self::Failed(error) => Err(error.clone()),
        }
    }
}

/// A factory placed in the graph.
pub(crate) struct ProviderNode {
    pub id: usize,
    pub factory: ErasedFactory,
    pub options: ProviderOptions,
    pub inputs: Vec<ResolvedInput>,
    /// Nodes this one consumes, in input order.
    pub dependencies: Vec<usize>,
    /// 0 for nodes without factory dependencies, `-1` until computed.
    pub depth: i64,
    pub outcome: OnceCell<Outcome>,
    pub cleanup: Mutex<Option<Cleanup>>,
}

impl ProviderNode {
    fn new(id: usize, factory: ErasedFactory, options: ProviderOptions) -> Self {
        Self {
            id,
            factory,
            options,
            inputs: Vec::new(),
            dependencies: Vec::new(),
            depth: -1,
            outcome: OnceCell::new(),
            cleanup: Mutex::new(None),
        }
    }

    pub fn output(&self) -> DependencyKey {
        self.factory.output
    }

    pub fn is_executed(&self) -> bool {
        self.outcome.get().is_some()
    }
}

/// The validated provider graph with its lookup tables.
pub(crate) struct Graph {
    pub values: HashMap<DependencyKey, Literal>,
    pub bindings: HashMap<DependencyKey, Binding>,
    pub providers: HashMap<DependencyKey, usize>,
    pub nodes: Vec<ProviderNode>,
}

impl Graph {
    /// Links inputs, then checks the graph for cycles.
    ///
    /// # Errors
    /// - [`InjectorError::NotRegistered`]: an input has no provider
    /// - [`InjectorError::CircularDependency`]: cycle detected
    #[instrument(skip_all, name = "graph_validation")]
    pub fn build(tables: Tables) -> Result<Self> {
        let Tables {
            values,
            bindings,
            providers,
            factories,
        } = tables;

        let nodes = factories
            .into_iter()
            .enumerate()
            .map(|(id, registered)| ProviderNode::new(id, registered.descriptor, registered.options))
            .collect();

        let mut graph = Self {
            values,
            bindings,
            providers,
            nodes,
        };

        debug!(
            node_count = graph.nodes.len(),
            "Starting dependency graph validation"
        );

        graph.link()?;
        graph.compute_depths()?;

        debug!("Dependency graph validation passed ✓");
        Ok(graph)
    }

    /// Finds what provides `key`.
    ///
    /// Lookup order: the value table, the provider map, then the binding
    /// table followed by a value or provider for the bound concrete type.
    pub fn locate(&self, key: &DependencyKey) -> Option<ResolvedInput> {
        if let Some(source) = self.direct(key) {
            return Some(ResolvedInput {
                key: *key,
                source,
                cast: None,
            });
        }

        let binding = self.bindings.get(key)?;
        self.direct(&binding.concrete).map(|source| ResolvedInput {
            key: *key,
            source,
            cast: Some(binding.cast),
        })
    }

    fn direct(&self, key: &DependencyKey) -> Option<Source> {
        if let Some(literal) = self.values.get(key) {
            return Some(Source::Literal(literal.clone()));
        }
        self.providers.get(key).map(|&id| Source::Node(id))
    }

    /// Error for a key nothing provides, with similarly named alternatives.
    pub fn not_registered(&self, requested: DependencyKey, required_by: Option<DependencyKey>) -> InjectorError {
        let available: Vec<&str> = self
            .values
            .keys()
            .chain(self.providers.keys())
            .chain(self.bindings.keys())
            .map(|key| key.type_name())
            .collect();

        InjectorError::NotRegistered(NotRegisteredError {
            requested,
            required_by,
            suggestions: suggest_similar(requested.type_name(), &available, MAX_SUGGESTIONS),
        })
    }

    fn link(&mut self) -> Result<()> {
        for id in 0..self.nodes.len() {
            let node = &self.nodes[id];
            let mut inputs = Vec::with_capacity(node.factory.inputs.len());
            let mut dependencies = Vec::new();

            for key in &node.factory.inputs {
                let input = self
                    .locate(key)
                    .ok_or_else(|| self.not_registered(*key, Some(node.output())))?;
                if let Source::Node(dep) = input.source {
                    dependencies.push(dep);
                }
                inputs.push(input);
            }

            let node = &mut self.nodes[id];
            node.inputs = inputs;
            node.dependencies = dependencies;
        }
        Ok(())
    }

    /// Depth-first search over every node in id order.
    fn compute_depths(&mut self) -> Result<()> {
        let count = self.nodes.len();
        let mut visited = vec![false; count];
        let mut on_stack = vec![false; count];
        let mut path = Vec::new();

        for id in 0..count {
            if !visited[id] {
                self.visit(id, &mut visited, &mut on_stack, &mut path)?;
            }
        }
        Ok(())
    }

    fn visit(
        &mut self,
        id: usize,
        visited: &mut [bool],
        on_stack: &mut [bool],
        path: &mut Vec<usize>,
    ) -> Result<()> {
        visited[id] = true;
        on_stack[id] = true;
        path.push(id);

        let mut max_depth: i64 = -1;
        for index in 0..self.nodes[id].dependencies.len() {
            let dep = self.nodes[id].dependencies[index];

            if on_stack[dep] {
                let start = path.iter().position(|&p| p == dep).unwrap_or(0);
                let mut chain: Vec<DependencyKey> =
                    path[start..].iter().map(|&p| self.nodes[p].output()).collect();
                chain.push(self.nodes[dep].output());

                warn!(cycle = ?chain, "Circular dependency detected!");

                return Err(InjectorError::CircularDependency(CircularDependencyError {
                    chain,
                }));
            }

            if !visited[dep] {
                self.visit(dep, visited, on_stack, path)?;
            }
            max_depth = max_depth.max(self.nodes[dep].depth);
        }

        self.nodes[id].depth = max_depth + 1;
        on_stack[id] = false;
        path.pop();
        Ok(())
    }
}
