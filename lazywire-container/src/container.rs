//! # The Container
//!
//! Collects providers, validates them in one `resolve()` pass, then builds
//! each requested type lazily, at most once.
//!
//! # Lifecycle
//! ```text
//!  New ──resolve()──> Resolved ──clean()──> Cleaned
//!   │                                          ▲
//!   └──────────────────clean()─────────────────┘
//! ```
//!
//! `provide()` only has an effect in the `New` phase. Requests (`get`,
//! `inject_as`, `inject`) need a successful `resolve()` and fail once the
//! container is cleaned. A failed `resolve()` is final: its error is
//! returned again by every later `resolve()` and request.
//!
//! # Examples
//! ```rust
//! use lazywire_container::prelude::*;
//! use std::sync::Arc;
//!
//! trait Logger: Send + Sync {
//!     fn log(&self, msg: &str) -> String;
//! }
//!
//! struct ConsoleLogger;
//! impl Logger for ConsoleLogger {
//!     fn log(&self, msg: &str) -> String { format!("[console] {msg}") }
//! }
//!
//! interface!(dyn Logger = [ConsoleLogger]);
//!
//! struct UserService {
//!     logger: Arc<dyn Logger>,
//! }
//!
//! let container = Container::new();
//! container.provide([
//!     bind::<dyn Logger, ConsoleLogger>(),
//!     func(|| ConsoleLogger),
//!     func(|logger: Arc<dyn Logger>| Arc::new(UserService { logger })),
//! ]);
//! container.resolve().expect("valid configuration");
//!
//! let service: Arc<UserService> = container.get().expect("service");
//! assert_eq!(service.logger.log("hi"), "[console] hi");
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{InjectorError, Result};
use crate::factory::{Cleanup, Injectable, Produced, extract};
use crate::graph::{Graph, Outcome, ProviderNode, ResolvedInput, Source};
use crate::interface::Instance;
use crate::key::DependencyKey;
use crate::matcher::{Literal, match_providers};
use crate::provider::Provider;
use crate::registry::Registry;
use crate::snapshot::GraphSnapshot;

/// Lifecycle phase of a [`Container`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    /// Accepting providers.
    New,
    /// Validated; requests are served.
    Resolved,
    /// Torn down by `clean()`.
    Cleaned,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::Resolved => write!(f, "resolved"),
            Self::Cleaned => write!(f, "cleaned"),
        }
    }
}

/// Types whose fields can be filled from a container.
///
/// Usually derived with `#[derive(Inject)]`.
pub trait Inject {
    /// Fills every injectable field, stopping at the first error.
    fn inject_fields(&mut self, container: &Container) -> Result<()>;
}

struct State {
    phase: Phase,
    registry: Registry,
    /// Error of the failed `resolve()`, replayed by every later call.
    failure: Option<InjectorError>,
    graph: Option<Graph>,
    /// Executed node ids, kept sorted by depth.
    log: Mutex<Vec<usize>>,
}

impl State {
    /// The graph, if requests may be served.
    fn ready(&self) -> Result<&Graph> {
        if self.phase == Phase::Cleaned {
            return Err(InjectorError::AlreadyCleaned);
        }
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        match (&self.graph, self.phase) {
            (Some(graph), Phase::Resolved) => Ok(graph),
            _ => Err(InjectorError::NotResolved),
        }
    }
}

/// Thread-safe, lazily resolving dependency injection container.
///
/// `Container` is a cheap handle: clones share the same providers and
/// instances. Factories may take a `Container` parameter to resolve further
/// types from inside their body. They must not call `provide`, `resolve` or
/// `clean` on it, nor request their own output.
#[derive(Clone)]
pub struct Container {
    state: Arc<RwLock<State>>,
}

impl Container {
    /// Creates an empty container in the `New` phase.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(State {
                phase: Phase::New,
                registry: Registry::new(),
                failure: None,
                graph: None,
                log: Mutex::new(Vec::new()),
            })),
        }
    }

    /// Adds providers: one descriptor, a set, an array or a `Vec` of them.
    ///
    /// Ignored with a warning once `resolve()` has been called.
    pub fn provide(&self, providers: impl Into<Provider>) {
        let provider = providers.into();
        let mut state = self.state.write();

        if state.phase != Phase::New || state.failure.is_some() {
            warn!(phase = %state.phase, "Container no longer accepts providers, ignoring");
            return;
        }

        state.registry.add(provider);
    }

    /// Validates every provider and builds the dependency graph.
    ///
    /// No factory runs here. Configuration errors from all descriptors are
    /// reported together.
    ///
    /// # Errors
    /// - [`InjectorError::AlreadyCleaned`], [`InjectorError::AlreadyResolved`]
    /// - [`InjectorError::Configuration`]: invalid or duplicate descriptors
    /// - [`InjectorError::NotRegistered`]: a factory input has no provider
    /// - [`InjectorError::CircularDependency`]: factories form a cycle
    #[instrument(skip(self), name = "container_resolve")]
    pub fn resolve(&self) -> Result<()> {
        let mut state = self.state.write();

        match state.phase {
            Phase::Cleaned => return Err(InjectorError::AlreadyCleaned),
            Phase::Resolved => return Err(InjectorError::AlreadyResolved),
            Phase::New => {}
        }
        if let Some(failure) = &state.failure {
            return Err(failure.clone());
        }

        info!(registered = state.registry.len(), "Resolving container");

        let registry = std::mem::take(&mut state.registry);
        let result = match_providers(registry)
            .map_err(InjectorError::Configuration)
            .and_then(Graph::build);

        match result {
            Ok(graph) => {
                state.graph = Some(graph);
                state.phase = Phase::Resolved;
                info!("Container resolved ✓");
                Ok(())
            }
            Err(error) => {
                warn!(%error, "Container resolution failed");
                state.failure = Some(error.clone());
                Err(error)
            }
        }
    }

    /// Resolves a value of type `T`, running any factories it needs.
    ///
    /// Interfaces are requested as `Arc<dyn Trait>`.
    ///
    /// ```rust,ignore
    /// let db: Arc<Database> = container.get()?;
    /// ```
    pub fn get<T: Injectable>(&self) -> Result<T> {
        let key = DependencyKey::of::<T>();
        trace!(key = %key, "Resolving");

        let state = self.state.read_recursive();
        let graph = state.ready()?;
        let instance = self.request(graph, &state.log, &key)?;

        extract::<T>(Some(&instance))
    }

    /// Resolves `T` into `target`.
    ///
    /// `target` is left untouched on error.
    pub fn inject_as<T: Injectable>(&self, target: &mut T) -> Result<()> {
        *target = self.get::<T>()?;
        Ok(())
    }

    /// Fills the injectable fields of `target`, in declaration order.
    pub fn inject<S: Inject + ?Sized>(&self, target: &mut S) -> Result<()> {
        self.state.read_recursive().ready()?;
        target.inject_fields(self)
    }

    /// Runs captured cleanups, most dependent first, and moves the
    /// container to `Cleaned`.
    ///
    /// Safe to call in any phase; later calls do nothing.
    #[instrument(skip(self), name = "container_clean")]
    pub fn clean(&self) {
        let cleanups: Vec<(DependencyKey, Cleanup)> = {
            let mut state = self.state.write();
            if state.phase == Phase::Cleaned {
                return;
            }
            state.phase = Phase::Cleaned;

            let log = std::mem::take(&mut *state.log.lock());
            match &state.graph {
                Some(graph) => log
                    .iter()
                    .rev()
                    .filter_map(|&id| {
                        let node = &graph.nodes[id];
                        node.cleanup.lock().take().map(|cleanup| (node.output(), cleanup))
                    })
                    .collect(),
                None => Vec::new(),
            }
        };

        info!(cleanups = cleanups.len(), "Cleaning container");
        for (output, cleanup) in cleanups {
            debug!(output = %output, "Running cleanup");
            cleanup.run();
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.state.read_recursive().phase
    }

    /// Snapshot of the provider graph; empty before `resolve()` succeeds.
    pub fn graph(&self) -> GraphSnapshot {
        let state = self.state.read_recursive();
        match &state.graph {
            Some(graph) => GraphSnapshot::capture(state.phase, graph),
            None => GraphSnapshot::empty(state.phase),
        }
    }

    fn request(&self, graph: &Graph, log: &Mutex<Vec<usize>>, key: &DependencyKey) -> Result<Instance> {
        let input = graph
            .locate(key)
            .ok_or_else(|| graph.not_registered(*key, None))?;

        let mut executed = false;
        let result = self.materialize(graph, log, &input, &mut executed);

        if executed {
            log.lock().sort_by_key(|&id| graph.nodes[id].depth);
        }
        result
    }

    fn materialize(
        &self,
        graph: &Graph,
        log: &Mutex<Vec<usize>>,
        input: &ResolvedInput,
        executed: &mut bool,
    ) -> Result<Instance> {
        let instance: Instance = match &input.source {
            Source::Literal(Literal::Instance(instance)) => Arc::clone(instance),
            Source::Literal(Literal::Container) => Arc::new(self.clone()),
            Source::Node(id) => self.realize(graph, log, *id, executed)?,
        };

        match input.cast {
            None => Ok(instance),
            Some(cast) => cast(&instance).ok_or(InjectorError::TypeMismatch {
                expected: input.key.type_name(),
            }),
        }
    }

    /// Returns the memoized output of a node, executing it and its
    /// unexecuted ancestors first.
    fn realize(
        &self,
        graph: &Graph,
        log: &Mutex<Vec<usize>>,
        id: usize,
        executed: &mut bool,
    ) -> Result<Instance> {
        let node = &graph.nodes[id];
        if let Some(outcome) = node.outcome.get() {
            return outcome.to_result();
        }

        for &dep in &node.dependencies {
            self.realize(graph, log, dep, executed)?;
        }

        node.outcome
            .get_or_init(|| self.execute(graph, log, node, executed))
            .to_result()
    }

    fn execute(
        &self,
        graph: &Graph,
        log: &Mutex<Vec<usize>>,
        node: &ProviderNode,
        executed: &mut bool,
    ) -> Outcome {
        let args = node
            .inputs
            .iter()
            .map(|input| self.materialize(graph, log, input, executed))
            .collect::<Result<Vec<_>>>();

        let result = args.and_then(|args| {
            debug!(output = %node.output(), depth = node.depth, "Executing provider");
            node.factory.invoke(&args)
        });

        match result {
            Ok(Produced { value, cleanup }) => {
                if !cleanup.is_none() {
                    *node.cleanup.lock() = Some(cleanup);
                }
                log.lock().push(node.id);
                *executed = true;
                Outcome::Produced(value)
            }
            Err(error) => {
                warn!(output = %node.output(), %error, "Provider failed");
                Outcome::Failed(error)
            }
        }
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read_recursive();
        let mut debug = f.debug_struct("Container");
        debug.field("phase", &state.phase);

        match &state.graph {
            Some(graph) => debug
                .field("values", &graph.values.len())
                .field("bindings", &graph.bindings.len())
                .field("providers", &graph.nodes.len()),
            None => debug.field("registered", &state.registry.len()),
        };
        debug.finish()
    }
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::{Container, Inject, Phase};
    pub use crate::error::{InjectorError, Result};
    pub use crate::factory::{Cleanup, Injectable};
    pub use crate::interface;
    pub use crate::interface::Interface;
    pub use crate::key::DependencyKey;
    pub use crate::provider::{
        Provider, ProviderSet, bind, func, func_with_cleanup, if_not_exists, interface_value,
        namespace, set, try_func, try_func_with_cleanup, value,
    };
    pub use crate::snapshot::GraphSnapshot;
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════
