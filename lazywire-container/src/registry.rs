//! Provider registry: descriptors waiting for `resolve()`.
//!
//! The registry only accumulates. Sets are flattened and every descriptor
//! lands in the list for its kind, tagged with its position among all
//! declarations. Validation is the matcher's job.

use tracing::trace;

use crate::factory::ErasedFactory;
use crate::provider::{
    BindingProvider, InterfaceValueProvider, Provider, ProviderKind, ProviderOptions, ValueProvider,
};

/// A descriptor together with its modifiers.
#[derive(Debug)]
pub(crate) struct Registered<T> {
    pub descriptor: T,
    pub options: ProviderOptions,
    /// Declaration order across every kind.
    pub seq: usize,
}

/// Descriptors partitioned by kind.
#[derive(Default)]
pub(crate) struct Registry {
    pub values: Vec<Registered<ValueProvider>>,
    pub interface_values: Vec<Registered<InterfaceValueProvider>>,
    pub bindings: Vec<Registered<BindingProvider>>,
    pub factories: Vec<Registered<ErasedFactory>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a provider, flattening nested sets.
    pub fn add(&mut self, provider: Provider) {
        let Provider { kind, options } = provider;
        let seq = self.len();

        match kind {
            ProviderKind::Set(set) => {
                for provider in set {
                    self.add(provider);
                }
            }
            ProviderKind::Value(descriptor) => {
                trace!(key = %descriptor.key, namespace = ?options.namespace, "Registered value");
                self.values.push(Registered {
                    descriptor,
                    options,
                    seq,
                });
            }
            ProviderKind::InterfaceValue(descriptor) => {
                trace!(
                    interface = %descriptor.interface,
                    concrete = %descriptor.concrete,
                    namespace = ?options.namespace,
                    "Registered interface value"
                );
                self.interface_values.push(Registered {
                    descriptor,
                    options,
                    seq,
                });
            }
            ProviderKind::Binding(descriptor) => {
                trace!(
                    interface = %descriptor.interface,
                    concrete = %descriptor.concrete,
                    namespace = ?options.namespace,
                    "Registered binding"
                );
                self.bindings.push(Registered {
                    descriptor,
                    options,
                    seq,
                });
            }
            ProviderKind::Factory(descriptor) => {
                trace!(output = %descriptor.output, namespace = ?options.namespace, "Registered factory");
                self.factories.push(Registered {
                    descriptor,
                    options,
                    seq,
                });
            }
        }
    }

    /// Number of descriptors of every kind.
    pub fn len(&self) -> usize {
        self.values.len() + self.interface_values.len() + self.bindings.len() + self.factories.len()
    }
}
