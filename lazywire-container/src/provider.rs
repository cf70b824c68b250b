//! Provider descriptors: what a container can be told about a type.
//!
//! Descriptors are plain declarations. Nothing is checked when they are
//! built; [`Container::resolve`](crate::Container::resolve) validates all
//! of them in one pass.
//!
//! # Examples
//! ```rust
//! use lazywire_container::prelude::*;
//! use std::sync::Arc;
//!
//! #[derive(Clone)]
//! struct Config { addr: String }
//!
//! struct Server { addr: String }
//!
//! let providers = set([
//!     value(Config { addr: "localhost".into() }),
//!     func(|cfg: Config| Arc::new(Server { addr: cfg.addr })),
//! ]);
//!
//! let container = Container::new();
//! container.provide(providers);
//! container.resolve().expect("valid providers");
//!
//! let server: Arc<Server> = container.get().expect("server");
//! assert_eq!(server.addr, "localhost");
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::BoxError;
use crate::factory::{Cleanup, ErasedFactory, Factory};
use crate::interface::{CastFn, Instance, Interface, cast_instance, interface_key};
use crate::key::DependencyKey;

/// Modifiers shared by every descriptor kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderOptions {
    /// Silently drop this provider if its type is already provided.
    pub if_not_exists: bool,
    /// Reserved label; stored and logged, not used for lookups.
    pub namespace: Option<String>,
}

/// One provider declaration, or a group of them.
pub struct Provider {
    pub(crate) kind: ProviderKind,
    pub(crate) options: ProviderOptions,
}

pub(crate) enum ProviderKind {
    Value(ValueProvider),
    InterfaceValue(InterfaceValueProvider),
    Binding(BindingProvider),
    Factory(ErasedFactory),
    Set(ProviderSet),
}

pub(crate) struct ValueProvider {
    pub key: DependencyKey,
    pub instance: Instance,
}

pub(crate) struct InterfaceValueProvider {
    pub interface: DependencyKey,
    pub concrete: DependencyKey,
    /// The value viewed through the interface, `None` if it is not a
    /// declared implementor.
    pub instance: Option<Instance>,
}

pub(crate) struct BindingProvider {
    pub interface: DependencyKey,
    pub concrete: DependencyKey,
    pub implemented: bool,
    pub cast: CastFn,
}

impl Provider {
    fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            options: ProviderOptions::default(),
        }
    }

    /// Marks this provider (or every provider of a set) as skip-if-exists.
    pub fn if_not_exists(mut self) -> Self {
        self.apply(&|options| options.if_not_exists = true);
        self
    }

    /// Tags this provider (or every provider of a set) with a namespace.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        self.apply(&|options| options.namespace = Some(namespace.clone()));
        self
    }

    pub fn options(&self) -> &ProviderOptions {
        &self.options
    }

    /// Type this provider makes available, `None` for sets.
    pub fn provides(&self) -> Option<DependencyKey> {
        match &self.kind {
            ProviderKind::Value(v) => Some(v.key),
            ProviderKind::InterfaceValue(v) => Some(v.interface),
            ProviderKind::Binding(b) => Some(b.interface),
            ProviderKind::Factory(f) => Some(f.output),
            ProviderKind::Set(_) => None,
        }
    }

    fn apply(&mut self, modify: &dyn Fn(&mut ProviderOptions)) {
        modify(&mut self.options);
        if let ProviderKind::Set(set) = &mut self.kind {
            for provider in &mut set.0 {
                provider.apply(modify);
            }
        }
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            ProviderKind::Value(_) => "Value",
            ProviderKind::InterfaceValue(_) => "InterfaceValue",
            ProviderKind::Binding(_) => "Binding",
            ProviderKind::Factory(_) => "Factory",
            ProviderKind::Set(set) => return f.debug_list().entries(&set.0).finish(),
        };
        f.debug_struct("Provider")
            .field("kind", &kind)
            .field("provides", &self.provides())
            .field("options", &self.options)
            .finish()
    }
}

/// An ordered group of providers. Sets may contain other sets.
#[derive(Debug, Default)]
pub struct ProviderSet(Vec<Provider>);

impl ProviderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, provider: impl Into<Provider>) {
        self.0.push(provider.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<ProviderSet> for Provider {
    fn from(set: ProviderSet) -> Self {
        Provider::new(ProviderKind::Set(set))
    }
}

impl<P: Into<Provider>, const N: usize> From<[P; N]> for Provider {
    fn from(providers: [P; N]) -> Self {
        set(providers)
    }
}

impl<P: Into<Provider>> From<Vec<P>> for Provider {
    fn from(providers: Vec<P>) -> Self {
        set(providers)
    }
}

impl<P: Into<Provider>> FromIterator<P> for ProviderSet {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl IntoIterator for ProviderSet {
    type Item = Provider;
    type IntoIter = std::vec::IntoIter<Provider>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Groups providers into one [`Provider`].
pub fn set<I>(providers: I) -> Provider
where
    I: IntoIterator,
    I::Item: Into<Provider>,
{
    providers.into_iter().collect::<ProviderSet>().into()
}

/// Provides an existing value under its own type.
pub fn value<T: Send + Sync + 'static>(value: T) -> Provider {
    Provider::new(ProviderKind::Value(ValueProvider {
        key: DependencyKey::of::<T>(),
        instance: Arc::new(value),
    }))
}

/// Provides an existing value under interface `I` (as `Arc<I>`).
///
/// `C` must be listed in `I`'s [`interface!`](crate::interface!) table;
/// otherwise `resolve()` reports a configuration error.
pub fn interface_value<I, C>(value: C) -> Provider
where
    I: Interface + ?Sized,
    C: Send + Sync + 'static,
{
    let concrete: Instance = Arc::new(value);
    Provider::new(ProviderKind::InterfaceValue(InterfaceValueProvider {
        interface: interface_key::<I>(),
        concrete: DependencyKey::of::<C>(),
        instance: cast_instance::<I>(&concrete),
    }))
}

/// Binds interface `I` to whatever provides concrete type `C`.
///
/// Requests for `Arc<I>` are served by the value or factory that provides
/// `C`, viewed through `I`.
pub fn bind<I, C>() -> Provider
where
    I: Interface + ?Sized,
    C: Send + Sync + 'static,
{
    let concrete = DependencyKey::of::<C>();
    Provider::new(ProviderKind::Binding(BindingProvider {
        interface: interface_key::<I>(),
        concrete,
        implemented: I::is_implemented_by(&concrete),
        cast: cast_instance::<I>,
    }))
}

/// Registers a factory returning `T`.
pub fn func<F, Args>(factory: F) -> Provider
where
    F: Factory<Args>,
    F::Output: Send + Sync + 'static,
    Args: 'static,
{
    Provider::new(ProviderKind::Factory(ErasedFactory::plain(factory)))
}

/// Registers a factory returning `Result<T, E>`.
pub fn try_func<F, Args, T, E>(factory: F) -> Provider
where
    F: Factory<Args, Output = Result<T, E>>,
    T: Send + Sync + 'static,
    E: Into<BoxError>,
    Args: 'static,
{
    Provider::new(ProviderKind::Factory(ErasedFactory::fallible(factory)))
}

/// Registers a factory returning `(T, Cleanup)`.
pub fn func_with_cleanup<F, Args, T>(factory: F) -> Provider
where
    F: Factory<Args, Output = (T, Cleanup)>,
    T: Send + Sync + 'static,
    Args: 'static,
{
    Provider::new(ProviderKind::Factory(ErasedFactory::with_cleanup(factory)))
}

/// Registers a factory returning `Result<(T, Cleanup), E>`.
pub fn try_func_with_cleanup<F, Args, T, E>(factory: F) -> Provider
where
    F: Factory<Args, Output = Result<(T, Cleanup), E>>,
    T: Send + Sync + 'static,
    E: Into<BoxError>,
    Args: 'static,
{
    Provider::new(ProviderKind::Factory(ErasedFactory::fallible_with_cleanup(factory)))
}

/// Marks `provider` as skip-if-exists.
pub fn if_not_exists(provider: impl Into<Provider>) -> Provider {
    provider.into().if_not_exists()
}

/// Tags `provider` with a namespace.
pub fn namespace(name: impl Into<String>, provider: impl Into<Provider>) -> Provider {
    provider.into().namespace(name)
}
