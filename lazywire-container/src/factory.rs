//! Factory functions and their type-erased form.
//!
//! Any `Fn(A1, .., An) -> R` with up to twelve parameters is a
//! [`Factory`], as long as every parameter type is [`Injectable`]. The
//! parameter types are the factory's dependencies; `R` is one of the four
//! supported return shapes, picked by the constructor used to register it
//! (see [`crate::provider`]).

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use crate::error::{BoxError, InjectorError, Result, SharedError};
use crate::interface::Instance;
use crate::key::DependencyKey;

/// Types the container can hand out.
///
/// Every injected value is a clone of the memoized instance, so shared
/// services are usually registered as `Arc<T>`.
pub trait Injectable: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Injectable for T {}

/// A function whose parameters are resolved from the container.
///
/// Implemented for closures and fn items of arity 0 to 12; `Args` is the
/// tuple of parameter types.
pub trait Factory<Args>: Send + Sync + 'static {
    /// What the function returns.
    type Output;

    /// Parameter types in declaration order.
    fn input_keys() -> Vec<DependencyKey>;

    /// Calls the function with arguments taken from `args`, which must hold
    /// one instance per parameter in the same order.
    fn call_with(&self, args: &[Instance]) -> Result<Self::Output>;
}

pub(crate) fn extract<T: Injectable>(instance: Option<&Instance>) -> Result<T> {
    instance
        .and_then(|instance| instance.downcast_ref::<T>())
        .cloned()
        .ok_or(InjectorError::TypeMismatch {
            expected: type_name::<T>(),
        })
}

macro_rules! impl_factory {
    ($($arg:ident),*) => {
        impl<F, R, $($arg,)*> Factory<($($arg,)*)> for F
        where
            F: Fn($($arg),*) -> R + Send + Sync + 'static,
            $($arg: Injectable,)*
        {
            type Output = R;

            fn input_keys() -> Vec<DependencyKey> {
                vec![$(DependencyKey::of::<$arg>()),*]
            }

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn call_with(&self, args: &[Instance]) -> Result<R> {
                let mut args = args.iter();
                $(let $arg = extract::<$arg>(args.next())?;)*
                Ok((self)($($arg),*))
            }
        }
    };
}

impl_factory!();
impl_factory!(A1);
impl_factory!(A1, A2);
impl_factory!(A1, A2, A3);
impl_factory!(A1, A2, A3, A4);
impl_factory!(A1, A2, A3, A4, A5);
impl_factory!(A1, A2, A3, A4, A5, A6);
impl_factory!(A1, A2, A3, A4, A5, A6, A7);
impl_factory!(A1, A2, A3, A4, A5, A6, A7, A8);
impl_factory!(A1, A2, A3, A4, A5, A6, A7, A8, A9);
impl_factory!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10);
impl_factory!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10, A11);
impl_factory!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10, A11, A12);

/// Teardown callback returned next to a factory's value.
///
/// Runs at most once, during [`Container::clean`](crate::Container::clean).
pub struct Cleanup(Option<Box<dyn FnOnce() + Send>>);

impl Cleanup {
    /// Wraps a teardown callback.
    pub fn new(f: impl FnOnce() + Send + 'static) -> Self {
        Self(Some(Box::new(f)))
    }

    /// A cleanup that does nothing and is not recorded.
    pub fn none() -> Self {
        Self(None)
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    /// Runs the callback, if any.
    pub fn run(self) {
        if let Some(f) = self.0 {
            f();
        }
    }
}

impl Default for Cleanup {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cleanup")
            .field(&if self.is_none() { "none" } else { "some" })
            .finish()
    }
}

/// Return shape of a registered factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum FactoryShape {
    /// `T`
    Plain,
    /// `Result<T, E>`
    Fallible,
    /// `(T, Cleanup)`
    WithCleanup,
    /// `Result<(T, Cleanup), E>`
    FallibleWithCleanup,
}

/// What one successful factory call produced.
pub(crate) struct Produced {
    pub value: Instance,
    pub cleanup: Cleanup,
}

type Invoke = Box<dyn Fn(&[Instance]) -> Result<Produced> + Send + Sync>;

/// A factory with its types captured and its signature erased.
pub(crate) struct ErasedFactory {
    pub output: DependencyKey,
    pub inputs: Vec<DependencyKey>,
    pub shape: FactoryShape,
    invoke: Invoke,
}

impl ErasedFactory {
    pub fn plain<F, Args>(factory: F) -> Self
    where
        F: Factory<Args>,
        F::Output: Send + Sync + 'static,
        Args: 'static,
    {
        Self::erase::<F, Args, F::Output, _>(FactoryShape::Plain, factory, |value| Ok((value, Cleanup::none())))
    }

    pub fn fallible<F, Args, T, E>(factory: F) -> Self
    where
        F: Factory<Args, Output = std::result::Result<T, E>>,
        T: Send + Sync + 'static,
        E: Into<BoxError>,
        Args: 'static,
    {
        Self::erase::<F, Args, T, _>(FactoryShape::Fallible, factory, |out| {
            out.map(|value| (value, Cleanup::none())).map_err(Into::into)
        })
    }

    pub fn with_cleanup<F, Args, T>(factory: F) -> Self
    where
        F: Factory<Args, Output = (T, Cleanup)>,
        T: Send + Sync + 'static,
        Args: 'static,
    {
        Self::erase::<F, Args, T, _>(FactoryShape::WithCleanup, factory, Ok)
    }

    pub fn fallible_with_cleanup<F, Args, T, E>(factory: F) -> Self
    where
        F: Factory<Args, Output = std::result::Result<(T, Cleanup), E>>,
        T: Send + Sync + 'static,
        E: Into<BoxError>,
        Args: 'static,
    {
        Self::erase::<F, Args, T, _>(FactoryShape::FallibleWithCleanup, factory, |out| out.map_err(Into::into))
    }

    fn erase<F, Args, T, N>(shape: FactoryShape, factory: F, normalize: N) -> Self
    where
        F: Factory<Args>,
        T: Send + Sync + 'static,
        N: Fn(F::Output) -> std::result::Result<(T, Cleanup), BoxError> + Send + Sync + 'static,
        Args: 'static,
    {
        let output = DependencyKey::of::<T>();
        let invoke: Invoke = Box::new(move |args: &[Instance]| {
            let raw = factory.call_with(args)?;
            let (value, cleanup) = normalize(raw).map_err(|source| InjectorError::ConstructionFailed {
                key: output,
                source: SharedError::from(source),
            })?;
            Ok(Produced {
                value: Arc::new(value),
                cleanup,
            })
        });

        Self {
            output,
            inputs: F::input_keys(),
            shape,
            invoke,
        }
    }

    /// Calls the factory with one instance per input.
    pub fn invoke(&self, args: &[Instance]) -> Result<Produced> {
        (self.invoke)(args)
    }
}

impl fmt::Debug for ErasedFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedFactory")
            .field("output", &self.output)
            .field("inputs", &self.inputs)
            .field("shape", &self.shape)
            .finish()
    }
}
