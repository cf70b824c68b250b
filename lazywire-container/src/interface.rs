//! Trait-object interfaces and their implementor tables.
//!
//! An interface is a trait object such as `dyn Greeter`. The container
//! hands interfaces out as `Arc<dyn Greeter>`, so that is the type a
//! factory names as a parameter and the type an interface key stands for.
//!
//! Rust cannot ask at runtime whether a type implements a trait, so every
//! interface carries an explicit table of the concrete types allowed to
//! stand in for it. The [`interface!`](crate::interface!) macro writes that
//! table together with the cast from a stored concrete instance.
//!
//! ```
//! use lazywire_container::interface;
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! struct English;
//! impl Greeter for English {
//!     fn greet(&self) -> String { "hello".into() }
//! }
//!
//! interface!(dyn Greeter = [English]);
//! ```

use std::any::Any;
use std::sync::Arc;

use crate::key::DependencyKey;

/// A type-erased value held by the container.
///
/// The dynamic type of the instance is always the type of the key it is
/// stored under.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// A trait object that concrete providers can be bound to.
///
/// Implemented by [`interface!`](crate::interface!); there is rarely a
/// reason to implement it by hand.
pub trait Interface: Send + Sync + 'static {
    /// Concrete types that may be bound to this interface.
    fn implementors() -> Vec<DependencyKey>;

    /// Views a stored concrete instance through this interface.
    ///
    /// Returns `None` if the instance is not one of the
    /// [`implementors`](Interface::implementors).
    fn cast(instance: &Instance) -> Option<Arc<Self>>;

    /// Returns `true` if `concrete` is listed as an implementor.
    fn is_implemented_by(concrete: &DependencyKey) -> bool {
        Self::implementors().contains(concrete)
    }
}

pub(crate) type CastFn = fn(&Instance) -> Option<Instance>;

/// Converts a concrete instance into the stored form of interface `I`,
/// an `Arc<I>` boxed as an [`Instance`].
pub(crate) fn cast_instance<I: Interface + ?Sized>(instance: &Instance) -> Option<Instance> {
    I::cast(instance).map(|iface| Arc::new(iface) as Instance)
}

/// Key under which interface `I` is provided and requested.
#[inline]
pub fn interface_key<I: Interface + ?Sized>() -> DependencyKey {
    DependencyKey::of::<Arc<I>>()
}

/// Declares a trait object as an [`Interface`] and lists its implementors.
///
/// The trait must have `Send + Sync` as supertraits. Each listed type must
/// implement the trait and be exactly the type its provider produces.
///
/// ```
/// use lazywire_container::interface;
///
/// trait Store: Send + Sync {}
///
/// struct Memory;
/// struct Disk;
/// impl Store for Memory {}
/// impl Store for Disk {}
///
/// interface!(dyn Store = [Memory, Disk]);
/// ```
#[macro_export]
macro_rules! interface {
    ($iface:ty = [$($concrete:ty),* $(,)?]) => {
        impl $crate::interface::Interface for $iface {
            fn implementors() -> ::std::vec::Vec<$crate::key::DependencyKey> {
                ::std::vec![$($crate::key::DependencyKey::of::<$concrete>()),*]
            }

            fn cast(
                instance: &$crate::interface::Instance,
            ) -> ::std::option::Option<::std::sync::Arc<Self>> {
                $(
                    if let ::std::result::Result::Ok(concrete) =
                        ::std::sync::Arc::clone(instance).downcast::<$concrete>()
                    {
                        return ::std::option::Option::Some(concrete as ::std::sync::Arc<Self>);
                    }
                )*
                ::std::option::Option::None
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Shape: Send + Sync {
        fn area(&self) -> u32;
    }

    struct Square(u32);
    struct Rect(u32, u32);
    struct Circle;

    impl Shape for Square {
        fn area(&self) -> u32 {
            self.0 * self.0
        }
    }

    impl Shape for Rect {
        fn area(&self) -> u32 {
            self.0 * self.1
        }
    }

    crate::interface!(dyn Shape = [Square, Rect]);

    #[test]
    fn implementors_are_listed() {
        assert!(<dyn Shape as Interface>::is_implemented_by(&DependencyKey::of::<Square>()));
        assert!(<dyn Shape as Interface>::is_implemented_by(&DependencyKey::of::<Rect>()));
        assert!(!<dyn Shape as Interface>::is_implemented_by(&DependencyKey::of::<Circle>()));
    }

    #[test]
    fn cast_shares_the_allocation() {
        let instance: Instance = Arc::new(Square(3));
        let shape = <dyn Shape as Interface>::cast(&instance).unwrap();
        assert_eq!(shape.area(), 9);
        assert_eq!(Arc::strong_count(&instance), 2);
    }

    #[test]
    fn cast_rejects_unlisted_types() {
        let instance: Instance = Arc::new(Circle);
        assert!(<dyn Shape as Interface>::cast(&instance).is_none());
    }

    #[test]
    fn cast_instance_stores_the_interface_pointer() {
        let instance: Instance = Arc::new(Rect(2, 5));
        let stored = cast_instance::<dyn Shape>(&instance).unwrap();
        let shape = stored.downcast_ref::<Arc<dyn Shape>>().unwrap();
        assert_eq!(shape.area(), 10);
    }

    #[test]
    fn interface_key_is_the_arc_type() {
        assert_eq!(interface_key::<dyn Shape>(), DependencyKey::of::<Arc<dyn Shape>>());
    }
}
