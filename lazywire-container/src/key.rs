//! Dependency identification keys.
//!
//! [`DependencyKey`] is the type token the container uses for every
//! table lookup: value table, provider map and binding table.

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

use lazywire_support::rendering::shorten_type_name;

/// Uniquely identifies a type in the container.
///
/// Two keys are equal when their [`TypeId`]s are equal. The type name is
/// carried along for error messages and cycle traces.
///
/// # Examples
/// ```
/// use lazywire_container::key::DependencyKey;
/// use std::sync::Arc;
///
/// let key = DependencyKey::of::<String>();
/// assert_eq!(key.type_name(), "alloc::string::String");
/// assert_eq!(key.short_name(), "String");
///
/// trait Logger {}
/// let iface = DependencyKey::of::<Arc<dyn Logger>>();
/// assert!(iface.short_name().starts_with("Arc<dyn"));
/// ```
#[derive(Clone, Copy)]
pub struct DependencyKey {
    type_id: TypeId,
    type_name: &'static str,
}

impl DependencyKey {
    /// Creates a key for type `T`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    /// Returns the [`TypeId`] of this type.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the fully qualified type name.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the type name with module paths stripped.
    pub fn short_name(&self) -> String {
        shorten_type_name(self.type_name)
    }
}

impl PartialEq for DependencyKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for DependencyKey {}

impl Hash for DependencyKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DependencyKey({})", self.type_name)
    }
}

impl fmt::Display for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    struct MyStruct;

    #[test]
    fn key_of_type() {
        let key = DependencyKey::of::<MyStruct>();
        assert!(key.type_name().ends_with("MyStruct"));
        assert_eq!(key.short_name(), "MyStruct");
    }

    #[test]
    fn key_equality_same_type() {
        assert_eq!(DependencyKey::of::<String>(), DependencyKey::of::<String>());
    }

    #[test]
    fn key_inequality_different_types() {
        assert_ne!(DependencyKey::of::<String>(), DependencyKey::of::<i32>());
    }

    #[test]
    fn pointer_and_pointee_differ() {
        assert_ne!(
            DependencyKey::of::<MyStruct>(),
            DependencyKey::of::<Arc<MyStruct>>()
        );
    }

    #[test]
    fn key_in_hashmap() {
        let mut map = HashMap::new();
        map.insert(DependencyKey::of::<String>(), "string");
        map.insert(DependencyKey::of::<i32>(), "i32");
        assert_eq!(map.get(&DependencyKey::of::<String>()), Some(&"string"));
        assert_eq!(map.get(&DependencyKey::of::<bool>()), None);
    }

    #[test]
    fn trait_object_keys() {
        trait MyTrait {}
        let key = DependencyKey::of::<Arc<dyn MyTrait>>();
        assert_eq!(key.short_name(), "Arc<dyn MyTrait>");
    }

    #[test]
    fn display_is_full_name() {
        assert_eq!(
            DependencyKey::of::<String>().to_string(),
            "alloc::string::String"
        );
    }
}
