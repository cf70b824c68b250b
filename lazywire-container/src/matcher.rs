//! Type matching: turns registered descriptors into lookup tables.
//!
//! Descriptors are first checked kind by kind (bindings, interface values,
//! values, factories). The surviving claims are then settled in declaration
//! order: the first claimant of a key wins, and a later one is dropped if
//! marked skip-if-exists or reported otherwise. Every descriptor is looked
//! at even after an error, so one `resolve()` reports all invalid
//! registrations together.

use std::collections::HashMap;

use tracing::debug;

use crate::container::Container;
use crate::error::{ConfigError, ConfigErrors};
use crate::factory::ErasedFactory;
use crate::interface::{CastFn, Instance};
use crate::key::DependencyKey;
use crate::provider::ProviderOptions;
use crate::registry::{Registered, Registry};

/// A ready-made entry of the value table.
#[derive(Clone)]
pub(crate) enum Literal {
    Instance(Instance),
    /// The container itself, materialized on each request.
    Container,
}

/// Interface to concrete type mapping.
#[derive(Clone, Copy)]
pub(crate) struct Binding {
    pub concrete: DependencyKey,
    pub cast: CastFn,
}

/// Output of the matcher: the value table, the binding table and the
/// accepted factories with their outputs indexed.
pub(crate) struct Tables {
    pub values: HashMap<DependencyKey, Literal>,
    pub bindings: HashMap<DependencyKey, Binding>,
    pub providers: HashMap<DependencyKey, usize>,
    pub factories: Vec<Registered<ErasedFactory>>,
}

impl Tables {
    /// Empty tables holding only the container's own entry.
    fn seeded() -> Self {
        let mut values = HashMap::new();
        values.insert(DependencyKey::of::<Container>(), Literal::Container);

        Self {
            values,
            bindings: HashMap::new(),
            providers: HashMap::new(),
            factories: Vec::new(),
        }
    }

    fn is_occupied(&self, key: &DependencyKey) -> bool {
        self.values.contains_key(key)
            || self.bindings.contains_key(key)
            || self.providers.contains_key(key)
    }
}

/// What a validated descriptor wants to install under its key.
enum Entry {
    Binding(Binding),
    Value(Instance),
    Factory(ErasedFactory),
}

struct Claim {
    key: DependencyKey,
    entry: Entry,
    options: ProviderOptions,
    seq: usize,
}

/// Validates every registered descriptor and builds the lookup tables.
pub(crate) fn match_providers(registry: Registry) -> Result<Tables, ConfigErrors> {
    let mut errors = ConfigErrors::new();
    let mut claims = Vec::with_capacity(registry.len());

    let Registry {
        values,
        interface_values,
        bindings,
        factories,
    } = registry;

    for Registered {
        descriptor,
        options,
        seq,
    } in bindings
    {
        if !descriptor.implemented {
            errors.push(ConfigError::NotImplemented {
                interface: descriptor.interface,
                concrete: descriptor.concrete,
            });
            continue;
        }

        claims.push(Claim {
            key: descriptor.interface,
            entry: Entry::Binding(Binding {
                concrete: descriptor.concrete,
                cast: descriptor.cast,
            }),
            options,
            seq,
        });
    }

    for Registered {
        descriptor,
        options,
        seq,
    } in interface_values
    {
        let Some(instance) = descriptor.instance else {
            errors.push(ConfigError::NotImplemented {
                interface: descriptor.interface,
                concrete: descriptor.concrete,
            });
            continue;
        };

        claims.push(Claim {
            key: descriptor.interface,
            entry: Entry::Value(instance),
            options,
            seq,
        });
    }

    for Registered {
        descriptor,
        options,
        seq,
    } in values
    {
        claims.push(Claim {
            key: descriptor.key,
            entry: Entry::Value(descriptor.instance),
            options,
            seq,
        });
    }

    for Registered {
        descriptor,
        options,
        seq,
    } in factories
    {
        claims.push(Claim {
            key: descriptor.output,
            entry: Entry::Factory(descriptor),
            options,
            seq,
        });
    }

    claims.sort_by_key(|claim| claim.seq);

    let mut tables = Tables::seeded();
    for claim in claims {
        settle(&mut tables, &mut errors, claim);
    }

    if errors.is_empty() {
        debug!(
            values = tables.values.len(),
            bindings = tables.bindings.len(),
            factories = tables.factories.len(),
            "Providers matched"
        );
        Ok(tables)
    } else {
        Err(errors)
    }
}

/// Installs a claim, or drops or rejects it when its key is taken.
fn settle(tables: &mut Tables, errors: &mut ConfigErrors, claim: Claim) {
    let Claim {
        key,
        entry,
        options,
        seq,
    } = claim;

    if tables.is_occupied(&key) {
        if options.if_not_exists {
            debug!(key = %key, seq, "Type already provided, skipping");
            return;
        }
        errors.push(match (&entry, tables.bindings.get(&key)) {
            (Entry::Binding(rejected), Some(existing)) => ConfigError::DuplicateBinding {
                interface: key,
                existing: existing.concrete,
                rejected: rejected.concrete,
            },
            (Entry::Factory(_), _) => ConfigError::DuplicateFactory { key },
            _ => ConfigError::DuplicateValue { key },
        });
        return;
    }

    match entry {
        Entry::Binding(binding) => {
            tables.bindings.insert(key, binding);
        }
        Entry::Value(instance) => {
            tables.values.insert(key, Literal::Instance(instance));
        }
        Entry::Factory(descriptor) => {
            tables.providers.insert(key, tables.factories.len());
            tables.factories.push(Registered {
                descriptor,
                options,
                seq,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Provider, bind, func, if_not_exists, interface_value, value};
    use std::sync::Arc;

    trait Store: Send + Sync {}
    struct Memory;
    struct Disk;
    struct Tape;
    impl Store for Memory {}
    impl Store for Disk {}
    impl Store for Tape {}

    crate::interface!(dyn Store = [Memory, Disk]);

    fn registry(providers: impl IntoIterator<Item = Provider>) -> Registry {
        let mut registry = Registry::new();
        for provider in providers {
            registry.add(provider);
        }
        registry
    }

    fn stored_u8(tables: &Tables) -> u8 {
        match tables.values.get(&DependencyKey::of::<u8>()) {
            Some(Literal::Instance(instance)) => *instance.downcast_ref::<u8>().unwrap(),
            _ => panic!("Expected a u8 value"),
        }
    }

    #[test]
    fn container_is_always_provided() {
        let tables = match_providers(Registry::new()).unwrap();
        assert!(matches!(
            tables.values.get(&DependencyKey::of::<Container>()),
            Some(Literal::Container)
        ));
    }

    #[test]
    fn duplicate_value_is_an_error() {
        let errors = match_providers(registry([value(1u8), value(2u8)]))
            .err()
            .unwrap();
        assert_eq!(
            errors.iter().collect::<Vec<_>>(),
            vec![&ConfigError::DuplicateValue {
                key: DependencyKey::of::<u8>()
            }]
        );
    }

    #[test]
    fn skip_if_exists_keeps_the_first_value() {
        let tables = match_providers(registry([value(1u8), if_not_exists(value(2u8))])).unwrap();
        assert_eq!(stored_u8(&tables), 1);
    }

    #[test]
    fn factory_colliding_with_value_is_an_error() {
        let errors = match_providers(registry([value(1u8), func(|| 2u8)]))
            .err()
            .unwrap();
        assert!(matches!(
            errors.iter().next(),
            Some(ConfigError::DuplicateFactory { .. })
        ));
    }

    #[test]
    fn skip_if_exists_drops_the_later_factory() {
        let tables = match_providers(registry([
            func(|| 1u16),
            if_not_exists(func(|| 2u16)),
        ]))
        .unwrap();
        assert_eq!(tables.factories.len(), 1);
        assert_eq!(tables.providers[&DependencyKey::of::<u16>()], 0);
    }

    #[test]
    fn earlier_factory_beats_a_later_skipped_value() {
        let tables = match_providers(registry([func(|| 1u8), if_not_exists(value(2u8))])).unwrap();

        assert_eq!(tables.providers[&DependencyKey::of::<u8>()], 0);
        assert!(!tables.values.contains_key(&DependencyKey::of::<u8>()));
    }

    #[test]
    fn earlier_value_beats_a_later_skipped_factory() {
        let tables = match_providers(registry([value(1u8), if_not_exists(func(|| 2u8))])).unwrap();

        assert_eq!(stored_u8(&tables), 1);
        assert!(tables.factories.is_empty());
    }

    #[test]
    fn later_value_is_the_one_rejected() {
        let errors = match_providers(registry([func(|| 1u8), value(2u8)]))
            .err()
            .unwrap();
        assert_eq!(
            errors.iter().collect::<Vec<_>>(),
            vec![&ConfigError::DuplicateValue {
                key: DependencyKey::of::<u8>()
            }]
        );
    }

    #[test]
    fn interface_value_and_binding_follow_declaration_order() {
        let key = DependencyKey::of::<Arc<dyn Store>>();

        let tables = match_providers(registry([
            interface_value::<dyn Store, _>(Memory),
            if_not_exists(bind::<dyn Store, Disk>()),
        ]))
        .unwrap();
        assert!(tables.values.contains_key(&key));
        assert!(tables.bindings.is_empty());

        let tables = match_providers(registry([
            bind::<dyn Store, Disk>(),
            if_not_exists(interface_value::<dyn Store, _>(Memory)),
        ]))
        .unwrap();
        assert_eq!(tables.bindings[&key].concrete, DependencyKey::of::<Disk>());
        assert!(!tables.values.contains_key(&key));
    }

    #[test]
    fn bindings_are_checked_against_implementors() {
        let errors = match_providers(registry([bind::<dyn Store, Tape>()]))
            .err()
            .unwrap();
        assert!(matches!(
            errors.iter().next(),
            Some(ConfigError::NotImplemented { .. })
        ));
    }

    #[test]
    fn second_binding_is_an_error_unless_skipped() {
        let errors = match_providers(registry([
            bind::<dyn Store, Memory>(),
            bind::<dyn Store, Disk>(),
        ]))
        .err()
        .unwrap();
        assert_eq!(
            errors.iter().next(),
            Some(&ConfigError::DuplicateBinding {
                interface: DependencyKey::of::<Arc<dyn Store>>(),
                existing: DependencyKey::of::<Memory>(),
                rejected: DependencyKey::of::<Disk>(),
            })
        );

        let tables = match_providers(registry([
            bind::<dyn Store, Memory>(),
            if_not_exists(bind::<dyn Store, Disk>()),
        ]))
        .unwrap();
        let binding = tables.bindings[&DependencyKey::of::<Arc<dyn Store>>()];
        assert_eq!(binding.concrete, DependencyKey::of::<Memory>());
    }

    #[test]
    fn interface_value_conflicts_with_binding() {
        let errors = match_providers(registry([
            interface_value::<dyn Store, _>(Memory),
            bind::<dyn Store, Disk>(),
        ]))
        .err()
        .unwrap();
        assert!(matches!(
            errors.iter().next(),
            Some(ConfigError::DuplicateValue { .. })
        ));
    }

    #[test]
    fn every_pass_reports_its_errors() {
        let errors = match_providers(registry([
            value(1u8),
            value(2u8),
            interface_value::<dyn Store, _>(Tape),
            func(|| 3u8),
            bind::<dyn Store, Tape>(),
        ]))
        .err()
        .unwrap();

        // per-kind checks first, then collisions in declaration order
        let kinds: Vec<&'static str> = errors
            .iter()
            .map(|e| match e {
                ConfigError::NotImplemented { .. } => "not_implemented",
                ConfigError::DuplicateValue { .. } => "duplicate_value",
                ConfigError::DuplicateFactory { .. } => "duplicate_factory",
                ConfigError::DuplicateBinding { .. } => "duplicate_binding",
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                "not_implemented",
                "not_implemented",
                "duplicate_value",
                "duplicate_factory"
            ]
        );
    }
}
