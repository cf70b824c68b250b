use std::any::Any;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use lazywire::prelude::*;

trait Labeled: Send + Sync {
    fn label(&self) -> &str;
    fn as_any(&self) -> &dyn Any;
}

#[derive(Clone, Debug, PartialEq)]
struct Tagged {
    v: String,
}

impl Labeled for Tagged {
    fn label(&self) -> &str {
        &self.v
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct Unlisted;

impl Labeled for Unlisted {
    fn label(&self) -> &str {
        "unlisted"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

interface!(dyn Labeled = [Tagged]);

fn record(order: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> Cleanup {
    let order = order.clone();
    Cleanup::new(move || order.lock().unwrap().push(name))
}

fn container(providers: impl Into<Provider>) -> Container {
    let _ = lazywire::logging::install();
    let container = Container::new();
    container.provide(providers);
    container
}

#[test]
fn shared_value_is_returned_unchanged() {
    let provided = Arc::new(Tagged { v: "ptr".into() });
    let c = container(value(provided.clone()));
    c.resolve().unwrap();

    let mut out: Arc<Tagged> = Arc::new(Tagged { v: String::new() });
    c.inject_as(&mut out).unwrap();
    assert!(Arc::ptr_eq(&out, &provided));
}

#[test]
fn plain_value_is_returned_equal() {
    let c = container(value(Tagged { v: "tt".into() }));
    c.resolve().unwrap();

    let mut out = Tagged { v: String::new() };
    c.inject_as(&mut out).unwrap();
    assert_eq!(out, Tagged { v: "tt".into() });
}

#[test]
fn factory_with_cleanup_and_error() {
    let called = Arc::new(AtomicUsize::new(0));
    let c = container(try_func_with_cleanup({
        let called = called.clone();
        move || -> std::result::Result<(Tagged, Cleanup), std::io::Error> {
            let called = called.clone();
            Ok((
                Tagged { v: "taken".into() },
                Cleanup::new(move || {
                    called.fetch_add(1, Ordering::SeqCst);
                }),
            ))
        }
    }));
    c.resolve().unwrap();

    let tagged: Tagged = c.get().unwrap();
    assert_eq!(tagged.v, "taken");

    c.clean();
    assert_eq!(called.load(Ordering::SeqCst), 1);
}

#[test]
fn binding_resolves_to_the_concrete_type() {
    #[derive(Clone)]
    struct Holder {
        inner: Arc<Tagged>,
    }

    let order = Arc::new(Mutex::new(Vec::new()));

    let c = container([
        func_with_cleanup({
            let order = order.clone();
            move |inner: Arc<Tagged>| (Holder { inner }, record(&order, "holder"))
        }),
        bind::<dyn Labeled, Tagged>(),
        value(Arc::new(Tagged { v: "taken".into() })),
        try_func_with_cleanup({
            let order = order.clone();
            move |holder: Holder| -> std::result::Result<(Tagged, Cleanup), std::io::Error> {
                Ok(((*holder.inner).clone(), record(&order, "tagged")))
            }
        }),
    ]);
    c.resolve().unwrap();

    let labeled: Arc<dyn Labeled> = c.get().unwrap();
    assert_eq!(labeled.label(), "taken");

    let concrete = labeled.as_any().downcast_ref::<Tagged>();
    assert_eq!(concrete, Some(&Tagged { v: "taken".into() }));

    c.clean();
    assert_eq!(*order.lock().unwrap(), vec!["tagged", "holder"]);
}

#[test]
fn cycle_fails_resolve_with_every_type() {
    #[derive(Clone)]
    struct A;
    #[derive(Clone)]
    struct B;
    #[derive(Clone)]
    struct C;
    #[derive(Clone)]
    struct D;

    let c = container([
        func(|_: B| A),
        func(|_: C| B),
        func(|_: A, _: D| C),
        value(D),
    ]);

    match c.resolve() {
        Err(InjectorError::CircularDependency(err)) => {
            for key in [
                DependencyKey::of::<A>(),
                DependencyKey::of::<B>(),
                DependencyKey::of::<C>(),
            ] {
                assert!(err.contains(&key), "{key} missing from {err}");
            }
            assert!(!err.contains(&DependencyKey::of::<D>()));
            assert_eq!(err.chain.first(), err.chain.last());
        }
        other => panic!("Expected CircularDependency, got: {other:?}"),
    }
}

#[test]
fn missing_dependency_fails_resolve() {
    #[derive(Clone)]
    struct Orphan;

    let c = container(func(|_: Orphan| 1u8));
    match c.resolve() {
        Err(InjectorError::NotRegistered(err)) => {
            assert_eq!(err.requested, DependencyKey::of::<Orphan>());
            assert_eq!(err.required_by, Some(DependencyKey::of::<u8>()));
        }
        other => panic!("Expected NotRegistered, got: {other:?}"),
    }
}

#[test]
fn configuration_errors_are_aggregated() {
    let c = container([
        value(1u8),
        value(2u8),
        func(|| 3u16),
        func(|| 4u16),
        bind::<dyn Labeled, Unlisted>(),
        interface_value::<dyn Labeled, _>(Unlisted),
    ]);

    match c.resolve() {
        Err(InjectorError::Configuration(errors)) => {
            assert_eq!(errors.len(), 4);
            let message = errors.to_string();
            assert!(message.contains("does not implement interface"));
            assert!(message.contains("already exists"));
            assert!(message.contains("already registered"));
        }
        other => panic!("Expected Configuration, got: {other:?}"),
    }

    assert!(matches!(c.get::<u8>(), Err(InjectorError::Configuration(_))));
}

#[test]
fn duplicates_with_skip_keep_the_first() {
    let c = container([
        value(1u8),
        if_not_exists(value(2u8)),
        func(|| 3u16),
        if_not_exists(func(|| 4u16)),
        if_not_exists([value(5u32), value(6u32)]),
    ]);
    c.resolve().unwrap();

    assert_eq!(c.get::<u8>().unwrap(), 1);
    assert_eq!(c.get::<u16>().unwrap(), 3);
    assert_eq!(c.get::<u32>().unwrap(), 5);
}

#[test]
fn skip_keeps_the_earlier_declaration_of_any_kind() {
    let c = container([
        func(|| 1u8),
        if_not_exists(value(2u8)),
        value(3u16),
        if_not_exists(func(|| 4u16)),
    ]);
    c.resolve().unwrap();

    assert_eq!(c.get::<u8>().unwrap(), 1);
    assert_eq!(c.get::<u16>().unwrap(), 3);
}

#[test]
fn interface_value_is_served_directly() {
    let c = container(interface_value::<dyn Labeled, _>(Tagged { v: "iv".into() }));
    c.resolve().unwrap();

    let labeled: Arc<dyn Labeled> = c.get().unwrap();
    assert_eq!(labeled.label(), "iv");
}

#[test]
fn namespace_is_carried_into_the_graph() {
    let c = container(namespace("storage", [func(|| 1u8), func(|n: u8| u16::from(n))]));
    c.resolve().unwrap();

    let snapshot = c.graph();
    assert!(
        snapshot
            .nodes
            .iter()
            .all(|n| n.namespace.as_deref() == Some("storage"))
    );
    assert_eq!(c.get::<u16>().unwrap(), 1);
}

#[test]
fn repeated_requests_never_rerun_factories() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = container([
        func({
            let calls = calls.clone();
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
                Arc::new(Tagged { v: "once".into() })
            }
        }),
        func(|t: Arc<Tagged>| t.v.len()),
    ]);
    c.resolve().unwrap();

    for _ in 0..5 {
        assert_eq!(c.get::<usize>().unwrap(), 4);
        assert_eq!(c.get::<Arc<Tagged>>().unwrap().v, "once");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn clean_after_failed_request_runs_what_was_captured() {
    #[derive(Clone)]
    struct Pool;
    #[derive(Clone)]
    struct Session;

    let cleaned = Arc::new(AtomicUsize::new(0));
    let c = container([
        func_with_cleanup({
            let cleaned = cleaned.clone();
            move || {
                let cleaned = cleaned.clone();
                (
                    Pool,
                    Cleanup::new(move || {
                        cleaned.fetch_add(1, Ordering::SeqCst);
                    }),
                )
            }
        }),
        try_func(|_: Pool| -> std::result::Result<Session, std::io::Error> {
            Err(std::io::Error::other("refused"))
        }),
    ]);
    c.resolve().unwrap();

    assert!(c.get::<Session>().is_err());
    c.clean();
    c.clean();
    assert_eq!(cleaned.load(Ordering::SeqCst), 1);
}
