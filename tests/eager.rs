//! Eager singleton construction at build time.

use rivet_di::{BuildOptions, ErrorKind, Registry};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct Flaky;

#[test]
fn eager_build_constructs_every_singleton_once() {
    let constructed = Arc::new(AtomicUsize::new(0));
    let counter = constructed.clone();

    let mut registry = Registry::new();
    registry
        .add_singleton::<Flaky, _>(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Flaky))
        })
        .unwrap();

    let resolver = registry.build().unwrap();
    assert_eq!(constructed.load(Ordering::SeqCst), 1);

    // Later resolutions hit the cache.
    resolver.get::<Flaky>().unwrap();
    assert_eq!(constructed.load(Ordering::SeqCst), 1);
}

#[test]
fn eager_build_surfaces_factory_failures() {
    let mut registry = Registry::new();
    registry
        .add_singleton::<Flaky, _>(|_| Err("connection refused".into()))
        .unwrap();

    let err = registry.build().err().unwrap();
    match err.kind() {
        ErrorKind::Resolution {
            type_name, source, ..
        } => {
            assert!(type_name.contains("Flaky"));
            assert_eq!(source.to_string(), "connection refused");
        }
        other => panic!("expected Resolution, got {other:?}"),
    }
    assert!(err.to_string().contains("Failed to resolve component"));
}

#[test]
fn lazy_build_defers_the_failure_to_first_use() {
    let mut registry = Registry::new();
    registry
        .add_singleton::<Flaky, _>(|_| Err("connection refused".into()))
        .unwrap();

    let resolver = registry
        .build_with(BuildOptions {
            eager_singletons: false,
            ..BuildOptions::default()
        })
        .unwrap();

    let err = resolver.get::<Flaky>().err().unwrap();
    assert!(matches!(err.kind(), ErrorKind::Resolution { .. }));
}

#[test]
fn failed_singleton_factory_is_retried() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();

    let mut registry = Registry::new();
    registry
        .add_singleton::<Flaky, _>(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err("first attempt fails".into())
            } else {
                Ok(Arc::new(Flaky))
            }
        })
        .unwrap();

    let resolver = registry
        .build_with(BuildOptions {
            eager_singletons: false,
            ..BuildOptions::default()
        })
        .unwrap();

    // A failing factory leaves no cache entry; the next request retries.
    assert!(resolver.get::<Flaky>().is_err());
    let a = resolver.get::<Flaky>().unwrap();
    let b = resolver.get::<Flaky>().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}
