//! Concurrent access: exactly-once singleton construction, transient
//! freshness and mixed resolution under contention.

use rivet_di::{Binding, BuildOptions, Dependency, Lifetime, Registry, Resolver};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

struct Counted {
    serial: usize,
}

fn lazy() -> BuildOptions {
    BuildOptions {
        eager_singletons: false,
        ..BuildOptions::default()
    }
}

#[test]
fn racing_threads_observe_exactly_one_singleton_construction() {
    const THREADS: usize = 16;

    let constructed = Arc::new(AtomicUsize::new(0));
    let counter = constructed.clone();

    let mut registry = Registry::new();
    registry
        .add_singleton::<Counted, _>(move |_| {
            // Widen the race window a little.
            thread::yield_now();
            Ok(Arc::new(Counted {
                serial: counter.fetch_add(1, Ordering::SeqCst),
            }))
        })
        .unwrap();

    let resolver = registry.build_with(lazy()).unwrap();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let resolver = resolver.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                resolver.get::<Counted>().unwrap()
            })
        })
        .collect();

    let instances: Vec<Arc<Counted>> =
        handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(constructed.load(Ordering::SeqCst), 1);
    for instance in &instances {
        assert!(Arc::ptr_eq(instance, &instances[0]));
        assert_eq!(instance.serial, 0);
    }
}

#[test]
fn concurrent_transient_creation_yields_distinct_instances() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 8;

    let serials = Arc::new(AtomicUsize::new(0));
    let counter = serials.clone();

    let mut registry = Registry::new();
    registry
        .add_transient::<Counted, _>(move |_| {
            Ok(Arc::new(Counted {
                serial: counter.fetch_add(1, Ordering::SeqCst),
            }))
        })
        .unwrap();

    let resolver = registry.build().unwrap();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let resolver = resolver.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                (0..PER_THREAD)
                    .map(|_| resolver.create::<Counted>().unwrap().serial)
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for serial in handle.join().unwrap() {
            assert!(seen.insert(serial), "serial {serial} produced twice");
        }
    }
    assert_eq!(seen.len(), THREADS * PER_THREAD);
}

#[test]
fn nested_singleton_resolution_does_not_deadlock_under_contention() {
    struct Leaf;
    struct Branch {
        _leaf: Arc<Leaf>,
    }

    let mut registry = Registry::new();
    registry.add_singleton::<Leaf, _>(|_| Ok(Arc::new(Leaf))).unwrap();
    registry
        .add_single::<Branch, _>(
            Lifetime::Singleton,
            Binding::new().depends_on([Dependency::singleton::<Leaf>()]),
            |r| {
                Ok(Arc::new(Branch {
                    _leaf: r.get::<Leaf>()?,
                }))
            },
        )
        .unwrap();

    let resolver = registry.build_with(lazy()).unwrap();
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let resolver: Resolver = resolver.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                // Half the threads enter through the leaf, half through the
                // branch whose factory resolves the leaf.
                if i % 2 == 0 {
                    resolver.get::<Leaf>().map(|_| ()).unwrap();
                } else {
                    resolver.get::<Branch>().map(|_| ()).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let branch = resolver.get::<Branch>().unwrap();
    let leaf = resolver.get::<Leaf>().unwrap();
    assert!(Arc::ptr_eq(&branch._leaf, &leaf));
}

#[test]
fn concurrent_collection_enumeration_keeps_order() {
    trait Stage: Send + Sync {
        fn index(&self) -> usize;
    }
    struct Indexed(usize);
    impl Stage for Indexed {
        fn index(&self) -> usize {
            self.0
        }
    }

    let mut registry = Registry::new();
    for i in 0..5 {
        registry
            .add_collection::<dyn Stage, _>(Lifetime::Singleton, Binding::new(), move |_| {
                Ok(Arc::new(Indexed(i)))
            })
            .unwrap();
    }

    let resolver = registry.build_with(lazy()).unwrap();
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let resolver = resolver.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                let stages = resolver.get_all::<dyn Stage>().unwrap();
                stages.iter().map(|s| s.index()).collect::<Vec<_>>()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), vec![0, 1, 2, 3, 4]);
    }
}
