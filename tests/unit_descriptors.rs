//! Descriptor introspection through `Registry::descriptors`.

use rivet_di::{Binding, Dependency, Lifetime, Registry, TypeInfo};
use std::sync::Arc;

trait Cache: Send + Sync {}
struct LruCache;
impl Cache for LruCache {}

struct Settings;

#[test]
fn descriptors_record_registration_metadata() {
    let mut registry = Registry::new();
    registry.add_instance(Settings).unwrap();
    registry
        .add_single::<dyn Cache, _>(
            Lifetime::Singleton,
            Binding::new()
                .named("hot")
                .implemented_by::<LruCache>()
                .depends_on([Dependency::singleton::<Settings>()]),
            |_| Ok(Arc::new(LruCache)),
        )
        .unwrap();

    let descriptors = registry.descriptors();
    assert_eq!(descriptors.len(), 2);

    let cache = descriptors
        .iter()
        .find(|d| d.component() == TypeInfo::of::<dyn Cache>())
        .unwrap();
    assert_eq!(cache.lifetime(), Lifetime::Singleton);
    assert_eq!(cache.name(), "hot");
    assert!(!cache.is_collection());
    assert_eq!(cache.impl_type(), Some(TypeInfo::of::<LruCache>()));
    assert!(cache.forward_target().is_none());
    assert_eq!(cache.dependencies().len(), 1);
    assert_eq!(
        cache.dependencies()[0].component(),
        TypeInfo::of::<Settings>()
    );
    assert!(cache.registered_at().file().ends_with("unit_descriptors.rs"));
}

#[test]
fn collection_descriptors_are_flagged() {
    let mut registry = Registry::new();
    registry
        .add_collection::<dyn Cache, _>(Lifetime::Transient, Binding::new(), |_| {
            Ok(Arc::new(LruCache))
        })
        .unwrap();

    let descriptor = &registry.descriptors()[0];
    assert!(descriptor.is_collection());
    assert_eq!(descriptor.lifetime(), Lifetime::Transient);
    assert_eq!(descriptor.name(), "");
    assert!(descriptor.impl_type().is_none());
}

#[test]
fn dependency_shapes_survive_introspection() {
    struct Host;
    trait Plugin: Send + Sync {}

    let mut registry = Registry::new();
    registry
        .add_single::<Host, _>(
            Lifetime::Singleton,
            Binding::new().depends_on([
                Dependency::singleton::<Settings>(),
                Dependency::collection::<dyn Plugin>(),
                Dependency::transient_collection::<dyn Plugin>(),
            ]),
            |_| Ok(Arc::new(Host)),
        )
        .unwrap();

    let deps = registry.descriptors()[0].dependencies();
    assert!(!deps[0].is_collection() && !deps[0].is_transient());
    assert!(deps[1].is_collection() && !deps[1].is_transient());
    assert!(deps[2].is_collection() && deps[2].is_transient());
}
