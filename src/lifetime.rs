//! Component lifetime definitions.

/// Component lifetimes controlling instance caching behavior.
///
/// Defines when the container creates and caches instances for a
/// registration. A `(type, name, lifetime, collection)` tuple identifies a
/// slot, so the same type may be registered once as a singleton and once as
/// a transient without conflict.
///
/// # Examples
///
/// ```rust
/// use rivet_di::{Registry, Lifetime, Binding};
/// use std::sync::Arc;
///
/// struct Config { url: String }
/// struct Probe;
///
/// let mut registry = Registry::new();
///
/// // Singleton: one instance, cached forever.
/// registry.add_single::<Config, _>(Lifetime::Singleton, Binding::new(), |_| {
///     Ok(Arc::new(Config { url: "postgres://localhost".to_string() }))
/// })?;
///
/// // Transient: a fresh instance on every `create` call.
/// registry.add_single::<Probe, _>(Lifetime::Transient, Binding::new(), |_| {
///     Ok(Arc::new(Probe))
/// })?;
///
/// let resolver = registry.build()?;
///
/// let a = resolver.get::<Config>()?;
/// let b = resolver.get::<Config>()?;
/// assert!(Arc::ptr_eq(&a, &b));
///
/// let p1 = resolver.create::<Probe>()?;
/// let p2 = resolver.create::<Probe>()?;
/// assert!(!Arc::ptr_eq(&p1, &p2));
/// # Ok::<(), rivet_di::DiError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// Single instance per resolver, created on first request (or eagerly at
    /// build) and cached for the resolver's lifetime.
    Singleton,
    /// New instance per resolution, never cached. Ownership passes to the
    /// caller.
    Transient,
}

impl Lifetime {
    /// Lowercase label used in diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            Lifetime::Singleton => "singleton",
            Lifetime::Transient => "transient",
        }
    }
}
