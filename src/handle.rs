//! Erased instance handles and the decorated handle passed to decorators.

use std::any::Any;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Type-erased shared value. The payload is always the typed handle
/// `Arc<S>` for the slot's component type `S`, so trait-object services
/// erase the same way concrete ones do.
pub(crate) type AnyArc = Arc<dyn Any + Send + Sync>;

/// The erased product of one factory invocation.
///
/// `owned` is true when the slot this instance was produced for is the
/// exclusive owner of the object. Forward-aliased singletons produce
/// `owned = false`: their value aliases the target descriptor's cache entry,
/// which remains the owning side. The flag is observable downstream through
/// [`Decorated::owns`].
pub(crate) struct Instance {
    pub(crate) value: AnyArc,
    pub(crate) owned: bool,
}

impl Instance {
    /// Erase an owned `Arc<S>`.
    pub(crate) fn owned<S>(value: Arc<S>) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
    {
        Self {
            value: Arc::new(value),
            owned: true,
        }
    }

    /// Wrap an already-erased value with an explicit ownership tag.
    pub(crate) fn from_parts(value: AnyArc, owned: bool) -> Self {
        Self { value, owned }
    }

    /// Recover the typed handle. `None` when the payload is not `Arc<S>`,
    /// which indicates a slot/payload mismatch inside the container.
    pub(crate) fn downcast<S>(&self) -> Option<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        downcast_value::<S>(&self.value)
    }
}

impl Clone for Instance {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            owned: self.owned,
        }
    }
}

/// Recover `Arc<S>` out of an erased value.
pub(crate) fn downcast_value<S>(value: &AnyArc) -> Option<Arc<S>>
where
    S: ?Sized + Send + Sync + 'static,
{
    value.downcast_ref::<Arc<S>>().cloned()
}

/// The handle a decorator receives for the component it wraps.
///
/// Carries the typed inner value plus an ownership bit. For transient and
/// plainly-registered singleton inners the handle owns its object; for a
/// forward-aliased singleton the owning cache entry lives with the forward
/// target and [`owns`](Decorated::owns) reports `false`. Decorators must
/// keep the handle (or the `Arc` taken out of it) alive for as long as they
/// use the inner component.
///
/// # Examples
///
/// ```rust
/// use rivet_di::{Registry, Decorated, Decoration};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct Plain;
/// impl Greeter for Plain {
///     fn greet(&self) -> String { "hello".to_string() }
/// }
///
/// struct Shouting { inner: Decorated<dyn Greeter> }
/// impl Greeter for Shouting {
///     fn greet(&self) -> String { self.inner.greet().to_uppercase() }
/// }
///
/// let mut registry = Registry::new();
/// registry.add_singleton::<dyn Greeter, _>(|_| Ok(Arc::new(Plain)))?;
/// registry.decorate::<dyn Greeter, _>(Decoration::all(), |inner, _| {
///     Ok(Arc::new(Shouting { inner }))
/// });
///
/// let resolver = registry.build()?;
/// assert_eq!(resolver.get::<dyn Greeter>()?.greet(), "HELLO");
/// # Ok::<(), rivet_di::DiError>(())
/// ```
pub struct Decorated<I: ?Sized> {
    inner: Arc<I>,
    owned: bool,
}

impl<I: ?Sized> Decorated<I> {
    pub(crate) fn new(inner: Arc<I>, owned: bool) -> Self {
        Self { inner, owned }
    }

    /// Borrow the inner component.
    pub fn get(&self) -> &I {
        &self.inner
    }

    /// True when this handle owns the inner object. Forward-aliased
    /// singletons yield `false`: the alias target's cache entry owns the
    /// instance and the handle merely shares it.
    pub fn owns(&self) -> bool {
        self.owned
    }

    /// Take the shared handle out. The ownership bit is dropped; callers
    /// that care must consult [`owns`](Decorated::owns) first.
    pub fn into_inner(self) -> Arc<I> {
        self.inner
    }
}

impl<I: ?Sized> Deref for Decorated<I> {
    type Target = I;

    fn deref(&self) -> &I {
        &self.inner
    }
}

impl<I: ?Sized> fmt::Debug for Decorated<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decorated")
            .field("owned", &self.owned)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Named: Send + Sync {
        fn name(&self) -> &'static str;
    }

    struct Alpha;
    impl Named for Alpha {
        fn name(&self) -> &'static str {
            "alpha"
        }
    }

    #[test]
    fn erase_and_recover_concrete() {
        let instance = Instance::owned(Arc::new(7u32));
        assert!(instance.owned);
        assert_eq!(*instance.downcast::<u32>().unwrap(), 7);
        assert!(instance.downcast::<u64>().is_none());
    }

    #[test]
    fn erase_and_recover_trait_object() {
        let value: Arc<dyn Named> = Arc::new(Alpha);
        let instance = Instance::owned(value);
        let back = instance.downcast::<dyn Named>().unwrap();
        assert_eq!(back.name(), "alpha");
    }

    #[test]
    fn aliased_instances_share_identity() {
        let value: Arc<dyn Named> = Arc::new(Alpha);
        let owner = Instance::owned(value.clone());
        let alias = Instance::from_parts(owner.value.clone(), false);
        assert!(!alias.owned);
        let a = owner.downcast::<dyn Named>().unwrap();
        let b = alias.downcast::<dyn Named>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn decorated_exposes_ownership() {
        let value: Arc<dyn Named> = Arc::new(Alpha);
        let handle = Decorated::new(value, false);
        assert!(!handle.owns());
        assert_eq!(handle.name(), "alpha");
    }
}
