//! Declared dependency shapes.

use crate::type_info::TypeInfo;

/// One declared input of a factory, used by build-time validation.
///
/// A dependency names the component type it consumes and the shape of the
/// consumption. Four shapes exist:
///
/// | constructor | resolved via | meaning |
/// |---|---|---|
/// | [`Dependency::singleton`] | `get` | the cached singleton of `S` |
/// | [`Dependency::transient`] | `create` | a fresh transient `S` per resolution |
/// | [`Dependency::collection`] | `get_all` | every singleton collection entry for `S` |
/// | [`Dependency::transient_collection`] | `create_all` | a fresh instance from every transient collection factory for `S` |
///
/// Declarations drive validation only; the factory body still resolves its
/// inputs through the [`Resolver`](crate::Resolver). Declaring what the body
/// resolves lets `build` reject missing providers, captive lifetimes and
/// cycles before any factory runs.
///
/// Dependencies always refer to unnamed slots; named registrations are not
/// consulted when satisfying a declaration.
///
/// # Examples
///
/// ```rust
/// use rivet_di::{Registry, Lifetime, Binding, Dependency};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {}
/// struct StdoutLogger;
/// impl Logger for StdoutLogger {}
///
/// struct Greeter { logger: Arc<dyn Logger> }
///
/// let mut registry = Registry::new();
/// registry.add_singleton::<dyn Logger, _>(|_| Ok(Arc::new(StdoutLogger)))?;
/// registry.add_single::<Greeter, _>(
///     Lifetime::Singleton,
///     Binding::new().depends_on([Dependency::singleton::<dyn Logger>()]),
///     |r| Ok(Arc::new(Greeter { logger: r.get::<dyn Logger>()? })),
/// )?;
/// let resolver = registry.build()?;
/// resolver.get::<Greeter>()?;
/// # Ok::<(), rivet_di::DiError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependency {
    pub(crate) ty: TypeInfo,
    pub(crate) is_collection: bool,
    pub(crate) is_transient: bool,
}

impl Dependency {
    /// A bare dependency on the cached singleton of `S`.
    pub fn singleton<S: ?Sized + 'static>() -> Self {
        Self {
            ty: TypeInfo::of::<S>(),
            is_collection: false,
            is_transient: false,
        }
    }

    /// A dependency on a fresh transient `S`.
    pub fn transient<S: ?Sized + 'static>() -> Self {
        Self {
            ty: TypeInfo::of::<S>(),
            is_collection: false,
            is_transient: true,
        }
    }

    /// A dependency on the singleton collection of `S`.
    pub fn collection<S: ?Sized + 'static>() -> Self {
        Self {
            ty: TypeInfo::of::<S>(),
            is_collection: true,
            is_transient: false,
        }
    }

    /// A dependency on the transient collection of `S`.
    pub fn transient_collection<S: ?Sized + 'static>() -> Self {
        Self {
            ty: TypeInfo::of::<S>(),
            is_collection: true,
            is_transient: true,
        }
    }

    /// The consumed component type.
    pub fn component(&self) -> TypeInfo {
        self.ty
    }

    /// Whether this dependency consumes a collection slot.
    pub fn is_collection(&self) -> bool {
        self.is_collection
    }

    /// Whether this dependency consumes transient factories.
    pub fn is_transient(&self) -> bool {
        self.is_transient
    }
}
