//! The frozen runtime: slot lookup, singleton caching, typed resolution.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::trace;
use once_cell::sync::OnceCell;

use crate::descriptor::Descriptor;
use crate::error::{DiError, DiResult, ErrorKind};
use crate::handle::{downcast_value, AnyArc, Instance};
use crate::lifetime::Lifetime;
use crate::type_info::TypeInfo;

/// Identifies a slot: `(type, name, lifetime, is_collection)`.
#[derive(PartialEq, Eq, Hash)]
struct SlotKey {
    type_id: TypeId,
    name: String,
    lifetime: Lifetime,
    is_collection: bool,
}

struct ResolverInner {
    descriptors: Vec<Descriptor>,
    slots: HashMap<SlotKey, Vec<usize>>,
    /// One cell per descriptor; only singleton descriptors ever initialize
    /// theirs. The cell guarantees exactly-once factory invocation under
    /// contention and stays empty when the factory fails, so a later
    /// request retries.
    singletons: Box<[OnceCell<Instance>]>,
}

/// Thread-safe resolver produced by [`Registry::build`](crate::Registry::build).
///
/// The resolver owns the frozen descriptor vector, a precomputed slot index
/// and the singleton cache. It is cheap to clone (`Arc` internally) and safe
/// to share across threads; no API mutates descriptors after build.
///
/// # Accessors
///
/// | accessor | slot | missing slot |
/// |---|---|---|
/// | [`get`](Resolver::get) / [`get_named`](Resolver::get_named) | singleton | error with slot hint |
/// | [`create`](Resolver::create) / [`create_named`](Resolver::create_named) | transient | error with slot hint |
/// | [`get_all`](Resolver::get_all) | singleton collection | empty `Vec` |
/// | [`create_all`](Resolver::create_all) | transient collection | empty `Vec` |
/// | `try_get` / `try_create` | as above | `Ok(None)` |
///
/// # Examples
///
/// ```rust
/// use rivet_di::Registry;
/// use std::sync::Arc;
///
/// struct Clock;
///
/// let mut registry = Registry::new();
/// registry.add_singleton::<Clock, _>(|_| Ok(Arc::new(Clock)))?;
/// let resolver = registry.build()?;
///
/// let a = resolver.get::<Clock>()?;
/// let b = resolver.get::<Clock>()?;
/// assert!(Arc::ptr_eq(&a, &b));
/// # Ok::<(), rivet_di::DiError>(())
/// ```
pub struct Resolver {
    inner: Arc<ResolverInner>,
}

impl Resolver {
    pub(crate) fn from_descriptors(descriptors: Vec<Descriptor>) -> Self {
        let mut slots: HashMap<SlotKey, Vec<usize>> = HashMap::new();
        for (i, d) in descriptors.iter().enumerate() {
            slots
                .entry(SlotKey {
                    type_id: d.component.id(),
                    name: d.name.clone(),
                    lifetime: d.lifetime,
                    is_collection: d.is_collection,
                })
                .or_default()
                .push(i);
        }
        let singletons = descriptors
            .iter()
            .map(|_| OnceCell::new())
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            inner: Arc::new(ResolverInner {
                descriptors,
                slots,
                singletons,
            }),
        }
    }

    // ----- Single-instance resolution -----

    /// Resolve the unnamed singleton of `S`.
    ///
    /// Fails with a not-found error (carrying a slot hint when `S` is
    /// registered under other slots) if no unnamed singleton slot exists.
    #[track_caller]
    pub fn get<S>(&self) -> DiResult<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.get_named::<S>("")
    }

    /// Resolve the singleton of `S` registered under `name`.
    #[track_caller]
    pub fn get_named<S>(&self, name: &str) -> DiResult<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let ty = TypeInfo::of::<S>();
        let Some(indices) = self.find_slot(ty.id(), name, Lifetime::Singleton, false) else {
            return Err(DiError::not_found(
                ty,
                Some(name),
                self.slot_hint(ty.id(), name, "get"),
            ));
        };
        // Single-instance slot: registration guarantees exactly one entry.
        let value = self.resolve_singleton_by_index(indices[0])?;
        downcast_slot::<S>(&value)
    }

    /// Resolve the unnamed singleton of `S`, or `None` when the slot is
    /// missing. Factory failures still propagate as errors.
    #[track_caller]
    pub fn try_get<S>(&self) -> DiResult<Option<Arc<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.try_get_named::<S>("")
    }

    /// Named variant of [`try_get`](Resolver::try_get).
    #[track_caller]
    pub fn try_get_named<S>(&self, name: &str) -> DiResult<Option<Arc<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let ty = TypeInfo::of::<S>();
        match self.find_slot(ty.id(), name, Lifetime::Singleton, false) {
            None => Ok(None),
            Some(indices) => {
                let value = self.resolve_singleton_by_index(indices[0])?;
                downcast_slot::<S>(&value).map(Some)
            }
        }
    }

    /// Create a fresh instance from the unnamed transient slot of `S`.
    /// Ownership of the instance passes to the caller.
    #[track_caller]
    pub fn create<S>(&self) -> DiResult<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.create_named::<S>("")
    }

    /// Create a fresh instance from the transient slot of `S` registered
    /// under `name`.
    #[track_caller]
    pub fn create_named<S>(&self, name: &str) -> DiResult<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let ty = TypeInfo::of::<S>();
        let Some(indices) = self.find_slot(ty.id(), name, Lifetime::Transient, false) else {
            return Err(DiError::not_found(
                ty,
                Some(name),
                self.slot_hint(ty.id(), name, "create"),
            ));
        };
        let instance = self.resolve_transient_by_index(indices[0])?;
        instance
            .downcast::<S>()
            .ok_or_else(|| payload_mismatch::<S>())
    }

    /// Create a fresh transient `S`, or `None` when the slot is missing.
    #[track_caller]
    pub fn try_create<S>(&self) -> DiResult<Option<Arc<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.try_create_named::<S>("")
    }

    /// Named variant of [`try_create`](Resolver::try_create).
    #[track_caller]
    pub fn try_create_named<S>(&self, name: &str) -> DiResult<Option<Arc<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let ty = TypeInfo::of::<S>();
        match self.find_slot(ty.id(), name, Lifetime::Transient, false) {
            None => Ok(None),
            Some(indices) => {
                let instance = self.resolve_transient_by_index(indices[0])?;
                instance
                    .downcast::<S>()
                    .map(Some)
                    .ok_or_else(|| payload_mismatch::<S>())
            }
        }
    }

    // ----- Collection resolution -----

    /// Resolve every entry of the unnamed singleton collection of `S`, in
    /// registration order. A missing slot yields an empty `Vec`.
    #[track_caller]
    pub fn get_all<S>(&self) -> DiResult<Vec<Arc<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.get_all_named::<S>("")
    }

    /// Named variant of [`get_all`](Resolver::get_all).
    #[track_caller]
    pub fn get_all_named<S>(&self, name: &str) -> DiResult<Vec<Arc<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let ty = TypeInfo::of::<S>();
        let Some(indices) = self.find_slot(ty.id(), name, Lifetime::Singleton, true) else {
            return Ok(Vec::new());
        };
        let mut out = Vec::with_capacity(indices.len());
        for &idx in indices {
            let value = self.resolve_singleton_by_index(idx)?;
            out.push(downcast_slot::<S>(&value)?);
        }
        Ok(out)
    }

    /// Create a fresh instance from every factory in the unnamed transient
    /// collection of `S`, in registration order. A missing slot yields an
    /// empty `Vec`.
    #[track_caller]
    pub fn create_all<S>(&self) -> DiResult<Vec<Arc<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.create_all_named::<S>("")
    }

    /// Named variant of [`create_all`](Resolver::create_all).
    #[track_caller]
    pub fn create_all_named<S>(&self, name: &str) -> DiResult<Vec<Arc<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let ty = TypeInfo::of::<S>();
        let Some(indices) = self.find_slot(ty.id(), name, Lifetime::Transient, true) else {
            return Ok(Vec::new());
        };
        let mut out = Vec::with_capacity(indices.len());
        for &idx in indices {
            let instance = self.resolve_transient_by_index(idx)?;
            out.push(
                instance
                    .downcast::<S>()
                    .ok_or_else(|| payload_mismatch::<S>())?,
            );
        }
        Ok(out)
    }

    /// Collection lookups never fail on a missing slot, so this is
    /// equivalent to [`get_all`](Resolver::get_all); kept for symmetry with
    /// [`try_get`](Resolver::try_get).
    #[track_caller]
    pub fn try_get_all<S>(&self) -> DiResult<Vec<Arc<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.get_all_named::<S>("")
    }

    /// Equivalent to [`create_all`](Resolver::create_all); kept for
    /// symmetry with [`try_create`](Resolver::try_create).
    #[track_caller]
    pub fn try_create_all<S>(&self) -> DiResult<Vec<Arc<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.create_all_named::<S>("")
    }

    // ----- Internal resolution -----

    /// Resolve a singleton descriptor by index, constructing and caching on
    /// first use. Exactly one factory invocation happens per descriptor even
    /// under contention; a failing factory leaves no cache entry.
    pub(crate) fn resolve_singleton_by_index(&self, idx: usize) -> DiResult<AnyArc> {
        let cell = self
            .inner
            .singletons
            .get(idx)
            .ok_or_else(|| DiError::container("descriptor index out of range"))?;
        let instance = cell.get_or_try_init(|| {
            trace!(
                "constructing singleton {}",
                self.inner.descriptors[idx].component.name()
            );
            self.invoke_factory(idx)
        })?;
        Ok(instance.value.clone())
    }

    /// Run a transient descriptor's factory by index.
    pub(crate) fn resolve_transient_by_index(&self, idx: usize) -> DiResult<Instance> {
        if idx >= self.inner.descriptors.len() {
            return Err(DiError::container("descriptor index out of range"));
        }
        self.invoke_factory(idx)
    }

    /// Resolve every singleton descriptor once. Used by eager builds so
    /// factory failures surface from `build` with full annotation.
    pub(crate) fn materialize_singletons(&self) -> DiResult<()> {
        for (idx, desc) in self.inner.descriptors.iter().enumerate() {
            if desc.lifetime == Lifetime::Singleton {
                self.resolve_singleton_by_index(idx)?;
            }
        }
        Ok(())
    }

    /// Invoke a descriptor's factory inside the annotation region.
    ///
    /// A container error unwinding out of the factory keeps its identity and
    /// gains this descriptor's tag on its resolution chain (seeded with the
    /// missing type's own name for a fresh not-found). Any other error is
    /// wrapped exactly once into a resolution error carrying the
    /// registration site.
    fn invoke_factory(&self, idx: usize) -> DiResult<Instance> {
        let desc = &self.inner.descriptors[idx];
        match (desc.factory)(self) {
            Ok(instance) => Ok(instance),
            Err(raw) => match raw.downcast::<DiError>() {
                Ok(mut err) => {
                    if err.resolution_context().is_empty() {
                        let seed = match err.kind() {
                            ErrorKind::NotFound { type_name, .. } => Some(*type_name),
                            _ => None,
                        };
                        if let Some(seed) = seed {
                            err.append_resolution_context(seed);
                        }
                    }
                    err.append_resolution_context(&desc.resolution_tag());
                    if err.diagnostic_detail().is_none() {
                        if let Some(trace) = desc.registration_trace() {
                            err.set_diagnostic_detail(trace);
                        }
                    }
                    Err(*err)
                }
                Err(other) => {
                    let mut err = DiError::new(ErrorKind::Resolution {
                        type_name: desc.component.name(),
                        registered_at: Some(desc.registered_at),
                        source: other,
                    });
                    if let Some(trace) = desc.registration_trace() {
                        err.set_diagnostic_detail(trace);
                    }
                    Err(err)
                }
            },
        }
    }

    fn find_slot(
        &self,
        type_id: TypeId,
        name: &str,
        lifetime: Lifetime,
        is_collection: bool,
    ) -> Option<&[usize]> {
        self.inner
            .slots
            .get(&SlotKey {
                type_id,
                name: name.to_string(),
                lifetime,
                is_collection,
            })
            .map(Vec::as_slice)
            .filter(|s| !s.is_empty())
    }

    /// Enumerate the slots that do exist for a type when a strict lookup
    /// missed, naming the accessor matching each.
    fn slot_hint(&self, type_id: TypeId, name: &str, attempted: &str) -> Option<String> {
        const SHAPES: [(Lifetime, bool, &str, &str); 4] = [
            (Lifetime::Singleton, false, "singleton", "get"),
            (Lifetime::Transient, false, "transient", "create"),
            (Lifetime::Singleton, true, "singleton collection", "get_all"),
            (Lifetime::Transient, true, "transient collection", "create_all"),
        ];

        let mut hints = String::new();
        for (lifetime, is_collection, description, accessor) in SHAPES {
            if self.find_slot(type_id, name, lifetime, is_collection).is_some() {
                if !hints.is_empty() {
                    hints.push_str(", ");
                }
                hints.push_str(description);
                hints.push_str(" (use ");
                hints.push_str(accessor);
                hints.push(')');
            }
        }

        if hints.is_empty() {
            None
        } else {
            Some(format!(
                "type is registered as {hints} but was requested via {attempted}"
            ))
        }
    }
}

fn downcast_slot<S>(value: &AnyArc) -> DiResult<Arc<S>>
where
    S: ?Sized + Send + Sync + 'static,
{
    downcast_value::<S>(value).ok_or_else(|| payload_mismatch::<S>())
}

fn payload_mismatch<S: ?Sized>() -> DiError {
    DiError::container(format!(
        "slot payload mismatch for {}",
        std::any::type_name::<S>()
    ))
}

impl Clone for Resolver {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("descriptors", &self.inner.descriptors.len())
            .field("slots", &self.inner.slots.len())
            .finish()
    }
}
