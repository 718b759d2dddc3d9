//! Frozen per-registration records.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use crate::dependency::Dependency;
use crate::error::FactoryResult;
use crate::handle::Instance;
use crate::lifetime::Lifetime;
use crate::resolver::Resolver;
use crate::type_info::TypeInfo;

/// Erased factory stored on a descriptor. Produces one instance, resolving
/// its own dependencies through the passed resolver.
pub(crate) type FactoryFn = Arc<dyn Fn(&Resolver) -> FactoryResult<Instance> + Send + Sync>;

/// Erased forward cast: maps the target slot's erased value to the
/// interface slot's erased value. `None` signals a payload mismatch.
pub(crate) type CastFn = Arc<dyn Fn(&crate::handle::AnyArc) -> Option<crate::handle::AnyArc> + Send + Sync>;

/// The immutable record produced by one registration call.
///
/// Descriptors are frozen once [`build`](crate::Registry::build) runs: the
/// resolver owns the final vector and nothing mutates it afterwards. The
/// public accessors support introspection (tests, graph export); factories
/// are not exposed.
pub struct Descriptor {
    pub(crate) component: TypeInfo,
    pub(crate) lifetime: Lifetime,
    pub(crate) factory: FactoryFn,
    pub(crate) dependencies: Vec<Dependency>,
    pub(crate) name: String,
    pub(crate) is_collection: bool,
    pub(crate) impl_type: Option<TypeInfo>,
    pub(crate) forward_target: Option<TypeInfo>,
    pub(crate) registered_at: &'static Location<'static>,
    pub(crate) backtrace: Arc<Backtrace>,
}

impl Descriptor {
    /// The interface this registration provides.
    pub fn component(&self) -> TypeInfo {
        self.component
    }

    /// Instance caching policy.
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// Declared dependencies (used by validation).
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Registration name; empty for unnamed slots.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the registration lives in a collection slot.
    pub fn is_collection(&self) -> bool {
        self.is_collection
    }

    /// The concrete implementation type, when declared.
    pub fn impl_type(&self) -> Option<TypeInfo> {
        self.impl_type
    }

    /// The aliased target type when this descriptor was produced by forward
    /// expansion.
    pub fn forward_target(&self) -> Option<TypeInfo> {
        self.forward_target
    }

    /// Source location of the registration call.
    pub fn registered_at(&self) -> &'static Location<'static> {
        self.registered_at
    }

    /// Short tag identifying this descriptor in resolution chains:
    /// `"Component [impl: Impl]"`.
    pub(crate) fn resolution_tag(&self) -> String {
        match self.impl_type {
            Some(impl_type) => format!("{} [impl: {}]", self.component.name(), impl_type.name()),
            None => self.component.name().to_string(),
        }
    }

    /// Formatted backtrace captured at registration, available when the
    /// process runs with backtrace capture enabled (`RUST_BACKTRACE`).
    pub(crate) fn registration_trace(&self) -> Option<String> {
        if self.backtrace.status() == BacktraceStatus::Captured {
            Some(format!(
                "registered at {}:{}\n{}",
                self.registered_at.file(),
                self.registered_at.line(),
                self.backtrace
            ))
        } else {
            Some(format!(
                "registered at {}:{}",
                self.registered_at.file(),
                self.registered_at.line()
            ))
        }
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("component", &self.component)
            .field("lifetime", &self.lifetime)
            .field("name", &self.name)
            .field("is_collection", &self.is_collection)
            .field("impl_type", &self.impl_type)
            .field("forward_target", &self.forward_target)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}
