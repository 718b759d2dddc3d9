//! Error types for the dependency injection container.

use std::error::Error;
use std::fmt;
use std::panic::Location;

use crate::lifetime::Lifetime;
use crate::type_info::TypeInfo;

/// Boxed error type factories may propagate.
///
/// A factory body can fail with any error: container errors raised by nested
/// [`Resolver`](crate::Resolver) calls convert into this type through `?`,
/// and so do domain errors from user code. The resolver inspects the box on
/// the way out: a [`DiError`] keeps its identity and accrues resolution
/// context, anything else is wrapped exactly once into
/// [`ErrorKind::Resolution`].
pub type FactoryError = Box<dyn Error + Send + Sync + 'static>;

/// Result type returned by factory closures.
pub type FactoryResult<T> = Result<T, FactoryError>;

/// Result type for container operations.
pub type DiResult<T> = Result<T, DiError>;

/// Classification of a container failure.
#[derive(Debug)]
pub enum ErrorKind {
    /// Requested component not registered in the slot the accessor targets.
    NotFound {
        /// The requested component type name.
        type_name: &'static str,
        /// Name qualifier of the request, if any.
        name: Option<String>,
        /// Suggestion listing the slots that do exist for the type.
        hint: Option<String>,
    },
    /// A single-instance slot is already occupied.
    DuplicateRegistration {
        /// The conflicting component type name.
        type_name: &'static str,
        /// Name qualifier of the registration, if any.
        name: Option<String>,
    },
    /// The dependency graph contains a directed cycle.
    CyclicDependency {
        /// The cycle path; the first element repeats at the end to mark the
        /// back-edge.
        cycle: Vec<&'static str>,
    },
    /// A singleton declares a non-collection transient dependency.
    LifetimeMismatch {
        /// The consuming component type name.
        consumer: &'static str,
        /// Implementation type of the consumer, when known.
        consumer_impl: Option<&'static str>,
        /// Lifetime of the consumer.
        consumer_lifetime: Lifetime,
        /// The captive dependency type name.
        dependency: &'static str,
        /// Lifetime the dependency resolves with.
        dependency_lifetime: Lifetime,
    },
    /// A factory propagated a non-container error.
    Resolution {
        /// The component whose factory failed.
        type_name: &'static str,
        /// Where the failing component was registered.
        registered_at: Option<&'static Location<'static>>,
        /// The original factory error.
        source: FactoryError,
    },
    /// Container misuse outside the dedicated kinds above.
    Container {
        /// Free-form description.
        message: String,
    },
}

/// Dependency injection error.
///
/// Every container error carries its kind, the source location of the call
/// that raised it, an optional multi-line diagnostic detail (typically the
/// registration backtrace of the offending descriptor), and a resolution
/// context chain accrued while the error unwinds through nested factory
/// invocations.
///
/// [`Display`](fmt::Display) renders the message, the raising location and
/// the chain; [`full_diagnostic`](DiError::full_diagnostic) additionally
/// appends the detail on its own line, so log-line sinks and error-screen
/// sinks can pick their detail level.
///
/// # Examples
///
/// ```rust
/// use rivet_di::{Registry, DiError, ErrorKind};
///
/// struct Missing;
///
/// let resolver = Registry::new().build()?;
/// let err = resolver.get::<Missing>().err().unwrap();
/// assert!(matches!(err.kind(), ErrorKind::NotFound { .. }));
/// assert!(err.to_string().contains("Component not found"));
/// # Ok::<(), DiError>(())
/// ```
#[derive(Debug)]
pub struct DiError {
    kind: ErrorKind,
    location: &'static Location<'static>,
    context: String,
    detail: Option<String>,
}

impl DiError {
    pub(crate) fn new_at(kind: ErrorKind, location: &'static Location<'static>) -> Self {
        Self {
            kind,
            location,
            context: String::new(),
            detail: None,
        }
    }

    #[track_caller]
    pub(crate) fn new(kind: ErrorKind) -> Self {
        Self::new_at(kind, Location::caller())
    }

    #[track_caller]
    pub(crate) fn not_found(ty: TypeInfo, name: Option<&str>, hint: Option<String>) -> Self {
        Self::new(ErrorKind::NotFound {
            type_name: ty.name(),
            name: name.filter(|n| !n.is_empty()).map(str::to_owned),
            hint,
        })
    }

    #[track_caller]
    pub(crate) fn duplicate_registration(ty: TypeInfo, name: &str) -> Self {
        Self::new(ErrorKind::DuplicateRegistration {
            type_name: ty.name(),
            name: (!name.is_empty()).then(|| name.to_owned()),
        })
    }

    #[track_caller]
    pub(crate) fn container(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Container {
            message: message.into(),
        })
    }

    /// The failure classification.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Source location of the call that raised the error.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    /// The resolution chain accrued so far (empty for direct failures).
    pub fn resolution_context(&self) -> &str {
        &self.context
    }

    /// Extended diagnostic detail, when set.
    pub fn diagnostic_detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Attach extended diagnostic detail (e.g. a registration backtrace).
    pub fn set_diagnostic_detail(&mut self, detail: impl Into<String>) {
        self.detail = Some(detail.into());
    }

    /// Append a component tag to the resolution chain. Called by the
    /// resolver while an error unwinds out of a factory; tags join with
    /// `" -> "` and render as `" (while resolving a -> b)"`.
    pub fn append_resolution_context(&mut self, component_info: &str) {
        if !self.context.is_empty() {
            self.context.push_str(" -> ");
        }
        self.context.push_str(component_info);
    }

    /// The rendered message plus the diagnostic detail on its own line,
    /// when detail is present.
    pub fn full_diagnostic(&self) -> String {
        match &self.detail {
            Some(detail) => format!("{self}\n{detail}"),
            None => self.to_string(),
        }
    }

    fn message(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::NotFound {
                type_name,
                name,
                hint,
            } => {
                write!(f, "Component not found: {type_name}")?;
                if let Some(name) = name {
                    write!(f, " (name=\"{name}\")")?;
                }
                if let Some(hint) = hint {
                    write!(f, "; {hint}")?;
                }
                Ok(())
            }
            ErrorKind::DuplicateRegistration { type_name, name } => {
                write!(f, "Duplicate registration for: {type_name}")?;
                if let Some(name) = name {
                    write!(f, " (name=\"{name}\")")?;
                }
                Ok(())
            }
            ErrorKind::CyclicDependency { cycle } => {
                write!(f, "Cyclic dependency detected: {}", cycle.join(" -> "))
            }
            ErrorKind::LifetimeMismatch {
                consumer,
                consumer_impl,
                consumer_lifetime,
                dependency,
                dependency_lifetime,
            } => {
                write!(f, "Lifetime mismatch: {consumer}")?;
                if let Some(impl_name) = consumer_impl {
                    write!(f, " [impl: {impl_name}]")?;
                }
                write!(
                    f,
                    " ({}) depends on {dependency} ({})",
                    consumer_lifetime.label(),
                    dependency_lifetime.label(),
                )
            }
            ErrorKind::Resolution {
                type_name,
                registered_at,
                source,
            } => {
                write!(f, "Failed to resolve component {type_name}: {source}")?;
                if let Some(loc) = registered_at {
                    write!(f, " (registered at {}:{})", loc.file(), loc.line())?;
                }
                Ok(())
            }
            ErrorKind::Container { message } => f.write_str(message),
        }
    }
}

impl fmt::Display for DiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.message(f)?;
        write!(f, " [at {}:{}]", self.location.file(), self.location.line())?;
        if !self.context.is_empty() {
            write!(f, " (while resolving {})", self.context)?;
        }
        Ok(())
    }
}

impl Error for DiError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            ErrorKind::Resolution { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_renders_after_message() {
        let mut err = DiError::not_found(TypeInfo::of::<u32>(), None, None);
        assert!(!err.to_string().contains("while resolving"));

        err.append_resolution_context("u32");
        err.append_resolution_context("Holder [impl: Holder]");
        let rendered = err.to_string();
        assert!(rendered.contains("(while resolving u32 -> Holder [impl: Holder])"));
    }

    #[test]
    fn full_diagnostic_appends_detail() {
        let mut err = DiError::container("misuse");
        assert_eq!(err.full_diagnostic(), err.to_string());

        err.set_diagnostic_detail("line one\nline two");
        let full = err.full_diagnostic();
        assert!(full.ends_with("line one\nline two"));
        assert!(full.starts_with(&err.to_string()));
    }

    #[test]
    fn named_not_found_renders_name() {
        let err = DiError::not_found(TypeInfo::of::<String>(), Some("primary"), None);
        assert!(err.to_string().contains("(name=\"primary\")"));
    }

    #[test]
    fn location_points_at_raise_site() {
        let err = DiError::container("x");
        assert!(err.location().file().ends_with("error.rs"));
    }
}
