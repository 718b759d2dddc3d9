//! Build-time configuration.

/// Options recognized by [`Registry::build_with`](crate::Registry::build_with).
///
/// Every flag defaults to `true`; the default configuration validates the
/// whole graph and constructs every singleton before the resolver is handed
/// out, so misconfiguration and failing constructors surface at build time
/// rather than at first use.
///
/// # Examples
///
/// ```rust
/// use rivet_di::{Registry, BuildOptions};
///
/// let options = BuildOptions {
///     eager_singletons: false,
///     ..BuildOptions::default()
/// };
/// let resolver = Registry::new().build_with(options)?;
/// # drop(resolver);
/// # Ok::<(), rivet_di::DiError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Run the validator during `build`. Turning this off skips every
    /// validation pass regardless of the flags below.
    pub validate_on_build: bool,
    /// Include the captive-lifetime pass (singleton depending on a
    /// non-collection transient).
    pub validate_lifetimes: bool,
    /// Include the cycle-detection pass.
    pub detect_cycles: bool,
    /// Resolve every singleton descriptor once at build time so factory
    /// failures surface from `build`.
    pub eager_singletons: bool,
    /// Treat a collection dependency with no registered providers as
    /// satisfied (a legal empty collection).
    pub allow_empty_collections: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            validate_on_build: true,
            validate_lifetimes: true,
            detect_cycles: true,
            eager_singletons: true,
            allow_empty_collections: true,
        }
    }
}
