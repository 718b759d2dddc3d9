//! # rivet-di
//!
//! Runtime dependency injection for Rust with build-time graph validation.
//!
//! Client code registers component factories against interface types during
//! a one-shot configuration phase, then asks the resolver for fully-wired
//! instances. The container decides which factory serves each request, when
//! instances are created and cached, how independent registrations compose
//! into collections and decorator chains, and which configurations are
//! rejected before any user code runs.
//!
//! ## Features
//!
//! - **Two lifetimes**: `Singleton` (cached, exactly-once construction even
//!   under contention) and `Transient` (fresh instance per resolution)
//! - **Trait-object components**: `dyn Trait` is a first-class interface type
//! - **Collections**: independent registrations enumerate in registration order
//! - **Decorators**: factory wrappers nesting in registration order
//! - **Forward aliases**: route an interface to the registrations of a
//!   concrete target, sharing singleton instances
//! - **Build-time validation**: missing dependencies, captive lifetimes and
//!   dependency cycles are rejected before a resolver exists
//! - **Rich diagnostics**: errors carry source locations, resolution chains
//!   and optional registration backtraces
//!
//! ## Quick start
//!
//! ```rust
//! use rivet_di::{Registry, Binding, Dependency, Lifetime};
//! use std::sync::Arc;
//!
//! trait Logger: Send + Sync {
//!     fn log(&self, msg: &str);
//! }
//!
//! struct StdoutLogger;
//! impl Logger for StdoutLogger {
//!     fn log(&self, msg: &str) {
//!         println!("[log] {msg}");
//!     }
//! }
//!
//! struct Greeter {
//!     logger: Arc<dyn Logger>,
//! }
//!
//! impl Greeter {
//!     fn greet(&self) {
//!         self.logger.log("hello");
//!     }
//! }
//!
//! let mut registry = Registry::new();
//! registry.add_singleton::<dyn Logger, _>(|_| Ok(Arc::new(StdoutLogger)))?;
//! registry.add_single::<Greeter, _>(
//!     Lifetime::Singleton,
//!     Binding::new().depends_on([Dependency::singleton::<dyn Logger>()]),
//!     |r| Ok(Arc::new(Greeter { logger: r.get::<dyn Logger>()? })),
//! )?;
//!
//! let resolver = registry.build()?;
//! resolver.get::<Greeter>()?.greet();
//! # Ok::<(), rivet_di::DiError>(())
//! ```
//!
//! ## Collections and decorators
//!
//! ```rust
//! use rivet_di::{Registry, Binding, Decoration, Lifetime};
//! use std::sync::Arc;
//!
//! trait Plugin: Send + Sync {
//!     fn name(&self) -> String;
//! }
//!
//! struct Named(&'static str);
//! impl Plugin for Named {
//!     fn name(&self) -> String {
//!         self.0.to_string()
//!     }
//! }
//!
//! let mut registry = Registry::new();
//! for tag in ["a", "b"] {
//!     registry.add_collection::<dyn Plugin, _>(
//!         Lifetime::Singleton,
//!         Binding::new(),
//!         move |_| Ok(Arc::new(Named(tag))),
//!     )?;
//! }
//!
//! struct Excited {
//!     inner: rivet_di::Decorated<dyn Plugin>,
//! }
//! impl Plugin for Excited {
//!     fn name(&self) -> String {
//!         format!("{}!", self.inner.name())
//!     }
//! }
//! registry.decorate::<dyn Plugin, _>(Decoration::all(), |inner, _| {
//!     Ok(Arc::new(Excited { inner }))
//! });
//!
//! let resolver = registry.build()?;
//! let names: Vec<_> = resolver
//!     .get_all::<dyn Plugin>()?
//!     .iter()
//!     .map(|p| p.name())
//!     .collect();
//! assert_eq!(names, ["a!", "b!"]);
//! # Ok::<(), rivet_di::DiError>(())
//! ```
//!
//! ## Phases and thread safety
//!
//! Configuration (a [`Registry`]) happens on a single owner and ends at
//! [`build`](Registry::build), which consumes the registry. The resulting
//! [`Resolver`] is immutable, cheap to clone and safe to share across
//! threads; racing threads observe exactly one construction per singleton.

pub mod dependency;
pub mod descriptor;
pub mod error;
pub mod graph_export;
pub mod handle;
pub mod lifetime;
pub mod options;
pub mod registry;
pub mod resolver;
pub mod type_info;

mod validation;

pub use dependency::Dependency;
pub use descriptor::Descriptor;
pub use error::{DiError, DiResult, ErrorKind, FactoryError, FactoryResult};
pub use handle::Decorated;
pub use lifetime::Lifetime;
pub use options::BuildOptions;
pub use registry::{Binding, Decoration, Registry};
pub use resolver::Resolver;
pub use type_info::TypeInfo;
