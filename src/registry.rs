//! Component registration and build-time expansion.
//!
//! This module contains the [`Registry`] type collecting registrations,
//! forward aliases and decorators, and the `build` step that expands them
//! into the frozen descriptor vector handed to the [`Resolver`].

use std::backtrace::Backtrace;
use std::panic::Location;
use std::sync::Arc;

use log::debug;

use crate::dependency::Dependency;
use crate::descriptor::{CastFn, Descriptor, FactoryFn};
use crate::error::{DiError, DiResult, FactoryError, FactoryResult};
use crate::handle::{downcast_value, AnyArc, Decorated, Instance};
use crate::lifetime::Lifetime;
use crate::options::BuildOptions;
use crate::resolver::Resolver;
use crate::type_info::TypeInfo;
use crate::validation::validate_descriptors;

/// Per-registration options: name, declared dependencies and implementation
/// type.
///
/// `Binding::new()` is the common case (unnamed, no declared dependencies).
/// Declaring dependencies feeds build-time validation; declaring the
/// implementation type enables decorator targeting and enriches
/// diagnostics with `[impl: ...]` tags.
///
/// # Examples
///
/// ```rust
/// use rivet_di::{Binding, Dependency};
///
/// trait Logger: Send + Sync {}
/// struct FileLogger;
///
/// let binding = Binding::new()
///     .named("audit")
///     .implemented_by::<FileLogger>()
///     .depends_on([Dependency::singleton::<String>()]);
/// # drop(binding);
/// ```
#[derive(Debug, Default)]
pub struct Binding {
    name: String,
    deps: Vec<Dependency>,
    impl_type: Option<TypeInfo>,
}

impl Binding {
    /// An unnamed binding with no declared dependencies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under a name. Named slots are resolved with the `_named`
    /// accessors and are not consulted when satisfying declared
    /// dependencies.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Record the concrete implementation type behind this registration.
    pub fn implemented_by<T: ?Sized + 'static>(mut self) -> Self {
        self.impl_type = Some(TypeInfo::of::<T>());
        self
    }

    /// Declare the factory's inputs for build-time validation.
    pub fn depends_on(mut self, deps: impl IntoIterator<Item = Dependency>) -> Self {
        self.deps.extend(deps);
        self
    }
}

/// Options for a decorator registration: which implementations it targets
/// and which extra dependencies its constructor resolves.
#[derive(Debug, Default)]
pub struct Decoration {
    target_impl: Option<TypeInfo>,
    extra_deps: Vec<Dependency>,
}

impl Decoration {
    /// Decorate every registration of the interface.
    pub fn all() -> Self {
        Self::default()
    }

    /// Decorate only registrations whose declared implementation type is
    /// `T` (see [`Binding::implemented_by`]).
    pub fn of_impl<T: ?Sized + 'static>() -> Self {
        Self {
            target_impl: Some(TypeInfo::of::<T>()),
            extra_deps: Vec::new(),
        }
    }

    /// Declare additional dependencies the decorator resolves; appended to
    /// each decorated descriptor for validation.
    pub fn depends_on(mut self, deps: impl IntoIterator<Item = Dependency>) -> Self {
        self.extra_deps.extend(deps);
        self
    }
}

struct ForwardEntry {
    interface: TypeInfo,
    target: TypeInfo,
    cast: CastFn,
    registered_at: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

type WrapperFn = Box<dyn Fn(FactoryFn) -> FactoryFn + Send + Sync>;

struct DecoratorEntry {
    interface: TypeInfo,
    target_impl: Option<TypeInfo>,
    wrapper: WrapperFn,
    extra_deps: Vec<Dependency>,
}

/// One-shot builder collecting component registrations.
///
/// Factories register against interface types during the configuration
/// phase; [`build`](Registry::build) then expands forward aliases, applies
/// decorators, validates the dependency graph and freezes everything into a
/// [`Resolver`]. `build` consumes the registry, so registration after build
/// is a compile error rather than a runtime one.
///
/// The registry is not thread-safe; configuration happens on a single owner.
/// The resolver produced by `build` is fully thread-safe.
///
/// # Examples
///
/// ```rust
/// use rivet_di::{Registry, Binding, Dependency, Lifetime};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn log(&self, msg: &str);
/// }
///
/// struct StdoutLogger;
/// impl Logger for StdoutLogger {
///     fn log(&self, msg: &str) {
///         println!("{msg}");
///     }
/// }
///
/// struct Greeter {
///     logger: Arc<dyn Logger>,
/// }
///
/// let mut registry = Registry::new();
/// registry.add_singleton::<dyn Logger, _>(|_| Ok(Arc::new(StdoutLogger)))?;
/// registry.add_single::<Greeter, _>(
///     Lifetime::Singleton,
///     Binding::new().depends_on([Dependency::singleton::<dyn Logger>()]),
///     |r| Ok(Arc::new(Greeter { logger: r.get::<dyn Logger>()? })),
/// )?;
///
/// let resolver = registry.build()?;
/// resolver.get::<Greeter>()?.logger.log("wired");
/// # Ok::<(), rivet_di::DiError>(())
/// ```
#[derive(Default)]
pub struct Registry {
    descriptors: Vec<Descriptor>,
    forwards: Vec<ForwardEntry>,
    decorators: Vec<DecoratorEntry>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component into a single-instance slot.
    ///
    /// The slot `(S, name, lifetime)` may hold at most one descriptor;
    /// registering into an occupied slot fails with a
    /// duplicate-registration error. The same type may still be registered
    /// under a different name, lifetime, or into a collection slot.
    #[track_caller]
    pub fn add_single<S, F>(
        &mut self,
        lifetime: Lifetime,
        binding: Binding,
        factory: F,
    ) -> DiResult<&mut Self>
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&Resolver) -> FactoryResult<Arc<S>> + Send + Sync + 'static,
    {
        let component = TypeInfo::of::<S>();
        if self.occupied(component, &binding.name, lifetime) {
            return Err(DiError::duplicate_registration(component, &binding.name));
        }
        self.push_descriptor::<S, F>(lifetime, binding, factory, false, Location::caller());
        Ok(self)
    }

    /// Register a component into a collection slot.
    ///
    /// Collection slots accept any number of registrations; enumeration
    /// preserves registration order.
    #[track_caller]
    pub fn add_collection<S, F>(
        &mut self,
        lifetime: Lifetime,
        binding: Binding,
        factory: F,
    ) -> DiResult<&mut Self>
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&Resolver) -> FactoryResult<Arc<S>> + Send + Sync + 'static,
    {
        self.push_descriptor::<S, F>(lifetime, binding, factory, true, Location::caller());
        Ok(self)
    }

    /// Shorthand for an unnamed singleton with no declared dependencies.
    #[track_caller]
    pub fn add_singleton<S, F>(&mut self, factory: F) -> DiResult<&mut Self>
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&Resolver) -> FactoryResult<Arc<S>> + Send + Sync + 'static,
    {
        self.add_single::<S, F>(Lifetime::Singleton, Binding::new(), factory)
    }

    /// Shorthand for an unnamed transient with no declared dependencies.
    #[track_caller]
    pub fn add_transient<S, F>(&mut self, factory: F) -> DiResult<&mut Self>
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&Resolver) -> FactoryResult<Arc<S>> + Send + Sync + 'static,
    {
        self.add_single::<S, F>(Lifetime::Transient, Binding::new(), factory)
    }

    /// Register an already-constructed value as a singleton.
    ///
    /// ```rust
    /// use rivet_di::Registry;
    ///
    /// struct Config { port: u16 }
    ///
    /// let mut registry = Registry::new();
    /// registry.add_instance(Config { port: 8080 })?;
    /// let resolver = registry.build()?;
    /// assert_eq!(resolver.get::<Config>()?.port, 8080);
    /// # Ok::<(), rivet_di::DiError>(())
    /// ```
    #[track_caller]
    pub fn add_instance<S>(&mut self, value: S) -> DiResult<&mut Self>
    where
        S: Send + Sync + 'static,
    {
        let arc = Arc::new(value);
        self.add_single::<S, _>(
            Lifetime::Singleton,
            Binding::new().implemented_by::<S>(),
            move |_| Ok(arc.clone()),
        )
    }

    /// Defer an alias from `T`'s registrations to interface `I`.
    ///
    /// At build time, every unnamed descriptor of `T` (any lifetime, single
    /// or collection) is replicated under `I`. Singleton targets share the
    /// target's cached instance (the alias does not own it); transient
    /// targets produce a fresh instance per resolution. The `cast` closure
    /// performs the `Arc<T> -> Arc<I>` coercion at a site where the compiler
    /// can unsize:
    ///
    /// ```rust
    /// use rivet_di::Registry;
    /// use std::sync::Arc;
    ///
    /// trait Animal: Send + Sync {
    ///     fn species(&self) -> &'static str;
    /// }
    ///
    /// struct Duck;
    /// impl Animal for Duck {
    ///     fn species(&self) -> &'static str { "duck" }
    /// }
    ///
    /// let mut registry = Registry::new();
    /// registry.add_singleton::<Duck, _>(|_| Ok(Arc::new(Duck)))?;
    /// registry.forward::<dyn Animal, Duck, _>(|duck| duck);
    ///
    /// let resolver = registry.build()?;
    /// assert_eq!(resolver.get::<dyn Animal>()?.species(), "duck");
    /// # Ok::<(), rivet_di::DiError>(())
    /// ```
    ///
    /// If `T` has no unnamed registrations at build time, validation reports
    /// the missing target at the forward's registration site.
    #[track_caller]
    pub fn forward<I, T, C>(&mut self, cast: C) -> &mut Self
    where
        I: ?Sized + Send + Sync + 'static,
        T: ?Sized + Send + Sync + 'static,
        C: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    {
        let cast = Arc::new(cast);
        let erased: CastFn = Arc::new(move |value: &AnyArc| {
            downcast_value::<T>(value).map(|t| Arc::new(cast(t)) as AnyArc)
        });
        self.forwards.push(ForwardEntry {
            interface: TypeInfo::of::<I>(),
            target: TypeInfo::of::<T>(),
            cast: erased,
            registered_at: Location::caller(),
            backtrace: Arc::new(Backtrace::capture()),
        });
        self
    }

    /// Defer a decorator for interface `I`.
    ///
    /// At build time the decorator wraps the factory of every matching
    /// descriptor (optionally narrowed to one implementation via
    /// [`Decoration::of_impl`]). Decorators nest in registration order: the
    /// last registered decorator becomes the outermost layer.
    ///
    /// The decorator receives a [`Decorated`] handle for the inner value; a
    /// forward-aliased singleton inner reports [`owns() ==
    /// false`](Decorated::owns), and decorators must tolerate both cases.
    pub fn decorate<I, D>(&mut self, decoration: Decoration, decorator: D) -> &mut Self
    where
        I: ?Sized + Send + Sync + 'static,
        D: Fn(Decorated<I>, &Resolver) -> FactoryResult<Arc<I>> + Send + Sync + 'static,
    {
        let interface = TypeInfo::of::<I>();
        let decorator = Arc::new(decorator);
        let wrapper: WrapperFn = Box::new(move |inner: FactoryFn| -> FactoryFn {
            let decorator = decorator.clone();
            Arc::new(move |r: &Resolver| {
                let instance = inner(r)?;
                let owned = instance.owned;
                let typed = instance.downcast::<I>().ok_or_else(|| -> FactoryError {
                    Box::new(DiError::container(format!(
                        "decorator payload mismatch for {}",
                        std::any::type_name::<I>()
                    )))
                })?;
                let wrapped = decorator(Decorated::new(typed, owned), r)?;
                Ok(Instance::owned(wrapped))
            })
        });
        self.decorators.push(DecoratorEntry {
            interface,
            target_impl: decoration.target_impl,
            wrapper,
            extra_deps: decoration.extra_deps,
        });
        self
    }

    /// The descriptors registered so far, before build-time expansion.
    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    /// Finalize with default [`BuildOptions`].
    #[track_caller]
    pub fn build(self) -> DiResult<Resolver> {
        self.build_with(BuildOptions::default())
    }

    /// Finalize the registry into a [`Resolver`].
    ///
    /// Proceeds in a fixed order: forward expansion, decorator application,
    /// validation, eager singleton construction. A validation or eager
    /// failure aborts the build; no resolver escapes half-built.
    #[track_caller]
    pub fn build_with(mut self, options: BuildOptions) -> DiResult<Resolver> {
        let raised_at = Location::caller();

        self.expand_forwards();
        self.apply_decorators();
        debug!(
            "building resolver: {} descriptors after expansion",
            self.descriptors.len()
        );

        if options.validate_on_build {
            validate_descriptors(&self.descriptors, &options, raised_at)?;
        }

        let resolver = Resolver::from_descriptors(self.descriptors);

        if options.eager_singletons {
            resolver.materialize_singletons()?;
        }

        Ok(resolver)
    }

    fn occupied(&self, component: TypeInfo, name: &str, lifetime: Lifetime) -> bool {
        self.descriptors.iter().any(|d| {
            d.component == component && d.name == name && d.lifetime == lifetime && !d.is_collection
        })
    }

    fn push_descriptor<S, F>(
        &mut self,
        lifetime: Lifetime,
        binding: Binding,
        factory: F,
        is_collection: bool,
        registered_at: &'static Location<'static>,
    ) where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&Resolver) -> FactoryResult<Arc<S>> + Send + Sync + 'static,
    {
        let erased: FactoryFn = Arc::new(move |r: &Resolver| factory(r).map(Instance::owned));
        self.descriptors.push(Descriptor {
            component: TypeInfo::of::<S>(),
            lifetime,
            factory: erased,
            dependencies: binding.deps,
            name: binding.name,
            is_collection,
            impl_type: binding.impl_type,
            forward_target: None,
            registered_at,
            backtrace: Arc::new(Backtrace::capture()),
        });
    }

    /// Expand each forward entry over every unnamed descriptor of its
    /// target. Expansion scans the pre-build vector only; a forward whose
    /// target exists solely through another forward does not chain.
    fn expand_forwards(&mut self) {
        let mut expanded = Vec::new();
        for fwd in &self.forwards {
            let mut found_any = false;
            for (idx, target) in self.descriptors.iter().enumerate() {
                if target.component != fwd.target || !target.name.is_empty() {
                    continue;
                }
                found_any = true;

                let factory = match target.lifetime {
                    Lifetime::Singleton => {
                        // Share the target's cache entry; the alias holds a
                        // non-owning view of it.
                        let cast = fwd.cast.clone();
                        let interface = fwd.interface;
                        let f: FactoryFn = Arc::new(move |r: &Resolver| {
                            let value = r.resolve_singleton_by_index(idx)?;
                            let casted = cast(&value)
                                .ok_or_else(|| cast_mismatch(interface))?;
                            Ok(Instance::from_parts(casted, false))
                        });
                        f
                    }
                    Lifetime::Transient => {
                        let cast = fwd.cast.clone();
                        let interface = fwd.interface;
                        let f: FactoryFn = Arc::new(move |r: &Resolver| {
                            let instance = r.resolve_transient_by_index(idx)?;
                            let casted = cast(&instance.value)
                                .ok_or_else(|| cast_mismatch(interface))?;
                            Ok(Instance::from_parts(casted, true))
                        });
                        f
                    }
                };

                expanded.push(Descriptor {
                    component: fwd.interface,
                    lifetime: target.lifetime,
                    factory,
                    dependencies: vec![Dependency {
                        ty: fwd.target,
                        is_collection: target.is_collection,
                        is_transient: target.lifetime == Lifetime::Transient,
                    }],
                    name: String::new(),
                    is_collection: target.is_collection,
                    impl_type: target.impl_type,
                    forward_target: Some(fwd.target),
                    registered_at: fwd.registered_at,
                    backtrace: fwd.backtrace.clone(),
                });
            }

            if !found_any {
                // Placeholder so validation reports the missing target at
                // the forward's registration site.
                let target = fwd.target;
                expanded.push(Descriptor {
                    component: fwd.interface,
                    lifetime: Lifetime::Transient,
                    factory: Arc::new(move |_: &Resolver| {
                        Err(Box::new(DiError::not_found(target, None, None)) as FactoryError)
                    }),
                    dependencies: vec![Dependency {
                        ty: fwd.target,
                        is_collection: false,
                        is_transient: false,
                    }],
                    name: String::new(),
                    is_collection: false,
                    impl_type: None,
                    forward_target: Some(fwd.target),
                    registered_at: fwd.registered_at,
                    backtrace: fwd.backtrace.clone(),
                });
            }
        }
        if !expanded.is_empty() {
            debug!("forward expansion produced {} descriptors", expanded.len());
            self.descriptors.extend(expanded);
        }
    }

    /// Wrap matching factories in decorator registration order, so the last
    /// registered decorator ends up outermost.
    fn apply_decorators(&mut self) {
        for dec in &self.decorators {
            for desc in &mut self.descriptors {
                if desc.component != dec.interface {
                    continue;
                }
                if let Some(target) = dec.target_impl {
                    if desc.impl_type != Some(target) {
                        continue;
                    }
                }
                let inner = desc.factory.clone();
                desc.factory = (dec.wrapper)(inner);
                desc.dependencies.extend(dec.extra_deps.iter().copied());
            }
        }
    }
}

fn cast_mismatch(interface: TypeInfo) -> FactoryError {
    Box::new(DiError::container(format!(
        "forward cast payload mismatch for {}",
        interface.name()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Port: Send + Sync {}
    struct Adapter;
    impl Port for Adapter {}

    #[test]
    fn duplicate_single_slot_is_rejected() {
        let mut registry = Registry::new();
        registry
            .add_singleton::<dyn Port, _>(|_| Ok(Arc::new(Adapter)))
            .unwrap();
        let err = registry
            .add_singleton::<dyn Port, _>(|_| Ok(Arc::new(Adapter)))
            .err().unwrap();
        assert!(err.to_string().contains("Duplicate registration"));
    }

    #[test]
    fn distinct_lifetimes_share_a_type() {
        let mut registry = Registry::new();
        registry
            .add_singleton::<dyn Port, _>(|_| Ok(Arc::new(Adapter)))
            .unwrap();
        registry
            .add_transient::<dyn Port, _>(|_| Ok(Arc::new(Adapter)))
            .unwrap();
        assert_eq!(registry.descriptors().len(), 2);
    }

    #[test]
    fn named_and_unnamed_slots_coexist() {
        let mut registry = Registry::new();
        registry
            .add_singleton::<dyn Port, _>(|_| Ok(Arc::new(Adapter)))
            .unwrap();
        registry
            .add_single::<dyn Port, _>(
                Lifetime::Singleton,
                Binding::new().named("backup"),
                |_| Ok(Arc::new(Adapter)),
            )
            .unwrap();
        let err = registry
            .add_single::<dyn Port, _>(
                Lifetime::Singleton,
                Binding::new().named("backup"),
                |_| Ok(Arc::new(Adapter)),
            )
            .err().unwrap();
        assert!(err.to_string().contains("name=\"backup\""));
    }

    #[test]
    fn collections_never_conflict() {
        let mut registry = Registry::new();
        for _ in 0..3 {
            registry
                .add_collection::<dyn Port, _>(Lifetime::Singleton, Binding::new(), |_| {
                    Ok(Arc::new(Adapter))
                })
                .unwrap();
        }
        assert_eq!(registry.descriptors().len(), 3);
    }
}
