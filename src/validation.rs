//! Build-time validation of the descriptor graph.
//!
//! The validator is a pure function over the final descriptor vector. It
//! catches the three configuration errors that would otherwise surface as
//! confusing runtime failures: dependencies with no provider, captive
//! lifetimes (a singleton holding a single transient forever), and
//! dependency cycles.

use std::any::TypeId;
use std::collections::HashMap;
use std::panic::Location;

use crate::descriptor::Descriptor;
use crate::error::{DiError, DiResult, ErrorKind};
use crate::lifetime::Lifetime;
use crate::options::BuildOptions;
use crate::type_info::TypeInfo;

/// Slot key as seen by validation: `(type, name, lifetime, is_collection)`.
type SlotKey<'a> = (TypeId, &'a str, Lifetime, bool);

fn build_slot_index(descriptors: &[Descriptor]) -> HashMap<SlotKey<'_>, Vec<usize>> {
    let mut index: HashMap<SlotKey<'_>, Vec<usize>> = HashMap::new();
    for (i, d) in descriptors.iter().enumerate() {
        index
            .entry((d.component.id(), d.name.as_str(), d.lifetime, d.is_collection))
            .or_default()
            .push(i);
    }
    index
}

/// Validate the final descriptor vector against `options`.
///
/// `raised_at` is the source location of the `build` call; every failure is
/// attributed to it, with the offending descriptor's registration trace
/// attached as diagnostic detail.
pub(crate) fn validate_descriptors(
    descriptors: &[Descriptor],
    options: &BuildOptions,
    raised_at: &'static Location<'static>,
) -> DiResult<()> {
    let slot_index = build_slot_index(descriptors);

    check_missing_dependencies(descriptors, &slot_index, options, raised_at)?;

    if options.validate_lifetimes {
        check_lifetime_rules(descriptors, raised_at)?;
    }

    if options.detect_cycles {
        check_cycles(descriptors, &slot_index, raised_at)?;
    }

    Ok(())
}

/// Every declared dependency must have a providing slot. Dependencies only
/// consult unnamed slots; a collection dependency with no providers is legal
/// when `allow_empty_collections` is set.
fn check_missing_dependencies(
    descriptors: &[Descriptor],
    slot_index: &HashMap<SlotKey<'_>, Vec<usize>>,
    options: &BuildOptions,
    raised_at: &'static Location<'static>,
) -> DiResult<()> {
    for desc in descriptors {
        for dep in &desc.dependencies {
            let needed_lifetime = if dep.is_transient {
                Lifetime::Transient
            } else {
                Lifetime::Singleton
            };
            let needed = (dep.ty.id(), "", needed_lifetime, dep.is_collection);
            if slot_index.contains_key(&needed) {
                continue;
            }
            if dep.is_collection && options.allow_empty_collections {
                continue;
            }

            let mut err = DiError::new_at(
                ErrorKind::NotFound {
                    type_name: dep.ty.name(),
                    name: None,
                    hint: None,
                },
                raised_at,
            );
            err.append_resolution_context(&desc.resolution_tag());
            if let Some(trace) = desc.registration_trace() {
                err.set_diagnostic_detail(trace);
            }
            return Err(err);
        }
    }
    Ok(())
}

/// A singleton holding a single transient would capture one instance
/// forever, defeating the transient contract. Collections of transients are
/// allowed: the collection is an extensibility seam materialized once at
/// construction, not a per-call factory.
fn check_lifetime_rules(
    descriptors: &[Descriptor],
    raised_at: &'static Location<'static>,
) -> DiResult<()> {
    for desc in descriptors {
        if desc.lifetime != Lifetime::Singleton {
            continue;
        }
        for dep in &desc.dependencies {
            if dep.is_transient && !dep.is_collection {
                let mut err = DiError::new_at(
                    ErrorKind::LifetimeMismatch {
                        consumer: desc.component.name(),
                        consumer_impl: desc.impl_type.map(|t| t.name()),
                        consumer_lifetime: Lifetime::Singleton,
                        dependency: dep.ty.name(),
                        dependency_lifetime: Lifetime::Transient,
                    },
                    raised_at,
                );
                if let Some(trace) = desc.registration_trace() {
                    err.set_diagnostic_detail(trace);
                }
                return Err(err);
            }
        }
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq)]
enum VisitState {
    InProgress,
    Done,
}

struct CycleSearch<'a> {
    descriptors: &'a [Descriptor],
    slot_index: &'a HashMap<SlotKey<'a>, Vec<usize>>,
    states: HashMap<TypeId, VisitState>,
    path: Vec<TypeInfo>,
    raised_at: &'static Location<'static>,
}

impl CycleSearch<'_> {
    /// Depth-first walk over the type graph. Cycle nodes are types, not
    /// slot variants: any back-edge into a type on the current stack is a
    /// cycle regardless of shape.
    fn visit(&mut self, node: TypeInfo, is_collection: bool, is_transient: bool) -> DiResult<()> {
        match self.states.get(&node.id()) {
            Some(VisitState::Done) => return Ok(()),
            Some(VisitState::InProgress) => {
                let start = self
                    .path
                    .iter()
                    .position(|t| *t == node)
                    .unwrap_or(0);
                let mut cycle: Vec<&'static str> =
                    self.path[start..].iter().map(|t| t.name()).collect();
                cycle.push(node.name());
                return Err(DiError::new_at(
                    ErrorKind::CyclicDependency { cycle },
                    self.raised_at,
                ));
            }
            None => {}
        }

        self.states.insert(node.id(), VisitState::InProgress);
        self.path.push(node);

        let lifetime = if is_transient {
            Lifetime::Transient
        } else {
            Lifetime::Singleton
        };
        if let Some(indices) = self
            .slot_index
            .get(&(node.id(), "", lifetime, is_collection))
        {
            for &idx in indices {
                // Collect dep shapes up front; the recursion only needs values.
                let deps: Vec<_> = self.descriptors[idx].dependencies.to_vec();
                for dep in deps {
                    self.visit(dep.ty, dep.is_collection, dep.is_transient)?;
                }
            }
        }

        self.path.pop();
        self.states.insert(node.id(), VisitState::Done);
        Ok(())
    }
}

fn check_cycles(
    descriptors: &[Descriptor],
    slot_index: &HashMap<SlotKey<'_>, Vec<usize>>,
    raised_at: &'static Location<'static>,
) -> DiResult<()> {
    let mut search = CycleSearch {
        descriptors,
        slot_index,
        states: HashMap::new(),
        path: Vec::new(),
        raised_at,
    };
    for desc in descriptors {
        if !search.states.contains_key(&desc.component.id()) {
            search.visit(
                desc.component,
                desc.is_collection,
                desc.lifetime == Lifetime::Transient,
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Binding, Dependency, Registry};
    use std::sync::Arc;

    struct A;
    struct B;
    struct C;

    #[test]
    fn self_cycle_reports_doubled_node() {
        let mut registry = Registry::new();
        registry
            .add_single::<A, _>(
                Lifetime::Singleton,
                Binding::new().depends_on([Dependency::singleton::<A>()]),
                |r| {
                    let _ = r.get::<A>()?;
                    Ok(Arc::new(A))
                },
            )
            .unwrap();
        let err = registry.build().unwrap_err();
        match err.kind() {
            ErrorKind::CyclicDependency { cycle } => {
                assert_eq!(cycle.len(), 2);
                assert_eq!(cycle[0], cycle[1]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn three_step_cycle_path_is_ordered() {
        let mut registry = Registry::new();
        registry
            .add_single::<A, _>(
                Lifetime::Singleton,
                Binding::new().depends_on([Dependency::singleton::<B>()]),
                |_| Ok(Arc::new(A)),
            )
            .unwrap();
        registry
            .add_single::<B, _>(
                Lifetime::Singleton,
                Binding::new().depends_on([Dependency::singleton::<C>()]),
                |_| Ok(Arc::new(B)),
            )
            .unwrap();
        registry
            .add_single::<C, _>(
                Lifetime::Singleton,
                Binding::new().depends_on([Dependency::singleton::<A>()]),
                |_| Ok(Arc::new(C)),
            )
            .unwrap();
        let err = registry.build().unwrap_err();
        match err.kind() {
            ErrorKind::CyclicDependency { cycle } => {
                assert_eq!(cycle.len(), 4);
                assert_eq!(cycle.first(), cycle.last());
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn diamond_graph_is_not_a_cycle() {
        // A -> B, A -> C, B -> D, C -> D: D is visited twice but never
        // while on the stack.
        struct D;
        let mut registry = Registry::new();
        registry
            .add_single::<D, _>(Lifetime::Singleton, Binding::new(), |_| Ok(Arc::new(D)))
            .unwrap();
        registry
            .add_single::<B, _>(
                Lifetime::Singleton,
                Binding::new().depends_on([Dependency::singleton::<D>()]),
                |_| Ok(Arc::new(B)),
            )
            .unwrap();
        registry
            .add_single::<C, _>(
                Lifetime::Singleton,
                Binding::new().depends_on([Dependency::singleton::<D>()]),
                |_| Ok(Arc::new(C)),
            )
            .unwrap();
        registry
            .add_single::<A, _>(
                Lifetime::Singleton,
                Binding::new().depends_on([
                    Dependency::singleton::<B>(),
                    Dependency::singleton::<C>(),
                ]),
                |_| Ok(Arc::new(A)),
            )
            .unwrap();
        assert!(registry.build().is_ok());
    }
}
