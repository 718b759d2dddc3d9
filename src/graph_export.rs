//! Dependency-graph export for visualization and tooling.
//!
//! Builds a plain node/edge view over a registry's descriptors, before
//! build-time expansion, and renders it as Graphviz DOT. With the
//! `graph-export` feature the graph types serialize with serde for
//! UI-oriented tooling.

use std::collections::BTreeMap;
use std::fmt::Write as _;

#[cfg(feature = "graph-export")]
use serde::{Deserialize, Serialize};

use crate::registry::Registry;

/// A node in the dependency graph: one registration.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "graph-export", derive(Serialize, Deserialize))]
pub struct GraphNode {
    /// Stable identifier within this graph.
    pub id: String,
    /// Component type name.
    pub type_name: String,
    /// Implementation type name, when declared.
    pub impl_name: Option<String>,
    /// Lifetime label (`"singleton"` / `"transient"`).
    pub lifetime: String,
    /// Registration name; empty for unnamed slots.
    pub name: String,
    /// Whether the registration lives in a collection slot.
    pub is_collection: bool,
}

/// An edge in the dependency graph: a declared dependency.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "graph-export", derive(Serialize, Deserialize))]
pub struct GraphEdge {
    /// Consuming node id.
    pub from: String,
    /// Consumed component type name.
    pub to: String,
    /// Shape label (`"singleton"`, `"transient"`, `"collection"`,
    /// `"transient collection"`).
    pub shape: String,
}

/// Node/edge view over a registry's registrations.
///
/// # Examples
///
/// ```rust
/// use rivet_di::{Registry, Binding, Dependency, Lifetime};
/// use rivet_di::graph_export::DependencyGraph;
/// use std::sync::Arc;
///
/// struct Db;
/// struct Repo;
///
/// let mut registry = Registry::new();
/// registry.add_singleton::<Db, _>(|_| Ok(Arc::new(Db)))?;
/// registry.add_single::<Repo, _>(
///     Lifetime::Singleton,
///     Binding::new().depends_on([Dependency::singleton::<Db>()]),
///     |r| {
///         let _ = r.get::<Db>()?;
///         Ok(Arc::new(Repo))
///     },
/// )?;
///
/// let graph = DependencyGraph::from_registry(&registry);
/// assert_eq!(graph.nodes.len(), 2);
/// assert_eq!(graph.edges.len(), 1);
/// assert!(graph.to_dot().contains("->"));
/// # Ok::<(), rivet_di::DiError>(())
/// ```
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "graph-export", derive(Serialize, Deserialize))]
pub struct DependencyGraph {
    /// All registration nodes, in registration order.
    pub nodes: Vec<GraphNode>,
    /// All declared dependency edges.
    pub edges: Vec<GraphEdge>,
}

impl DependencyGraph {
    /// Build the graph from a registry's pre-build descriptors.
    pub fn from_registry(registry: &Registry) -> Self {
        let mut nodes = Vec::new();
        let mut edges = Vec::new();

        for (i, desc) in registry.descriptors().iter().enumerate() {
            let id = format!("n{i}");
            nodes.push(GraphNode {
                id: id.clone(),
                type_name: desc.component().name().to_string(),
                impl_name: desc.impl_type().map(|t| t.name().to_string()),
                lifetime: desc.lifetime().label().to_string(),
                name: desc.name().to_string(),
                is_collection: desc.is_collection(),
            });
            for dep in desc.dependencies() {
                let shape = match (dep.is_collection(), dep.is_transient()) {
                    (false, false) => "singleton",
                    (false, true) => "transient",
                    (true, false) => "collection",
                    (true, true) => "transient collection",
                };
                edges.push(GraphEdge {
                    from: id.clone(),
                    to: dep.component().name().to_string(),
                    shape: shape.to_string(),
                });
            }
        }

        Self { nodes, edges }
    }

    /// Render as a Graphviz `digraph`.
    pub fn to_dot(&self) -> String {
        // Map type names to node ids so edges can point at providers.
        let mut by_type: BTreeMap<&str, &str> = BTreeMap::new();
        for node in &self.nodes {
            by_type.entry(&node.type_name).or_insert(&node.id);
        }

        let mut out = String::from("digraph dependencies {\n");
        for node in &self.nodes {
            let mut label = node.type_name.clone();
            if let Some(impl_name) = &node.impl_name {
                let _ = write!(label, "\\n[{impl_name}]");
            }
            let _ = write!(label, "\\n({})", node.lifetime);
            let _ = writeln!(out, "    {} [label=\"{}\"];", node.id, label);
        }
        for edge in &self.edges {
            match by_type.get(edge.to.as_str()) {
                Some(to_id) => {
                    let _ = writeln!(
                        out,
                        "    {} -> {} [label=\"{}\"];",
                        edge.from, to_id, edge.shape
                    );
                }
                None => {
                    // Dangling dependency: point at a labeled placeholder.
                    let _ = writeln!(
                        out,
                        "    {} -> \"{}\" [label=\"{}\", style=dashed];",
                        edge.from, edge.to, edge.shape
                    );
                }
            }
        }
        out.push_str("}\n");
        out
    }
}
