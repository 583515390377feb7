//! # Diagnostics
//!
//! Structural snapshot of a world, including the archetype graph as
//! Graphviz DOT text:
//!
//! ```text
//! strict digraph "archetypes" {
//!   Empty -> "[Position]" [label="Position"];
//!   "[Position]" -> "[Position, Velocity]" [label="Velocity"];
//!   "[Position, Velocity]" -> "[Position]";
//! }
//! ```
//!
//! Add edges carry the added component as label; remove edges are bare.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

use super::archetype::{Archetype, ArchetypeId};
use super::component::ComponentId;
use super::world::World;

/// Snapshot returned by [`World::diagnostics`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostics {
    /// Components seen by the world, in first-seen order.
    pub registered_components: Vec<ComponentId>,
    /// Live entities.
    pub entity_count: usize,
    /// Archetypes, including the empty one and emptied ones.
    pub archetype_count: usize,
    /// The archetype graph in DOT format.
    pub archetype_graph: String,
}

impl Diagnostics {
    pub(crate) fn collect(world: &World) -> Self {
        let registered_components: Vec<ComponentId> = world.components().iter().copied().collect();
        let names = component_names(&registered_components);
        let archetype_graph = export_graph(world.archetypes(), &names, &world.config().graph_name);

        Self {
            registered_components,
            entity_count: world.entity_count(),
            archetype_count: world.archetypes().len(),
            archetype_graph,
        }
    }
}

/// Display names for the graph. Unnamed components are numbered in
/// first-seen order.
fn component_names(components: &[ComponentId]) -> HashMap<ComponentId, String> {
    let mut names: HashMap<ComponentId, String> = HashMap::with_capacity(components.len());
    let mut seen: HashSet<String> = HashSet::with_capacity(components.len());
    let mut unnamed = 0usize;

    for &id in components {
        let name = if let Some(name) = id.name() {
            name.to_string()
        } else {
            let name = format!("<unnamed-{unnamed:02}>");
            unnamed += 1;
            name
        };
        if !seen.insert(name.clone()) {
            tracing::warn!(%name, "duplicate component name in archetype graph");
        }
        names.insert(id, name);
    }
    names
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

fn archetype_label(archetype: &Archetype, names: &HashMap<ComponentId, String>) -> String {
    if archetype.signature().is_empty() {
        return "Empty".to_owned();
    }
    let list: Vec<String> = archetype
        .signature()
        .iter()
        .map(|id| names.get(id).map_or_else(|| id.to_string(), |name| escape(name)))
        .collect();
    format!("\"[{}]\"", list.join(", "))
}

fn export_graph(
    archetypes: &[Archetype],
    names: &HashMap<ComponentId, String>,
    graph_name: &str,
) -> String {
    let labels: Vec<String> = archetypes
        .iter()
        .map(|archetype| archetype_label(archetype, names))
        .collect();

    let mut lines = Vec::new();
    let mut visited = vec![false; archetypes.len()];

    // Everything reachable by adding components, then whatever only a
    // removal led to.
    traverse(ArchetypeId::ROOT, archetypes, &mut visited, &mut |from, to, component| {
        lines.push(edge_line(&labels, from, to, component, names));
    });
    for index in 0..archetypes.len() {
        if !visited[index] {
            traverse(
                ArchetypeId::from_index(index),
                archetypes,
                &mut visited,
                &mut |from, to, component| {
                    lines.push(edge_line(&labels, from, to, component, names));
                },
            );
        }
    }

    let mut out = String::new();
    let _ = writeln!(out, "strict digraph \"{}\" {{", escape(graph_name));
    let _ = writeln!(out, "  graph [concentrate=true]");
    let _ = writeln!(
        out,
        "  node [shape=box margin=0.1 fontsize=8 width=0.1 height=0.1]"
    );
    let _ = writeln!(out, "  edge [fontsize=8]");
    let _ = writeln!(out);
    for (archetype, label) in archetypes.iter().zip(&labels) {
        if archetype.edges().all(|(_, edge)| edge.add.is_none() && edge.remove.is_none()) {
            let _ = writeln!(out, "  {label};");
        }
    }
    for line in lines {
        let _ = writeln!(out, "  {line}");
    }
    out.push('}');
    out.push('\n');
    out
}

fn edge_line(
    labels: &[String],
    from: ArchetypeId,
    to: ArchetypeId,
    component: Option<ComponentId>,
    names: &HashMap<ComponentId, String>,
) -> String {
    let (from, to) = (&labels[from.index()], &labels[to.index()]);
    match component {
        Some(id) => {
            let name = names.get(&id).map_or_else(|| id.to_string(), |name| escape(name));
            format!("{from} -> {to} [label=\"{name}\"];")
        }
        None => format!("{from} -> {to};"),
    }
}

/// Depth-first walk over add edges. Reports every edge of every visited
/// archetype once; add edges carry their component.
fn traverse(
    start: ArchetypeId,
    archetypes: &[Archetype],
    visited: &mut [bool],
    visit: &mut dyn FnMut(ArchetypeId, ArchetypeId, Option<ComponentId>),
) {
    if std::mem::replace(&mut visited[start.index()], true) {
        return;
    }
    for (component, edge) in archetypes[start.index()].edges() {
        if let Some(target) = edge.remove {
            visit(start, target, None);
        }
        if let Some(target) = edge.add {
            visit(start, target, Some(component));
            traverse(target, archetypes, visited, visit);
        }
    }
}
