//! The dependency graph store.
//!
//! A [`DependencyGraph`] maps each [`CanonicalKey`] to a [`GraphNode`] that
//! holds the object's display data and two adjacency sets. Edges are only
//! ever added through [`DependencyGraph::add_data_flow_edge`],
//! [`DependencyGraph::add_write_edge`] and [`DependencyGraph::add_call_edge`],
//! which update both endpoints together. That keeps three properties true by
//! construction:
//!
//! - No node lists itself as a neighbor
//! - `b` is in `a.out_nodes` exactly when `a` is in `b.in_nodes`
//! - Adding an edge twice changes nothing
//!
//! Edge direction follows data: a table points at the routines that read it,
//! a routine points at the tables it writes and the routines it executes.
//!
//! Serialized, the graph is a JSON object keyed by canonical key whose values
//! carry `name`, `kind`, `catalog`, `inNodes` and `outNodes`.

mod analysis;

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::catalog::ObjectCatalog;
use crate::resolver::CanonicalKey;
use crate::types::{EdgeKind, ObjectKind};

/// One vertex of the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    /// Object name without schema or catalog
    pub name: String,
    /// Object kind
    pub kind: ObjectKind,
    /// Owning catalog
    pub catalog: String,
    /// Objects that supply data to, write to, or call this one
    pub in_nodes: BTreeSet<CanonicalKey>,
    /// Objects this one supplies data to, writes to, or calls
    pub out_nodes: BTreeSet<CanonicalKey>,
    #[serde(skip)]
    edge_kinds: BTreeMap<CanonicalKey, BTreeSet<EdgeKind>>,
}

impl GraphNode {
    fn new(name: &str, kind: ObjectKind, catalog: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            catalog: catalog.to_string(),
            in_nodes: BTreeSet::new(),
            out_nodes: BTreeSet::new(),
            edge_kinds: BTreeMap::new(),
        }
    }

    /// Why this node points at `target`; empty if it does not.
    pub fn edge_kinds_to(&self, target: &CanonicalKey) -> impl Iterator<Item = EdgeKind> + '_ {
        self.edge_kinds.get(target).into_iter().flatten().copied()
    }

    fn points_at_with(&self, target: &CanonicalKey, kind: EdgeKind) -> bool {
        self.edge_kinds
            .get(target)
            .is_some_and(|kinds| kinds.contains(&kind))
    }
}

/// Result of an edge operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeOutcome {
    /// The edge is new
    Added,
    /// The edge already existed
    AlreadyPresent,
    /// Both endpoints are the same key; nothing recorded
    SelfLoop,
    /// This endpoint has no node; nothing recorded
    MissingEndpoint(CanonicalKey),
    /// A write edge pointed at something other than a table; nothing recorded
    NotATable(ObjectKind),
}

impl EdgeOutcome {
    /// Returns `true` if the graph now contains the edge.
    #[must_use]
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Added | Self::AlreadyPresent)
    }
}

/// A broken graph invariant, as found by
/// [`DependencyGraph::consistency_violations`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyViolation {
    /// A node lists itself as a neighbor
    SelfLoop(CanonicalKey),
    /// Only one side of an edge records it
    HalfEdge {
        /// Edge source
        from: CanonicalKey,
        /// Edge target
        to: CanonicalKey,
    },
    /// An adjacency set names a key with no node
    DanglingEdge {
        /// Edge source
        from: CanonicalKey,
        /// Edge target
        to: CanonicalKey,
    },
}

impl std::fmt::Display for ConsistencyViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SelfLoop(key) => write!(f, "{key} points at itself"),
            Self::HalfEdge { from, to } => write!(f, "{from} -> {to} is recorded on one side only"),
            Self::DanglingEdge { from, to } => write!(f, "{from} -> {to} names a missing node"),
        }
    }
}

/// Directed dependency graph keyed by canonical identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DependencyGraph {
    nodes: BTreeMap<CanonicalKey, GraphNode>,
}

impl DependencyGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a graph with one node per cataloged object and no edges.
    #[must_use]
    pub fn from_catalog(catalog: &ObjectCatalog) -> Self {
        let mut graph = Self::new();
        for (key, object) in catalog.iter() {
            graph.ensure_node(key, &object.name, object.kind, &object.catalog);
        }
        graph
    }

    /// Create the node for `key` if it does not exist.
    ///
    /// Returns `true` if a node was created.
    pub fn ensure_node(
        &mut self,
        key: &CanonicalKey,
        name: &str,
        kind: ObjectKind,
        catalog: &str,
    ) -> bool {
        match self.nodes.entry(key.clone()) {
            Entry::Vacant(entry) => {
                entry.insert(GraphNode::new(name, kind, catalog));
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Record that `source`'s data is read by `consumer`.
    pub fn add_data_flow_edge(
        &mut self,
        source: &CanonicalKey,
        consumer: &CanonicalKey,
    ) -> EdgeOutcome {
        self.insert_edge(source, consumer, EdgeKind::DataFlow)
    }

    /// Record that `modifier` writes to the table `target`.
    pub fn add_write_edge(&mut self, modifier: &CanonicalKey, target: &CanonicalKey) -> EdgeOutcome {
        if modifier != target
            && let Some(node) = self.nodes.get(target)
            && node.kind != ObjectKind::Table
        {
            return EdgeOutcome::NotATable(node.kind);
        }
        self.insert_edge(modifier, target, EdgeKind::Write)
    }

    /// Record that `caller` executes `callee`.
    pub fn add_call_edge(&mut self, caller: &CanonicalKey, callee: &CanonicalKey) -> EdgeOutcome {
        self.insert_edge(caller, callee, EdgeKind::Call)
    }

    fn insert_edge(&mut self, from: &CanonicalKey, to: &CanonicalKey, kind: EdgeKind) -> EdgeOutcome {
        if from == to {
            return EdgeOutcome::SelfLoop;
        }
        for key in [from, to] {
            if !self.nodes.contains_key(key) {
                return EdgeOutcome::MissingEndpoint(key.clone());
            }
        }

        let mut added = false;
        if let Some(node) = self.nodes.get_mut(from) {
            added = node.out_nodes.insert(to.clone());
            node.edge_kinds.entry(to.clone()).or_default().insert(kind);
        }
        if let Some(node) = self.nodes.get_mut(to) {
            node.in_nodes.insert(from.clone());
        }

        if added {
            EdgeOutcome::Added
        } else {
            EdgeOutcome::AlreadyPresent
        }
    }

    /// The node for `key`.
    #[must_use]
    pub fn node(&self, key: &CanonicalKey) -> Option<&GraphNode> {
        self.nodes.get(key)
    }

    /// All nodes, ordered by key.
    pub fn nodes(&self) -> impl Iterator<Item = (&CanonicalKey, &GraphNode)> {
        self.nodes.iter()
    }

    /// Returns `true` if `from` points at `to`.
    #[must_use]
    pub fn contains_edge(&self, from: &CanonicalKey, to: &CanonicalKey) -> bool {
        self.nodes
            .get(from)
            .is_some_and(|node| node.out_nodes.contains(to))
    }

    /// Returns `true` if `from` points at `to` for the given reason.
    #[must_use]
    pub fn contains_edge_of_kind(
        &self,
        from: &CanonicalKey,
        to: &CanonicalKey,
        kind: EdgeKind,
    ) -> bool {
        self.nodes
            .get(from)
            .is_some_and(|node| node.points_at_with(to, kind))
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of distinct directed edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|node| node.out_nodes.len()).sum()
    }

    /// Union `other` into this graph.
    ///
    /// Nodes are unioned by key and adjacency sets are unioned per node. When
    /// both graphs hold a node with different display data, the smaller
    /// `(kind, catalog, name)` is kept so the result does not depend on merge
    /// order. Keys that differ only in case are spelled with the smallest
    /// display string everywhere they appear, node keys and adjacency sets
    /// alike.
    pub fn merge(&mut self, other: DependencyGraph) {
        let mut spelling = self.spellings();
        for key in other.spellings().into_values() {
            prefer_spelling(&mut spelling, key);
        }

        for (key, incoming) in other.nodes {
            match self.nodes.entry(key) {
                Entry::Vacant(entry) => {
                    entry.insert(incoming);
                }
                Entry::Occupied(mut entry) => {
                    let existing = entry.get_mut();
                    let replace_display = (incoming.kind, &incoming.catalog, &incoming.name)
                        < (existing.kind, &existing.catalog, &existing.name);
                    if replace_display {
                        existing.kind = incoming.kind;
                        existing.catalog = incoming.catalog;
                        existing.name = incoming.name;
                    }
                    existing.in_nodes.extend(incoming.in_nodes);
                    existing.out_nodes.extend(incoming.out_nodes);
                    for (target, kinds) in incoming.edge_kinds {
                        existing.edge_kinds.entry(target).or_default().extend(kinds);
                    }
                }
            }
        }

        let respell = |key: CanonicalKey| spelling.get(&key).cloned().unwrap_or(key);
        self.nodes = std::mem::take(&mut self.nodes)
            .into_iter()
            .map(|(key, node)| {
                let node = GraphNode {
                    in_nodes: node.in_nodes.into_iter().map(respell).collect(),
                    out_nodes: node.out_nodes.into_iter().map(respell).collect(),
                    edge_kinds: node
                        .edge_kinds
                        .into_iter()
                        .map(|(target, kinds)| (respell(target), kinds))
                        .collect(),
                    ..node
                };
                (respell(key), node)
            })
            .collect();
    }

    /// Smallest display spelling of every key this graph mentions.
    fn spellings(&self) -> BTreeMap<CanonicalKey, CanonicalKey> {
        let mut spelling = BTreeMap::new();
        for (key, node) in &self.nodes {
            prefer_spelling(&mut spelling, key.clone());
            for neighbor in node.in_nodes.iter().chain(&node.out_nodes) {
                prefer_spelling(&mut spelling, neighbor.clone());
            }
        }
        spelling
    }

    /// Every self-loop, half-recorded edge and dangling edge in the graph.
    ///
    /// Always empty for graphs built through the edge operations.
    #[must_use]
    pub fn consistency_violations(&self) -> Vec<ConsistencyViolation> {
        let mut violations = Vec::new();
        for (key, node) in &self.nodes {
            if node.in_nodes.contains(key) || node.out_nodes.contains(key) {
                violations.push(ConsistencyViolation::SelfLoop(key.clone()));
            }
            for to in &node.out_nodes {
                match self.nodes.get(to) {
                    None => violations.push(ConsistencyViolation::DanglingEdge {
                        from: key.clone(),
                        to: to.clone(),
                    }),
                    Some(target) if !target.in_nodes.contains(key) => {
                        violations.push(ConsistencyViolation::HalfEdge {
                            from: key.clone(),
                            to: to.clone(),
                        });
                    }
                    Some(_) => {}
                }
            }
            for from in &node.in_nodes {
                match self.nodes.get(from) {
                    None => violations.push(ConsistencyViolation::DanglingEdge {
                        from: from.clone(),
                        to: key.clone(),
                    }),
                    Some(source) if !source.out_nodes.contains(key) => {
                        violations.push(ConsistencyViolation::HalfEdge {
                            from: from.clone(),
                            to: key.clone(),
                        });
                    }
                    Some(_) => {}
                }
            }
        }
        violations
    }
}

fn prefer_spelling(spelling: &mut BTreeMap<CanonicalKey, CanonicalKey>, key: CanonicalKey) {
    match spelling.entry(key.clone()) {
        Entry::Vacant(entry) => {
            entry.insert(key);
        }
        Entry::Occupied(mut entry) => {
            if key.as_str() < entry.get().as_str() {
                entry.insert(key);
            }
        }
    }
}
