//! Petgraph operations over a finished dependency graph.
//!
//! | Operation | Algorithm |
//! |-----------|-----------|
//! | Cycle detection | Tarjan's SCC algorithm |
//! | Impact analysis | BFS along outgoing edges |
//! | Table / routine usage | Direct neighbors, split by edge kind |
//! | DOT export | `petgraph::dot` |

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use petgraph::dot::Dot;
use petgraph::graph::{DiGraph, NodeIndex};

use super::DependencyGraph;
use crate::resolver::CanonicalKey;
use crate::types::{Cycle, EdgeKind, Impact, ImpactEntry, RoutineUsage, TableUsage};

/// The store projected into a petgraph `DiGraph`, one edge per key pair.
struct Projection<'g> {
    graph: DiGraph<&'g CanonicalKey, EdgeKind>,
    index: HashMap<&'g CanonicalKey, NodeIndex>,
}

impl DependencyGraph {
    fn project(&self) -> Projection<'_> {
        let mut graph = DiGraph::with_capacity(self.nodes.len(), self.edge_count());
        let mut index = HashMap::with_capacity(self.nodes.len());
        for key in self.nodes.keys() {
            index.insert(key, graph.add_node(key));
        }
        for (from, node) in &self.nodes {
            for to in &node.out_nodes {
                if let (Some(&a), Some(&b)) = (index.get(from), index.get(to)) {
                    let kind = node.edge_kinds_to(to).next().unwrap_or(EdgeKind::DataFlow);
                    graph.add_edge(a, b, kind);
                }
            }
        }
        Projection { graph, index }
    }

    /// Groups of objects that depend on each other in a loop.
    ///
    /// Each cycle's members are sorted; cycles are ordered by first member.
    #[must_use]
    pub fn find_cycles(&self) -> Vec<Cycle> {
        let projection = self.project();
        let mut cycles: Vec<Cycle> = tarjan_scc(&projection.graph)
            .into_iter()
            .filter(|component| component.len() > 1)
            .map(|component| {
                let mut members: Vec<CanonicalKey> = component
                    .into_iter()
                    .map(|ix| projection.graph[ix].clone())
                    .collect();
                members.sort();
                Cycle { members }
            })
            .collect();
        cycles.sort_by(|a, b| a.members.cmp(&b.members));
        cycles
    }

    /// Everything downstream of `key`: readers of its data, tables it writes
    /// and routines it calls, transitively.
    ///
    /// `max_depth` bounds the number of edges followed. Returns `None` if
    /// `key` has no node.
    #[must_use]
    pub fn impact(&self, key: &CanonicalKey, max_depth: Option<usize>) -> Option<Impact> {
        let projection = self.project();
        let (target, &start) = projection.index.get_key_value(key)?;

        let mut reached = Vec::new();
        let mut visited = HashSet::from([start]);
        let mut queue: VecDeque<(NodeIndex, usize)> = VecDeque::from([(start, 0)]);

        while let Some((current, depth)) = queue.pop_front() {
            if max_depth.is_some_and(|max| depth >= max) {
                continue;
            }
            for next in projection.graph.neighbors_directed(current, Direction::Outgoing) {
                if visited.insert(next) {
                    queue.push_back((next, depth + 1));
                    reached.push((next, depth + 1));
                }
            }
        }

        let mut direct = Vec::new();
        let mut transitive = Vec::new();
        for (ix, depth) in reached {
            let key = projection.graph[ix];
            let Some(node) = self.nodes.get(key) else {
                continue;
            };
            let entry = ImpactEntry {
                key: key.clone(),
                kind: node.kind,
                depth,
            };
            if depth == 1 {
                direct.push(entry);
            } else {
                transitive.push(entry);
            }
        }
        direct.sort_by(|a, b| a.key.cmp(&b.key));
        transitive.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.key.cmp(&b.key)));

        Some(Impact {
            target: (*target).clone(),
            direct,
            transitive,
        })
    }

    /// Readers and writers of a table or view.
    ///
    /// Returns `None` if `key` has no node or names a procedure or function.
    #[must_use]
    pub fn table_usage(&self, key: &CanonicalKey) -> Option<TableUsage> {
        let (table, node) = self.nodes.get_key_value(key)?;
        if !node.kind.is_relation() {
            return None;
        }
        Some(TableUsage {
            table: table.clone(),
            readers: self.outgoing_of_kind(table, EdgeKind::DataFlow),
            writers: self.incoming_of_kind(table, EdgeKind::Write),
        })
    }

    /// Calls, callers, reads, writes and readers of a procedure, function or
    /// view.
    ///
    /// Returns `None` if `key` has no node or names a table.
    #[must_use]
    pub fn routine_usage(&self, key: &CanonicalKey) -> Option<RoutineUsage> {
        let (routine, node) = self.nodes.get_key_value(key)?;
        if !node.kind.has_body() {
            return None;
        }
        Some(RoutineUsage {
            routine: routine.clone(),
            calls: self.outgoing_of_kind(routine, EdgeKind::Call),
            called_by: self.incoming_of_kind(routine, EdgeKind::Call),
            reads: self.incoming_of_kind(routine, EdgeKind::DataFlow),
            writes: self.outgoing_of_kind(routine, EdgeKind::Write),
            read_by: self.outgoing_of_kind(routine, EdgeKind::DataFlow),
        })
    }

    fn outgoing_of_kind(&self, from: &CanonicalKey, kind: EdgeKind) -> Vec<CanonicalKey> {
        self.nodes.get(from).map_or_else(Vec::new, |node| {
            node.out_nodes
                .iter()
                .filter(|to| node.points_at_with(to, kind))
                .cloned()
                .collect()
        })
    }

    fn incoming_of_kind(&self, to: &CanonicalKey, kind: EdgeKind) -> Vec<CanonicalKey> {
        self.nodes.get(to).map_or_else(Vec::new, |node| {
            node.in_nodes
                .iter()
                .filter(|from| {
                    self.nodes
                        .get(*from)
                        .is_some_and(|source| source.points_at_with(to, kind))
                })
                .cloned()
                .collect()
        })
    }

    /// Render the graph in Graphviz DOT format, edges labeled by kind.
    #[must_use]
    pub fn to_dot(&self) -> String {
        let projection = self.project();
        format!("{}", Dot::new(&projection.graph))
    }
}
