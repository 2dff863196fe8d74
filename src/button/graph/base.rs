// Copyright (c) 2018 Jason White
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
// THE SOFTWARE.
use std::collections::HashMap;
use std::hash::Hash;
use std::slice;

use holyhashmap::{self, HolyHashMap};

use super::index::{EdgeIndex, NodeIndex};
use super::traits::{Edges, GraphBase, Indexable, Neighbors, Nodes, Visitable};

pub trait NodeTrait: Eq + Hash {}
impl<N> NodeTrait for N where N: Eq + Hash {}

#[derive(Serialize, Deserialize, Default, Debug, Clone, Eq, PartialEq, Hash)]
struct NodeNeighbors {
    incoming: Vec<(NodeIndex, EdgeIndex)>,
    outgoing: Vec<(NodeIndex, EdgeIndex)>,
}

/// A directed graph over stable node and edge indices.
///
/// Nodes and edges live in append-only bimaps (`HolyHashMap`): an index
/// handed out to a caller keeps pointing at the same logical entry even
/// after other entries are removed, which is what lets `StateStore` and
/// `Graph` hand the same `NodeIndex` back and forth across a read
/// transaction without fear of it silently meaning something else.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq)]
pub struct Graph<N, E>
where
    N: NodeTrait,
{
    nodes: HolyHashMap<N, NodeNeighbors>,
    edges: HolyHashMap<(NodeIndex, NodeIndex), E>,
}

impl<N, E> GraphBase for Graph<N, E>
where
    N: NodeTrait,
{
    type Node = N;
    type Edge = E;

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

impl<'a, N, E> Indexable<'a> for Graph<N, E>
where
    N: NodeTrait + 'a,
{
    fn node_from_index(&'a self, index: NodeIndex) -> &'a Self::Node {
        self.nodes.from_index(index.into()).unwrap().0
    }

    fn node_to_index(&self, node: &Self::Node) -> Option<NodeIndex> {
        self.nodes.to_index(node).map(NodeIndex::from)
    }

    fn edge_from_index(
        &'a self,
        index: EdgeIndex,
    ) -> ((NodeIndex, NodeIndex), &'a Self::Edge) {
        let (edge, weight) = self.edges.from_index(index.into()).unwrap();
        (*edge, weight)
    }

    fn edge_to_index(
        &self,
        edge: &(NodeIndex, NodeIndex),
    ) -> Option<EdgeIndex> {
        self.edges.to_index(edge).map(EdgeIndex::from)
    }
}

impl<'a, N, E> Nodes<'a> for Graph<N, E>
where
    N: NodeTrait + 'a,
{
    type Iter = NodesIter<'a, N>;

    fn nodes(&'a self) -> Self::Iter {
        NodesIter {
            iter: self.nodes.indices(),
        }
    }
}

pub struct NodesIter<'a, N: 'a> {
    iter: holyhashmap::Indices<'a, N, NodeNeighbors>,
}

impl<'a, N> Iterator for NodesIter<'a, N> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(NodeIndex::from)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl<'a, N, E> Edges<'a> for Graph<N, E>
where
    N: NodeTrait,
    E: 'a,
{
    type Iter = EdgesIter<'a, E>;

    fn edges(&'a self) -> Self::Iter {
        EdgesIter {
            iter: self.edges.indices(),
        }
    }
}

impl<'a, N, E> Neighbors<'a> for Graph<N, E>
where
    N: NodeTrait,
{
    type Neighbors = NeighborsIter<'a>;

    fn incoming(&'a self, node: NodeIndex) -> Self::Neighbors {
        NeighborsIter {
            iter: self
                .nodes
                .from_index(node.into())
                .unwrap()
                .1
                .incoming
                .iter(),
        }
    }

    fn outgoing(&'a self, node: NodeIndex) -> Self::Neighbors {
        NeighborsIter {
            iter: self
                .nodes
                .from_index(node.into())
                .unwrap()
                .1
                .outgoing
                .iter(),
        }
    }
}

impl<N, E, T> Visitable<T> for Graph<N, E>
where
    N: NodeTrait,
{
    type Map = HashMap<NodeIndex, T>;

    fn visit_map(&self) -> Self::Map {
        HashMap::with_capacity(self.node_count())
    }
}

impl<N, E> Graph<N, E>
where
    N: NodeTrait,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Graph {
            nodes: HolyHashMap::with_capacity(nodes),
            edges: HolyHashMap::with_capacity(edges),
        }
    }

    /// Adds a node to the graph, returning its stable index. Adding an
    /// equal node twice returns the same index both times.
    pub fn add_node(&mut self, n: N) -> NodeIndex {
        let entry = self.nodes.entry(n);
        let index = entry.index();
        entry.or_default();
        index.into()
    }

    /// Adds an edge between two existing nodes. Adding an edge between the
    /// same pair twice replaces the edge weight without duplicating the
    /// adjacency-list entry, matching V3 (at most one edge per type
    /// between any two vertices — here, per pair, since this graph's edge
    /// weight already carries the type and is the single source of truth
    /// for it).
    pub fn add_edge(
        &mut self,
        a: NodeIndex,
        b: NodeIndex,
        weight: E,
    ) -> EdgeIndex {
        let (edge, old) = self.edges.insert_full((a, b), weight);

        let edge: EdgeIndex = edge.into();

        if old.is_none() {
            if let Some((_, v)) = self.nodes.from_index_mut(a.into()) {
                v.outgoing.push((b, edge));
            }

            if a != b {
                if let Some((_, v)) = self.nodes.from_index_mut(b.into()) {
                    v.incoming.push((a, edge));
                }
            }
        }

        edge
    }

    /// Removes an edge by index, fixing up both endpoints' adjacency
    /// lists. Returns the edge's weight if it existed.
    pub fn remove_edge(&mut self, edge: EdgeIndex) -> Option<E> {
        let (ends, weight) = self.edges.remove_index(edge.into())?;
        let (a, b) = ends;

        if let Some((_, v)) = self.nodes.from_index_mut(a.into()) {
            v.outgoing.retain(|(_, e)| *e != edge);
        }
        if let Some((_, v)) = self.nodes.from_index_mut(b.into()) {
            v.incoming.retain(|(_, e)| *e != edge);
        }

        Some(weight)
    }

    /// Removes a node and, per V2, cascades to all of its incident
    /// edges. Returns the node's value if it existed.
    pub fn remove_node(&mut self, index: NodeIndex) -> Option<N> {
        let (node, neighbors) = self.nodes.remove_index(index.into())?;

        let incident: Vec<(NodeIndex, EdgeIndex)> = neighbors
            .incoming
            .into_iter()
            .chain(neighbors.outgoing.into_iter())
            .collect();

        for (other, edge) in incident {
            self.edges.remove_index(edge.into());

            if let Some((_, v)) = self.nodes.from_index_mut(other.into()) {
                v.incoming.retain(|(_, e)| *e != edge);
                v.outgoing.retain(|(_, e)| *e != edge);
            }
        }

        Some(node)
    }

    /// Given an index in this graph, finds the equal node's index in
    /// `other`, if present. Used to remap indices across a graph rebuild
    /// (e.g., when `Syncer` constructs a fresh graph from updated rules).
    pub fn translate_index(
        &self,
        index: NodeIndex,
        other: &Graph<N, E>,
    ) -> Option<NodeIndex> {
        other.node_to_index(self.node_from_index(index))
    }
}

impl<N, E> Default for Graph<N, E>
where
    N: NodeTrait,
{
    fn default() -> Self {
        Graph::with_capacity(0, 0)
    }
}

pub struct EdgesIter<'a, E>
where
    E: 'a,
{
    iter: holyhashmap::Indices<'a, (NodeIndex, NodeIndex), E>,
}

impl<'a, E> Iterator for EdgesIter<'a, E>
where
    E: 'a,
{
    type Item = EdgeIndex;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(EdgeIndex::from)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

pub struct NeighborsIter<'a> {
    iter: slice::Iter<'a, (NodeIndex, EdgeIndex)>,
}

impl<'a> Iterator for NeighborsIter<'a> {
    type Item = (NodeIndex, EdgeIndex);

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().cloned()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::traits::Algo;

    #[test]
    fn add_node_is_idempotent_by_value() {
        let mut g = Graph::new();
        let a = g.add_node("a");
        let b = g.add_node("b");
        assert_eq!(a, 0.into());
        assert_eq!(b, 1.into());
        assert_eq!(g.node_count(), 2);

        let a2 = g.add_node("a");
        assert_eq!(a, a2);
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn add_edge_replaces_weight_without_duplicating_adjacency() {
        let mut g = Graph::new();
        let a = g.add_node("a");
        let b = g.add_node("b");

        g.add_edge(a, b, 42);
        g.add_edge(a, b, 1);

        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn remove_node_cascades_to_incident_edges() {
        let mut g = Graph::new();
        let a = g.add_node("a");
        let b = g.add_node("b");
        let c = g.add_node("c");

        g.add_edge(a, b, ());
        g.add_edge(b, c, ());
        assert_eq!(g.edge_count(), 2);

        g.remove_node(b);
        assert_eq!(g.edge_count(), 0);
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn tarjan_finds_wikipedias_four_components() {
        //  O ← 1 ← 2 ⇄ 3
        //  ↓ ↗ ↑   ↑   ↑
        //  4 ← 5 ⇄ 6 ← 7
        //              ↺
        let mut graph = Graph::new();

        let a = graph.add_node("a");
        let b = graph.add_node("b");
        let c = graph.add_node("c");
        let d = graph.add_node("d");
        let e = graph.add_node("e");
        let f = graph.add_node("f");
        let g_ = graph.add_node("g");
        let h = graph.add_node("h");

        graph.add_edge(a, e, ());
        graph.add_edge(b, a, ());
        graph.add_edge(c, b, ());
        graph.add_edge(c, d, ());
        graph.add_edge(d, c, ());
        graph.add_edge(e, b, ());
        graph.add_edge(f, b, ());
        graph.add_edge(f, e, ());
        graph.add_edge(f, g_, ());
        graph.add_edge(g_, c, ());
        graph.add_edge(g_, f, ());
        graph.add_edge(h, d, ());
        graph.add_edge(h, g_, ());
        graph.add_edge(h, h, ());

        let sccs = graph.tarjan_scc();
        assert_eq!(sccs.len(), 4);

        assert_eq!(sccs[0], vec![1.into(), 4.into(), 0.into()]);
        assert_eq!(sccs[1], vec![3.into(), 2.into()]);
        assert_eq!(sccs[2], vec![6.into(), 5.into()]);
        assert_eq!(sccs[3], vec![7.into()]);
    }
}
