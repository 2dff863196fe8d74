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

use super::index::{EdgeIndex, IndexSet, NodeIndex};
use super::traits::{Algo, Edges, GraphBase, Indexable, Neighbors, Nodes, Visitable};

/// The induced subgraph reachable from a set of roots, following forward
/// edges only. This is how the executor restricts a full-build
/// traversal down to just the pending vertices and whatever they can
/// reach (`graph.subgraph(roots)` in the design, §4.2).
pub struct Subgraph<'a, G: ?Sized> {
    graph: &'a G,
    nodes: IndexSet<NodeIndex>,
    edges: IndexSet<EdgeIndex>,
}

impl<'a, G> Subgraph<'a, G>
where
    G: Algo<'a>,
{
    pub fn new<I>(graph: &'a G, roots: I) -> Self
    where
        I: IntoIterator<Item = NodeIndex>,
    {
        let nodes: IndexSet<NodeIndex> =
            graph.dfs(roots.into_iter()).into_iter().collect();

        let mut edges = IndexSet::new();
        for e in graph.edges() {
            let (from, to) = graph.edge_from_index(e).0;
            if nodes.contains(&from) && nodes.contains(&to) {
                edges.insert(e);
            }
        }

        Subgraph { graph, nodes, edges }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl<'a, G> GraphBase for Subgraph<'a, G>
where
    G: Algo<'a>,
{
    type Node = G::Node;
    type Edge = G::Edge;

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

impl<'a, G> Indexable<'a> for Subgraph<'a, G>
where
    G: Algo<'a>,
{
    fn node_from_index(&'a self, index: NodeIndex) -> &'a Self::Node {
        self.graph.node_from_index(index)
    }

    fn node_to_index(&self, node: &Self::Node) -> Option<NodeIndex> {
        self.graph
            .node_to_index(node)
            .filter(|i| self.nodes.contains(i))
    }

    fn edge_from_index(
        &'a self,
        index: EdgeIndex,
    ) -> ((NodeIndex, NodeIndex), &'a Self::Edge) {
        self.graph.edge_from_index(index)
    }

    fn edge_to_index(
        &self,
        edge: &(NodeIndex, NodeIndex),
    ) -> Option<EdgeIndex> {
        self.graph
            .edge_to_index(edge)
            .filter(|i| self.edges.contains(i))
    }
}

impl<'a, G> Nodes<'a> for Subgraph<'a, G>
where
    G: Algo<'a>,
{
    type Iter = super::index::IndexSetIter<'a, NodeIndex>;

    fn nodes(&'a self) -> Self::Iter {
        self.nodes.iter()
    }
}

impl<'a, G> Edges<'a> for Subgraph<'a, G>
where
    G: Algo<'a>,
{
    type Iter = super::index::IndexSetIter<'a, EdgeIndex>;

    fn edges(&'a self) -> Self::Iter {
        self.edges.iter()
    }
}

impl<'a, G> Neighbors<'a> for Subgraph<'a, G>
where
    G: Algo<'a>,
{
    type Neighbors = std::vec::IntoIter<(NodeIndex, EdgeIndex)>;

    fn incoming(&'a self, index: NodeIndex) -> Self::Neighbors {
        let v: Vec<_> = self
            .graph
            .incoming(index)
            .filter(|(_, e)| self.edges.contains(e))
            .collect();
        v.into_iter()
    }

    fn outgoing(&'a self, index: NodeIndex) -> Self::Neighbors {
        let v: Vec<_> = self
            .graph
            .outgoing(index)
            .filter(|(_, e)| self.edges.contains(e))
            .collect();
        v.into_iter()
    }
}

impl<'a, G, T> Visitable<T> for Subgraph<'a, G>
where
    G: Algo<'a>,
{
    type Map = HashMap<NodeIndex, T>;

    fn visit_map(&self) -> Self::Map {
        HashMap::with_capacity(self.nodes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::base::Graph;

    #[test]
    fn subgraph_of_empty_roots_is_empty() {
        let mut g: Graph<&str, ()> = Graph::new();
        let a = g.add_node("a");
        let b = g.add_node("b");
        g.add_edge(a, b, ());

        let sub = Subgraph::new(&g, std::iter::empty());
        assert_eq!(sub.node_count(), 0);
        assert_eq!(sub.edge_count(), 0);
    }

    #[test]
    fn subgraph_includes_only_reachable_edges() {
        let mut g: Graph<&str, ()> = Graph::new();
        let a = g.add_node("a");
        let b = g.add_node("b");
        let c = g.add_node("c");
        g.add_edge(a, b, ());
        g.add_edge(b, c, ());

        // `c` is unrelated to `a`'s reachable set when rooted only at
        // `b`.
        let sub = Subgraph::new(&g, vec![b]);
        assert_eq!(sub.node_count(), 2);
        assert_eq!(sub.edge_count(), 1);
    }
}
