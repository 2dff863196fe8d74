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
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::util::ReadyQueue;

use super::index::{EdgeIndex, NodeIndex};

pub trait GraphBase {
    type Node;
    type Edge;

    fn node_count(&self) -> usize;
    fn edge_count(&self) -> usize;
}

pub trait Indexable<'a>: GraphBase {
    fn node_from_index(&'a self, index: NodeIndex) -> &'a Self::Node;
    fn node_to_index(&self, node: &Self::Node) -> Option<NodeIndex>;

    fn edge_from_index(
        &'a self,
        index: EdgeIndex,
    ) -> ((NodeIndex, NodeIndex), &'a Self::Edge);
    fn edge_to_index(&self, edge: &(NodeIndex, NodeIndex))
        -> Option<EdgeIndex>;

    fn contains_node(&self, node: &Self::Node) -> bool {
        self.node_to_index(node).is_some()
    }
}

pub trait Nodes<'a>: GraphBase {
    type Iter: Iterator<Item = NodeIndex>;

    fn nodes(&'a self) -> Self::Iter;
}

pub trait Edges<'a>: GraphBase {
    type Iter: Iterator<Item = EdgeIndex>;

    fn edges(&'a self) -> Self::Iter;
}

pub trait Neighbors<'a>: GraphBase {
    type Neighbors: Iterator<Item = (NodeIndex, EdgeIndex)>;

    fn incoming(&'a self, index: NodeIndex) -> Self::Neighbors;
    fn outgoing(&'a self, index: NodeIndex) -> Self::Neighbors;

    fn is_root_node(&'a self, index: NodeIndex) -> bool {
        self.incoming(index).next().is_none()
    }

    fn is_terminal_node(&'a self, index: NodeIndex) -> bool {
        self.outgoing(index).next().is_none()
    }
}

/// A map from node index to some per-visit datum, used both by
/// `tarjan_scc` (where `T` carries discovery/lowlink bookkeeping) and by
/// `traverse` (where `T = bool`, true meaning "ran without error").
pub trait VisitMap<T> {
    fn visit(&mut self, node: NodeIndex, data: T) -> Option<T>;
    fn is_visited(&self, node: &NodeIndex) -> bool;
    fn get(&self, node: &NodeIndex) -> Option<&T>;
}

impl<T> VisitMap<T> for HashMap<NodeIndex, T> {
    fn visit(&mut self, node: NodeIndex, data: T) -> Option<T> {
        self.insert(node, data)
    }

    fn is_visited(&self, node: &NodeIndex) -> bool {
        self.contains_key(node)
    }

    fn get(&self, node: &NodeIndex) -> Option<&T> {
        HashMap::get(self, node)
    }
}

pub trait Visitable<T>: GraphBase {
    type Map: VisitMap<T>;

    fn visit_map(&self) -> Self::Map;
}

#[derive(Copy, Clone, Debug)]
struct TarjanNodeData {
    index: usize,
    lowlink: usize,
    on_stack: bool,
}

/// Traversal bookkeeping shared by every worker in a [`Algo::traverse`]
/// call. Owns the ready queue, the per-node visited map, and the active
/// worker count used to detect when all in-flight work has drained.
pub struct TraversalState<'a, G: ?Sized, E>
where
    G: Algo<'a>,
{
    threads: usize,
    pub errors: Mutex<Vec<(NodeIndex, E)>>,
    pub visited: Mutex<G::Map>,
    pub queue: ReadyQueue<Option<NodeIndex>>,
    pub active: AtomicUsize,
    graph: &'a G,
    reverse: bool,
}

impl<'a, G, E> TraversalState<'a, G, E>
where
    G: Algo<'a> + Visitable<bool>,
{
    pub fn new(graph: &'a G, reverse: bool, threads: usize) -> Self {
        let roots: Vec<NodeIndex> = if reverse {
            graph.terminal_nodes().collect()
        } else {
            graph.root_nodes().collect()
        };

        let queue = ReadyQueue::new();
        let n = queue.push_many(roots.into_iter().map(Some));

        let state = TraversalState {
            threads: threads.max(1),
            errors: Mutex::new(Vec::new()),
            visited: Mutex::new(graph.visit_map()),
            queue,
            active: AtomicUsize::new(n),
            graph,
            reverse,
        };

        if n == 0 {
            // Nothing to do. Wake every worker up immediately so none of
            // them block forever on an empty queue.
            state.shutdown();
        }

        state
    }

    /// Pushes one shutdown sentinel per worker thread.
    pub fn shutdown(&self) {
        for _ in 0..self.threads {
            self.queue.push(None);
        }
    }
}

fn traversal_worker<'a, G, V, E>(
    tid: usize,
    visit: &V,
    state: &TraversalState<'a, G, E>,
) where
    G: Algo<'a> + Visitable<bool>,
    V: Fn(usize, NodeIndex) -> Result<bool, E> + Sync,
{
    let graph = state.graph;
    let reverse = state.reverse;

    loop {
        let index = match state.queue.pop() {
            Some(index) => index,
            None => break,
        };

        let keep_going = match visit(tid, index) {
            Ok(keep_going) => {
                state.visited.lock().unwrap().visit(index, true);
                keep_going
            }
            Err(err) => {
                state.visited.lock().unwrap().visit(index, false);
                state.errors.lock().unwrap().push((index, err));
                false
            }
        };

        if keep_going {
            let successors: Vec<NodeIndex> = if reverse {
                graph.incoming(index).map(|(n, _)| n).collect()
            } else {
                graph.outgoing(index).map(|(n, _)| n).collect()
            };

            for succ in successors {
                let ready = {
                    let visited = state.visited.lock().unwrap();

                    if visited.is_visited(&succ) {
                        false
                    } else {
                        let preds: Vec<NodeIndex> = if reverse {
                            graph.outgoing(succ).map(|(p, _)| p).collect()
                        } else {
                            graph.incoming(succ).map(|(p, _)| p).collect()
                        };

                        preds.iter().all(|p| visited.get(p) == Some(&true))
                    }
                };

                if ready {
                    state.active.fetch_add(1, Ordering::SeqCst);
                    state.queue.push(Some(succ));
                }
            }
        }

        if state.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            state.shutdown();
        }
    }
}

/// Algorithms available on any indexable, navigable graph: the
/// traversal-adjacent queries (`root_nodes`/`terminal_nodes`), Tarjan's
/// strongly-connected-components algorithm, the induced-subgraph DFS, and
/// the bounded-worker-pool topological walk.
pub trait Algo<'a>:
    GraphBase
    + Indexable<'a>
    + Nodes<'a>
    + Edges<'a>
    + Neighbors<'a>
    + Visitable<bool>
{
    fn root_nodes(&'a self) -> Box<dyn Iterator<Item = NodeIndex> + 'a> {
        Box::new(self.nodes().filter(move |&n| self.is_root_node(n)))
    }

    fn terminal_nodes(&'a self) -> Box<dyn Iterator<Item = NodeIndex> + 'a> {
        Box::new(self.nodes().filter(move |&n| self.is_terminal_node(n)))
    }

    fn non_root_nodes(&'a self) -> Box<dyn Iterator<Item = NodeIndex> + 'a> {
        Box::new(self.nodes().filter(move |&n| !self.is_root_node(n)))
    }

    fn non_terminal_nodes(
        &'a self,
    ) -> Box<dyn Iterator<Item = NodeIndex> + 'a> {
        Box::new(self.nodes().filter(move |&n| !self.is_terminal_node(n)))
    }

    /// Tarjan's strongly-connected-components algorithm. Every node
    /// appears in exactly one component; a component of size 1 whose
    /// node has no self-loop is not a cycle, anything else is.
    ///
    /// TODO: this recurses one stack frame per DFS edge; a sufficiently
    /// deep or wide dependency graph could overflow the stack. An
    /// explicit-stack rewrite would remove the limit.
    fn tarjan_scc(&'a self) -> Vec<Vec<NodeIndex>> {
        struct State<'a, G: ?Sized> {
            index_counter: usize,
            stack: Vec<NodeIndex>,
            data: HashMap<NodeIndex, TarjanNodeData>,
            result: Vec<Vec<NodeIndex>>,
            graph: &'a G,
        }

        fn strongconnect<'a, G>(v: NodeIndex, state: &mut State<'a, G>)
        where
            G: Algo<'a> + ?Sized,
        {
            state.data.insert(
                v,
                TarjanNodeData {
                    index: state.index_counter,
                    lowlink: state.index_counter,
                    on_stack: true,
                },
            );
            state.index_counter += 1;
            state.stack.push(v);

            let successors: Vec<NodeIndex> =
                state.graph.outgoing(v).map(|(n, _)| n).collect();

            for w in successors {
                if !state.data.contains_key(&w) {
                    strongconnect(w, state);
                    let w_lowlink = state.data[&w].lowlink;
                    let v_data = state.data.get_mut(&v).unwrap();
                    v_data.lowlink = v_data.lowlink.min(w_lowlink);
                } else if state.data[&w].on_stack {
                    let w_index = state.data[&w].index;
                    let v_data = state.data.get_mut(&v).unwrap();
                    v_data.lowlink = v_data.lowlink.min(w_index);
                }
            }

            let v_data = state.data[&v];
            if v_data.lowlink == v_data.index {
                let mut scc = Vec::new();
                loop {
                    let w = state.stack.pop().unwrap();
                    state.data.get_mut(&w).unwrap().on_stack = false;
                    scc.push(w);
                    if w == v {
                        break;
                    }
                }
                state.result.push(scc);
            }
        }

        let mut state = State {
            index_counter: 0,
            stack: Vec::new(),
            data: HashMap::new(),
            result: Vec::new(),
            graph: self,
        };

        let all_nodes: Vec<NodeIndex> = self.nodes().collect();
        for v in all_nodes {
            if !state.data.contains_key(&v) {
                strongconnect(v, &mut state);
            }
        }

        state.result
    }

    /// All nodes forward-reachable from `roots`, in discovery order.
    fn dfs<I>(&'a self, roots: I) -> Vec<NodeIndex>
    where
        I: Iterator<Item = NodeIndex>,
    {
        let mut visited = super::index::IndexSet::new();
        let mut stack: Vec<NodeIndex> = roots.collect();
        let mut order = Vec::new();

        while let Some(n) = stack.pop() {
            if visited.insert(n) {
                order.push(n);
                for (succ, _) in self.outgoing(n) {
                    if !visited.contains(&succ) {
                        stack.push(succ);
                    }
                }
            }
        }

        order
    }

    /// Walks the graph topologically with a bounded pool of `threads`
    /// workers, calling `visit(worker_id, node)` for each node once all
    /// of its predecessors (in-edges, or out-edges when `reverse`) have
    /// themselves been visited and returned `Ok(true)`. A node whose
    /// visit returns `Err` is recorded as failed and its successors are
    /// never released — the single-thread analogue of "downstream tasks
    /// that transitively depend on its outputs are not released."
    fn traverse<V, E>(
        &'a self,
        visit: V,
        threads: usize,
        reverse: bool,
    ) -> Result<(), Vec<(NodeIndex, E)>>
    where
        Self: Visitable<bool> + Sized,
        V: Fn(usize, NodeIndex) -> Result<bool, E> + Sync,
        E: Send,
    {
        let state = TraversalState::new(self, reverse, threads);
        let num_threads = state.threads;

        crossbeam::scope(|scope| {
            for tid in 0..num_threads {
                let state = &state;
                let visit = &visit;
                scope.spawn(move |_| {
                    traversal_worker(tid, visit, state);
                });
            }
        })
        .unwrap();

        let errors = state.errors.into_inner().unwrap();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl<'a, T> Algo<'a> for T where
    T: GraphBase
        + Indexable<'a>
        + Nodes<'a>
        + Edges<'a>
        + Neighbors<'a>
        + Visitable<bool>
{
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::base::Graph;

    #[test]
    fn root_and_terminal_nodes() {
        let mut g: Graph<&str, ()> = Graph::new();
        let a = g.add_node("a");
        let b = g.add_node("b");
        let c = g.add_node("c");
        g.add_edge(a, b, ());
        g.add_edge(b, c, ());

        let roots: Vec<_> = g.root_nodes().collect();
        let terminals: Vec<_> = g.terminal_nodes().collect();

        assert_eq!(roots, vec![a]);
        assert_eq!(terminals, vec![c]);
    }

    #[test]
    fn traverse_visits_in_topological_order() {
        let mut g: Graph<&str, ()> = Graph::new();
        let a = g.add_node("a");
        let b = g.add_node("b");
        let c = g.add_node("c");
        g.add_edge(a, b, ());
        g.add_edge(a, c, ());
        g.add_edge(b, c, ());

        let order = Mutex::new(Vec::new());

        let result: Result<(), Vec<(NodeIndex, ())>> =
            g.traverse(
                |_tid, index| -> Result<bool, ()> {
                    order.lock().unwrap().push(index);
                    Ok(true)
                },
                2,
                false,
            );

        assert!(result.is_ok());
        let order = order.into_inner().unwrap();
        assert_eq!(order.len(), 3);
        // `a` must precede both `b` and `c`; `b` must precede `c`.
        let pos = |n: NodeIndex| order.iter().position(|&x| x == n).unwrap();
        assert!(pos(a) < pos(b));
        assert!(pos(a) < pos(c));
        assert!(pos(b) < pos(c));
    }

    #[test]
    fn traverse_isolates_failures() {
        let mut g: Graph<&str, ()> = Graph::new();
        let a = g.add_node("a");
        let b = g.add_node("b");
        let c = g.add_node("c");
        g.add_edge(a, b, ());
        g.add_edge(b, c, ());

        let visited = Mutex::new(Vec::new());

        let result = g.traverse(
            |_tid, index| -> Result<bool, &'static str> {
                visited.lock().unwrap().push(index);
                if index == b {
                    Err("boom")
                } else {
                    Ok(true)
                }
            },
            1,
            false,
        );

        assert!(result.is_err());
        let visited = visited.into_inner().unwrap();
        assert!(visited.contains(&a));
        assert!(visited.contains(&b));
        assert!(!visited.contains(&c));
    }
}
