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

//! The in-memory bipartite dependency graph (§4.2).
//!
//! `StateStore` owns the persistent vertices and edges; `Graph` is the
//! immutable adjacency snapshot built from them within one read
//! transaction. Resources and tasks share this same generic `Graph<N,
//! E>` machinery, tagged by [`Vertex`] so a single index space can hold
//! both colors while still letting callers ask "is this a resource or a
//! task."

pub mod base;
pub mod graphviz;
pub mod index;
pub mod subgraph;
pub mod traits;

pub use self::base::Graph;
pub use self::graphviz::Graphviz;
pub use self::index::{EdgeIndex, IndexSet, NodeIndex};
pub use self::subgraph::Subgraph;
pub use self::traits::{
    Algo, Edges, GraphBase, Indexable, Neighbors, Nodes, Visitable, VisitMap,
};

use serde::{Deserialize, Serialize};

use crate::res::Resource;
use crate::task::Task;

/// The value stored at each node of the bipartite graph: either color,
/// tagged so traversal code and serialization can tell them apart
/// without a second parallel graph.
#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq, Hash)]
pub enum Vertex {
    Resource(Resource),
    Task(Task),
}

impl Vertex {
    pub fn as_resource(&self) -> Option<&Resource> {
        match self {
            Vertex::Resource(r) => Some(r),
            Vertex::Task(_) => None,
        }
    }

    pub fn as_task(&self) -> Option<&Task> {
        match self {
            Vertex::Resource(_) => None,
            Vertex::Task(t) => Some(t),
        }
    }
}

/// An edge's origin, per §3: explicit edges come from rules, implicit
/// ones are discovered by observing execution, and an edge with both
/// origins is stored once, tagged `Both`.
#[derive(
    Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd,
)]
pub enum EdgeType {
    Explicit,
    Implicit,
    Both,
}

impl EdgeType {
    /// Folds in an observation of the other kind of origin, producing
    /// the promoted type (explicit+implicit => both).
    pub fn promote(self, other: EdgeType) -> EdgeType {
        if self == other {
            self
        } else {
            EdgeType::Both
        }
    }

    /// Removes one origin from a `Both` edge, producing the demoted
    /// type, or `None` if the edge should be deleted outright.
    pub fn demote(self, removing: EdgeType) -> Option<EdgeType> {
        match (self, removing) {
            (EdgeType::Both, EdgeType::Implicit) => Some(EdgeType::Explicit),
            (EdgeType::Both, EdgeType::Explicit) => Some(EdgeType::Implicit),
            (other, _) if other == removing => None,
            (other, _) => Some(other),
        }
    }
}

pub type BuildGraph = Graph<Vertex, EdgeType>;
