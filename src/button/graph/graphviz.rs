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

//! `graphviz(writer, full_names)` (§4.2): a DOT rendering of a graph,
//! grouping non-trivial strongly connected components into clusters and
//! styling edges by [`EdgeType`] (solid=explicit, dashed=implicit,
//! bold=both).

use std::collections::HashMap;
use std::io::{self, Write};

use super::traits::{Algo, Edges, GraphBase, Indexable, Nodes};
use super::{EdgeType, NodeIndex, Vertex};

/// Node and edge shapes/colors follow `dot`'s own defaults except where
/// §4.2 specifies a style.
pub trait Graphviz {
    /// Renders this graph as DOT. `edge_filter`, when given, restricts
    /// the rendered edges to exactly that origin (§6: `--edges
    /// {explicit,implicit,both}`); `None` renders every edge regardless
    /// of origin.
    fn graphviz(
        &self,
        writer: &mut dyn Write,
        full_names: bool,
        edge_filter: Option<EdgeType>,
    ) -> io::Result<()>;
}

impl<'a, G> Graphviz for G
where
    G: Algo<'a> + GraphBase<Node = Vertex, Edge = EdgeType>,
{
    fn graphviz(
        &self,
        writer: &mut dyn Write,
        full_names: bool,
        edge_filter: Option<EdgeType>,
    ) -> io::Result<()> {
        writeln!(writer, "digraph button {{")?;
        writeln!(writer, "    rankdir=LR;")?;

        let sccs = self.tarjan_scc();
        let mut cluster: HashMap<NodeIndex, usize> = HashMap::new();
        for (i, scc) in sccs.iter().filter(|s| s.len() > 1).enumerate() {
            for &node in scc {
                cluster.insert(node, i);
            }
        }

        for (i, scc) in sccs.iter().filter(|s| s.len() > 1).enumerate() {
            writeln!(writer, "    subgraph cluster_{} {{", i)?;
            writeln!(writer, "        color=red;")?;
            writeln!(writer, "        label=\"cycle\";")?;
            for &node in scc {
                write_node(self, writer, node, full_names)?;
            }
            writeln!(writer, "    }}")?;
        }

        for node in self.nodes() {
            if !cluster.contains_key(&node) {
                write_node(self, writer, node, full_names)?;
            }
        }

        for e in self.edges() {
            let ((from, to), ty) = self.edge_from_index(e);

            if let Some(filter) = edge_filter {
                if *ty != filter {
                    continue;
                }
            }

            let style = match ty {
                EdgeType::Explicit => "solid",
                EdgeType::Implicit => "dashed",
                EdgeType::Both => "bold",
            };
            writeln!(
                writer,
                "    n{} -> n{} [style={}];",
                Into::<usize>::into(from),
                Into::<usize>::into(to),
                style
            )?;
        }

        writeln!(writer, "}}")
    }
}

fn write_node<'a, G>(
    graph: &'a G,
    writer: &mut dyn Write,
    node: NodeIndex,
    full_names: bool,
) -> io::Result<()>
where
    G: Algo<'a> + GraphBase<Node = Vertex, Edge = EdgeType>,
{
    let (label, shape) = match graph.node_from_index(node) {
        Vertex::Resource(r) => {
            let label = if full_names {
                r.path.clone()
            } else {
                r.path.rsplit('/').next().unwrap_or(&r.path).to_string()
            };
            (label, "ellipse")
        }
        Vertex::Task(t) => {
            let label = t.to_string();
            let label = if full_names {
                label
            } else {
                label.chars().take(32).collect::<String>()
            };
            (label, "box")
        }
    };

    writeln!(
        writer,
        "    n{} [label=\"{}\", shape={}];",
        Into::<usize>::into(node),
        label.replace('\"', "\\\""),
        shape
    )
}
