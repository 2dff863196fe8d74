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

use std::fs;
use std::io::{self, Write};
use std::str::FromStr;

use structopt::StructOpt;

use button::graph::{EdgeType, Graphviz, Subgraph};
use button::{Build, Error, ResultExt, Rules};

use crate::opts::CommonOpts;
use crate::paths;

/// An `--edges` value: which edge origin(s) to render. Wraps
/// [`EdgeType`] with the `FromStr` a CLI flag needs.
#[derive(Debug, Copy, Clone)]
struct EdgeFilter(EdgeType);

impl FromStr for EdgeFilter {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "explicit" => Ok(EdgeFilter(EdgeType::Explicit)),
            "implicit" => Ok(EdgeFilter(EdgeType::Implicit)),
            "both" => Ok(EdgeFilter(EdgeType::Both)),
            _ => Err("invalid edge filter"),
        }
    }
}

#[derive(StructOpt, Debug)]
pub struct Graph {
    #[structopt(flatten)]
    common: CommonOpts,

    /// Renders the graph as last persisted, without reconciling the
    /// build description against it first.
    #[structopt(long = "cached")]
    cached: bool,

    /// Restricts the rendering to the subgraph reachable from the
    /// pending resources and tasks (§4.2's "changes only" view).
    #[structopt(long = "changes")]
    changes: bool,

    /// Writes the dot output here instead of stdout.
    #[structopt(long = "output", short = "o", parse(from_os_str))]
    output: Option<std::path::PathBuf>,

    /// Uses full resource/task names instead of abbreviated ones.
    #[structopt(long = "full")]
    full: bool,

    /// Only renders edges of this origin. Defaults to every origin.
    #[structopt(
        long = "edges",
        possible_values = &["explicit", "implicit", "both"],
        case_insensitive = true
    )]
    edges: Option<EdgeFilter>,
}

impl Graph {
    pub fn main(self) -> Result<(), Error> {
        let root = paths::root_dir(&self.common.file);
        let state_path = paths::state_path(&self.common.file);
        let build = Build::new(root, state_path)?;

        let mut txn = build.state().begin();

        if !self.cached {
            let bytes = fs::read(&self.common.file).with_context(|_| {
                format!("failed reading build description {:?}", self.common.file)
            })?;
            let rules = Rules::from_str(&String::from_utf8_lossy(&bytes))?;
            let description_path = self.common.file.to_string_lossy().into_owned();

            button::syncer::sync(&mut txn, &description_path, &bytes, &rules, root)
                .context("failed reconciling the build description against stored state")?;
        }

        let graph = txn.graph();
        let edge_filter = self.edges.map(|f| f.0);

        let mut out: Box<dyn Write> = match &self.output {
            Some(path) => Box::new(
                fs::File::create(path)
                    .with_context(|_| format!("failed creating {:?}", path))?,
            ),
            None => Box::new(io::stdout()),
        };

        if self.changes {
            let roots: Vec<_> = txn
                .pending_resources()
                .into_iter()
                .chain(txn.pending_tasks())
                .collect();
            let sub = Subgraph::new(graph, roots);
            sub.graphviz(&mut out, self.full, edge_filter)
                .context("failed writing graph")?;
        } else {
            graph
                .graphviz(&mut out, self.full, edge_filter)
                .context("failed writing graph")?;
        }

        // Read-only: never persist what was reconciled just to look at it.
        txn.rollback();

        Ok(())
    }
}
