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

mod build;
mod clean;
mod convert;
mod gc;
mod graph;
mod init;
mod status;

use structopt::StructOpt;

use button::Error;

pub use self::build::BuildCmd;
pub use self::clean::Clean;
pub use self::convert::Convert;
pub use self::gc::Gc;
pub use self::graph::Graph;
pub use self::init::Init;
pub use self::status::Status;

/// The subcommand surface: `build, graph, status, clean, init, convert,
/// gc` (`help`/`version` are provided for free by structopt/clap).
#[derive(StructOpt, Debug)]
pub enum Command {
    /// Builds out-of-date tasks.
    #[structopt(name = "build")]
    Build(BuildCmd),

    /// Prints the dependency graph as GraphViz dot.
    #[structopt(name = "graph")]
    Graph(Graph),

    /// Prints pending resource/task counts without building anything.
    #[structopt(name = "status")]
    Status(Status),

    /// Deletes output resources.
    #[structopt(name = "clean")]
    Clean(Clean),

    /// Creates a template build description.
    #[structopt(name = "init")]
    Init(Init),

    /// Canonicalizes a build description as pretty-printed JSON.
    #[structopt(name = "convert")]
    Convert(Convert),

    /// Experimental: removes unreferenced vertices from the state file.
    #[structopt(name = "gc")]
    Gc(Gc),
}

impl Command {
    pub fn main(self) -> Result<(), Error> {
        match self {
            Command::Build(cmd) => cmd.main(),
            Command::Graph(cmd) => cmd.main(),
            Command::Status(cmd) => cmd.main(),
            Command::Clean(cmd) => cmd.main(),
            Command::Init(cmd) => cmd.main(),
            Command::Convert(cmd) => cmd.main(),
            Command::Gc(cmd) => cmd.main(),
        }
    }
}
