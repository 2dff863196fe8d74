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

//! The build engine core: a persistent state store, a bipartite
//! dependency graph, a change-driven syncer, and a parallel executor.

#[macro_use]
extern crate serde;
#[macro_use]
extern crate failure_derive;
#[macro_use]
extern crate log;

pub mod build;
pub mod change;
pub mod error;
pub mod executor;
pub mod graph;
pub mod logger;
pub mod res;
pub mod rules;
pub mod runner;
pub mod state;
pub mod syncer;
pub mod task;
mod util;

pub use crate::build::Build;
pub use crate::error::{Error, ResultExt};
pub use crate::res::{Resource, Status};
pub use crate::rules::{Rule, Rules};
pub use crate::state::StateStore;
pub use crate::task::Task;
