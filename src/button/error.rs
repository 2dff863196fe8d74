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

//! The error kinds the core distinguishes (§7), threaded through the
//! crate as `failure::Error` so every call site can `.context(...)` a
//! human-readable step onto whatever caused it and `?` it up to the
//! caller, the way `build.rs` does throughout the teacher.

use crate::graph::NodeIndex;

pub use failure::ResultExt;

/// The crate-wide error type. A type alias rather than a custom enum so
/// that any `Fail` (including the variants below, `io::Error`, and
/// `serde_json::Error`) converts into it with a bare `?`.
pub type Error = failure::Error;

/// The error kinds the core must distinguish, per §7. These are not the
/// only things that can go wrong — `io::Error` and `serde_json::Error`
/// flow into [`Error`] directly — but they're the ones callers
/// pattern-match on (e.g. the CLI deciding an exit code, or a cycle
/// report listing every involved vertex).
#[derive(Fail, Debug)]
pub enum BuildError {
    /// The build description is missing, unreadable, or fails to parse.
    #[fail(display = "failed to read the build description: {}", _0)]
    BuildDescription(String),

    /// A task's command exited nonzero.
    #[fail(
        display = "task `{}` failed with exit code {:?}",
        task, exit
    )]
    TaskFailure {
        task: String,
        exit: Option<i32>,
        stderr: String,
    },

    /// The subgraph about to be walked contains a cycle.
    #[fail(display = "cycle detected among {} vertices", _0.0)]
    CycleDetected(CycleLen, Vec<NodeIndex>),

    /// An operation referenced a vertex that no longer exists.
    #[fail(display = "edge references a vertex that no longer exists")]
    InvalidEdge,

    /// The CLI layer was given an unrecognized subcommand.
    #[fail(display = "unknown subcommand: {:?}", _0)]
    InvalidCommand(String),

    /// A `put`-style insert collided with an existing natural key.
    #[fail(display = "key already exists: {}", _0)]
    KeyConflict(String),

    /// Underlying filesystem or store I/O failure.
    #[fail(display = "I/O error: {}", _0)]
    Io(#[fail(cause)] std::io::Error),

    /// Any other foreign error (serde_json, bincode) that doesn't need
    /// its own variant.
    #[fail(display = "{}", _0)]
    Other(String),
}

impl From<std::io::Error> for BuildError {
    fn from(err: std::io::Error) -> BuildError {
        BuildError::Io(err)
    }
}

/// Wrapper so the `#[fail(display = ...)]` attribute can reference a
/// plain integer (`_0.0`) without failure_derive needing to call a
/// method on the cycle's `Vec<NodeIndex>` field directly.
#[derive(Debug, Copy, Clone)]
pub struct CycleLen(pub usize);

impl BuildError {
    pub fn cycle_detected(cycle: Vec<NodeIndex>) -> BuildError {
        let len = CycleLen(cycle.len());
        BuildError::CycleDetected(len, cycle)
    }

    pub fn task_failure(
        task: impl Into<String>,
        exit: Option<i32>,
        stderr: impl Into<String>,
    ) -> BuildError {
        BuildError::TaskFailure {
            task: task.into(),
            exit,
            stderr: stderr.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_detected_reports_vertex_count() {
        let err = BuildError::cycle_detected(vec![0.into(), 1.into()]);
        assert_eq!(format!("{}", err), "cycle detected among 2 vertices");
    }

    #[test]
    fn task_failure_mentions_the_task() {
        let err = BuildError::task_failure("gcc -c foo.c", Some(1), "error");
        assert!(format!("{}", err).contains("gcc -c foo.c"));
    }
}
