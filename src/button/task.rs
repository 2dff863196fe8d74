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

//! Tasks: ordered sequences of argv commands run in a working directory
//! (§3).
//!
//! Like [`Resource`](crate::res::Resource), a [`Task`]'s identity is a
//! subset of its fields — `(commands, working_directory)`, per the
//! uniqueness key in §3 — while `display` and `last_executed` are mutable
//! bookkeeping that `StateStore` keeps in a side table rather than inside
//! the graph.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, TimeZone, Utc};

/// A unit of work: a non-empty ordered sequence of argv-style command
/// vectors, executed in order in `working_directory`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Task {
    pub commands: Vec<Vec<String>>,
    pub working_directory: String,
    #[serde(default)]
    pub display: Option<String>,
    #[serde(default = "Task::epoch")]
    pub last_executed: DateTime<Utc>,
}

impl Task {
    /// The sentinel `lastExecuted` a rule-ingested task is given before
    /// it has ever run (§4.3).
    fn epoch() -> DateTime<Utc> {
        Utc.timestamp(0, 0)
    }

    /// A freshly declared task: never executed, per the Syncer's "tasks
    /// get lastExecuted=epoch" rule.
    pub fn new(commands: Vec<Vec<String>>, working_directory: String) -> Task {
        Task {
            commands,
            working_directory,
            display: None,
            last_executed: Task::epoch(),
        }
    }

    pub fn display(mut self, display: String) -> Task {
        self.display = Some(display);
        self
    }

    /// A task with no commands is rejected at rule ingestion (§8 boundary
    /// behavior); this is the check `Rules` runs before handing a task to
    /// the Syncer.
    pub fn is_valid(&self) -> bool {
        !self.commands.is_empty()
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(display) = &self.display {
            write!(f, "{}", display)
        } else {
            let mut first = true;
            for command in &self.commands {
                if !first {
                    write!(f, " && ")?;
                }
                first = false;
                write!(f, "{}", command.join(" "))?;
            }
            Ok(())
        }
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Task) -> bool {
        self.commands == other.commands
            && self.working_directory == other.working_directory
    }
}

impl Eq for Task {}

impl Hash for Task {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.commands.hash(state);
        self.working_directory.hash(state);
    }
}

impl Ord for Task {
    fn cmp(&self, other: &Task) -> Ordering {
        (&self.commands, &self.working_directory)
            .cmp(&(&other.commands, &other.working_directory))
    }
}

impl PartialOrd for Task {
    fn partial_cmp(&self, other: &Task) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_ignores_display_and_last_executed() {
        let a = Task::new(vec![vec!["gcc".into()]], "/p".into());
        let mut b = Task::new(vec![vec!["gcc".into()]], "/p".into());
        b.display = Some("compile foo".into());
        b.last_executed = Utc::now();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_commands_is_invalid() {
        let t = Task::new(vec![], "/p".into());
        assert!(!t.is_valid());
    }
}
