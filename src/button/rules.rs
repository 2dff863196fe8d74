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

//! Build-description ingestion: the external, parser-produced rule list
//! `Syncer` reconciles against the store (§1, §4.3).
//!
//! The parser itself — whatever turns a user-authored `BUILD` file into
//! these types — is out of scope; this module only owns the shape of a
//! parsed rule and a default JSON reader, the way the teacher's own
//! `rules.rs` does.

use std::fs;
use std::io;
use std::path::Path;
use std::slice::Iter;

use serde_json;

use crate::error::{BuildError, Error, ResultExt};
use crate::task::Task;

/// One `{task, inputs, outputs}` triple (§4.3).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Rule {
    pub task: Task,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
}

impl Rule {
    /// A rule is well-formed only if its task has at least one command
    /// (§8 boundary behavior) and its resource paths aren't the empty
    /// string, which is reserved for the description resource (§8).
    pub fn is_valid(&self) -> bool {
        self.task.is_valid()
            && self.inputs.iter().all(|p| !p.is_empty())
            && self.outputs.iter().all(|p| !p.is_empty())
    }
}

/// A parsed build description: an ordered list of rules.
#[derive(Debug, PartialEq, Default)]
pub struct Rules {
    rules: Vec<Rule>,
}

impl Rules {
    pub fn new(rules: Vec<Rule>) -> Result<Rules, Error> {
        for rule in &rules {
            if !rule.is_valid() {
                return Err(BuildError::BuildDescription(format!(
                    "invalid rule: {}",
                    rule.task
                ))
                .into());
            }
        }

        Ok(Rules { rules })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Rules, Error> {
        let path = path.as_ref();
        let f = fs::File::open(path).with_context(|_| {
            format!("failed to open build description {:?}", path)
        })?;
        Self::from_reader(io::BufReader::new(f))
    }

    pub fn from_reader<R: io::Read>(reader: R) -> Result<Rules, Error> {
        let rules: Vec<Rule> = serde_json::from_reader(reader)
            .context("failed to parse build description")?;
        Self::new(rules)
    }

    pub fn from_str(s: &str) -> Result<Rules, Error> {
        let rules: Vec<Rule> = serde_json::from_str(s)
            .context("failed to parse build description")?;
        Self::new(rules)
    }

    pub fn iter(&self) -> Iter<'_, Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl IntoIterator for Rules {
    type Item = Rule;
    type IntoIter = std::vec::IntoIter<Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_a_single_rule() {
        let data = r#"[{
            "task": {"commands": [["gcc", "-c", "foo.c", "-o", "foo.o"]], "working_directory": "/p"},
            "inputs": ["/p/foo.c"],
            "outputs": ["/p/foo.o"]
        }]"#;

        let rules = Rules::from_str(data).unwrap();
        assert_eq!(rules.len(), 1);

        let rule = rules.iter().next().unwrap();
        assert_eq!(rule.inputs, vec!["/p/foo.c".to_string()]);
        assert_eq!(rule.outputs, vec!["/p/foo.o".to_string()]);
    }

    #[test]
    fn rejects_a_task_with_no_commands() {
        let data = r#"[{
            "task": {"commands": [], "working_directory": "/p"},
            "inputs": [],
            "outputs": []
        }]"#;

        assert!(Rules::from_str(data).is_err());
    }

    #[test]
    fn rejects_the_reserved_empty_path() {
        let data = r#"[{
            "task": {"commands": [["gcc"]], "working_directory": "/p"},
            "inputs": [""],
            "outputs": []
        }]"#;

        assert!(Rules::from_str(data).is_err());
    }
}
