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

//! End-to-end scenario tests built on `tempfile::tempdir()` fixtures with
//! a stub [`CommandRunner`], exercising `Build` the way a real CLI
//! invocation would: fresh build, no-op rebuild, input change, implicit
//! discovery, failure isolation, and clean with purge.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use button::graph::EdgeType;
use button::logger::Null;
use button::runner::{CommandRunner, RunResult};
use button::{Build, Error, Rule, Rules, Task};

/// A tiny scripted "compiler": `copy src dst` reads `src` and writes its
/// contents to `dst`; `copy_with_extra src extra dst` additionally reads
/// `extra` without it ever being declared as an input, the way a real
/// compiler would pull in a header nobody listed; `fail` does nothing
/// and reports a nonzero exit.
#[derive(Default)]
struct ScriptedRunner {
    calls: AtomicUsize,
}

impl ScriptedRunner {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(
        &self,
        commands: &[Vec<String>],
        working_dir: &Path,
    ) -> Result<RunResult, Error> {
        let mut reads = HashSet::new();
        let mut writes = HashSet::new();

        for argv in commands {
            self.calls.fetch_add(1, Ordering::SeqCst);

            match argv[0].as_str() {
                "copy" => {
                    let src = working_dir.join(&argv[1]);
                    let dst = working_dir.join(&argv[2]);
                    let content = fs::read(&src).unwrap_or_default();
                    fs::write(&dst, &content).unwrap();
                    reads.insert(src);
                    writes.insert(dst);
                }
                "copy_with_extra" => {
                    let src = working_dir.join(&argv[1]);
                    let extra = working_dir.join(&argv[2]);
                    let dst = working_dir.join(&argv[3]);
                    let mut content = fs::read(&src).unwrap_or_default();
                    content.extend(fs::read(&extra).unwrap_or_default());
                    fs::write(&dst, &content).unwrap();
                    reads.insert(src);
                    reads.insert(extra);
                    writes.insert(dst);
                }
                "fail" => {
                    return Ok(RunResult {
                        exit_code: Some(1),
                        reads,
                        writes,
                        display: None,
                        stderr: "scripted failure".into(),
                    });
                }
                other => panic!("unknown scripted command: {}", other),
            }
        }

        Ok(RunResult {
            exit_code: Some(0),
            reads,
            writes,
            display: None,
            stderr: String::new(),
        })
    }
}

/// Builds a `Rule` whose task's working directory is the (absolute)
/// build root, the way a real `BUILD` file would name it, rather than
/// relying on the test process's own current directory matching it.
fn rule(
    root: &Path,
    commands: Vec<Vec<&str>>,
    inputs: &[&str],
    outputs: &[&str],
) -> Rule {
    Rule {
        task: Task::new(
            commands
                .into_iter()
                .map(|argv| argv.into_iter().map(String::from).collect())
                .collect(),
            root.to_string_lossy().into_owned(),
        ),
        inputs: inputs.iter().map(|s| s.to_string()).collect(),
        outputs: outputs.iter().map(|s| s.to_string()).collect(),
    }
}

fn open_build(root: &Path, state_path: &PathBuf) -> Build {
    Build::new(root.to_path_buf(), state_path.clone()).unwrap()
}

#[test]
fn fresh_build_then_noop_rebuild_then_input_change() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let state_path = root.join("BUILD.state");

    fs::write(root.join("in.txt"), b"hello").unwrap();

    let rules = Rules::new(vec![rule(
        root,
        vec![vec!["copy", "in.txt", "out.txt"]],
        &["in.txt"],
        &["out.txt"],
    )])
    .unwrap();

    let runner = ScriptedRunner::default();
    let mut logger = Null;

    // Scenario 1: fresh build runs the one pending task.
    let build = open_build(root, &state_path);
    build
        .build("BUILD", b"v1", &rules, &runner, false, 1, &mut logger)
        .unwrap();

    assert_eq!(fs::read(root.join("out.txt")).unwrap(), b"hello");
    assert_eq!(runner.calls(), 1);

    // Scenario 2: nothing changed, so the rebuild invokes zero commands.
    let build = open_build(root, &state_path);
    build
        .build("BUILD", b"v1", &rules, &runner, false, 1, &mut logger)
        .unwrap();
    assert_eq!(runner.calls(), 1);

    // Scenario 3: changing a declared input reruns exactly its task.
    fs::write(root.join("in.txt"), b"goodbye").unwrap();

    let build = open_build(root, &state_path);
    build
        .build("BUILD", b"v1", &rules, &runner, false, 1, &mut logger)
        .unwrap();

    assert_eq!(fs::read(root.join("out.txt")).unwrap(), b"goodbye");
    assert_eq!(runner.calls(), 2);
}

#[test]
fn implicit_discovery_tracks_an_undeclared_header() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let state_path = root.join("BUILD.state");

    fs::write(root.join("in2.txt"), b"body").unwrap();
    fs::write(root.join("extra.h"), b"#define X").unwrap();

    let rules = Rules::new(vec![rule(
        root,
        vec![vec!["copy_with_extra", "in2.txt", "extra.h", "out2.txt"]],
        &["in2.txt"],
        &["out2.txt"],
    )])
    .unwrap();

    let runner = ScriptedRunner::default();
    let mut logger = Null;

    let build = open_build(root, &state_path);
    build
        .build("BUILD", b"v1", &rules, &runner, false, 1, &mut logger)
        .unwrap();

    assert_eq!(fs::read(root.join("out2.txt")).unwrap(), b"body#define X");

    // `extra.h` was never declared as an input, yet the executor must
    // have recorded it as an implicit dependency of the task.
    {
        let txn = build.state().begin();
        let header = txn.find_resource("extra.h").expect("header recorded");
        let task = txn
            .find_task(
                &[vec![
                    "copy_with_extra".to_string(),
                    "in2.txt".to_string(),
                    "extra.h".to_string(),
                    "out2.txt".to_string(),
                ]],
                &root.to_string_lossy(),
            )
            .unwrap();
        assert!(txn.edge_exists(header, task, EdgeType::Implicit));
        txn.rollback();
    }

    // Changing only the undeclared header still triggers a rebuild,
    // since it's now tracked as an implicit input.
    fs::write(root.join("extra.h"), b"#define Y").unwrap();

    let build = open_build(root, &state_path);
    build
        .build("BUILD", b"v1", &rules, &runner, false, 1, &mut logger)
        .unwrap();

    assert_eq!(fs::read(root.join("out2.txt")).unwrap(), b"body#define Y");
    assert_eq!(runner.calls(), 2);
}

#[test]
fn failing_task_does_not_block_unrelated_branches() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let state_path = root.join("BUILD.state");

    fs::write(root.join("in.txt"), b"unrelated").unwrap();

    let rules = Rules::new(vec![
        rule(root, vec![vec!["copy", "in.txt", "out1.txt"]], &["in.txt"], &["out1.txt"]),
        rule(root, vec![vec!["fail"]], &[], &["mid.txt"]),
        rule(root, vec![vec!["copy", "mid.txt", "out3.txt"]], &["mid.txt"], &["out3.txt"]),
    ])
    .unwrap();

    let runner = ScriptedRunner::default();
    let mut logger = Null;

    let build = open_build(root, &state_path);
    let result =
        build.build("BUILD", b"v1", &rules, &runner, false, 1, &mut logger);

    assert!(result.is_err());

    // The independent branch still ran and produced its output.
    assert_eq!(fs::read(root.join("out1.txt")).unwrap(), b"unrelated");

    // The task downstream of the failed one never got to run.
    assert!(!root.join("out3.txt").exists());
}

#[test]
fn clean_with_purge_deletes_outputs_and_state_but_not_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let state_path = root.join("BUILD.state");

    fs::write(root.join("in.txt"), b"hello").unwrap();

    let rules = Rules::new(vec![rule(
        root,
        vec![vec!["copy", "in.txt", "out.txt"]],
        &["in.txt"],
        &["out.txt"],
    )])
    .unwrap();

    let runner = ScriptedRunner::default();
    let mut logger = Null;

    let build = open_build(root, &state_path);
    build
        .build("BUILD", b"v1", &rules, &runner, false, 1, &mut logger)
        .unwrap();
    assert!(root.join("out.txt").exists());

    build.clean(true, false, 1, &Null).unwrap();

    assert!(!root.join("out.txt").exists());
    assert!(root.join("in.txt").exists());
    assert!(!state_path.exists());
}
