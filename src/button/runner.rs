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

//! The command-runner interface (§6) and one concrete implementation.
//!
//! A real syscall-level tracer (à la `strace`/ETW) is a per-platform
//! facility out of scope for this crate — only the interface the
//! executor depends on is. [`ProcessRunner`] is a best-effort stand-in:
//! it spawns each command with `std::process::Command` and approximates
//! `reads`/`writes` with the same argv-heuristic sniffing the teacher's
//! `detect` module does for MSVC's `/showIncludes` (known-input/output
//! inference from flags), generalized to a compiler-agnostic pattern
//! since no external tracer is available here.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command as Process;

use crate::error::{BuildError, Error, ResultExt};

/// The result of running one task's commands (§6).
#[derive(Debug, Clone)]
pub struct RunResult {
    /// `None` if the process was killed by a signal rather than
    /// exiting normally.
    pub exit_code: Option<i32>,
    pub reads: HashSet<PathBuf>,
    pub writes: HashSet<PathBuf>,
    pub display: Option<String>,
    pub stderr: String,
}

impl RunResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Executes a task's commands and reports the files it touched.
///
/// Implementations only need to fail (`Err`) when a command couldn't
/// even be spawned; a nonzero exit is a normal outcome reported via
/// `RunResult::exit_code`; the executor decides what to do with it.
pub trait CommandRunner: Send + Sync {
    fn run(
        &self,
        commands: &[Vec<String>],
        working_dir: &Path,
    ) -> Result<RunResult, Error>;
}

/// The default [`CommandRunner`]: runs each command with the host
/// `std::process::Command`, aborting at the first nonzero exit (§5:
/// "a nonzero exit aborts the remainder").
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(
        &self,
        commands: &[Vec<String>],
        working_dir: &Path,
    ) -> Result<RunResult, Error> {
        let mut reads = HashSet::new();
        let mut writes = HashSet::new();

        for argv in commands {
            let (program, args) = argv.split_first().ok_or_else(|| {
                BuildError::InvalidCommand("empty command".into())
            })?;

            sniff_known_paths(argv, working_dir, &mut reads, &mut writes);

            let output = Process::new(program)
                .args(args)
                .current_dir(working_dir)
                .output()
                .with_context(|_| format!("failed to spawn `{}`", program))?;

            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

            if !output.status.success() {
                return Ok(RunResult {
                    exit_code: output.status.code(),
                    reads,
                    writes,
                    display: None,
                    stderr,
                });
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

/// A conservative static approximation of a command's file accesses:
/// the program itself and any bare (non-flag) argument are treated as
/// reads, `-o`/`-MF`-style flags (and their `-oFOO` fused form) as
/// writes. This catches the common compiler-driver shape without
/// needing a real tracer.
fn sniff_known_paths(
    argv: &[String],
    working_dir: &Path,
    reads: &mut HashSet<PathBuf>,
    writes: &mut HashSet<PathBuf>,
) {
    if let Some(program) = argv.first() {
        reads.insert(resolve(working_dir, program));
    }

    let mut args = argv.iter().skip(1).peekable();

    while let Some(arg) = args.next() {
        if arg == "-o" || arg == "-MF" || arg == "/Fo" {
            if let Some(path) = args.next() {
                writes.insert(resolve(working_dir, path));
            }
        } else if let Some(rest) = arg.strip_prefix("-o") {
            if !rest.is_empty() {
                writes.insert(resolve(working_dir, rest));
            }
        } else if !arg.starts_with('-') && !arg.starts_with('/') {
            reads.insert(resolve(working_dir, arg));
        }
    }
}

fn resolve(working_dir: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        working_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_program_and_output_flag() {
        let argv: Vec<String> = vec![
            "gcc".into(),
            "-c".into(),
            "foo.c".into(),
            "-o".into(),
            "foo.o".into(),
        ];

        let mut reads = HashSet::new();
        let mut writes = HashSet::new();
        sniff_known_paths(&argv, Path::new("/p"), &mut reads, &mut writes);

        assert!(reads.contains(&PathBuf::from("/p/gcc")));
        assert!(reads.contains(&PathBuf::from("/p/foo.c")));
        assert!(writes.contains(&PathBuf::from("/p/foo.o")));
    }

    #[test]
    fn sniffs_fused_output_flag() {
        let argv: Vec<String> =
            vec!["cc".into(), "main.c".into(), "-ofoo".into()];

        let mut reads = HashSet::new();
        let mut writes = HashSet::new();
        sniff_known_paths(&argv, Path::new("/p"), &mut reads, &mut writes);

        assert!(writes.contains(&PathBuf::from("/p/foo")));
    }

    #[test]
    fn run_reports_nonzero_exit_without_erroring() {
        let runner = ProcessRunner;
        let result = runner
            .run(
                &[vec!["false".to_string()]],
                Path::new("/"),
            )
            .unwrap();
        assert!(!result.success());
    }
}
