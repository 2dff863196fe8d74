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

//! The facade that wires StateStore, Syncer and Executor into the
//! handful of operations a caller actually needs: run an incremental
//! build, clean up what the build owns, or garbage-collect orphaned
//! vertices.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, ResultExt};
use crate::executor;
use crate::graph::{Algo, Indexable};
use crate::logger::EventLogger;
use crate::rules::Rules;
use crate::runner::CommandRunner;
use crate::state::StateStore;

/// Owns the state file and the root directory tasks run relative to.
pub struct Build {
    root: PathBuf,
    state_path: PathBuf,
    state: StateStore,
}

impl Build {
    /// Opens (or creates) the state file at `state_path`, rooted at
    /// `root` for resolving resource paths and task working directories.
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(
        root: P,
        state_path: Q,
    ) -> Result<Build, Error> {
        let state_path = state_path.into();
        let state = StateStore::open(&state_path)?;

        Ok(Build {
            root: root.into(),
            state_path,
            state,
        })
    }

    /// Runs an incremental build: reconciles `rules` against the stored
    /// state, then executes whatever that reconciliation left pending.
    pub fn build<R, L>(
        &self,
        description_path: &str,
        description_bytes: &[u8],
        rules: &Rules,
        runner: &R,
        dryrun: bool,
        threads: usize,
        logger: &mut L,
    ) -> Result<(), Error>
    where
        R: CommandRunner,
        L: EventLogger,
    {
        logger.begin_build(threads)?;
        let result = self.build_impl(
            description_path,
            description_bytes,
            rules,
            runner,
            dryrun,
            threads,
            logger,
        );
        logger.end_build(&result)?;
        result
    }

    fn build_impl<R, L>(
        &self,
        description_path: &str,
        description_bytes: &[u8],
        rules: &Rules,
        runner: &R,
        dryrun: bool,
        threads: usize,
        logger: &L,
    ) -> Result<(), Error>
    where
        R: CommandRunner,
        L: EventLogger,
    {
        let mut txn = self.state.begin();

        crate::syncer::sync(
            &mut txn,
            description_path,
            description_bytes,
            rules,
            &self.root,
        )
        .context("failed reconciling the build description against stored state")?;

        let result =
            executor::execute(&mut txn, runner, &self.root, threads, dryrun, logger)
                .context("build failed");

        // Pending sets mutated by the executor (newly-pending resources,
        // re-queued failed tasks) are worth persisting even on failure,
        // so the next run retries exactly what failed.
        txn.commit()?;

        result.map_err(Into::into)
    }

    /// Deletes every resource this build owns (i.e., a task's output, per
    /// §8 scenario 6) and then the state file itself.
    pub fn clean<L>(
        &self,
        purge: bool,
        dryrun: bool,
        threads: usize,
        logger: &L,
    ) -> Result<(), Error>
    where
        L: EventLogger,
    {
        let txn = self.state.begin();

        let graph = txn.graph();
        let root = &self.root;
        let description = txn.description();

        let result = graph
            .traverse(
                |tid, index| -> Result<bool, Error> {
                    if Some(index) != description {
                        if let Some(resource) =
                            graph.node_from_index(index).as_resource()
                        {
                            // Only resources some task actually produces
                            // (an incoming edge from a task) are owned
                            // by the build (§8 scenario 6: "outputs
                            // listed by T's outgoing explicit edges").
                            // Pure inputs are never deleted.
                            if txn.degree_in(index) > 0
                                && resource.status != crate::res::Status::Unknown
                            {
                                logger.delete(tid, resource)?;
                                if !dryrun {
                                    resource.delete(root)?;
                                }
                            }
                        }
                    }
                    Ok(true)
                },
                threads,
                true,
            )
            .map_err(crate::executor::ExecutionFailure::new);

        result?;

        if purge {
            drop(txn);
            if self.state_path.exists() {
                fs::remove_file(&self.state_path)
                    .with_context(|_| {
                        format!(
                            "failed removing state file {:?}",
                            self.state_path
                        )
                    })?;
            }
        } else {
            txn.commit()?;
        }

        Ok(())
    }

    /// Removes every vertex with no incident edges other than the
    /// reserved description resource (§9c, experimental).
    pub fn gc(&self) -> Result<usize, Error> {
        let mut txn = self.state.begin();
        let removed = txn.gc();
        txn.commit()?;
        Ok(removed.len())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }
}
