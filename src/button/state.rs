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

//! The durable, transactional vertex/edge/pending-set store (§4.1).
//!
//! `Graph<Vertex, EdgeType>` only ever gives out a mutable reference to a
//! node's adjacency lists, never to the node's own value (see
//! `graph::base::Graph::add_edge`'s use of `from_index_mut`) — so this
//! store keeps the graph purely for topology/identity (insertion order,
//! edges, degree) and holds the authoritative, current `Resource`/`Task`
//! content in its own side tables, `resources` and `tasks`, indexed by
//! the same `NodeIndex` the graph hands out. This mirrors the teacher's
//! own `checksums: HashMap<NodeIndex, ResourceState>` field.
//!
//! A write transaction locks the single in-memory `Inner` behind a
//! mutex (the "per-operation mutex pattern" of §4.1) and clones it up
//! front so `rollback` can cheaply restore the pre-transaction snapshot;
//! `commit` persists the mutated guard to disk, atomically, if the
//! store was opened against a path.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tempfile::NamedTempFile;

use crate::error::{BuildError, Error, ResultExt};
use crate::graph::{
    BuildGraph, EdgeType, Indexable, Neighbors, NodeIndex, Nodes, Vertex,
};
use crate::res::Resource;
use crate::task::Task;

#[derive(Serialize, Deserialize, Default, Clone)]
struct Inner {
    graph: BuildGraph,
    resources: HashMap<NodeIndex, Resource>,
    tasks: HashMap<NodeIndex, Task>,
    pending_resources: HashSet<NodeIndex>,
    pending_tasks: HashSet<NodeIndex>,
    /// The first resource ever inserted into this store, standing in
    /// for the reserved id=1 description resource (§3) without pinning
    /// a literal index value (see `DESIGN.md`, "Vertex id space").
    description: Option<NodeIndex>,
}

/// The persistent bipartite state store.
pub struct StateStore {
    inner: Mutex<Inner>,
    path: Option<PathBuf>,
}

impl StateStore {
    /// An empty, in-memory-only store.
    pub fn new() -> StateStore {
        StateStore {
            inner: Mutex::new(Inner::default()),
            path: None,
        }
    }

    /// Opens (or creates) a store backed by a file. A missing file or a
    /// version mismatch between the on-disk format and this build is
    /// treated the same as an empty store, forcing a full resync on the
    /// next `Syncer` pass.
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<StateStore, Error> {
        let path = path.into();

        let inner = match fs::File::open(&path) {
            Ok(f) => Self::read(io::BufReader::new(f)).with_context(|_| {
                format!(
                    "failed loading build state from file {:?}. Consider \
                     deleting the file and trying again.",
                    path
                )
            })?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Inner::default()
            }
            Err(err) => return Err(err.into()),
        };

        Ok(StateStore {
            inner: Mutex::new(inner),
            path: Some(path),
        })
    }

    fn read<R: io::Read>(mut reader: R) -> Result<Inner, bincode::Error> {
        let version: String = bincode::deserialize_from(&mut reader)?;

        if version != env!("CARGO_PKG_VERSION") {
            Ok(Inner::default())
        } else {
            bincode::deserialize_from(reader)
        }
    }

    fn write<W: io::Write>(
        inner: &Inner,
        mut writer: W,
    ) -> Result<(), bincode::Error> {
        bincode::serialize_into(&mut writer, env!("CARGO_PKG_VERSION"))?;
        bincode::serialize_into(writer, inner)
    }

    /// Begins a write (and read) transaction, blocking until any other
    /// in-flight transaction on this store has committed or rolled
    /// back. This is the outer begin/commit pair §4.1 asks for;
    /// individual operations below are just methods on the guard it
    /// returns.
    pub fn begin(&self) -> Transaction<'_> {
        let guard = self.inner.lock().unwrap();
        let snapshot = guard.clone();
        Transaction {
            store: self,
            guard,
            snapshot,
        }
    }
}

impl Default for StateStore {
    fn default() -> Self {
        StateStore::new()
    }
}

/// A single write transaction, obtained from [`StateStore::begin`]. Every
/// operation in §4.1's table is a method here; none of them commit to
/// disk on their own — call [`Transaction::commit`] or
/// [`Transaction::rollback`] when done.
pub struct Transaction<'a> {
    store: &'a StateStore,
    guard: MutexGuard<'a, Inner>,
    snapshot: Inner,
}

impl<'a> Transaction<'a> {
    /// Commits the transaction, atomically persisting it to disk (via a
    /// temp-file-then-rename in the same directory) if this store was
    /// opened against a path.
    pub fn commit(self) -> Result<(), Error> {
        if let Some(path) = &self.store.path {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));

            let mut tempfile = NamedTempFile::new_in(dir)
                .context("failed to create a temporary state file")?;

            StateStore::write(&self.guard, io::BufWriter::new(&mut tempfile))
                .with_context(|_| {
                    format!("failed writing build state to {:?}", path)
                })?;

            tempfile.persist(path).with_context(|_| {
                format!("failed writing build state to {:?}", path)
            })?;
        }

        Ok(())
    }

    /// Discards every mutation made in this transaction.
    pub fn rollback(self) {
        let Transaction {
            mut guard,
            snapshot,
            ..
        } = self;
        *guard = snapshot;
    }

    /// The reserved, always-present description resource, once the
    /// first resource has ever been added to this store.
    pub fn description(&self) -> Option<NodeIndex> {
        self.guard.description
    }

    /// A read-only view of the topology snapshot, for callers that need
    /// `Algo` trait methods (cycle detection, traversal, subgraphs)
    /// directly rather than through this transaction's own operations.
    pub fn graph(&self) -> &BuildGraph {
        &self.guard.graph
    }

    // -- resources --------------------------------------------------

    pub fn find_resource(&self, path: &str) -> Option<NodeIndex> {
        self.guard
            .graph
            .node_to_index(&Vertex::Resource(Resource::new(path)))
    }

    pub fn lookup_resource(&self, id: NodeIndex) -> Result<&Resource, Error> {
        self.guard
            .resources
            .get(&id)
            .ok_or_else(|| BuildError::InvalidEdge.into())
    }

    /// Inserts a brand new resource, failing if one with the same path
    /// already exists.
    pub fn put_resource(
        &mut self,
        resource: Resource,
    ) -> Result<NodeIndex, Error> {
        if self.find_resource(&resource.path).is_some() {
            return Err(BuildError::KeyConflict(resource.path).into());
        }
        Ok(self.add_resource(resource))
    }

    /// Inserts a resource if it doesn't already exist, returning its id
    /// either way.
    pub fn add_resource(&mut self, resource: Resource) -> NodeIndex {
        let id = self.guard.graph.add_node(Vertex::Resource(resource.clone()));
        self.guard.resources.entry(id).or_insert(resource);
        if self.guard.description.is_none() {
            self.guard.description = Some(id);
        }
        id
    }

    pub fn update_resource(&mut self, id: NodeIndex, value: Resource) {
        if let Some(slot) = self.guard.resources.get_mut(&id) {
            *slot = value;
        }
    }

    /// Removes a resource, cascading to its incident edges and pending
    /// membership. A no-op if the resource doesn't exist, or if it's
    /// the reserved description resource.
    pub fn remove_resource(&mut self, id: NodeIndex) {
        if Some(id) == self.guard.description {
            return;
        }
        self.guard.graph.remove_node(id);
        self.guard.resources.remove(&id);
        self.guard.pending_resources.remove(&id);
    }

    /// All resource ids in insertion order, excluding the description
    /// resource (§8: "enumerate<Resource>() yields resources with
    /// id>1").
    pub fn enumerate_resources(&self) -> Vec<NodeIndex> {
        self.guard
            .graph
            .nodes()
            .filter(|&i| self.guard.graph.node_from_index(i).as_resource().is_some())
            .filter(|&i| Some(i) != self.guard.description)
            .collect()
    }

    // -- tasks --------------------------------------------------------

    pub fn find_task(
        &self,
        commands: &[Vec<String>],
        working_directory: &str,
    ) -> Option<NodeIndex> {
        let probe =
            Task::new(commands.to_vec(), working_directory.to_string());
        self.guard.graph.node_to_index(&Vertex::Task(probe))
    }

    pub fn lookup_task(&self, id: NodeIndex) -> Result<&Task, Error> {
        self.guard
            .tasks
            .get(&id)
            .ok_or_else(|| BuildError::InvalidEdge.into())
    }

    pub fn put_task(&mut self, task: Task) -> Result<NodeIndex, Error> {
        if self
            .find_task(&task.commands, &task.working_directory)
            .is_some()
        {
            return Err(BuildError::KeyConflict(format!("{}", task)).into());
        }
        Ok(self.add_task(task))
    }

    pub fn add_task(&mut self, task: Task) -> NodeIndex {
        let id = self.guard.graph.add_node(Vertex::Task(task.clone()));
        self.guard.tasks.entry(id).or_insert(task);
        id
    }

    pub fn update_task(&mut self, id: NodeIndex, value: Task) {
        if let Some(slot) = self.guard.tasks.get_mut(&id) {
            *slot = value;
        }
    }

    pub fn remove_task(&mut self, id: NodeIndex) {
        self.guard.graph.remove_node(id);
        self.guard.tasks.remove(&id);
        self.guard.pending_tasks.remove(&id);
    }

    pub fn enumerate_tasks(&self) -> Vec<NodeIndex> {
        self.guard
            .graph
            .nodes()
            .filter(|&i| self.guard.graph.node_from_index(i).as_task().is_some())
            .collect()
    }

    // -- edges ----------------------------------------------------------

    fn edge_weight(&self, from: NodeIndex, to: NodeIndex) -> Option<EdgeType> {
        self.guard.graph.edge_to_index(&(from, to)).map(|e| {
            let (_, weight) = self.guard.graph.edge_from_index(e);
            *weight
        })
    }

    /// Inserts a new edge, failing if one already exists between this
    /// pair of vertices (regardless of type — the physical row is keyed
    /// on (from, to), with the type folded in; see [`Transaction::promote_edge`]
    /// for the upsert used internally by `Syncer`/`Executor`).
    pub fn put_edge(
        &mut self,
        from: NodeIndex,
        to: NodeIndex,
        ty: EdgeType,
    ) -> Result<(), Error> {
        if self.edge_weight(from, to).is_some() {
            return Err(BuildError::KeyConflict(format!(
                "edge {}->{}",
                from, to
            ))
            .into());
        }
        self.guard.graph.add_edge(from, to, ty);
        Ok(())
    }

    /// Folds `ty`'s origin into whatever edge already exists between
    /// `from` and `to`, or inserts it fresh. This is how the explicit
    /// and implicit edge sets are merged into `Both` (§3, §4.4) without
    /// every caller having to read-then-write.
    pub fn promote_edge(&mut self, from: NodeIndex, to: NodeIndex, ty: EdgeType) {
        let weight = match self.edge_weight(from, to) {
            Some(existing) => existing.promote(ty),
            None => ty,
        };
        self.guard.graph.add_edge(from, to, weight);
    }

    /// Removes one origin from the edge between `from` and `to`,
    /// demoting `Both` to the remaining origin rather than deleting it
    /// outright (§4.4's demotion rule). A no-op if no such edge exists.
    pub fn remove_edge(&mut self, from: NodeIndex, to: NodeIndex, ty: EdgeType) {
        let existing = match self.edge_weight(from, to) {
            Some(existing) => existing,
            None => return,
        };

        match existing.demote(ty) {
            Some(demoted) => {
                self.guard.graph.add_edge(from, to, demoted);
            }
            None => {
                if let Some(e) = self.guard.graph.edge_to_index(&(from, to)) {
                    self.guard.graph.remove_edge(e);
                }
            }
        }
    }

    /// An edge "exists" with type `ty` if it's recorded as exactly `ty`
    /// or as `Both` (which subsumes every origin).
    pub fn edge_exists(&self, from: NodeIndex, to: NodeIndex, ty: EdgeType) -> bool {
        match self.edge_weight(from, to) {
            Some(existing) => existing == ty || existing == EdgeType::Both,
            None => false,
        }
    }

    pub fn degree_in(&self, id: NodeIndex) -> usize {
        self.guard.graph.incoming(id).count()
    }

    pub fn degree_out(&self, id: NodeIndex) -> usize {
        self.guard.graph.outgoing(id).count()
    }

    pub fn outgoing(&self, id: NodeIndex) -> Vec<(NodeIndex, EdgeType)> {
        self.guard
            .graph
            .outgoing(id)
            .map(|(n, e)| (n, *self.guard.graph.edge_from_index(e).1))
            .collect()
    }

    pub fn incoming(&self, id: NodeIndex) -> Vec<(NodeIndex, EdgeType)> {
        self.guard
            .graph
            .incoming(id)
            .map(|(n, e)| (n, *self.guard.graph.edge_from_index(e).1))
            .collect()
    }

    // -- pending sets -----------------------------------------------

    pub fn add_pending_resource(&mut self, id: NodeIndex) {
        self.guard.pending_resources.insert(id);
    }

    pub fn remove_pending_resource(&mut self, id: NodeIndex) {
        self.guard.pending_resources.remove(&id);
    }

    pub fn is_pending_resource(&self, id: NodeIndex) -> bool {
        self.guard.pending_resources.contains(&id)
    }

    pub fn pending_resources(&self) -> Vec<NodeIndex> {
        self.guard.pending_resources.iter().cloned().collect()
    }

    pub fn add_pending_task(&mut self, id: NodeIndex) {
        self.guard.pending_tasks.insert(id);
    }

    pub fn remove_pending_task(&mut self, id: NodeIndex) {
        self.guard.pending_tasks.remove(&id);
    }

    pub fn is_pending_task(&self, id: NodeIndex) -> bool {
        self.guard.pending_tasks.contains(&id)
    }

    pub fn pending_tasks(&self) -> Vec<NodeIndex> {
        self.guard.pending_tasks.iter().cloned().collect()
    }

    // -- open questions resolved (§9) ---------------------------------

    /// Vertices with no incoming or outgoing edges (§9b).
    pub fn islands(&self) -> Vec<NodeIndex> {
        self.guard
            .graph
            .nodes()
            .filter(|&i| self.degree_in(i) == 0 && self.degree_out(i) == 0)
            .collect()
    }

    /// Experimental (§9c): removes every vertex with no incident edges,
    /// other than the reserved description resource, and returns the
    /// ids removed.
    pub fn gc(&mut self) -> Vec<NodeIndex> {
        let description = self.guard.description;

        let candidates: Vec<NodeIndex> = self
            .guard
            .graph
            .nodes()
            .filter(|&i| Some(i) != description)
            .filter(|&i| self.degree_in(i) == 0 && self.degree_out(i) == 0)
            .collect();

        for &id in &candidates {
            let is_task = self.guard.graph.node_from_index(id).as_task().is_some();
            if is_task {
                self.remove_task(id);
            } else {
                self.remove_resource(id);
            }
        }

        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_lookup_round_trips() {
        let store = StateStore::new();
        let mut txn = store.begin();

        let id = txn.put_resource(Resource::new("foo.c")).unwrap();
        assert_eq!(txn.lookup_resource(id).unwrap().path, "foo.c");
    }

    #[test]
    fn put_twice_conflicts() {
        let store = StateStore::new();
        let mut txn = store.begin();

        txn.put_resource(Resource::new("foo.c")).unwrap();
        assert!(txn.put_resource(Resource::new("foo.c")).is_err());
    }

    #[test]
    fn add_is_idempotent() {
        let store = StateStore::new();
        let mut txn = store.begin();

        let a = txn.add_resource(Resource::new("foo.c"));
        let b = txn.add_resource(Resource::new("foo.c"));
        assert_eq!(a, b);
    }

    #[test]
    fn first_resource_becomes_description() {
        let store = StateStore::new();
        let mut txn = store.begin();

        let id = txn.add_resource(Resource::new("BUILD"));
        assert_eq!(txn.description(), Some(id));

        let other = txn.add_resource(Resource::new("foo.c"));
        assert_eq!(txn.description(), Some(id));
        assert_ne!(txn.description(), Some(other));
    }

    #[test]
    fn remove_cascades_to_edges() {
        let store = StateStore::new();
        let mut txn = store.begin();

        let r = txn.add_resource(Resource::new("foo.c"));
        let t = txn.add_task(Task::new(vec![vec!["gcc".into()]], "/p".into()));
        txn.put_edge(r, t, EdgeType::Explicit).unwrap();
        assert_eq!(txn.degree_out(r), 1);

        txn.remove_task(t);
        assert_eq!(txn.degree_out(r), 0);
    }

    #[test]
    fn promote_then_demote_edge() {
        let store = StateStore::new();
        let mut txn = store.begin();

        let r = txn.add_resource(Resource::new("foo.c"));
        let t = txn.add_task(Task::new(vec![vec!["gcc".into()]], "/p".into()));

        txn.promote_edge(r, t, EdgeType::Explicit);
        txn.promote_edge(r, t, EdgeType::Implicit);
        assert!(txn.edge_exists(r, t, EdgeType::Explicit));
        assert!(txn.edge_exists(r, t, EdgeType::Implicit));

        txn.remove_edge(r, t, EdgeType::Implicit);
        assert!(txn.edge_exists(r, t, EdgeType::Explicit));
        assert!(!txn.edge_exists(r, t, EdgeType::Implicit));
    }

    #[test]
    fn enumerate_resources_skips_description() {
        let store = StateStore::new();
        let mut txn = store.begin();

        txn.add_resource(Resource::new("BUILD"));
        let other = txn.add_resource(Resource::new("foo.c"));

        assert_eq!(txn.enumerate_resources(), vec![other]);
    }

    #[test]
    fn pending_set_is_idempotent() {
        let store = StateStore::new();
        let mut txn = store.begin();

        let r = txn.add_resource(Resource::new("foo.c"));
        txn.add_pending_resource(r);
        txn.add_pending_resource(r);
        assert_eq!(txn.pending_resources().len(), 1);

        txn.remove_pending_resource(r);
        assert!(!txn.is_pending_resource(r));
    }

    #[test]
    fn rollback_discards_mutations() {
        let store = StateStore::new();

        {
            let mut txn = store.begin();
            txn.add_resource(Resource::new("foo.c"));
            txn.rollback();
        }

        let txn = store.begin();
        assert!(txn.find_resource("foo.c").is_none());
    }

    #[test]
    fn islands_and_gc_ignore_the_description_resource() {
        let store = StateStore::new();
        let mut txn = store.begin();

        let description = txn.add_resource(Resource::new("BUILD"));
        let orphan = txn.add_resource(Resource::new("unused.txt"));

        let islands = txn.islands();
        assert!(islands.contains(&description));
        assert!(islands.contains(&orphan));

        let removed = txn.gc();
        assert!(removed.contains(&orphan));
        assert!(!removed.contains(&description));
        assert!(txn.lookup_resource(description).is_ok());
        assert!(txn.lookup_resource(orphan).is_err());
    }
}
