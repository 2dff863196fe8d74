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

//! Reconciles a freshly parsed rule set against a [`StateStore`] (§4.3).
//!
//! `sync` is the only entry point. It runs entirely within one write
//! transaction: fingerprint the description, diff the declared vertices
//! against whatever is currently explicit, apply the additions and
//! removals, then re-scan every surviving resource. Implicit edges are
//! untouched here — that's the executor's job once it has actually run
//! something.

use std::collections::BTreeSet;
use std::path::Path;

use crate::change::{self, Tag};
use crate::error::Error;
use crate::graph::{EdgeType, NodeIndex};
use crate::res::{Resource, Status};
use crate::rules::Rules;
use crate::state::Transaction;
use crate::task::Task;
use crate::util::Sha256;

/// Runs the full reconciliation described in §4.3 against `txn`.
///
/// `description_path` and `description_bytes` are the natural key and
/// content of the description resource (id=1); `rules` is the freshly
/// parsed rule set to reconcile against; `root` is the directory
/// resource paths are resolved relative to when rescanning.
pub fn sync(
    txn: &mut Transaction<'_>,
    description_path: &str,
    description_bytes: &[u8],
    rules: &Rules,
    root: &Path,
) -> Result<(), Error> {
    sync_description(txn, description_path, description_bytes)?;
    sync_vertices_and_edges(txn, rules);
    rescan_resources(txn, root)?;
    Ok(())
}

/// Step 1: fingerprints the description and marks it pending iff the
/// fingerprint changed.
fn sync_description(
    txn: &mut Transaction<'_>,
    path: &str,
    bytes: &[u8],
) -> Result<(), Error> {
    let fingerprint = Sha256::from_reader(bytes)?;

    let id = match txn.find_resource(path) {
        Some(id) => id,
        None => txn.add_resource(Resource::new(path)),
    };

    let changed = match txn.lookup_resource(id) {
        Ok(resource) => resource.checksum.as_ref() != Some(&fingerprint),
        Err(_) => true,
    };

    txn.update_resource(
        id,
        Resource {
            path: path.to_string(),
            status: Status::File,
            checksum: Some(fingerprint),
        },
    );

    if changed {
        txn.add_pending_resource(id);
    }

    Ok(())
}

/// A vertex currently has an explicit edge if any edge touching it is
/// `Explicit` or `Both` — an `Implicit`-only vertex isn't part of the
/// declared rule graph.
fn has_explicit_edge(txn: &Transaction<'_>, id: NodeIndex) -> bool {
    txn.outgoing(id).iter().any(|&(_, ty)| ty != EdgeType::Implicit)
        || txn.incoming(id).iter().any(|&(_, ty)| ty != EdgeType::Implicit)
}

/// Steps 2-4: diffs declared vertices/edges against the currently
/// explicit ones and applies the additions and removals.
fn sync_vertices_and_edges(txn: &mut Transaction<'_>, rules: &Rules) {
    let mut declared_resources: BTreeSet<Resource> = BTreeSet::new();
    let mut declared_tasks: BTreeSet<Task> = BTreeSet::new();

    for rule in rules.iter() {
        declared_tasks.insert(rule.task.clone());
        for path in rule.inputs.iter().chain(rule.outputs.iter()) {
            declared_resources.insert(Resource::new(path.clone()));
        }
    }

    let current_resources: BTreeSet<Resource> = txn
        .enumerate_resources()
        .into_iter()
        .filter(|&id| has_explicit_edge(txn, id))
        .map(|id| {
            txn.lookup_resource(id)
                .expect("id returned by enumerate_resources")
                .clone()
        })
        .collect();

    let current_tasks: BTreeSet<Task> = txn
        .enumerate_tasks()
        .into_iter()
        .filter(|&id| has_explicit_edge(txn, id))
        .map(|id| {
            txn.lookup_task(id)
                .expect("id returned by enumerate_tasks")
                .clone()
        })
        .collect();

    // Additions and unchanged: every declared vertex is (re)inserted,
    // which is idempotent for the ones that already exist. Only the
    // ones tagged `Added` are freshly marked pending.
    for change in change::diff(current_resources.clone(), declared_resources.clone())
        .filter(|c| c.tag != Tag::Removed)
    {
        let id = txn.add_resource(change.value);
        if change.tag == Tag::Added {
            txn.add_pending_resource(id);
        }
    }

    for change in change::diff(current_tasks.clone(), declared_tasks.clone())
        .filter(|c| c.tag != Tag::Removed)
    {
        let id = txn.add_task(change.value);
        if change.tag == Tag::Added {
            txn.add_pending_task(id);
        }
    }

    // Declare the explicit edges for every surviving rule.
    for rule in rules.iter() {
        let task_id = txn
            .find_task(&rule.task.commands, &rule.task.working_directory)
            .expect("task was just inserted above");

        for path in &rule.inputs {
            let resource_id =
                txn.find_resource(path).expect("resource was just inserted above");
            txn.promote_edge(resource_id, task_id, EdgeType::Explicit);
        }

        for path in &rule.outputs {
            let resource_id =
                txn.find_resource(path).expect("resource was just inserted above");
            txn.promote_edge(task_id, resource_id, EdgeType::Explicit);
        }
    }

    // Removals: vertices no longer declared lose their explicit-origin
    // edges; if nothing else references them, they're dropped entirely.
    for change in change::diff(current_resources, declared_resources) {
        if change.tag != Tag::Removed {
            continue;
        }
        if let Some(id) = txn.find_resource(&change.value.path) {
            demote_explicit_edges(txn, id);
            if txn.degree_in(id) == 0 && txn.degree_out(id) == 0 {
                txn.remove_resource(id);
            }
        }
    }

    for change in change::diff(current_tasks, declared_tasks) {
        if change.tag != Tag::Removed {
            continue;
        }
        if let Some(id) =
            txn.find_task(&change.value.commands, &change.value.working_directory)
        {
            demote_explicit_edges(txn, id);
            if txn.degree_in(id) == 0 && txn.degree_out(id) == 0 {
                txn.remove_task(id);
            }
        }
    }
}

/// Removes the explicit origin from every edge touching `id`, demoting
/// `Both` edges to `Implicit` rather than deleting them outright.
fn demote_explicit_edges(txn: &mut Transaction<'_>, id: NodeIndex) {
    for (other, ty) in txn.outgoing(id) {
        if ty != EdgeType::Implicit {
            txn.remove_edge(id, other, EdgeType::Explicit);
        }
    }
    for (other, ty) in txn.incoming(id) {
        if ty != EdgeType::Implicit {
            txn.remove_edge(other, id, EdgeType::Explicit);
        }
    }
}

/// Step 5: re-scans every surviving resource and marks changed ones
/// pending.
fn rescan_resources(txn: &mut Transaction<'_>, root: &Path) -> Result<(), Error> {
    for id in txn.enumerate_resources() {
        let resource = txn.lookup_resource(id)?.clone();
        let (status, checksum) = resource.scan(root)?;

        if status != resource.status || checksum != resource.checksum {
            txn.update_resource(
                id,
                Resource {
                    status,
                    checksum,
                    ..resource
                },
            );
            txn.add_pending_resource(id);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateStore;

    fn rule_json() -> &'static str {
        r#"[{
            "task": {"commands": [["gcc", "-c", "foo.c", "-o", "foo.o"]], "working_directory": "/p"},
            "inputs": ["foo.c"],
            "outputs": ["foo.o"]
        }]"#
    }

    #[test]
    fn fresh_sync_adds_rule_vertices_and_marks_them_pending() {
        let store = StateStore::new();
        let mut txn = store.begin();
        let rules = Rules::from_str(rule_json()).unwrap();

        sync(&mut txn, "BUILD", b"description v1", &rules, Path::new("/nonexistent-root")).unwrap();

        let foo_c = txn.find_resource("foo.c").unwrap();
        let foo_o = txn.find_resource("foo.o").unwrap();
        let task = txn
            .find_task(&[vec!["gcc".into(), "-c".into(), "foo.c".into(), "-o".into(), "foo.o".into()]], "/p")
            .unwrap();

        assert!(txn.is_pending_resource(foo_c));
        assert!(txn.is_pending_resource(foo_o));
        assert!(txn.is_pending_task(task));
        assert!(txn.edge_exists(foo_c, task, EdgeType::Explicit));
        assert!(txn.edge_exists(task, foo_o, EdgeType::Explicit));

        let description = txn.find_resource("BUILD").unwrap();
        assert!(txn.is_pending_resource(description));
    }

    #[test]
    fn resyncing_unchanged_rules_is_idempotent() {
        let store = StateStore::new();
        let mut txn = store.begin();
        let rules = Rules::from_str(rule_json()).unwrap();

        sync(&mut txn, "BUILD", b"description v1", &rules, Path::new("/nonexistent-root")).unwrap();

        let task = txn
            .find_task(&[vec!["gcc".into(), "-c".into(), "foo.c".into(), "-o".into(), "foo.o".into()]], "/p")
            .unwrap();
        txn.remove_pending_task(task);
        let foo_c = txn.find_resource("foo.c").unwrap();
        txn.remove_pending_resource(foo_c);
        let foo_o = txn.find_resource("foo.o").unwrap();
        txn.remove_pending_resource(foo_o);
        let description = txn.find_resource("BUILD").unwrap();
        txn.remove_pending_resource(description);

        sync(&mut txn, "BUILD", b"description v1", &rules, Path::new("/nonexistent-root")).unwrap();

        assert!(!txn.is_pending_task(task));
        assert!(!txn.is_pending_resource(foo_c));
        assert!(!txn.is_pending_resource(foo_o));
        assert!(!txn.is_pending_resource(description));
    }

    #[test]
    fn changed_description_marks_it_pending_again() {
        let store = StateStore::new();
        let mut txn = store.begin();
        let rules = Rules::from_str(rule_json()).unwrap();

        sync(&mut txn, "BUILD", b"description v1", &rules, Path::new("/nonexistent-root")).unwrap();
        let description = txn.find_resource("BUILD").unwrap();
        txn.remove_pending_resource(description);

        sync(&mut txn, "BUILD", b"description v2", &rules, Path::new("/nonexistent-root")).unwrap();

        assert!(txn.is_pending_resource(description));
    }

    #[test]
    fn removed_rule_drops_its_resources_and_task() {
        let store = StateStore::new();
        let mut txn = store.begin();
        let rules = Rules::from_str(rule_json()).unwrap();
        sync(&mut txn, "BUILD", b"v1", &rules, Path::new("/nonexistent-root")).unwrap();

        let empty = Rules::new(vec![]).unwrap();
        sync(&mut txn, "BUILD", b"v1", &empty, Path::new("/nonexistent-root")).unwrap();

        assert!(txn.find_resource("foo.c").is_none());
        assert!(txn.find_resource("foo.o").is_none());
        assert!(txn
            .find_task(&[vec!["gcc".into(), "-c".into(), "foo.c".into(), "-o".into(), "foo.o".into()]], "/p")
            .is_none());

        // The description resource itself is reserved and always
        // survives.
        assert!(txn.find_resource("BUILD").is_some());
    }

    #[test]
    fn removed_resource_with_a_surviving_implicit_edge_is_kept() {
        let store = StateStore::new();
        let mut txn = store.begin();
        let rules = Rules::from_str(rule_json()).unwrap();
        sync(&mut txn, "BUILD", b"v1", &rules, Path::new("/nonexistent-root")).unwrap();

        let foo_c = txn.find_resource("foo.c").unwrap();
        let task = txn
            .find_task(&[vec!["gcc".into(), "-c".into(), "foo.c".into(), "-o".into(), "foo.o".into()]], "/p")
            .unwrap();
        // Simulate the executor having also observed this as an
        // implicit dependency.
        txn.promote_edge(foo_c, task, EdgeType::Implicit);

        let empty = Rules::new(vec![]).unwrap();
        sync(&mut txn, "BUILD", b"v1", &empty, Path::new("/nonexistent-root")).unwrap();

        // The explicit origin is gone but the vertex survives because
        // the implicit edge still references it.
        assert!(txn.find_resource("foo.c").is_some());
        assert!(!txn.edge_exists(foo_c, task, EdgeType::Explicit));
        assert!(txn.edge_exists(foo_c, task, EdgeType::Implicit));
    }

    #[test]
    fn rescan_marks_a_changed_resource_pending() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("foo.c"), b"int main() {}").unwrap();

        let store = StateStore::new();
        let mut txn = store.begin();
        let rules = Rules::from_str(rule_json()).unwrap();
        sync(&mut txn, "BUILD", b"v1", &rules, dir.path()).unwrap();

        let foo_c = txn.find_resource("foo.c").unwrap();
        txn.remove_pending_resource(foo_c);
        assert_eq!(txn.lookup_resource(foo_c).unwrap().status, Status::File);

        std::fs::write(dir.path().join("foo.c"), b"int main() { return 1; }").unwrap();

        sync(&mut txn, "BUILD", b"v1", &rules, dir.path()).unwrap();

        assert!(txn.is_pending_resource(foo_c));
    }
}
