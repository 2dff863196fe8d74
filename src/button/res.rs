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

//! Resources: externally observable artifacts tracked by path and content
//! fingerprint (§3).
//!
//! A [`Resource`] is kept deliberately asymmetric: `path` is its identity
//! (what makes two resources the same vertex), while `status` and
//! `checksum` are mutable content that changes every time the filesystem
//! is rescanned. [`StateStore`](crate::state::StateStore) relies on this
//! split — it looks resources up and diffs them by `path` alone (`Eq`,
//! `Hash`, and `Ord` below only ever look at that field), and keeps the
//! authoritative, current `status`/`checksum` in its own side table
//! rather than trying to mutate a value embedded in the graph.

use std::cmp::Ordering;
use std::fmt;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io;
use std::path::Path;

use sha2::Digest;

use crate::util::Sha256;

/// What a resource was last observed to be.
#[derive(
    Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd,
)]
pub enum Status {
    /// Never scanned.
    Unknown,
    /// A regular file.
    File,
    /// A directory.
    Directory,
    /// Does not exist.
    Missing,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Unknown => write!(f, "unknown"),
            Status::File => write!(f, "file"),
            Status::Directory => write!(f, "directory"),
            Status::Missing => write!(f, "missing"),
        }
    }
}

/// An externally observable artifact, typically a file path.
///
/// `checksum` is only meaningful when `status == Status::File`; it is
/// `None` otherwise, per §3 ("empty when status ≠ file").
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Resource {
    pub path: String,
    pub status: Status,
    pub checksum: Option<Sha256>,
}

impl Resource {
    /// A freshly declared resource: unknown status, no checksum, per the
    /// Syncer's "resources get status=unknown, empty checksum" rule.
    pub fn new<S: Into<String>>(path: S) -> Resource {
        Resource {
            path: path.into(),
            status: Status::Unknown,
            checksum: None,
        }
    }

    /// Scans the filesystem under `root` and returns the resource's
    /// current (status, checksum). If a file, the checksum is of its
    /// contents; if a directory, of the sorted list of its entry names
    /// (so adding or removing an entry changes the checksum); if
    /// missing, the checksum is `None`.
    pub fn scan(&self, root: &Path) -> io::Result<(Status, Option<Sha256>)> {
        let path = root.join(&self.path);

        let metadata = match fs::symlink_metadata(&path) {
            Ok(m) => m,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok((Status::Missing, None));
            }
            Err(err) => return Err(err),
        };

        if metadata.is_dir() {
            let mut names: Vec<_> = fs::read_dir(&path)?
                .map(|entry| entry.map(|e| e.file_name()))
                .collect::<io::Result<_>>()?;
            names.sort();

            let mut hasher = sha2::Sha256::default();
            for name in &names {
                if let Some(name) = name.to_str() {
                    hasher.input(name.as_bytes());
                }
            }

            Ok((Status::Directory, Some(hasher.result().into())))
        } else {
            let checksum = Sha256::from_path(&path)?;
            Ok((Status::File, Some(checksum)))
        }
    }

    /// Deletes the resource from disk. A missing file is not an error;
    /// a non-empty directory is ignored rather than treated as fatal,
    /// since an untracked file inside it is common and not the build's
    /// fault.
    pub fn delete(&self, root: &Path) -> io::Result<()> {
        let path = root.join(&self.path);

        let metadata = match fs::symlink_metadata(&path) {
            Ok(m) => m,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err),
        };

        if metadata.is_dir() {
            let _ = fs::remove_dir(&path);
            Ok(())
        } else {
            fs::remove_file(&path)
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Resource) -> bool {
        self.path == other.path
    }
}

impl Eq for Resource {}

impl Hash for Resource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state)
    }
}

impl Ord for Resource {
    fn cmp(&self, other: &Resource) -> Ordering {
        self.path.cmp(&other.path)
    }
}

impl PartialOrd for Resource {
    fn partial_cmp(&self, other: &Resource) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_path_only() {
        let a = Resource::new("foo.c");
        let mut b = Resource::new("foo.c");
        b.status = Status::File;
        b.checksum = Some(Sha256::default());
        assert_eq!(a, b);
    }

    #[test]
    fn scan_missing_is_not_an_error() {
        let r = Resource::new("does-not-exist-xyz");
        let (status, checksum) = r.scan(Path::new("/")).unwrap();
        assert_eq!(status, Status::Missing);
        assert!(checksum.is_none());
    }
}
