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

//! Well-known paths, resolved relative to a given build description.
//!
//! Unlike the `.button/` directory the teacher keeps its state and logs
//! in, this crate's state file convention (§6) is `<description>.state`
//! sitting next to the description itself, so there's no directory to
//! initialize up front.

use std::path::{Path, PathBuf};

/// Path to the state file for a given build description, per §6's
/// "`<description>.state` by convention".
pub fn state_path(description: &Path) -> PathBuf {
    let mut name = description
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "BUILD".into());
    name.push(".state");
    description
        .parent()
        .map(|p| p.join(&name))
        .unwrap_or_else(|| PathBuf::from(&name))
}

/// The root tasks run relative to: the directory the description lives
/// in.
pub fn root_dir(description: &Path) -> &Path {
    description.parent().unwrap_or_else(|| Path::new("."))
}
