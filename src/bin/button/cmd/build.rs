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

use std::fs;

use structopt::StructOpt;

use button::logger::Console;
use button::runner::ProcessRunner;
use button::{Build, Error, ResultExt, Rules};

use crate::opts::CommonOpts;
use crate::paths;

#[derive(StructOpt, Debug)]
pub struct BuildCmd {
    #[structopt(flatten)]
    common: CommonOpts,

    /// Watches `--watchdir` for changes and rebuilds automatically.
    /// Left unimplemented here: the filesystem-watch autopilot loop is
    /// an external collaborator, not part of this engine.
    #[structopt(long = "autopilot")]
    autopilot: bool,

    /// Directory to watch when `--autopilot` is given.
    #[structopt(long = "watchdir", parse(from_os_str))]
    watchdir: Option<std::path::PathBuf>,

    /// Milliseconds to wait after a change before rebuilding.
    #[structopt(long = "delay", default_value = "100")]
    delay: u64,
}

impl BuildCmd {
    pub fn main(self) -> Result<(), Error> {
        if self.autopilot {
            return Err(button::error::BuildError::Other(
                "--autopilot requires an external filesystem-watch \
                 collaborator that this crate does not provide"
                    .to_string(),
            )
            .into());
        }

        let bytes = fs::read(&self.common.file).with_context(|_| {
            format!("failed reading build description {:?}", self.common.file)
        })?;
        let rules = Rules::from_str(&String::from_utf8_lossy(&bytes))?;

        let root = paths::root_dir(&self.common.file);
        let state_path = paths::state_path(&self.common.file);
        let build = Build::new(root, state_path)?;

        let runner = ProcessRunner;
        let mut logger = Console::new(self.common.verbose, self.common.color.into());

        let description_path = self.common.file.to_string_lossy().into_owned();

        build.build(
            &description_path,
            &bytes,
            &rules,
            &runner,
            self.common.dryrun,
            self.common.threads(),
            &mut logger,
        )
    }
}
