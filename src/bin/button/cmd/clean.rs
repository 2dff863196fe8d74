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

use structopt::StructOpt;

use button::logger::Console;
use button::{Build, Error};

use crate::opts::CommonOpts;
use crate::paths;

#[derive(StructOpt, Debug)]
pub struct Clean {
    #[structopt(flatten)]
    common: CommonOpts,

    /// Deletes the state file too.
    #[structopt(long = "purge")]
    purge: bool,
}

impl Clean {
    pub fn main(self) -> Result<(), Error> {
        let root = paths::root_dir(&self.common.file);
        let state_path = paths::state_path(&self.common.file);
        let build = Build::new(root, state_path)?;

        let logger = Console::new(self.common.verbose, self.common.color.into());

        build.clean(
            self.purge,
            self.common.dryrun,
            self.common.threads(),
            &logger,
        )
    }
}
