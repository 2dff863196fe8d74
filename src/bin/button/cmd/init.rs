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
use std::path::PathBuf;

use structopt::StructOpt;

use button::error::BuildError;
use button::{Error, ResultExt};

const TEMPLATE: &str = r#"[
    {
        "task": {
            "commands": [["echo", "hello, world"]],
            "working_directory": "."
        },
        "inputs": [],
        "outputs": []
    }
]
"#;

/// Writes a template build description, refusing to clobber one that's
/// already there.
#[derive(StructOpt, Debug)]
pub struct Init {
    /// Path of the build description to create.
    #[structopt(
        long = "file",
        short = "f",
        parse(from_os_str),
        default_value = "BUILD"
    )]
    file: PathBuf,
}

impl Init {
    pub fn main(self) -> Result<(), Error> {
        if self.file.exists() {
            return Err(BuildError::Other(format!(
                "{:?} already exists, refusing to overwrite it",
                self.file
            ))
            .into());
        }

        fs::write(&self.file, TEMPLATE)
            .with_context(|_| format!("failed writing {:?}", self.file))?;

        println!("created {:?}", self.file);

        Ok(())
    }
}
