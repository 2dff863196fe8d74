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
use std::io::{self, Write};
use std::path::PathBuf;

use structopt::StructOpt;

use button::{Error, ResultExt, Rules};

/// Reads a build description and re-serializes it as pretty-printed
/// JSON, canonicalizing whitespace and key order.
#[derive(StructOpt, Debug)]
pub struct Convert {
    /// Path of the build description to read.
    #[structopt(
        long = "file",
        short = "f",
        parse(from_os_str),
        default_value = "BUILD"
    )]
    file: PathBuf,

    /// Writes the result here instead of stdout.
    #[structopt(long = "output", short = "o", parse(from_os_str))]
    output: Option<PathBuf>,
}

impl Convert {
    pub fn main(self) -> Result<(), Error> {
        let rules = Rules::from_path(&self.file)
            .with_context(|_| format!("failed reading build description {:?}", self.file))?;

        let json = serde_json::to_string_pretty(&rules.iter().collect::<Vec<_>>())
            .context("failed serializing build description")?;

        match &self.output {
            Some(path) => {
                fs::write(path, json.as_bytes())
                    .with_context(|_| format!("failed writing {:?}", path))?;
            }
            None => {
                io::stdout().write_all(json.as_bytes())?;
                io::stdout().write_all(b"\n")?;
            }
        }

        Ok(())
    }
}
