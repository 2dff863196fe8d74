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

use crate::cmd::Command;

#[derive(StructOpt, Debug)]
#[structopt(name = "button")]
pub struct Args {
    #[structopt(subcommand)]
    cmd: Command,
}

impl Args {
    /// Runs the selected subcommand, printing the full error chain on
    /// failure and returning the process exit code (§6/§7).
    pub fn main(self) -> i32 {
        match self.cmd.main() {
            Ok(()) => 0,
            Err(err) => {
                let mut errors = err.iter_chain();

                if let Some(err) = errors.next() {
                    eprintln!("error: {}", err);
                }

                for err in errors {
                    eprintln!("caused by: {}", err);
                }

                1
            }
        }
    }
}
