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

//! A discard-everything [`EventLogger`], for embedders that don't want
//! build progress on the terminal (tests, library consumers driving
//! their own UI).

use std::io;

use crate::error::Error;
use crate::res::Resource;
use crate::task::Task;

use super::traits::{EventLogger, LogResult, TaskLogger};

/// Discards every event. `Console` is the CLI's choice; this is for
/// anything embedding `button` as a library without its own reporting.
#[derive(Debug, Default, Clone, Copy)]
pub struct Null;

impl io::Write for Null {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl TaskLogger for Null {
    fn finish(self, _result: &Result<(), Error>) -> LogResult<()> {
        Ok(())
    }
}

impl EventLogger for Null {
    type TaskLogger = Null;

    fn begin_build(&mut self, _threads: usize) -> LogResult<()> {
        Ok(())
    }

    fn end_build(&mut self, _result: &Result<(), Error>) -> LogResult<()> {
        Ok(())
    }

    fn start_task(&self, _thread: usize, _task: &Task) -> Result<Null, Error> {
        Ok(Null)
    }

    fn delete(&self, _thread: usize, _resource: &Resource) -> LogResult<()> {
        Ok(())
    }
}
