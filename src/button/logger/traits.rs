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

use std::io;

use crate::error::Error;
use crate::res::Resource;
use crate::task::Task;

/// A log result represents the result of the logging operation itself, as
/// opposed to the build event being reported.
pub type LogResult<T> = Result<T, Error>;

/// Per-task output, buffered and flushed once the task finishes.
pub trait TaskLogger: io::Write {
    fn finish(self, result: &Result<(), Error>) -> LogResult<()>;
}

/// Where build events get sent; the logger decides how (or whether) to
/// display them. `start_task`/`delete` run concurrently from executor
/// worker threads, so they only ever need `&self`; `begin_build`/
/// `end_build` bracket the whole build from the single-threaded facade.
pub trait EventLogger: Send + Sync {
    type TaskLogger: TaskLogger;

    fn begin_build(&mut self, threads: usize) -> LogResult<()>;

    fn end_build(&mut self, result: &Result<(), Error>) -> LogResult<()>;

    fn start_task(
        &self,
        thread: usize,
        task: &Task,
    ) -> Result<Self::TaskLogger, Error>;

    fn delete(&self, thread: usize, resource: &Resource) -> LogResult<()>;
}
