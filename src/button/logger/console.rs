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

//! Prints build progress to the terminal.
//!
//! Per-task output is buffered (one [`ConsoleTask`] per in-flight task) and
//! flushed as a single, uninterrupted chunk once the task finishes, so
//! output from concurrent workers never interleaves mid-line. A spinner
//! (via `indicatif`) ticks once per task started and is cleared once the
//! build ends; diagnostic tracing below the build-event level goes
//! through the `log` facade instead, the way the rest of the crate does.

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Instant;

use humantime::format_duration;
use indicatif::{ProgressBar, ProgressStyle};
use termcolor as tc;
use termcolor::WriteColor;

use crate::error::Error;
use crate::res::Resource;
use crate::task::Task;

use super::traits::{EventLogger, LogResult, TaskLogger};

pub struct ConsoleTask {
    verbose: bool,
    bufwriter: Arc<tc::BufferWriter>,
    buf: tc::Buffer,
    start_time: Instant,
}

impl ConsoleTask {
    fn new(
        verbose: bool,
        thread: usize,
        task: &Task,
        bufwriter: Arc<tc::BufferWriter>,
    ) -> Result<ConsoleTask, Error> {
        let mut buf = bufwriter.buffer();

        buf.set_color(
            tc::ColorSpec::new()
                .set_fg(Some(tc::Color::Green))
                .set_bold(true),
        )?;
        write!(&mut buf, "[{}] {}", thread, task)?;
        buf.reset()?;
        buf.write_all(b"\n")?;

        Ok(ConsoleTask {
            verbose,
            bufwriter,
            buf,
            start_time: Instant::now(),
        })
    }
}

impl io::Write for ConsoleTask {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.buf.write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl TaskLogger for ConsoleTask {
    fn finish(self, result: &Result<(), Error>) -> LogResult<()> {
        let ConsoleTask {
            verbose,
            bufwriter,
            mut buf,
            start_time,
        } = self;

        let duration = start_time.elapsed();

        if !buf.as_slice().ends_with(b"\n") {
            buf.write_all(b"\n")?;
        }

        if verbose {
            buf.set_color(tc::ColorSpec::new().set_fg(Some(tc::Color::Blue)))?;
            write!(&mut buf, "Task duration")?;
            buf.reset()?;
            writeln!(&mut buf, ": {}", format_duration(duration))?;
        }

        if let Err(err) = result {
            let mut red_fg = tc::ColorSpec::new();
            red_fg.set_fg(Some(tc::Color::Red));

            let mut errors = err.iter_chain();

            if let Some(err) = errors.next() {
                buf.set_color(&red_fg)?;
                write!(&mut buf, "    Error")?;
                buf.reset()?;
                writeln!(&mut buf, ": {}", err)?;
            }

            for err in errors {
                buf.set_color(&red_fg)?;
                write!(&mut buf, "Caused by")?;
                buf.reset()?;
                writeln!(&mut buf, ": {}", err)?;
            }
        }

        bufwriter.print(&buf)?;

        Ok(())
    }
}

/// Logs build events to stdout, buffering each task's output so that
/// concurrent tasks don't interleave mid-line.
pub struct Console {
    verbose: bool,
    start_time: Instant,
    bufwriter: Arc<tc::BufferWriter>,
    progress: ProgressBar,
}

impl Console {
    pub fn new(verbose: bool, color: tc::ColorChoice) -> Console {
        let color = if color == tc::ColorChoice::Auto
            && !atty::is(atty::Stream::Stdout)
        {
            tc::ColorChoice::Never
        } else {
            color
        };

        let progress = ProgressBar::new_spinner();
        progress.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner} {msg} ({pos} tasks)"),
        );
        progress.set_draw_target(indicatif::ProgressDrawTarget::hidden());

        Console {
            verbose,
            bufwriter: Arc::new(tc::BufferWriter::stdout(color)),
            start_time: Instant::now(),
            progress,
        }
    }
}

impl EventLogger for Console {
    type TaskLogger = ConsoleTask;

    fn begin_build(&mut self, threads: usize) -> LogResult<()> {
        self.start_time = Instant::now();
        self.progress.set_message("building");
        self.progress
            .set_draw_target(indicatif::ProgressDrawTarget::stderr());
        log::debug!("starting build with {} worker threads", threads);
        Ok(())
    }

    fn end_build(&mut self, result: &Result<(), Error>) -> LogResult<()> {
        self.progress.finish_and_clear();
        println!("Build duration: {}", format_duration(self.start_time.elapsed()));
        if let Err(err) = result {
            log::error!("build failed: {}", err);
        }
        Ok(())
    }

    fn start_task(
        &self,
        thread: usize,
        task: &Task,
    ) -> Result<ConsoleTask, Error> {
        self.progress.inc(1);
        ConsoleTask::new(self.verbose, thread, task, self.bufwriter.clone())
    }

    fn delete(&self, thread: usize, resource: &Resource) -> LogResult<()> {
        log::info!("[{}] deleting {}", thread, resource);
        Ok(())
    }
}
