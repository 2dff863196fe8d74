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

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/// A blocking FIFO ready-queue shared by the worker pool.
///
/// Section 5 promises no ordering between independent tasks, so unlike
/// the teacher's random-pop queue this one is a plain FIFO: it needs no
/// RNG, and popping in submission order is just as valid a linearization
/// of "no ordering guaranteed" as popping randomly is.
#[derive(Default)]
pub struct ReadyQueue<T> {
    cvar: Condvar,
    queue: Mutex<VecDeque<T>>,
}

impl<T> ReadyQueue<T> {
    pub fn new() -> ReadyQueue<T> {
        ReadyQueue {
            cvar: Condvar::new(),
            queue: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push(&self, value: T) {
        self.queue.lock().unwrap().push_back(value);
        self.cvar.notify_one();
    }

    pub fn push_many<I>(&self, values: I) -> usize
    where
        I: Iterator<Item = T>,
    {
        let mut queue = self.queue.lock().unwrap();
        let mut count = 0;

        for v in values {
            queue.push_back(v);
            count += 1;
        }

        self.cvar.notify_all();

        count
    }

    /// Pops the oldest element. Blocks if the queue is empty.
    pub fn pop(&self) -> T {
        let mut queue = self.queue.lock().unwrap();

        while queue.is_empty() {
            queue = self.cvar.wait(queue).unwrap();
        }

        queue.pop_front().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn pop_blocks_until_pushed() {
        let queue = Arc::new(ReadyQueue::new());
        let q = queue.clone();

        let handle = thread::spawn(move || q.pop());

        queue.push(42);

        assert_eq!(handle.join().unwrap(), 42);
    }

    #[test]
    fn fifo_order_preserved() {
        let queue = ReadyQueue::new();
        queue.push(1);
        queue.push(2);
        queue.push(3);

        assert_eq!(queue.pop(), 1);
        assert_eq!(queue.pop(), 2);
        assert_eq!(queue.pop(), 3);
    }
}
