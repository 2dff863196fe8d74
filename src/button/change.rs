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

//! Linear-time diffing of two sorted streams.
//!
//! Both Syncer (vertices and edges against the rule set) and Executor
//! (observed reads/writes against recorded implicit edges) need the same
//! primitive: given two sorted sequences, walk them together and report
//! what's new, what's gone, and what's unchanged, without ever sorting or
//! hashing either side.

use std::cmp::Ordering;
use std::iter::Peekable;

/// Tag describing where a value in a [`Change`] stream came from.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Tag {
    /// Present in both streams.
    None,
    /// Present only in `next`.
    Added,
    /// Present only in `prev`.
    Removed,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Change<T> {
    pub value: T,
    pub tag: Tag,
}

/// Diffs two sorted, forward-iterable sequences in O(|prev| + |next|).
///
/// Both `prev` and `next` must already be sorted under the same order `T`
/// implements; this is not checked. When the fronts of both streams
/// compare equal, one `Tag::None` item is emitted and both sides advance;
/// otherwise the smaller front advances alone, tagged `Added` (it came
/// from `next` only) or `Removed` (it came from `prev` only).
pub struct Diff<T, P, N>
where
    P: Iterator<Item = T>,
    N: Iterator<Item = T>,
{
    prev: Peekable<P>,
    next: Peekable<N>,
}

pub fn diff<T, P, N>(prev: P, next: N) -> Diff<T, P::IntoIter, N::IntoIter>
where
    P: IntoIterator<Item = T>,
    N: IntoIterator<Item = T>,
{
    Diff {
        prev: prev.into_iter().peekable(),
        next: next.into_iter().peekable(),
    }
}

impl<T, P, N> Iterator for Diff<T, P, N>
where
    T: Ord,
    P: Iterator<Item = T>,
    N: Iterator<Item = T>,
{
    type Item = Change<T>;

    fn next(&mut self) -> Option<Self::Item> {
        match (self.prev.peek(), self.next.peek()) {
            (None, None) => None,
            (Some(_), None) => self.prev.next().map(|value| Change {
                value,
                tag: Tag::Removed,
            }),
            (None, Some(_)) => self.next.next().map(|value| Change {
                value,
                tag: Tag::Added,
            }),
            (Some(p), Some(n)) => match p.cmp(n) {
                Ordering::Equal => {
                    self.prev.next();
                    self.next.next().map(|value| Change {
                        value,
                        tag: Tag::None,
                    })
                }
                Ordering::Less => self.prev.next().map(|value| Change {
                    value,
                    tag: Tag::Removed,
                }),
                Ordering::Greater => self.next.next().map(|value| Change {
                    value,
                    tag: Tag::Added,
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(prev: &[i32], next: &[i32]) -> Vec<(i32, Tag)> {
        diff(prev.iter().copied(), next.iter().copied())
            .map(|c| (c.value, c.tag))
            .collect()
    }

    #[test]
    fn both_empty() {
        assert_eq!(tags(&[], &[]), vec![]);
    }

    #[test]
    fn pure_additions() {
        assert_eq!(
            tags(&[], &[1, 2, 3]),
            vec![(1, Tag::Added), (2, Tag::Added), (3, Tag::Added)]
        );
    }

    #[test]
    fn pure_removals() {
        assert_eq!(
            tags(&[1, 2, 3], &[]),
            vec![(1, Tag::Removed), (2, Tag::Removed), (3, Tag::Removed)]
        );
    }

    #[test]
    fn interleaved() {
        // prev: 1 2 4 5
        // next:   2 3   5 6
        assert_eq!(
            tags(&[1, 2, 4, 5], &[2, 3, 5, 6]),
            vec![
                (1, Tag::Removed),
                (2, Tag::None),
                (3, Tag::Added),
                (4, Tag::Removed),
                (5, Tag::None),
                (6, Tag::Added),
            ]
        );
    }

    #[test]
    fn union_and_counts_match() {
        let prev = vec![1, 2, 3, 4, 5];
        let next = vec![3, 4, 5, 6, 7];

        let changes: Vec<_> =
            diff(prev.iter().copied(), next.iter().copied()).collect();

        let added: Vec<_> = changes
            .iter()
            .filter(|c| c.tag == Tag::Added)
            .map(|c| c.value)
            .collect();
        let removed: Vec<_> = changes
            .iter()
            .filter(|c| c.tag == Tag::Removed)
            .map(|c| c.value)
            .collect();
        let unchanged: Vec<_> = changes
            .iter()
            .filter(|c| c.tag == Tag::None)
            .map(|c| c.value)
            .collect();

        assert_eq!(added, vec![6, 7]);
        assert_eq!(removed, vec![1, 2]);
        assert_eq!(unchanged, vec![3, 4, 5]);

        let mut union: Vec<_> =
            added.iter().chain(&unchanged).chain(&removed).collect();
        union.sort();
        union.dedup();
        let mut expected: Vec<_> = prev.iter().chain(next.iter()).collect();
        expected.sort();
        expected.dedup();
        assert_eq!(union, expected);
    }
}
