// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Thread-safe FIFO queue of pending point requests.
//!
//! Ordering is arrival order at [`RequestQueue::push`]. The queue is unbounded;
//! there is no backpressure.

use crate::transaction::PointRequest;
use crossbeam::queue::SegQueue;

/// A lock-free multi-producer queue of [`PointRequest`]s.
///
/// Any thread may push; only the drain loop pops.
#[derive(Debug)]
pub struct RequestQueue {
    requests: SegQueue<PointRequest>,
}

impl RequestQueue {
    /// Creates a new empty queue.
    pub fn new() -> Self {
        Self {
            requests: SegQueue::new(),
        }
    }

    /// Appends a request and returns the queue depth observed right after.
    pub fn push(&self, request: PointRequest) -> usize {
        self.requests.push(request);
        self.requests.len()
    }

    /// Removes the oldest request, if any.
    pub fn pop(&self) -> Option<PointRequest> {
        self.requests.pop()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

impl Default for RequestQueue {
    fn default() -> Self {
        Self::new()
    }
}
