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

//! Completion cells for queued requests.
//!
//! Every queued request gets a single-assignment cell keyed by its
//! [`RequestId`]. The drain loop fulfils it, the caller blocks on it.
//!
//! ```text
//!  register ──► Pending ──fulfill──► Delivered
//!                  │
//!                  └──wait deadline──► Abandoned (later fulfil is dropped)
//! ```

use crate::base::RequestId;
use crate::error::PointError;
use crate::point::UserPoint;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::time::Duration;
use tracing::debug;

/// Result delivered through a completion cell.
pub type Outcome = Result<UserPoint, PointError>;

/// The waiting side of a completion cell.
#[derive(Debug)]
pub struct CompletionHandle {
    request_id: RequestId,
    receiver: Receiver<Outcome>,
}

impl CompletionHandle {
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }
}

/// Map of in-flight request ids to the sending side of their cell.
///
/// Removing the entry is what claims the right to fulfil it, so each cell is
/// fulfilled at most once even if `fulfill` races with a timed-out waiter.
#[derive(Debug, Default)]
pub struct CompletionRegistry {
    cells: DashMap<RequestId, Sender<Outcome>>,
}

impl CompletionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the cell for `request_id`.
    ///
    /// # Errors
    ///
    /// Returns [`PointError::InvalidArgument`] if a cell for the same request
    /// is already registered.
    pub fn register(&self, request_id: RequestId) -> Result<CompletionHandle, PointError> {
        match self.cells.entry(request_id) {
            Entry::Occupied(_) => Err(PointError::InvalidArgument("duplicate request id")),
            Entry::Vacant(entry) => {
                let (sender, receiver) = channel::bounded(1);
                entry.insert(sender);
                Ok(CompletionHandle {
                    request_id,
                    receiver,
                })
            }
        }
    }

    /// Delivers `outcome` to the waiter of `request_id`.
    ///
    /// Returns `false` when nobody is listening any more (the waiter timed out
    /// or the cell was already fulfilled).
    pub fn fulfill(&self, request_id: RequestId, outcome: Outcome) -> bool {
        let Some((_, sender)) = self.cells.remove(&request_id) else {
            debug!(request = %request_id, "no waiter for completed request");
            return false;
        };
        sender.try_send(outcome).is_ok()
    }

    /// Blocks until the cell is fulfilled or `timeout` elapses.
    ///
    /// On timeout the cell is dropped from the registry; the request itself
    /// stays queued and may still be applied.
    pub fn wait(&self, handle: CompletionHandle, timeout: Duration) -> Outcome {
        match handle.receiver.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => {
                self.cells.remove(&handle.request_id);
                Err(PointError::Timeout)
            }
            // The registry holds the sender until it delivers, so this only
            // happens if the cell was dropped without an outcome.
            Err(RecvTimeoutError::Disconnected) => Err(PointError::Timeout),
        }
    }

    /// Number of cells still waiting for a result.
    pub fn pending(&self) -> usize {
        self.cells.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::UserId;
    use std::sync::Arc;
    use std::thread;

    fn point(value: i64) -> UserPoint {
        UserPoint {
            id: UserId(1),
            point: value,
            update_millis: 0,
        }
    }

    #[test]
    fn fulfilled_cell_is_observed() {
        let registry = CompletionRegistry::new();
        let handle = registry.register(RequestId(1)).unwrap();
        assert!(registry.fulfill(RequestId(1), Ok(point(10))));
        assert_eq!(registry.wait(handle, Duration::from_secs(1)), Ok(point(10)));
        assert_eq!(registry.pending(), 0);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let registry = CompletionRegistry::new();
        let _handle = registry.register(RequestId(1)).unwrap();
        assert!(matches!(
            registry.register(RequestId(1)),
            Err(PointError::InvalidArgument(_))
        ));
    }

    #[test]
    fn cells_fulfil_only_once() {
        let registry = CompletionRegistry::new();
        let handle = registry.register(RequestId(1)).unwrap();
        assert!(registry.fulfill(RequestId(1), Ok(point(1))));
        assert!(!registry.fulfill(RequestId(1), Ok(point(2))));
        assert_eq!(registry.wait(handle, Duration::from_secs(1)), Ok(point(1)));
    }

    #[test]
    fn same_user_requests_get_separate_cells() {
        let registry = CompletionRegistry::new();
        let first = registry.register(RequestId(1)).unwrap();
        let second = registry.register(RequestId(2)).unwrap();
        registry.fulfill(RequestId(2), Ok(point(20)));
        registry.fulfill(RequestId(1), Ok(point(10)));
        assert_eq!(registry.wait(first, Duration::from_secs(1)), Ok(point(10)));
        assert_eq!(registry.wait(second, Duration::from_secs(1)), Ok(point(20)));
    }

    #[test]
    fn failure_outcomes_are_delivered() {
        let registry = CompletionRegistry::new();
        let handle = registry.register(RequestId(3)).unwrap();
        registry.fulfill(RequestId(3), Err(PointError::InsufficientBalance));
        assert_eq!(
            registry.wait(handle, Duration::from_secs(1)),
            Err(PointError::InsufficientBalance)
        );
    }

    #[test]
    fn timeout_deregisters_cell() {
        let registry = CompletionRegistry::new();
        let handle = registry.register(RequestId(1)).unwrap();
        assert_eq!(
            registry.wait(handle, Duration::from_millis(20)),
            Err(PointError::Timeout)
        );
        assert_eq!(registry.pending(), 0);
        assert!(!registry.fulfill(RequestId(1), Ok(point(5))));
    }

    #[test]
    fn dropped_cell_is_reported_as_timeout() {
        let registry = CompletionRegistry::new();
        let handle = registry.register(RequestId(4)).unwrap();
        registry.cells.remove(&RequestId(4));
        assert_eq!(
            registry.wait(handle, Duration::from_secs(5)),
            Err(PointError::Timeout)
        );
    }

    #[test]
    fn waiter_blocks_until_fulfilled_from_other_thread() {
        let registry = Arc::new(CompletionRegistry::new());
        let handle = registry.register(RequestId(9)).unwrap();
        let fulfiller = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                registry.fulfill(RequestId(9), Ok(point(99)))
            })
        };
        assert_eq!(registry.wait(handle, Duration::from_secs(5)), Ok(point(99)));
        assert!(fulfiller.join().unwrap());
    }
}
