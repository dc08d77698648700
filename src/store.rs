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

//! Ledger storage.
//!
//! The pipeline only talks to storage through [`LedgerStore`]. Writes come
//! exclusively from the drain loop, but reads (`point`/`history`) bypass the
//! queue, so implementations must be internally thread-safe.

use crate::base::UserId;
use crate::point::{PointHistory, UserPoint};
use crate::transaction::TransactionKind;
use dashmap::DashMap;
use parking_lot::RwLock;

/// Balance and history storage consumed by the pipeline.
pub trait LedgerStore: Send + Sync {
    /// Sets the balance of `user_id` to `point`.
    fn insert_or_update(&self, user_id: UserId, point: i64) -> UserPoint;

    /// Appends a history row and returns it with its assigned sequence id.
    fn insert_history(
        &self,
        user_id: UserId,
        amount: i64,
        kind: TransactionKind,
        update_millis: i64,
    ) -> PointHistory;

    /// Current balance. Unknown users read as a zero balance, never an absence.
    fn select_by_id(&self, user_id: UserId) -> UserPoint;

    /// All history rows of `user_id`, oldest first.
    fn select_histories(&self, user_id: UserId) -> Vec<PointHistory>;
}

/// In-memory [`LedgerStore`].
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    points: DashMap<UserId, UserPoint>,
    histories: RwLock<HistoryTable>,
}

#[derive(Debug, Default)]
struct HistoryTable {
    last_id: u64,
    rows: Vec<PointHistory>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users with a stored balance.
    pub fn user_count(&self) -> usize {
        self.points.len()
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn insert_or_update(&self, user_id: UserId, point: i64) -> UserPoint {
        let user_point = UserPoint {
            id: user_id,
            point,
            update_millis: chrono::Utc::now().timestamp_millis(),
        };
        self.points.insert(user_id, user_point);
        user_point
    }

    fn insert_history(
        &self,
        user_id: UserId,
        amount: i64,
        kind: TransactionKind,
        update_millis: i64,
    ) -> PointHistory {
        let mut table = self.histories.write();
        table.last_id += 1;
        let history = PointHistory {
            id: table.last_id,
            user_id,
            amount,
            kind,
            update_millis,
        };
        table.rows.push(history);
        history
    }

    fn select_by_id(&self, user_id: UserId) -> UserPoint {
        self.points
            .get(&user_id)
            .map(|entry| *entry.value())
            .unwrap_or_else(|| UserPoint::empty(user_id))
    }

    fn select_histories(&self, user_id: UserId) -> Vec<PointHistory> {
        self.histories
            .read()
            .rows
            .iter()
            .filter(|history| history.user_id == user_id)
            .copied()
            .collect()
    }
}
