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

//! Balance and history records.
//!
//! # Example
//!
//! ```
//! use point_ledger::{UserId, UserPoint};
//!
//! let point = UserPoint::empty(UserId(1));
//! assert_eq!(point.point, 0);
//! ```

use crate::base::UserId;
use crate::transaction::TransactionKind;
use serde::{Deserialize, Serialize};

/// Current point balance of one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPoint {
    pub id: UserId,
    pub point: i64,
    /// Milliseconds since the Unix epoch.
    pub update_millis: i64,
}

impl UserPoint {
    /// Zero balance for a user the store has never seen.
    pub fn empty(id: UserId) -> Self {
        Self {
            id,
            point: 0,
            update_millis: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// One applied charge or use. Never mutated after insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointHistory {
    /// Store-assigned sequence number.
    pub id: u64,
    pub user_id: UserId,
    /// Requested amount, not the resulting balance.
    pub amount: i64,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub update_millis: i64,
}
