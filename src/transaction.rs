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

use crate::base::{RequestId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of balance mutation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    /// Increases the balance.
    Charge,
    /// Decreases the balance.
    Use,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Charge => f.write_str("CHARGE"),
            Self::Use => f.write_str("USE"),
        }
    }
}

/// A pending charge or use, as it sits in the request queue.
///
/// `amount` is the requested delta, never a balance snapshot. `enqueued_at`
/// is informational only; processing order is queue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointRequest {
    pub request_id: RequestId,
    pub user_id: UserId,
    pub amount: i64,
    pub kind: TransactionKind,
    /// Milliseconds since the Unix epoch.
    pub enqueued_at: i64,
}

impl PointRequest {
    pub fn new(request_id: RequestId, user_id: UserId, amount: i64, kind: TransactionKind) -> Self {
        Self {
            request_id,
            user_id,
            amount,
            kind,
            enqueued_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn charge(request_id: RequestId, user_id: UserId, amount: i64) -> Self {
        Self::new(request_id, user_id, amount, TransactionKind::Charge)
    }

    pub fn use_point(request_id: RequestId, user_id: UserId, amount: i64) -> Self {
        Self::new(request_id, user_id, amount, TransactionKind::Use)
    }
}
