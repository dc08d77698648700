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

//! Validation and application of a single point request.

use crate::error::PointError;
use crate::point::UserPoint;
use crate::store::LedgerStore;
use crate::transaction::{PointRequest, TransactionKind};
use std::sync::Arc;

/// Applies one request at a time against a [`LedgerStore`].
///
/// Must only be driven from the drain loop; it reads then writes the balance
/// without any locking of its own.
pub struct LedgerMutator {
    store: Arc<dyn LedgerStore>,
}

impl LedgerMutator {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Validates and applies `request`.
    ///
    /// On success the new balance and one history row (with the requested
    /// amount and an apply-time timestamp) are written.
    ///
    /// # Errors
    ///
    /// - [`PointError::InvalidArgument`] - Negative amount.
    /// - [`PointError::Overflow`] - Charge would exceed `i64::MAX`.
    /// - [`PointError::InsufficientBalance`] - Use would go below zero.
    ///
    /// The store is left untouched on every error.
    pub fn apply(&self, request: &PointRequest) -> Result<UserPoint, PointError> {
        let current = self.store.select_by_id(request.user_id).point;
        let next = next_balance(current, request.amount, request.kind)?;

        let updated = self.store.insert_or_update(request.user_id, next);
        self.store.insert_history(
            request.user_id,
            request.amount,
            request.kind,
            chrono::Utc::now().timestamp_millis(),
        );
        Ok(updated)
    }
}

/// Balance after applying `amount` of `kind` to `current`.
fn next_balance(current: i64, amount: i64, kind: TransactionKind) -> Result<i64, PointError> {
    if amount < 0 {
        return Err(PointError::InvalidArgument("amount must not be negative"));
    }
    let next = match kind {
        TransactionKind::Charge => current.checked_add(amount).ok_or(PointError::Overflow)?,
        TransactionKind::Use => {
            if current < amount {
                return Err(PointError::InsufficientBalance);
            }
            current - amount
        }
    };
    debug_assert!(next >= 0, "Invariant violated: balance went negative: {next}");
    Ok(next)
}
