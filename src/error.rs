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

//! Error types for point operations.

use thiserror::Error;

/// Point ledger errors.
///
/// Validation failures are detected either before a request is queued (id and
/// amount sanity) or while it is applied (balance checks). None of them are
/// retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PointError {
    /// Negative user id or negative amount
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Use would take the balance below zero
    #[error("insufficient point balance")]
    InsufficientBalance,

    /// Charge would exceed the maximum representable balance
    #[error("point balance overflow")]
    Overflow,

    /// The request was not completed before the caller's deadline.
    ///
    /// The request itself is not cancelled and may still be applied later.
    #[error("request timed out")]
    Timeout,

    /// The pipeline shut down before the request completed
    #[error("point pipeline is closed")]
    Closed,
}
