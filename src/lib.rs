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

//! # Point Ledger
//!
//! This library keeps a per-user point balance with an append-only history,
//! and serializes concurrent charge/use requests through a single queue.
//!
//! ## Core Components
//!
//! - [`PointService`]: Synchronous facade (`point`, `history`, `charge`, `use_point`)
//! - [`RequestQueue`]: FIFO of pending requests shared by all callers
//! - [`CompletionRegistry`]: Per-request result cells the callers block on
//! - [`Pipeline`] / [`DrainWorker`]: Single-flight drain that applies requests in order
//! - [`LedgerMutator`]: Validates and applies one request
//! - [`LedgerStore`]: Balance and history storage, with [`InMemoryLedgerStore`]
//!
//! ## Example
//!
//! ```
//! use point_ledger::{InMemoryLedgerStore, PipelineConfig, PointService, UserId};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let config = PipelineConfig::default().with_drain_interval(Duration::from_millis(10));
//! let service = PointService::new(Arc::new(InMemoryLedgerStore::new()), config).unwrap();
//!
//! let point = service.charge(UserId(1), 100).unwrap();
//! assert_eq!(point.point, 100);
//!
//! let point = service.use_point(UserId(1), 30).unwrap();
//! assert_eq!(point.point, 70);
//! assert_eq!(service.history(UserId(1)).unwrap().len(), 2);
//! ```
//!
//! ## Thread Safety
//!
//! Any number of threads may call into the service. Mutations are applied by
//! one drain at a time, so concurrent charges and uses never lose updates.
//! Reads bypass the queue and may lag behind requests that are still queued.

mod base;
pub mod completion;
mod config;
pub mod drain;
pub mod error;
mod mutator;
mod point;
mod request_queue;
mod service;
pub mod store;
mod transaction;

pub use base::{RequestId, UserId};
pub use completion::{CompletionHandle, CompletionRegistry, Outcome};
pub use config::PipelineConfig;
pub use drain::{DrainReport, DrainWorker, Pipeline};
pub use error::PointError;
pub use mutator::LedgerMutator;
pub use point::{PointHistory, UserPoint};
pub use request_queue::RequestQueue;
pub use service::PointService;
pub use store::{InMemoryLedgerStore, LedgerStore};
pub use transaction::{PointRequest, TransactionKind};
