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

use crate::base::{RequestIdGenerator, UserId};
use crate::config::PipelineConfig;
use crate::drain::{DrainReport, DrainWorker, Pipeline};
use crate::error::PointError;
use crate::point::{PointHistory, UserPoint};
use crate::store::LedgerStore;
use crate::transaction::{PointRequest, TransactionKind};
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Synchronous entry point for point lookups and mutations.
///
/// Reads go straight to the store. Charges and uses are queued and applied by
/// the drain worker; the caller blocks until its request completes or the
/// configured timeout elapses.
pub struct PointService {
    store: Arc<dyn LedgerStore>,
    pipeline: Arc<Pipeline>,
    worker: Mutex<DrainWorker>,
    request_ids: RequestIdGenerator,
    config: PipelineConfig,
    closed: AtomicBool,
}

impl PointService {
    /// Creates the service and starts its drain worker.
    ///
    /// # Errors
    ///
    /// Fails if the worker thread cannot be spawned.
    pub fn new(store: Arc<dyn LedgerStore>, config: PipelineConfig) -> io::Result<Self> {
        let pipeline = Arc::new(Pipeline::new(Arc::clone(&store)));
        let worker = DrainWorker::spawn(Arc::clone(&pipeline), config.drain_interval)?;
        info!(
            drain_threshold = config.drain_threshold,
            timeout_ms = config.request_timeout.as_millis() as u64,
            "point service started"
        );
        Ok(Self {
            store,
            pipeline,
            worker: Mutex::new(worker),
            request_ids: RequestIdGenerator::new(),
            config,
            closed: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Current balance of `user_id`. Unknown users have a zero balance.
    ///
    /// Not ordered against queued requests: the value may be about to change.
    ///
    /// # Errors
    ///
    /// [`PointError::InvalidArgument`] if `user_id` is negative.
    pub fn point(&self, user_id: UserId) -> Result<UserPoint, PointError> {
        validate_user(user_id)?;
        Ok(self.store.select_by_id(user_id))
    }

    /// All applied charges and uses of `user_id`, oldest first.
    ///
    /// # Errors
    ///
    /// [`PointError::InvalidArgument`] if `user_id` is negative.
    pub fn history(&self, user_id: UserId) -> Result<Vec<PointHistory>, PointError> {
        validate_user(user_id)?;
        Ok(self.store.select_histories(user_id))
    }

    /// Adds `amount` to the balance of `user_id`.
    ///
    /// # Errors
    ///
    /// - [`PointError::InvalidArgument`] - Negative id or amount.
    /// - [`PointError::Overflow`] - Balance would exceed `i64::MAX`.
    /// - [`PointError::Timeout`] - Not completed in time (may still apply later).
    /// - [`PointError::Closed`] - The service is shut down.
    pub fn charge(&self, user_id: UserId, amount: i64) -> Result<UserPoint, PointError> {
        self.submit(user_id, amount, TransactionKind::Charge)
    }

    /// Subtracts `amount` from the balance of `user_id`.
    ///
    /// # Errors
    ///
    /// - [`PointError::InvalidArgument`] - Negative id or amount.
    /// - [`PointError::InsufficientBalance`] - Balance would go below zero.
    /// - [`PointError::Timeout`] - Not completed in time (may still apply later).
    /// - [`PointError::Closed`] - The service is shut down.
    pub fn use_point(&self, user_id: UserId, amount: i64) -> Result<UserPoint, PointError> {
        self.submit(user_id, amount, TransactionKind::Use)
    }

    fn submit(
        &self,
        user_id: UserId,
        amount: i64,
        kind: TransactionKind,
    ) -> Result<UserPoint, PointError> {
        validate_user(user_id)?;
        if amount < 0 {
            return Err(PointError::InvalidArgument("amount must not be negative"));
        }
        if self.closed.load(Ordering::SeqCst) {
            return Err(PointError::Closed);
        }

        let request_id = self.request_ids.next_id();
        // Register before pushing so the drain can never complete a request
        // that has no cell yet.
        let handle = self.pipeline.registry().register(request_id)?;
        let depth = self
            .pipeline
            .queue()
            .push(PointRequest::new(request_id, user_id, amount, kind));
        if self.closed.load(Ordering::SeqCst) {
            // Shutdown raced with this push and the worker may already have
            // done its final drain.
            self.pipeline.drain_blocking();
        } else if depth >= self.config.drain_threshold {
            self.worker.lock().trigger();
        }

        self.pipeline
            .registry()
            .wait(handle, self.config.request_timeout)
    }

    /// Drains the queue on the calling thread, unless a drain is already
    /// running. See [`Pipeline::drain`].
    pub fn drain(&self) -> Option<DrainReport> {
        self.pipeline.drain()
    }

    /// Number of requests waiting to be drained.
    pub fn pending(&self) -> usize {
        self.pipeline.queue().len()
    }

    /// Stops accepting requests, drains what is queued and stops the worker.
    ///
    /// Idempotent. Requests already queued still complete.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.worker.lock().shutdown();
        info!("point service stopped");
    }
}

impl Drop for PointService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn validate_user(user_id: UserId) -> Result<(), PointError> {
    if !user_id.is_valid() {
        return Err(PointError::InvalidArgument("user id must not be negative"));
    }
    Ok(())
}
