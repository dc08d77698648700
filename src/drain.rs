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

//! The serialized mutation pipeline and its drain worker.
//!
//! Requests from any number of threads land in one [`RequestQueue`]. A drain
//! pops them one by one and applies them through the [`LedgerMutator`], so all
//! mutations across all users happen in a single total order. At most one
//! drain runs at a time; this is enforced by `drain_guard`, not by scheduling.

use crate::completion::CompletionRegistry;
use crate::config::PipelineConfig;
use crate::mutator::LedgerMutator;
use crate::request_queue::RequestQueue;
use crate::store::LedgerStore;
use crossbeam::channel::{self, Sender, TrySendError};
use crossbeam::select;
use parking_lot::{Mutex, MutexGuard};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Counts of what one drain pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub applied: usize,
    pub rejected: usize,
}

impl DrainReport {
    pub fn processed(&self) -> usize {
        self.applied + self.rejected
    }
}

/// Queue, completion registry and mutator shared by callers and the worker.
pub struct Pipeline {
    queue: RequestQueue,
    registry: CompletionRegistry,
    mutator: LedgerMutator,
    drain_guard: Mutex<()>,
}

impl Pipeline {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            queue: RequestQueue::new(),
            registry: CompletionRegistry::new(),
            mutator: LedgerMutator::new(store),
            drain_guard: Mutex::new(()),
        }
    }

    pub fn queue(&self) -> &RequestQueue {
        &self.queue
    }

    pub fn registry(&self) -> &CompletionRegistry {
        &self.registry
    }

    /// Drains the queue unless another drain is already running.
    ///
    /// Returns `None` when the call lost the race for the drain guard; the
    /// running drain keeps popping until the queue is empty.
    pub fn drain(&self) -> Option<DrainReport> {
        let guard = self.drain_guard.try_lock()?;
        Some(self.drain_locked(guard))
    }

    /// Waits for any running drain to finish, then drains.
    pub fn drain_blocking(&self) -> DrainReport {
        let guard = self.drain_guard.lock();
        self.drain_locked(guard)
    }

    fn drain_locked(&self, _guard: MutexGuard<'_, ()>) -> DrainReport {
        let mut report = DrainReport::default();
        while let Some(request) = self.queue.pop() {
            let outcome = self.mutator.apply(&request);
            match &outcome {
                Ok(point) => {
                    report.applied += 1;
                    debug!(
                        request = %request.request_id,
                        user = %request.user_id,
                        kind = %request.kind,
                        amount = request.amount,
                        balance = point.point,
                        "request applied"
                    );
                }
                Err(e) => {
                    report.rejected += 1;
                    warn!(
                        request = %request.request_id,
                        user = %request.user_id,
                        kind = %request.kind,
                        amount = request.amount,
                        error = %e,
                        "request rejected"
                    );
                }
            }
            self.registry.fulfill(request.request_id, outcome);
        }
        if report.processed() > 0 {
            debug!(applied = report.applied, rejected = report.rejected, "drain complete");
        }
        report
    }
}

/// Background thread that drains a [`Pipeline`] on a fixed-delay tick, on
/// threshold triggers, and once more on shutdown.
pub struct DrainWorker {
    trigger: Sender<()>,
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl DrainWorker {
    /// Intervals below [`PipelineConfig::MIN_DRAIN_INTERVAL`] are raised to it.
    pub fn spawn(pipeline: Arc<Pipeline>, interval: Duration) -> io::Result<Self> {
        let interval = interval.max(PipelineConfig::MIN_DRAIN_INTERVAL);
        let (trigger, trigger_rx) = channel::bounded::<()>(1);
        let (shutdown, shutdown_rx) = channel::bounded::<()>(0);

        let handle = thread::Builder::new()
            .name("point-drain".to_string())
            .spawn(move || {
                let ticker = channel::tick(interval);
                info!(interval_ms = interval.as_millis() as u64, "drain worker started");
                loop {
                    select! {
                        recv(ticker) -> _ => {
                            pipeline.drain();
                        }
                        recv(trigger_rx) -> _ => {
                            pipeline.drain();
                        }
                        recv(shutdown_rx) -> _ => break,
                    }
                }
                let report = pipeline.drain_blocking();
                info!(applied = report.applied, rejected = report.rejected, "drain worker stopped");
            })?;

        Ok(Self {
            trigger,
            shutdown: Some(shutdown),
            handle: Some(handle),
        })
    }

    /// Asks the worker for an immediate drain.
    ///
    /// Triggers coalesce: if one is already pending this is a no-op.
    pub fn trigger(&self) {
        match self.trigger.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Disconnected(())) => debug!("drain worker already stopped"),
        }
    }

    /// Stops the worker after a final drain and waits for it to exit.
    pub fn shutdown(&mut self) {
        // Dropping the sender disconnects the channel, which wakes `select!`.
        drop(self.shutdown.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("drain worker panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for DrainWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
