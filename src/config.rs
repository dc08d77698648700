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

//! Pipeline tuning knobs.

use std::time::Duration;

/// Configuration of the drain loop and the synchronous facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Delay between two scheduled drains.
    pub drain_interval: Duration,
    /// Queue depth at which an enqueue triggers an immediate drain.
    pub drain_threshold: usize,
    /// How long `charge`/`use_point` wait for their result.
    pub request_timeout: Duration,
}

impl PipelineConfig {
    pub const DEFAULT_DRAIN_INTERVAL: Duration = Duration::from_secs(1);
    pub const DEFAULT_DRAIN_THRESHOLD: usize = 10;
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
    /// Shortest drain interval accepted; a zero tick would spin the worker.
    pub const MIN_DRAIN_INTERVAL: Duration = Duration::from_millis(1);

    /// Intervals below [`Self::MIN_DRAIN_INTERVAL`] are raised to it.
    pub fn with_drain_interval(mut self, drain_interval: Duration) -> Self {
        self.drain_interval = drain_interval.max(Self::MIN_DRAIN_INTERVAL);
        self
    }

    /// A threshold of zero is treated as one.
    pub fn with_drain_threshold(mut self, drain_threshold: usize) -> Self {
        self.drain_threshold = drain_threshold.max(1);
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            drain_interval: Self::DEFAULT_DRAIN_INTERVAL,
            drain_threshold: Self::DEFAULT_DRAIN_THRESHOLD,
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
        }
    }
}
