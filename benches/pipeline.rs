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

//! Benchmarks for the point pipeline.
//!
//! Run with: cargo bench
//!
//! Benchmarks include:
//! - Raw mutator throughput (no queue)
//! - Sequential charges through the service
//! - Concurrent charges against one user and across many users

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use point_ledger::{
    InMemoryLedgerStore, LedgerMutator, PipelineConfig, PointRequest, PointService, RequestId,
    UserId,
};
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Helper Functions
// =============================================================================

/// Service that drains as soon as a single request is queued.
fn eager_service() -> PointService {
    let config = PipelineConfig::default()
        .with_drain_interval(Duration::from_millis(1))
        .with_drain_threshold(1)
        .with_request_timeout(Duration::from_secs(30));
    PointService::new(Arc::new(InMemoryLedgerStore::new()), config).unwrap()
}

// =============================================================================
// Single-Threaded Benchmarks
// =============================================================================

fn bench_mutator_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("mutator_apply");

    for count in [100, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                let mutator = LedgerMutator::new(Arc::new(InMemoryLedgerStore::new()));
                for i in 0..count {
                    let request = PointRequest::charge(RequestId(i as u64), UserId(1), 10);
                    mutator.apply(black_box(&request)).unwrap();
                }
            })
        });
    }
    group.finish();
}

fn bench_sequential_charges(c: &mut Criterion) {
    let service = eager_service();
    c.bench_function("sequential_charge", |b| {
        b.iter(|| service.charge(UserId(1), black_box(1)).unwrap())
    });
}

// =============================================================================
// Multi-Threaded Benchmarks
// =============================================================================

fn bench_parallel_same_user(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_same_user");
    group.sample_size(20);

    for count in [100, 1_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let service = eager_service();
            b.iter(|| {
                (0..count).into_par_iter().for_each(|_| {
                    service.charge(UserId(1), 1).unwrap();
                });
            })
        });
    }
    group.finish();
}

fn bench_parallel_many_users(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_many_users");
    group.sample_size(20);

    for count in [100, 1_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let service = eager_service();
            b.iter(|| {
                (0..count).into_par_iter().for_each(|i| {
                    service.charge(UserId(i as i64 % 64), 1).unwrap();
                });
            })
        });
    }
    group.finish();
}

criterion_group!(single_threaded, bench_mutator_apply, bench_sequential_charges,);

criterion_group!(multi_threaded, bench_parallel_same_user, bench_parallel_many_users,);

criterion_main!(single_threaded, multi_threaded);
