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

use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use point_ledger::{
    InMemoryLedgerStore, LedgerStore, PipelineConfig, PointService, TransactionKind, UserId,
};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "point-ledger")]
#[command(about = "Replays a CSV of point charges and uses through the drain queue", long_about = None)]
struct Args {
    /// Path to CSV file with requests
    ///
    /// Expected format: type,user,amount
    /// Example: cargo run -- requests.csv > points.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Delay between scheduled drains, in milliseconds
    #[arg(long, default_value_t = 1000)]
    drain_interval_ms: u64,

    /// Queue depth that triggers an immediate drain
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_DRAIN_THRESHOLD)]
    drain_threshold: usize,

    /// How long each request waits for its result, in milliseconds
    #[arg(long, default_value_t = 10_000)]
    timeout_ms: u64,

    /// Number of threads submitting requests concurrently
    #[arg(long, default_value_t = 4)]
    workers: usize,
}

impl Args {
    fn config(&self) -> PipelineConfig {
        PipelineConfig::default()
            .with_drain_interval(Duration::from_millis(self.drain_interval_ms))
            .with_drain_threshold(self.drain_threshold)
            .with_request_timeout(Duration::from_millis(self.timeout_ms))
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    let requests = match read_requests(BufReader::new(file)) {
        Ok(requests) => requests,
        Err(e) => {
            eprintln!("Error reading requests: {}", e);
            process::exit(1);
        }
    };

    let store = Arc::new(InMemoryLedgerStore::new());
    let service = match PointService::new(store.clone(), args.config()) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("Error starting point service: {}", e);
            process::exit(1);
        }
    };

    submit_requests(&service, &requests, args.workers);
    service.shutdown();

    let users: BTreeSet<UserId> = requests.iter().map(|r| r.user).collect();
    if let Err(e) = write_points(store.as_ref(), &users, std::io::stdout()) {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(rename = "type")]
    kind: String,
    user: i64,
    amount: i64,
}

/// One parsed input row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Request {
    kind: TransactionKind,
    user: UserId,
    amount: i64,
}

impl CsvRecord {
    /// Returns `None` for unknown request types.
    fn into_request(self) -> Option<Request> {
        let kind = match self.kind.to_lowercase().as_str() {
            "charge" => TransactionKind::Charge,
            "use" => TransactionKind::Use,
            _ => return None,
        };
        Some(Request {
            kind,
            user: UserId(self.user),
            amount: self.amount,
        })
    }
}

fn read_requests<R: Read>(reader: R) -> Result<Vec<Request>, csv::Error> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .has_headers(true)
        .from_reader(reader);

    let mut requests = Vec::new();
    for result in rdr.deserialize::<CsvRecord>() {
        match result {
            Ok(record) => match record.into_request() {
                Some(request) => requests.push(request),
                None => warn!("skipping record with unknown type"),
            },
            Err(e) => warn!(error = %e, "skipping malformed row"),
        }
    }
    Ok(requests)
}

/// Splits `requests` over `workers` threads by user and waits for all of them.
///
/// Every row of a user goes to the same thread, so each user's rows are
/// submitted in file order.
fn submit_requests(service: &PointService, requests: &[Request], workers: usize) {
    let workers = workers.max(1);
    let mut lanes: Vec<Vec<&Request>> = vec![Vec::new(); workers];
    for request in requests {
        lanes[lane_of(request.user, workers)].push(request);
    }

    thread::scope(|scope| {
        for lane in lanes {
            scope.spawn(move || {
                for request in lane {
                    let result = match request.kind {
                        TransactionKind::Charge => service.charge(request.user, request.amount),
                        TransactionKind::Use => service.use_point(request.user, request.amount),
                    };
                    if let Err(e) = result {
                        warn!(
                            user = %request.user,
                            kind = %request.kind,
                            amount = request.amount,
                            error = %e,
                            "request failed"
                        );
                    }
                }
            });
        }
    });
}

fn lane_of(user: UserId, workers: usize) -> usize {
    user.0.rem_euclid(workers as i64) as usize
}

fn write_points<W: Write>(
    store: &dyn LedgerStore,
    users: &BTreeSet<UserId>,
    writer: W,
) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    wtr.write_record(["user", "point"])?;
    for user in users {
        let point = store.select_by_id(*user);
        wtr.write_record([point.id.to_string(), point.point.to_string()])?;
    }
    wtr.flush()?;
    Ok(())
}
