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

//! HTTP front-end for the point service.
//!
//! Run with: cargo run --example server

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch},
};
use point_ledger::{
    InMemoryLedgerStore, PipelineConfig, PointError, PointHistory, PointService, UserId, UserPoint,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

// =============================================================================
// DTOs
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub amount: i64,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// =============================================================================
// State
// =============================================================================

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PointService>,
}

// =============================================================================
// Errors
// =============================================================================

pub enum AppError {
    Point(PointError),
    Join,
}

impl From<PointError> for AppError {
    fn from(err: PointError) -> Self {
        AppError::Point(err)
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(_: tokio::task::JoinError) -> Self {
        AppError::Join
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Point(err) => {
                let (status, code) = match err {
                    PointError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, "INVALID_ARGUMENT"),
                    PointError::InsufficientBalance => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "INSUFFICIENT_BALANCE")
                    }
                    PointError::Overflow => (StatusCode::UNPROCESSABLE_ENTITY, "OVERFLOW"),
                    PointError::Timeout => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
                    PointError::Closed => (StatusCode::SERVICE_UNAVAILABLE, "CLOSED"),
                };
                (status, code, err.to_string())
            }
            AppError::Join => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL",
                "request handler failed".to_string(),
            ),
        };

        (
            status,
            Json(ErrorResponse {
                error: message,
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

async fn point(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<UserPoint>, AppError> {
    info!(user = id, "point lookup");
    Ok(Json(state.service.point(UserId(id))?))
}

async fn history(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<PointHistory>>, AppError> {
    info!(user = id, "history lookup");
    Ok(Json(state.service.history(UserId(id))?))
}

// charge/use block the calling thread until drained, so they run off the runtime.
async fn charge(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<AmountRequest>,
) -> Result<Json<UserPoint>, AppError> {
    info!(user = id, amount = request.amount, "charge");
    let point = tokio::task::spawn_blocking(move || {
        state.service.charge(UserId(id), request.amount)
    })
    .await??;
    Ok(Json(point))
}

async fn use_point(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<AmountRequest>,
) -> Result<Json<UserPoint>, AppError> {
    info!(user = id, amount = request.amount, "use");
    let point = tokio::task::spawn_blocking(move || {
        state.service.use_point(UserId(id), request.amount)
    })
    .await??;
    Ok(Json(point))
}

// =============================================================================
// Router
// =============================================================================

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/point/{id}", get(point))
        .route("/point/{id}/histories", get(history))
        .route("/point/{id}/charge", patch(charge))
        .route("/point/{id}/use", patch(use_point))
        .with_state(state)
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let service = PointService::new(Arc::new(InMemoryLedgerStore::new()), PipelineConfig::default())?;
    let state = AppState {
        service: Arc::new(service),
    };

    let app = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:3000").await?;
    println!("Point API server running on http://127.0.0.1:3000");
    println!();
    println!("Endpoints:");
    println!("  GET   /point/:id            - Current balance");
    println!("  GET   /point/:id/histories  - Charge/use history");
    println!("  PATCH /point/:id/charge     - Charge points ({{\"amount\": n}})");
    println!("  PATCH /point/:id/use        - Use points ({{\"amount\": n}})");

    axum::serve(listener, app).await?;
    Ok(())
}
