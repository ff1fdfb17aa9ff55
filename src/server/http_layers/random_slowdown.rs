//! Random slowdown middleware for testing
#![allow(dead_code)] // Feature-gated middleware

use axum::body::Body;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::IntoResponse;
use rand_distr::{Distribution, Normal};
use std::time::Duration;

const MEAN_DELAY_MS: f64 = 1000.0;
const DELAY_STD_DEV_MS: f64 = 2000.0;

/// Delays each request by a gaussian-distributed amount of milliseconds,
/// clamped at zero. Exercises client-side timeout handling in dev setups.
pub async fn slowdown_request(request: Request<Body>, next: Next) -> impl IntoResponse {
    let normal = Normal::new(MEAN_DELAY_MS, DELAY_STD_DEV_MS).unwrap();
    let delay_ms = normal.sample(&mut rand::rng()).max(0.0) as u64;

    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    next.run(request).await
}
