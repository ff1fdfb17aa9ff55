//! Request logging middleware

use super::super::state::ServerState;
use crate::server::metrics::record_http_request;
use axum::extract::State;
use axum::{
    body::Body,
    http::{header::HeaderMap, Request, Response},
    middleware::Next,
    response::IntoResponse,
};
use std::time::Instant;
use tracing::{error, info};

#[derive(PartialEq, PartialOrd, Clone, Debug, clap::ValueEnum)]
pub enum RequestsLoggingLevel {
    None,
    Path,
    Headers,
    Body,
}

impl Default for RequestsLoggingLevel {
    fn default() -> Self {
        Self::Path
    }
}

impl std::fmt::Display for RequestsLoggingLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

const BODY_LOG_LIMIT: usize = 1024;

fn declared_body_length(headers: &HeaderMap) -> Result<usize, &'static str> {
    let value = headers
        .get("content-length")
        .ok_or("Content-length not set.")?;
    let text = value
        .to_str()
        .map_err(|_| "Could not get Content-length string value.")?;
    text.parse()
        .map_err(|_| "Could not parse Content-length numeric value.")
}

fn log_headers(label: &str, headers: &HeaderMap) {
    info!("  {} Headers:", label);
    for (name, value) in headers.iter() {
        info!("    {:?}: {:?}", name, value);
    }
}

/// Drains a small body so its content can be logged, handing back an
/// equivalent body. Bodies above BODY_LOG_LIMIT pass through untouched.
async fn log_body(label: &str, headers: &HeaderMap, body: Body) -> Result<Body, axum::Error> {
    let size = match declared_body_length(headers) {
        Ok(size) => size,
        Err(reason) => {
            info!("  {} Body: {}", label, reason);
            return Ok(body);
        }
    };

    if size >= BODY_LOG_LIMIT {
        info!(
            "  {} Body: Too big to log ({:#})",
            label,
            byte_unit::Byte::from(size)
        );
        return Ok(body);
    }

    let bytes = axum::body::to_bytes(body, size).await?;
    info!("  {} Body:\n{}", label, String::from_utf8_lossy(&bytes));
    Ok(Body::from(bytes))
}

fn internal_error() -> Response<Body> {
    Response::builder()
        .status(500)
        .body(Body::from("Internal Server Error"))
        .unwrap()
}

pub async fn log_requests(
    State(state): State<ServerState>,
    request: Request<Body>,
    next: Next,
) -> impl IntoResponse {
    let level = state.config.requests_logging_level.clone();

    let start = Instant::now();
    let method = request.method().to_string();
    let uri = request.uri().to_string();

    if level > RequestsLoggingLevel::None {
        info!(">>> {} {}", method, uri);
    }

    if level >= RequestsLoggingLevel::Headers {
        log_headers("Req", request.headers());
    }

    let request = if level >= RequestsLoggingLevel::Body {
        let (parts, body) = request.into_parts();
        match log_body("Req", &parts.headers, body).await {
            Ok(body) => Request::from_parts(parts, body),
            Err(err) => {
                error!("Failed to read request body: {:?}", err);
                return internal_error();
            }
        }
    } else {
        request
    };

    let response = next.run(request).await;

    if level >= RequestsLoggingLevel::Headers {
        log_headers("Resp", response.headers());
    }

    let response = if level >= RequestsLoggingLevel::Body {
        let (parts, body) = response.into_parts();
        match log_body("Resp", &parts.headers, body).await {
            Ok(body) => Response::from_parts(parts, body),
            Err(err) => {
                error!("Failed to read response body: {:?}", err);
                return internal_error();
            }
        }
    } else {
        response
    };

    let status = response.status().as_u16();
    let elapsed = start.elapsed();

    if level > RequestsLoggingLevel::None {
        info!("<<< {} ({}ms)", status, elapsed.as_millis());
    }

    // Metrics are recorded regardless of the logging verbosity.
    record_http_request(&method, &uri, status, elapsed);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_ordering() {
        let none = RequestsLoggingLevel::None;

        assert!(none < RequestsLoggingLevel::Headers);
        assert!(RequestsLoggingLevel::Body > RequestsLoggingLevel::None);
    }

    #[test]
    fn body_length_parsing() {
        let mut headers = HeaderMap::new();
        assert!(declared_body_length(&headers).is_err());

        headers.insert("content-length", "512".parse().unwrap());
        assert_eq!(declared_body_length(&headers), Ok(512));

        headers.insert("content-length", "many".parse().unwrap());
        assert!(declared_body_length(&headers).is_err());
    }
}
