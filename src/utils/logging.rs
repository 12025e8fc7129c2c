//! Logging helpers.
//!
//! The `log_*` macros only fire when the calling module defines
//! `const ENABLE_LOGS: bool = true;`, which lets noisy modules such as the
//! ingestion services be silenced without touching `RUST_LOG`:
//! ```rust,ignore
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::log_info;
//!
//! log_info!("Saved {} samples", count);
//! ```

use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}

/// Middleware that logs one line per request with status and latency.
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis();
    if status.is_server_error() {
        log::error!("{method} {path} -> {} ({elapsed_ms} ms)", status.as_u16());
    } else {
        log::info!("{method} {path} -> {} ({elapsed_ms} ms)", status.as_u16());
    }

    response
}
