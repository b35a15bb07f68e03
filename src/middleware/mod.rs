//! Middleware components for HTTP request processing.
//!
//! - `auth`: bearer-token check for the book mutation routes
//! - `timeout`: per-request deadline with a structured 408 response

pub mod auth;
pub mod timeout;
