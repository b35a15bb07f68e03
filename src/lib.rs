//! # Bookly Backend Library
//!
//! A small REST backend for managing books and users: registration and login
//! with bearer tokens, adding, listing, fetching and soft-deleting books, and
//! a background scheduler that purges soft-deleted books in batches.
//!
//! ## Architecture
//!
//! The application is built using:
//! - **Axum**: HTTP server and routing
//! - **SQLx**: asynchronous SQLite access through a connection pool
//! - **Tokio**: async runtime for request workers and the purge task
//! - **Argon2 / jsonwebtoken**: password hashing and bearer tokens
//!
//! ## Core Components
//!
//! - [`store`]: `BookStore` / `IdentityStore` traits with in-memory and SQLite implementations
//! - [`purge`]: deferred purge scheduler (bounded signal queue + interval loop)
//! - [`service`]: thin services the HTTP handlers call
//! - [`password`]: salted one-way password hashing
//! - [`auth`]: token issuance and verification
//! - [`config`]: layered configuration
//! - [`db`]: pool setup and schema initialization
//! - [`error`]: store error taxonomy and HTTP error responses
//! - [`routes`] / [`middleware`]: HTTP surface
//! - [`state`], [`metrics`], [`types`]: shared state, counters and DTOs

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod password;
pub mod purge;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;
