//! # NZ Walks backend library
//!
//! CRUD service for New Zealand regions and walks with an image upload path,
//! backed by SQLite and served over a JSON REST API.
//!
//! ## Core Components
//!
//! - [`config`]: layered configuration (embedded defaults, TOML files, environment)
//! - [`db`]: connection pool, schema and seed data
//! - [`error`]: repository and HTTP error types
//! - [`models`]: domain entities
//! - [`repositories`]: repository traits, SQL implementations and the walk query composer
//! - [`middleware`]: request guards, rate limiting, role resolution and response headers
//! - [`routes`]: HTTP handlers and the router
//! - [`state`]: shared application state
//! - [`types`]: request and response bodies
//! - [`metrics`]: write and query counters

pub mod config;
pub mod db;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod state;
pub mod types;

#[cfg(test)]
mod tests;
