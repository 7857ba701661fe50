//! Clicklinker - URL shortener core with asynchronous click tracking
//!
//! # Architecture
//! - `utils`: Short-code generation (secure entropy) and URL validation
//! - `storage`: Repository traits plus in-memory and JSON file backends
//! - `services`: Link creation with collision retries, stats, redirects, link monitor
//! - `analytics`: Bounded click channel, worker pool and pipeline counters
//! - `config`: Static configuration loaded from TOML and environment
//! - `system`: Logging and application lifecycle (startup, shutdown)
//! - `cli`: Command-line definitions and handlers

pub mod analytics;
pub mod cli;
pub mod config;
pub mod errors;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
