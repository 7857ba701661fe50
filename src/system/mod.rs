//! System-level modules
//!
//! - Lifecycle management (startup, supervised tasks, shutdown)
//! - Logging initialization

pub mod lifetime;
pub mod logging;
