//! Service layer for business logic
//!
//! Shared by the CLI commands and the long-running server mode.

mod link_service;
pub mod monitor;
mod redirect;

pub use link_service::*;
pub use monitor::{LinkProbe, LoggingProbe, UrlMonitor};
pub use redirect::RedirectService;
