//! Application lifecycle: startup wiring, supervised background tasks and
//! coordinated shutdown.

pub mod shutdown;
pub mod startup;
pub mod task;

pub use shutdown::{perform_shutdown, wait_for_signal};
pub use startup::{AppContext, prepare_server_startup};
pub use task::SupervisedTask;
