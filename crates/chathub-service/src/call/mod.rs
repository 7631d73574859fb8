//! Call lifecycle: the state machine and the ringing watchdog.

pub mod service;
pub mod watchdog;

pub use service::CallService;
pub use watchdog::CallWatchdog;
