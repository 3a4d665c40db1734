//! Core infrastructure for callward.
//!
//! This crate provides what every stage of the call pipeline shares:
//! - [`CallSignal`], the cancellable and deadline-bearing per-call handle
//! - [`CallSite`], the identity of a guarded call
//! - the error taxonomy ([`CallError`], [`ErrorKind`], [`ErrorClass`])
//! - the event system used for diagnostics

pub mod call;
pub mod context;
pub mod error;
pub mod events;
pub mod signal;

pub use call::CallSite;
pub use context::{HasSignal, Signaled};
pub use error::{CallError, ConfigError, ErrorClass, ErrorKind};
pub use events::{CallEvent, EventListener, EventListeners, FnListener, Severity};
pub use signal::{CallSignal, SignalError, SignalGuard};
