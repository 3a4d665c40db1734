//! Deadline, cancellation, admission and retry guards for HTTP and RPC
//! handlers.
//!
//! Every inbound call runs through the same three stages, always in this
//! order:
//!
//! 1. **Admission** (`ratelimiter` feature): a shared token bucket refuses
//!    the call when it is out of tokens. Nothing waits for a token.
//! 2. **Cancellation** (`cancel` feature): a call whose caller has already
//!    gone away is refused without running the handler.
//! 3. **Deadline** (`deadline` feature): the handler runs under a signal
//!    derived from the caller's, bounded by a timeout, and is raced against
//!    it.
//!
//! Work a handler does on behalf of the call, such as writing to a store,
//! can be wrapped separately with the **Retry** orchestrator (`retry`
//! feature), which backs off exponentially and stops as soon as the
//! caller's signal dies.
//!
//! The [`CallPipeline`] (`pipeline` feature) composes the three stages.
//! The `http` feature adds an axum middleware and health endpoint, and the
//! `grpc` feature adds unary and streaming interceptors speaking tonic's
//! status model.
//!
//! # Usage
//!
//! ```toml
//! [dependencies]
//! callward = { version = "0.1", features = ["http", "tracing"] }
//! ```
//!
//! # Example
//!
//! ```rust
//! # #[cfg(feature = "pipeline")]
//! # {
//! use callward::core::{CallSignal, CallSite};
//! use callward::CallPipeline;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let pipeline = CallPipeline::builder()
//!     .timeout(Duration::from_millis(100))
//!     .rate(10.0)
//!     .burst(10)
//!     .name("orders")
//!     .build()
//!     .unwrap();
//!
//! let site = CallSite::http("GET", "/orders/42");
//! let order = pipeline
//!     .run(&CallSignal::new(), &site, |_signal| async {
//!         Ok::<_, std::io::Error>("order 42")
//!     })
//!     .await
//!     .unwrap();
//! assert_eq!(order, "order 42");
//! # }
//! # }
//! ```

// Core is always available
pub use callward_core as core;

// Stages
#[cfg(feature = "deadline")]
pub use callward_deadline as deadline;

#[cfg(feature = "cancel")]
pub use callward_cancel as cancel;

#[cfg(feature = "ratelimiter")]
pub use callward_ratelimiter as ratelimiter;

#[cfg(feature = "retry")]
pub use callward_retry as retry;

#[cfg(feature = "health")]
pub use callward_health as health;

#[cfg(feature = "cache")]
pub use callward_cache as cache;

// Composition and transports
#[cfg(feature = "pipeline")]
mod pipeline;
#[cfg(feature = "pipeline")]
pub use pipeline::{CallPipeline, CallPipelineBuilder};

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "grpc")]
pub mod rpc;

#[cfg(feature = "serde")]
pub mod settings;
#[cfg(feature = "serde")]
pub use settings::{GuardSettings, RetrySettings};
