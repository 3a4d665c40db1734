//! Keyed cache access bounded by per-operation timeouts.
//!
//! [`KeyedStore`] is the seam backends implement; [`MemoryStore`] is the
//! in-process one. A miss is reported as [`CacheError::Miss`], which
//! [`CacheError::classify`] marks terminal so a retry loop around a
//! lookup stops immediately instead of asking again.
//!
//! ```rust
//! use callward_cache::{CacheError, KeyedStore, MemoryStore};
//! use callward_core::CallSignal;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let store = MemoryStore::new("users");
//! let signal = CallSignal::new();
//! let timeout = Duration::from_millis(50);
//!
//! store.set(&signal, "user:1", "ada".to_string(), None, timeout).await.unwrap();
//! assert_eq!(store.get(&signal, "user:1", timeout).await.unwrap(), "ada");
//! assert_eq!(store.get(&signal, "user:2", timeout).await, Err(CacheError::Miss));
//! # }
//! ```

pub use error::CacheError;
pub use memory::MemoryStore;
pub use store::{bounded, KeyedStore};

mod error;
mod memory;
mod store;
