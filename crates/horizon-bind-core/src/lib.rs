//! Core runtime for Horizon Bind.
//!
//! This crate provides the small runtime the data-binding engines are built on:
//!
//! - **Signal/Slot System**: Synchronous event notification, including
//!   "before" signals whose slots may veto an operation
//! - **Timers**: A one-shot timer queue driven by the host event loop
//! - **Logging**: `tracing` targets and performance spans
//!
//! # Signal/Slot Example
//!
//! ```
//! use horizon_bind_core::Signal;
//!
//! let value_changed = Signal::<i32>::new();
//!
//! let conn_id = value_changed.connect(|value| {
//!     println!("Value changed to: {}", value);
//! });
//!
//! value_changed.emit(42);
//! value_changed.disconnect(conn_id);
//! ```
//!
//! # Timer Example
//!
//! ```
//! use horizon_bind_core::TimerQueue;
//! use std::time::{Duration, Instant};
//!
//! let mut timers = TimerQueue::new();
//! let now = Instant::now();
//! timers.start_one_shot_at(now + Duration::from_millis(10), "after-select");
//!
//! for (_id, payload) in timers.process_expired(now + Duration::from_millis(10)) {
//!     assert_eq!(payload, "after-select");
//! }
//! ```

mod error;
pub mod logging;
pub mod signal;
pub mod timer;

pub use error::{CoreError, Result, TimerError};
pub use logging::PerfSpan;
pub use signal::{CancelableSignal, ConnectionId, Propagation, Signal};
pub use timer::{TimerId, TimerQueue};
