//! Logging and tracing facilities for Horizon Bind.
//!
//! Horizon Bind uses the `tracing` crate for instrumentation. Nothing is
//! printed unless the embedding application installs a subscriber:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_bind::selection=debug")
//!     .init();
//! ```
//!
//! Every event is emitted under one of the [`targets`] so a single subsystem
//! can be filtered in or out.

use std::time::Instant;

/// Span names used throughout Horizon Bind for tracing.
pub mod span_names {
    /// Selection entry point span.
    pub const SELECT: &str = "horizon_bind::select";
    /// Selection reconciliation span.
    pub const RECONCILE: &str = "horizon_bind::reconcile";
    /// Validation pass span.
    pub const VALIDATE: &str = "horizon_bind::validate";
    /// Timer processing span.
    pub const TIMER: &str = "horizon_bind::timer";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core runtime target.
    pub const CORE: &str = "horizon_bind_core";
    /// Timer queue target.
    pub const TIMER: &str = "horizon_bind_core::timer";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "horizon_bind_core::signal";
    /// Selection controller target.
    pub const SELECTION: &str = "horizon_bind::selection";
    /// Validation engine target.
    pub const VALIDATION: &str = "horizon_bind::validation";
    /// Data actions (remove/add) target.
    pub const ACTIONS: &str = "horizon_bind::actions";
    /// Performance spans target.
    pub const PERF: &str = "horizon_bind::perf";
}

/// A guard that times an operation.
///
/// The span is entered on creation; on drop the elapsed time is logged at
/// debug level under [`targets::PERF`].
///
/// ```
/// use horizon_bind_core::PerfSpan;
///
/// {
///     let _span = PerfSpan::new("validate_group");
///     // ... expensive work ...
/// }
/// ```
pub struct PerfSpan {
    name: &'static str,
    started: Instant,
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    ///
    /// The span will be active until the guard is dropped.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: "horizon_bind::perf", "perf", operation = name);
        Self {
            name,
            started: Instant::now(),
            span: span.entered(),
        }
    }

    /// The operation name this span was created with.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Drop for PerfSpan {
    fn drop(&mut self) {
        tracing::debug!(
            target: targets::PERF,
            operation = self.name,
            elapsed_us = self.started.elapsed().as_micros() as u64,
            "operation finished"
        );
    }
}
