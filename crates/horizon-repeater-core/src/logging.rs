//! Logging facilities for Horizon Repeater.
//!
//! Horizon Repeater uses the `tracing` crate for instrumentation. To see logs,
//! install a tracing subscriber in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_repeater=debug")
//!     .init();
//! ```
//!
//! Per-element realize/recycle events are logged at `trace`, layout pass
//! summaries and collection changes at `debug`, recoverable misuse at `warn`.

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core primitives target.
    pub const CORE: &str = "horizon_repeater_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "horizon_repeater_core::signal";
    /// Observable field target.
    pub const OBSERVABLE: &str = "horizon_repeater_core::observable";
    /// Item repeater (realization, change processing) target.
    pub const REPEATER: &str = "horizon_repeater::repeater";
    /// Recycle pool target.
    pub const POOL: &str = "horizon_repeater::pool";
    /// Element factory target.
    pub const FACTORY: &str = "horizon_repeater::factory";
    /// Layout strategy target.
    pub const LAYOUT: &str = "horizon_repeater::layout";
    /// Items source target.
    pub const ITEMS: &str = "horizon_repeater::items";
    /// Selection model target.
    pub const SELECTION: &str = "horizon_repeater::selection";
    /// Performance spans target.
    pub const PERF: &str = "horizon_repeater::perf";
}

/// Performance span guard for timing a layout pass or other operation.
///
/// # Example
///
/// ```
/// use horizon_repeater_core::logging::PerfSpan;
///
/// {
///     let _span = PerfSpan::new("measure");
///     // ... do work ...
/// }
/// ```
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    ///
    /// The span will be active until the guard is dropped.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: "horizon_repeater::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perf_span() {
        let _span = PerfSpan::new("test_operation");
    }
}
