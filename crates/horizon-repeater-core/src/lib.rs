//! Core primitives for Horizon Repeater.
//!
//! This crate provides the building blocks the repeater engine is written
//! against:
//!
//! - **Signal/Slot System**: Typed callback lists for change notification
//! - **Observable Fields**: Values that report old/new pairs when they change
//! - **Geometry**: Points, sizes and rectangles used by layouts and viewports
//! - **Thread Affinity**: Debug checks that UI-owned state stays on its thread
//! - **Logging**: `tracing` targets and performance spans
//!
//! # Signal/Slot Example
//!
//! ```
//! use horizon_repeater_core::Signal;
//!
//! let items_changed = Signal::<usize>::new();
//!
//! let conn_id = items_changed.connect(|count| {
//!     println!("Source now holds {} items", count);
//! });
//!
//! items_changed.emit(42);
//! items_changed.disconnect(conn_id);
//! ```
//!
//! # Observable Example
//!
//! ```
//! use horizon_repeater_core::Observable;
//!
//! let single_select = Observable::new(false);
//! single_select.changed().connect(|change| {
//!     println!("single select: {} -> {}", change.old, change.new);
//! });
//! single_select.set(true);
//! ```

pub mod geometry;
pub mod logging;
pub mod observable;
pub mod signal;
pub mod thread_check;

pub use geometry::{Point, Rect, Size};
pub use logging::PerfSpan;
pub use observable::{Observable, PropertyChange};
pub use signal::{ConnectionId, Signal};
pub use thread_check::ThreadAffinity;
