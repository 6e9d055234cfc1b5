//! Selection tracking over flat and hierarchical item collections.
//!
//! [`SelectionModel`] stores selected [`IndexPath`]s independently of which
//! elements are realized. [`sync`] pushes that state into realized elements
//! and decides which accessibility events to request, and [`interaction`]
//! maps pointer and key input onto model operations.

pub mod interaction;
mod index_path;
mod model;
pub mod sync;

pub use index_path::IndexPath;
pub use model::{FlatSelectionSource, SelectionChangedArgs, SelectionModel, SelectionSource};
pub use sync::{AutomationRequest, SelectionAutomationEvent, automation_event_for};
