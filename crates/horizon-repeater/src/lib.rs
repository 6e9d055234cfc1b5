//! Horizon Repeater - virtualizing item presentation.
//!
//! An [`ItemsRepeater`] maps a data source of any size onto a bounded set of
//! realized elements. It realizes only what its layout asks for, recycles
//! everything else through keyed pools, and keeps the index to element
//! mapping consistent while the source changes underneath it.
//!
//! - **Items sources**: [`ItemsSource`], [`ObservableVec`] and change events
//! - **Templates and factories**: [`DataTemplate`], [`RecyclingElementFactory`],
//!   [`RecyclePool`]
//! - **Layouts**: the [`layout`] module, with stack and uniform grid layouts
//! - **Selection**: the [`selection`] module, a [`SelectionModel`] over index
//!   paths that survives realization churn
//!
//! # Threading
//!
//! All types are `Send + Sync` so they can live in shared application state,
//! but a repeater, its source and its selection model must only be mutated
//! from the thread that owns the UI. Debug builds assert this.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_repeater::layout::{Layout, StackLayout};
//! use horizon_repeater::{
//!     DataTemplate, ItemTemplate, ItemsRepeater, ItemsSource, Measurable, ObservableVec, Rect,
//!     RecyclingElementFactory, RepeaterResult, SelectionAware, Size, Visual,
//! };
//!
//! /// A fixed-height row.
//! struct Row(f32);
//!
//! impl Measurable for Row {
//!     fn measure(&mut self, available: Size) -> Size {
//!         Size::new(available.width, self.0)
//!     }
//! }
//! impl SelectionAware for Row {}
//! impl Visual for Row {}
//!
//! fn main() -> RepeaterResult<()> {
//!     let items = Arc::new(ObservableVec::new((0..10_000).collect::<Vec<u32>>()));
//!
//!     let factory = RecyclingElementFactory::new()
//!         .with_template("even", DataTemplate::new(|| Row(20.0)))
//!         .with_template("odd", DataTemplate::new(|| Row(30.0)))
//!         .on_select_template_key(|item, _index, _owner| {
//!             let even = item.downcast_ref::<u32>().is_some_and(|n| n % 2 == 0);
//!             let key = if even { "even" } else { "odd" };
//!             key.into()
//!         });
//!
//!     let mut repeater = ItemsRepeater::new();
//!     repeater.set_items_source(Some(items as Arc<dyn ItemsSource>));
//!     repeater.set_item_template(ItemTemplate::factory(factory));
//!     repeater.set_layout(Layout::virtualizing(StackLayout::vertical()));
//!     repeater.set_viewport(Rect::new(0.0, 0.0, 300.0, 200.0));
//!     repeater.update_layout(Size::new(300.0, 200.0))?;
//!
//!     // Only the viewport plus its cache is realized.
//!     assert!(repeater.realized_count() < 100);
//!     Ok(())
//! }
//! ```

mod config;
mod element;
mod element_factory;
mod error;
mod items_source;
pub mod layout;
mod recycle_pool;
mod repeater;
pub mod selection;
mod template;

pub use config::{PoolScope, RepeaterConfig};
pub use element::{
    ContentPresenter, Element, ElementId, EmptyVisual, Measurable, SelectionAware, Visual,
};
pub use element_factory::{
    ElementFactory, ElementFactoryGetArgs, ElementFactoryRecycleArgs, ItemTemplate,
    RecyclingElementFactory, SelectorElementFactory, TemplateElementFactory,
};
pub use error::{RepeaterError, RepeaterResult};
pub use items_source::{
    ChangeKind, CollectionChange, ItemValue, ItemsSource, ItemsSourceView, ObservableVec,
};
pub use recycle_pool::{RecyclePool, RecyclePoolRegistry};
pub use repeater::{ItemsRepeater, Realizable, RepeaterId, RepeaterSignals};
pub use selection::{IndexPath, SelectionChangedArgs, SelectionModel, SelectionSource};
pub use template::{DataTemplate, TemplateId, TemplateKey, TemplateSelector};

pub use horizon_repeater_core::{
    ConnectionId, Observable, Point, PropertyChange, Rect, Signal, Size, ThreadAffinity,
};

static_assertions::assert_impl_all!(ItemsRepeater: Send, Sync);
static_assertions::assert_impl_all!(SelectionModel: Send, Sync);
