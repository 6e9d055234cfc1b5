//! Shared fixtures for the repeater integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use horizon_repeater::layout::{
    ElementRealizationOptions, VirtualizingLayout, VirtualizingLayoutContext,
};
use horizon_repeater::{
    DataTemplate, Element, ItemValue, Measurable, Rect, RecyclingElementFactory, RepeaterResult,
    SelectionAware, Size, TemplateKey, Visual,
};
use parking_lot::Mutex;

/// Install a test-writer subscriber once. Honors `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A fixed-height row showing its item as text.
#[derive(Debug, Default)]
pub struct TextVisual {
    pub text: String,
    pub height: f32,
    pub selected: Option<bool>,
}

impl TextVisual {
    pub fn new(height: f32) -> Self {
        Self {
            height,
            ..Self::default()
        }
    }
}

impl Measurable for TextVisual {
    fn measure(&mut self, available: Size) -> Size {
        let width = if available.width.is_finite() { available.width } else { 100.0 };
        Size::new(width, self.height)
    }
}

impl SelectionAware for TextVisual {
    fn set_selection_state(&mut self, state: Option<bool>) {
        self.selected = state;
    }
}

impl Visual for TextVisual {
    fn bind(&mut self, data: Option<&ItemValue>) {
        self.text = match data {
            Some(data) => text_for(data),
            None => String::new(),
        };
    }
}

fn text_for(data: &ItemValue) -> String {
    if let Some(value) = data.downcast_ref::<i32>() {
        value.to_string()
    } else if let Some(value) = data.downcast_ref::<u32>() {
        value.to_string()
    } else if let Some(value) = data.downcast_ref::<String>() {
        value.clone()
    } else {
        "?".to_string()
    }
}

/// A template of `height`-tall text rows.
pub fn text_template(height: f32) -> DataTemplate {
    DataTemplate::new(move || TextVisual::new(height))
}

/// The text an element shows, if its visual is a [`TextVisual`].
pub fn text_of(element: &Element) -> Option<String> {
    element.with_visual(|visual: &TextVisual| visual.text.clone())
}

pub fn selection_of(element: &Element) -> Option<Option<bool>> {
    element.with_visual(|visual: &TextVisual| visual.selected)
}

/// Even items use the `even` template, odd items `odd`.
pub fn parity_factory() -> RecyclingElementFactory {
    RecyclingElementFactory::new()
        .with_template("even", text_template(10.0))
        .with_template("odd", text_template(20.0))
        .on_select_template_key(|item, _index, _owner| {
            let even = item.downcast_ref::<i32>().is_some_and(|value| value % 2 == 0);
            TemplateKey::from(if even { "even" } else { "odd" })
        })
}

type MeasureFn =
    Box<dyn Fn(&mut dyn VirtualizingLayoutContext, Size) -> RepeaterResult<Size> + Send + Sync>;

fn arrange_in_place(
    _context: &mut dyn VirtualizingLayoutContext,
    final_size: Size,
) -> RepeaterResult<Size> {
    Ok(final_size)
}

/// A virtualizing layout whose passes are closures.
pub struct MockLayout {
    on_measure: MeasureFn,
    on_arrange: MeasureFn,
}

impl MockLayout {
    pub fn new<F>(measure: F) -> Self
    where
        F: Fn(&mut dyn VirtualizingLayoutContext, Size) -> RepeaterResult<Size> + Send + Sync + 'static,
    {
        Self {
            on_measure: Box::new(measure),
            on_arrange: Box::new(arrange_in_place),
        }
    }

    pub fn with_arrange<F>(mut self, arrange: F) -> Self
    where
        F: Fn(&mut dyn VirtualizingLayoutContext, Size) -> RepeaterResult<Size> + Send + Sync + 'static,
    {
        self.on_arrange = Box::new(arrange);
        self
    }

    /// Realize exactly the listed requests each pass, skipping indices past
    /// the end of the source, and stack them in 10px rows by index.
    pub fn requesting(requests: Arc<Mutex<Vec<(usize, ElementRealizationOptions)>>>) -> Self {
        Self::new(move |context, available| {
            let count = context.item_count();
            let requested = requests.lock().clone();
            for (index, options) in requested {
                if index < count {
                    let element = context.get_or_create_element_at(index, options)?;
                    element.measure(Size::new(available.width, f32::INFINITY));
                }
            }
            Ok(Size::new(available.width, count as f32 * 10.0))
        })
        .with_arrange(|context, final_size| {
            if let Some((first, last)) = context.realized_range() {
                for index in first..=last {
                    if let Some(element) = context.try_get_element_at(index) {
                        element.arrange(Rect::new(0.0, index as f32 * 10.0, final_size.width, 10.0));
                    }
                }
            }
            Ok(final_size)
        })
    }
}

impl VirtualizingLayout for MockLayout {
    fn measure(
        &self,
        context: &mut dyn VirtualizingLayoutContext,
        available: Size,
    ) -> RepeaterResult<Size> {
        (self.on_measure)(context, available)
    }

    fn arrange(
        &self,
        context: &mut dyn VirtualizingLayoutContext,
        final_size: Size,
    ) -> RepeaterResult<Size> {
        (self.on_arrange)(context, final_size)
    }
}

/// Shared request list for [`MockLayout::requesting`].
pub fn requests(
    indices: impl IntoIterator<Item = usize>,
) -> Arc<Mutex<Vec<(usize, ElementRealizationOptions)>>> {
    Arc::new(Mutex::new(
        indices
            .into_iter()
            .map(|index| (index, ElementRealizationOptions::NONE))
            .collect(),
    ))
}
