//! Data templates: recipes for building the visual of an element.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::element::{Element, EmptyVisual, Visual};
use crate::items_source::ItemValue;

static NEXT_TEMPLATE_ID: AtomicU64 = AtomicU64::new(1);

/// Recycling key: elements built from templates with the same key are interchangeable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateKey(Arc<str>);

impl TemplateKey {
    pub fn new(key: impl Into<Arc<str>>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TemplateKey {
    fn from(key: &str) -> Self {
        Self(Arc::from(key))
    }
}

impl From<String> for TemplateKey {
    fn from(key: String) -> Self {
        Self(Arc::from(key))
    }
}

impl fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a [`DataTemplate`] instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateId(u64);

type VisualBuilder = Arc<dyn Fn() -> Option<Box<dyn Visual>> + Send + Sync>;

/// Builds element visuals.
///
/// Each template gets a unique [`TemplateId`] and, unless overridden with
/// [`with_key`](Self::with_key), a recycling key derived from it.
///
/// # Example
///
/// ```
/// use horizon_repeater::{DataTemplate, EmptyVisual};
///
/// let template = DataTemplate::new(|| EmptyVisual).with_key("spacer");
/// let element = template.instantiate();
/// assert_eq!(element.template_key().map(|k| k.as_str()), Some("spacer"));
/// ```
#[derive(Clone)]
pub struct DataTemplate {
    id: TemplateId,
    key: TemplateKey,
    build: VisualBuilder,
}

impl DataTemplate {
    /// A template whose visual is built by `build`.
    pub fn new<F, V>(build: F) -> Self
    where
        F: Fn() -> V + Send + Sync + 'static,
        V: Visual,
    {
        Self::from_fn(move || Some(Box::new(build()) as Box<dyn Visual>))
    }

    /// A template built by a closure that may produce no visual at all.
    pub fn from_fn<F>(build: F) -> Self
    where
        F: Fn() -> Option<Box<dyn Visual>> + Send + Sync + 'static,
    {
        let id = TemplateId(NEXT_TEMPLATE_ID.fetch_add(1, Ordering::Relaxed));
        Self {
            id,
            key: TemplateKey::from(format!("template-{}", id.0)),
            build: Arc::new(build),
        }
    }

    /// A template with no content. Its elements are zero-sized.
    pub fn empty() -> Self {
        Self::from_fn(|| None)
    }

    /// Override the recycling key.
    pub fn with_key(mut self, key: impl Into<TemplateKey>) -> Self {
        self.key = key.into();
        self
    }

    pub fn id(&self) -> TemplateId {
        self.id
    }

    pub fn key(&self) -> &TemplateKey {
        &self.key
    }

    /// Build a new, unbound element.
    pub fn instantiate(&self) -> Element {
        self.instantiate_with_key(self.key.clone())
    }

    /// Build an element recycled under `key` instead of the template's own key.
    pub(crate) fn instantiate_with_key(&self, key: TemplateKey) -> Element {
        let visual = (self.build)().unwrap_or_else(|| Box::new(EmptyVisual));
        Element::from_boxed(Some(key), visual)
    }
}

impl fmt::Debug for DataTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataTemplate")
            .field("id", &self.id)
            .field("key", &self.key)
            .finish()
    }
}

/// Picks a template per item.
///
/// Returning `None` is a configuration error reported by the layout pass.
pub trait TemplateSelector: Send + Sync {
    fn select_template(&self, item: &ItemValue, index: usize) -> Option<Arc<DataTemplate>>;
}

impl<F> TemplateSelector for F
where
    F: Fn(&ItemValue, usize) -> Option<Arc<DataTemplate>> + Send + Sync,
{
    fn select_template(&self, item: &ItemValue, index: usize) -> Option<Arc<DataTemplate>> {
        self(item, index)
    }
}
