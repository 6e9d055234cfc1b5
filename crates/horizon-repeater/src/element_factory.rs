//! Element factories: turning data items into realized elements and back.
//!
//! The repeater asks an [`ElementFactory`] for an element whenever a layout
//! realizes an index, and hands the element back when it is derealized. The
//! factories here are all pool-backed:
//!
//! - [`TemplateElementFactory`] - one fixed template
//! - [`SelectorElementFactory`] - a [`TemplateSelector`] picks the template per item
//! - [`RecyclingElementFactory`] - named templates, a key-selector callback and
//!   a clear callback, with an explicitly provided pool
//!
//! Custom strategies implement [`ElementFactory`] directly.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use crate::config::PoolScope;
use crate::element::{ContentPresenter, Element};
use crate::error::{RepeaterError, RepeaterResult};
use crate::items_source::ItemValue;
use crate::recycle_pool::RecyclePool;
use crate::repeater::RepeaterId;
use crate::template::{DataTemplate, TemplateKey, TemplateSelector};

/// Arguments for [`ElementFactory::get_element`].
pub struct ElementFactoryGetArgs<'a> {
    pub index: usize,
    pub data: &'a ItemValue,
    pub owner: RepeaterId,
}

/// Arguments for [`ElementFactory::recycle_element`].
pub struct ElementFactoryRecycleArgs<'a> {
    pub element: &'a Element,
    pub owner: RepeaterId,
}

/// Realizes and reclaims elements for a repeater.
pub trait ElementFactory: Send + Sync {
    /// Produce an element bound to `args.data`.
    fn get_element(&self, args: &ElementFactoryGetArgs<'_>) -> RepeaterResult<Element>;

    /// Take back an element the repeater no longer needs.
    fn recycle_element(&self, args: &ElementFactoryRecycleArgs<'_>);

    /// Drop everything pooled on behalf of `owner`, returning the dropped elements.
    fn clear_pool(&self, _owner: RepeaterId) -> Vec<Element> {
        Vec::new()
    }
}

fn bind(element: Element, data: &ItemValue) -> Element {
    element.set_data_context(Some(data.clone()));
    element
}

fn unbind_and_pool(pool: &RecyclePool, args: &ElementFactoryRecycleArgs<'_>) {
    let element = args.element;
    element.set_data_context(None);
    element.clear_selection_state();
    match element.template_key() {
        Some(key) => pool.put(key.clone(), element.clone(), Some(args.owner)),
        None => tracing::warn!(
            target: "horizon_repeater::factory",
            element = element.id().as_u64(),
            "element has no template key, dropping instead of pooling"
        ),
    }
}

/// Factory for a single, fixed template.
pub struct TemplateElementFactory {
    template: Arc<DataTemplate>,
    pool: Arc<RecyclePool>,
}

impl TemplateElementFactory {
    pub fn new(template: Arc<DataTemplate>, pool: Arc<RecyclePool>) -> Self {
        Self { template, pool }
    }

    pub fn template(&self) -> &Arc<DataTemplate> {
        &self.template
    }

    pub fn pool(&self) -> &Arc<RecyclePool> {
        &self.pool
    }
}

impl ElementFactory for TemplateElementFactory {
    fn get_element(&self, args: &ElementFactoryGetArgs<'_>) -> RepeaterResult<Element> {
        let element = self
            .pool
            .try_get(self.template.key(), Some(args.owner))
            .unwrap_or_else(|| self.template.instantiate());
        Ok(bind(element, args.data))
    }

    fn recycle_element(&self, args: &ElementFactoryRecycleArgs<'_>) {
        unbind_and_pool(&self.pool, args);
    }

    fn clear_pool(&self, owner: RepeaterId) -> Vec<Element> {
        self.pool.clear_owned_by(owner)
    }
}

/// Factory that asks a [`TemplateSelector`] which template each item uses.
pub struct SelectorElementFactory {
    selector: Arc<dyn TemplateSelector>,
    pool: Arc<RecyclePool>,
}

impl SelectorElementFactory {
    pub fn new(selector: Arc<dyn TemplateSelector>, pool: Arc<RecyclePool>) -> Self {
        Self { selector, pool }
    }

    pub fn pool(&self) -> &Arc<RecyclePool> {
        &self.pool
    }
}

impl ElementFactory for SelectorElementFactory {
    fn get_element(&self, args: &ElementFactoryGetArgs<'_>) -> RepeaterResult<Element> {
        let template = self
            .selector
            .select_template(args.data, args.index)
            .ok_or(RepeaterError::NullTemplate { index: args.index })?;
        let element = self
            .pool
            .try_get(template.key(), Some(args.owner))
            .unwrap_or_else(|| template.instantiate());
        Ok(bind(element, args.data))
    }

    fn recycle_element(&self, args: &ElementFactoryRecycleArgs<'_>) {
        unbind_and_pool(&self.pool, args);
    }

    fn clear_pool(&self, owner: RepeaterId) -> Vec<Element> {
        self.pool.clear_owned_by(owner)
    }
}

type KeySelector = Arc<dyn Fn(&ItemValue, usize, RepeaterId) -> TemplateKey + Send + Sync>;
type ClearCallback = Arc<dyn Fn(&Element, RepeaterId) + Send + Sync>;

/// Factory over a set of named templates.
///
/// Elements are pooled under the name their template was registered with. With
/// several templates a key selector (or a default key) decides which one an
/// item uses; with one template that template is always used.
///
/// # Example
///
/// ```
/// use horizon_repeater::{DataTemplate, EmptyVisual, RecyclingElementFactory, TemplateKey};
///
/// let factory = RecyclingElementFactory::new()
///     .with_template("even", DataTemplate::new(|| EmptyVisual))
///     .with_template("odd", DataTemplate::new(|| EmptyVisual))
///     .on_select_template_key(|item, _index, _owner| {
///         let value = item.downcast_ref::<i32>().copied().unwrap_or(0);
///         TemplateKey::from(if value % 2 == 0 { "even" } else { "odd" })
///     });
/// ```
pub struct RecyclingElementFactory {
    templates: HashMap<TemplateKey, Arc<DataTemplate>>,
    default_key: Option<TemplateKey>,
    select_template_key: Option<KeySelector>,
    clear_element: Option<ClearCallback>,
    pool: Arc<RecyclePool>,
}

impl Default for RecyclingElementFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl RecyclingElementFactory {
    /// An empty factory with its own pool.
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
            default_key: None,
            select_template_key: None,
            clear_element: None,
            pool: Arc::new(RecyclePool::new()),
        }
    }

    /// Use `pool` for recycled elements, e.g. one shared with another factory.
    pub fn with_pool(mut self, pool: Arc<RecyclePool>) -> Self {
        self.pool = pool;
        self
    }

    /// Register `template` under `key`.
    pub fn with_template(mut self, key: impl Into<TemplateKey>, template: DataTemplate) -> Self {
        self.templates.insert(key.into(), Arc::new(template));
        self
    }

    /// Key used when the selected key has no template.
    pub fn with_default_template_key(mut self, key: impl Into<TemplateKey>) -> Self {
        self.default_key = Some(key.into());
        self
    }

    /// Register the callback choosing a template key from `(item, index, owner)`.
    pub fn on_select_template_key<F>(mut self, select: F) -> Self
    where
        F: Fn(&ItemValue, usize, RepeaterId) -> TemplateKey + Send + Sync + 'static,
    {
        self.select_template_key = Some(Arc::new(select));
        self
    }

    /// Register the callback that resets element state before pooling.
    pub fn on_clear_element<F>(mut self, clear: F) -> Self
    where
        F: Fn(&Element, RepeaterId) + Send + Sync + 'static,
    {
        self.clear_element = Some(Arc::new(clear));
        self
    }

    pub fn pool(&self) -> &Arc<RecyclePool> {
        &self.pool
    }

    pub fn template_count(&self) -> usize {
        self.templates.len()
    }

    fn select_key(&self, args: &ElementFactoryGetArgs<'_>) -> RepeaterResult<TemplateKey> {
        match (self.templates.len(), &self.select_template_key) {
            (0, _) => Err(RepeaterError::TemplateNotFound {
                key: self
                    .default_key
                    .clone()
                    .unwrap_or_else(|| TemplateKey::from("<none>")),
            }),
            (1, Some(_)) => Err(RepeaterError::InvalidUsage(
                "a template key selector is registered but the factory has a single template; \
                 remove the selector or register more templates"
                    .to_string(),
            )),
            (1, None) => Ok(self
                .templates
                .keys()
                .next()
                .cloned()
                .unwrap_or_else(|| TemplateKey::from("<none>"))),
            (_, Some(select)) => Ok(select(args.data, args.index, args.owner)),
            (_, None) => self.default_key.clone().ok_or_else(|| {
                RepeaterError::InvalidUsage(
                    "several templates are registered but there is no template key selector \
                     or default template key"
                        .to_string(),
                )
            }),
        }
    }
}

impl ElementFactory for RecyclingElementFactory {
    fn get_element(&self, args: &ElementFactoryGetArgs<'_>) -> RepeaterResult<Element> {
        let selected = self.select_key(args)?;
        let (key, template) = match self.templates.get(&selected) {
            Some(template) => (selected, template),
            None => {
                let fallback = self
                    .default_key
                    .as_ref()
                    .and_then(|key| self.templates.get_key_value(key));
                match fallback {
                    Some((key, template)) => (key.clone(), template),
                    None => return Err(RepeaterError::TemplateNotFound { key: selected }),
                }
            }
        };

        let element = match self.pool.try_get(&key, Some(args.owner)) {
            Some(element) => element,
            None => {
                tracing::trace!(target: "horizon_repeater::factory", key = %key, index = args.index, "pool miss, instantiating");
                template.instantiate_with_key(key)
            }
        };
        Ok(bind(element, args.data))
    }

    fn recycle_element(&self, args: &ElementFactoryRecycleArgs<'_>) {
        if let Some(clear) = &self.clear_element {
            clear(args.element, args.owner);
        }
        unbind_and_pool(&self.pool, args);
    }

    fn clear_pool(&self, owner: RepeaterId) -> Vec<Element> {
        self.pool.clear_owned_by(owner)
    }
}

impl fmt::Debug for RecyclingElementFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&TemplateKey> = self.templates.keys().collect();
        keys.sort();
        f.debug_struct("RecyclingElementFactory")
            .field("templates", &keys)
            .field("default_key", &self.default_key)
            .field("has_selector", &self.select_template_key.is_some())
            .field("pool", &self.pool)
            .finish()
    }
}

/// The template behind [`ItemTemplate::None`], one per process so shared
/// pools can find it again.
static CONTENT_PRESENTER_TEMPLATE: LazyLock<Arc<DataTemplate>> = LazyLock::new(|| {
    Arc::new(DataTemplate::new(ContentPresenter::default).with_key("content-presenter"))
});

/// How a repeater turns items into elements.
#[derive(Clone, Default)]
pub enum ItemTemplate {
    /// Items that are [`Element`]s are used as-is; anything else is shown in a
    /// [`ContentPresenter`].
    #[default]
    None,
    /// One template for every item.
    Template(Arc<DataTemplate>),
    /// A template chosen per item.
    Selector(Arc<dyn TemplateSelector>),
    /// A custom or preconfigured factory.
    Factory(Arc<dyn ElementFactory>),
}

impl ItemTemplate {
    pub fn selector<S: TemplateSelector + 'static>(selector: S) -> Self {
        Self::Selector(Arc::new(selector))
    }

    pub fn factory<F: ElementFactory + 'static>(factory: F) -> Self {
        Self::Factory(Arc::new(factory))
    }

    /// Build the factory a repeater realizes through.
    pub(crate) fn to_factory(&self, scope: &PoolScope) -> Arc<dyn ElementFactory> {
        match self {
            Self::None => {
                let template = CONTENT_PRESENTER_TEMPLATE.clone();
                let pool = scope.pool_for_template(&template);
                Arc::new(TemplateElementFactory::new(template, pool))
            }
            Self::Template(template) => Arc::new(TemplateElementFactory::new(
                template.clone(),
                scope.pool_for_template(template),
            )),
            Self::Selector(selector) => Arc::new(SelectorElementFactory::new(
                selector.clone(),
                scope.pool_for_selector(),
            )),
            Self::Factory(factory) => factory.clone(),
        }
    }
}

impl From<DataTemplate> for ItemTemplate {
    fn from(template: DataTemplate) -> Self {
        Self::Template(Arc::new(template))
    }
}

impl From<Arc<DataTemplate>> for ItemTemplate {
    fn from(template: Arc<DataTemplate>) -> Self {
        Self::Template(template)
    }
}

impl fmt::Debug for ItemTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Template(template) => f.debug_tuple("Template").field(template).finish(),
            Self::Selector(_) => f.write_str("Selector(..)"),
            Self::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}
