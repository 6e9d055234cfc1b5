//! Realized elements and the visual capabilities they wrap.
//!
//! An [`Element`] is the repeater's handle to one piece of realized UI. It is
//! cheap to clone and compares by identity, so the same element can be tracked
//! by the realized map, a recycle pool and the host at once.
//!
//! What an element actually draws is up to its [`Visual`], produced by a
//! template. Visuals are composed from small capability traits:
//! [`Measurable`] for layout and [`SelectionAware`] for selection state.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use horizon_repeater_core::{Rect, Size};
use parking_lot::{Mutex, RwLock};

use crate::items_source::ItemValue;
use crate::repeater::RepeaterId;
use crate::template::TemplateKey;

static NEXT_ELEMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of an [`Element`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u64);

impl ElementId {
    fn next() -> Self {
        Self(NEXT_ELEMENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Something that can report a desired size and accept a final position.
pub trait Measurable {
    /// Compute the desired size given the space offered by the layout.
    fn measure(&mut self, available: Size) -> Size;

    /// Accept the bounds chosen by the layout.
    fn arrange(&mut self, _bounds: Rect) {}
}

/// Something that reflects the selection state of the item it displays.
pub trait SelectionAware {
    /// `Some(true)` selected, `Some(false)` not selected, `None` partially selected.
    fn set_selection_state(&mut self, _state: Option<bool>) {}
}

/// The visual content of an element, created by a template.
pub trait Visual: Measurable + SelectionAware + Any + Send + Sync {
    /// Called when the element is bound to a data item, or unbound with `None`.
    fn bind(&mut self, _data: Option<&ItemValue>) {}
}

/// Visual for templates that produce no content. Always zero-sized.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyVisual;

impl Measurable for EmptyVisual {
    fn measure(&mut self, _available: Size) -> Size {
        Size::ZERO
    }
}

impl SelectionAware for EmptyVisual {}
impl Visual for EmptyVisual {}

/// Visual used when no item template is set. Holds the bound item as content.
#[derive(Default)]
pub struct ContentPresenter {
    content: Option<ItemValue>,
}

impl ContentPresenter {
    pub fn content(&self) -> Option<&ItemValue> {
        self.content.as_ref()
    }
}

impl Measurable for ContentPresenter {
    fn measure(&mut self, _available: Size) -> Size {
        Size::ZERO
    }
}

impl SelectionAware for ContentPresenter {}

impl Visual for ContentPresenter {
    fn bind(&mut self, data: Option<&ItemValue>) {
        self.content = data.cloned();
    }
}

#[derive(Default)]
struct ElementState {
    data_context: Option<ItemValue>,
    desired_size: Size,
    layout_slot: Rect,
    owner: Option<RepeaterId>,
    selection: Option<Option<bool>>,
}

struct ElementInner {
    id: ElementId,
    template_key: Option<TemplateKey>,
    visual: Mutex<Box<dyn Visual>>,
    state: RwLock<ElementState>,
}

/// Shared handle to a realized visual element.
#[derive(Clone)]
pub struct Element {
    inner: Arc<ElementInner>,
}

impl Element {
    /// Create an element that was not produced by a template.
    pub fn new(visual: impl Visual) -> Self {
        Self::from_boxed(None, Box::new(visual))
    }

    pub(crate) fn from_boxed(template_key: Option<TemplateKey>, visual: Box<dyn Visual>) -> Self {
        Self {
            inner: Arc::new(ElementInner {
                id: ElementId::next(),
                template_key,
                visual: Mutex::new(visual),
                state: RwLock::new(ElementState::default()),
            }),
        }
    }

    pub fn id(&self) -> ElementId {
        self.inner.id
    }

    /// The recycling key of the template that created this element.
    pub fn template_key(&self) -> Option<&TemplateKey> {
        self.inner.template_key.as_ref()
    }

    pub fn data_context(&self) -> Option<ItemValue> {
        self.inner.state.read().data_context.clone()
    }

    /// Bind the element to `data` (or unbind with `None`).
    pub fn set_data_context(&self, data: Option<ItemValue>) {
        self.inner.visual.lock().bind(data.as_ref());
        self.inner.state.write().data_context = data;
    }

    /// Measure the visual and remember its desired size.
    pub fn measure(&self, available: Size) -> Size {
        let desired = self.inner.visual.lock().measure(available);
        self.inner.state.write().desired_size = desired;
        desired
    }

    /// Size reported by the last [`measure`](Self::measure).
    pub fn desired_size(&self) -> Size {
        self.inner.state.read().desired_size
    }

    /// Position the visual and remember its bounds.
    pub fn arrange(&self, bounds: Rect) {
        self.inner.visual.lock().arrange(bounds);
        self.inner.state.write().layout_slot = bounds;
    }

    /// Bounds given by the last [`arrange`](Self::arrange).
    pub fn layout_slot(&self) -> Rect {
        self.inner.state.read().layout_slot
    }

    /// The repeater this element is attached to, if any.
    pub fn owner(&self) -> Option<RepeaterId> {
        self.inner.state.read().owner
    }

    pub(crate) fn set_owner(&self, owner: Option<RepeaterId>) {
        self.inner.state.write().owner = owner;
    }

    /// Push a selection state into the visual.
    ///
    /// Returns `false` if the visual already had this state.
    pub fn set_selection_state(&self, state: Option<bool>) -> bool {
        {
            let mut element_state = self.inner.state.write();
            if element_state.selection == Some(state) {
                return false;
            }
            element_state.selection = Some(state);
        }
        self.inner.visual.lock().set_selection_state(state);
        true
    }

    /// Last selection state pushed with [`set_selection_state`](Self::set_selection_state).
    pub fn selection_state(&self) -> Option<Option<bool>> {
        self.inner.state.read().selection
    }

    pub(crate) fn clear_selection_state(&self) {
        self.inner.state.write().selection = None;
    }

    /// Run `f` on the visual if it is a `V`.
    pub fn with_visual<V, R>(&self, f: impl FnOnce(&V) -> R) -> Option<R>
    where
        V: Visual,
    {
        let visual = self.inner.visual.lock();
        let any: &dyn Any = &**visual;
        any.downcast_ref::<V>().map(f)
    }

    /// Run `f` on the visual mutably if it is a `V`.
    pub fn with_visual_mut<V, R>(&self, f: impl FnOnce(&mut V) -> R) -> Option<R>
    where
        V: Visual,
    {
        let mut visual = self.inner.visual.lock();
        let any: &mut dyn Any = &mut **visual;
        any.downcast_mut::<V>().map(f)
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Element {}

impl Hash for Element {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("Element")
            .field("id", &self.inner.id)
            .field("template_key", &self.inner.template_key)
            .field("owner", &state.owner)
            .field("layout_slot", &state.layout_slot)
            .finish()
    }
}

static_assertions::assert_impl_all!(Element: Send, Sync);
