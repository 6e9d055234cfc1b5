//! Configuration for item repeaters.

use std::fmt;
use std::sync::Arc;

use crate::recycle_pool::{RecyclePool, RecyclePoolRegistry};
use crate::template::DataTemplate;

/// Where a repeater's template-backed factories keep recycled elements.
#[derive(Clone, Default)]
pub enum PoolScope {
    /// Each repeater has private pools. Elements never move between repeaters.
    #[default]
    PerRepeater,
    /// Pools come from an application-owned registry, keyed by template, so
    /// repeaters using the same template share recycled elements.
    Shared(Arc<RecyclePoolRegistry>),
}

impl PoolScope {
    /// The pool a single-template factory should use for `template`.
    pub fn pool_for_template(&self, template: &DataTemplate) -> Arc<RecyclePool> {
        match self {
            Self::PerRepeater => Arc::new(RecyclePool::new()),
            Self::Shared(registry) => registry.pool_for_template(template),
        }
    }

    /// The pool a multi-template factory should use.
    pub fn pool_for_selector(&self) -> Arc<RecyclePool> {
        match self {
            Self::PerRepeater => Arc::new(RecyclePool::new()),
            Self::Shared(registry) => registry.shared_pool(),
        }
    }

    pub fn is_shared(&self) -> bool {
        matches!(self, Self::Shared(_))
    }
}

impl fmt::Debug for PoolScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PerRepeater => f.write_str("PerRepeater"),
            Self::Shared(registry) => f.debug_tuple("Shared").field(registry).finish(),
        }
    }
}

/// Settings for an [`ItemsRepeater`](crate::ItemsRepeater).
#[derive(Clone, Debug)]
pub struct RepeaterConfig {
    /// Horizontal realization window, in multiples of the viewport width.
    /// Half is added on each side of the viewport.
    pub horizontal_cache_length: f32,
    /// Vertical realization window, in multiples of the viewport height.
    pub vertical_cache_length: f32,
    /// Pool sharing policy for template-backed factories.
    pub pool_scope: PoolScope,
    /// Evict this repeater's pooled elements when the source resets.
    pub clear_pool_on_reset: bool,
}

impl Default for RepeaterConfig {
    fn default() -> Self {
        Self {
            horizontal_cache_length: 2.0,
            vertical_cache_length: 2.0,
            pool_scope: PoolScope::PerRepeater,
            clear_pool_on_reset: true,
        }
    }
}

impl RepeaterConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the horizontal cache length. Negative values are clamped to zero.
    pub fn horizontal_cache_length(mut self, length: f32) -> Self {
        self.horizontal_cache_length = length.max(0.0);
        self
    }

    /// Set the vertical cache length. Negative values are clamped to zero.
    pub fn vertical_cache_length(mut self, length: f32) -> Self {
        self.vertical_cache_length = length.max(0.0);
        self
    }

    /// Realize only what intersects the viewport.
    pub fn no_cache(mut self) -> Self {
        self.horizontal_cache_length = 0.0;
        self.vertical_cache_length = 0.0;
        self
    }

    /// Share pools through `registry`.
    pub fn shared_pools(mut self, registry: Arc<RecyclePoolRegistry>) -> Self {
        self.pool_scope = PoolScope::Shared(registry);
        self
    }

    /// Keep pooled elements when the source resets.
    pub fn keep_pool_on_reset(mut self) -> Self {
        self.clear_pool_on_reset = false;
        self
    }
}
