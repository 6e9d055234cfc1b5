//! Error types for the repeater crate.

use thiserror::Error;

use crate::template::TemplateKey;

/// Errors that can occur while realizing, laying out or recycling elements.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepeaterError {
    /// No template is registered for the key chosen for an item.
    #[error("no template is registered for key `{key}` and no default template is set")]
    TemplateNotFound { key: TemplateKey },

    /// A template selector returned no template for a realized item.
    #[error(
        "Null encountered as data template for item at index {index}. \
         The template selector must return a template for every item"
    )]
    NullTemplate { index: usize },

    /// The element factory was configured in a contradictory way.
    #[error("invalid usage: {0}")]
    InvalidUsage(String),

    /// An element was requested but no items source is set.
    #[error("ItemsSource doesn't have a value")]
    NoItemsSource,

    /// An index outside `[0, count)` was passed to the items source.
    #[error("index {index} is out of range for a source with {count} items")]
    IndexOutOfRange { index: usize, count: usize },

    /// The element is not realized by this repeater.
    #[error("element is not owned by this repeater")]
    ElementNotOwned,
}

impl RepeaterError {
    /// Errors caused by template/factory configuration.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::TemplateNotFound { .. } | Self::NullTemplate { .. } | Self::InvalidUsage(_)
        )
    }

    /// Errors caused by calling the API incorrectly.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::NoItemsSource
                | Self::IndexOutOfRange { .. }
                | Self::ElementNotOwned
        )
    }
}

/// Result type for repeater operations.
pub type RepeaterResult<T> = Result<T, RepeaterError>;
