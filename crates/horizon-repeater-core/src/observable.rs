//! Observable fields with typed change notification.
//!
//! An [`Observable<T>`] pairs a value with a [`Signal`] that fires with the old
//! and new value whenever [`set`](Observable::set) actually changes it.
//!
//! Writes made from inside a change slot are applied, but do not trigger a
//! nested notification. Observers see each outermost change once and a pair of
//! mutually-updating observers cannot loop forever.
//!
//! # Example
//!
//! ```
//! use horizon_repeater_core::Observable;
//!
//! let cache_length = Observable::new(2.0_f64);
//! cache_length.changed().connect(|change| {
//!     println!("cache length {} -> {}", change.old, change.new);
//! });
//!
//! assert!(cache_length.set(4.0));
//! assert!(!cache_length.set(4.0));
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::signal::Signal;

/// Old and new value carried by an [`Observable`] change notification.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyChange<T> {
    /// The value before the change.
    pub old: T,
    /// The value after the change.
    pub new: T,
}

/// A value with a change-notification channel.
pub struct Observable<T> {
    value: RwLock<T>,
    changed: Signal<PropertyChange<T>>,
    notifying: AtomicBool,
}

/// Clears the re-entrancy flag even if a slot panics.
struct NotifyGuard<'a>(&'a AtomicBool);

impl Drop for NotifyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<T> Observable<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create an observable holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
            changed: Signal::new(),
            notifying: AtomicBool::new(false),
        }
    }

    /// Get a clone of the current value.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Access the current value by reference.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.read())
    }

    /// Set the value, notifying observers if it changed.
    ///
    /// Returns `true` if the stored value changed.
    pub fn set(&self, value: T) -> bool {
        let old = {
            let mut current = self.value.write();
            if *current == value {
                return false;
            }
            std::mem::replace(&mut *current, value.clone())
        };

        if self.notifying.swap(true, Ordering::AcqRel) {
            tracing::trace!(
                target: "horizon_repeater_core::observable",
                "re-entrant change suppressed"
            );
            return true;
        }
        let _guard = NotifyGuard(&self.notifying);
        self.changed.emit(PropertyChange { old, new: value });
        true
    }

    /// Set the value without notifying observers.
    ///
    /// Returns `true` if the stored value changed.
    pub fn set_silent(&self, value: T) -> bool {
        let mut current = self.value.write();
        if *current == value {
            return false;
        }
        *current = value;
        true
    }

    /// The change channel.
    pub fn changed(&self) -> &Signal<PropertyChange<T>> {
        &self.changed
    }
}

impl<T> Default for Observable<T>
where
    T: Clone + PartialEq + Send + Sync + Default + 'static,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("value", &*self.value.read())
            .finish()
    }
}
