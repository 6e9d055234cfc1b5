//! Thread affinity checks.
//!
//! Repeater state is owned by the UI thread. Nothing inside the engine locks
//! around its own state, so mutating a repeater or selection model from another
//! thread is undefined behavior as far as the engine's invariants go. In debug
//! builds [`ThreadAffinity`] turns that mistake into a panic; release builds do
//! not check.

use std::thread::ThreadId;

/// Records the thread an object was created on.
///
/// ```
/// use horizon_repeater_core::ThreadAffinity;
///
/// let affinity = ThreadAffinity::current();
/// affinity.debug_assert_same_thread();
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ThreadAffinity {
    thread_id: ThreadId,
}

impl Default for ThreadAffinity {
    fn default() -> Self {
        Self::current()
    }
}

impl ThreadAffinity {
    /// Create a new thread affinity tracker for the current thread.
    #[inline]
    pub fn current() -> Self {
        Self {
            thread_id: std::thread::current().id(),
        }
    }

    /// Get the thread ID this affinity is bound to.
    #[inline]
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Check if the current thread matches this affinity.
    #[inline]
    pub fn is_same_thread(&self) -> bool {
        std::thread::current().id() == self.thread_id
    }

    /// Debug-only assertion that we are on the owning thread.
    ///
    /// This is a no-op in release builds.
    #[inline]
    pub fn debug_assert_same_thread(&self) {
        #[cfg(debug_assertions)]
        if !self.is_same_thread() {
            self.panic_wrong_thread();
        }
    }

    #[cold]
    #[inline(never)]
    #[cfg(debug_assertions)]
    fn panic_wrong_thread(&self) -> ! {
        let current = std::thread::current();
        panic!(
            "object owned by thread {:?} accessed from thread \"{}\" ({:?}); \
             repeater state must only be touched from its UI thread",
            self.thread_id,
            current.name().unwrap_or("<unnamed>"),
            current.id(),
        )
    }
}
