//! Tracks which identifier each display target currently wants.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::trace;

use crate::domain::entities::ImageId;
use crate::domain::ports::DisplayTarget;

/// Weak handle to a display target.
pub type TargetHandle = Weak<dyn DisplayTarget>;

struct Binding {
    target: TargetHandle,
    id: ImageId,
}

/// Last-assignment-wins table keyed by target identity.
///
/// Only weak handles are stored, so a target dropped by the host simply
/// stops matching and is pruned on the next [`AssignmentTracker::assign`].
#[derive(Default)]
pub struct AssignmentTracker {
    bindings: Mutex<HashMap<usize, Binding>>,
}

fn identity(target: &TargetHandle) -> usize {
    target.as_ptr().cast::<()>().addr()
}

impl AssignmentTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `target` to `id`, replacing any previous binding.
    pub fn assign(&self, target: &Arc<dyn DisplayTarget>, id: ImageId) {
        let handle = Arc::downgrade(target);
        let mut bindings = self.bindings.lock();
        bindings.retain(|_, binding| binding.target.strong_count() > 0);
        trace!(id = %id, "Assigned target");
        bindings.insert(identity(&handle), Binding { target: handle, id });
    }

    /// Returns the identifier currently bound to a live target.
    #[must_use]
    pub fn current(&self, target: &TargetHandle) -> Option<ImageId> {
        let bindings = self.bindings.lock();
        bindings
            .get(&identity(target))
            .filter(|b| b.target.ptr_eq(target) && b.target.strong_count() > 0)
            .map(|b| b.id.clone())
    }

    /// Returns true if `target` is alive and still bound to `id`.
    #[must_use]
    pub fn is_current(&self, target: &TargetHandle, id: &ImageId) -> bool {
        self.current(target).is_some_and(|current| current == *id)
    }

    /// Drops the binding for `target`, e.g. when the host destroys it.
    pub fn release(&self, target: &TargetHandle) {
        let mut bindings = self.bindings.lock();
        let key = identity(target);
        if bindings.get(&key).is_some_and(|b| b.target.ptr_eq(target)) {
            bindings.remove(&key);
        }
    }

    /// Removes bindings whose target has been dropped. Returns how many went.
    pub fn prune(&self) -> usize {
        let mut bindings = self.bindings.lock();
        let before = bindings.len();
        bindings.retain(|_, binding| binding.target.strong_count() > 0);
        before - bindings.len()
    }

    /// Number of stored bindings, including ones not yet pruned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.lock().len()
    }

    /// Returns true if no bindings are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for AssignmentTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssignmentTracker")
            .field("bindings", &self.len())
            .finish()
    }
}
