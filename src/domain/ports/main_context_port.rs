//! Port definition for the UI-affine execution context.

use crate::domain::errors::MainContextClosed;

/// Unit of work run on the main context.
pub type MainTask = Box<dyn FnOnce() + Send + 'static>;

/// Schedules work on the single designated main context.
pub trait MainContextPort: Send + Sync {
    /// Queues `task` to run later; tasks from one poster run in FIFO order.
    ///
    /// # Errors
    /// Returns [`MainContextClosed`] if the task will never run.
    fn post(&self, task: MainTask) -> Result<(), MainContextClosed>;
}
