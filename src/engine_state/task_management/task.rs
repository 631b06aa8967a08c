//! # Task System Core Traits
//!
//! This module defines the fundamental building blocks of the task system.
//!
//! ## Task Lifecycle
//! 1. A `Task` is created and scheduled via `TaskManager::publish_task()`
//! 2. The task's `process()` method is called on a worker thread
//! 3. The task returns a boxed `TaskResult`
//! 4. The result's `handle_result()` is called on the streaming thread with the world
//!
//! ## Thread Safety
//! - `Task` must be `Send` to be transferred to a worker
//! - `TaskResult` must be `Send` to be transferred back
//! - Workers never write to shared state; results apply their changes on the streaming thread

use crate::engine_state::voxels::world::World;

/// A unit of work that runs on a background worker.
///
/// Tasks own (or share through `MtResource`) everything they read, so they can outlive the
/// frame that published them.
pub trait Task: Send {
    /// Processes the task on a worker thread.
    ///
    /// # Returns
    /// A boxed `TaskResult` that will be handled on the streaming thread.
    fn process(&self) -> Box<dyn TaskResult + Send>;
}

/// The outcome of a `Task`, applied on the streaming thread.
pub trait TaskResult: Send {
    /// Applies the result to the world.
    ///
    /// Runs on the streaming thread between frames; keep it cheap.
    fn handle_result(self: Box<Self>, world: &mut World);
}
