//! # Task Management System
//!
//! This module runs work on background threads and hands the results back to the streaming
//! thread.
//!
//! ## Architecture Overview
//!
//! - `TaskManager`: Central coordinator for task distribution and worker management
//! - `Task`: A unit of work that can be executed asynchronously
//! - `TaskResult`: The result of a completed task, applied to the world
//! - `TaskChannel`: Communication channel between the streaming thread and one worker
//!
//! ## Task Lifecycle
//! 1. Tasks are published via `TaskManager::publish_task()`
//! 2. The manager hands tasks to idle workers round-robin, queueing the rest FIFO
//! 3. Workers process tasks and send results back over their channel
//! 4. Results are applied on the streaming thread in `process_completed_tasks()`
//!
//! Publishing never blocks; only `wait_for_all()` does.

pub mod task;

use log::{error, info, trace};
use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::{self, JoinHandle};
use task::{Task, TaskResult};

use super::voxels::world::World;

/// A communication channel between the streaming thread and a worker thread.
#[derive(Debug)]
pub struct TaskChannel {
    task_sender: Sender<Box<dyn Task + Send>>,
    result_receiver: Receiver<Box<dyn TaskResult + Send>>,
    num_tasks_in_flight: usize,
    /// Set once the worker is gone, after which the channel is never used again.
    disconnected: bool,
    _worker: JoinHandle<()>,
}

/// Manages a pool of worker threads and coordinates task execution.
///
/// # Implementation Notes
/// - Workers exit when the manager is dropped and their task channel closes
/// - A panicking task takes its worker down; the channel is marked disconnected and its
///   in-flight work is reported as lost
pub struct TaskManager {
    channels: Vec<TaskChannel>,
    queued_tasks: VecDeque<Box<dyn Task + Send>>,
    current_channel: usize,
}

/// Maximum number of tasks that can be in flight per worker channel.
///
/// Kept at 1 so queued tasks start in publish order.
pub const MAX_TASKS_IN_FLIGHT: usize = 1;

impl TaskManager {
    /// Creates a new `TaskManager` with the specified number of worker threads.
    ///
    /// # Arguments
    /// * `num_workers` - Number of worker threads to create.
    pub fn new(num_workers: usize) -> Self {
        let mut channels = Vec::with_capacity(num_workers);

        info!(
            "Starting {} task workers, available parallelism: {:?}",
            num_workers,
            thread::available_parallelism()
        );

        for _ in 0..num_workers {
            let (task_tx, task_rx) = channel::<Box<dyn Task + Send>>();
            let (result_tx, result_rx) = channel::<Box<dyn TaskResult + Send>>();

            let worker = thread::spawn(move || {
                while let Ok(task) = task_rx.recv() {
                    let result = task.process();
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
            });

            channels.push(TaskChannel {
                task_sender: task_tx,
                result_receiver: result_rx,
                num_tasks_in_flight: 0,
                disconnected: false,
                _worker: worker,
            });
        }

        TaskManager {
            channels,
            queued_tasks: VecDeque::new(),
            current_channel: 0,
        }
    }

    /// Attempts to send a task to a specific worker channel.
    ///
    /// # Returns
    /// - `Ok(())` if the task was sent
    /// - `Err(task)` if the worker is gone; the channel is marked disconnected
    fn try_send_task(
        &mut self,
        task: Box<dyn Task + Send>,
        channel_idx: usize,
    ) -> Result<(), Box<dyn Task + Send>> {
        let channel = &mut self.channels[channel_idx];
        match channel.task_sender.send(task) {
            Ok(_) => {
                channel.num_tasks_in_flight += 1;
                Ok(())
            }
            Err(task) => {
                error!("Task worker {} is gone", channel_idx);
                channel.disconnected = true;
                Err(task.0)
            }
        }
    }

    /// Finds a worker that can accept a task, round-robin from the last one used.
    fn find_available_channel(&self) -> Option<usize> {
        let len = self.channels.len();
        (0..len)
            .map(|step| (self.current_channel + step) % len)
            .find(|&idx| {
                let channel = &self.channels[idx];
                !channel.disconnected && channel.num_tasks_in_flight < MAX_TASKS_IN_FLIGHT
            })
    }

    /// Publishes a new task for execution.
    ///
    /// # Returns
    /// - `true` if the task was handed to a worker
    /// - `false` if it was queued because all workers are busy
    pub fn publish_task(&mut self, task: Box<dyn Task + Send>) -> bool {
        if !self.queued_tasks.is_empty() {
            // keep FIFO order behind what is already waiting
            self.queued_tasks.push_back(task);
            self.process_queued_tasks();
            return false;
        }

        let mut task = task;
        while let Some(channel_idx) = self.find_available_channel() {
            match self.try_send_task(task, channel_idx) {
                Ok(_) => {
                    self.current_channel = (channel_idx + 1) % self.channels.len();
                    trace!("Task sent to worker {}", channel_idx);
                    return true;
                }
                Err(returned) => task = returned,
            }
        }

        self.queued_tasks.push_back(task);
        false
    }

    /// Hands queued tasks to idle workers, oldest first.
    pub fn process_queued_tasks(&mut self) {
        while let Some(channel_idx) = self.find_available_channel() {
            let Some(task) = self.queued_tasks.pop_front() else {
                return;
            };
            match self.try_send_task(task, channel_idx) {
                Ok(_) => self.current_channel = (channel_idx + 1) % self.channels.len(),
                Err(task) => self.queued_tasks.push_front(task),
            }
        }
    }

    /// Applies every result that has arrived, without blocking.
    ///
    /// # Returns
    /// The number of results applied.
    pub fn process_completed_tasks(&mut self, world: &mut World) -> usize {
        let mut handled = 0;
        for channel in &mut self.channels {
            while let Ok(result) = channel.result_receiver.try_recv() {
                channel.num_tasks_in_flight -= 1;
                result.handle_result(world);
                handled += 1;
            }
        }
        handled
    }

    /// Blocks until every published task has run and its result has been applied.
    ///
    /// # Returns
    /// The number of results applied.
    pub fn wait_for_all(&mut self, world: &mut World) -> usize {
        let mut handled = 0;
        loop {
            self.process_queued_tasks();

            let mut waited = false;
            for (idx, channel) in self.channels.iter_mut().enumerate() {
                if channel.num_tasks_in_flight == 0 {
                    continue;
                }
                waited = true;
                match channel.result_receiver.recv() {
                    Ok(result) => {
                        channel.num_tasks_in_flight -= 1;
                        result.handle_result(world);
                        handled += 1;
                    }
                    Err(_) => {
                        error!(
                            "Task worker {} stopped with {} tasks in flight",
                            idx, channel.num_tasks_in_flight
                        );
                        channel.num_tasks_in_flight = 0;
                        channel.disconnected = true;
                    }
                }
            }

            if !waited {
                if !self.queued_tasks.is_empty() {
                    error!(
                        "No task workers left, dropping {} queued tasks",
                        self.queued_tasks.len()
                    );
                    self.queued_tasks.clear();
                }
                return handled;
            }
        }
    }

    /// Tasks handed to workers whose results have not been applied yet.
    pub fn tasks_in_flight(&self) -> usize {
        self.channels
            .iter()
            .map(|channel| channel.num_tasks_in_flight)
            .sum()
    }

    /// Tasks waiting for a free worker.
    pub fn queued_len(&self) -> usize {
        self.queued_tasks.len()
    }

    /// Whether all published work has been applied.
    pub fn is_idle(&self) -> bool {
        self.queued_tasks.is_empty() && self.tasks_in_flight() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use std::sync::{Arc, Mutex};

    /// Records its id in a shared log when its result is applied.
    struct RecordTask {
        id: usize,
        log: Arc<Mutex<Vec<usize>>>,
    }

    struct RecordResult {
        id: usize,
        log: Arc<Mutex<Vec<usize>>>,
    }

    impl Task for RecordTask {
        fn process(&self) -> Box<dyn TaskResult + Send> {
            Box::new(RecordResult {
                id: self.id,
                log: self.log.clone(),
            })
        }
    }

    impl TaskResult for RecordResult {
        fn handle_result(self: Box<Self>, _world: &mut World) {
            self.log.lock().unwrap().push(self.id);
        }
    }

    fn world() -> World {
        World::new(&EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_single_worker_runs_tasks_in_order() {
        let mut world = world();
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut manager = TaskManager::new(1);

        assert!(manager.publish_task(Box::new(RecordTask { id: 0, log: log.clone() })));
        for id in 1..5 {
            assert!(!manager.publish_task(Box::new(RecordTask { id, log: log.clone() })));
        }
        assert_eq!(manager.queued_len(), 4);

        assert_eq!(manager.wait_for_all(&mut world), 5);
        assert!(manager.is_idle());
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_multiple_workers_complete_everything() {
        let mut world = world();
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut manager = TaskManager::new(3);

        for id in 0..20 {
            manager.publish_task(Box::new(RecordTask { id, log: log.clone() }));
        }
        manager.wait_for_all(&mut world);

        let mut ids = log.lock().unwrap().clone();
        ids.sort_unstable();
        assert_eq!(ids, (0..20).collect::<Vec<_>>());
        assert_eq!(manager.tasks_in_flight(), 0);
    }

    #[test]
    fn test_without_workers_tasks_stay_queued() {
        let mut world = world();
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut manager = TaskManager::new(0);

        assert!(!manager.publish_task(Box::new(RecordTask { id: 0, log: log.clone() })));
        assert_eq!(manager.process_completed_tasks(&mut world), 0);
        assert_eq!(manager.queued_len(), 1);
        assert!(log.lock().unwrap().is_empty());
    }
}
