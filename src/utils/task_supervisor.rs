use tokio::task::JoinHandle;
use std::collections::HashMap;
use std::time::Duration;
use crate::error::{Error, Result};
use tracing::{info, error};

/// Tracks long-running background tasks and reports any that stop.
///
/// The aggregation engine loop never returns on its own, so a finished
/// handle always means a panic or an abort.
///
/// ```ignore
/// let mut supervisor = TaskSupervisor::new();
/// supervisor.spawn("aggregation_engine", engine.run());
/// supervisor.watch(Duration::from_secs(5)).await; // returns on failure
/// ```
pub struct TaskSupervisor {
    tasks: HashMap<String, JoinHandle<()>>,
}

impl TaskSupervisor {
    pub fn new() -> Self {
        TaskSupervisor {
            tasks: HashMap::new(),
        }
    }

    /// Spawn a background task and register it for monitoring
    pub fn spawn<F>(&mut self, name: impl Into<String>, future: F) -> &mut Self
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let handle = tokio::spawn(future);

        info!("Spawned background task: {}", name);
        self.tasks.insert(name, handle);
        self
    }

    /// Error if any registered task has terminated. Finished tasks are
    /// removed from tracking.
    pub fn check_health(&mut self) -> Result<()> {
        let mut failed_tasks: Vec<String> = self
            .tasks
            .iter()
            .filter(|(_, handle)| handle.is_finished())
            .map(|(name, _)| name.clone())
            .collect();

        if failed_tasks.is_empty() {
            return Ok(());
        }

        failed_tasks.sort();
        for name in &failed_tasks {
            self.tasks.remove(name);
        }

        let error_msg = format!("Tasks terminated unexpectedly: {:?}", failed_tasks);
        error!("{}", error_msg);
        Err(Error::TaskError(error_msg))
    }

    /// Poll `check_health` every `period`; resolves with the first failure.
    pub async fn watch(&mut self, period: Duration) -> Error {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            if let Err(e) = self.check_health() {
                return e;
            }
        }
    }

    pub fn active_task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Abort every task still registered.
    pub fn shutdown_all(&mut self) {
        info!("Shutting down {} background tasks", self.tasks.len());

        for (name, handle) in self.tasks.drain() {
            handle.abort();
            info!("Aborted task: {}", name);
        }
    }
}

impl Default for TaskSupervisor {
    fn default() -> Self {
        Self::new()
    }
}
