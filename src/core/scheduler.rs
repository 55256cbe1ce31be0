//! Periodic processing for active user sessions.
//!
//! A session runs the processor for one user immediately and then on a fixed interval
//! until it is stopped. Stopping is only observed between runs, so a run in progress
//! always completes.

use crate::core::{
    ledger::Ledger,
    processor::{Clock, ProcessOutcome, RecurringProcessor, SystemClock},
};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{
    sync::{Mutex, oneshot},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tracing::{debug, info, warn};

/// Default interval between periodic runs.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60 * 60);

const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Handle to a running periodic task. Dropping it also stops the timer.
#[derive(Debug)]
pub struct PeriodicHandle {
    user_id: String,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl PeriodicHandle {
    /// User the task processes.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Whether the task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signals the task and waits for it to exit.
    pub async fn stop(self) {
        let Self {
            user_id,
            stop,
            task,
        } = self;

        // The task may already be gone; a closed channel is fine
        let _ = stop.send(());
        if let Err(e) = task.await {
            warn!(user_id, "Periodic recurring task ended abnormally: {e}");
        }
    }
}

impl<S, C> RecurringProcessor<S, C>
where
    S: Ledger + 'static,
    C: Clock + 'static,
{
    /// Spawns a task that processes `user_id` now and then every `every`.
    ///
    /// Intervals shorter than one second are raised to one second.
    #[must_use]
    pub fn start_periodic(self: &Arc<Self>, user_id: &str, every: Duration) -> PeriodicHandle {
        let processor = Arc::clone(self);
        let user = user_id.to_string();
        let (stop, mut stopped) = oneshot::channel::<()>();
        let every = every.max(MIN_INTERVAL);

        info!(user_id, interval_secs = every.as_secs(), "Starting periodic recurring processing");

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut stopped => {
                        debug!(user_id = %user, "Periodic recurring processing stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let ProcessOutcome::Aborted(e) = processor.process(&user).await {
                            warn!(user_id = %user, "Periodic recurring run aborted: {e}");
                        }
                    }
                }
            }
        });

        PeriodicHandle {
            user_id: user_id.to_string(),
            stop,
            task,
        }
    }
}

/// Periodic tasks keyed by user, one per active session.
#[derive(Debug)]
pub struct PeriodicSessions<S, C = SystemClock> {
    processor: Arc<RecurringProcessor<S, C>>,
    interval: Duration,
    handles: Mutex<HashMap<String, PeriodicHandle>>,
}

impl<S, C> PeriodicSessions<S, C>
where
    S: Ledger + 'static,
    C: Clock + 'static,
{
    /// Creates an empty session registry.
    #[must_use]
    pub fn new(processor: Arc<RecurringProcessor<S, C>>, interval: Duration) -> Self {
        Self {
            processor,
            interval,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// The shared processor.
    #[must_use]
    pub const fn processor(&self) -> &Arc<RecurringProcessor<S, C>> {
        &self.processor
    }

    /// Starts periodic processing for `user_id`.
    ///
    /// Returns false if the user already has a running session.
    pub async fn begin(&self, user_id: &str) -> bool {
        let mut handles = self.handles.lock().await;
        if handles
            .get(user_id)
            .is_some_and(|handle| !handle.is_finished())
        {
            return false;
        }

        let handle = self.processor.start_periodic(user_id, self.interval);
        handles.insert(user_id.to_string(), handle);
        true
    }

    /// Stops the session for `user_id`. Returns false if none was running.
    pub async fn end(&self, user_id: &str) -> bool {
        let handle = self.handles.lock().await.remove(user_id);
        match handle {
            Some(handle) => {
                handle.stop().await;
                info!(user_id, "Recurring session ended");
                true
            }
            None => false,
        }
    }

    /// Whether `user_id` has a running session.
    pub async fn is_active(&self, user_id: &str) -> bool {
        self.handles
            .lock()
            .await
            .get(user_id)
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stops every session.
    pub async fn end_all(&self) {
        let drained: Vec<PeriodicHandle> = self.handles.lock().await.drain().map(|(_, h)| h).collect();
        for handle in drained {
            handle.stop().await;
        }
    }
}
