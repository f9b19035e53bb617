//! Recurring background jobs
//!
//! Resource caches register their periodic refresh here. Jobs are keyed by
//! name so a cache can find and cancel its own job later.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use log::{debug, warn};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// A job body, invoked once per tick
pub type Job = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Registry of named recurring jobs
pub trait JobScheduler: Send + Sync {
    /// Register a job. Returns false if `name` is already scheduled or the
    /// interval is zero.
    fn schedule(&self, name: &str, interval: Duration, job: Job) -> bool;

    /// Cancel a job. Returns whether it was scheduled.
    fn unschedule(&self, name: &str) -> bool;

    fn is_scheduled(&self, name: &str) -> bool;
}

/// Runs each job on its own tokio interval task.
///
/// The first run happens one interval after scheduling. Must be used from
/// within a tokio runtime. Dropping the scheduler aborts every job.
#[derive(Default)]
pub struct TokioScheduler {
    jobs: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of scheduled jobs, sorted
    pub fn job_names(&self) -> Vec<String> {
        let jobs = self.jobs.lock().unwrap_or_else(|p| p.into_inner());
        let mut names: Vec<String> = jobs.keys().cloned().collect();
        names.sort();
        names
    }
}

impl JobScheduler for TokioScheduler {
    fn schedule(&self, name: &str, interval: Duration, job: Job) -> bool {
        if interval.is_zero() {
            warn!("Refusing to schedule {} with a zero interval", name);
            return false;
        }

        let mut jobs = self.jobs.lock().unwrap_or_else(|p| p.into_inner());
        if jobs.get(name).is_some_and(|h| !h.is_finished()) {
            debug!("Job {} already scheduled", name);
            return false;
        }

        let job_name = name.to_string();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                debug!("Running scheduled job {}", job_name);
                job().await;
            }
        });

        jobs.insert(name.to_string(), handle);
        debug!("Scheduled {} every {:?}", name, interval);
        true
    }

    fn unschedule(&self, name: &str) -> bool {
        let mut jobs = self.jobs.lock().unwrap_or_else(|p| p.into_inner());
        match jobs.remove(name) {
            Some(handle) => {
                handle.abort();
                debug!("Unscheduled {}", name);
                true
            }
            None => false,
        }
    }

    fn is_scheduled(&self, name: &str) -> bool {
        let jobs = self.jobs.lock().unwrap_or_else(|p| p.into_inner());
        jobs.get(name).is_some_and(|h| !h.is_finished())
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        let jobs = self.jobs.get_mut().unwrap_or_else(|p| p.into_inner());
        for (_, handle) in jobs.drain() {
            handle.abort();
        }
    }
}
