//! Shared coordination state of one acquisition run

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Semaphore;

#[derive(Debug, Default)]
struct JobQueue {
    jobs: Vec<String>,
    members: HashSet<String>,
    next: usize,
    completed: usize,
}

/// Job list, admission semaphore and failure flag shared by every worker of
/// a run.
///
/// The semaphore holds one permit per unclaimed job. A worker takes a
/// permit, forgets it and claims the next position. Appending a job adds a
/// permit under the same lock that checks membership, so a name is queued
/// at most once. The semaphore is closed once every queued job has
/// completed, or as soon as a job fails, which releases all waiting
/// workers.
#[derive(Debug)]
pub struct SyncContext {
    queue: Mutex<JobQueue>,
    admission: Semaphore,
    failed: AtomicBool,
}

impl SyncContext {
    /// Seed the job list. Repeated names keep their first position.
    #[must_use]
    pub fn new<I>(initial: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut queue = JobQueue::default();
        for name in initial {
            if queue.members.insert(name.clone()) {
                queue.jobs.push(name);
            }
        }

        let admission = Semaphore::new(queue.jobs.len());
        if queue.jobs.is_empty() {
            admission.close();
        }

        Self {
            queue: Mutex::new(queue),
            admission,
            failed: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, JobQueue> {
        // The queue stays consistent even if a holder panicked
        self.queue
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Wait for the next unclaimed job.
    ///
    /// Returns `None` once the run is finished or has failed.
    pub async fn claim(&self) -> Option<(usize, String)> {
        let permit = self.admission.acquire().await.ok()?;
        permit.forget();

        if self.is_failed() {
            return None;
        }

        let mut queue = self.lock();
        if queue.next >= queue.jobs.len() {
            return None;
        }
        let position = queue.next;
        queue.next += 1;
        Some((position, queue.jobs[position].clone()))
    }

    /// Append `name` unless it is already queued. Returns the new position.
    pub fn enqueue(&self, name: &str) -> Option<usize> {
        let mut queue = self.lock();
        if !queue.members.insert(name.to_string()) {
            return None;
        }
        let position = queue.jobs.len();
        queue.jobs.push(name.to_string());
        self.admission.add_permits(1);
        Some(position)
    }

    /// Record a finished job. Closes admission when nothing is left.
    pub fn complete(&self) {
        let mut queue = self.lock();
        queue.completed += 1;
        if queue.completed >= queue.jobs.len() {
            self.admission.close();
        }
    }

    /// Mark the run failed and release every waiting worker
    pub fn fail(&self) {
        self.failed.store(true, Ordering::SeqCst);
        self.admission.close();
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    /// Unclaimed jobs, as seen by the admission semaphore
    #[must_use]
    pub fn pending(&self) -> usize {
        self.admission.available_permits()
    }

    /// The job list in position order
    #[must_use]
    pub fn jobs(&self) -> Vec<String> {
        self.lock().jobs.clone()
    }

    #[must_use]
    pub fn completed(&self) -> usize {
        self.lock().completed
    }
}
