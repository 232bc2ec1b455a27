//! Run progress accounting.
//!
//! Each phase owns a [`JobDescriptor`]; overall progress is the mean of all
//! jobs' done/total fractions. The usage-search job's total is not known
//! upfront and grows round by round; growth rescales the done amount
//! proportionally so the reported fraction never moves backwards.

use std::sync::{Arc, Mutex};

/// Observer invoked with the updated job's name and the overall fraction.
pub type ProgressCallback = Arc<dyn Fn(&str, f64) + Send + Sync>;

/// One phase's progress-weight unit.
#[derive(Debug, Clone)]
pub struct JobDescriptor {
    name: String,
    total: f64,
    done: f64,
}

impl JobDescriptor {
    pub fn new(name: impl Into<String>, total: f64) -> Self {
        Self {
            name: name.into(),
            total,
            done: 0.0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Completed fraction. A job with no work counts as complete.
    pub fn fraction(&self) -> f64 {
        if self.total <= 0.0 {
            1.0
        } else {
            (self.done / self.total).min(1.0)
        }
    }

    pub fn advance(&mut self, amount: f64) {
        self.done += amount;
    }

    /// Grow the total, keeping the completed fraction unchanged.
    pub fn grow_total(&mut self, delta: f64) {
        if delta <= 0.0 {
            return;
        }
        let old = self.total;
        self.total += delta;
        if old > 0.0 {
            self.done *= self.total / old;
        }
    }

    pub fn finish(&mut self) {
        if self.total <= 0.0 {
            self.total = 1.0;
        }
        self.done = self.total;
    }
}

/// Handle to one registered job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobId(usize);

/// Collects the run's jobs and publishes overall progress.
#[derive(Default)]
pub struct ProgressTracker {
    jobs: Mutex<Vec<JobDescriptor>>,
    callback: Option<ProgressCallback>,
}

impl ProgressTracker {
    pub fn new(callback: Option<ProgressCallback>) -> Self {
        Self {
            jobs: Mutex::new(Vec::new()),
            callback,
        }
    }

    pub fn add_job(&self, name: impl Into<String>, total: f64) -> JobId {
        let mut jobs = self.jobs.lock().expect("progress lock");
        jobs.push(JobDescriptor::new(name, total));
        JobId(jobs.len() - 1)
    }

    pub fn advance(&self, id: JobId, amount: f64) {
        self.update(id, |job| job.advance(amount));
    }

    pub fn grow_total(&self, id: JobId, delta: f64) {
        self.update(id, |job| job.grow_total(delta));
    }

    pub fn finish(&self, id: JobId) {
        self.update(id, |job| job.finish());
    }

    fn update(&self, id: JobId, f: impl FnOnce(&mut JobDescriptor)) {
        let (name, overall) = {
            let mut jobs = self.jobs.lock().expect("progress lock");
            let Some(job) = jobs.get_mut(id.0) else {
                return;
            };
            f(job);
            let name = job.name().to_string();
            (name, Self::mean_fraction(&jobs))
        };
        if let Some(callback) = &self.callback {
            callback(&name, overall);
        }
    }

    /// Mean of all jobs' fractions; 0.0 before any job is registered.
    pub fn overall(&self) -> f64 {
        let jobs = self.jobs.lock().expect("progress lock");
        Self::mean_fraction(&jobs)
    }

    fn mean_fraction(jobs: &[JobDescriptor]) -> f64 {
        if jobs.is_empty() {
            return 0.0;
        }
        jobs.iter().map(JobDescriptor::fraction).sum::<f64>() / jobs.len() as f64
    }
}
