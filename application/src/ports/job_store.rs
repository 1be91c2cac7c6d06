//! Job Store port
//!
//! Status storage for export jobs. Updates are serialized per job id: an
//! [`update`](JobStore::update) closure sees the current state and its
//! result is committed only if it returns `Ok`.

use chrono::{DateTime, Utc};
use lens_domain::{Job, JobError, JobId};

pub trait JobStore: Send + Sync {
    fn insert(&self, job: Job);

    /// Snapshot of a job. Never blocks on workers.
    fn get(&self, id: &JobId) -> Option<Job>;

    /// Atomically apply `f` to the job and return the committed state.
    fn update(
        &self,
        id: &JobId,
        f: &mut dyn FnMut(&mut Job) -> Result<(), JobError>,
    ) -> Result<Job, JobError>;

    /// Remove terminal jobs completed before `cutoff`; returns them.
    fn remove_expired(&self, cutoff: DateTime<Utc>) -> Vec<Job>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
