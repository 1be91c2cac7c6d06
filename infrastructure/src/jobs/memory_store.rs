//! In-process job store backed by a concurrent map.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use lens_application::JobStore;
use lens_domain::{Job, JobError, JobId};

/// Job statuses kept in memory for the lifetime of the process.
///
/// Each update holds the shard lock for its job id, so concurrent
/// transitions of the same job are serialized.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: DashMap<JobId, Job>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for InMemoryJobStore {
    fn insert(&self, job: Job) {
        self.jobs.insert(job.id, job);
    }

    fn get(&self, id: &JobId) -> Option<Job> {
        self.jobs.get(id).map(|entry| entry.value().clone())
    }

    fn update(
        &self,
        id: &JobId,
        f: &mut dyn FnMut(&mut Job) -> Result<(), JobError>,
    ) -> Result<Job, JobError> {
        let mut entry = self.jobs.get_mut(id).ok_or(JobError::NotFound(*id))?;
        // Apply to a copy so a rejected transition leaves the stored job untouched
        let mut next = entry.value().clone();
        f(&mut next)?;
        *entry.value_mut() = next.clone();
        Ok(next)
    }

    fn remove_expired(&self, cutoff: DateTime<Utc>) -> Vec<Job> {
        let expired: Vec<JobId> = self
            .jobs
            .iter()
            .filter(|entry| entry.value().is_expired(cutoff))
            .map(|entry| *entry.key())
            .collect();

        expired
            .into_iter()
            .filter_map(|id| {
                self.jobs
                    .remove_if(&id, |_, job| job.is_expired(cutoff))
                    .map(|(_, job)| job)
            })
            .collect()
    }

    fn len(&self) -> usize {
        self.jobs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use lens_domain::{ExportRequest, JobStatus};
    use serde_json::json;
    use std::sync::Arc;

    fn job() -> Job {
        Job::new(
            ExportRequest::new(json!({}), "https://github.com/acme/widgets"),
            Utc::now(),
        )
    }

    #[test]
    fn insert_get_update() {
        let store = InMemoryJobStore::new();
        let job = job();
        let id = job.id;
        store.insert(job);
        assert_eq!(store.len(), 1);

        let updated = store.update(&id, &mut |j: &mut Job| j.start(Utc::now())).unwrap();
        assert_eq!(updated.status, JobStatus::Running);
        assert_eq!(store.get(&id).unwrap().status, JobStatus::Running);
    }

    #[test]
    fn rejected_update_is_not_committed() {
        let store = InMemoryJobStore::new();
        let job = job();
        let id = job.id;
        store.insert(job);

        let err = store
            .update(&id, &mut |j: &mut Job| {
                j.failure = Some("scribbled".into());
                j.succeed(
                    lens_domain::ArtifactRef {
                        file_name: "x.md".into(),
                        path: "/tmp/x.md".into(),
                        download_url: "/api/report/download/x.md".into(),
                    },
                    Utc::now(),
                )
            })
            .unwrap_err();
        assert!(matches!(err, JobError::IllegalTransition { .. }));

        let stored = store.get(&id).unwrap();
        assert_eq!(stored.status, JobStatus::Pending);
        assert!(stored.failure.is_none());
    }

    #[test]
    fn unknown_job() {
        let store = InMemoryJobStore::new();
        let id = JobId::new();
        assert!(store.get(&id).is_none());
        assert_eq!(
            store.update(&id, &mut |_: &mut Job| Ok(())).unwrap_err(),
            JobError::NotFound(id)
        );
    }

    #[test]
    fn removes_only_expired_terminal_jobs() {
        let store = InMemoryJobStore::new();
        let long_ago = Utc::now() - Duration::days(10);

        let mut old = job();
        old.start(long_ago).unwrap();
        old.fail("boom", long_ago).unwrap();
        let old_id = old.id;
        store.insert(old);

        let mut running = job();
        running.start(long_ago).unwrap();
        store.insert(running);

        let removed = store.remove_expired(Utc::now() - Duration::days(7));
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].id, old_id);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn concurrent_updates_are_serialized() {
        let store = Arc::new(InMemoryJobStore::new());
        let job = job();
        let id = job.id;
        store.insert(job);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.update(&id, &mut |j: &mut Job| j.start(Utc::now())).is_ok())
            })
            .collect();
        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(wins, 1);
    }
}
