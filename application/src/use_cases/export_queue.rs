//! Export job queue.
//!
//! Accepts export requests, runs them on a fixed pool of worker tasks and
//! keeps their status pollable until retention expires.
//!
//! Each job runs at most once. The render itself happens on its own task so
//! that a panic inside a renderer is observed by the worker as a
//! [`JoinError`](tokio::task::JoinError) and recorded as a failure, instead
//! of leaving the job in `running` forever.

use crate::config::ExportParams;
use crate::ports::job_store::JobStore;
use crate::ports::report_renderer::ReportRenderer;
use chrono::Utc;
use lens_domain::{AnalysisReport, ArtifactRef, ExportRequest, Job, JobError, JobId};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Handle to the running worker pool.
pub struct ExportJobQueue {
    store: Arc<dyn JobStore>,
    renderer: Arc<dyn ReportRenderer>,
    params: ExportParams,
    sender: mpsc::UnboundedSender<JobId>,
    shutdown: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ExportJobQueue {
    /// Spawn the workers and the retention sweeper.
    pub fn start(
        store: Arc<dyn JobStore>,
        renderer: Arc<dyn ReportRenderer>,
        params: ExportParams,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let shutdown = CancellationToken::new();

        let workers = params.workers.max(1);
        let mut tasks = Vec::with_capacity(workers + 1);
        for id in 0..workers {
            let worker = ExportWorker {
                id,
                store: store.clone(),
                renderer: renderer.clone(),
                receiver: receiver.clone(),
                shutdown: shutdown.clone(),
            };
            tasks.push(tokio::spawn(worker.run()));
        }
        tasks.push(tokio::spawn(sweep_loop(
            store.clone(),
            renderer.clone(),
            params.clone(),
            shutdown.clone(),
        )));
        info!(workers, format = renderer.format(), "Export queue started");

        Self {
            store,
            renderer,
            params,
            sender,
            shutdown,
            tasks: Mutex::new(tasks),
        }
    }

    /// Validate and enqueue a request. Returns immediately with the job id.
    pub fn submit(&self, request: ExportRequest) -> Result<JobId, JobError> {
        request.validate()?;
        if self.shutdown.is_cancelled() {
            return Err(JobError::QueueClosed);
        }

        let job = Job::new(request, Utc::now());
        let id = job.id;
        self.store.insert(job);

        if self.sender.send(id).is_err() {
            let _ = self.store.update(&id, &mut |job: &mut Job| {
                job.fail("export queue is shut down", Utc::now())
            });
            return Err(JobError::QueueClosed);
        }
        debug!(job_id = %id, "Export job submitted");
        Ok(id)
    }

    /// Current snapshot of a job, or `None` if unknown or expired.
    pub fn status(&self, id: &JobId) -> Option<Job> {
        self.store.get(id)
    }

    pub fn params(&self) -> &ExportParams {
        &self.params
    }

    pub fn renderer(&self) -> &Arc<dyn ReportRenderer> {
        &self.renderer
    }

    /// Remove expired jobs and their artifacts now.
    pub async fn sweep(&self) -> usize {
        sweep_expired(self.store.as_ref(), self.renderer.as_ref(), self.params.retention).await
    }

    /// Stop accepting work, let in-flight jobs finish, and wait for the
    /// workers to exit. Jobs still queued stay `pending`.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let tasks = match self.tasks.lock() {
            Ok(mut tasks) => std::mem::take(&mut *tasks),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Export task ended abnormally");
            }
        }
        info!("Export queue stopped");
    }
}

impl Drop for ExportJobQueue {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

struct ExportWorker {
    id: usize,
    store: Arc<dyn JobStore>,
    renderer: Arc<dyn ReportRenderer>,
    receiver: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<JobId>>>,
    shutdown: CancellationToken,
}

impl ExportWorker {
    async fn run(self) {
        loop {
            let next = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => None,
                next = async { self.receiver.lock().await.recv().await } => next,
            };
            let Some(id) = next else { break };
            self.process(id).await;
        }
        debug!(worker = self.id, "Export worker exiting");
    }

    async fn process(&self, id: JobId) {
        // pending -> running; a job that is not pending is never run again
        let job = match self
            .store
            .update(&id, &mut |job: &mut Job| job.start(Utc::now()))
        {
            Ok(job) => job,
            Err(e) => {
                debug!(worker = self.id, job_id = %id, error = %e, "Skipping job");
                return;
            }
        };
        info!(worker = self.id, job_id = %id, "Rendering export");

        let renderer = self.renderer.clone();
        let render = tokio::spawn(async move {
            let report = AnalysisReport::from_value(job.request.analysis_result.clone())
                .map_err(|e| format!("invalid analysis result: {e}"))?
                .with_repo_url_fallback(&job.request.repo_url);
            let project = job.request.resolved_project_name();
            renderer
                .render(job.id, &project, &report)
                .await
                .map_err(|e| e.to_string())
        });

        let outcome: Result<ArtifactRef, String> = match render.await {
            Ok(result) => result,
            Err(e) => Err(format!("worker terminated abnormally: {e}")),
        };

        let committed = match outcome {
            Ok(artifact) => self.store.update(&id, &mut |job: &mut Job| {
                job.succeed(artifact.clone(), Utc::now())
            }),
            Err(reason) => {
                warn!(worker = self.id, job_id = %id, reason = %reason, "Export failed");
                self.store
                    .update(&id, &mut |job: &mut Job| job.fail(reason.clone(), Utc::now()))
            }
        };
        match committed {
            Ok(job) => info!(worker = self.id, job_id = %id, status = %job.status, "Export finished"),
            Err(e) => error!(worker = self.id, job_id = %id, error = %e, "Failed to record export outcome"),
        }
    }
}

async fn sweep_loop(
    store: Arc<dyn JobStore>,
    renderer: Arc<dyn ReportRenderer>,
    params: ExportParams,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(params.sweep_interval.max(Duration::from_secs(1)));
    // The first tick completes immediately.
    ticker.tick().await;
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }
        sweep_expired(store.as_ref(), renderer.as_ref(), params.retention).await;
    }
}

async fn sweep_expired(
    store: &dyn JobStore,
    renderer: &dyn ReportRenderer,
    retention: Duration,
) -> usize {
    let retention =
        chrono::Duration::from_std(retention).unwrap_or_else(|_| chrono::Duration::days(3650));
    let expired = store.remove_expired(Utc::now() - retention);
    for job in &expired {
        if let Some(artifact) = &job.artifact {
            if let Err(e) = renderer.remove(artifact).await {
                warn!(job_id = %job.id, error = %e, "Failed to remove expired artifact");
            }
        }
    }
    if !expired.is_empty() {
        info!(count = expired.len(), "Swept expired export jobs");
    }
    expired.len()
}
