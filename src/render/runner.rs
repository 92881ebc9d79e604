/*!
 * Job runner.
 *
 * The runner owns the job table and drives each job through its state
 * machine. Source writes happen concurrently; the external tool runs under
 * one process-wide lock, so at most one job is ever in `Typesetting`.
 * Every failure is logged with the job id, the stage and any tool output,
 * and is also returned to the caller as a typed `RenderError`.
 */

use log::{debug, error, info, warn};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::gateway::{CommandGateway, Invocation, OutputCapture, ProcessExit, ProcessGateway};
use super::job::{Artifact, JobId, JobState, RenderJob, Transition};
use super::workspace::Workspace;
use crate::app_config::RenderConfig;
use crate::errors::RenderError;

// Serializes tool invocations across every runner in the process
static TYPESETTING_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

// Extra time a gateway gets to stop the tool before the runner abandons it
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Runner settings
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Directory holding sources, the build script and artifacts
    pub workspace_root: PathBuf,

    /// Engine named in the build script
    pub engine: String,

    /// Tool to invoke; defaults to the workspace build script
    pub tool_path: Option<PathBuf>,

    /// Upper bound on one tool invocation
    pub timeout: Duration,

    /// Extension of written source files
    pub source_extension: String,
}

impl RunnerConfig {
    /// Defaults for a workspace root
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            engine: "xelatex".to_string(),
            tool_path: None,
            timeout: Duration::from_secs(300),
            source_extension: "tex".to_string(),
        }
    }

    pub fn with_tool_path(mut self, tool_path: impl Into<PathBuf>) -> Self {
        self.tool_path = Some(tool_path.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl From<&RenderConfig> for RunnerConfig {
    fn from(config: &RenderConfig) -> Self {
        Self {
            workspace_root: config.workspace_root.clone(),
            engine: config.engine.clone(),
            tool_path: config.tool_path.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            source_extension: config.source_extension.clone(),
        }
    }
}

/// Drives rendering jobs through the external tool
#[derive(Clone)]
pub struct JobRunner {
    workspace: Workspace,

    tool_path: PathBuf,

    timeout: Duration,

    gateway: Arc<dyn ProcessGateway>,

    /// Job table; never held across an await point
    jobs: Arc<RwLock<HashMap<JobId, RenderJob>>>,
}

impl JobRunner {
    /// Runner spawning real processes
    pub fn new(config: RunnerConfig) -> Self {
        Self::with_gateway(config, Arc::new(CommandGateway))
    }

    /// Runner using a custom process gateway
    pub fn with_gateway(config: RunnerConfig, gateway: Arc<dyn ProcessGateway>) -> Self {
        let workspace = Workspace::new(config.workspace_root, config.engine)
            .with_source_extension(config.source_extension);
        let tool_path = config
            .tool_path
            .unwrap_or_else(|| workspace.build_script_path());

        Self {
            workspace,
            tool_path,
            timeout: config.timeout,
            gateway,
            jobs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn tool_path(&self) -> &PathBuf {
        &self.tool_path
    }

    /// Register a job and write its source into the workspace.
    ///
    /// On success the job is `SourceWritten`. A write failure leaves the job
    /// `Failed` and returns `WorkspaceIo`.
    pub fn submit(&self, source: impl Into<String>, job_id: JobId) -> Result<JobId, RenderError> {
        if !job_id.is_valid() {
            return Err(RenderError::InvalidJobId(job_id.to_string()));
        }

        let source = source.into();
        {
            let mut jobs = self.jobs.write();
            if let Some(existing) = jobs.get(&job_id) {
                if !existing.state().is_terminal() {
                    return Err(RenderError::DuplicateJob(job_id.to_string()));
                }
                debug!("Replacing unreaped terminal job {}", job_id);
            }
            let job = RenderJob::new(job_id.clone(), source.clone(), self.workspace.source_path(&job_id));
            jobs.insert(job_id.clone(), job);
        }

        let written = self
            .workspace
            .write_source(&job_id, &source)
            .and_then(|_| self.workspace.ensure_build_script(&job_id));

        match written {
            Ok(_) => {
                self.transition(&job_id, JobState::SourceWritten)?;
                debug!("Job {} source written", job_id);
                Ok(job_id)
            }
            Err(e) => Err(self.fail(&job_id, e)),
        }
    }

    /// Typeset a job whose source has been written.
    ///
    /// Waits for the process-wide lock, then runs the tool with the
    /// configured timeout.
    pub async fn run(&self, job_id: &JobId) -> Result<Artifact, RenderError> {
        self.expect_state(job_id, JobState::SourceWritten)?;

        let _guard = TYPESETTING_LOCK.lock().await;
        self.transition(job_id, JobState::Typesetting)?;
        info!("Typesetting job {}", job_id);

        let capture = OutputCapture::new();
        let invocation = Invocation {
            tool: &self.tool_path,
            arg: job_id.as_str(),
            cwd: self.workspace.root(),
            timeout: self.timeout,
        };

        // The gateway enforces the bound; the backstop covers one that does not
        let result = tokio::select! {
            result = self.gateway.invoke(&invocation, &capture) => result,
            _ = tokio::time::sleep(self.timeout + STOP_GRACE) => Ok(ProcessExit::TimedOut),
        };
        let output = capture.snapshot();

        let exit_code = match result {
            Ok(ProcessExit::Exited(exit_code)) => exit_code,
            Ok(ProcessExit::TimedOut) => {
                let error = RenderError::Timeout {
                    job_id: job_id.to_string(),
                    timeout: self.timeout,
                    output,
                };
                return Err(self.fail(job_id, error));
            }
            Err(e) => {
                let error = RenderError::ProcessLaunch {
                    job_id: job_id.to_string(),
                    tool: self.tool_path.clone(),
                    message: e.to_string(),
                    output,
                };
                return Err(self.fail(job_id, error));
            }
        };

        if exit_code != Some(0) {
            let error = RenderError::NonZeroExit {
                job_id: job_id.to_string(),
                exit_code,
                output,
            };
            return Err(self.fail(job_id, error));
        }

        let artifact = self.workspace.artifact(job_id);
        if !artifact.exists() {
            warn!("Job {} exited cleanly but {:?} is not present yet", job_id, artifact.path);
        }

        {
            let mut jobs = self.jobs.write();
            let job = jobs
                .get_mut(job_id)
                .ok_or_else(|| RenderError::UnknownJob(job_id.to_string()))?;
            job.complete(artifact.clone())?;
        }

        info!("Job {} completed: {:?}", job_id, artifact.path);
        Ok(artifact)
    }

    /// Submit and run a job inline
    pub async fn render(&self, source: impl Into<String>, job_id: JobId) -> Result<Artifact, RenderError> {
        let job_id = self.submit(source, job_id)?;
        self.run(&job_id).await
    }

    /// Submit and run a job on its own task
    pub fn spawn(&self, source: impl Into<String>, job_id: JobId) -> JoinHandle<Result<Artifact, RenderError>> {
        let runner = self.clone();
        let source = source.into();
        tokio::spawn(async move { runner.render(source, job_id).await })
    }

    /// Spawn one job per distinct source in a batch.
    ///
    /// Job ids come from the source content, so inputs with identical
    /// sources share a single job instead of colliding on the same id. Jobs
    /// are returned in the order their source was first seen.
    pub fn spawn_batch<K>(&self, inputs: impl IntoIterator<Item = (K, String)>) -> Vec<SpawnedJob<K>> {
        let mut jobs: Vec<(JobId, String, Vec<K>)> = Vec::new();
        let mut positions: HashMap<JobId, usize> = HashMap::new();

        for (key, source) in inputs {
            let id = JobId::for_source(&source);
            match positions.get(&id) {
                Some(&position) => {
                    debug!("Input shares job {} with an identical source", id);
                    jobs[position].2.push(key);
                }
                None => {
                    positions.insert(id.clone(), jobs.len());
                    jobs.push((id, source, vec![key]));
                }
            }
        }

        jobs.into_iter()
            .map(|(id, source, inputs)| SpawnedJob {
                handle: self.spawn(source, id.clone()),
                id,
                inputs,
            })
            .collect()
    }

    /// Current state of a job
    pub fn state(&self, job_id: &JobId) -> Option<JobState> {
        self.jobs.read().get(job_id).map(RenderJob::state)
    }

    /// Snapshot of a job record
    pub fn job(&self, job_id: &JobId) -> Option<RenderJob> {
        self.jobs.read().get(job_id).cloned()
    }

    /// Ordered state transitions of a job
    pub fn history(&self, job_id: &JobId) -> Option<Vec<Transition>> {
        self.jobs.read().get(job_id).map(|job| job.history().to_vec())
    }

    /// Identifiers of every tracked job, sorted
    pub fn job_ids(&self) -> Vec<JobId> {
        let mut ids: Vec<JobId> = self.jobs.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Remove a terminal job and return its final record
    pub fn reap(&self, job_id: &JobId) -> Result<RenderJob, RenderError> {
        let mut jobs = self.jobs.write();
        let state = jobs
            .get(job_id)
            .map(RenderJob::state)
            .ok_or_else(|| RenderError::UnknownJob(job_id.to_string()))?;

        if !state.is_terminal() {
            return Err(RenderError::InvalidState {
                job_id: job_id.to_string(),
                state: state.to_string(),
                expected: "completed or failed".to_string(),
            });
        }

        jobs.remove(job_id)
            .ok_or_else(|| RenderError::UnknownJob(job_id.to_string()))
    }

    fn expect_state(&self, job_id: &JobId, expected: JobState) -> Result<(), RenderError> {
        let state = self
            .state(job_id)
            .ok_or_else(|| RenderError::UnknownJob(job_id.to_string()))?;
        if state != expected {
            return Err(RenderError::InvalidState {
                job_id: job_id.to_string(),
                state: state.to_string(),
                expected: expected.to_string(),
            });
        }
        Ok(())
    }

    fn transition(&self, job_id: &JobId, next: JobState) -> Result<(), RenderError> {
        let mut jobs = self.jobs.write();
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| RenderError::UnknownJob(job_id.to_string()))?;
        job.transition(next)
    }

    // Records the failure on the job, logs it and hands the error back
    fn fail(&self, job_id: &JobId, error: RenderError) -> RenderError {
        if let Some(job) = self.jobs.write().get_mut(job_id) {
            if let Err(e) = job.fail(&error) {
                warn!("Could not mark job {} failed: {}", job_id, e);
            }
        }

        error!("Job {} failed at stage {}: {}", job_id, error.stage(), error);
        if let Some(output) = error.output() {
            error!("Job {} tool output:\n{}", job_id, output);
        }
        error
    }
}

/// A batch job running on its own task
#[derive(Debug)]
pub struct SpawnedJob<K> {
    /// Job rendering these inputs
    pub id: JobId,
    /// Every batch input whose source this job renders
    pub inputs: Vec<K>,
    handle: JoinHandle<Result<Artifact, RenderError>>,
}

impl<K> SpawnedJob<K> {
    /// Wait for the job; a panicked or aborted task becomes `Worker`
    pub async fn wait(&mut self) -> Result<Artifact, RenderError> {
        match (&mut self.handle).await {
            Ok(result) => result,
            Err(e) => {
                error!("Worker for job {} failed: {}", self.id, e);
                Err(RenderError::Worker(e.to_string()))
            }
        }
    }
}

impl std::fmt::Debug for JobRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRunner")
            .field("workspace", &self.workspace)
            .field("tool_path", &self.tool_path)
            .field("timeout", &self.timeout)
            .field("jobs", &self.jobs.read().len())
            .finish()
    }
}
