/*!
 * Rendering subsystem.
 *
 * - `job`: job identifiers, states and records
 * - `workspace`: on-disk layout of sources, the build script and artifacts
 * - `gateway`: the process seam used to launch the typesetting tool
 * - `runner`: the job table and the serialized execution of jobs
 */

pub mod gateway;
pub mod job;
pub mod runner;
pub mod workspace;

pub use gateway::{CommandGateway, Invocation, OutputCapture, ProcessExit, ProcessGateway};
pub use job::{Artifact, FailureDetail, JobId, JobOutcome, JobState, RenderJob, Transition};
pub use runner::{JobRunner, RunnerConfig, SpawnedJob};
pub use workspace::{BUILD_SCRIPT_NAME, Workspace};
