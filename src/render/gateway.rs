/*!
 * Process gateway: the seam between the job runner and the external
 * typesetting tool.
 *
 * The runner only ever talks to a `ProcessGateway`, so tests can substitute
 * an instrumented stub while production uses `CommandGateway`.
 *
 * On unix the tool is started as the leader of its own process group. The
 * build script forks the engine, so stopping the script alone would leave
 * the engine writing into the workspace; stopping the group reaches both.
 */

use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, warn};
use parking_lot::Mutex;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;

// Bound on draining the pipes once the tool has exited
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Output collected while a tool runs.
///
/// Clones share the same buffer, so whatever the tool printed is still
/// available after a timeout dropped the invocation.
#[derive(Debug, Clone, Default)]
pub struct OutputCapture(Arc<Mutex<String>>);

impl OutputCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk of output
    pub fn append(&self, text: &str) {
        self.0.lock().push_str(text);
    }

    /// Everything captured so far
    pub fn snapshot(&self) -> String {
        self.0.lock().clone()
    }
}

/// One tool invocation
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    /// Executable to run
    pub tool: &'a Path,
    /// Single argument, the job id
    pub arg: &'a str,
    /// Working directory
    pub cwd: &'a Path,
    /// Upper bound on the run
    pub timeout: Duration,
}

/// How an invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessExit {
    /// The tool exited; the code is absent when a signal ended it
    Exited(Option<i32>),
    /// The bound elapsed and the tool was stopped
    TimedOut,
}

impl ProcessExit {
    pub fn success(self) -> bool {
        self == Self::Exited(Some(0))
    }
}

/// Launches the typesetting tool
#[async_trait]
pub trait ProcessGateway: Send + Sync {
    /// Run the tool and wait for it, appending stdout and stderr to
    /// `capture` as they arrive.
    ///
    /// When the bound elapses the tool and every process it started must be
    /// stopped before `TimedOut` is returned. Dropping the future must stop
    /// them as well.
    async fn invoke(&self, invocation: &Invocation<'_>, capture: &OutputCapture) -> io::Result<ProcessExit>;
}

/// Gateway spawning real child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandGateway;

#[async_trait]
impl ProcessGateway for CommandGateway {
    async fn invoke(&self, invocation: &Invocation<'_>, capture: &OutputCapture) -> io::Result<ProcessExit> {
        debug!(
            "Invoking {:?} {} in {:?}",
            invocation.tool, invocation.arg, invocation.cwd
        );

        let mut command = Command::new(invocation.tool);
        command
            .arg(invocation.arg)
            .current_dir(invocation.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn()?;
        let mut group = ProcessGroup::led_by(child.id());

        let mut readers: Vec<JoinHandle<io::Result<()>>> = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, capture.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, capture.clone()));
        }

        let status = tokio::select! {
            status = child.wait() => Some(status?),
            _ = tokio::time::sleep(invocation.timeout) => None,
        };

        let exit = match status {
            Some(status) => ProcessExit::Exited(status.code()),
            None => {
                warn!(
                    "{:?} exceeded {:?}, stopping its process group",
                    invocation.tool, invocation.timeout
                );
                group.kill();
                let _ = child.start_kill();
                child.wait().await?;
                ProcessExit::TimedOut
            }
        };

        // Anything the tool left behind in its group goes too
        group.kill();

        let drained = tokio::time::timeout(DRAIN_GRACE, join_all(readers.iter_mut())).await;
        match drained {
            Ok(results) => {
                for result in results {
                    result.map_err(io::Error::other)??;
                }
            }
            Err(_) => {
                warn!("Output of {:?} still open after exit", invocation.tool);
                for reader in &readers {
                    reader.abort();
                }
            }
        }

        Ok(exit)
    }
}

fn spawn_reader<R>(stream: R, capture: OutputCapture) -> JoinHandle<io::Result<()>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut line = Vec::new();
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line).await? == 0 {
                return Ok(());
            }
            capture.append(&String::from_utf8_lossy(&line));
        }
    })
}

/// Process group of a spawned tool, killed at most once
struct ProcessGroup(Option<i32>);

impl ProcessGroup {
    fn led_by(pid: Option<u32>) -> Self {
        Self(pid.and_then(|pid| i32::try_from(pid).ok()))
    }

    fn kill(&mut self) {
        if let Some(pgid) = self.0.take() {
            kill_group(pgid);
        }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn kill_group(pgid: i32) {
    // SAFETY: killpg only sends a signal; a group that is already gone yields ESRCH
    let result = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if result != 0 {
        debug!("Process group {} already gone: {}", pgid, io::Error::last_os_error());
    }
}

#[cfg(not(unix))]
fn kill_group(_pgid: i32) {}
