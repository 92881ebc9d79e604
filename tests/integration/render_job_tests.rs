/*!
 * Integration tests for rendering jobs and the job runner
 */

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use ldom_render::errors::RenderError;
use ldom_render::render::{JobId, JobRunner, JobState, RunnerConfig};
use crate::common;
use crate::common::mock_gateway::{InstrumentedGateway, MissingToolGateway};

fn runner_with(root: &std::path::Path, gateway: Arc<InstrumentedGateway>) -> JobRunner {
    JobRunner::with_gateway(RunnerConfig::new(root), gateway)
}

/// Zero-exit tool: the job completes with `<id>.pdf`
#[cfg(unix)]
#[tokio::test]
async fn test_render_withZeroExitStub_shouldComplete() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let tool = common::create_stub_tool(temp_dir.path(), "tools/ok.sh", "touch \"$1.pdf\"")?;
    let workspace = temp_dir.path().join("workspace");
    let runner = JobRunner::new(RunnerConfig::new(&workspace).with_tool_path(tool));

    let artifact = runner.render("\\title{X}", JobId::new("job1")).await?;

    assert_eq!(artifact.path, workspace.join("job1.pdf"));
    assert!(artifact.exists());
    assert_eq!(runner.state(&JobId::new("job1")), Some(JobState::Completed));
    assert_eq!(std::fs::read_to_string(workspace.join("job1.tex"))?, "\\title{X}");
    Ok(())
}

/// Non-zero tool: the job fails and carries the tool output
#[cfg(unix)]
#[tokio::test]
async fn test_render_withFailingStub_shouldFailWithOutput() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let tool = common::create_stub_tool(
        temp_dir.path(),
        "tools/fail.sh",
        "echo '! Undefined control sequence.'\nexit 1",
    )?;
    let runner = JobRunner::new(RunnerConfig::new(temp_dir.path().join("workspace")).with_tool_path(tool));

    let err = runner.render("\\bogus", JobId::new("job2")).await.unwrap_err();
    match &err {
        RenderError::NonZeroExit { exit_code, output, .. } => {
            assert_eq!(*exit_code, Some(1));
            assert!(output.contains("! Undefined control sequence"));
        }
        other => panic!("unexpected error: {other}"),
    }

    let job = runner.job(&JobId::new("job2")).unwrap();
    assert_eq!(job.state(), JobState::Failed);
    assert!(job.artifact().is_none());
    assert!(job.failure().unwrap().output.as_deref().unwrap().contains("! Undefined control sequence"));
    Ok(())
}

/// Slow tool: the timeout fails the job and keeps what it printed
#[cfg(unix)]
#[tokio::test]
async fn test_run_withHangingStub_shouldTimeOutWithOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let tool = common::create_stub_tool(
        temp_dir.path(),
        "tools/hang.sh",
        "echo 'This is XeTeX, Version 3.141592653'\nsleep 30",
    )?;
    let runner = JobRunner::new(
        RunnerConfig::new(temp_dir.path().join("workspace"))
            .with_tool_path(tool)
            .with_timeout(Duration::from_millis(300)),
    );

    let started = std::time::Instant::now();
    let err = runner.render("x", JobId::new("slow")).await.unwrap_err();
    assert!(matches!(err, RenderError::Timeout { .. }));
    assert!(err.to_string().contains("300ms"));
    assert!(started.elapsed() < Duration::from_secs(10));

    let job = runner.job(&JobId::new("slow")).unwrap();
    assert_eq!(job.state(), JobState::Failed);
    assert!(job.failure().unwrap().output.as_deref().unwrap().contains("This is XeTeX"));
    Ok(())
}

/// A tool that forks its engine leaves nothing running after a timeout
#[cfg(unix)]
#[tokio::test]
async fn test_run_withForkingStub_shouldStopEngineOnTimeout() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let tool = common::create_stub_tool(
        temp_dir.path(),
        "tools/fork.sh",
        "sh -c 'sleep 1; touch \"$0.late\"' \"$1\"",
    )?;
    let workspace = temp_dir.path().join("workspace");
    let runner = JobRunner::new(
        RunnerConfig::new(&workspace)
            .with_tool_path(tool)
            .with_timeout(Duration::from_millis(200)),
    );

    let err = runner.render("x", JobId::new("forked")).await.unwrap_err();
    assert!(matches!(err, RenderError::Timeout { .. }));
    assert_eq!(runner.state(&JobId::new("forked")), Some(JobState::Failed));

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!workspace.join("forked.late").exists());
    Ok(())
}

/// Default tool path is the workspace build script
#[tokio::test]
async fn test_submit_withDefaultTool_shouldWriteBuildScript() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let runner = JobRunner::new(RunnerConfig::new(temp_dir.path()));
    runner.submit("\\title{X}", JobId::new("job1"))?;

    assert_eq!(runner.tool_path(), &temp_dir.path().join("build.sh"));
    let script = std::fs::read_to_string(temp_dir.path().join("build.sh"))?;
    assert_eq!(script.matches("xelatex").count(), 2);
    assert_eq!(runner.state(&JobId::new("job1")), Some(JobState::SourceWritten));
    Ok(())
}

/// Concurrent jobs never typeset at the same time
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_spawn_withManyJobs_shouldSerializeTypesetting() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let gateway = Arc::new(InstrumentedGateway::succeeding(Duration::from_millis(40)));
    let runner = runner_with(temp_dir.path(), gateway.clone());

    let handles: Vec<_> = (0..6)
        .map(|i| runner.spawn(format!("\\title{{{}}}", i), JobId::new(format!("job{}", i))))
        .collect();
    for handle in futures::future::join_all(handles).await {
        handle??;
    }

    assert_eq!(gateway.max_concurrent(), 1);
    assert_eq!(gateway.calls().len(), 6);
    for i in 0..6 {
        assert_eq!(runner.state(&JobId::new(format!("job{}", i))), Some(JobState::Completed));
    }
    Ok(())
}

/// Identical sources in one batch render once instead of colliding
#[tokio::test]
async fn test_spawnBatch_withIdenticalInputs_shouldNotCollide() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let gateway = Arc::new(InstrumentedGateway::succeeding(Duration::from_millis(10)));
    let runner = runner_with(temp_dir.path(), gateway.clone());
    let source = "\\title{Vespers}".to_string();

    let mut jobs = runner.spawn_batch(vec![
        ("a.tex".to_string(), source.clone()),
        ("b.tex".to_string(), source.clone()),
    ]);
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].id, JobId::for_source(&source));
    assert_eq!(jobs[0].inputs, vec!["a.tex".to_string(), "b.tex".to_string()]);

    let artifact = jobs[0].wait().await?;
    assert_eq!(artifact.path, temp_dir.path().join(format!("{}.pdf", jobs[0].id)));
    assert_eq!(gateway.calls().len(), 1);
    Ok(())
}

/// Each job's history is strictly ordered
#[tokio::test]
async fn test_history_shouldBeMonotonic() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let runner = runner_with(temp_dir.path(), Arc::new(InstrumentedGateway::new(Duration::ZERO, 2, "boom")));

    let id = JobId::new("mono");
    let _ = runner.render("x", id.clone()).await;

    let history = runner.history(&id).unwrap();
    let states: Vec<JobState> = history.iter().map(|t| t.state).collect();
    assert_eq!(
        states,
        vec![JobState::Queued, JobState::SourceWritten, JobState::Typesetting, JobState::Failed]
    );
    assert!(states.windows(2).all(|w| w[0] < w[1]));
    assert!(history.windows(2).all(|w| w[0].at <= w[1].at));
    Ok(())
}

/// A launch failure is reported as ProcessLaunch
#[tokio::test]
async fn test_run_withUnlaunchableTool_shouldReturnProcessLaunch() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let runner = JobRunner::with_gateway(RunnerConfig::new(temp_dir.path()), Arc::new(MissingToolGateway));

    let err = runner.render("x", JobId::new("nolaunch")).await.unwrap_err();
    assert!(matches!(err, RenderError::ProcessLaunch { .. }));
    assert_eq!(runner.state(&JobId::new("nolaunch")), Some(JobState::Failed));
    Ok(())
}

/// A source write failure moves the job straight from Queued to Failed
#[tokio::test]
async fn test_submit_withUnwritableWorkspace_shouldFailFromQueued() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let blocker = common::create_test_file(temp_dir.path(), "not-a-dir", "")?;
    let gateway = Arc::new(InstrumentedGateway::succeeding(Duration::ZERO));
    let runner = runner_with(&blocker, gateway.clone());

    let id = JobId::new("job1");
    let err = runner.submit("x", id.clone()).unwrap_err();
    assert!(matches!(err, RenderError::WorkspaceIo { .. }));

    let states: Vec<JobState> = runner.history(&id).unwrap().iter().map(|t| t.state).collect();
    assert_eq!(states, vec![JobState::Queued, JobState::Failed]);
    assert!(matches!(runner.run(&id).await, Err(RenderError::InvalidState { .. })));
    assert!(gateway.calls().is_empty());
    Ok(())
}

/// Reaping removes the job; the id can then be reused
#[test]
fn test_reap_thenResubmit_shouldSucceed() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let runner = runner_with(temp_dir.path(), Arc::new(InstrumentedGateway::succeeding(Duration::ZERO)));
    let id = JobId::new("again");

    tokio_test::block_on(runner.render("one", id.clone()))?;
    let record = runner.reap(&id)?;
    assert_eq!(record.source(), "one");
    assert!(runner.job_ids().is_empty());

    tokio_test::block_on(runner.render("two", id.clone()))?;
    assert_eq!(runner.state(&id), Some(JobState::Completed));
    Ok(())
}
