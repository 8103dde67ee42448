//! Test: a failing step stops its own job and nothing else

use crate::helpers::*;
use cirun::core::{ExecutionStatus, JobState, NO_EXIT_STATUS};
use cirun::execution::SchedulingStrategy;

#[tokio::test]
async fn test_lint_failure_fails_only_linux() {
    let pipeline = rust_pipeline();
    let runner = ScriptedRunner::new().fail("linux", "Lint", 101);

    let result = run_pipeline(&pipeline, runner.clone(), "push").await.unwrap();

    assert_eq!(result.status(), ExecutionStatus::Failed);
    assert_job_failed_at(&result, "linux", "Lint", 101);
    assert_job_succeeded(&result, "windows", WINDOWS_STEPS);

    assert_eq!(
        runner.steps_run("linux"),
        vec!["Checkout", "Install dependencies", "Build", "Lint"]
    );
    let failed = result.job("linux").failed_step().unwrap();
    assert_eq!(failed.index, 3);
    assert_eq!(failed.exit_status, 101);
}

#[tokio::test]
async fn test_dependency_install_failure_skips_later_steps() {
    let pipeline = rust_pipeline();
    let runner = ScriptedRunner::new().fail("linux", "Install dependencies", 100);

    let result = run_pipeline(&pipeline, runner.clone(), "push").await.unwrap();

    assert_job_failed_at(&result, "linux", "Install dependencies", 100);
    assert_eq!(runner.steps_run("linux"), vec!["Checkout", "Install dependencies"]);
    for never_ran in ["Build", "Lint", "Format", "Test"] {
        assert!(runner.invocation("linux", never_ran).is_none(), "{} ran", never_ran);
    }

    assert_job_succeeded(&result, "windows", WINDOWS_STEPS);
    assert_eq!(result.status(), ExecutionStatus::Failed);
}

#[tokio::test]
async fn test_both_jobs_fail_independently() {
    let pipeline = rust_pipeline();
    let runner = ScriptedRunner::new()
        .fail("linux", "Test", 101)
        .fail("windows", "Build", 1);

    let result = run_pipeline(&pipeline, runner, "push").await.unwrap();

    assert_job_failed_at(&result, "linux", "Test", 101);
    assert_job_failed_at(&result, "windows", "Build", 1);
    assert_eq!(result.result.failed_jobs(), 2);
    assert_eq!(result.result.succeeded_jobs(), 0);
}

#[tokio::test]
async fn test_runner_error_is_a_step_failure() {
    let pipeline = rust_pipeline();
    let runner = ScriptedRunner::new().error("windows", "Checkout", "source tree missing");

    let result = run_pipeline(&pipeline, runner.clone(), "push").await.unwrap();

    assert_job_failed_at(&result, "windows", "Checkout", NO_EXIT_STATUS);
    match &result.job("windows").state {
        JobState::Failed { error, .. } => {
            assert!(error.as_deref().unwrap_or_default().contains("source tree missing"));
        }
        other => panic!("unexpected state {:?}", other),
    }
    assert_eq!(runner.steps_run("windows"), vec!["Checkout"]);
    assert_job_succeeded(&result, "linux", LINUX_STEPS);
}

#[tokio::test]
async fn test_sequential_failure_still_runs_next_job() {
    let pipeline = rust_pipeline();
    let runner = ScriptedRunner::new().fail("linux", "Build", 2);

    let result = run_with(
        &pipeline,
        runner.clone(),
        TestRun {
            strategy: SchedulingStrategy::Sequential,
            ..TestRun::default()
        },
    )
    .await
    .unwrap();

    assert_job_failed_at(&result, "linux", "Build", 2);
    assert_job_succeeded(&result, "windows", WINDOWS_STEPS);
    assert_eq!(runner.steps_run("windows"), WINDOWS_STEPS);
}
