//! Test: every job of the matrix succeeds

use crate::helpers::*;
use cirun::core::ExecutionStatus;
use cirun::execution::SchedulingStrategy;
use std::time::Duration;

#[tokio::test]
async fn test_full_matrix_succeeds() {
    let pipeline = rust_pipeline();
    let runner = ScriptedRunner::new();

    let result = run_pipeline(&pipeline, runner.clone(), "push").await.unwrap();

    assert_eq!(result.status(), ExecutionStatus::Completed);
    assert!(result.result.is_success());
    assert_job_succeeded(&result, "linux", LINUX_STEPS);
    assert_job_succeeded(&result, "windows", WINDOWS_STEPS);

    assert_eq!(runner.steps_run("linux"), LINUX_STEPS);
    assert_eq!(runner.steps_run("windows"), WINDOWS_STEPS);
}

#[tokio::test]
async fn test_every_supported_trigger_runs_the_matrix() {
    let pipeline = rust_pipeline();

    for trigger in ["push", "pull_request", "pull_request_review"] {
        let result = run_pipeline(&pipeline, ScriptedRunner::new(), trigger).await.unwrap();
        assert_eq!(result.status(), ExecutionStatus::Completed, "trigger {}", trigger);
        assert_eq!(result.result.trigger.as_str(), trigger);
    }
}

#[tokio::test]
async fn test_repeated_runs_give_same_outcome() {
    let pipeline = rust_pipeline();
    let runner = ScriptedRunner::new().fail("windows", "Format", 1);

    let first = run_pipeline(&pipeline, runner.clone(), "push").await.unwrap();
    let second = run_pipeline(&pipeline, runner, "push").await.unwrap();

    assert_ne!(first.result.execution_id, second.result.execution_id);
    assert_eq!(first.status(), second.status());
    for job in ["linux", "windows"] {
        assert_eq!(first.job(job).describe(), second.job(job).describe());
        assert_eq!(first.recorded_steps(job), second.recorded_steps(job));
    }
}

#[tokio::test]
async fn test_jobs_get_separate_workspaces_and_env() {
    let pipeline = rust_pipeline();
    let runner = ScriptedRunner::new();

    run_pipeline(&pipeline, runner.clone(), "pull_request").await.unwrap();

    let linux = runner.invocation("linux", "Build").unwrap();
    let windows = runner.invocation("windows", "Build").unwrap();

    assert_ne!(linux.workspace, windows.workspace);
    assert!(!linux.workspace.exists(), "workspace should be removed after the job");

    assert_eq!(linux.env.get("CARGO_TERM_COLOR").map(String::as_str), Some("always"));
    assert_eq!(windows.env.get("CARGO_TERM_COLOR").map(String::as_str), Some("always"));
    assert_eq!(linux.env.get("CI").map(String::as_str), Some("true"));
    assert_eq!(linux.env.get("CIRUN_JOB").map(String::as_str), Some("linux"));
    assert_eq!(windows.env.get("CIRUN_JOB").map(String::as_str), Some("windows"));
    assert_eq!(
        linux.env.get("CIRUN_EVENT_NAME").map(String::as_str),
        Some("pull_request")
    );
}

#[tokio::test]
async fn test_jobs_run_concurrently_when_parallel() {
    let pipeline = rust_pipeline();
    let runner = ScriptedRunner::new().delay("linux", "Checkout", Duration::from_millis(300));

    let result = run_pipeline(&pipeline, runner, "push").await.unwrap();

    assert_eq!(result.finish_order(), vec!["windows", "linux"]);
    assert_eq!(
        result.result.jobs.iter().map(|j| j.job_id.as_str()).collect::<Vec<_>>(),
        vec!["linux", "windows"],
        "results stay in declaration order"
    );
}

#[tokio::test]
async fn test_sequential_strategy_runs_jobs_in_order() {
    let pipeline = rust_pipeline();
    let runner = ScriptedRunner::new().delay("linux", "Checkout", Duration::from_millis(200));

    let result = run_with(
        &pipeline,
        runner,
        TestRun {
            strategy: SchedulingStrategy::Sequential,
            ..TestRun::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(result.finish_order(), vec!["linux", "windows"]);
    assert_eq!(result.status(), ExecutionStatus::Completed);
}
