//! Test: invocations rejected before any job is scheduled

use crate::helpers::*;
use cirun::core::{Job, JobFilter, Pipeline, PipelineError, Step, TriggerKind};

#[tokio::test]
async fn test_unsupported_trigger_schedules_nothing() {
    let pipeline = rust_pipeline();
    let runner = ScriptedRunner::new();

    let err = run_pipeline(&pipeline, runner.clone(), "schedule").await.unwrap_err();

    assert_eq!(err, PipelineError::UnsupportedTrigger("schedule".to_string()));
    assert!(runner.invocations().is_empty());
}

#[tokio::test]
async fn test_trigger_not_in_workflow_is_rejected() {
    let pipeline = pipeline_from_yaml(
        r#"
name: Push only
on: push
jobs:
  - id: linux
    runs-on: ubuntu-latest
    steps:
      - run: cargo test
"#,
    );
    let runner = ScriptedRunner::new();

    let err = run_pipeline(&pipeline, runner.clone(), "pull_request").await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::TriggerNotSubscribed { ref trigger, .. } if trigger == "pull_request"
    ));
    assert!(runner.invocations().is_empty());
}

#[tokio::test]
async fn test_pipeline_without_jobs_is_rejected() {
    let pipeline = Pipeline::new("empty", vec![TriggerKind::Push]);

    let err = run_pipeline(&pipeline, ScriptedRunner::new(), "push").await.unwrap_err();

    assert_eq!(err, PipelineError::EmptyPipeline("empty".to_string()));
}

#[tokio::test]
async fn test_job_without_steps_is_rejected() {
    let pipeline = Pipeline::new("partial", vec![TriggerKind::Push])
        .with_job(Job::new("linux", "ubuntu-latest", vec![Step::run(0, "Test", "cargo test")]))
        .with_job(Job::new("windows", "windows-latest", vec![]));
    let runner = ScriptedRunner::new();

    let err = run_pipeline(&pipeline, runner.clone(), "push").await.unwrap_err();

    assert_eq!(err, PipelineError::EmptyJob("windows".to_string()));
    assert!(runner.invocations().is_empty(), "no job may start");
}

#[tokio::test]
async fn test_job_filter_limits_the_result() {
    let pipeline = rust_pipeline()
        .filtered(&JobFilter {
            ids: vec!["windows".to_string()],
            host_only: false,
        })
        .unwrap();
    let runner = ScriptedRunner::new();

    let result = run_pipeline(&pipeline, runner.clone(), "push").await.unwrap();

    assert_eq!(result.result.jobs.len(), 1);
    assert_job_succeeded(&result, "windows", WINDOWS_STEPS);
    assert!(runner.steps_run("linux").is_empty());
}

#[test]
fn test_unknown_job_filter_is_rejected() {
    let err = rust_pipeline()
        .filtered(&JobFilter {
            ids: vec!["macos".to_string()],
            host_only: false,
        })
        .unwrap_err();

    assert_eq!(err, PipelineError::UnknownJob("macos".to_string()));
}
