//! Test: step timeouts fail the step like a non-zero exit

use crate::helpers::*;
use cirun::core::{ExecutionStatus, JobState, Pipeline, Step, TriggerKind, Job, NO_EXIT_STATUS};
use std::time::Duration;

#[tokio::test]
async fn test_step_timeout_override_fails_slow_step() {
    let pipeline = rust_pipeline();
    let runner = ScriptedRunner::new().delay("linux", "Test", Duration::from_secs(30));

    let result = tokio::time::timeout(
        Duration::from_secs(10),
        run_with(
            &pipeline,
            runner,
            TestRun {
                step_timeout: Some(1),
                ..TestRun::default()
            },
        ),
    )
    .await
    .expect("timeout should end the step")
    .unwrap();

    assert_job_failed_at(&result, "linux", "Test", NO_EXIT_STATUS);
    match &result.job("linux").state {
        JobState::Failed { error, .. } => {
            assert_eq!(error.as_deref(), Some("Timed out after 1 seconds"));
        }
        other => panic!("unexpected state {:?}", other),
    }
    assert_job_succeeded(&result, "windows", WINDOWS_STEPS);
    assert_eq!(result.status(), ExecutionStatus::Failed);
}

#[tokio::test]
async fn test_per_step_timeout_applies_only_to_that_step() {
    let mut slow = Step::run(0, "Slow", "sleep 30");
    slow.timeout_secs = Some(1);
    let pipeline = Pipeline::new("timeouts", vec![TriggerKind::Push])
        .with_job(Job::new("linux", "ubuntu-latest", vec![slow, Step::run(1, "After", "true")]))
        .with_job(Job::new(
            "windows",
            "windows-latest",
            vec![Step::run(0, "Patient", "sleep 2")],
        ));
    let runner = ScriptedRunner::new()
        .delay("linux", "Slow", Duration::from_secs(30))
        .delay("windows", "Patient", Duration::from_millis(1500));

    let result = run_pipeline(&pipeline, runner.clone(), "push").await.unwrap();

    assert_job_failed_at(&result, "linux", "Slow", NO_EXIT_STATUS);
    assert!(runner.invocation("linux", "After").is_none());
    assert_job_succeeded(&result, "windows", &["Patient"]);
}

#[test]
fn test_job_timeout_becomes_step_default() {
    let pipeline = pipeline_from_yaml(
        r#"
name: Timeouts
on: push
default_timeout_minutes: 30
jobs:
  - id: linux
    runs-on: ubuntu-latest
    timeout_minutes: 10
    steps:
      - name: Build
        run: cargo build
      - name: Test
        run: cargo test
        timeout_minutes: 2
  - id: windows
    runs-on: windows-latest
    steps:
      - name: Build
        run: cargo build
"#,
    );

    let linux = pipeline.job("linux").unwrap();
    assert_eq!(linux.step("Build").unwrap().timeout_secs, Some(600));
    assert_eq!(linux.step("Test").unwrap().timeout_secs, Some(120));
    let windows = pipeline.job("windows").unwrap();
    assert_eq!(windows.step("Build").unwrap().timeout_secs, Some(1800));
}
