//! Test: cancelling an invocation stops in-flight and pending work

use crate::helpers::*;
use cirun::core::{ExecutionStatus, JobState};
use cirun::execution::{CancelHandle, SchedulingStrategy};
use std::time::Duration;

fn cancel_after(cancel: &CancelHandle, delay: Duration) {
    let cancel = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        cancel.cancel();
    });
}

#[tokio::test]
async fn test_cancel_interrupts_running_steps() {
    let pipeline = rust_pipeline();
    let runner = ScriptedRunner::new()
        .delay("linux", "Build", Duration::from_secs(30))
        .delay("windows", "Build", Duration::from_secs(30));
    let options = TestRun::default();
    cancel_after(&options.cancel, Duration::from_millis(100));

    let result = tokio::time::timeout(Duration::from_secs(10), run_with(&pipeline, runner.clone(), options))
        .await
        .expect("cancellation should end the run promptly")
        .unwrap();

    assert_eq!(result.status(), ExecutionStatus::Cancelled);
    assert_job_cancelled(&result, "linux");
    assert_job_cancelled(&result, "windows");

    assert!(runner.invocation("linux", "Lint").is_none());
    assert!(runner.invocation("windows", "Lint").is_none());
    match result.job("linux").state {
        JobState::Cancelled { step_index, .. } => assert_eq!(step_index, Some(2)),
        ref other => panic!("unexpected state {:?}", other),
    }
}

#[tokio::test]
async fn test_cancel_while_queued_never_starts_job() {
    let pipeline = rust_pipeline();
    let runner = ScriptedRunner::new().delay("linux", "Build", Duration::from_secs(30));
    let options = TestRun {
        strategy: SchedulingStrategy::Sequential,
        ..TestRun::default()
    };
    cancel_after(&options.cancel, Duration::from_millis(100));

    let result = run_with(&pipeline, runner.clone(), options).await.unwrap();

    assert_job_cancelled(&result, "linux");
    assert!(matches!(
        result.job("windows").state,
        JobState::Cancelled { step_index: None, .. }
    ));
    assert!(runner.steps_run("windows").is_empty());
    assert_eq!(result.status(), ExecutionStatus::Cancelled);
}

#[tokio::test]
async fn test_failure_outranks_cancellation() {
    let pipeline = rust_pipeline();
    let runner = ScriptedRunner::new()
        .fail("linux", "Checkout", 1)
        .delay("windows", "Build", Duration::from_secs(30));
    let options = TestRun::default();
    cancel_after(&options.cancel, Duration::from_millis(200));

    let result = run_with(&pipeline, runner, options).await.unwrap();

    assert_job_failed_at(&result, "linux", "Checkout", 1);
    assert_job_cancelled(&result, "windows");
    assert_eq!(result.status(), ExecutionStatus::Failed);
}

#[tokio::test]
async fn test_cancel_after_completion_has_no_effect() {
    let pipeline = rust_pipeline();
    let options = TestRun::default();
    let cancel = options.cancel.clone();

    let result = run_with(&pipeline, ScriptedRunner::new(), options).await.unwrap();
    cancel.cancel();

    assert_eq!(result.status(), ExecutionStatus::Completed);
}
