//! CLI output formatting

use crate::{
    core::{ExecutionStatus, JobResult, JobState, PipelineResult},
    execution::ExecutionEvent,
    persistence::ExecutionSummary,
};
use console::Emoji;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");
pub static STOP: Emoji<'_, '_> = Emoji("🛑 ", "x ");

/// Lines of step output shown per step in stream mode
pub const STREAM_OUTPUT_LINES: usize = 20;

/// Format a job state for display
pub fn format_job_state(state: &JobState) -> String {
    match state {
        JobState::Pending => style("PENDING").dim().to_string(),
        JobState::Running { .. } => style("RUNNING").yellow().to_string(),
        JobState::Success { .. } => style("SUCCESS").green().to_string(),
        JobState::Failed { .. } => style("FAILED").red().to_string(),
        JobState::Cancelled { .. } => style("CANCELLED").yellow().to_string(),
    }
}

/// Format an execution status for display
pub fn format_status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Pending => style("PENDING").dim().to_string(),
        ExecutionStatus::Running => style("RUNNING").yellow().to_string(),
        ExecutionStatus::Completed => style("COMPLETED").green().to_string(),
        ExecutionStatus::Failed => style("FAILED").red().to_string(),
        ExecutionStatus::Cancelled => style("CANCELLED").yellow().to_string(),
    }
}

fn status_icon(status: ExecutionStatus) -> &'static Emoji<'static, 'static> {
    match status {
        ExecutionStatus::Completed => &CHECK,
        ExecutionStatus::Failed => &CROSS,
        ExecutionStatus::Cancelled => &STOP,
        ExecutionStatus::Running => &SPINNER,
        ExecutionStatus::Pending => &INFO,
    }
}

fn short_id(id: &uuid::Uuid) -> String {
    id.to_string()[..8].to_string()
}

/// One line per job: icon, job id, platform, and outcome
pub fn format_job_result(job: &JobResult) -> String {
    let icon = match job.state {
        JobState::Success { .. } => &CHECK,
        JobState::Failed { .. } => &CROSS,
        JobState::Cancelled { .. } => &STOP,
        _ => &SPINNER,
    };

    format!(
        "{}{} ({}) - {} - {}",
        icon,
        style(&job.job_id).bold(),
        style(&job.platform).dim(),
        format_job_state(&job.state),
        job.describe()
    )
}

/// Final report for a run: one line per job, then the aggregate
pub fn format_pipeline_result(result: &PipelineResult) -> String {
    let mut lines: Vec<String> = result.jobs.iter().map(|j| format!("  {}", format_job_result(j))).collect();

    let duration = result
        .completed_at
        .and_then(|end| (end - result.started_at).to_std().ok())
        .map(format_duration)
        .unwrap_or_default();

    lines.push(format!(
        "{}{} {} ({}/{} jobs succeeded) {}",
        status_icon(result.status),
        style(&result.pipeline_name).bold(),
        format_status(result.status),
        result.succeeded_jobs(),
        result.jobs.len(),
        style(duration).dim()
    ));
    lines.join("\n")
}

/// Format execution summary for display
pub fn format_execution_summary(summary: &ExecutionSummary) -> String {
    format!(
        "{}{} - {} - {} - {} ({}/{} jobs) - {}",
        status_icon(summary.status),
        style(short_id(&summary.execution_id)).dim(),
        style(&summary.pipeline_name).bold(),
        style(summary.trigger).cyan(),
        format_status(summary.status),
        summary.succeeded_jobs,
        summary.total_jobs,
        style(summary.started_at.format("%Y-%m-%d %H:%M:%S")).dim()
    )
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::PipelineStarted {
            execution_id,
            pipeline_name,
            trigger,
            job_count,
        } => format!(
            "{}Running {} on {} with {} jobs ({})",
            ROCKET,
            style(pipeline_name).bold(),
            style(trigger).cyan(),
            job_count,
            style(short_id(execution_id)).dim()
        ),
        ExecutionEvent::JobStarted { job_id, platform } => {
            format!("{}[{}] started on {}", INFO, style(job_id).bold(), style(platform).dim())
        }
        ExecutionEvent::StepStarted {
            job_id,
            step_index,
            step_name,
        } => format!(
            "{}[{}] {} {}",
            SPINNER,
            style(job_id).bold(),
            style(format!("#{}", step_index + 1)).dim(),
            style(step_name).cyan()
        ),
        ExecutionEvent::StepOutput {
            job_id,
            step_name,
            output,
        } => format!(
            "{}[{}] output from {}:\n{}",
            INFO,
            style(job_id).bold(),
            style(step_name).dim(),
            format_output(output, STREAM_OUTPUT_LINES)
        ),
        ExecutionEvent::StepCompleted {
            job_id,
            step_name,
            duration_ms,
            ..
        } => format!(
            "{}[{}] {} {}",
            CHECK,
            style(job_id).bold(),
            style(step_name).green(),
            style(format!("({} ms)", duration_ms)).dim()
        ),
        ExecutionEvent::StepFailed {
            job_id,
            step_name,
            exit_status,
            error,
            ..
        } => {
            let reason = match error {
                Some(error) => error.clone(),
                None => format!("exit status {}", exit_status),
            };
            format!(
                "{}[{}] {}: {}",
                CROSS,
                style(job_id).bold(),
                style(step_name).red(),
                style(reason).dim()
            )
        }
        ExecutionEvent::JobFinished { job_id, state } => {
            format!("{}[{}] {}", INFO, style(job_id).bold(), format_job_state(state))
        }
        ExecutionEvent::PipelineCompleted {
            execution_id,
            status,
        } => format!(
            "{}Run ({}) {}",
            status_icon(*status),
            style(short_id(execution_id)).dim(),
            format_status(*status)
        ),
    }
}

/// Keep the last `max_lines` lines of step output, noting how many were cut
pub fn format_output(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();
    if lines.len() <= max_lines {
        return output.to_string();
    }

    let skipped = lines.len() - max_lines;
    format!(
        "{}\n{}",
        style(format!("... ({} earlier lines)", skipped)).dim(),
        lines[skipped..].join("\n")
    )
}

pub fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
