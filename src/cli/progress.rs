//! Live per-job spinners for non-streaming runs

use crate::cli::output::format_job_state;
use crate::core::Pipeline;
use crate::execution::ExecutionEvent;
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::HashMap;
use std::time::Duration;

/// One spinner per scheduled job, driven by execution events
pub struct JobProgress {
    multi: MultiProgress,
    bars: HashMap<String, (ProgressBar, usize)>,
}

impl JobProgress {
    pub fn new(pipeline: &Pipeline) -> Self {
        Self::with_target(pipeline, ProgressDrawTarget::stderr())
    }

    /// Progress that draws nowhere
    pub fn hidden(pipeline: &Pipeline) -> Self {
        Self::with_target(pipeline, ProgressDrawTarget::hidden())
    }

    fn with_target(pipeline: &Pipeline, target: ProgressDrawTarget) -> Self {
        let multi = MultiProgress::with_draw_target(target);
        let spinner_style = ProgressStyle::with_template("{spinner:.green} {prefix:.bold} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());

        let bars = pipeline
            .jobs
            .iter()
            .map(|job| {
                let bar = multi.add(ProgressBar::new_spinner());
                bar.set_style(spinner_style.clone());
                bar.set_prefix(format!("{} ({})", job.id, job.platform));
                bar.set_message(style("waiting").dim().to_string());
                (job.id.clone(), (bar, job.steps.len()))
            })
            .collect();

        Self { multi, bars }
    }

    /// Update the spinner the event belongs to
    pub fn handle(&self, event: &ExecutionEvent) {
        match event {
            ExecutionEvent::JobStarted { job_id, .. } => {
                if let Some((bar, _)) = self.bars.get(job_id) {
                    bar.enable_steady_tick(Duration::from_millis(100));
                    bar.set_message("starting");
                }
            }
            ExecutionEvent::StepStarted {
                job_id,
                step_index,
                step_name,
            } => {
                if let Some((bar, total)) = self.bars.get(job_id) {
                    bar.set_message(format!("[{}/{}] {}", step_index + 1, total, step_name));
                }
            }
            ExecutionEvent::JobFinished { job_id, state } => {
                if let Some((bar, _)) = self.bars.get(job_id) {
                    bar.finish_with_message(format_job_state(state));
                }
            }
            _ => {}
        }
    }

    /// Print a line above the spinners
    pub fn println(&self, line: &str) {
        let _ = self.multi.println(line);
    }

    /// Stop every spinner that is still ticking
    pub fn finish(&self) {
        for (bar, _) in self.bars.values() {
            if !bar.is_finished() {
                bar.abandon();
            }
        }
    }
}
