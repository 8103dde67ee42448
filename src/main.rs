use anyhow::{Context, Result};
use cirun::cli::commands::{HistoryCommand, ListCommand, RunCommand, ValidateCommand};
use cirun::cli::output::*;
use cirun::cli::progress::JobProgress;
use cirun::cli::{Cli, Command};
use cirun::core::config::WorkflowConfig;
use cirun::core::{ExecutionStatus, JobFilter, PipelineResult};
use cirun::execution::{CancelHandle, ExecutionEngine, ExecutionEvent};
use cirun::persistence::{create_summary, ExecutionSummary, PersistenceBackend};
use cirun::runner::{ActionRegistry, LocalRunner, RunnerConfig};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// A job failed or the run was cancelled
const EXIT_JOB_FAILURE: u8 = 1;

/// The workflow or invocation was rejected before anything ran
const EXIT_CONFIG_ERROR: u8 = 2;

/// A second Ctrl-C arrived while jobs were still being cancelled
const EXIT_INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::from_args();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set logging subscriber: {}", e);
    }

    let outcome = match &cli.command {
        Command::Run(cmd) => run_pipeline(cmd, &cli).await,
        Command::Validate(cmd) => validate_pipeline(cmd),
        Command::List(cmd) => list_pipelines(cmd).await.map(|_| ExitCode::SUCCESS),
        Command::History(cmd) => show_history(cmd, cli.verbose).await.map(|_| ExitCode::SUCCESS),
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}{:#}", CROSS, style(e).red());
            ExitCode::from(EXIT_CONFIG_ERROR)
        }
    }
}

async fn run_pipeline(cmd: &RunCommand, cli: &Cli) -> Result<ExitCode> {
    let config = WorkflowConfig::from_file(&cmd.file).context("Failed to load workflow")?;

    let mut pipeline = config.to_pipeline();
    for (key, value) in &cmd.env {
        pipeline.env.insert(key.clone(), value.clone());
        info!("Environment override: {}={}", key, value);
    }

    let filter = JobFilter {
        ids: cmd.jobs.clone(),
        host_only: cmd.host_only,
    };
    let pipeline = pipeline.filtered(&filter)?;

    for (job_id, step_name, action) in ActionRegistry::new().unsupported_steps(&pipeline) {
        warn!("[{}] step '{}' uses unsupported action {}; it will fail", job_id, step_name, action);
    }

    let source_dir = match &cmd.source {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to resolve current directory")?,
    };

    let mut engine = ExecutionEngine::new(LocalRunner::new(RunnerConfig::default()), cmd.scheduling_strategy())
        .with_source_dir(source_dir)
        .with_step_timeout(cmd.step_timeout);

    let progress = if cmd.json || cli.stream {
        Arc::new(JobProgress::hidden(&pipeline))
    } else {
        Arc::new(JobProgress::new(&pipeline))
    };

    if cli.stream && !cmd.json {
        engine.add_event_handler(|event| println!("{}", format_execution_event(&event)));
    } else if !cmd.json {
        let progress = progress.clone();
        engine.add_event_handler(move |event| {
            if let ExecutionEvent::PipelineStarted { .. } = &event {
                progress.println(&format_execution_event(&event));
            }
            progress.handle(&event);
        });
    }

    let cancel = CancelHandle::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if on_interrupt.interrupt() {
                error!("Interrupted again, exiting without waiting for jobs");
                std::process::exit(EXIT_INTERRUPTED);
            }
            warn!("Interrupted, cancelling running jobs (press Ctrl-C again to quit)");
        }
    });

    let result = engine.run(&cmd.event, &pipeline, &cancel).await?;
    progress.finish();

    if !cmd.no_history {
        if let Err(e) = save_history(&result).await {
            warn!("Failed to save run history: {:#}", e);
        }
    }

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("\n{}", format_pipeline_result(&result));
        if !cmd.no_history {
            println!(
                "{}Execution saved to history (ID: {})",
                INFO,
                style(&result.execution_id.to_string()[..8]).dim()
            );
        }
    }

    if result.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        if result.status == ExecutionStatus::Failed {
            error!("{} failed", result.pipeline_name);
        }
        Ok(ExitCode::from(EXIT_JOB_FAILURE))
    }
}

async fn save_history(result: &PipelineResult) -> Result<()> {
    let store = open_store().await?;
    store.save_execution(&create_summary(result)).await
}

#[cfg(feature = "sqlite")]
async fn open_store() -> Result<Arc<dyn PersistenceBackend>> {
    Ok(Arc::new(cirun::persistence::SqliteExecutionStore::with_default_path().await?))
}

#[cfg(not(feature = "sqlite"))]
async fn open_store() -> Result<Arc<dyn PersistenceBackend>> {
    warn!("Built without SQLite support; history is not kept between runs");
    Ok(Arc::new(cirun::persistence::InMemoryPersistence::new()))
}

fn validate_pipeline(cmd: &ValidateCommand) -> Result<ExitCode> {
    match WorkflowConfig::from_file(&cmd.file) {
        Ok(config) => {
            let unsupported = ActionRegistry::new().unsupported_steps(&config.to_pipeline());
            if cmd.json {
                let data = serde_json::json!({
                    "valid": true,
                    "name": config.name,
                    "triggers": config.trigger_names(),
                    "jobs": config.jobs.iter().map(|job| serde_json::json!({
                        "id": job.id,
                        "runs_on": job.runs_on,
                        "steps": job.steps.len(),
                    })).collect::<Vec<_>>(),
                    "unsupported_actions": unsupported.iter().map(|(job_id, step_name, action)| serde_json::json!({
                        "job": job_id,
                        "step": step_name,
                        "action": action.to_string(),
                    })).collect::<Vec<_>>(),
                });
                println!("{}", serde_json::to_string_pretty(&data)?);
                return Ok(ExitCode::SUCCESS);
            }

            println!("{}Workflow configuration is valid!", CHECK);
            println!("  Name: {}", style(&config.name).bold());
            println!("  Triggers: {}", style(config.trigger_names().join(", ")).cyan());
            println!("  Jobs: {}", style(config.jobs.len()).cyan());
            for job in &config.jobs {
                println!(
                    "    {} on {} ({} steps)",
                    style(&job.id).bold(),
                    style(&job.runs_on).dim(),
                    job.steps.len()
                );
            }
            println!("  Steps: {}", style(config.step_count()).cyan());
            for (job_id, step_name, action) in &unsupported {
                println!(
                    "{}{} step '{}' uses unsupported action {}; it will fail when run",
                    WARN,
                    style(job_id).bold(),
                    step_name,
                    style(action).yellow()
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            if cmd.json {
                let data = serde_json::json!({ "valid": false, "error": format!("{:#}", e) });
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                println!("{}Validation failed:", CROSS);
                println!("  {}", style(format!("{:#}", e)).red());
            }
            Ok(ExitCode::from(EXIT_CONFIG_ERROR))
        }
    }
}

async fn list_pipelines(cmd: &ListCommand) -> Result<()> {
    let store = open_store().await?;
    let pipelines = store.list_pipelines().await?;

    if cmd.json {
        let mut json_data = Vec::new();
        for pipeline in &pipelines {
            let executions = store.list_executions(pipeline).await?;
            json_data.push(serde_json::json!({
                "name": pipeline,
                "execution_count": executions.len(),
            }));
        }
        let data = serde_json::json!({ "pipelines": json_data });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    if pipelines.is_empty() {
        println!("{}No workflows found in history", INFO);
        return Ok(());
    }

    println!("{}Workflows in history:", INFO);

    for pipeline_name in &pipelines {
        if cmd.with_counts {
            let executions = store.list_executions(pipeline_name).await?;
            let completed = executions.iter().filter(|e| e.status == ExecutionStatus::Completed).count();
            let failed = executions.iter().filter(|e| e.status == ExecutionStatus::Failed).count();
            println!(
                "  {} ({} runs: {} succeeded, {} failed)",
                style(pipeline_name).bold(),
                style(executions.len()).cyan(),
                style(completed).green(),
                style(failed).red()
            );
        } else {
            println!("  {}", style(pipeline_name).bold());
        }
    }

    Ok(())
}

async fn show_history(cmd: &HistoryCommand, verbose: bool) -> Result<()> {
    let store = open_store().await?;

    if let Some(exec_id_str) = &cmd.execution_id {
        let exec_id = uuid::Uuid::parse_str(exec_id_str).context("Invalid execution ID format")?;

        match store.load_execution(exec_id).await? {
            Some(summary) if cmd.json => println!("{}", serde_json::to_string_pretty(&summary)?),
            Some(summary) => print_execution_details(&summary, verbose),
            None => println!("{}Execution not found", WARN),
        }
        return Ok(());
    }

    let executions = match &cmd.pipeline {
        Some(pipeline_name) => {
            let mut executions = store.list_executions(pipeline_name).await?;
            executions.truncate(cmd.limit);
            executions
        }
        None => store.recent_executions(cmd.limit).await?,
    };

    if cmd.json {
        let data = serde_json::json!({ "executions": executions });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    if executions.is_empty() {
        println!("{}No executions found", INFO);
        return Ok(());
    }

    println!("{}Execution history (showing latest {}):", INFO, executions.len());
    for summary in &executions {
        println!("  {}", format_execution_summary(summary));
        if verbose {
            for job in &summary.jobs {
                println!("      {} ({}): {}", style(&job.job_id).bold(), job.platform, job.detail);
            }
        }
    }

    Ok(())
}

fn print_execution_details(summary: &ExecutionSummary, verbose: bool) {
    println!("{}Execution Details", INFO);
    println!("  ID: {}", style(summary.execution_id).cyan());
    println!("  Workflow: {}", style(&summary.pipeline_name).bold());
    println!("  Trigger: {}", style(summary.trigger).cyan());
    println!("  Status: {}", format_status(summary.status));
    println!("  Started: {}", style(summary.started_at.to_rfc3339()).dim());
    if let Some(completed) = summary.completed_at {
        println!("  Completed: {}", style(completed.to_rfc3339()).dim());
    }
    if let Some(duration) = summary.duration().and_then(|d| d.to_std().ok()) {
        println!("  Duration: {}", style(format_duration(duration)).dim());
    }
    println!(
        "  Jobs: {}/{} succeeded, {} failed",
        summary.succeeded_jobs, summary.total_jobs, summary.failed_jobs
    );

    for job in &summary.jobs {
        if verbose || job.state != "SUCCESS" {
            println!("    {} ({}) {}: {}", style(&job.job_id).bold(), job.platform, job.state, job.detail);
        }
    }
}
