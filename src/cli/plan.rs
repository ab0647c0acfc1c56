use anyhow::Result;
use clap::Args;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::context::CliContext;
use super::output::OutputFormat;
use crate::service::PlanReport;

#[derive(Args, Clone, Debug)]
pub struct PlanArgs {
    /// Natural-language objective
    pub objective: String,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Override plan.max_replans
    #[arg(long)]
    pub max_replans: Option<u32>,

    /// Retry failed click/type steps against alternative targets
    #[arg(long)]
    pub retry_alternatives: bool,
}

pub async fn cmd_plan(args: PlanArgs, ctx: &CliContext) -> Result<()> {
    let mut config = ctx.config().clone();
    if let Some(max) = args.max_replans {
        config.plan.max_replans = max;
    }
    if args.retry_alternatives {
        config.plan.retry_alternatives = true;
    }

    let service = ctx.task_service(config)?;
    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    info!("Ctrl-C received; stopping before the next step");
                    cancel.cancel();
                }
                Err(err) => warn!(?err, "failed to listen for Ctrl-C"),
            }
        })
    };

    let outcome = service.execute_plan(&args.objective, cancel).await;
    watcher.abort();
    print_report(&outcome?, args.output)?;
    Ok(())
}

fn print_report(report: &PlanReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => {
            let result = &report.result;
            println!("{:?}: {}", result.status, result.message);
            println!("  task:       {}", report.task_id);
            println!(
                "  steps:      {}/{} (cursor {})",
                result.completed_steps, result.total_steps, result.cursor
            );
            println!("  replans:    {}", result.replans);
            println!("  executions: {}", result.step_executions);
            for (index, step) in result.plan.steps.iter().enumerate() {
                let marker = if index < result.cursor { "x" } else { " " };
                println!("  [{marker}] {} {}", step.action, step.target);
            }
            println!("  elapsed:    {}ms", report.execution_time_ms);
        }
    }
    Ok(())
}
