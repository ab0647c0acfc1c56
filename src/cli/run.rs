use anyhow::Result;
use clap::Args;

use super::context::CliContext;
use super::output::OutputFormat;
use crate::service::TaskReport;

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Natural-language objective, e.g. "Sign up on example.com"
    pub objective: String,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Override agent.max_iterations
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Show the browser window
    #[arg(long)]
    pub headful: bool,
}

pub async fn cmd_run(args: RunArgs, ctx: &CliContext) -> Result<()> {
    let mut config = ctx.config().clone();
    if let Some(max) = args.max_iterations.filter(|max| *max > 0) {
        config.agent.max_iterations = max;
    }
    if args.headful {
        config.browser.headless = false;
    }

    let service = ctx.task_service(config)?;
    let report = service.execute(&args.objective).await?;
    print_report(&report, args.output)?;
    Ok(())
}

fn print_report(report: &TaskReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => {
            let verdict = if report.result.success { "SUCCESS" } else { "FAILED" };
            println!("{verdict}: {}", report.result.message);
            println!("  task:        {}", report.task_id);
            println!("  status:      {:?}", report.result.status);
            println!("  iterations:  {}", report.result.iterations);
            println!("  adaptations: {}", report.result.adaptations);
            println!(
                "  actions:     {} ({:.0}% successful)",
                report.learning_stats.total_actions,
                report.learning_stats.success_rate * 100.0
            );
            println!("  elapsed:     {}ms", report.execution_time_ms);
        }
    }
    Ok(())
}
