use clap::Subcommand;

use super::config::ConfigArgs;
use super::plan::PlanArgs;
use super::run::RunArgs;

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Pursue an objective with the adaptive observe/decide/act loop
    Run(RunArgs),

    /// Draft a step plan for an objective and execute it
    Plan(PlanArgs),

    /// Inspect configuration
    Config(ConfigArgs),
}
