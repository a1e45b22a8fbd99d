use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "abt-audit",
    version,
    about = "Audit help-center articles against the Actionable, Brief, Targeted standard"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Audit(AuditArgs),
    Batch(BatchArgs),
}

#[derive(Args, Debug, Clone)]
pub struct EngineArgs {
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub catalog: Option<String>,

    #[arg(long, default_value_t = false)]
    pub offline: bool,
}

#[derive(Args, Debug, Clone)]
pub struct AuditArgs {
    #[arg(long)]
    pub article: PathBuf,

    #[command(flatten)]
    pub engine: EngineArgs,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    #[arg(long)]
    pub articles: PathBuf,

    #[command(flatten)]
    pub engine: EngineArgs,

    #[arg(long)]
    pub concurrency: Option<usize>,

    #[arg(long)]
    pub output: Option<PathBuf>,
}
