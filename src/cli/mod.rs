pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ekklesia")]
#[command(about = "Ekklesia CLI - database maintenance for the event back office")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply pending schema migrations")]
    Migrate,

    #[command(about = "Load checkpoints, catalogue, meeting counter and staff accounts (replaces all sales)")]
    Seed,

    #[command(about = "Delete headcounts, store sales and visitors; keep meetings and products")]
    ResetCounts {
        #[arg(long, help = "Confirm the deletion")]
        yes: bool,
    },

    #[command(about = "Write the people report as CSV")]
    ExportPeople {
        #[arg(short, long, help = "Output file (stdout when omitted)")]
        output: Option<PathBuf>,
    },

    #[command(about = "Give back-office access to an existing person")]
    PromoteStaff {
        #[arg(help = "Email of the person")]
        email: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Migrate => commands::database::migrate(output_format).await,
        Commands::Seed => commands::database::seed(output_format).await,
        Commands::ResetCounts { yes } => commands::database::reset_counts(yes, output_format).await,
        Commands::ExportPeople { output } => commands::people::export(output, output_format).await,
        Commands::PromoteStaff { email } => commands::people::promote_staff(&email, output_format).await,
    }
}
