pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "backoffice")]
#[command(about = "Back-office API server and maintenance commands")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP API (default)")]
    Serve,

    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "Mint a bearer token for an existing admin account")]
    IssueToken {
        #[arg(long, help = "User id to use as the token subject")]
        user_id: i64,
        #[arg(long, help = "Validity in hours (defaults to JWT_EXPIRY_HOURS)")]
        hours: Option<u64>,
    },

    #[command(about = "Delete read notifications past the retention window")]
    PurgeNotifications {
        #[arg(long, default_value_t = 30, help = "Only purge notifications read more than N days ago")]
        older_than_days: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
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
    let config = crate::config::config().clone();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => commands::serve::handle(config).await,
        Commands::Migrate => commands::maintenance::migrate(&config, output_format).await,
        Commands::IssueToken { user_id, hours } => {
            commands::maintenance::issue_token(&config, user_id, hours, output_format).await
        }
        Commands::PurgeNotifications { older_than_days } => {
            commands::maintenance::purge_notifications(&config, older_than_days, output_format).await
        }
    }
}
