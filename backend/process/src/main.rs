use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use process::utils::resolve_date_key;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the counter table
    Bootstrap,

    /// Delete the counter row for a day (MM-DD)
    Reset { date_key: String },

    /// Show the last issued number for a day, today by default
    Peek { date_key: Option<String> },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = Args::parse();
    let allocator = process::connect().await?;

    match args.command {
        Command::Bootstrap => process::bootstrap(&allocator).await?,
        Command::Reset { date_key } => {
            let date_key = resolve_date_key(Some(&date_key))?;
            process::reset(&allocator, &date_key).await?;
        }
        Command::Peek { date_key } => {
            let date_key = resolve_date_key(date_key.as_deref())?;
            process::peek(&allocator, &date_key).await?;
        }
    }

    Ok(())
}
