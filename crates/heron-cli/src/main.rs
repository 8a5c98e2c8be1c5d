use anyhow::Result;
use clap::{Parser, Subcommand};
use strum::IntoEnumIterator;
use tracing_subscriber::EnvFilter;

use heron::providers::factory::ProviderType;

mod commands;

use commands::ProviderVariant;

#[derive(Parser)]
#[command(author, version, about = "Walkthroughs of a bounded tool-orchestration loop", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Basic chat completion walkthrough
    Chat {
        /// Provider to talk to
        #[arg(short, long, value_enum, default_value = "open-ai")]
        provider: ProviderVariant,

        /// Prompt to send
        #[arg(
            short,
            long,
            default_value = "What are the core features that work across all LLM providers?"
        )]
        message: String,
    },
    /// Weather agent loop that terminates when the weather_report tool is called
    Weather {
        /// Provider to talk to
        #[arg(short, long, value_enum, default_value = "open-ai")]
        provider: ProviderVariant,
    },
    /// List supported provider types
    Providers,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Chat { provider, message } => commands::chat::run(provider, &message).await,
        Command::Weather { provider } => commands::weather::run(provider).await,
        Command::Providers => {
            for provider in ProviderType::iter() {
                println!("{}", provider);
            }
            Ok(())
        }
    }
}
