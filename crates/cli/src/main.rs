//! Pickem CLI - operator tools for the pick-history blob.
//!
//! # Usage
//!
//! ```bash
//! # Pick from an explicit member list
//! pickem --state file:///var/lib/pickem/state.json pick -c C0 -m U1 -m U2
//!
//! # Manage exclusions
//! pickem exclude -c C0 -u U1
//! pickem include -c C0 -u U1
//! pickem excluded -c C0
//!
//! # Show or change the sample size
//! pickem sample-size -c C0 --set 3
//!
//! # Dump the stored state
//! pickem show -c C0
//! ```
//!
//! `--state` defaults to the `STATE_URL` environment variable. S3 locations
//! read credentials from the same variables the bot uses.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use pickem_bot::store::StateLocation;
use pickem_core::{ChannelId, PickemRepository, SampleSize, UserId};

mod commands;

#[derive(Parser)]
#[command(name = "pickem")]
#[command(author, version, about = "Pickem operator tools")]
struct Cli {
    /// State blob location (`file:///path` or `s3://bucket/key`)
    #[arg(long, env = "STATE_URL", global = true)]
    state: Option<StateLocation>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pick a user from the given members and record the pick
    Pick {
        /// Channel ID
        #[arg(short, long)]
        channel: String,

        /// Candidate member (repeat for each member)
        #[arg(short, long = "member", required = true)]
        members: Vec<String>,
    },
    /// Exclude a user from future picks
    Exclude {
        /// Channel ID
        #[arg(short, long)]
        channel: String,

        /// User ID
        #[arg(short, long)]
        user: String,
    },
    /// Make an excluded user eligible again
    Include {
        /// Channel ID
        #[arg(short, long)]
        channel: String,

        /// User ID
        #[arg(short, long)]
        user: String,
    },
    /// List excluded users
    Excluded {
        /// Channel ID
        #[arg(short, long)]
        channel: String,
    },
    /// Show the sample size, or change it with --set
    SampleSize {
        /// Channel ID
        #[arg(short, long)]
        channel: String,

        /// New sample size (positive integer)
        #[arg(long)]
        set: Option<SampleSize>,
    },
    /// Print the stored state as JSON
    Show {
        /// Only show this channel
        #[arg(short, long)]
        channel: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // .env may supply STATE_URL, so load it before parsing
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let result: Result<String, Box<dyn std::error::Error>> = run(cli).await;

    match result {
        Ok(output) => print_output(&output),
        Err(e) => {
            tracing::error!("Command failed: {e}");
            std::process::exit(1);
        }
    }
}

#[allow(clippy::print_stdout)]
fn print_output(output: &str) {
    println!("{output}");
}

async fn run(cli: Cli) -> Result<String, Box<dyn std::error::Error>> {
    let location = cli
        .state
        .ok_or("no state location: pass --state or set STATE_URL")?;
    let store = commands::open_store(&location).await?;
    let repository = PickemRepository::new();

    let output = match cli.command {
        Commands::Pick { channel, members } => {
            let members: Vec<UserId> = members.into_iter().map(UserId::new).collect();
            commands::channel::pick(&repository, &store, &ChannelId::new(channel), &members)
                .await?
        }
        Commands::Exclude { channel, user } => {
            commands::channel::exclude(
                &repository,
                &store,
                &ChannelId::new(channel),
                UserId::new(user),
            )
            .await?
        }
        Commands::Include { channel, user } => {
            commands::channel::include(
                &repository,
                &store,
                &ChannelId::new(channel),
                &UserId::new(user),
            )
            .await?
        }
        Commands::Excluded { channel } => {
            commands::channel::excluded(&repository, &store, &ChannelId::new(channel)).await?
        }
        Commands::SampleSize { channel, set } => {
            commands::channel::sample_size(&repository, &store, &ChannelId::new(channel), set)
                .await?
        }
        Commands::Show { channel } => {
            let channel = channel.map(ChannelId::new);
            commands::show::show(&store, channel.as_ref()).await?
        }
    };
    Ok(output)
}
