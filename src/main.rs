//! # tarkov-stats
//!
//! Command-line client for Escape from Tarkov player statistics: ranked
//! player-name search over the bulk index, plus per-account profile lookups.

use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tarkov_stats::profile::GameStats;
use tarkov_stats::{is_account_id, stats, AccessPolicy, ApiError, PlayerProfile, TarkovClient};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = "tarkov-stats: look up Escape from Tarkov player statistics.\n\
                  Searches the public player-name index with ranked matching, or fetches\n\
                  a single profile directly when given a numeric account id."
)]
struct Args {
    /// Route requests through public CORS relays when direct access is blocked
    #[arg(long)]
    web_fallback: bool,

    /// Index download deadline in seconds (the index is ~66MB)
    #[arg(long, default_value_t = 120)]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search players by display name (numeric input is treated as an account id)
    Search { query: String },
    /// Fetch one player's profile by account id
    Profile { account_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let policy = if args.web_fallback {
        AccessPolicy::RelayFallback
    } else {
        AccessPolicy::Direct
    };
    let client = TarkovClient::builder()
        .access_policy(policy)
        .index_timeout(Duration::from_secs(args.timeout))
        .build();

    match args.command {
        Command::Search { query } => run_search(&client, &query).await,
        Command::Profile { account_id } => run_profile(&client, &account_id).await,
    }
}

async fn run_search(client: &TarkovClient, query: &str) -> Result<()> {
    // Numeric input is an account id, not a name.
    if is_account_id(query) {
        return run_profile(client, query).await;
    }

    client.preload_index();

    let search = client.search(query);
    tokio::pin!(search);

    // Poll the loader at a coarse interval so the user sees the download
    // stages while the index warms.
    let mut ticker = tokio::time::interval(Duration::from_millis(300));
    let mut last_stage = None;
    let outcome = loop {
        tokio::select! {
            outcome = &mut search => break outcome,
            _ = ticker.tick() => {
                let stage = client.index_load_stage();
                if stage != last_stage {
                    if let Some(stage) = stage {
                        eprintln!("{}", stage.description());
                    }
                    last_stage = stage;
                }
            }
        }
    };

    match outcome {
        Ok(results) if results.is_empty() => {
            println!("No players matched \"{query}\".");
            Ok(())
        }
        Ok(results) => {
            for result in &results {
                println!("{:>10}  {}", result.id, result.name);
            }
            Ok(())
        }
        Err(ApiError::Timeout) => anyhow::bail!(
            "Download timed out. The player database is very large (~66MB). \
             Try entering an account id directly."
        ),
        Err(err) => Err(err.into()),
    }
}

async fn run_profile(client: &TarkovClient, account_id: &str) -> Result<()> {
    match client.fetch_profile(account_id).await {
        Ok(profile) => {
            print_profile(&profile);
            Ok(())
        }
        Err(ApiError::PlayerNotFound) => {
            anyhow::bail!("No player with account id {account_id}.")
        }
        Err(err) => Err(err.into()),
    }
}

fn print_profile(profile: &PlayerProfile) {
    let level = stats::level_for_experience(profile.info.experience);
    println!("{} (id {})", profile.info.nickname, profile.aid);
    println!("  Side: {}   Level: {}", profile.info.side, level);
    print_raid_stats("PMC", profile.pmc_stats.as_ref());
    print_raid_stats("Scav", profile.scav_stats.as_ref());
}

fn print_raid_stats(label: &str, block: Option<&GameStats>) {
    let raid = stats::raid_stats(block);
    println!(
        "  {label:>4}: {} raids, {:.1}% survived, K/D {:.2}, {} kills, {} in raid",
        raid.sessions,
        raid.survival_rate,
        raid.kd,
        stats::format_number(raid.kills),
        stats::format_playtime(raid.total_in_game_time),
    );
}
