use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use linktrail::config::Config;
use linktrail::models::{Link, LinkStatistics};
use linktrail::storage::{self, Storage};

#[derive(Parser)]
#[command(name = "linktrail-admin")]
#[command(about = "Linktrail management CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema if it does not exist
    Init,
    /// Create a short link
    Create {
        /// Destination URL including the scheme
        original_link: String,
    },
    /// Print statistics for a link
    Stats {
        /// Access key returned when the link was created
        access_key: String,
    },
    /// List the recorded transitions of a link
    Transitions {
        /// Access key returned when the link was created
        access_key: String,
    },
}

async fn find_link(storage: &dyn Storage, access_key: &str) -> Result<Link> {
    storage
        .get_link_by_access_key(access_key)
        .await?
        .with_context(|| format!("no link found for access key '{}'", access_key))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Ensure database is initialized
    let storage = storage::connect(&config.database).await?;

    match cli.command {
        Commands::Init => {
            println!("✓ Database schema is ready");
        }
        Commands::Create { original_link } => {
            let link = storage.create_link(&original_link).await?;
            println!("✓ Created short link for '{}'", link.original_link);
            println!("  short link: {}", link.short_link);
            println!("  access key: {}", link.access_key);
        }
        Commands::Stats { access_key } => {
            let link = find_link(storage.as_ref(), &access_key).await?;
            let stats = storage.get_link_stats(&link).await?;
            let report = LinkStatistics::new(link.original_link, link.short_link, stats);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Transitions { access_key } => {
            let link = find_link(storage.as_ref(), &access_key).await?;
            let transitions = storage.list_transitions(&link).await?;
            if transitions.is_empty() {
                println!("No transitions recorded for '{}'.", link.short_link);
            } else {
                println!(
                    "{:<20} {:<16} {:<20} {:<16} {}",
                    "Created", "From IP", "From", "To IP", "Referrer"
                );
                println!("{}", "-".repeat(96));
                for t in transitions {
                    let created = chrono::DateTime::from_timestamp(t.created_at, 0)
                        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_else(|| t.created_at.to_string());
                    let from = match (&t.from_country, &t.from_city) {
                        (Some(country), Some(city)) => format!("{}/{}", country, city),
                        (Some(country), None) => country.clone(),
                        _ => "-".to_string(),
                    };
                    println!(
                        "{:<20} {:<16} {:<20} {:<16} {}",
                        created,
                        t.from_ip.as_deref().unwrap_or("-"),
                        from,
                        t.to_ip.as_deref().unwrap_or("-"),
                        t.forwarded_from.as_deref().unwrap_or("-"),
                    );
                }
            }
        }
    }

    storage.close().await;

    Ok(())
}
