//! Operator CLI for users-service.
//!
//! Talks to the same stores as the HTTP service, through the same accessor,
//! so lookups populate and evictions clear the shared cache.
//!
//! # Usage
//!
//! ```bash
//! # Check both database endpoints and the cache
//! cargo run --bin admin -- db check
//!
//! # Look up a user (cache first, then replica)
//! cargo run --bin admin -- user get 42
//!
//! # Drop a cached entry
//! cargo run --bin admin -- cache evict 42
//! ```
//!
//! # Environment Variables
//!
//! Same as the service; see `users_service::config`.

use users_service::application::services::UserAccessor;
use users_service::config::{self, Config};
use users_service::server::build_cache;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use std::sync::Arc;
use users_service::infrastructure::persistence::{PgUserRepository, connect_pool};

/// CLI tool for operating users-service.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },

    /// User lookups
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Cache maintenance
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum DbAction {
    /// Ping the replica, the primary and the cache
    Check,
}

#[derive(Subcommand)]
enum UserAction {
    /// Read a user through the cache-aside path
    Get {
        /// User id
        id: String,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Remove the cached entry for a user
    Evict {
        /// User id
        id: String,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = config::load_from_env()?;
    let accessor = connect(&config).await?;

    match cli.command {
        Commands::Db {
            action: DbAction::Check,
        } => db_check(&accessor).await,
        Commands::User {
            action: UserAction::Get { id },
        } => user_get(&accessor, &id).await,
        Commands::Cache {
            action: CacheAction::Evict { id, yes },
        } => cache_evict(&accessor, &id, yes).await,
    }
}

/// Builds an accessor without running migrations.
async fn connect(config: &Config) -> Result<UserAccessor> {
    let reader = connect_pool(&config.reader_database_url, &config.pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to the replica: {}", e))?;
    let writer = connect_pool(&config.writer_database_url, &config.pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to the primary: {}", e))?;

    Ok(UserAccessor::new(
        Arc::new(PgUserRepository::new(Arc::new(reader))),
        Arc::new(PgUserRepository::new(Arc::new(writer))),
        build_cache(config).await,
        config.accessor_config(),
    ))
}

/// Reports each store on its own line.
///
/// ```text
/// Store check
///
///   replica   OK
///   primary   OK
///   cache     OK (redis)
/// ```
async fn db_check(accessor: &UserAccessor) -> Result<()> {
    println!("{}", "Store check".bright_blue().bold());
    println!();

    let replica = accessor.reader().ping_replica().await;
    let primary = accessor.writer().ping_primary().await;
    let cache = accessor.cache();
    let cache_ok = cache.health_check().await;

    print_check("replica", replica.as_ref().err().map(ToString::to_string));
    print_check("primary", primary.as_ref().err().map(ToString::to_string));

    let cache_label = format!("({})", cache.backend());
    if cache_ok {
        println!("  {:<9} {} {}", "cache", "OK".green(), cache_label.bright_black());
    } else {
        println!("  {:<9} {} {}", "cache", "DOWN".yellow(), cache_label.bright_black());
    }
    println!();

    if replica.is_err() || primary.is_err() {
        anyhow::bail!("one or more database endpoints are unreachable");
    }
    Ok(())
}

fn print_check(name: &str, error: Option<String>) {
    match error {
        None => println!("  {:<9} {}", name, "OK".green()),
        Some(e) => println!("  {:<9} {} {}", name, "FAILED".red(), e.bright_black()),
    }
}

async fn user_get(accessor: &UserAccessor, id: &str) -> Result<()> {
    let user = accessor
        .read(id)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read user: {}", e))?;

    println!("{}", "User".bright_blue().bold());
    println!("  Id:   {}", user.id.cyan());
    println!("  Name: {}", user.name.bright_white());
    Ok(())
}

async fn cache_evict(accessor: &UserAccessor, id: &str, skip_confirm: bool) -> Result<()> {
    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt(format!("Evict cached entry for '{}'?", id))
            .default(true)
            .interact()?;

        if !confirmed {
            println!("{}", "Cancelled".red());
            return Ok(());
        }
    }

    accessor
        .cache()
        .invalidate(id)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to evict: {}", e))?;

    println!("{} {}", "Evicted".green().bold(), id.cyan());
    Ok(())
}
