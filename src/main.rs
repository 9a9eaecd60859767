use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use lol_catalog::jobs::{
    repair_icons, sync_augments, sync_champions, sync_hex_items, sync_standard_items,
    AugmentSyncOptions, ChampionSyncOptions, HexItemSyncOptions, IconRepairOptions,
    ItemSyncOptions,
};
use lol_catalog::logging::init_tracing;
use lol_catalog::probe::HttpProbe;
use lol_catalog::scheduler::{CatalogRunner, Scheduler, SyncConfig};
use lol_catalog::store::{CatalogStore, MemoryStore, PgCatalogStore};
use lol_catalog::util::env as env_util;

#[derive(Parser, Debug)]
#[command(name = "catsync", version, about = "Game-reference catalog sync CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Sync arena augments into the catalog store
    SyncAugments {
        /// Membership tag maintained by this run
        #[arg(long, default_value = "hex_brawl")]
        mode: String,
        /// Override the arena source URL
        #[arg(long)]
        source_url: Option<String>,
        /// Pool allow-list URL restricting the augment set
        #[arg(long)]
        pool_url: Option<String>,
        #[arg(long, default_value = "zh_CN")]
        locale: String,
        /// Patch tag stamped on the batch
        #[arg(long)]
        patch: Option<String>,
        /// Deactivate in-scope records missing from this batch
        #[arg(long, default_value_t = false)]
        deactivate_old: bool,
        /// Keep existing membership instead of rebuilding this run's tag
        #[arg(long, default_value_t = false)]
        keep_membership: bool,
    },
    /// Sync champions from Data Dragon (latest published patch)
    SyncChampions {
        #[arg(long, default_value = "zh_CN")]
        locale: String,
    },
    /// Sync the standard item catalog from Data Dragon
    SyncItems {
        #[arg(long, default_value = "zh_CN")]
        locale: String,
    },
    /// Sync the hex-brawl item subset into its own domain
    SyncHexItems {
        #[arg(long, default_value = "zh_CN")]
        locale: String,
        /// Explicit patch tag ("latest" resolves the newest version)
        #[arg(long)]
        patch: Option<String>,
    },
    /// Repair broken or version-pinned augment icon URLs
    RepairIcons {
        /// Arena dump used as the secondary reconciliation source
        #[arg(long)]
        arena_file: Option<PathBuf>,
        /// Optional extra source with curated small-icon refs
        #[arg(long)]
        extra_file: Option<PathBuf>,
        /// Overwrite refs unconditionally
        #[arg(long, default_value_t = false)]
        force: bool,
        /// Accept the first well-formed candidate without probing
        #[arg(long, default_value_t = false)]
        no_validate: bool,
        /// Compute patches without persisting them
        #[arg(long, default_value_t = false)]
        dry_run: bool,
        /// Probe chains in flight at once
        #[arg(long, default_value_t = 8)]
        concurrency: usize,
        /// Per-probe timeout in seconds
        #[arg(long, default_value_t = 8)]
        timeout_secs: u64,
        /// Include deactivated records in the pass
        #[arg(long, default_value_t = false)]
        include_inactive: bool,
    },
    /// Run the periodic scheduler until interrupted
    Schedule,
}

async fn connect_store() -> Result<Arc<dyn CatalogStore>> {
    match env_util::db_url() {
        Some(url) => {
            let max_conns: u32 = env_util::env_parse("DB_MAX_CONNS", 5);
            let store = PgCatalogStore::connect(&url, max_conns)
                .await
                .context("connecting to the catalog store")?;
            if env_util::env_flag("AUTO_MIGRATE", false) {
                store.ensure_schema().await.context("ensuring schema")?;
            }
            Ok(Arc::new(store))
        }
        None => {
            warn!("no CATALOG_DB_URL / DATABASE_URL configured; using an in-memory store (results are discarded on exit)");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

fn print_report<T: serde::Serialize>(report: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_util::init_env();
    init_tracing("info,sqlx=warn")?;

    let cli = Cli::parse();
    let store = connect_store().await?;

    match cli.command {
        Commands::SyncAugments {
            mode,
            source_url,
            pool_url,
            locale,
            patch,
            deactivate_old,
            keep_membership,
        } => {
            let opts = AugmentSyncOptions {
                mode,
                source_url,
                pool_url,
                locale,
                version: patch,
                deactivate_old,
                refresh_membership: !keep_membership,
                ..AugmentSyncOptions::default()
            };
            let report = sync_augments(store.as_ref(), &opts).await?;
            print_report(&report)?;
        }
        Commands::SyncChampions { locale } => {
            let opts = ChampionSyncOptions {
                locale,
                ..ChampionSyncOptions::default()
            };
            let report = sync_champions(store.as_ref(), &opts).await?;
            print_report(&report)?;
        }
        Commands::SyncItems { locale } => {
            let opts = ItemSyncOptions {
                locale,
                ..ItemSyncOptions::default()
            };
            let report = sync_standard_items(store.as_ref(), &opts).await?;
            print_report(&report)?;
        }
        Commands::SyncHexItems { locale, patch } => {
            let opts = HexItemSyncOptions {
                locale,
                version: patch,
                ..HexItemSyncOptions::default()
            };
            let report = sync_hex_items(store.as_ref(), &opts).await?;
            print_report(&report)?;
        }
        Commands::RepairIcons {
            arena_file,
            extra_file,
            force,
            no_validate,
            dry_run,
            concurrency,
            timeout_secs,
            include_inactive,
        } => {
            let timeout = Duration::from_secs(timeout_secs);
            let mut opts = IconRepairOptions::default();
            if let Some(path) = arena_file {
                opts.arena_file = path;
            }
            if let Some(path) = extra_file {
                opts.extra_file = Some(path);
            }
            opts.only_active = !include_inactive;
            opts.force = force;
            opts.validate = !no_validate;
            opts.timeout = timeout;
            opts.concurrency = concurrency;
            opts.dry_run = dry_run;
            let probe = HttpProbe::new(timeout)?;
            let report = repair_icons(store.as_ref(), &probe, &opts).await?;
            print_report(&report)?;
        }
        Commands::Schedule => {
            let config = SyncConfig::from_env();
            if !config.flags.any_enabled() {
                warn!("LOL_SYNC_ENABLED is off; nothing to schedule");
                return Ok(());
            }
            info!(
                period_hours = config.period.as_secs() / 3600,
                "starting sync scheduler"
            );
            let runner = Arc::new(CatalogRunner::new(store, config.clone()));
            let scheduler = Arc::new(Scheduler::new(runner, config.period));
            let handle = scheduler.start();

            tokio::signal::ctrl_c()
                .await
                .context("waiting for shutdown signal")?;
            info!("shutdown signal received; finishing in-flight tick");
            handle.shutdown().await;
        }
    }

    Ok(())
}
