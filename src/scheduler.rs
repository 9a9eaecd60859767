//! Single-flight periodic sync driver.
//!
//! One run at a time, regardless of trigger source: startup, timer tick, or
//! manual invocation. A trigger arriving while a run is in flight is a silent
//! no-op, never queued, so a run outlasting the period simply absorbs the
//! next tick.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info};

use crate::jobs::{
    sync_augments, sync_champions, sync_hex_items, sync_standard_items, AugmentSyncOptions,
    ChampionSyncOptions, HexItemSyncOptions, ItemSyncOptions, SyncReport,
};
use crate::store::CatalogStore;
use crate::util::env::{env_flag, env_opt, env_parse};

pub const DEFAULT_PERIOD_HOURS: u64 = 72;

/// Env-driven feature flags. The master switch gates everything; per-domain
/// switches default on underneath it so one env var lights up the whole
/// pipeline and individual domains can still be switched off.
#[derive(Debug, Clone, Default)]
pub struct SyncFlags {
    pub master: bool,
    pub augments: bool,
    pub champions: bool,
    pub items: bool,
}

impl SyncFlags {
    pub fn from_env() -> Self {
        let master = env_flag("LOL_SYNC_ENABLED", false);
        Self {
            master,
            augments: master && env_flag("AUGMENTS_SYNC_ENABLED", true),
            champions: master && env_flag("CHAMPIONS_SYNC_ENABLED", true),
            items: master && env_flag("ITEMS_SYNC_ENABLED", true),
        }
    }

    pub fn any_enabled(&self) -> bool {
        self.master && (self.augments || self.champions || self.items)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Idle,
    Running,
}

/// Mutex-guarded idle/running state owned by the scheduler. A trigger that
/// cannot flip idle -> running is dropped.
pub struct SingleFlight {
    state: Mutex<RunState>,
}

impl Default for SingleFlight {
    fn default() -> Self {
        Self::new()
    }
}

impl SingleFlight {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RunState::Idle),
        }
    }

    /// Claim the running slot; None while another run holds it. The guard
    /// releases the slot on drop, panics included.
    pub fn begin(&self) -> Option<RunGuard<'_>> {
        let mut state = self.state.lock().unwrap();
        if *state == RunState::Running {
            return None;
        }
        *state = RunState::Running;
        Some(RunGuard { flight: self })
    }

    pub fn is_running(&self) -> bool {
        *self.state.lock().unwrap() == RunState::Running
    }
}

pub struct RunGuard<'a> {
    flight: &'a SingleFlight,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        *self.flight.state.lock().unwrap() = RunState::Idle;
    }
}

/// Everything one scheduled run needs.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub flags: SyncFlags,
    pub period: Duration,
    pub augments: AugmentSyncOptions,
    pub champions: ChampionSyncOptions,
    pub items: ItemSyncOptions,
    pub hex_items: HexItemSyncOptions,
}

impl SyncConfig {
    pub fn from_env() -> Self {
        let hours: u64 = env_parse("LOL_SYNC_INTERVAL_HOURS", DEFAULT_PERIOD_HOURS);
        let locale = env_opt("LOL_LOCALE").unwrap_or_else(|| "zh_CN".to_string());
        let patch = env_opt("AUGMENTS_PATCH_VERSION")
            .or_else(|| env_opt("AUGMENTS_PATCH"))
            .or_else(|| Some("latest".to_string()));

        let augments = AugmentSyncOptions {
            mode: env_opt("AUGMENTS_SYNC_MODE").unwrap_or_else(|| "hex_brawl".to_string()),
            source_url: env_opt("AUGMENTS_SOURCE_URL"),
            pool_url: env_opt("AUGMENTS_POOL_URL"),
            locale: locale.clone(),
            version: patch.clone(),
            deactivate_old: env_flag("AUGMENTS_DEACTIVATE_OLD", false),
            ..AugmentSyncOptions::default()
        };
        let champions = ChampionSyncOptions {
            locale: locale.clone(),
            ..ChampionSyncOptions::default()
        };
        let items = ItemSyncOptions {
            locale: locale.clone(),
            ..ItemSyncOptions::default()
        };
        let hex_items = HexItemSyncOptions {
            locale,
            version: patch,
            ..HexItemSyncOptions::default()
        };

        Self {
            flags: SyncFlags::from_env(),
            period: Duration::from_secs(hours.max(1) * 3600),
            augments,
            champions,
            items,
            hex_items,
        }
    }
}

/// The work one tick performs. Job failures are caught inside: a failed job
/// logs its reason and the siblings still run.
#[async_trait]
pub trait SyncRunner: Send + Sync {
    async fn run_jobs(&self, reason: &str);
}

/// Production runner: every enabled domain, sequentially, against one store.
pub struct CatalogRunner {
    store: Arc<dyn CatalogStore>,
    config: SyncConfig,
}

impl CatalogRunner {
    pub fn new(store: Arc<dyn CatalogStore>, config: SyncConfig) -> Self {
        Self { store, config }
    }

    fn summarize(label: &str, outcome: &Result<SyncReport, crate::error::SyncError>) -> String {
        match outcome {
            Ok(report) => format!("{}={}", label, report.total),
            Err(_) => format!("{}=failed", label),
        }
    }
}

#[async_trait]
impl SyncRunner for CatalogRunner {
    async fn run_jobs(&self, reason: &str) {
        let flags = &self.config.flags;
        let mut parts: Vec<String> = Vec::new();

        if flags.augments {
            let outcome = sync_augments(self.store.as_ref(), &self.config.augments).await;
            if let Err(err) = &outcome {
                error!(job = "augments", reason, error = %err, "sync job failed");
            }
            parts.push(Self::summarize("augments", &outcome));
        }
        if flags.champions {
            let outcome = sync_champions(self.store.as_ref(), &self.config.champions).await;
            if let Err(err) = &outcome {
                error!(job = "champions", reason, error = %err, "sync job failed");
            }
            parts.push(Self::summarize("champions", &outcome));
        }
        if flags.items {
            let outcome = sync_standard_items(self.store.as_ref(), &self.config.items).await;
            if let Err(err) = &outcome {
                error!(job = "items", reason, error = %err, "sync job failed");
            }
            parts.push(Self::summarize("items", &outcome));

            let outcome = sync_hex_items(self.store.as_ref(), &self.config.hex_items).await;
            if let Err(err) = &outcome {
                error!(job = "hex_items", reason, error = %err, "sync job failed");
            }
            parts.push(Self::summarize("hex_items", &outcome));
        }

        info!(reason, summary = %parts.join(" "), "sync tick complete");
    }
}

pub struct Scheduler {
    runner: Arc<dyn SyncRunner>,
    flight: SingleFlight,
    period: Duration,
}

impl Scheduler {
    pub fn new(runner: Arc<dyn SyncRunner>, period: Duration) -> Self {
        Self {
            runner,
            flight: SingleFlight::new(),
            period,
        }
    }

    pub fn is_running(&self) -> bool {
        self.flight.is_running()
    }

    /// Run the enabled jobs once. Returns false (without running anything)
    /// when another run is already in flight.
    pub async fn run_once(&self, reason: &str) -> bool {
        let Some(_guard) = self.flight.begin() else {
            info!(reason, "sync already in flight; trigger dropped");
            return false;
        };
        let started = Instant::now();
        self.runner.run_jobs(reason).await;
        info!(
            reason,
            cost_ms = started.elapsed().as_millis() as u64,
            "sync run finished"
        );
        true
    }

    /// Start the periodic loop: one startup run, then fixed-period ticks.
    /// The handle stops the loop and waits for an in-flight tick to finish.
    pub fn start(self: Arc<Self>) -> SchedulerHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let scheduler = self.clone();
        let task = tokio::spawn(async move {
            scheduler.run_once("startup").await;

            let mut ticker = tokio::time::interval(scheduler.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick resolves immediately; the startup run covered it.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        scheduler.run_once("interval").await;
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("sync scheduler stopped");
        });
        SchedulerHandle {
            stop: stop_tx,
            task,
        }
    }
}

/// Cancellation handle for the scheduler loop.
pub struct SchedulerHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signal shutdown and wait for the loop (and any in-flight tick) to end.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        let _ = self.task.await;
    }
}
