//! Icon repair: reconcile persisted augments against a secondary arena
//! source, then re-point broken or version-pinned icon URLs at the first
//! reachable candidate.
//!
//! Update-only: the pass patches existing records and never
//! inserts, so providers that disagree on ids cannot seed duplicates here.
//! Probe chains fan out under a bounded pool; workers only compute patches,
//! and a single writer step persists them afterwards.

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use regex::Regex;
use tokio::sync::Semaphore;
use tracing::info;

use crate::catalog::{CatalogRecord, Domain};
use crate::error::SyncError;
use crate::probe::{first_well_formed, resolve_candidates, Probe};
use crate::reconcile::{ExtraIndex, SecondaryIndex};
use crate::sources::cdragon;
use crate::store::{CatalogStore, RecordPatch};
use crate::util::env::env_opt;

use super::RepairReport;

#[derive(Debug, Clone)]
pub struct IconRepairOptions {
    /// Arena dump the secondary index is built from.
    pub arena_file: PathBuf,
    /// Optional extra source carrying curated small-icon refs.
    pub extra_file: Option<PathBuf>,
    pub latest_game_base: String,
    pub plugins_base: String,
    pub only_active: bool,
    /// Overwrite refs unconditionally instead of filling empty/stale ones.
    pub force: bool,
    /// Probe candidates before accepting them; off = trust the first
    /// well-formed candidate.
    pub validate: bool,
    pub timeout: Duration,
    /// Probe chains in flight at once across the batch.
    pub concurrency: usize,
    /// Compute patches without persisting them.
    pub dry_run: bool,
}

impl Default for IconRepairOptions {
    fn default() -> Self {
        Self {
            arena_file: env_opt("AUGMENT_ARENA_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/assets/arena_augments.json")),
            extra_file: env_opt("AUGMENT_EXTRA_ICON_FILE").map(PathBuf::from),
            latest_game_base: cdragon::GAME_ASSET_BASE.to_string(),
            plugins_base: cdragon::PLUGINS_ASSET_BASE.to_string(),
            only_active: true,
            force: false,
            validate: true,
            timeout: Duration::from_secs(8),
            concurrency: 8,
            dry_run: false,
        }
    }
}

#[derive(Debug, Default)]
struct RepairDecision {
    stable_id: String,
    matched: bool,
    patch: RecordPatch,
}

fn small_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)_small\.png$").unwrap())
}

fn small_to_large(assets_path: &str) -> String {
    if assets_path.is_empty() {
        return String::new();
    }
    small_suffix_re()
        .replace(assets_path, "_large.png")
        .into_owned()
}

/// Compute the patch for one record. One record's candidate chain runs
/// entirely inside this call, so the bounded pool never splits it.
async fn plan_repair(
    record: &CatalogRecord,
    arena: &SecondaryIndex,
    extra: Option<&ExtraIndex>,
    probe: &dyn Probe,
    opts: &IconRepairOptions,
) -> RepairDecision {
    let mut decision = RepairDecision {
        stable_id: record.stable_id.clone(),
        ..RepairDecision::default()
    };

    let arena_hit = arena.find_match(record);
    decision.matched = arena_hit.is_some();

    let extra_hit = extra.and_then(|idx| idx.find_by_name(&record.display_name));
    let extra_small_url = extra_hit.map(|hit| hit.icon_small.clone()).unwrap_or_default();
    let extra_small_assets = cdragon::extract_assets_path(&extra_small_url);
    let extra_large_assets = small_to_large(&extra_small_assets);

    // Asset path priority: curated extra source, then the record's own refs,
    // then whatever the arena match carries.
    let assets_path = [
        extra_large_assets.clone(),
        cdragon::extract_assets_path(&record.refs.icon),
        cdragon::extract_assets_path(&record.refs.icon_large),
        cdragon::extract_assets_path(&record.refs.icon_small),
        arena_hit
            .map(|hit| cdragon::extract_assets_path(&hit.icon_large))
            .unwrap_or_default(),
        arena_hit
            .map(|hit| cdragon::extract_assets_path(&hit.icon_small))
            .unwrap_or_default(),
    ]
    .into_iter()
    .find(|p| !p.is_empty())
    .unwrap_or_default();

    if assets_path.is_empty() {
        return decision;
    }

    let current = record.refs.icon.trim().to_string();
    let should_patch_icon =
        opts.force || current.is_empty() || cdragon::is_version_pinned(&current);
    let wants_size_backfill = !extra_small_url.is_empty()
        && (record.refs.icon_small.trim().is_empty() || record.refs.icon_large.trim().is_empty());
    if !should_patch_icon && !wants_size_backfill {
        return decision;
    }

    let game = cdragon::join_base(&opts.latest_game_base, &assets_path);
    let toggled_path = cdragon::toggle_mode_path(&assets_path);
    let game_toggled = cdragon::join_base(&opts.latest_game_base, &toggled_path);
    let plugins = cdragon::join_base(&opts.plugins_base, &assets_path);
    let plugins_toggled = cdragon::join_base(&opts.plugins_base, &toggled_path);

    let selected = if !opts.validate {
        first_well_formed(&[game.clone(), game_toggled.clone()]).unwrap_or_else(|| current.clone())
    } else {
        let candidates = vec![
            game,
            game_toggled,
            plugins,
            plugins_toggled,
            current.clone(),
        ];
        resolve_candidates(probe, &candidates, &current)
            .await
            .unwrap_or_default()
    };

    if should_patch_icon && !selected.is_empty() && selected != current {
        decision.patch.icon = Some(selected);
    }

    if !extra_small_url.is_empty() {
        if opts.force || record.refs.icon_small.trim().is_empty() {
            decision.patch.icon_small = Some(extra_small_url);
        }
        let mut large = cdragon::join_base(&opts.latest_game_base, &extra_large_assets);
        if opts.validate && !large.is_empty() && !probe.check(&large).await {
            large.clear();
        }
        if !large.is_empty() && (opts.force || record.refs.icon_large.trim().is_empty()) {
            decision.patch.icon_large = Some(large);
        }
    }

    decision
}

pub async fn repair_icons(
    store: &dyn CatalogStore,
    probe: &dyn Probe,
    opts: &IconRepairOptions,
) -> Result<RepairReport, SyncError> {
    let arena = SecondaryIndex::from_file(&opts.arena_file)?;
    let extra = ExtraIndex::from_optional_file(opts.extra_file.as_deref())?;

    let docs = store.list(Domain::Augments, opts.only_active).await?;

    let sem = Arc::new(Semaphore::new(opts.concurrency.max(1)));
    let mut chains = FuturesUnordered::new();
    for record in &docs {
        let sem = sem.clone();
        let arena = &arena;
        let extra = extra.as_ref();
        chains.push(async move {
            let _permit = sem.acquire_owned().await.unwrap();
            plan_repair(record, arena, extra, probe, opts).await
        });
    }

    let mut decisions: Vec<RepairDecision> = Vec::with_capacity(docs.len());
    while let Some(decision) = chains.next().await {
        decisions.push(decision);
    }
    drop(chains);

    // Single writer step: probe workers computed, only this loop persists.
    let mut matched = 0usize;
    let mut updated = 0usize;
    for decision in &decisions {
        if decision.matched {
            matched += 1;
        }
        if decision.patch.is_empty() {
            continue;
        }
        updated += 1;
        if !opts.dry_run {
            store
                .apply_patch(Domain::Augments, &decision.stable_id, &decision.patch)
                .await?;
        }
    }

    let report = RepairReport {
        source_total: arena.len(),
        extra_total: extra.as_ref().map(ExtraIndex::len).unwrap_or(0),
        db_total: docs.len(),
        matched,
        updated,
        dry_run: opts.dry_run,
        validated: opts.validate,
    };
    info!(
        source_total = report.source_total,
        db_total = report.db_total,
        matched = report.matched,
        updated = report.updated,
        dry_run = report.dry_run,
        "icon repair finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::testing::FakeProbe;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::path::Path;

    const PINNED: &str =
        "https://raw.communitydragon.org/14.23/game/assets/ux/cherry/augments/icons/firebolt_large.png";
    const LATEST_GAME: &str =
        "https://raw.communitydragon.org/latest/game/assets/ux/cherry/augments/icons/firebolt_large.png";
    const LATEST_PLUGINS: &str =
        "https://raw.communitydragon.org/latest/plugins/rcp-be-lol-game-data/global/default/assets/ux/cherry/augments/icons/firebolt_large.png";

    fn write_arena_file(dir: &Path) -> PathBuf {
        let path = dir.join("arena_augments.json");
        let payload = json!({
            "augments": [
                {"apiName": "Aug_FireBolt", "name": "Fire Bolt",
                 "iconLarge": "assets/ux/cherry/augments/icons/firebolt_large.png"},
                {"apiName": "Aug_Unseen", "name": "Never Persisted",
                 "iconLarge": "assets/ux/cherry/augments/icons/unseen_large.png"},
            ]
        });
        std::fs::write(&path, serde_json::to_vec(&payload).unwrap()).unwrap();
        path
    }

    fn pinned_record() -> CatalogRecord {
        let mut record = CatalogRecord::new("Aug_FireBolt", "Fire Bolt");
        record.refs.icon = PINNED.to_string();
        record
    }

    fn options(arena_file: PathBuf) -> IconRepairOptions {
        IconRepairOptions {
            arena_file,
            extra_file: None,
            ..IconRepairOptions::default()
        }
    }

    #[tokio::test]
    async fn pinned_icon_moves_to_first_reachable_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();
        store.seed(Domain::Augments, pinned_record()).await;
        let probe = FakeProbe::new([LATEST_GAME]);

        let report = repair_icons(&store, &probe, &options(write_arena_file(dir.path())))
            .await
            .unwrap();
        assert_eq!(report.matched, 1);
        assert_eq!(report.updated, 1);

        let records = store.list(Domain::Augments, true).await.unwrap();
        assert_eq!(records[0].refs.icon, LATEST_GAME);
    }

    #[tokio::test]
    async fn falls_back_to_plugins_base_when_game_base_misses() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();
        store.seed(Domain::Augments, pinned_record()).await;
        let probe = FakeProbe::new([LATEST_PLUGINS]);

        repair_icons(&store, &probe, &options(write_arena_file(dir.path())))
            .await
            .unwrap();
        let records = store.list(Domain::Augments, true).await.unwrap();
        assert_eq!(records[0].refs.icon, LATEST_PLUGINS);
    }

    #[tokio::test]
    async fn exhausted_candidates_keep_the_stored_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();
        store.seed(Domain::Augments, pinned_record()).await;
        let probe = FakeProbe::new(Vec::<String>::new());

        let report = repair_icons(&store, &probe, &options(write_arena_file(dir.path())))
            .await
            .unwrap();
        assert_eq!(report.updated, 0, "selected == current is not an update");
        let records = store.list(Domain::Augments, true).await.unwrap();
        assert_eq!(records[0].refs.icon, PINNED);
    }

    #[tokio::test]
    async fn repair_never_creates_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();
        store.seed(Domain::Augments, pinned_record()).await;
        let probe = FakeProbe::new([LATEST_GAME]);

        repair_icons(&store, &probe, &options(write_arena_file(dir.path())))
            .await
            .unwrap();
        // The arena file names Aug_Unseen too; it must not appear.
        let records = store.list(Domain::Augments, false).await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn dry_run_reports_without_persisting() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();
        store.seed(Domain::Augments, pinned_record()).await;
        let probe = FakeProbe::new([LATEST_GAME]);

        let mut opts = options(write_arena_file(dir.path()));
        opts.dry_run = true;
        let report = repair_icons(&store, &probe, &opts).await.unwrap();
        assert_eq!(report.updated, 1);
        assert!(report.dry_run);

        let records = store.list(Domain::Augments, true).await.unwrap();
        assert_eq!(records[0].refs.icon, PINNED);
    }

    #[tokio::test]
    async fn validate_off_accepts_first_well_formed_without_probing() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();
        store.seed(Domain::Augments, pinned_record()).await;
        let probe = FakeProbe::new(Vec::<String>::new());

        let mut opts = options(write_arena_file(dir.path()));
        opts.validate = false;
        repair_icons(&store, &probe, &opts).await.unwrap();

        assert!(probe.calls.lock().unwrap().is_empty(), "no probing expected");
        let records = store.list(Domain::Augments, true).await.unwrap();
        assert_eq!(records[0].refs.icon, LATEST_GAME);
    }

    #[tokio::test]
    async fn healthy_icons_are_left_alone_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();
        let mut record = pinned_record();
        record.refs.icon = LATEST_GAME.to_string();
        store.seed(Domain::Augments, record).await;
        let probe = FakeProbe::new([LATEST_PLUGINS]);

        let report = repair_icons(&store, &probe, &options(write_arena_file(dir.path())))
            .await
            .unwrap();
        assert_eq!(report.updated, 0);
        assert!(probe.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn extra_source_backfills_size_variants() {
        let dir = tempfile::tempdir().unwrap();
        let arena_file = write_arena_file(dir.path());
        let extra_file = dir.path().join("extra_icons.json");
        let small = "https://raw.communitydragon.org/latest/game/assets/ux/cherry/augments/icons/firebolt_small.png";
        std::fs::write(
            &extra_file,
            serde_json::to_vec(&json!({
                "augments": [{"nameTRA": "Fire Bolt", "augmentSmallIconPath": small}]
            }))
            .unwrap(),
        )
        .unwrap();

        let store = MemoryStore::new();
        let mut record = pinned_record();
        record.refs.icon = LATEST_GAME.to_string();
        store.seed(Domain::Augments, record).await;
        let probe = FakeProbe::new([LATEST_GAME]);

        let mut opts = options(arena_file);
        opts.extra_file = Some(extra_file);
        let report = repair_icons(&store, &probe, &opts).await.unwrap();
        assert_eq!(report.extra_total, 1);
        assert_eq!(report.updated, 1);

        let records = store.list(Domain::Augments, true).await.unwrap();
        assert_eq!(records[0].refs.icon_small, small);
        assert_eq!(records[0].refs.icon_large, LATEST_GAME);
    }
}
