// ABOUTME: Core sync orchestration for fetching and mirroring pages
// ABOUTME: Bounded-concurrency fan-out, change detection via ledger, watch loop

use crate::api::ApiClient;
use crate::config::{Config, SyncTarget, TargetKind};
use crate::convert;
use crate::properties::extract_title;
use crate::storage::{self, PageState, SyncState};
use crate::util::{resolve_slug_conflict, slugify};
use crate::{Error, Result};
use futures_util::future::join_all;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::collections::HashSet;
use std::path::{Component, Path};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// In-flight page limit per target; bounds pressure on the remote API while
/// still overlapping network latency.
const CONCURRENCY: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub target: String,
    pub updated: usize,
    pub skipped: usize,
    pub errors: usize,
}

enum ItemOutcome {
    Updated,
    Skipped,
    Failed,
}

/// The server-side query filter uses the oldest edit time in the ledger as
/// a single low-water mark. Pages unmodified since then are still returned
/// and re-checked locally, trading redundant listing for correctness.
fn oldest_edit_time(state: &SyncState) -> Option<String> {
    state
        .values()
        .map(|entry| entry.last_edited_time.as_str())
        .min()
        .map(str::to_string)
}

fn guard_target_name(name: &str) -> Result<()> {
    let path = Path::new(name);
    let escapes = path.is_absolute()
        || path
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
    if escapes {
        return Err(Error::Sync(format!(
            "Invalid target name: \"{}\" escapes output directory",
            name
        )));
    }
    Ok(())
}

async fn process_page(
    client: &ApiClient,
    page: &crate::model::Page,
    output_dir: &Path,
    state: &Mutex<SyncState>,
    used_slugs: &Mutex<HashSet<String>>,
) -> Result<Option<String>> {
    {
        let state = state.lock().await;
        if !storage::is_page_changed(&state, &page.id, &page.last_edited_time) {
            return Ok(None);
        }
    }

    let title = extract_title(&page.properties);
    let slug = {
        let mut used = used_slugs.lock().await;
        let mut slug = slugify(&title, &page.id);
        if used.contains(&slug) {
            slug = resolve_slug_conflict(&slug, &page.id);
        }
        used.insert(slug.clone());
        slug
    };

    let file_path = output_dir.join(&slug);
    let markdown = convert::page_to_markdown(client, page).await?;
    storage::write_markdown(&file_path, &markdown).await?;

    // Ledger entry only after the write landed; a failed attempt must not
    // advance the recorded edit time.
    {
        let mut state = state.lock().await;
        state.insert(
            page.id.clone(),
            PageState {
                last_edited_time: page.last_edited_time.clone(),
                local_path: file_path.to_string_lossy().into_owned(),
            },
        );
    }

    Ok(Some(slug))
}

pub async fn sync_target(
    client: &ApiClient,
    config: &Config,
    target: &SyncTarget,
    state: &Mutex<SyncState>,
) -> Result<SyncReport> {
    guard_target_name(&target.name)?;

    let output_dir = config.output_dir.join(&target.name);
    storage::ensure_dir(&config.output_dir).await?;
    storage::ensure_dir(&output_dir).await?;

    info!("Syncing \"{}\" ({}: {})", target.name, target.kind, target.id);

    let pages = match target.kind {
        TargetKind::Database => {
            let watermark = {
                let state = state.lock().await;
                oldest_edit_time(&state)
            };
            client
                .query_database(&target.id, watermark.as_deref())
                .await?
        }
        TargetKind::Page => vec![client.get_page(&target.id).await?],
    };

    info!("Found {} pages in \"{}\"", pages.len(), target.name);

    let pb = ProgressBar::new(pages.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40}] {pos}/{len} pages")
            .unwrap()
            .progress_chars("##-"),
    );

    let used_slugs = Mutex::new(HashSet::new());
    let output_dir_ref = &output_dir;
    let used_slugs_ref = &used_slugs;
    let pb_ref = &pb;

    let outcomes: Vec<ItemOutcome> = futures_util::stream::iter(pages.iter().map(|page| {
        async move {
            let outcome =
                match process_page(client, page, output_dir_ref, state, used_slugs_ref).await {
                    Ok(Some(slug)) => {
                        pb_ref.println(format!("  ✓ {}", slug));
                        ItemOutcome::Updated
                    }
                    Ok(None) => ItemOutcome::Skipped,
                    Err(err) => {
                        error!("Failed to sync page {}: {}", page.id, err);
                        ItemOutcome::Failed
                    }
                };
            pb_ref.inc(1);
            outcome
        }
    }))
    .buffer_unordered(CONCURRENCY)
    .collect()
    .await;

    pb.finish_and_clear();

    let mut report = SyncReport {
        target: target.name.clone(),
        updated: 0,
        skipped: 0,
        errors: 0,
    };
    for outcome in outcomes {
        match outcome {
            ItemOutcome::Updated => report.updated += 1,
            ItemOutcome::Skipped => report.skipped += 1,
            ItemOutcome::Failed => report.errors += 1,
        }
    }

    Ok(report)
}

/// Run one full pass over the configured targets (optionally a single named
/// target). The ledger is loaded once, shared by all targets, and saved
/// once at the end; a crash mid-pass only costs idempotent re-writes.
pub async fn sync_all(
    client: &ApiClient,
    config: &Config,
    only: Option<&str>,
) -> Result<Vec<SyncReport>> {
    let targets: Vec<&SyncTarget> = match only {
        Some(name) => config.targets.iter().filter(|t| t.name == name).collect(),
        None => config.targets.iter().collect(),
    };

    if targets.is_empty() {
        if let Some(name) = only {
            warn!("No target named \"{}\" found in config.", name);
        } else {
            warn!("No sync targets configured.");
        }
        return Ok(Vec::new());
    }

    let state = Mutex::new(storage::load_state(&config.output_dir));

    let reports = join_all(targets.iter().map(|target| {
        let state = &state;
        async move {
            match sync_target(client, config, target, state).await {
                Ok(report) => report,
                Err(err) => {
                    error!("Target \"{}\" failed: {}", target.name, err);
                    SyncReport {
                        target: target.name.clone(),
                        updated: 0,
                        skipped: 0,
                        errors: 1,
                    }
                }
            }
        }
    }))
    .await;

    let state = state.into_inner();
    storage::save_state(&config.output_dir, &state)?;

    for report in &reports {
        info!(
            "\"{}\": {} updated, {} skipped, {} errors",
            report.target, report.updated, report.skipped, report.errors
        );
    }

    Ok(reports)
}

pub fn print_summary(reports: &[SyncReport]) {
    let (updated, skipped, errors) = reports.iter().fold((0, 0, 0), |acc, r| {
        (acc.0 + r.updated, acc.1 + r.skipped, acc.2 + r.errors)
    });
    info!("Done: {} updated, {} skipped, {} errors", updated, skipped, errors);
}

/// Repeat full sync passes until cancelled. Scheduling is sequential: the
/// next pass starts one interval after the previous pass finishes. The
/// token is checked between passes, never mid-pass.
pub async fn run_watch(
    client: &ApiClient,
    config: &Config,
    interval: Duration,
    shutdown: CancellationToken,
) -> Result<()> {
    info!(
        "Watch mode started. Syncing every {}s. Press Ctrl+C to stop.",
        interval.as_secs()
    );

    loop {
        match sync_all(client, config, None).await {
            Ok(reports) if !reports.is_empty() => print_summary(&reports),
            Ok(_) => {}
            Err(err) => error!("Sync error: {}", err),
        }

        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Watch mode stopped.");
                return Ok(());
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(time: &str) -> PageState {
        PageState {
            last_edited_time: time.into(),
            local_path: "/out/x.md".into(),
        }
    }

    #[test]
    fn test_oldest_edit_time_empty() {
        assert_eq!(oldest_edit_time(&SyncState::new()), None);
    }

    #[test]
    fn test_oldest_edit_time_picks_minimum() {
        let mut state = SyncState::new();
        state.insert("a".into(), entry("2024-03-01T00:00:00.000Z"));
        state.insert("b".into(), entry("2024-01-01T00:00:00.000Z"));
        state.insert("c".into(), entry("2024-02-01T00:00:00.000Z"));
        assert_eq!(
            oldest_edit_time(&state).as_deref(),
            Some("2024-01-01T00:00:00.000Z")
        );
    }

    #[test]
    fn test_guard_target_name() {
        assert!(guard_target_name("notes").is_ok());
        assert!(guard_target_name("team/meeting-notes").is_ok());
        assert!(guard_target_name("../escape").is_err());
        assert!(guard_target_name("/absolute").is_err());
        assert!(guard_target_name("a/../../b").is_err());
    }

    #[test]
    fn test_guard_target_name_error_kind() {
        let err = guard_target_name("../escape").unwrap_err();
        assert!(matches!(err, Error::Sync(_)));
    }
}
