use std::fmt::Write as _;
use std::path::Path;

use tracing::{info, warn};

use crate::core::asset::AssetCategory;
use crate::core::downloader::Fetch;
use crate::core::error::{M3Error, M3Result};
use crate::core::lockfile::Lockfile;
use crate::core::metadata::{entry_from_metadata, MetadataSource};
use crate::core::project::ProjectSession;
use crate::core::reconcile::{
    diff_project, ApplyOptions, ApplyReport, DiffReport, FreezeReport, ReconciliationEngine,
};
use crate::core::scanner::DirectoryStateScanner;

/// Text a command prints on stdout, and whether it fully succeeded.
#[derive(Debug)]
pub struct CommandOutput {
    pub text: String,
    pub success: bool,
}

impl CommandOutput {
    fn ok(text: String) -> Self {
        Self { text, success: true }
    }
}

// ─── add ───

/// Resolve `id` through `source`, install the file and record it.
///
/// Nothing is persisted unless the asset installs and verifies.
pub async fn add_asset(
    root: &Path,
    source: &dyn MetadataSource,
    fetcher: &dyn Fetch,
    concurrency: usize,
    id: &str,
    file_id: Option<&str>,
) -> M3Result<CommandOutput> {
    let mut session = ProjectSession::open(root)?;

    let project = source.project_metadata(id).await?;
    let file = source.file_metadata(&project.id, file_id).await?;
    let entry = entry_from_metadata(source.platform(), &project, &file)?;

    let file_name = entry.file_name().to_string();
    let display_name = entry.asset.display_name().to_string();
    let category = entry.asset.category;
    let dependencies = entry.asset.dependencies.clone();

    let (layout, lockfile) = session.parts_mut();
    let mut engine = ReconciliationEngine::new(layout, lockfile).with_concurrency(concurrency);
    engine.add(entry)?;
    let mut report = engine
        .apply(fetcher, ApplyOptions::only([file_name.clone()]))
        .await?;

    if let Some(pos) = report.failures.iter().position(|f| f.file_name == file_name) {
        // Dropping the session discards the in-memory entry.
        return Err(report.failures.swap_remove(pos).error);
    }
    session.finish()?;

    let mut text = format!("Installed {display_name} ({file_name}) as {category}\n");
    if !dependencies.is_empty() {
        let _ = writeln!(text, "Requires: {}", dependencies.join(", "));
    }
    Ok(CommandOutput::ok(text))
}

// ─── remove ───

pub fn remove_asset(root: &Path, identifier: &str) -> M3Result<CommandOutput> {
    let mut session = ProjectSession::open(root)?;
    let (layout, lockfile) = session.parts_mut();
    let removed = ReconciliationEngine::new(layout, lockfile).remove(identifier)?;
    session.finish()?;

    Ok(CommandOutput::ok(format!(
        "Uninstalled {} ({})\n",
        removed.asset.display_name(),
        removed.file_name()
    )))
}

// ─── apply ───

pub async fn apply_lockfile(
    root: &Path,
    fetcher: &dyn Fetch,
    concurrency: usize,
    remove: bool,
) -> M3Result<CommandOutput> {
    let mut session = ProjectSession::open(root)?;
    let (layout, lockfile) = session.parts_mut();
    let report = ReconciliationEngine::new(layout, lockfile)
        .with_concurrency(concurrency)
        .apply(fetcher, ApplyOptions::with_remove(remove))
        .await?;
    // Digests backfilled for the assets that did install are kept even
    // when others failed.
    session.finish()?;

    if !report.is_success() {
        warn!("{} assets failed to apply", report.failures.len());
    }
    Ok(CommandOutput {
        success: report.is_success(),
        text: format_apply(&report),
    })
}

pub fn format_apply(report: &ApplyReport) -> String {
    let mut out = String::new();
    for (category, name) in &report.removed {
        let _ = writeln!(out, "Removed {name} ({category})");
    }
    for (category, name) in &report.installed {
        let _ = writeln!(out, "Installed {name} ({category})");
    }
    if !report.failures.is_empty() {
        out.push_str("\nFailed:\n");
        for failure in &report.failures {
            let _ = writeln!(
                out,
                "  ! {} ({}): {}",
                failure.file_name, failure.category, failure.error
            );
        }
    }
    let _ = writeln!(
        out,
        "{} installed, {} already up to date, {} removed, {} failed",
        report.installed.len(),
        report.verified.len(),
        report.removed.len(),
        report.failures.len()
    );
    out
}

// ─── prune ───

pub fn prune_assets(root: &Path) -> M3Result<CommandOutput> {
    let mut session = ProjectSession::open(root)?;
    let (layout, lockfile) = session.parts_mut();
    let report = ReconciliationEngine::new(layout, lockfile).prune()?;
    session.finish()?;

    Ok(CommandOutput {
        success: report.is_success(),
        text: format_apply(&report),
    })
}

// ─── freeze ───

/// Record assets installed by other tools into the lockfile.
pub fn freeze_assets(root: &Path) -> M3Result<CommandOutput> {
    let mut session = ProjectSession::open(root)?;
    let platform = session.config().platform;
    let (layout, lockfile) = session.parts_mut();
    let report = ReconciliationEngine::new(layout, lockfile).freeze(platform)?;
    session.finish()?;

    Ok(CommandOutput {
        success: report.failures.is_empty(),
        text: format_freeze(&report),
    })
}

pub fn format_freeze(report: &FreezeReport) -> String {
    let mut out = String::new();
    for (category, name) in &report.recorded {
        let _ = writeln!(out, "Recorded {name} ({})", category.label());
    }
    for failure in &report.failures {
        let _ = writeln!(
            out,
            "  ! {} ({}): {}",
            failure.file_name,
            failure.category.label(),
            failure.error
        );
    }
    let _ = writeln!(
        out,
        "{} recorded, {} failed",
        report.recorded.len(),
        report.failures.len()
    );
    out
}

// ─── diff ───

pub fn diff_assets(root: &Path) -> M3Result<CommandOutput> {
    let session = ProjectSession::open(root)?;
    let report = diff_project(
        session.layout(),
        session.lockfile(),
        &DirectoryStateScanner::new(),
    )?;
    info!("Diff computed, clean: {}", report.is_clean());
    Ok(CommandOutput {
        success: report.failures.is_empty(),
        text: format_diff(&report),
    })
}

pub fn format_diff(report: &DiffReport) -> String {
    if report.is_clean() {
        return "Asset Diff\n\nEverything is up to date.\n".to_string();
    }

    let mut out = String::from("Asset Diff\n");
    let missing: Vec<&str> = report.missing().collect();
    if !missing.is_empty() {
        out.push_str("\nLockfile assets missing:\n");
        for name in missing {
            let _ = writeln!(out, "  - {name}");
        }
    }
    let extra: Vec<&str> = report.extra().collect();
    if !extra.is_empty() {
        out.push_str("\nNew assets found:\n");
        for name in extra {
            let _ = writeln!(out, "  + {name}");
        }
    }
    if !report.failures.is_empty() {
        out.push_str("\nUnreadable files:\n");
        for failure in &report.failures {
            let _ = writeln!(out, "  ! {}: {}", failure.file_name, failure.error);
        }
    }
    out
}

// ─── list ───

pub fn list_assets(root: &Path, asset_type: Option<&str>) -> M3Result<CommandOutput> {
    let filter = asset_type
        .map(str::parse::<AssetCategory>)
        .transpose()?;
    let session = ProjectSession::open(root)?;
    Ok(CommandOutput::ok(format_list(session.lockfile(), filter)))
}

pub fn format_list(lockfile: &Lockfile, filter: Option<AssetCategory>) -> String {
    let mut rows: Vec<[String; 3]> = lockfile
        .entries()
        .filter(|entry| filter.map_or(true, |c| entry.asset.category == c))
        .map(|entry| {
            [
                entry.asset.display_name().to_string(),
                entry.asset.category.label().to_string(),
                entry.asset.platform.to_string(),
            ]
        })
        .collect();
    if rows.is_empty() {
        return "No assets installed.\n".to_string();
    }
    rows.sort();

    let header = ["NAME", "TYPE", "SOURCE"];
    let mut widths = header.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let mut push_row = |cells: [&str; 3]| {
        let _ = writeln!(
            out,
            "{:<w0$}  {:<w1$}  {}",
            cells[0],
            cells[1],
            cells[2],
            w0 = widths[0],
            w1 = widths[1]
        );
    };
    push_row(header);
    for row in &rows {
        push_row([row[0].as_str(), row[1].as_str(), row[2].as_str()]);
    }
    out
}

/// Error line printed on stderr before exiting with status 1.
pub fn describe_error(error: &M3Error) -> String {
    match error {
        M3Error::ProjectNotFound(start) => format!(
            "error: no m3.json found in {} or any parent directory",
            start.display()
        ),
        other => format!("error: {other}"),
    }
}
