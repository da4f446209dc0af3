use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use super::report::{ApplyReport, AssetFailure, CategoryDiff, DiffReport, FreezeReport};
use crate::core::asset::{multikey_file_name, AssetCategory, AssetKey, AssetRecord, Platform};
use crate::core::downloader::Fetch;
use crate::core::error::{M3Error, M3Result};
use crate::core::index::{MultiKey, MultiKeyIndex};
use crate::core::lockfile::{Lockfile, LockfileEntry};
use crate::core::project::ProjectLayout;
use crate::core::scanner::DirectoryStateScanner;
use crate::core::transaction::AtomicApplyTransaction;

/// Knobs for [`ReconciliationEngine::apply`].
#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    /// Delete files on disk that the lockfile does not declare.
    pub remove: bool,
    /// Restrict installs to these file names.
    pub only: Option<BTreeSet<String>>,
}

impl ApplyOptions {
    pub fn with_remove(remove: bool) -> Self {
        Self { remove, only: None }
    }

    pub fn only(file_names: impl IntoIterator<Item = String>) -> Self {
        Self {
            remove: false,
            only: Some(file_names.into_iter().collect()),
        }
    }

    fn wants(&self, file_name: &str) -> bool {
        self.only
            .as_ref()
            .map_or(true, |only| only.contains(file_name))
    }
}

enum InstallOutcome {
    Downloaded(LockfileEntry),
    AlreadyPresent(LockfileEntry),
}

/// Brings category directories in line with the lockfile.
pub struct ReconciliationEngine<'a> {
    layout: &'a ProjectLayout,
    lockfile: &'a mut Lockfile,
    scanner: DirectoryStateScanner,
    concurrency: usize,
}

impl<'a> ReconciliationEngine<'a> {
    pub fn new(layout: &'a ProjectLayout, lockfile: &'a mut Lockfile) -> Self {
        Self {
            layout,
            lockfile,
            scanner: DirectoryStateScanner::new(),
            concurrency: 1,
        }
    }

    /// Allow up to `n` downloads in flight within one category.
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn lockfile(&self) -> &Lockfile {
        self.lockfile
    }

    pub fn diff(&self) -> M3Result<DiffReport> {
        diff_project(self.layout, self.lockfile, &self.scanner)
    }

    /// Record a new entry. Its file name and known digests must not already
    /// identify another entry.
    pub fn add(&mut self, entry: LockfileEntry) -> M3Result<()> {
        if self.lockfile.contains(entry.file_name()) {
            return Err(M3Error::IdentityConflict(entry.file_name().to_string()));
        }
        let index = self.lockfile.identity_index()?;
        for (algorithm, hex) in entry.hashes.iter() {
            if let Some(owner) = index.get(&AssetKey::Digest(algorithm, hex.to_string())) {
                return Err(M3Error::IdentityConflict(format!(
                    "{} ({} {} is already recorded for {})",
                    entry.file_name(),
                    algorithm,
                    hex,
                    owner
                )));
            }
        }
        info!("Adding {} to lockfile", entry.file_name());
        self.lockfile.add(entry)
    }

    /// Remove the entry identified by file name or any known digest, and
    /// delete its file if it is installed.
    pub fn remove(&mut self, identifier: &str) -> M3Result<LockfileEntry> {
        let (file_name, category) = self
            .lockfile
            .find(identifier)?
            .map(|entry| (entry.file_name().to_string(), entry.asset.category))
            .ok_or_else(|| M3Error::NotFound(identifier.to_string()))?;

        if self.layout.dir(category).join(&file_name).exists() {
            let txn = AtomicApplyTransaction::begin(self.layout, &[category])?;
            if let Some(staged) = txn.staged_dir(category) {
                let path = staged.join(&file_name);
                std::fs::remove_file(&path).map_err(|e| M3Error::io(&path, e))?;
            }
            txn.commit()?;
            info!("Uninstalled {}", file_name);
        }

        self.lockfile.remove(&file_name)
    }

    /// Install missing assets, and with `remove` delete undeclared ones, all
    /// inside one staged transaction.
    ///
    /// Failures of single assets are collected in the report; only staging
    /// and swap failures abort the run.
    pub async fn apply(&mut self, fetcher: &dyn Fetch, options: ApplyOptions) -> M3Result<ApplyReport> {
        let categories = self.categories_for(&options);
        let txn = AtomicApplyTransaction::begin(self.layout, &categories)?;
        let mut report = ApplyReport::default();

        for category in categories {
            let Some(staged) = txn.staged_dir(category) else {
                continue;
            };
            self.apply_category(category, staged, fetcher, &options, &mut report)
                .await?;
        }

        txn.commit()?;
        info!(
            "Applied lockfile: {} installed, {} verified, {} removed, {} failed",
            report.installed.len(),
            report.verified.len(),
            report.removed.len(),
            report.failures.len()
        );
        Ok(report)
    }

    fn categories_for(&self, options: &ApplyOptions) -> Vec<AssetCategory> {
        match &options.only {
            None => AssetCategory::ALL.to_vec(),
            Some(only) => {
                let wanted: BTreeSet<AssetCategory> = only
                    .iter()
                    .filter_map(|name| self.lockfile.get(name))
                    .map(|entry| entry.asset.category)
                    .collect();
                wanted.into_iter().collect()
            }
        }
    }

    async fn apply_category(
        &mut self,
        category: AssetCategory,
        staged: &Path,
        fetcher: &dyn Fetch,
        options: &ApplyOptions,
        report: &mut ApplyReport,
    ) -> M3Result<()> {
        let disk = self.scanner.scan_dir(staged)?;
        for failure in disk.failures {
            report
                .failures
                .push(AssetFailure::from_path(category, &failure.path, failure.error));
        }

        let declared = self.lockfile.index_for(category)?;
        let missing = sorted_file_names(declared.difference(&disk.index));

        if options.remove && options.only.is_none() {
            self.remove_extras(category, &disk.index, &declared, report);
        }

        let queue: Vec<LockfileEntry> = missing
            .iter()
            .filter(|name| options.wants(name))
            .filter_map(|name| self.lockfile.get(name).cloned())
            .collect();
        if queue.is_empty() {
            return Ok(());
        }
        info!("Installing {} {} assets", queue.len(), category);

        let results: Vec<_> = stream::iter(queue)
            .map(|entry| {
                let dest = staged.join(entry.file_name());
                async move {
                    let file_name = entry.file_name().to_string();
                    (file_name, install_one(fetcher, entry, dest).await)
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for (file_name, result) in results {
            match result {
                Err(error) if !error.is_per_asset() => return Err(error),
                Ok(outcome) => {
                    let (entry, list) = match outcome {
                        InstallOutcome::Downloaded(entry) => (entry, &mut report.installed),
                        InstallOutcome::AlreadyPresent(entry) => (entry, &mut report.verified),
                    };
                    if let Some(locked) = self.lockfile.get_mut(&file_name) {
                        locked.hashes.merge_missing(&entry.hashes);
                    }
                    list.push((category, file_name));
                }
                Err(error) => {
                    warn!("Failed to install {}: {}", file_name, error);
                    report
                        .failures
                        .push(AssetFailure::new(category, file_name, error));
                }
            }
        }

        report.installed.sort();
        report.verified.sort();
        report.failures.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(())
    }

    /// Delete files of the staged `category` that the lockfile does not
    /// declare. A file whose name is declared is left to the install step,
    /// which keeps it if it verifies and replaces it otherwise.
    fn remove_extras(
        &self,
        category: AssetCategory,
        disk: &MultiKeyIndex<AssetKey, PathBuf>,
        declared: &MultiKeyIndex<AssetKey, String>,
        report: &mut ApplyReport,
    ) {
        let mut extra: Vec<_> = disk.difference(declared).into_iter().collect();
        extra.sort();
        for multikey in extra {
            let Some(path) = disk.get_by_multikey(&multikey) else {
                continue;
            };
            let file_name = multikey_file_name(&multikey).unwrap_or_default().to_string();
            if self
                .lockfile
                .get(&file_name)
                .is_some_and(|entry| entry.asset.category == category)
            {
                continue;
            }
            match std::fs::remove_file(path) {
                Ok(()) => {
                    debug!("Removed undeclared {:?}", path);
                    report.removed.push((category, file_name));
                }
                Err(e) => report
                    .failures
                    .push(AssetFailure::new(category, file_name, M3Error::io(path, e))),
            }
        }
    }

    /// Delete every undeclared file from every category, installing nothing.
    pub fn prune(&mut self) -> M3Result<ApplyReport> {
        let txn = AtomicApplyTransaction::begin(self.layout, &AssetCategory::ALL)?;
        let mut report = ApplyReport::default();

        for category in AssetCategory::ALL {
            let Some(staged) = txn.staged_dir(category) else {
                continue;
            };
            let disk = self.scanner.scan_dir(staged)?;
            for failure in disk.failures {
                report
                    .failures
                    .push(AssetFailure::from_path(category, &failure.path, failure.error));
            }
            let declared = self.lockfile.index_for(category)?;
            self.remove_extras(category, &disk.index, &declared, &mut report);
        }

        txn.commit()?;
        info!("Pruned {} undeclared assets", report.removed.len());
        Ok(report)
    }

    /// Record every asset file found on disk that the lockfile does not know
    /// yet. Entries are hashed from the file; their display name is unknown
    /// and they carry no download url.
    pub fn freeze(&mut self, platform: Platform) -> M3Result<FreezeReport> {
        let mut report = FreezeReport::default();
        for (category, disk) in self.scanner.scan(self.layout)? {
            for failure in disk.failures {
                report
                    .failures
                    .push(AssetFailure::from_path(category, &failure.path, failure.error));
            }

            let mut found: Vec<(&MultiKey<AssetKey>, &PathBuf)> = disk.index.iter().collect();
            found.sort();
            for (multikey, path) in found {
                let Some(file_name) = multikey_file_name(multikey) else {
                    continue;
                };
                if self.lockfile.contains(file_name) {
                    continue;
                }
                let id = Path::new(file_name)
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().to_string())
                    .unwrap_or_else(|| file_name.to_string());
                let asset = AssetRecord::new(id, file_name, category, platform, "");
                let recorded =
                    LockfileEntry::from_file(asset, path).and_then(|entry| self.add(entry));
                match recorded {
                    Ok(()) => report.recorded.push((category, file_name.to_string())),
                    Err(error) => report
                        .failures
                        .push(AssetFailure::new(category, file_name, error)),
                }
            }
        }
        info!("Froze {} assets into the lockfile", report.recorded.len());
        Ok(report)
    }
}

/// Read-only comparison of the lockfile with the live category directories.
pub fn diff_project(
    layout: &ProjectLayout,
    lockfile: &Lockfile,
    scanner: &DirectoryStateScanner,
) -> M3Result<DiffReport> {
    let mut report = DiffReport::default();
    for category in AssetCategory::ALL {
        let disk = scanner.scan_dir(layout.dir(category))?;
        let declared = lockfile.index_for(category)?;

        let diff = CategoryDiff {
            missing: sorted_file_names(declared.difference(&disk.index)),
            extra: sorted_file_names(disk.index.difference(&declared)),
        };
        for failure in disk.failures {
            report
                .failures
                .push(AssetFailure::from_path(category, &failure.path, failure.error));
        }
        report.categories.push((category, diff));
    }
    Ok(report)
}

fn sorted_file_names(multikeys: HashSet<MultiKey<AssetKey>>) -> Vec<String> {
    let mut names: Vec<String> = multikeys
        .iter()
        .filter_map(|multikey| multikey_file_name(multikey).map(str::to_string))
        .collect();
    names.sort();
    names
}

/// Run digest work off the async workers so it does not stall downloads
/// in flight.
async fn run_blocking<T, F>(work: F) -> M3Result<T>
where
    F: FnOnce() -> M3Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}

/// Download one asset into the staged directory, verify it, and backfill
/// its digests. A file that fails is deleted before the error is returned.
async fn install_one(
    fetcher: &dyn Fetch,
    entry: LockfileEntry,
    dest: PathBuf,
) -> M3Result<InstallOutcome> {
    let present_dest = dest.clone();
    let (entry, present) = run_blocking(move || {
        let mut entry = entry;
        if present_dest.is_file() && entry.verify(&present_dest).unwrap_or(false) {
            entry.populate_missing(&present_dest)?;
            return Ok((entry, true));
        }
        Ok((entry, false))
    })
    .await?;
    if present {
        debug!("{} already present, digests backfilled", entry.file_name());
        return Ok(InstallOutcome::AlreadyPresent(entry));
    }

    let installed = async {
        fetcher.fetch(&entry.asset.download_url, &dest).await?;
        let check_dest = dest.clone();
        run_blocking(move || {
            let mut entry = entry;
            entry.check_integrity(&check_dest)?;
            entry.populate_missing(&check_dest)?;
            Ok(entry)
        })
        .await
    }
    .await;

    match installed {
        Ok(entry) => {
            info!("Installed {}", entry.file_name());
            Ok(InstallOutcome::Downloaded(entry))
        }
        Err(error) => {
            if let Err(e) = std::fs::remove_file(&dest) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Could not delete failed download {:?}: {}", dest, e);
                }
            }
            Err(error)
        }
    }
}
