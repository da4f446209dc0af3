use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::core::asset::AssetCategory;
use crate::core::error::{M3Error, M3Result};
use crate::core::project::ProjectLayout;

const STAGING_PREFIX: &str = ".m3-staging-";

#[derive(Debug)]
struct StagedDir {
    live: PathBuf,
    staged: PathBuf,
}

/// Stage-then-swap guard over the live category directories.
///
/// `begin` copies each live directory into a temporary root inside the
/// project. All mutation happens on those copies; `commit` swaps them in
/// one category at a time. Dropping the transaction without committing
/// removes the staging root and leaves the live tree as it was.
///
/// A swap failure part way through does not roll back categories that were
/// already swapped.
#[derive(Debug)]
pub struct AtomicApplyTransaction {
    root: TempDir,
    staged: BTreeMap<AssetCategory, StagedDir>,
}

impl AtomicApplyTransaction {
    /// Stage a full copy of every listed category directory.
    pub fn begin(layout: &ProjectLayout, categories: &[AssetCategory]) -> M3Result<Self> {
        let root = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(layout.root())
            .map_err(|e| M3Error::staging(layout.root(), e))?;

        let mut staged = BTreeMap::new();
        for &category in categories {
            let live = layout.dir(category).to_path_buf();
            let target = root.path().join(category.dir_name());

            fs::create_dir_all(&target).map_err(|e| M3Error::staging(&target, e))?;
            if live.exists() {
                copy_dir_recursive(&live, &target).map_err(|e| M3Error::staging(&live, e))?;
            }
            debug!("Staged {:?} at {:?}", live, target);
            staged.insert(category, StagedDir { live, staged: target });
        }

        info!("Staged {} asset directories", staged.len());
        Ok(Self { root, staged })
    }

    /// The staged copy of `category`, if it is part of this transaction.
    pub fn staged_dir(&self, category: AssetCategory) -> Option<&Path> {
        self.staged.get(&category).map(|dir| dir.staged.as_path())
    }

    /// Replace every live directory with its staged counterpart.
    pub fn commit(self) -> M3Result<()> {
        for (category, dir) in &self.staged {
            let backup = self.root.path().join(format!("{}.previous", category.dir_name()));
            swap_dir(&dir.live, &dir.staged, &backup)?;
            debug!("Committed {:?}", dir.live);
        }
        info!("Committed {} asset directories", self.staged.len());
        Ok(())
    }

    /// Drop the staged copies without touching the live tree.
    pub fn discard(self) {
        debug!("Discarding staging root {:?}", self.root.path());
    }
}

/// Move `staged` into the place of `live`, keeping the old contents in
/// `backup` until the move has succeeded.
fn swap_dir(live: &Path, staged: &Path, backup: &Path) -> M3Result<()> {
    let mut backed_up = false;
    if live.exists() {
        match fs::rename(live, backup) {
            Ok(()) => backed_up = true,
            Err(e) => {
                // Live dir sits on another filesystem than the staging root.
                debug!("Cannot move {:?} aside ({}), deleting instead", live, e);
                fs::remove_dir_all(live).map_err(|e| M3Error::swap(live, e))?;
            }
        }
    } else if let Some(parent) = live.parent() {
        fs::create_dir_all(parent).map_err(|e| M3Error::swap(parent, e))?;
    }

    let moved = fs::rename(staged, live).or_else(|_| copy_dir_recursive(staged, live));
    if let Err(e) = moved {
        if backed_up {
            if let Err(cleanup) = fs::remove_dir_all(live) {
                warn!("Could not clear partial swap at {:?}: {}", live, cleanup);
            }
            if let Err(restore) = fs::rename(backup, live) {
                warn!("Could not restore {:?} from {:?}: {}", live, backup, restore);
            }
        }
        return Err(M3Error::swap(live, e));
    }
    Ok(())
}

fn copy_dir_recursive(source: &Path, destination: &Path) -> std::io::Result<()> {
    fs::create_dir_all(destination)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = destination.join(entry.file_name());
        let metadata = fs::metadata(&src_path)?;

        if metadata.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else if metadata.is_file() {
            fs::copy(&src_path, &dst_path)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::TransactionStage;
    use crate::core::project::ProjectPaths;

    fn layout_with_mods(files: &[(&str, &str)]) -> (TempDir, ProjectLayout) {
        let dir = tempfile::tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path(), &ProjectPaths::default()).unwrap();
        let mods = layout.dir(AssetCategory::Mod);
        std::fs::create_dir_all(mods.join("config")).unwrap();
        for (name, contents) in files {
            std::fs::write(mods.join(name), contents).unwrap();
        }
        (dir, layout)
    }

    #[test]
    fn staging_copies_recursively() {
        let (_dir, layout) = layout_with_mods(&[("a.jar", "a"), ("config/x.toml", "x")]);
        let txn = AtomicApplyTransaction::begin(&layout, &[AssetCategory::Mod]).unwrap();

        let staged = txn.staged_dir(AssetCategory::Mod).unwrap();
        assert_eq!(std::fs::read(staged.join("a.jar")).unwrap(), b"a");
        assert_eq!(std::fs::read(staged.join("config/x.toml")).unwrap(), b"x");
        assert!(txn.staged_dir(AssetCategory::ShaderPack).is_none());
    }

    #[test]
    fn discard_leaves_live_untouched() {
        let (_dir, layout) = layout_with_mods(&[("a.jar", "a")]);
        let txn = AtomicApplyTransaction::begin(&layout, &[AssetCategory::Mod]).unwrap();
        let staged = txn.staged_dir(AssetCategory::Mod).unwrap().to_path_buf();
        std::fs::remove_file(staged.join("a.jar")).unwrap();
        std::fs::write(staged.join("b.jar"), b"b").unwrap();
        txn.discard();

        let mods = layout.dir(AssetCategory::Mod);
        assert_eq!(std::fs::read(mods.join("a.jar")).unwrap(), b"a");
        assert!(!mods.join("b.jar").exists());
        assert!(!staged.exists());
    }

    #[test]
    fn commit_swaps_staged_contents_in() {
        let (_dir, layout) = layout_with_mods(&[("a.jar", "a")]);
        let txn = AtomicApplyTransaction::begin(&layout, &[AssetCategory::Mod]).unwrap();
        let staged = txn.staged_dir(AssetCategory::Mod).unwrap().to_path_buf();
        std::fs::remove_file(staged.join("a.jar")).unwrap();
        std::fs::write(staged.join("b.jar"), b"b").unwrap();
        txn.commit().unwrap();

        let mods = layout.dir(AssetCategory::Mod);
        assert!(!mods.join("a.jar").exists());
        assert_eq!(std::fs::read(mods.join("b.jar")).unwrap(), b"b");
        assert!(mods.join("config").is_dir());
    }

    #[test]
    fn commit_creates_missing_live_dir() {
        let (_dir, layout) = layout_with_mods(&[]);
        let txn = AtomicApplyTransaction::begin(&layout, &[AssetCategory::ShaderPack]).unwrap();
        let staged = txn.staged_dir(AssetCategory::ShaderPack).unwrap().to_path_buf();
        std::fs::write(staged.join("s.zip"), b"s").unwrap();
        txn.commit().unwrap();

        assert!(layout.dir(AssetCategory::ShaderPack).join("s.zip").is_file());
    }

    #[test]
    fn staging_failure_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path(), &ProjectPaths::default()).unwrap();
        std::fs::create_dir_all(layout.dir(AssetCategory::Mod)).unwrap();
        std::fs::write(layout.dir(AssetCategory::Mod).join("a.jar"), b"a").unwrap();
        // A regular file where a directory is expected cannot be staged.
        std::fs::write(layout.dir(AssetCategory::ResourcePack), b"not a dir").unwrap();

        let err = AtomicApplyTransaction::begin(
            &layout,
            &[AssetCategory::Mod, AssetCategory::ResourcePack],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            M3Error::Transaction {
                stage: TransactionStage::Staging,
                ..
            }
        ));
        assert_eq!(
            std::fs::read(layout.dir(AssetCategory::Mod).join("a.jar")).unwrap(),
            b"a"
        );
        assert_eq!(
            std::fs::read(layout.dir(AssetCategory::ResourcePack)).unwrap(),
            b"not a dir"
        );
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(STAGING_PREFIX))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn swap_failure_keeps_earlier_swaps_and_restores_its_own() {
        let (_dir, layout) = layout_with_mods(&[("a.jar", "a")]);
        let packs = layout.dir(AssetCategory::ResourcePack).to_path_buf();
        let shaders = layout.dir(AssetCategory::ShaderPack).to_path_buf();
        std::fs::create_dir_all(&packs).unwrap();
        std::fs::write(packs.join("p.zip"), "p").unwrap();
        std::fs::create_dir_all(&shaders).unwrap();
        std::fs::write(shaders.join("s.zip"), "s").unwrap();

        let txn = AtomicApplyTransaction::begin(
            &layout,
            &[AssetCategory::Mod, AssetCategory::ResourcePack, AssetCategory::ShaderPack],
        )
        .unwrap();
        let staged_mods = txn.staged_dir(AssetCategory::Mod).unwrap().to_path_buf();
        std::fs::write(staged_mods.join("b.jar"), "b").unwrap();
        // Resource packs swap second; with their staged copy gone the swap
        // cannot complete.
        std::fs::remove_dir_all(txn.staged_dir(AssetCategory::ResourcePack).unwrap()).unwrap();
        let staged_shaders = txn.staged_dir(AssetCategory::ShaderPack).unwrap().to_path_buf();
        std::fs::remove_file(staged_shaders.join("s.zip")).unwrap();

        let err = txn.commit().unwrap_err();
        assert!(matches!(
            err,
            M3Error::Transaction {
                stage: TransactionStage::Swap,
                ..
            }
        ));

        let mods = layout.dir(AssetCategory::Mod);
        assert!(mods.join("b.jar").is_file());
        assert!(mods.join("a.jar").is_file());
        assert_eq!(std::fs::read(packs.join("p.zip")).unwrap(), b"p");
        assert_eq!(std::fs::read(shaders.join("s.zip")).unwrap(), b"s");
    }
}
