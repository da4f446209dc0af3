use std::path::Path;

use tracing::info;

use super::{ProjectConfig, ProjectLayout};
use crate::core::error::M3Result;
use crate::core::lockfile::Lockfile;

/// Config and lockfile of one project, held for a single command.
///
/// The lockfile is written once, by [`ProjectSession::finish`], and only if
/// something borrowed it mutably.
#[derive(Debug)]
pub struct ProjectSession {
    layout: ProjectLayout,
    config: ProjectConfig,
    lockfile: Lockfile,
    dirty: bool,
}

impl ProjectSession {
    /// Open the project rooted at `root`. A missing lockfile starts empty.
    pub fn open(root: &Path) -> M3Result<Self> {
        let config = ProjectConfig::load(&root.join(super::CONFIG_FILENAME))?;
        let layout = ProjectLayout::new(root, &config.paths)?;
        let lockfile = Lockfile::load(&layout.lockfile_path())?.unwrap_or_default();

        info!(
            "Opened project '{}' with {} locked assets",
            config.name,
            lockfile.len()
        );
        Ok(Self {
            layout,
            config,
            lockfile,
            dirty: false,
        })
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn lockfile(&self) -> &Lockfile {
        &self.lockfile
    }

    /// Split borrow for the reconciliation engine.
    pub fn parts_mut(&mut self) -> (&ProjectLayout, &mut Lockfile) {
        self.dirty = true;
        (&self.layout, &mut self.lockfile)
    }

    /// Persist the lockfile if it may have changed.
    pub fn finish(mut self) -> M3Result<()> {
        if self.dirty {
            self.lockfile.save(&self.layout.lockfile_path())?;
        }
        Ok(())
    }
}
