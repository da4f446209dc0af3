use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// m3 - keep a modpack's mods, resource packs, texture packs and shader
/// packs in line with its lockfile
#[derive(Debug, Parser)]
#[command(name = "m3", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Directory to start looking for m3.json from (defaults to the current directory)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Install an asset and add it to the lockfile
    Add {
        /// Vendor project id or slug
        id: String,
        /// Specific file/version id (defaults to the newest)
        #[arg(long)]
        file: Option<String>,
    },
    /// Remove an asset from the project and the lockfile
    #[command(visible_aliases = ["rm", "uninstall"])]
    Remove {
        /// File name or any recorded digest of the asset
        identifier: String,
    },
    /// Apply the lockfile's state to the project asset directories
    Apply {
        /// Remove assets found in the asset directories that are not in the lockfile
        #[arg(short, long)]
        remove: bool,
    },
    /// Delete assets in the asset directories that are not in the lockfile
    Prune,
    /// Record assets already in the asset directories into the lockfile
    Freeze,
    /// Show the difference between the lockfile and the asset directories
    Diff,
    /// List the assets recorded in the lockfile
    #[command(visible_alias = "ls")]
    List {
        /// Only list one asset type (mod, resourcepack, texturepack, shaderpack)
        #[arg(short = 't', long = "type")]
        asset_type: Option<String>,
    },
}
