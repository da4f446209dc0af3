// ─── m3 Core ───
// Lockfile-driven management of a modpack's assets.
//
// Architecture:
//   core/
//     index/       Multi-key record index (one value, many identities)
//     hashing/     Streaming file digests + directory digest index
//     asset/       Categories, digest sets, asset records and keys
//     lockfile/    Lockfile entries + the m3.lock.json store
//     project/     m3.json config, layout and per-command session
//     scanner      On-disk state of the category directories
//     transaction  Staged category directories swapped in on commit
//     reconcile/   Diff and apply of lockfile against disk
//     downloader/  Streaming downloads behind the Fetch trait
//     metadata/    Vendor metadata (Modrinth) into lockfile entries

pub mod asset;
pub mod downloader;
pub mod error;
pub mod hashing;
pub mod http;
pub mod index;
pub mod lockfile;
pub mod metadata;
pub mod project;
pub mod reconcile;
pub mod scanner;
pub mod transaction;
