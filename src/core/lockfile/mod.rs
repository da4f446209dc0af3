mod entry;
mod store;

pub use entry::LockfileEntry;
pub use store::{Lockfile, LOCKFILE_FILENAME};
