mod multikey;

pub use multikey::{MultiKey, MultiKeyIndex};
