mod category;
mod digest;
mod key;
mod record;

pub use category::{AssetCategory, CategoryInfo, Platform, Side};
pub use digest::DigestSet;
pub use key::{asset_multikey, multikey_file_name, AssetKey};
pub use record::AssetRecord;
