pub mod location;
pub mod types;

pub use location::{is_cover_location, paired_forms};
pub use types::{AllowMap, BanMap, EpochMillis};
