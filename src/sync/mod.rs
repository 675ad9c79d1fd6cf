pub mod authority;
pub mod refresh;
pub mod schedule;

pub use authority::{build_http_client, BanAuthority, RemoteClient};
pub use refresh::Syncer;
pub use schedule::configure_refresh_jobs;
