//! Client-side cache of banned cover locations, kept loosely synchronized
//! with a remote authority on a TTL basis and continuously reconciled
//! against a live, mutating document model. The embedding host owns
//! bootstrap and rendering; it drives a [`page::PageModel`], raises
//! [`CoverCommand`]s, and runs a [`GuardSession`] per document context.

pub mod commands;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod infrastructure;
pub mod observer;
pub mod page;
pub mod session;
pub mod sync;

pub use commands::CoverCommand;
pub use session::GuardSession;
