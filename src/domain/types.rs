use std::collections::HashMap;

/// Persisted membership map: presence of a location means "banned".
/// Stored as a JSON object, which is why this is a map rather than a set.
pub type BanMap = HashMap<String, bool>;

/// Persisted membership map of explicitly exempted locations. Takes
/// precedence over bulk merges from the remote authority, but not over a
/// direct ban command.
pub type AllowMap = HashMap<String, bool>;

/// Epoch milliseconds of the last successful remote refresh.
pub type EpochMillis = i64;
