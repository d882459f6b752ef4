use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Schema tag written into every sync-state file.
pub const SYNC_STATE_VERSION: &str = "1.0";

/// Process-wide checkpoint persisted between runs.
///
/// `version` is carried through untouched; nothing reads it for migrations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub last_sync_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_cursor: Option<String>,
    pub total_servers: usize,
    pub last_full_sync_at: DateTime<Utc>,
    pub version: String,
}

impl SyncState {
    /// State after a run that finished at `now`.
    ///
    /// `lastFullSyncAt` only moves forward on full runs; the first run is
    /// always full so a missing previous state takes `now`.
    pub fn after_run(
        previous: Option<&SyncState>,
        now: DateTime<Utc>,
        was_full: bool,
        total_servers: usize,
    ) -> Self {
        let last_full_sync_at = match previous {
            Some(prev) if !was_full => prev.last_full_sync_at,
            _ => now,
        };

        Self {
            last_sync_at: now,
            last_cursor: None,
            total_servers,
            last_full_sync_at,
            version: previous
                .map(|p| p.version.clone())
                .unwrap_or_else(|| SYNC_STATE_VERSION.to_string()),
        }
    }
}
