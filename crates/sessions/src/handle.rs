use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-request session identity, passed explicitly through every stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionHandle {
    /// Time-derived, collision-resistant within and across processes.
    pub id: String,
    pub started_at: DateTime<Utc>,
}

impl SessionHandle {
    /// Mint a fresh handle. The id reads chronologically in a directory
    /// listing; the uuid tail keeps concurrent requests distinct.
    pub fn new() -> Self {
        let started_at = Utc::now();
        let tail = uuid::Uuid::new_v4().simple().to_string();
        let id = format!("{}-{}", started_at.format("%Y%m%d-%H%M%S"), &tail[..8]);
        Self { id, started_at }
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_across_rapid_creation() {
        let handles: Vec<SessionHandle> = (0..100).map(|_| SessionHandle::new()).collect();
        let mut ids: Vec<&str> = handles.iter().map(|h| h.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn id_starts_with_timestamp_prefix() {
        let handle = SessionHandle::new();
        let prefix = handle.started_at.format("%Y%m%d-%H%M%S").to_string();
        assert!(handle.id.starts_with(&prefix));
    }
}
