//! # Session Backup Store
//!
//! Point-in-time snapshots of session-critical state with SHA-256 payload
//! checksums. Backups are created on demand or ahead of risky operations,
//! consulted during session recovery, and pruned after a retention window.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::types::{BackupKind, RecoveryError, Result};

/// Session-critical state captured in one backup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackupPayload {
    /// Narrative/session state
    #[serde(default)]
    pub session_state: serde_json::Map<String, serde_json::Value>,
    /// Therapeutic progress markers
    #[serde(default)]
    pub therapeutic_progress: serde_json::Map<String, serde_json::Value>,
    /// Character development state
    #[serde(default)]
    pub character_development: serde_json::Map<String, serde_json::Value>,
    /// User preferences
    #[serde(default)]
    pub user_preferences: serde_json::Map<String, serde_json::Value>,
}

/// One checksummed snapshot owned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemBackup {
    /// Unique backup id
    pub id: Uuid,
    /// When the backup was taken
    pub timestamp: DateTime<Utc>,
    /// Kind of snapshot
    pub backup_type: BackupKind,
    /// Owning user
    pub user_id: String,
    /// Owning session
    pub session_id: String,
    /// The captured state
    pub payload: BackupPayload,
    /// Hex SHA-256 over the serialized payload
    pub checksum: String,
    /// False once the backup is known bad
    pub is_valid: bool,
    /// Set when an integrity check has failed for this backup
    pub corruption_detected: bool,
}

/// Computes the hex SHA-256 digest of the serialized payload.
///
/// `serde_json::Map` keeps keys sorted, so serialization is canonical and
/// the digest is stable across recomputations.
pub fn payload_checksum(payload: &BackupPayload) -> Result<String> {
    let bytes = serde_json::to_vec(payload)?;
    let digest = Sha256::digest(&bytes);
    Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
}

/// In-memory backup store. The recovery manager owns the only handle; no
/// external writer mutates a stored backup in place.
#[derive(Debug, Default)]
pub struct BackupStore {
    backups: HashMap<Uuid, SystemBackup>,
}

impl BackupStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds, checksums and stores a new backup, returning a copy.
    pub fn create(
        &mut self,
        user_id: &str,
        session_id: &str,
        backup_type: BackupKind,
        payload: BackupPayload,
    ) -> Result<SystemBackup> {
        let checksum = payload_checksum(&payload)?;
        let backup = SystemBackup {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            backup_type,
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            payload,
            checksum,
            is_valid: true,
            corruption_detected: false,
        };

        debug!(
            backup_id = %backup.id,
            session_id = %session_id,
            backup_type = %backup_type,
            "System backup created"
        );

        self.backups.insert(backup.id, backup.clone());
        Ok(backup)
    }

    /// Looks up a backup by id.
    pub fn get(&self, id: &Uuid) -> Option<&SystemBackup> {
        self.backups.get(id)
    }

    /// Most recent backup for a session, by timestamp.
    pub fn latest_for_session(&self, session_id: &str) -> Option<&SystemBackup> {
        self.backups
            .values()
            .filter(|b| b.session_id == session_id)
            .max_by_key(|b| b.timestamp)
    }

    /// Recomputes the payload checksum and compares it with the stored one.
    ///
    /// A mismatch marks the stored backup corrupted so later lookups see the
    /// flag even if the caller ignores the error.
    pub fn verify_integrity(&mut self, id: &Uuid) -> Result<()> {
        let backup = self
            .backups
            .get_mut(id)
            .ok_or(RecoveryError::BackupNotFound(*id))?;

        if !backup.is_valid {
            return Err(RecoveryError::BackupCorrupted(*id));
        }

        let recomputed = payload_checksum(&backup.payload)?;
        if recomputed != backup.checksum {
            backup.is_valid = false;
            backup.corruption_detected = true;
            warn!(backup_id = %id, "Backup checksum mismatch");
            return Err(RecoveryError::BackupCorrupted(*id));
        }

        Ok(())
    }

    /// Drops backups older than the retention window, returning how many
    /// were removed. Runs best-effort on every create.
    pub fn prune_expired(&mut self, retention: Duration) -> usize {
        let cutoff = Utc::now() - retention;
        let before = self.backups.len();
        self.backups.retain(|_, b| b.timestamp > cutoff);
        let removed = before - self.backups.len();

        if removed > 0 {
            debug!(removed = removed, "Pruned expired backups");
        }

        removed
    }

    /// Number of stored backups.
    pub fn len(&self) -> usize {
        self.backups.len()
    }

    /// True when the store holds nothing.
    pub fn is_empty(&self) -> bool {
        self.backups.is_empty()
    }

    /// Test-only mutable access for simulating on-disk corruption.
    #[cfg(test)]
    pub(crate) fn get_mut(&mut self, id: &Uuid) -> Option<&mut SystemBackup> {
        self.backups.get_mut(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_payload() -> BackupPayload {
        let mut payload = BackupPayload::default();
        payload
            .session_state
            .insert("scene".to_string(), json!("village_square"));
        payload
            .therapeutic_progress
            .insert("sessions_completed".to_string(), json!(4));
        payload
    }

    #[test]
    fn test_create_and_verify_roundtrip() {
        let mut store = BackupStore::new();
        let backup = store
            .create("user-1", "session-1", BackupKind::Full, sample_payload())
            .unwrap();

        assert!(store.verify_integrity(&backup.id).is_ok());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_checksum_is_stable() {
        let payload = sample_payload();
        let a = payload_checksum(&payload).unwrap();
        let b = payload_checksum(&payload).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_tampered_payload_fails_verification() {
        let mut store = BackupStore::new();
        let backup = store
            .create("user-1", "session-1", BackupKind::Full, sample_payload())
            .unwrap();

        // Mutate the stored payload without recomputing the checksum
        store
            .get_mut(&backup.id)
            .unwrap()
            .payload
            .session_state
            .insert("scene".to_string(), json!("tampered"));

        let err = store.verify_integrity(&backup.id).unwrap_err();
        assert!(matches!(err, RecoveryError::BackupCorrupted(_)));

        // The stored entry now carries the corruption flags
        let stored = store.get(&backup.id).unwrap();
        assert!(stored.corruption_detected);
        assert!(!stored.is_valid);
    }

    #[test]
    fn test_missing_backup_is_not_found() {
        let mut store = BackupStore::new();
        let err = store.verify_integrity(&Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, RecoveryError::BackupNotFound(_)));
    }

    #[test]
    fn test_latest_for_session_picks_newest() {
        let mut store = BackupStore::new();
        let first = store
            .create("user-1", "session-1", BackupKind::Full, sample_payload())
            .unwrap();
        let second = store
            .create("user-1", "session-1", BackupKind::Incremental, sample_payload())
            .unwrap();
        store
            .create("user-1", "other-session", BackupKind::Full, sample_payload())
            .unwrap();

        // Force a strict ordering between the two candidates
        store.get_mut(&second.id).unwrap().timestamp =
            first.timestamp + Duration::seconds(10);

        let latest = store.latest_for_session("session-1").unwrap();
        assert_eq!(latest.id, second.id);
    }

    #[test]
    fn test_prune_removes_only_expired() {
        let mut store = BackupStore::new();
        let old = store
            .create("user-1", "session-1", BackupKind::Full, sample_payload())
            .unwrap();
        store
            .create("user-1", "session-1", BackupKind::Full, sample_payload())
            .unwrap();

        store.get_mut(&old.id).unwrap().timestamp = Utc::now() - Duration::days(45);

        let removed = store.prune_expired(Duration::days(30));
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        assert!(store.get(&old.id).is_none());
    }
}
