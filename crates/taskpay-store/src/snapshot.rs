//! Serializable image of a whole store
//!
//! Used to seed a [`crate::MemoryStore`] and to persist it between CLI runs.

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use taskpay_core::{
    Campaign, CreditTransaction, Notification, Redemption, Referral, Submission, Task, TaskId,
    User, UserId,
};

/// A settled `(user, task)` pair
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub user_id: UserId,
    pub task_id: TaskId,
}

/// Every record of a store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub users: Vec<User>,
    pub tasks: Vec<Task>,
    pub campaigns: Vec<Campaign>,
    pub referrals: Vec<Referral>,
    pub transactions: Vec<CreditTransaction>,
    pub completions: Vec<CompletionRecord>,
    pub submissions: Vec<Submission>,
    pub redemptions: Vec<Redemption>,
    pub notifications: Vec<Notification>,
}

impl Snapshot {
    /// Parse a JSON snapshot
    ///
    /// # Errors
    /// `StoreError::Encoding` on malformed JSON
    pub fn from_json(source: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(source)?)
    }

    /// Pretty-printed JSON
    ///
    /// # Errors
    /// `StoreError::Encoding` if a record fails to serialize
    pub fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a JSON snapshot file
    ///
    /// # Errors
    /// `StoreError::Io` or `StoreError::Encoding`
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| io_error(path, source))?;
        Self::from_json(&source)
    }

    /// Write a JSON snapshot file
    ///
    /// # Errors
    /// `StoreError::Io` or `StoreError::Encoding`
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|source| io_error(path, source))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskpay_core::RewardType;

    #[test]
    fn missing_sections_default_to_empty() {
        let snapshot = Snapshot::from_json(
            r#"{"tasks":[{"id":"t1","title":"Login","reward_type":"credits","reward_amount":5}]}"#,
        )
        .unwrap();
        assert!(snapshot.users.is_empty());
        assert_eq!(snapshot.tasks[0].reward_type, RewardType::Credits);
    }

    #[test]
    fn save_then_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let snapshot = Snapshot {
            users: vec![User::new(UserId::from("u1"), "Bola")],
            ..Snapshot::default()
        };

        snapshot.save(&path).unwrap();
        assert_eq!(Snapshot::load(&path).unwrap(), snapshot);
    }

    #[test]
    fn malformed_json_is_encoding_error() {
        assert!(matches!(Snapshot::from_json("{"), Err(StoreError::Encoding(_))));
    }
}
