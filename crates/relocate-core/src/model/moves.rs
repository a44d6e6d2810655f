//! Move value type (collaborator boundary with persistence)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a move as stored by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MoveStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

/// A user's move from one stored address to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Move {
    pub id: String,
    pub user_id: String,
    pub from_address_id: String,
    pub to_address_id: String,
    pub move_date: DateTime<Utc>,
    pub status: MoveStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Move {
    /// Create a pending move with a generated id
    pub fn new(
        user_id: impl Into<String>,
        from_address_id: impl Into<String>,
        to_address_id: impl Into<String>,
        move_date: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            from_address_id: from_address_id.into(),
            to_address_id: to_address_id.into(),
            move_date,
            status: MoveStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a new status, bumping `updated_at` when it changes
    pub fn set_status(&mut self, status: MoveStatus) {
        if self.status != status {
            self.status = status;
            self.updated_at = Utc::now();
        }
    }
}
