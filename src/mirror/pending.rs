use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PendingKind {
    CreateCourse,
    ReplaceFields { fields: Vec<&'static str> },
    CreateTask,
    MoveTask,
    DeleteTask,
}

/// An optimistic mutation that has been applied locally and sent to the
/// remote store, but not yet confirmed or rejected.
#[derive(Debug, Clone, Serialize)]
pub struct PendingOperation {
    pub id: Uuid,
    pub target_id: String,
    #[serde(flatten)]
    pub kind: PendingKind,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct PendingLedger {
    ops: BTreeMap<Uuid, PendingOperation>,
}

impl PendingLedger {
    pub fn begin(&mut self, target_id: &str, kind: PendingKind) -> Uuid {
        let id = Uuid::new_v4();
        self.ops.insert(
            id,
            PendingOperation {
                id,
                target_id: target_id.to_string(),
                kind,
                issued_at: Utc::now(),
            },
        );
        id
    }

    /// Removes the operation once the remote store has answered either way.
    pub fn settle(&mut self, id: Uuid) -> Option<PendingOperation> {
        self.ops.remove(&id)
    }

    pub fn list(&self) -> Vec<PendingOperation> {
        let mut ops: Vec<PendingOperation> = self.ops.values().cloned().collect();
        ops.sort_by_key(|op| op.issued_at);
        ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}
