//! # Transfer Records
//!
//! The flat, wire-ready projection of each entity. Scalars are held by value;
//! every relation, including the container back-reference, is held as an
//! identifier or a list of identifiers. A record never embeds another record.
//!
//! Records are serde types; the transport picks the format (the app uses
//! JSON, `formats::persistence` uses postcard). The enum is externally tagged
//! so it round-trips through non-self-describing formats as well.

use crate::model::TaskStatus;
use crate::{EntityId, EntityKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: EntityId,
    #[serde(default)]
    pub container: Option<EntityId>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub participants: Vec<EntityId>,
    #[serde(default)]
    pub tasks: Vec<EntityId>,
    #[serde(default)]
    pub annotations: Vec<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRecord {
    pub id: EntityId,
    #[serde(default)]
    pub container: Option<EntityId>,
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub assigned_tasks: Vec<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: EntityId,
    #[serde(default)]
    pub container: Option<EntityId>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub author: Option<EntityId>,
    #[serde(default)]
    pub assignees: Vec<EntityId>,
    #[serde(default)]
    pub created_comments: Vec<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: EntityId,
    #[serde(default)]
    pub container: Option<EntityId>,
    pub content: String,
    /// Creation time, milliseconds since the Unix epoch.
    #[serde(default)]
    pub created_on: i64,
    #[serde(default)]
    pub author: Option<EntityId>,
    #[serde(default)]
    pub created_inside: Option<EntityId>,
    #[serde(default)]
    pub replies: Vec<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub id: EntityId,
    #[serde(default)]
    pub container: Option<EntityId>,
    pub content: String,
    #[serde(default)]
    pub resolved: bool,
    #[serde(default)]
    pub author: Option<EntityId>,
    #[serde(default)]
    pub subject: Option<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyRecord {
    pub id: EntityId,
    #[serde(default)]
    pub container: Option<EntityId>,
    pub content: String,
    #[serde(default)]
    pub author: Option<EntityId>,
    #[serde(default)]
    pub reply_to: Option<EntityId>,
}

// =============================================================================
// TRANSFER RECORD
// =============================================================================

/// One projected entity, tagged with its concrete type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferRecord {
    Project(ProjectRecord),
    Participant(ParticipantRecord),
    Task(TaskRecord),
    Comment(CommentRecord),
    Note(NoteRecord),
    Reply(ReplyRecord),
}

impl TransferRecord {
    /// The type tag the record declares.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            TransferRecord::Project(_) => EntityKind::Project,
            TransferRecord::Participant(_) => EntityKind::Participant,
            TransferRecord::Task(_) => EntityKind::Task,
            TransferRecord::Comment(_) => EntityKind::Comment,
            TransferRecord::Note(_) => EntityKind::Note,
            TransferRecord::Reply(_) => EntityKind::Reply,
        }
    }

    /// Identifier copied from the projected entity.
    #[must_use]
    pub fn id(&self) -> EntityId {
        match self {
            TransferRecord::Project(r) => r.id,
            TransferRecord::Participant(r) => r.id,
            TransferRecord::Task(r) => r.id,
            TransferRecord::Comment(r) => r.id,
            TransferRecord::Note(r) => r.id,
            TransferRecord::Reply(r) => r.id,
        }
    }

    /// Container back-reference copied from the projected entity.
    #[must_use]
    pub fn container(&self) -> Option<EntityId> {
        match self {
            TransferRecord::Project(r) => r.container,
            TransferRecord::Participant(r) => r.container,
            TransferRecord::Task(r) => r.container,
            TransferRecord::Comment(r) => r.container,
            TransferRecord::Note(r) => r.container,
            TransferRecord::Reply(r) => r.container,
        }
    }

    /// Every relation target the record names, container excluded.
    #[must_use]
    pub fn references(&self) -> Vec<EntityId> {
        match self {
            TransferRecord::Project(r) => r
                .participants
                .iter()
                .chain(&r.tasks)
                .chain(&r.annotations)
                .copied()
                .collect(),
            TransferRecord::Participant(r) => r.assigned_tasks.clone(),
            TransferRecord::Task(r) => r
                .author
                .iter()
                .chain(&r.assignees)
                .chain(&r.created_comments)
                .copied()
                .collect(),
            TransferRecord::Comment(r) => r
                .author
                .iter()
                .chain(&r.created_inside)
                .chain(&r.replies)
                .copied()
                .collect(),
            TransferRecord::Note(r) => r.author.iter().chain(&r.subject).copied().collect(),
            TransferRecord::Reply(r) => r.author.iter().chain(&r.reply_to).copied().collect(),
        }
    }
}

impl From<ProjectRecord> for TransferRecord {
    fn from(record: ProjectRecord) -> Self {
        TransferRecord::Project(record)
    }
}

impl From<ParticipantRecord> for TransferRecord {
    fn from(record: ParticipantRecord) -> Self {
        TransferRecord::Participant(record)
    }
}

impl From<TaskRecord> for TransferRecord {
    fn from(record: TaskRecord) -> Self {
        TransferRecord::Task(record)
    }
}

impl From<CommentRecord> for TransferRecord {
    fn from(record: CommentRecord) -> Self {
        TransferRecord::Comment(record)
    }
}

impl From<NoteRecord> for TransferRecord {
    fn from(record: NoteRecord) -> Self {
        TransferRecord::Note(record)
    }
}

impl From<ReplyRecord> for TransferRecord {
    fn from(record: ReplyRecord) -> Self {
        TransferRecord::Reply(record)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_tag_is_snake_case_kind() {
        let record = TransferRecord::from(ReplyRecord {
            id: EntityId::from_u128(7),
            container: None,
            content: "agreed".to_string(),
            author: None,
            reply_to: Some(EntityId::from_u128(3)),
        });

        let json = serde_json::to_value(&record).expect("serialize");
        assert!(json.get("reply").is_some());
        assert_eq!(
            json["reply"]["reply_to"],
            serde_json::json!(EntityId::from_u128(3).to_string())
        );
    }

    #[test]
    fn missing_relation_fields_default_to_empty() {
        let id = EntityId::from_u128(1);
        let json = serde_json::json!({
            "task": { "id": id.to_string(), "title": "Check mass budget" }
        });

        let record: TransferRecord = serde_json::from_value(json).expect("deserialize");
        let TransferRecord::Task(task) = record else {
            unreachable!("expected a task record");
        };
        assert_eq!(task.id, id);
        assert!(task.author.is_none());
        assert!(task.created_comments.is_empty());
        assert_eq!(task.status, TaskStatus::Open);
    }

    #[test]
    fn accessors_follow_variant() {
        let record = TransferRecord::from(NoteRecord {
            id: EntityId::from_u128(5),
            container: Some(EntityId::from_u128(9)),
            content: "check units".to_string(),
            resolved: false,
            author: None,
            subject: None,
        });
        assert_eq!(record.kind(), EntityKind::Note);
        assert_eq!(record.id(), EntityId::from_u128(5));
        assert_eq!(record.container(), Some(EntityId::from_u128(9)));
    }

    #[test]
    fn references_skip_container() {
        let author = EntityId::from_u128(2);
        let comment = EntityId::from_u128(3);
        let record = TransferRecord::from(TaskRecord {
            id: EntityId::from_u128(1),
            container: Some(EntityId::from_u128(9)),
            title: "Check".to_string(),
            description: String::new(),
            status: TaskStatus::Open,
            author: Some(author),
            assignees: vec![author],
            created_comments: vec![comment],
        });
        assert_eq!(record.references(), vec![author, author, comment]);
    }
}
