//! Review tasks.

use super::EntityType;
use crate::containment::{Contained, ContainmentList};
use crate::record::TaskRecord;
use crate::resolver::Linker;
use crate::{EntityId, EntityKind, RelationDecl, RevgraphError, TypeRef};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Open,
    InProgress,
    Closed,
}

/// A unit of review work inside a project.
///
/// Comments raised while working the task are owned by it
/// (`created_comments`) and point back through `Comment::created_inside`.
#[derive(Debug, Clone)]
pub struct Task {
    id: EntityId,
    container: Option<EntityId>,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub author: Option<EntityId>,
    pub assignees: Vec<EntityId>,
    pub created_comments: ContainmentList,
}

impl Task {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_id(EntityId::generate(), title)
    }

    #[must_use]
    pub fn with_id(id: EntityId, title: impl Into<String>) -> Self {
        Self {
            id,
            container: None,
            title: title.into(),
            description: String::new(),
            status: TaskStatus::Open,
            author: None,
            assignees: Vec::new(),
            created_comments: ContainmentList::new(id),
        }
    }
}

impl Contained for Task {
    fn id(&self) -> EntityId {
        self.id
    }

    fn container(&self) -> Option<EntityId> {
        self.container
    }

    fn set_container(&mut self, container: Option<EntityId>) {
        self.container = container;
    }
}

impl EntityType for Task {
    const KIND: EntityKind = EntityKind::Task;
    const RELATIONS: &'static [RelationDecl] = &[
        RelationDecl::single("author", TypeRef::Concrete(EntityKind::Participant), 1),
        RelationDecl::multi("assignees", TypeRef::Concrete(EntityKind::Participant), 1),
        RelationDecl::contains(
            "created_comments",
            TypeRef::Concrete(EntityKind::Comment),
            0,
        ),
    ];

    type Record = TaskRecord;

    fn related(&self, relation: &str) -> Option<Vec<EntityId>> {
        match relation {
            "author" => Some(self.author.into_iter().collect()),
            "assignees" => Some(self.assignees.clone()),
            "created_comments" => Some(self.created_comments.ids().to_vec()),
            _ => None,
        }
    }

    fn containment_mut(&mut self, relation: &str) -> Option<&mut ContainmentList> {
        match relation {
            "created_comments" => Some(&mut self.created_comments),
            _ => None,
        }
    }

    fn to_record(&self) -> TaskRecord {
        TaskRecord {
            id: self.id,
            container: self.container,
            title: self.title.clone(),
            description: self.description.clone(),
            status: self.status,
            author: self.author,
            assignees: self.assignees.clone(),
            created_comments: self.created_comments.ids().to_vec(),
        }
    }

    fn from_record(record: &TaskRecord) -> Self {
        let mut task = Self::with_id(record.id, record.title.clone());
        task.description = record.description.clone();
        task.status = record.status;
        task
    }

    fn resolve(&mut self, record: &TaskRecord, links: &Linker<'_>) -> Result<(), RevgraphError> {
        let author = links.single("author", record.author)?;
        let assignees = links.multi("assignees", &record.assignees)?;
        let comments = links.multi("created_comments", &record.created_comments)?;

        self.container = links.container(record.container);
        self.author = author;
        self.assignees = assignees;
        self.created_comments.restore(comments);
        Ok(())
    }
}
