//! Annotations: the two concrete implementers of `Category::Annotation`.
//!
//! A `Comment` is raised inside a task and collects replies; a `Note` is a
//! lighter remark that may point at another annotation (`subject`).

use super::EntityType;
use crate::containment::{Contained, ContainmentList};
use crate::record::{CommentRecord, NoteRecord};
use crate::resolver::Linker;
use crate::{Category, EntityId, EntityKind, RelationDecl, RevgraphError, TypeRef};

// =============================================================================
// COMMENT
// =============================================================================

#[derive(Debug, Clone)]
pub struct Comment {
    id: EntityId,
    container: Option<EntityId>,
    pub content: String,
    /// Milliseconds since the Unix epoch.
    pub created_on: i64,
    pub author: Option<EntityId>,
    /// The task this comment was raised in. Back-reference of
    /// `Task::created_comments`.
    pub created_inside: Option<EntityId>,
    pub replies: ContainmentList,
}

impl Comment {
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self::with_id(EntityId::generate(), content)
    }

    #[must_use]
    pub fn with_id(id: EntityId, content: impl Into<String>) -> Self {
        Self {
            id,
            container: None,
            content: content.into(),
            created_on: 0,
            author: None,
            created_inside: None,
            replies: ContainmentList::new(id),
        }
    }
}

impl Contained for Comment {
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

impl EntityType for Comment {
    const KIND: EntityKind = EntityKind::Comment;
    const RELATIONS: &'static [RelationDecl] = &[
        RelationDecl::single("author", TypeRef::Concrete(EntityKind::Participant), 1),
        RelationDecl::single("created_inside", TypeRef::Concrete(EntityKind::Task), 0),
        RelationDecl::contains("replies", TypeRef::Concrete(EntityKind::Reply), 1),
    ];

    type Record = CommentRecord;

    fn related(&self, relation: &str) -> Option<Vec<EntityId>> {
        match relation {
            "author" => Some(self.author.into_iter().collect()),
            "created_inside" => Some(self.created_inside.into_iter().collect()),
            "replies" => Some(self.replies.ids().to_vec()),
            _ => None,
        }
    }

    fn containment_mut(&mut self, relation: &str) -> Option<&mut ContainmentList> {
        match relation {
            "replies" => Some(&mut self.replies),
            _ => None,
        }
    }

    fn to_record(&self) -> CommentRecord {
        CommentRecord {
            id: self.id,
            container: self.container,
            content: self.content.clone(),
            created_on: self.created_on,
            author: self.author,
            created_inside: self.created_inside,
            replies: self.replies.ids().to_vec(),
        }
    }

    fn from_record(record: &CommentRecord) -> Self {
        let mut comment = Self::with_id(record.id, record.content.clone());
        comment.created_on = record.created_on;
        comment
    }

    fn resolve(
        &mut self,
        record: &CommentRecord,
        links: &Linker<'_>,
    ) -> Result<(), RevgraphError> {
        let author = links.single("author", record.author)?;
        let created_inside = links.single("created_inside", record.created_inside)?;
        let replies = links.multi("replies", &record.replies)?;

        self.container = links.container(record.container);
        self.author = author;
        self.created_inside = created_inside;
        self.replies.restore(replies);
        Ok(())
    }
}

// =============================================================================
// NOTE
// =============================================================================

#[derive(Debug, Clone)]
pub struct Note {
    id: EntityId,
    container: Option<EntityId>,
    pub content: String,
    pub resolved: bool,
    pub author: Option<EntityId>,
    /// The annotation this note remarks on, comment or note.
    pub subject: Option<EntityId>,
}

impl Note {
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self::with_id(EntityId::generate(), content)
    }

    #[must_use]
    pub fn with_id(id: EntityId, content: impl Into<String>) -> Self {
        Self {
            id,
            container: None,
            content: content.into(),
            resolved: false,
            author: None,
            subject: None,
        }
    }
}

impl Contained for Note {
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

impl EntityType for Note {
    const KIND: EntityKind = EntityKind::Note;
    const RELATIONS: &'static [RelationDecl] = &[
        RelationDecl::single("author", TypeRef::Concrete(EntityKind::Participant), 1),
        RelationDecl::single("subject", TypeRef::Abstract(Category::Annotation), 1),
    ];

    type Record = NoteRecord;

    fn related(&self, relation: &str) -> Option<Vec<EntityId>> {
        match relation {
            "author" => Some(self.author.into_iter().collect()),
            "subject" => Some(self.subject.into_iter().collect()),
            _ => None,
        }
    }

    fn to_record(&self) -> NoteRecord {
        NoteRecord {
            id: self.id,
            container: self.container,
            content: self.content.clone(),
            resolved: self.resolved,
            author: self.author,
            subject: self.subject,
        }
    }

    fn from_record(record: &NoteRecord) -> Self {
        let mut note = Self::with_id(record.id, record.content.clone());
        note.resolved = record.resolved;
        note
    }

    fn resolve(&mut self, record: &NoteRecord, links: &Linker<'_>) -> Result<(), RevgraphError> {
        let author = links.single("author", record.author)?;
        let subject = links.single("subject", record.subject)?;

        self.container = links.container(record.container);
        self.author = author;
        self.subject = subject;
        Ok(())
    }
}
