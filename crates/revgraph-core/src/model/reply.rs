//! Replies to annotations.

use super::EntityType;
use crate::containment::Contained;
use crate::record::ReplyRecord;
use crate::resolver::Linker;
use crate::{Category, EntityId, EntityKind, RelationDecl, RevgraphError, TypeRef};

/// An answer in a discussion thread.
///
/// Contained by the comment it answers (`Comment::replies`); `reply_to`
/// may name any annotation.
#[derive(Debug, Clone)]
pub struct Reply {
    id: EntityId,
    container: Option<EntityId>,
    pub content: String,
    pub author: Option<EntityId>,
    pub reply_to: Option<EntityId>,
}

impl Reply {
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
            author: None,
            reply_to: None,
        }
    }
}

impl Contained for Reply {
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

impl EntityType for Reply {
    const KIND: EntityKind = EntityKind::Reply;
    const RELATIONS: &'static [RelationDecl] = &[
        RelationDecl::single("author", TypeRef::Concrete(EntityKind::Participant), 1),
        RelationDecl::single("reply_to", TypeRef::Abstract(Category::Annotation), 0),
    ];

    type Record = ReplyRecord;

    fn related(&self, relation: &str) -> Option<Vec<EntityId>> {
        match relation {
            "author" => Some(self.author.into_iter().collect()),
            "reply_to" => Some(self.reply_to.into_iter().collect()),
            _ => None,
        }
    }

    fn to_record(&self) -> ReplyRecord {
        ReplyRecord {
            id: self.id,
            container: self.container,
            content: self.content.clone(),
            author: self.author,
            reply_to: self.reply_to,
        }
    }

    fn from_record(record: &ReplyRecord) -> Self {
        Self::with_id(record.id, record.content.clone())
    }

    fn resolve(&mut self, record: &ReplyRecord, links: &Linker<'_>) -> Result<(), RevgraphError> {
        let author = links.single("author", record.author)?;
        let reply_to = links.single("reply_to", record.reply_to)?;

        self.container = links.container(record.container);
        self.author = author;
        self.reply_to = reply_to;
        Ok(())
    }
}
