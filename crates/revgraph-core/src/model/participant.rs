//! Project participants.

use super::EntityType;
use crate::containment::Contained;
use crate::record::ParticipantRecord;
use crate::resolver::Linker;
use crate::{EntityId, EntityKind, RelationDecl, RevgraphError, TypeRef};

/// A person taking part in a review, contained by its project.
#[derive(Debug, Clone)]
pub struct Participant {
    id: EntityId,
    container: Option<EntityId>,
    pub name: String,
    pub role: String,
    pub assigned_tasks: Vec<EntityId>,
}

impl Participant {
    #[must_use]
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self::with_id(EntityId::generate(), name, role)
    }

    #[must_use]
    pub fn with_id(id: EntityId, name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id,
            container: None,
            name: name.into(),
            role: role.into(),
            assigned_tasks: Vec::new(),
        }
    }
}

impl Contained for Participant {
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

impl EntityType for Participant {
    const KIND: EntityKind = EntityKind::Participant;
    const RELATIONS: &'static [RelationDecl] = &[RelationDecl::multi(
        "assigned_tasks",
        TypeRef::Concrete(EntityKind::Task),
        1,
    )];

    type Record = ParticipantRecord;

    fn related(&self, relation: &str) -> Option<Vec<EntityId>> {
        match relation {
            "assigned_tasks" => Some(self.assigned_tasks.clone()),
            _ => None,
        }
    }

    fn to_record(&self) -> ParticipantRecord {
        ParticipantRecord {
            id: self.id,
            container: self.container,
            name: self.name.clone(),
            role: self.role.clone(),
            assigned_tasks: self.assigned_tasks.clone(),
        }
    }

    fn from_record(record: &ParticipantRecord) -> Self {
        Self::with_id(record.id, record.name.clone(), record.role.clone())
    }

    fn resolve(
        &mut self,
        record: &ParticipantRecord,
        links: &Linker<'_>,
    ) -> Result<(), RevgraphError> {
        let assigned_tasks = links.multi("assigned_tasks", &record.assigned_tasks)?;

        self.container = links.container(record.container);
        self.assigned_tasks = assigned_tasks;
        Ok(())
    }
}
