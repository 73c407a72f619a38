//! Review projects: the root of every containment tree.

use super::EntityType;
use crate::containment::{Contained, ContainmentList};
use crate::record::ProjectRecord;
use crate::resolver::Linker;
use crate::{Category, EntityId, EntityKind, RelationDecl, RevgraphError, TypeRef};

/// A model under review, owning its participants, tasks and free annotations.
#[derive(Debug, Clone)]
pub struct Project {
    id: EntityId,
    container: Option<EntityId>,
    pub name: String,
    pub description: String,
    pub participants: ContainmentList,
    pub tasks: ContainmentList,
    pub annotations: ContainmentList,
}

impl Project {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(EntityId::generate(), name)
    }

    #[must_use]
    pub fn with_id(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            container: None,
            name: name.into(),
            description: String::new(),
            participants: ContainmentList::new(id),
            tasks: ContainmentList::new(id),
            annotations: ContainmentList::new(id),
        }
    }
}

impl Contained for Project {
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

impl EntityType for Project {
    const KIND: EntityKind = EntityKind::Project;
    const RELATIONS: &'static [RelationDecl] = &[
        RelationDecl::contains(
            "participants",
            TypeRef::Concrete(EntityKind::Participant),
            0,
        ),
        RelationDecl::contains("tasks", TypeRef::Concrete(EntityKind::Task), 1),
        RelationDecl::contains("annotations", TypeRef::Abstract(Category::Annotation), 1),
    ];

    type Record = ProjectRecord;

    fn related(&self, relation: &str) -> Option<Vec<EntityId>> {
        match relation {
            "participants" => Some(self.participants.ids().to_vec()),
            "tasks" => Some(self.tasks.ids().to_vec()),
            "annotations" => Some(self.annotations.ids().to_vec()),
            _ => None,
        }
    }

    fn containment_mut(&mut self, relation: &str) -> Option<&mut ContainmentList> {
        match relation {
            "participants" => Some(&mut self.participants),
            "tasks" => Some(&mut self.tasks),
            "annotations" => Some(&mut self.annotations),
            _ => None,
        }
    }

    fn to_record(&self) -> ProjectRecord {
        ProjectRecord {
            id: self.id,
            container: self.container,
            name: self.name.clone(),
            description: self.description.clone(),
            participants: self.participants.ids().to_vec(),
            tasks: self.tasks.ids().to_vec(),
            annotations: self.annotations.ids().to_vec(),
        }
    }

    fn from_record(record: &ProjectRecord) -> Self {
        let mut project = Self::with_id(record.id, record.name.clone());
        project.description = record.description.clone();
        project
    }

    fn resolve(
        &mut self,
        record: &ProjectRecord,
        links: &Linker<'_>,
    ) -> Result<(), RevgraphError> {
        let participants = links.multi("participants", &record.participants)?;
        let tasks = links.multi("tasks", &record.tasks)?;
        let annotations = links.multi("annotations", &record.annotations)?;

        self.container = links.container(record.container);
        self.participants.restore(participants);
        self.tasks.restore(tasks);
        self.annotations.restore(annotations);
        Ok(())
    }
}
