//! # Type Registry
//!
//! Built once at process start from an explicit list of entity kinds, then
//! shared read-only by the walker, projector and resolver.
//!
//! For each registered kind the registry holds the relation table the type
//! declares (`EntityType::RELATIONS`). For each abstract category it holds
//! the registered concrete implementers.
//!
//! Build-time validation fails fast on inconsistent declarations so that a
//! forgotten registration never degrades into a silently shallow walk.

use crate::{Category, Depth, EntityKind, RelationDecl, RevgraphError, TypeRef};
use std::collections::{BTreeMap, BTreeSet};

/// Relation tables and category mappings for a fixed set of kinds.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    /// kind -> declared relations, in declaration order
    relations: BTreeMap<EntityKind, &'static [RelationDecl]>,
    /// category -> registered concrete implementers
    implementers: BTreeMap<Category, Vec<EntityKind>>,
}

/// Build a validated registry for `kinds`.
pub fn build_registry(kinds: &[EntityKind]) -> Result<Registry, RevgraphError> {
    Registry::build(kinds)
}

impl Registry {
    /// Register every kind, compute category mappings and validate.
    pub fn build(kinds: &[EntityKind]) -> Result<Self, RevgraphError> {
        let mut registry = Self::default();
        for &kind in kinds {
            registry.register_type(kind)?;
        }
        registry.register_abstract_mappings();
        registry.validate()?;

        tracing::debug!(
            kinds = registry.relations.len(),
            categories = registry.implementers.len(),
            "type registry built"
        );
        Ok(registry)
    }

    /// Registry over every built-in kind.
    pub fn standard() -> Result<Self, RevgraphError> {
        Self::build(&EntityKind::ALL)
    }

    /// Record the relation table `kind` declares.
    ///
    /// Re-registering a kind is a no-op.
    pub fn register_type(&mut self, kind: EntityKind) -> Result<(), RevgraphError> {
        let declared = kind.declared_relations();

        let mut seen = BTreeSet::new();
        for decl in declared {
            if !seen.insert(decl.name) {
                return Err(RevgraphError::DuplicateRelation {
                    kind,
                    relation: decl.name,
                });
            }
        }

        self.relations.insert(kind, declared);
        Ok(())
    }

    /// Recompute category -> implementers from the registered kinds.
    pub fn register_abstract_mappings(&mut self) {
        self.implementers.clear();
        for &kind in self.relations.keys() {
            for &category in kind.categories() {
                self.implementers.entry(category).or_default().push(kind);
            }
        }
    }

    /// Every relation target must be satisfiable by a registered kind.
    fn validate(&self) -> Result<(), RevgraphError> {
        for decl in self.relations.values().flat_map(|decls| decls.iter()) {
            match decl.target {
                TypeRef::Concrete(kind) => {
                    if !self.relations.contains_key(&kind) {
                        return Err(RevgraphError::UnregisteredType(kind));
                    }
                }
                TypeRef::Abstract(category) => {
                    if self.implementers(category).is_empty() {
                        return Err(RevgraphError::EmptyCategory(category));
                    }
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn is_registered(&self, kind: EntityKind) -> bool {
        self.relations.contains_key(&kind)
    }

    /// Fail with `UnregisteredType` unless `kind` is registered.
    pub fn ensure_registered(&self, kind: EntityKind) -> Result<(), RevgraphError> {
        if self.is_registered(kind) {
            Ok(())
        } else {
            Err(RevgraphError::UnregisteredType(kind))
        }
    }

    /// Registered kinds in deterministic order.
    pub fn kinds(&self) -> impl Iterator<Item = EntityKind> + '_ {
        self.relations.keys().copied()
    }

    /// Relation table of a registered kind.
    pub fn relations(&self, kind: EntityKind) -> Result<&'static [RelationDecl], RevgraphError> {
        self.relations
            .get(&kind)
            .copied()
            .ok_or(RevgraphError::UnregisteredType(kind))
    }

    /// One named relation of a registered kind.
    pub fn relation(
        &self,
        kind: EntityKind,
        name: &str,
    ) -> Result<&'static RelationDecl, RevgraphError> {
        self.relations(kind)?
            .iter()
            .find(|decl| decl.name == name)
            .ok_or_else(|| RevgraphError::UnknownRelation {
                kind,
                relation: name.to_string(),
            })
    }

    /// The containment relations of a registered kind.
    pub fn containment_relations(
        &self,
        kind: EntityKind,
    ) -> Result<impl Iterator<Item = &'static RelationDecl>, RevgraphError> {
        Ok(self
            .relations(kind)?
            .iter()
            .filter(|decl| decl.is_containment()))
    }

    /// Registered concrete implementers of `category` (possibly none).
    #[must_use]
    pub fn implementers(&self, category: Category) -> &[EntityKind] {
        self.implementers
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Concrete kinds a type reference stands for.
    #[must_use]
    pub fn concrete_types(&self, ty: TypeRef) -> Vec<EntityKind> {
        match ty {
            TypeRef::Concrete(kind) if self.is_registered(kind) => vec![kind],
            TypeRef::Concrete(_) => Vec::new(),
            TypeRef::Abstract(category) => self.implementers(category).to_vec(),
        }
    }

    /// Whether an entity of `kind` may fill a relation declared against `target`.
    #[must_use]
    pub fn accepts(&self, target: TypeRef, kind: EntityKind) -> bool {
        match target {
            TypeRef::Concrete(expected) => expected == kind,
            TypeRef::Abstract(category) => self.implementers(category).contains(&kind),
        }
    }

    /// Relations of `ty` whose tier is at most `depth`.
    ///
    /// For an abstract category this is the union over all implementers,
    /// deduplicated by relation name (first implementer wins). A negative
    /// depth selects nothing.
    pub fn scoped_properties(
        &self,
        depth: Depth,
        ty: TypeRef,
    ) -> Result<Vec<&'static RelationDecl>, RevgraphError> {
        if depth < 0 {
            return Ok(Vec::new());
        }

        let kinds = match ty {
            TypeRef::Concrete(kind) => {
                self.ensure_registered(kind)?;
                vec![kind]
            }
            TypeRef::Abstract(category) => self.implementers(category).to_vec(),
        };

        let mut names = BTreeSet::new();
        let mut scoped = Vec::new();
        for kind in kinds {
            for decl in self.relations(kind)? {
                if Depth::from(decl.tier) <= depth && names.insert(decl.name) {
                    scoped.push(decl);
                }
            }
        }
        Ok(scoped)
    }
}

// =============================================================================
// TESTS
// =============================================================================
