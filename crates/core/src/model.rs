//! The Concept Graph: the deduplicated set of concepts with key, type and
//! reference indexes.
//!
//! Concepts are inserted one at a time during macro expansion. A concept
//! whose references point at keys not (yet) in the model waits; it becomes
//! *resolved* once every referenced key has arrived.

use crate::concept::{ConceptKey, ConceptNode, ConceptRef};
use crate::error::{DslError, ErrorCode, SourceSpan};
use crate::registry::{ConceptRegistry, MemberKind, TypeRef};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Where a concept came from.
#[derive(Debug, Clone, PartialEq)]
pub enum ConceptOrigin {
    Script(SourceSpan),
    Macro { derived_from: ConceptKey },
    Initial,
}

impl ConceptOrigin {
    pub fn span(&self) -> Option<&SourceSpan> {
        match self {
            ConceptOrigin::Script(span) => Some(span),
            _ => None,
        }
    }
}

impl fmt::Display for ConceptOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConceptOrigin::Script(span) => write!(f, "script {}", span),
            ConceptOrigin::Macro { derived_from } => write!(f, "macro of '{}'", derived_from),
            ConceptOrigin::Initial => f.write_str("initial concepts"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConceptEntry {
    pub node: ConceptNode,
    pub origin: ConceptOrigin,
    pub key: ConceptKey,
    unresolved: usize,
}

impl ConceptEntry {
    pub fn is_resolved(&self) -> bool {
        self.unresolved == 0
    }
}

/// Result of [`DslModel::insert`].
#[derive(Debug, PartialEq)]
pub enum Insertion {
    /// The concept is new. `resolved` lists entries (by index) whose
    /// references all became resolved by this insertion, the new entry
    /// included.
    Added { index: usize, resolved: Vec<usize> },
    /// An identical concept was already present.
    Duplicate,
}

struct Waiting {
    entry: usize,
    member: String,
    target: TypeRef,
}

pub struct DslModel {
    registry: Arc<ConceptRegistry>,
    entries: Vec<ConceptEntry>,
    by_key: HashMap<ConceptKey, usize>,
    by_type: HashMap<String, Vec<usize>>,
    referencing: HashMap<ConceptKey, Vec<usize>>,
    children: HashMap<ConceptKey, Vec<usize>>,
    waiting: HashMap<ConceptKey, Vec<Waiting>>,
}

impl fmt::Debug for DslModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DslModel")
            .field("concepts", &self.entries.len())
            .field("waiting", &self.waiting.len())
            .finish()
    }
}

impl DslModel {
    pub fn new(registry: Arc<ConceptRegistry>) -> Self {
        DslModel {
            registry,
            entries: Vec::new(),
            by_key: HashMap::new(),
            by_type: HashMap::new(),
            referencing: HashMap::new(),
            children: HashMap::new(),
            waiting: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<ConceptRegistry> {
        &self.registry
    }

    /// Add a concept. Re-adding an identical concept is a no-op; a
    /// different concept under an existing key is a duplicate-key error.
    pub fn insert(&mut self, node: ConceptNode, origin: ConceptOrigin) -> Result<Insertion, DslError> {
        let key = node.key();
        if let Some(&existing) = self.by_key.get(&key) {
            let prior = &self.entries[existing];
            if prior.node == node {
                return Ok(Insertion::Duplicate);
            }
            return Err(DslError::new(
                ErrorCode::DuplicateKey,
                format!("'{}' is defined twice with different content", key),
            )
            .at_opt(origin.span().or(prior.origin.span()).cloned())
            .with_causes(format!(
                "first defined as {} by {}; then as {} by {}",
                prior.node.type_name(),
                prior.origin,
                node.type_name(),
                origin
            )));
        }

        let missing = node.missing_members();
        if !missing.is_empty() {
            return Err(DslError::new(
                ErrorCode::InvalidConcept,
                format!("'{}' is missing member(s): {}", key, missing.join(", ")),
            )
            .at_opt(origin.span().cloned())
            .with_causes(format!("created by {}", origin)));
        }

        let index = self.entries.len();
        for ancestor in node.concept_type().ancestors() {
            self.by_type.entry(ancestor.clone()).or_default().push(index);
        }
        if let Some(parent) = node.parent() {
            self.children.entry(parent.key()).or_default().push(index);
        }
        self.by_key.insert(key.clone(), index);

        let mut unresolved = 0;
        let mut seen_targets = Vec::new();
        for (member, reference) in node.references() {
            let target_key = reference.key();
            if !seen_targets.contains(&target_key) {
                self.referencing.entry(target_key.clone()).or_default().push(index);
                seen_targets.push(target_key.clone());
            }
            let target = match &member.kind {
                MemberKind::Reference(t) | MemberKind::ReferenceList(t) => t.clone(),
                _ => TypeRef::Any,
            };
            match self.by_key.get(&target_key) {
                Some(&t) => {
                    self.check_target(&node, &origin, &member.name, &target, t)?;
                }
                _ => {
                    unresolved += 1;
                    self.waiting.entry(target_key).or_default().push(Waiting {
                        entry: index,
                        member: member.name.clone(),
                        target,
                    });
                }
            }
        }

        self.entries.push(ConceptEntry {
            node,
            origin,
            key: key.clone(),
            unresolved,
        });

        let mut resolved = Vec::new();
        if unresolved == 0 {
            resolved.push(index);
        }
        for w in self.waiting.remove(&key).unwrap_or_default() {
            if w.entry == index {
                continue;
            }
            let waiter = &self.entries[w.entry];
            self.check_target(&waiter.node, &waiter.origin, &w.member, &w.target, index)?;
            let waiter = &mut self.entries[w.entry];
            waiter.unresolved -= 1;
            if waiter.unresolved == 0 {
                resolved.push(w.entry);
            }
        }
        Ok(Insertion::Added { index, resolved })
    }

    fn check_target(
        &self,
        node: &ConceptNode,
        origin: &ConceptOrigin,
        member: &str,
        target: &TypeRef,
        found: usize,
    ) -> Result<(), DslError> {
        // `found` may be the entry being inserted (a self-reference).
        let found = self.entries.get(found).map_or(node, |e| &e.node);
        if found.concept_type().satisfies(target) {
            return Ok(());
        }
        Err(DslError::new(
            ErrorCode::ReferenceTypeMismatch,
            format!(
                "member '{}' of '{}' references '{}', which is a {} and not a {}",
                member,
                node.key(),
                found.key(),
                found.type_name(),
                target
            ),
        )
        .at_opt(origin.span().cloned())
        .with_causes(format!("'{}' was created by {}", node.key(), origin)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &ConceptKey) -> bool {
        self.by_key.contains_key(key)
    }

    pub fn get(&self, key: &ConceptKey) -> Option<&ConceptNode> {
        self.entry(key).map(|e| &e.node)
    }

    pub fn entry(&self, key: &ConceptKey) -> Option<&ConceptEntry> {
        self.by_key.get(key).map(|&i| &self.entries[i])
    }

    pub(crate) fn index_of(&self, key: &ConceptKey) -> Option<usize> {
        self.by_key.get(key).copied()
    }

    pub(crate) fn entry_at(&self, index: usize) -> &ConceptEntry {
        &self.entries[index]
    }

    /// The full concept a reference points at.
    pub fn resolve(&self, reference: &ConceptRef) -> Option<&ConceptNode> {
        self.get(&reference.key())
    }

    pub fn origin(&self, key: &ConceptKey) -> Option<&ConceptOrigin> {
        self.entry(key).map(|e| &e.origin)
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[ConceptEntry] {
        &self.entries
    }

    pub fn concepts(&self) -> impl Iterator<Item = &ConceptNode> {
        self.entries.iter().map(|e| &e.node)
    }

    /// Concepts of a type, its derived types and its implementors.
    pub fn of_type<'a>(&'a self, type_name: &str) -> impl Iterator<Item = &'a ConceptNode> {
        self.by_type
            .get(type_name)
            .into_iter()
            .flatten()
            .map(move |&i| &self.entries[i].node)
    }

    /// Concepts holding a reference to `key`.
    pub fn referencing<'a>(&'a self, key: &ConceptKey) -> impl Iterator<Item = &'a ConceptNode> {
        self.referencing
            .get(key)
            .into_iter()
            .flatten()
            .map(move |&i| &self.entries[i].node)
    }

    /// Concepts whose parent member is `key`.
    pub fn children<'a>(&'a self, key: &ConceptKey) -> impl Iterator<Item = &'a ConceptNode> {
        self.children
            .get(key)
            .into_iter()
            .flatten()
            .map(move |&i| &self.entries[i].node)
    }

    /// Fail with the first reference that never matched a concept.
    pub fn check_resolved(&self) -> Result<(), DslError> {
        let mut missing: Vec<(&ConceptKey, &Waiting)> = self
            .waiting
            .iter()
            .flat_map(|(k, ws)| ws.iter().map(move |w| (k, w)))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        missing.sort_by_key(|(k, w)| (w.entry, (*k).clone()));
        let details: Vec<String> = missing
            .iter()
            .map(|(k, w)| {
                format!(
                    "'{}' member '{}' references missing '{}'",
                    self.entries[w.entry].key, w.member, k
                )
            })
            .collect();
        let (target, first) = missing[0];
        let entry = &self.entries[first.entry];
        Err(DslError::new(
            ErrorCode::UnresolvedReference,
            format!(
                "member '{}' of '{}' references '{}', which is not defined",
                first.member, entry.key, target
            ),
        )
        .at_opt(entry.origin.span().cloned())
        .with_causes(format!(
            "{} unresolved reference(s); check the spelling or add the missing concept",
            details.len()
        ))
        .with_details(details))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ConceptType;

    fn registry() -> Arc<ConceptRegistry> {
        Arc::new(
            ConceptRegistry::builder()
                .concept(ConceptType::define("ModuleInfo").keyword("Module").key("Name", MemberKind::Identifier))
                .concept(
                    ConceptType::define("DataStructureInfo")
                        .parent("Module", TypeRef::concept("ModuleInfo"))
                        .key("Name", MemberKind::Identifier),
                )
                .concept(ConceptType::define("EntityInfo").keyword("Entity").extends("DataStructureInfo"))
                .concept(ConceptType::define("BrowseInfo").keyword("Browse").extends("DataStructureInfo"))
                .concept(
                    ConceptType::define("ReferenceInfo")
                        .keyword("Reference")
                        .parent("DataStructure", TypeRef::concept("DataStructureInfo"))
                        .key("Name", MemberKind::Identifier)
                        .member("Referenced", MemberKind::Reference(TypeRef::concept("EntityInfo"))),
                )
                .build()
                .unwrap(),
        )
    }

    fn module(reg: &ConceptRegistry, name: &str) -> ConceptNode {
        ConceptNode::new(reg.get("ModuleInfo").unwrap().clone())
            .with_value("Name", name)
            .unwrap()
    }

    fn ds(reg: &ConceptRegistry, ty: &str, name: &str) -> ConceptNode {
        ConceptNode::new(reg.get(ty).unwrap().clone())
            .with_ref("Module", &module(reg, "Common"))
            .unwrap()
            .with_value("Name", name)
            .unwrap()
    }

    fn reference(reg: &ConceptRegistry, owner: &ConceptNode, name: &str, to: &ConceptNode) -> ConceptNode {
        ConceptNode::new(reg.get("ReferenceInfo").unwrap().clone())
            .with_ref("DataStructure", owner)
            .unwrap()
            .with_value("Name", name)
            .unwrap()
            .with_ref("Referenced", to)
            .unwrap()
    }

    #[test]
    fn identical_reinsert_is_deduplicated() {
        let reg = registry();
        let mut model = DslModel::new(reg.clone());
        let m = module(&reg, "Common");
        assert!(matches!(model.insert(m.clone(), ConceptOrigin::Initial).unwrap(), Insertion::Added { .. }));
        assert_eq!(model.insert(m, ConceptOrigin::Initial).unwrap(), Insertion::Duplicate);
        assert_eq!(model.len(), 1);
    }

    #[test]
    fn different_concept_under_same_key_is_rejected() {
        let reg = registry();
        let mut model = DslModel::new(reg.clone());
        model.insert(module(&reg, "Common"), ConceptOrigin::Initial).unwrap();
        model.insert(ds(&reg, "EntityInfo", "Employee"), ConceptOrigin::Initial).unwrap();
        let err = model
            .insert(ds(&reg, "BrowseInfo", "Employee"), ConceptOrigin::Initial)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DuplicateKey);
        assert!(err.possible_causes.unwrap().contains("EntityInfo"));
    }

    #[test]
    fn waiting_concepts_resolve_when_target_arrives() {
        let reg = registry();
        let mut model = DslModel::new(reg.clone());
        let employee = ds(&reg, "EntityInfo", "Employee");
        let principal = ds(&reg, "EntityInfo", "Principal");
        let boss = reference(&reg, &employee, "Boss", &principal);

        let Insertion::Added { resolved, .. } = model.insert(boss, ConceptOrigin::Initial).unwrap() else {
            panic!("expected insertion");
        };
        assert!(resolved.is_empty());
        model.insert(module(&reg, "Common"), ConceptOrigin::Initial).unwrap();
        model.insert(employee.clone(), ConceptOrigin::Initial).unwrap();
        assert!(model.check_resolved().is_err());
        let Insertion::Added { resolved, .. } = model.insert(principal, ConceptOrigin::Initial).unwrap() else {
            panic!("expected insertion");
        };
        assert_eq!(resolved.len(), 2, "principal itself and the waiting reference");
        assert!(model.check_resolved().is_ok());
        assert_eq!(model.referencing(&employee.key()).count(), 1);
        assert_eq!(model.children(&employee.key()).count(), 1);
        assert_eq!(model.of_type("DataStructureInfo").count(), 2);
    }

    #[test]
    fn unresolved_reference_is_reported() {
        let reg = registry();
        let mut model = DslModel::new(reg.clone());
        model.insert(module(&reg, "Common"), ConceptOrigin::Initial).unwrap();
        let employee = ds(&reg, "EntityInfo", "Employee");
        model.insert(employee.clone(), ConceptOrigin::Initial).unwrap();
        model
            .insert(
                reference(&reg, &employee, "Boss", &ds(&reg, "EntityInfo", "Nobody")),
                ConceptOrigin::Initial,
            )
            .unwrap();
        let err = model.check_resolved().unwrap_err();
        assert_eq!(err.code, ErrorCode::UnresolvedReference);
        assert!(err.message.contains("Common.Nobody"));
    }

    #[test]
    fn reference_to_wrong_derived_type_is_mismatch() {
        let reg = registry();
        let mut model = DslModel::new(reg.clone());
        model.insert(module(&reg, "Common"), ConceptOrigin::Initial).unwrap();
        let employee = ds(&reg, "EntityInfo", "Employee");
        model.insert(employee.clone(), ConceptOrigin::Initial).unwrap();
        model.insert(ds(&reg, "BrowseInfo", "View"), ConceptOrigin::Initial).unwrap();
        // Keys are rooted at DataStructureInfo, so the entity placeholder
        // finds the browse.
        let node = reference(&reg, &employee, "Shown", &ds(&reg, "EntityInfo", "View"));
        let err = model.insert(node, ConceptOrigin::Initial).unwrap_err();
        assert_eq!(err.code, ErrorCode::ReferenceTypeMismatch);
        assert!(err.message.contains("BrowseInfo"));
    }

    #[test]
    fn incomplete_concept_is_rejected() {
        let reg = registry();
        let mut model = DslModel::new(reg.clone());
        let node = ConceptNode::new(reg.get("ModuleInfo").unwrap().clone());
        let err = model.insert(node, ConceptOrigin::Initial).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConcept);
    }
}
