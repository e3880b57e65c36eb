//! Concept instances: [`ConceptNode`], its member values and the canonical
//! [`ConceptKey`] that identifies it.

use crate::error::DslError;
use crate::registry::{ConceptType, Member, MemberKind};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Canonical identity of a concept: the root type name followed by the
/// dot-joined key member values, references contributing their own key
/// values transitively (e.g. `DataStructureInfo Common.Employee`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ConceptKey(String);

impl ConceptKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConceptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A reference to another concept. Holds the referenced node (usually a
/// placeholder with only its key members bound); two references are equal
/// when they point at the same key.
#[derive(Debug, Clone)]
pub struct ConceptRef(Arc<ConceptNode>);

impl ConceptRef {
    pub fn new(node: ConceptNode) -> Self {
        ConceptRef(Arc::new(node))
    }

    /// Reference an existing node, keeping only its key members.
    pub fn to(node: &ConceptNode) -> Self {
        ConceptRef(Arc::new(node.placeholder()))
    }

    pub fn node(&self) -> &ConceptNode {
        &self.0
    }

    pub fn key(&self) -> ConceptKey {
        self.0.key()
    }
}

impl PartialEq for ConceptRef {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberValue {
    Value(String),
    Reference(ConceptRef),
    List(Vec<ConceptRef>),
}

impl MemberValue {
    pub fn value(v: impl Into<String>) -> Self {
        MemberValue::Value(v.into())
    }

    pub fn reference(node: &ConceptNode) -> Self {
        MemberValue::Reference(ConceptRef::to(node))
    }
}

/// A concept instance: its type plus one slot per member.
///
/// Nodes produced by the parser have every member bound. Placeholders (the
/// targets of references) bind only key members.
#[derive(Debug, Clone)]
pub struct ConceptNode {
    ty: Arc<ConceptType>,
    values: Vec<Option<MemberValue>>,
}

impl PartialEq for ConceptNode {
    fn eq(&self, other: &Self) -> bool {
        self.ty.name() == other.ty.name() && self.values == other.values
    }
}

impl ConceptNode {
    pub fn new(ty: Arc<ConceptType>) -> Self {
        let values = vec![None; ty.members().len()];
        ConceptNode { ty, values }
    }

    pub fn concept_type(&self) -> &ConceptType {
        &self.ty
    }

    pub fn type_name(&self) -> &str {
        self.ty.name()
    }

    pub fn set(&mut self, member: &str, value: MemberValue) -> Result<(), DslError> {
        let (idx, _) = self.ty.member(member).ok_or_else(|| {
            DslError::invalid_concept(format!(
                "'{}' has no member named '{}'",
                self.ty.name(),
                member
            ))
        })?;
        self.set_index(idx, value)
    }

    pub(crate) fn set_index(&mut self, idx: usize, value: MemberValue) -> Result<(), DslError> {
        let m = &self.ty.members()[idx];
        let ok = match (&m.kind, &value) {
            (MemberKind::Identifier | MemberKind::Text, MemberValue::Value(_)) => true,
            (MemberKind::Reference(target), MemberValue::Reference(r)) => {
                r.node().concept_type().satisfies(target)
            }
            (MemberKind::ReferenceList(target), MemberValue::List(items)) => items
                .iter()
                .all(|r| r.node().concept_type().satisfies(target)),
            _ => false,
        };
        if !ok {
            return Err(DslError::invalid_concept(format!(
                "value {} does not fit member '{}' of '{}' ({:?})",
                describe_value(&value),
                m.name,
                self.ty.name(),
                m.kind
            )));
        }
        self.values[idx] = Some(value);
        Ok(())
    }

    pub fn with(mut self, member: &str, value: MemberValue) -> Result<Self, DslError> {
        self.set(member, value)?;
        Ok(self)
    }

    pub fn with_value(self, member: &str, value: impl Into<String>) -> Result<Self, DslError> {
        self.with(member, MemberValue::Value(value.into()))
    }

    pub fn with_ref(self, member: &str, target: &ConceptNode) -> Result<Self, DslError> {
        self.with(member, MemberValue::reference(target))
    }

    pub fn get(&self, member: &str) -> Option<&MemberValue> {
        let (idx, _) = self.ty.member(member)?;
        self.values[idx].as_ref()
    }

    pub fn value(&self, member: &str) -> Option<&str> {
        match self.get(member)? {
            MemberValue::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn reference(&self, member: &str) -> Option<&ConceptRef> {
        match self.get(member)? {
            MemberValue::Reference(r) => Some(r),
            _ => None,
        }
    }

    /// The concept this one is nested in, if its type has a parent member.
    pub fn parent(&self) -> Option<&ConceptRef> {
        self.ty.parent_member()?;
        match self.values.first()? {
            Some(MemberValue::Reference(r)) => Some(r),
            _ => None,
        }
    }

    pub fn members(&self) -> impl Iterator<Item = (&Member, Option<&MemberValue>)> {
        self.ty.members().iter().zip(self.values.iter().map(Option::as_ref))
    }

    /// Every referenced concept, list elements included.
    pub fn references(&self) -> Vec<(&Member, &ConceptRef)> {
        let mut out = Vec::new();
        for (m, v) in self.members() {
            match v {
                Some(MemberValue::Reference(r)) => out.push((m, r)),
                Some(MemberValue::List(items)) => out.extend(items.iter().map(|r| (m, r))),
                _ => {}
            }
        }
        out
    }

    pub fn missing_members(&self) -> Vec<&str> {
        self.members()
            .filter(|(_, v)| v.is_none())
            .map(|(m, _)| m.name.as_str())
            .collect()
    }

    /// Key member values in declaration order, references flattened.
    pub fn key_parts(&self) -> Vec<String> {
        let mut parts = Vec::new();
        for (idx, _) in self.ty.key_members() {
            match &self.values[idx] {
                Some(MemberValue::Value(v)) => parts.push(v.clone()),
                Some(MemberValue::Reference(r)) => parts.extend(r.node().key_parts()),
                Some(MemberValue::List(items)) => parts.push(
                    items
                        .iter()
                        .map(|r| r.node().key_parts().join("."))
                        .collect::<Vec<_>>()
                        .join(" "),
                ),
                None => parts.push(String::new()),
            }
        }
        parts
    }

    pub fn key(&self) -> ConceptKey {
        let parts = self.key_parts();
        if parts.is_empty() {
            ConceptKey(self.ty.root().to_owned())
        } else {
            ConceptKey(format!("{} {}", self.ty.root(), parts.join(".")))
        }
    }

    /// A copy holding only the key members.
    pub fn placeholder(&self) -> ConceptNode {
        let values = self
            .ty
            .members()
            .iter()
            .zip(&self.values)
            .map(|(m, v)| if m.key { v.clone() } else { None })
            .collect();
        ConceptNode {
            ty: self.ty.clone(),
            values,
        }
    }

    /// Keyword form for messages, e.g. `Entity Common.Employee`.
    pub fn describe(&self) -> String {
        let label = self.ty.keyword().unwrap_or(self.ty.name());
        let parts = self.key_parts();
        if parts.is_empty() {
            label.to_owned()
        } else {
            format!("{} {}", label, parts.join("."))
        }
    }
}

impl fmt::Display for ConceptNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

fn describe_value(value: &MemberValue) -> String {
    match value {
        MemberValue::Value(v) => format!("'{}'", v),
        MemberValue::Reference(r) => format!("reference to '{}'", r.key()),
        MemberValue::List(items) => format!("list of {} references", items.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ConceptRegistry, ConceptType, TypeRef};

    fn registry() -> ConceptRegistry {
        ConceptRegistry::builder()
            .concept(ConceptType::define("ModuleInfo").keyword("Module").key("Name", MemberKind::Identifier))
            .concept(
                ConceptType::define("DataStructureInfo")
                    .parent("Module", TypeRef::concept("ModuleInfo"))
                    .key("Name", MemberKind::Identifier),
            )
            .concept(ConceptType::define("EntityInfo").keyword("Entity").extends("DataStructureInfo"))
            .concept(
                ConceptType::define("ReferenceInfo")
                    .keyword("Reference")
                    .parent("DataStructure", TypeRef::concept("DataStructureInfo"))
                    .key("Name", MemberKind::Identifier)
                    .member("Referenced", MemberKind::Reference(TypeRef::concept("DataStructureInfo"))),
            )
            .build()
            .unwrap()
    }

    fn entity(reg: &ConceptRegistry, module: &str, name: &str) -> ConceptNode {
        let m = ConceptNode::new(reg.get("ModuleInfo").unwrap().clone())
            .with_value("Name", module)
            .unwrap();
        ConceptNode::new(reg.get("EntityInfo").unwrap().clone())
            .with_ref("Module", &m)
            .unwrap()
            .with_value("Name", name)
            .unwrap()
    }

    #[test]
    fn key_is_rooted_at_base_type() {
        let reg = registry();
        let e = entity(&reg, "Common", "Employee");
        assert_eq!(e.key().as_str(), "DataStructureInfo Common.Employee");
        assert_eq!(e.describe(), "Entity Common.Employee");
    }

    #[test]
    fn non_key_members_do_not_affect_key_but_affect_equality() {
        let reg = registry();
        let owner = entity(&reg, "Common", "Employee");
        let a = ConceptNode::new(reg.get("ReferenceInfo").unwrap().clone())
            .with_ref("DataStructure", &owner)
            .unwrap()
            .with_value("Name", "Boss")
            .unwrap()
            .with_ref("Referenced", &entity(&reg, "Common", "Principal"))
            .unwrap();
        let b = a
            .clone()
            .with_ref("Referenced", &entity(&reg, "Common", "Role"))
            .unwrap();
        assert_eq!(a.key(), b.key());
        assert_ne!(a, b);
        assert_eq!(a.key().as_str(), "ReferenceInfo Common.Employee.Boss");
    }

    #[test]
    fn set_rejects_mistyped_reference() {
        let reg = registry();
        let m = ConceptNode::new(reg.get("ModuleInfo").unwrap().clone())
            .with_value("Name", "Common")
            .unwrap();
        let err = ConceptNode::new(reg.get("ReferenceInfo").unwrap().clone())
            .with_ref("DataStructure", &m)
            .unwrap_err();
        assert!(err.message.contains("does not fit"));
    }

    #[test]
    fn placeholder_drops_non_key_members() {
        let reg = registry();
        let owner = entity(&reg, "Common", "Employee");
        let r = ConceptNode::new(reg.get("ReferenceInfo").unwrap().clone())
            .with_ref("DataStructure", &owner)
            .unwrap()
            .with_value("Name", "Boss")
            .unwrap()
            .with_ref("Referenced", &owner)
            .unwrap();
        let p = r.placeholder();
        assert!(p.get("Referenced").is_none());
        assert_eq!(p.key(), r.key());
        assert_eq!(p.missing_members(), vec!["Referenced"]);
        assert_eq!(r.references().len(), 2);
    }
}
