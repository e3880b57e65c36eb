//! Concept Type Registry: the static description of every concept shape.
//!
//! A [`ConceptType`] lists its keyword, its ordered members (the order is the
//! textual grammar of the concept) and which member nests it inside a parent.
//! Types are declared with [`ConceptType::define`] and assembled once by a
//! [`RegistryBuilder`]; the resulting [`ConceptRegistry`] is read-only and is
//! shared between compilation jobs behind an `Arc`.

use crate::error::DslError;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Target of a reference member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// Open reference: any concept. Only bindable from the nesting context.
    Any,
    Concept(String),
}

impl TypeRef {
    pub fn concept(name: impl Into<String>) -> Self {
        TypeRef::Concept(name.into())
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Any => f.write_str("any concept"),
            TypeRef::Concept(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberKind {
    /// A bare identifier (or a quoted string holding one).
    Identifier,
    /// Any single word or quoted string.
    Text,
    Reference(TypeRef),
    /// A space-separated property list naming sibling concepts.
    ReferenceList(TypeRef),
}

impl MemberKind {
    pub fn target(&self) -> Option<&TypeRef> {
        match self {
            MemberKind::Reference(t) | MemberKind::ReferenceList(t) => Some(t),
            MemberKind::Identifier | MemberKind::Text => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    pub kind: MemberKind,
    /// Key members make up the concept's identity.
    pub key: bool,
    /// The member that nests this concept inside its parent.
    pub parent: bool,
}

/// How deeply a concept type nests, measured along its parent chain.
///
/// Ordering puts the preferred interpretation first: a concrete parent chain
/// before an open one, then fewer hops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NestingDepth {
    pub concrete_parent: bool,
    pub depth: usize,
}

impl NestingDepth {
    fn rank(&self) -> (bool, usize) {
        (!self.concrete_parent, self.depth)
    }
}

impl PartialOrd for NestingDepth {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NestingDepth {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

/// Declaration of a concept type, consumed by [`RegistryBuilder`].
#[derive(Debug, Clone)]
pub struct ConceptTypeDef {
    name: String,
    keyword: Option<String>,
    base: Option<String>,
    interfaces: Vec<String>,
    is_interface: bool,
    deprecated: Option<String>,
    members: Vec<Member>,
}

impl ConceptTypeDef {
    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    /// Inherit every member of `base`. Keys of derived types are rooted at
    /// the root base type, so a reference to the base finds derived instances.
    pub fn extends(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Mark the keyword as deprecated; parsing it records a warning.
    pub fn deprecated(mut self, note: impl Into<String>) -> Self {
        self.deprecated = Some(note.into());
        self
    }

    /// Declare the parent member: a key reference that is bound from the
    /// nesting context when the concept is written inside `{ }`.
    pub fn parent(mut self, name: impl Into<String>, target: TypeRef) -> Self {
        self.members.push(Member {
            name: name.into(),
            kind: MemberKind::Reference(target),
            key: true,
            parent: true,
        });
        self
    }

    pub fn key(mut self, name: impl Into<String>, kind: MemberKind) -> Self {
        self.members.push(Member {
            name: name.into(),
            kind,
            key: true,
            parent: false,
        });
        self
    }

    pub fn member(mut self, name: impl Into<String>, kind: MemberKind) -> Self {
        self.members.push(Member {
            name: name.into(),
            kind,
            key: false,
            parent: false,
        });
        self
    }
}

#[derive(Debug, Clone)]
pub struct ConceptType {
    name: String,
    keyword: Option<String>,
    is_interface: bool,
    deprecated: Option<String>,
    members: Vec<Member>,
    root: String,
    /// Self, then bases up to the root, then implemented interfaces.
    ancestors: Vec<String>,
    arity: Option<usize>,
    nesting: NestingDepth,
}

impl ConceptType {
    pub fn define(name: impl Into<String>) -> ConceptTypeDef {
        ConceptTypeDef {
            name: name.into(),
            keyword: None,
            base: None,
            interfaces: Vec::new(),
            is_interface: false,
            deprecated: None,
            members: Vec::new(),
        }
    }

    /// An interface type: no members, no keyword, never instantiated.
    pub fn interface(name: impl Into<String>) -> ConceptTypeDef {
        let mut def = Self::define(name);
        def.is_interface = true;
        def
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn keyword(&self) -> Option<&str> {
        self.keyword.as_deref()
    }

    pub fn is_interface(&self) -> bool {
        self.is_interface
    }

    pub fn deprecated(&self) -> Option<&str> {
        self.deprecated.as_deref()
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn member(&self, name: &str) -> Option<(usize, &Member)> {
        self.members.iter().enumerate().find(|(_, m)| m.name == name)
    }

    pub fn key_members(&self) -> impl Iterator<Item = (usize, &Member)> {
        self.members.iter().enumerate().filter(|(_, m)| m.key)
    }

    pub fn parent_member(&self) -> Option<&Member> {
        self.members.first().filter(|m| m.parent)
    }

    /// Name of the root base type; prefixes every key of this type.
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn ancestors(&self) -> &[String] {
        &self.ancestors
    }

    pub fn is_a(&self, type_name: &str) -> bool {
        self.ancestors.iter().any(|a| a == type_name)
    }

    pub fn satisfies(&self, target: &TypeRef) -> bool {
        match target {
            TypeRef::Any => true,
            TypeRef::Concept(name) => self.is_a(name),
        }
    }

    /// Number of dot-separated segments in an explicit reference to this
    /// type, or `None` if it cannot be referenced textually.
    pub fn reference_arity(&self) -> Option<usize> {
        self.arity
    }

    pub fn nesting_depth(&self) -> NestingDepth {
        self.nesting
    }
}

impl fmt::Display for ConceptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// The closed set of concept types known to a compilation.
#[derive(Debug)]
pub struct ConceptRegistry {
    types: Vec<Arc<ConceptType>>,
    by_name: HashMap<String, usize>,
    by_keyword: HashMap<String, Vec<usize>>,
}

impl ConceptRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ConceptType>> {
        self.by_name.get(name).map(|&i| &self.types[i])
    }

    pub fn require(&self, name: &str) -> Result<&Arc<ConceptType>, DslError> {
        self.get(name)
            .ok_or_else(|| DslError::invalid_concept(format!("unknown concept type '{}'", name)))
    }

    /// Types declaring `keyword`, in declaration order.
    pub fn with_keyword<'a>(&'a self, keyword: &str) -> impl Iterator<Item = &'a Arc<ConceptType>> {
        self.by_keyword
            .get(keyword)
            .into_iter()
            .flatten()
            .map(move |&i| &self.types[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ConceptType>> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    defs: Vec<ConceptTypeDef>,
}

impl RegistryBuilder {
    pub fn concept(mut self, def: ConceptTypeDef) -> Self {
        self.defs.push(def);
        self
    }

    pub fn build(self) -> Result<ConceptRegistry, DslError> {
        let mut defs: HashMap<String, &ConceptTypeDef> = HashMap::new();
        for def in &self.defs {
            if defs.insert(def.name.clone(), def).is_some() {
                return Err(DslError::registry(format!(
                    "concept type '{}' is declared twice",
                    def.name
                )));
            }
            if def.is_interface
                && (!def.members.is_empty() || def.keyword.is_some() || def.base.is_some())
            {
                return Err(DslError::registry(format!(
                    "interface '{}' cannot declare members, a keyword or a base type",
                    def.name
                )));
            }
        }

        let mut resolved: HashMap<String, ConceptType> = HashMap::new();
        for def in &self.defs {
            let mut visiting = Vec::new();
            resolve_inheritance(&def.name, &defs, &mut resolved, &mut visiting)?;
        }

        for ty in resolved.values() {
            for m in &ty.members {
                if let Some(TypeRef::Concept(target)) = m.kind.target() {
                    if !resolved.contains_key(target) {
                        return Err(DslError::registry(format!(
                            "member '{}' of '{}' references unknown concept type '{}'",
                            m.name, ty.name, target
                        )));
                    }
                }
            }
        }

        let mut arities: HashMap<String, Option<usize>> = HashMap::new();
        for def in &self.defs {
            let mut visiting = Vec::new();
            compute_arity(&def.name, &resolved, &mut arities, &mut visiting)?;
        }

        let nesting: HashMap<String, NestingDepth> = self
            .defs
            .iter()
            .map(|d| (d.name.clone(), compute_nesting(&d.name, &resolved)))
            .collect();

        let mut types = Vec::with_capacity(self.defs.len());
        let mut by_name = HashMap::new();
        let mut by_keyword: HashMap<String, Vec<usize>> = HashMap::new();
        for def in &self.defs {
            let Some(mut ty) = resolved.remove(&def.name) else {
                continue;
            };
            ty.arity = arities.get(&def.name).copied().flatten();
            ty.nesting = nesting[&def.name];
            let idx = types.len();
            if let Some(kw) = &ty.keyword {
                by_keyword.entry(kw.clone()).or_default().push(idx);
            }
            by_name.insert(ty.name.clone(), idx);
            types.push(Arc::new(ty));
        }

        Ok(ConceptRegistry {
            types,
            by_name,
            by_keyword,
        })
    }
}

fn resolve_inheritance(
    name: &str,
    defs: &HashMap<String, &ConceptTypeDef>,
    resolved: &mut HashMap<String, ConceptType>,
    visiting: &mut Vec<String>,
) -> Result<(), DslError> {
    if resolved.contains_key(name) {
        return Ok(());
    }
    if visiting.iter().any(|v| v == name) {
        visiting.push(name.to_owned());
        return Err(DslError::registry(format!(
            "concept type inheritance cycle: {}",
            visiting.join(" \u{2192} ")
        )));
    }
    let def = defs
        .get(name)
        .ok_or_else(|| DslError::registry(format!("unknown concept type '{}'", name)))?;

    visiting.push(name.to_owned());
    let (mut members, root, mut ancestors) = match &def.base {
        Some(base) => {
            if !defs.contains_key(base) {
                return Err(DslError::registry(format!(
                    "'{}' extends unknown concept type '{}'",
                    name, base
                )));
            }
            resolve_inheritance(base, defs, resolved, visiting)?;
            let base_ty = &resolved[base.as_str()];
            if base_ty.is_interface {
                return Err(DslError::registry(format!(
                    "'{}' extends interface '{}'; use implements instead",
                    name, base
                )));
            }
            if def.members.iter().any(|m| m.key || m.parent) {
                return Err(DslError::registry(format!(
                    "'{}' extends '{}' and cannot declare key or parent members of its own",
                    name, base
                )));
            }
            let mut ancestors = vec![name.to_owned()];
            ancestors.extend(base_ty.ancestors.iter().cloned());
            (
                base_ty.members.clone(),
                base_ty.root.clone(),
                ancestors,
            )
        }
        None => (Vec::new(), name.to_owned(), vec![name.to_owned()]),
    };
    visiting.pop();

    members.extend(def.members.iter().cloned());

    let mut seen = HashSet::new();
    for (i, m) in members.iter().enumerate() {
        if !seen.insert(m.name.as_str()) {
            return Err(DslError::registry(format!(
                "member '{}' is declared twice on '{}'",
                m.name, name
            )));
        }
        if m.parent && i != 0 {
            return Err(DslError::registry(format!(
                "parent member '{}' of '{}' must be the first member",
                m.name, name
            )));
        }
    }

    for iface in &def.interfaces {
        match defs.get(iface.as_str()) {
            Some(d) if d.is_interface => {
                if !ancestors.contains(iface) {
                    ancestors.push(iface.clone());
                }
            }
            Some(_) => {
                return Err(DslError::registry(format!(
                    "'{}' implements '{}', which is not an interface",
                    name, iface
                )))
            }
            None => {
                return Err(DslError::registry(format!(
                    "'{}' implements unknown interface '{}'",
                    name, iface
                )))
            }
        }
    }

    resolved.insert(
        name.to_owned(),
        ConceptType {
            name: name.to_owned(),
            keyword: def.keyword.clone(),
            is_interface: def.is_interface,
            deprecated: def.deprecated.clone(),
            members,
            root,
            ancestors,
            arity: None,
            nesting: NestingDepth {
                concrete_parent: true,
                depth: 0,
            },
        },
    );
    Ok(())
}

fn compute_arity(
    name: &str,
    types: &HashMap<String, ConceptType>,
    memo: &mut HashMap<String, Option<usize>>,
    visiting: &mut Vec<String>,
) -> Result<Option<usize>, DslError> {
    if let Some(a) = memo.get(name) {
        return Ok(*a);
    }
    if visiting.iter().any(|v| v == name) {
        visiting.push(name.to_owned());
        return Err(DslError::registry(format!(
            "key members reference each other in a cycle: {}",
            visiting.join(" \u{2192} ")
        )));
    }
    let ty = &types[name];
    if ty.is_interface {
        memo.insert(name.to_owned(), None);
        return Ok(None);
    }
    visiting.push(name.to_owned());
    let mut total = Some(0usize);
    for m in ty.members.iter().filter(|m| m.key) {
        let part = match &m.kind {
            MemberKind::Identifier | MemberKind::Text => Some(1),
            MemberKind::Reference(TypeRef::Concept(target)) => {
                compute_arity(target, types, memo, visiting)?
            }
            MemberKind::Reference(TypeRef::Any) | MemberKind::ReferenceList(_) => None,
        };
        total = match (total, part) {
            (Some(t), Some(p)) => Some(t + p),
            _ => None,
        };
    }
    visiting.pop();
    memo.insert(name.to_owned(), total);
    Ok(total)
}

fn compute_nesting(name: &str, types: &HashMap<String, ConceptType>) -> NestingDepth {
    let mut depth = 0;
    let mut seen = HashSet::new();
    let mut current = name;
    loop {
        if !seen.insert(current) {
            // Self-nesting chain; stop counting.
            return NestingDepth {
                concrete_parent: true,
                depth,
            };
        }
        let Some(parent) = types[current].members.first().filter(|m| m.parent) else {
            return NestingDepth {
                concrete_parent: true,
                depth,
            };
        };
        match parent.kind.target() {
            Some(TypeRef::Concept(target)) if !types[target.as_str()].is_interface => {
                depth += 1;
                current = target;
            }
            _ => {
                return NestingDepth {
                    concrete_parent: false,
                    depth,
                }
            }
        }
    }
}
