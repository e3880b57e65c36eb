//! Descriptor-driven parser for one concept type.
//!
//! Walks the type's member list in order and binds each member from the
//! following tokens or from the nesting context. Parsing never mutates
//! shared state: the same tokens and context always give the same result.

use super::property_list::ParseCache;
use crate::concept::{ConceptNode, ConceptRef, MemberValue};
use crate::error::{DslError, ErrorCode};
use crate::lexer::{Spanned, Token};
use crate::registry::{ConceptRegistry, ConceptType, Member, MemberKind, TypeRef};
use crate::source::Script;
use std::collections::VecDeque;
use std::sync::Arc;

/// Why a concept type did not match a statement.
#[derive(Debug)]
pub enum ParseFailure {
    /// The keyword is not this type's; try other candidates.
    Silent,
    /// The keyword matched but a member did not. Reported only when no
    /// candidate succeeds.
    Explain(String),
    /// A malformed member that aborts the whole compilation.
    Fatal(DslError),
}

/// A successful parse of one statement by one concept type.
#[derive(Debug, Clone)]
pub struct Interpretation {
    pub node: ConceptNode,
    /// Index of the first token after the concept.
    pub next: usize,
    pub consumed: usize,
    /// Advisory notes (deprecated keyword).
    pub notes: Vec<String>,
}

struct Cursor<'t> {
    tokens: &'t [Spanned],
    pos: usize,
}

impl<'t> Cursor<'t> {
    fn cur(&self) -> &'t Spanned {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &'t Token {
        &self.cur().token
    }

    fn advance(&mut self) -> &'t Spanned {
        let t = self.cur();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        t
    }
}

pub struct GenericParser<'a> {
    ty: &'a Arc<ConceptType>,
    registry: &'a ConceptRegistry,
    cache: &'a ParseCache,
}

impl<'a> GenericParser<'a> {
    pub fn new(ty: &'a Arc<ConceptType>, registry: &'a ConceptRegistry, cache: &'a ParseCache) -> Self {
        GenericParser {
            ty,
            registry,
            cache,
        }
    }

    pub fn parse(
        &self,
        tokens: &[Spanned],
        start: usize,
        context: Option<&ConceptNode>,
        script: &Script,
    ) -> Result<Interpretation, ParseFailure> {
        if tokens.is_empty() {
            return Err(ParseFailure::Silent);
        }
        let mut cur = Cursor { tokens, pos: start };
        match (cur.peek(), self.ty.keyword()) {
            (Token::Word(w), Some(kw)) if w == kw => {
                cur.advance();
            }
            _ => return Err(ParseFailure::Silent),
        }

        let mut node = ConceptNode::new(self.ty.clone());
        if let Some(ctx) = context {
            self.bind_parent(&mut node, ctx)?;
        }

        // Parts of a flat `Parent.Child` path left over after the parent.
        let mut pending = VecDeque::new();
        for (idx, member) in self.ty.members().iter().enumerate() {
            if idx == 0 && member.parent && context.is_some() {
                continue;
            }
            let value = if pending.is_empty() {
                self.parse_member(member, &node, &mut cur, &mut pending, script)?
            } else {
                self.member_from_parts(member, &mut pending)?
            };
            node.set_index(idx, value)
                .map_err(|e| ParseFailure::Explain(e.message))?;
        }
        if !pending.is_empty() {
            return Err(ParseFailure::Explain(format!(
                "'{}' has no member for the trailing part(s) '{}'",
                self.ty.name(),
                Vec::from(pending).join(".")
            )));
        }

        let mut notes = Vec::new();
        if let Some(note) = self.ty.deprecated() {
            notes.push(format!(
                "keyword '{}' ({}) is deprecated: {}",
                self.ty.keyword().unwrap_or_default(),
                self.ty.name(),
                note
            ));
        }
        Ok(Interpretation {
            node,
            next: cur.pos,
            consumed: cur.pos - start,
            notes,
        })
    }

    fn bind_parent(&self, node: &mut ConceptNode, ctx: &ConceptNode) -> Result<(), ParseFailure> {
        let Some(parent) = self.ty.parent_member() else {
            return Err(ParseFailure::Explain(format!(
                "'{}' cannot be nested in '{}': it has no parent member",
                self.ty.name(),
                ctx.describe()
            )));
        };
        let MemberKind::Reference(target) = &parent.kind else {
            return Err(ParseFailure::Explain(format!(
                "parent member '{}' of '{}' is not a reference",
                parent.name,
                self.ty.name()
            )));
        };
        if !ctx.concept_type().satisfies(target) {
            return Err(ParseFailure::Explain(format!(
                "'{}' cannot be nested in '{}': member '{}' expects {}",
                self.ty.name(),
                ctx.describe(),
                parent.name,
                target
            )));
        }
        node.set_index(0, MemberValue::Reference(ConceptRef::to(ctx)))
            .map_err(|e| ParseFailure::Explain(e.message))
    }

    fn parse_member(
        &self,
        member: &Member,
        node: &ConceptNode,
        cur: &mut Cursor<'_>,
        pending: &mut VecDeque<String>,
        script: &Script,
    ) -> Result<MemberValue, ParseFailure> {
        match &member.kind {
            MemberKind::Identifier => match cur.peek() {
                Token::Word(w) => {
                    let w = w.clone();
                    cur.advance();
                    Ok(MemberValue::Value(w))
                }
                Token::Str(s) if is_identifier(s) => {
                    let s = s.clone();
                    cur.advance();
                    Ok(MemberValue::Value(s))
                }
                other => Err(self.expected(member, "an identifier", other)),
            },
            MemberKind::Text => match cur.peek() {
                Token::Word(s) | Token::Str(s) => {
                    let s = s.clone();
                    cur.advance();
                    Ok(MemberValue::Value(s))
                }
                other => Err(self.expected(member, "a value", other)),
            },
            MemberKind::Reference(target) => self.parse_reference(member, target, cur, pending),
            MemberKind::ReferenceList(target) => {
                self.parse_reference_list(member, target, node, cur, script)
            }
        }
    }

    fn parse_reference(
        &self,
        member: &Member,
        target: &TypeRef,
        cur: &mut Cursor<'_>,
        pending: &mut VecDeque<String>,
    ) -> Result<MemberValue, ParseFailure> {
        let target_ty = self.referencable(member, target)?;
        let arity = target_ty.reference_arity().unwrap_or(0);
        let mut parts = match cur.peek() {
            Token::Word(w) => vec![w.clone()],
            Token::Str(s) if arity == 1 => vec![s.clone()],
            Token::Path(segments) => segments.clone(),
            other => {
                return Err(self.expected(
                    member,
                    &format!("a reference to {}", target_ty.name()),
                    other,
                ))
            }
        };
        if member.parent && parts.len() > arity {
            pending.extend(parts.split_off(arity));
        }
        if parts.len() != arity {
            return Err(ParseFailure::Explain(format!(
                "member '{}' of '{}': reference '{}' to {} needs {} dot-separated part(s), found {}",
                member.name,
                self.ty.name(),
                parts.join("."),
                target_ty.name(),
                arity,
                parts.len()
            )));
        }
        cur.advance();
        let placeholder =
            build_placeholder(target_ty, &parts, self.registry).map_err(ParseFailure::Explain)?;
        Ok(MemberValue::Reference(ConceptRef::new(placeholder)))
    }

    fn parse_reference_list(
        &self,
        member: &Member,
        target: &TypeRef,
        node: &ConceptNode,
        cur: &mut Cursor<'_>,
        script: &Script,
    ) -> Result<MemberValue, ParseFailure> {
        let start = cur.cur();
        let fatal = |span: &Spanned, msg: String| {
            ParseFailure::Fatal(
                DslError::new(
                    ErrorCode::InvalidPropertyList,
                    format!("invalid property list for '{}': {}", self.ty.name(), msg),
                )
                .at(script.span(span.span.begin, span.span.end)),
            )
        };

        let names = match cur.peek() {
            Token::Str(s) => {
                let names = self.cache.split(s).map_err(|msg| fatal(start, msg))?;
                cur.advance();
                names
            }
            Token::LBracket => {
                cur.advance();
                let mut names = Vec::new();
                loop {
                    let tok = cur.cur();
                    match &tok.token {
                        Token::RBracket => {
                            cur.advance();
                            break;
                        }
                        Token::Word(w) => {
                            names.push(w.clone());
                            cur.advance();
                        }
                        Token::Path(p) => {
                            return Err(fatal(
                                tok,
                                format!(
                                    "property list element '{}' must be a bare name without a dot",
                                    p.join(".")
                                ),
                            ))
                        }
                        other => {
                            return Err(fatal(
                                tok,
                                format!("expected a name or ']' in property list, found {}", other),
                            ))
                        }
                    }
                }
                if names.is_empty() {
                    return Err(fatal(start, "property list is empty".to_owned()));
                }
                names
            }
            other => return Err(self.expected(member, "a property list", other)),
        };

        let target_ty = match target {
            TypeRef::Concept(name) => self
                .registry
                .get(name)
                .ok_or_else(|| ParseFailure::Explain(format!("unknown concept type '{}'", name)))?,
            TypeRef::Any => {
                return Err(ParseFailure::Explain(format!(
                    "member '{}' of '{}' lists open references and cannot be written in a script",
                    member.name,
                    self.ty.name()
                )))
            }
        };

        let mut items = Vec::with_capacity(names.len());
        for name in names {
            let element = list_element(target_ty, &name, node, self.registry)
                .map_err(|msg| fatal(start, msg))?;
            items.push(ConceptRef::new(element));
        }
        Ok(MemberValue::List(items))
    }

    /// Bind a member from the rest of a flat dotted path.
    fn member_from_parts(
        &self,
        member: &Member,
        pending: &mut VecDeque<String>,
    ) -> Result<MemberValue, ParseFailure> {
        match &member.kind {
            MemberKind::Identifier | MemberKind::Text => pending
                .pop_front()
                .map(MemberValue::Value)
                .ok_or_else(|| ParseFailure::Explain("dotted path ended early".to_owned())),
            MemberKind::Reference(target) => {
                let target_ty = self.referencable(member, target)?;
                let arity = target_ty.reference_arity().unwrap_or(0);
                if pending.len() < arity {
                    return Err(ParseFailure::Explain(format!(
                        "member '{}' of '{}' needs {} more dotted part(s)",
                        member.name,
                        self.ty.name(),
                        arity
                    )));
                }
                let parts: Vec<String> = pending.drain(..arity).collect();
                let placeholder = build_placeholder(target_ty, &parts, self.registry)
                    .map_err(ParseFailure::Explain)?;
                Ok(MemberValue::Reference(ConceptRef::new(placeholder)))
            }
            MemberKind::ReferenceList(_) => Err(ParseFailure::Explain(format!(
                "property list '{}' of '{}' cannot be part of a dotted path",
                member.name,
                self.ty.name()
            ))),
        }
    }

    /// The concrete type a textual reference to `target` names.
    fn referencable(
        &self,
        member: &Member,
        target: &TypeRef,
    ) -> Result<&'a Arc<ConceptType>, ParseFailure> {
        let not_textual = || {
            ParseFailure::Explain(format!(
                "member '{}' of '{}' references {} and can only be bound by nesting",
                member.name,
                self.ty.name(),
                target
            ))
        };
        let TypeRef::Concept(name) = target else {
            return Err(not_textual());
        };
        let ty = self
            .registry
            .get(name)
            .ok_or_else(|| ParseFailure::Explain(format!("unknown concept type '{}'", name)))?;
        match ty.reference_arity() {
            Some(n) if n > 0 && !ty.is_interface() => Ok(ty),
            _ => Err(not_textual()),
        }
    }

    fn expected(&self, member: &Member, what: &str, found: &Token) -> ParseFailure {
        ParseFailure::Explain(format!(
            "member '{}' of '{}' expects {}, found {}",
            member.name,
            self.ty.name(),
            what,
            found
        ))
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Build a reference placeholder of `ty` from dot-separated key parts. The
/// caller checks `parts.len()` against the type's reference arity.
pub(crate) fn build_placeholder(
    ty: &Arc<ConceptType>,
    parts: &[String],
    registry: &ConceptRegistry,
) -> Result<ConceptNode, String> {
    let mut node = ConceptNode::new(ty.clone());
    let mut offset = 0;
    let key_members: Vec<_> = ty.key_members().collect();
    for (idx, member) in key_members {
        let value = match &member.kind {
            MemberKind::Identifier | MemberKind::Text => {
                let part = parts
                    .get(offset)
                    .ok_or_else(|| format!("too few parts for a reference to {}", ty.name()))?;
                offset += 1;
                MemberValue::Value(part.clone())
            }
            MemberKind::Reference(TypeRef::Concept(name)) => {
                let inner = registry
                    .get(name)
                    .ok_or_else(|| format!("unknown concept type '{}'", name))?;
                let n = inner
                    .reference_arity()
                    .ok_or_else(|| format!("{} cannot be referenced by name", inner.name()))?;
                let slice = parts
                    .get(offset..offset + n)
                    .ok_or_else(|| format!("too few parts for a reference to {}", ty.name()))?;
                offset += n;
                MemberValue::Reference(ConceptRef::new(build_placeholder(inner, slice, registry)?))
            }
            _ => return Err(format!("{} cannot be referenced by name", ty.name())),
        };
        node.set_index(idx, value).map_err(|e| e.message)?;
    }
    Ok(node)
}

/// One element of a property list. Lists name siblings: when the target
/// type is keyed by (parent, name) the element shares the listing concept's
/// parent; otherwise the name must be a complete one-part reference.
fn list_element(
    target: &Arc<ConceptType>,
    name: &str,
    listing: &ConceptNode,
    registry: &ConceptRegistry,
) -> Result<ConceptNode, String> {
    let keys: Vec<_> = target.key_members().collect();
    if let [(0, parent), (name_idx, name_member)] = keys.as_slice() {
        if parent.parent
            && matches!(name_member.kind, MemberKind::Identifier | MemberKind::Text)
        {
            let owner = listing.parent().ok_or_else(|| {
                format!(
                    "'{}' lists {} elements but is not nested in a concept that owns them",
                    listing.type_name(),
                    target.name()
                )
            })?;
            let mut node = ConceptNode::new(target.clone());
            node.set_index(0, MemberValue::Reference(owner.clone()))
                .map_err(|e| e.message)?;
            node.set_index(*name_idx, MemberValue::Value(name.to_owned()))
                .map_err(|e| e.message)?;
            return Ok(node);
        }
    }
    match target.reference_arity() {
        Some(1) => build_placeholder(target, &[name.to_owned()], registry),
        _ => Err(format!(
            "'{}' cannot be listed by a bare name: {} is not keyed by a single name",
            name,
            target.name()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::source::ScriptId;

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
                ConceptType::define("PropertyInfo")
                    .parent("DataStructure", TypeRef::concept("DataStructureInfo"))
                    .key("Name", MemberKind::Identifier),
            )
            .concept(
                ConceptType::define("ShortStringPropertyInfo")
                    .keyword("ShortString")
                    .extends("PropertyInfo"),
            )
            .concept(
                ConceptType::define("ReferencePropertyInfo")
                    .keyword("Reference")
                    .extends("PropertyInfo")
                    .member("Referenced", MemberKind::Reference(TypeRef::concept("DataStructureInfo"))),
            )
            .concept(
                ConceptType::define("UniqueMultiplePropertiesInfo")
                    .keyword("Unique")
                    .parent("DataStructure", TypeRef::concept("DataStructureInfo"))
                    .key("Properties", MemberKind::ReferenceList(TypeRef::concept("PropertyInfo")))
                    .deprecated("use UniqueMultiple"),
            )
            .build()
            .unwrap()
    }

    fn entity(reg: &ConceptRegistry) -> ConceptNode {
        let module = ConceptNode::new(reg.get("ModuleInfo").unwrap().clone())
            .with_value("Name", "Common")
            .unwrap();
        ConceptNode::new(reg.get("EntityInfo").unwrap().clone())
            .with_ref("Module", &module)
            .unwrap()
            .with_value("Name", "Employee")
            .unwrap()
    }

    fn run(
        reg: &ConceptRegistry,
        type_name: &str,
        src: &str,
        context: Option<&ConceptNode>,
    ) -> Result<Interpretation, ParseFailure> {
        let script = Script::new("t.dsl", src);
        let tokens = lex(&script, ScriptId(0)).unwrap();
        let cache = ParseCache::new();
        let ty = reg.get(type_name).unwrap();
        GenericParser::new(ty, reg, &cache).parse(&tokens, 0, context, &script)
    }

    #[test]
    fn other_keyword_fails_silently() {
        let reg = registry();
        assert!(matches!(
            run(&reg, "EntityInfo", "Module Common;", None),
            Err(ParseFailure::Silent)
        ));
    }

    #[test]
    fn explicit_parent_reference_without_context() {
        let reg = registry();
        let i = run(&reg, "EntityInfo", "Entity Common.Employee;", None).unwrap();
        assert_eq!(i.consumed, 2);
        assert_eq!(i.node.key().as_str(), "DataStructureInfo Common.Employee");
    }

    #[test]
    fn flat_path_fills_parent_and_following_keys() {
        let reg = registry();
        let i = run(
            &reg,
            "ReferencePropertyInfo",
            "Reference Common.Employee.Boss Common.Principal;",
            None,
        )
        .unwrap();
        assert_eq!(i.consumed, 3);
        assert_eq!(i.node.key().as_str(), "PropertyInfo Common.Employee.Boss");
        assert_eq!(
            i.node.reference("Referenced").unwrap().key().as_str(),
            "DataStructureInfo Common.Principal"
        );
    }

    #[test]
    fn flat_path_with_extra_parts_is_explained() {
        let reg = registry();
        match run(&reg, "EntityInfo", "Entity Common.Employee.Extra;", None) {
            Err(ParseFailure::Explain(msg)) => assert!(msg.contains("trailing")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn parent_bound_from_context() {
        let reg = registry();
        let ctx = entity(&reg);
        let i = run(&reg, "ShortStringPropertyInfo", "ShortString \"Name\";", Some(&ctx)).unwrap();
        assert_eq!(i.consumed, 2);
        assert_eq!(i.node.key().as_str(), "PropertyInfo Common.Employee.Name");
    }

    #[test]
    fn wrong_context_is_explained() {
        let reg = registry();
        let module = ConceptNode::new(reg.get("ModuleInfo").unwrap().clone())
            .with_value("Name", "Common")
            .unwrap();
        match run(&reg, "ShortStringPropertyInfo", "ShortString Name;", Some(&module)) {
            Err(ParseFailure::Explain(msg)) => assert!(msg.contains("cannot be nested in")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn reference_with_wrong_part_count_is_explained() {
        let reg = registry();
        let ctx = entity(&reg);
        match run(&reg, "ReferencePropertyInfo", "Reference Boss Principal;", Some(&ctx)) {
            Err(ParseFailure::Explain(msg)) => assert!(msg.contains("needs 2")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn property_list_elements_share_the_parent() {
        let reg = registry();
        let ctx = entity(&reg);
        let i = run(
            &reg,
            "UniqueMultiplePropertiesInfo",
            "Unique 'Name Surname';",
            Some(&ctx),
        )
        .unwrap();
        match i.node.get("Properties") {
            Some(MemberValue::List(items)) => {
                let keys: Vec<_> = items.iter().map(|r| r.key().to_string()).collect();
                assert_eq!(
                    keys,
                    vec![
                        "PropertyInfo Common.Employee.Name",
                        "PropertyInfo Common.Employee.Surname"
                    ]
                );
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(i.notes.len(), 1);
        assert!(i.notes[0].contains("deprecated"));
    }

    #[test]
    fn malformed_property_list_is_fatal() {
        let reg = registry();
        let ctx = entity(&reg);
        match run(&reg, "UniqueMultiplePropertiesInfo", "Unique 'Name  Surname';", Some(&ctx)) {
            Err(ParseFailure::Fatal(e)) => {
                assert_eq!(e.code, ErrorCode::InvalidPropertyList);
                assert!(e.span.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
        match run(&reg, "UniqueMultiplePropertiesInfo", "Unique [Name Common.Surname];", Some(&ctx)) {
            Err(ParseFailure::Fatal(e)) => assert!(e.message.contains("without a dot")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn bracket_list_form() {
        let reg = registry();
        let ctx = entity(&reg);
        let i = run(&reg, "UniqueMultiplePropertiesInfo", "Unique [Name Surname];", Some(&ctx)).unwrap();
        assert_eq!(i.consumed, 5);
    }
}
