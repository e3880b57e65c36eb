//! Tags: named extension points a concept type declares in generated code.
//!
//! A tag evaluates to a marker string for one concept instance. Generators
//! emit markers into a [`CodeBuffer`](crate::CodeBuffer), and other
//! generators later insert text at them.

use crate::error::CodegenError;
use crate::options::CodegenOptions;
use conceptc_core::ConceptNode;
use regex::Regex;
use std::sync::LazyLock;

static SLOT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{(\w+)\}").expect("slot pattern is valid"));

/// How repeated insertions at one marker behave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagDiscipline {
    /// The first insertion replaces the marker; any further one is an error.
    Single,
    /// The marker stays after inserted text, so insertions keep their order.
    Appendable,
    /// The marker stays before inserted text, so the latest insertion comes first.
    Reverse,
}

#[derive(Debug, Clone)]
pub struct Tag {
    concept_type: String,
    name: String,
    discipline: TagDiscipline,
    template: Option<String>,
    wrap: Option<(String, String)>,
}

impl Tag {
    fn new(concept_type: impl Into<String>, name: impl Into<String>, discipline: TagDiscipline) -> Self {
        Tag {
            concept_type: concept_type.into(),
            name: name.into(),
            discipline,
            template: None,
            wrap: None,
        }
    }

    pub fn single(concept_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(concept_type, name, TagDiscipline::Single)
    }

    pub fn appendable(concept_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(concept_type, name, TagDiscipline::Appendable)
    }

    pub fn reverse(concept_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(concept_type, name, TagDiscipline::Reverse)
    }

    /// Custom marker body. `{0}`, `{1}`, ... stand for the concept's key
    /// parts and `{key}` for all of them joined with `.`.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Wrap inserted text differently on the first and on later insertions
    /// at the same marker. `{text}` stands for the inserted text.
    pub fn with_wrap(mut self, first: impl Into<String>, next: impl Into<String>) -> Self {
        self.wrap = Some((first.into(), next.into()));
        self
    }

    pub fn concept_type(&self) -> &str {
        &self.concept_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn discipline(&self) -> TagDiscipline {
        self.discipline
    }

    /// The marker this tag resolves to for `concept`.
    pub fn evaluate(&self, concept: &ConceptNode, options: &CodegenOptions) -> Result<String, CodegenError> {
        if !concept.concept_type().is_a(&self.concept_type) {
            return Err(self.invalid(format!(
                "declared on {} but evaluated for '{}'",
                self.concept_type,
                concept.key()
            )));
        }
        let parts = concept.key_parts();
        if let Some(part) = parts
            .iter()
            .find(|p| p.contains(&options.tag_open) || p.contains(&options.tag_close))
        {
            return Err(self.invalid(format!(
                "key part '{}' of '{}' contains a marker delimiter",
                part,
                concept.key()
            )));
        }
        let body = match &self.template {
            None => format!("{} {} {}", self.concept_type, self.name, parts.join(".")),
            Some(template) => self.fill(template, &parts)?,
        };
        Ok(format!("{}{}{}", options.tag_open, body, options.tag_close))
    }

    pub(crate) fn wrap_text(&self, text: &str, first: bool) -> String {
        match &self.wrap {
            None => text.to_owned(),
            Some((f, _)) if first => f.replace("{text}", text),
            Some((_, n)) => n.replace("{text}", text),
        }
    }

    fn fill(&self, template: &str, parts: &[String]) -> Result<String, CodegenError> {
        let mut out = String::with_capacity(template.len());
        let mut last = 0;
        for caps in SLOT.captures_iter(template) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            out.push_str(&template[last..whole.start()]);
            let value = match name.as_str() {
                "key" => parts.join("."),
                n => match n.parse::<usize>().ok().and_then(|i| parts.get(i)) {
                    Some(part) => part.clone(),
                    None => {
                        return Err(self.invalid(format!(
                            "template slot {{{}}} has no matching key part ({} available)",
                            n,
                            parts.len()
                        )))
                    }
                },
            };
            out.push_str(&value);
            last = whole.end();
        }
        out.push_str(&template[last..]);
        Ok(out)
    }

    fn invalid(&self, message: String) -> CodegenError {
        CodegenError::InvalidTag {
            tag: format!("{}.{}", self.concept_type, self.name),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conceptc_core::{ConceptRegistry, ConceptType, MemberKind, TypeRef};

    fn entity() -> ConceptNode {
        let reg = ConceptRegistry::builder()
            .concept(ConceptType::define("ModuleInfo").key("Name", MemberKind::Identifier))
            .concept(ConceptType::define("DataStructureInfo").parent("Module", TypeRef::concept("ModuleInfo")).key("Name", MemberKind::Identifier))
            .concept(ConceptType::define("EntityInfo").extends("DataStructureInfo"))
            .build()
            .unwrap();
        let module = ConceptNode::new(reg.get("ModuleInfo").unwrap().clone())
            .with_value("Name", "Common")
            .unwrap();
        ConceptNode::new(reg.get("EntityInfo").unwrap().clone())
            .with_ref("Module", &module)
            .unwrap()
            .with_value("Name", "Employee")
            .unwrap()
    }

    #[test]
    fn default_marker_names_type_tag_and_key() {
        let tag = Tag::appendable("DataStructureInfo", "Members");
        let marker = tag.evaluate(&entity(), &CodegenOptions::default()).unwrap();
        assert_eq!(marker, "/*<DataStructureInfo Members Common.Employee>*/");
    }

    #[test]
    fn template_slots_take_key_parts() {
        let tag = Tag::single("EntityInfo", "Table").with_template("table {1} in {0} ({key})");
        let marker = tag.evaluate(&entity(), &CodegenOptions::default()).unwrap();
        assert_eq!(marker, "/*<table Employee in Common (Common.Employee)>*/");
    }

    #[test]
    fn template_slot_out_of_range() {
        let tag = Tag::single("EntityInfo", "Table").with_template("{2}");
        let err = tag.evaluate(&entity(), &CodegenOptions::default()).unwrap_err();
        assert_eq!(err.code(), "GEN0003");
    }

    #[test]
    fn tag_of_unrelated_type_is_rejected() {
        let tag = Tag::single("ModuleInfo", "Body");
        let err = tag.evaluate(&entity(), &CodegenOptions::default()).unwrap_err();
        assert!(err.to_string().contains("ModuleInfo.Body"), "{}", err);
    }

    #[test]
    fn wrap_distinguishes_first_insertion() {
        let tag = Tag::appendable("EntityInfo", "Where").with_wrap("WHERE {text}", " AND {text}");
        assert_eq!(tag.wrap_text("a", true), "WHERE a");
        assert_eq!(tag.wrap_text("b", false), " AND b");
    }
}
