//! Outline generator: a plain-text summary of the compiled model.
//!
//! Every concept type contributes at the tags of the concepts it belongs
//! to; the initialization concept opens the document.

use super::concepts::{
    BROWSE, DATA_STRUCTURE, DESCRIPTION, INITIALIZATION, MODULE, PROPERTY, REQUIRED, UNIQUE,
};
use conceptc_codegen::{CodeGenerator, CodegenError, GenerationContext, GeneratorRegistry, Tag};
use conceptc_core::{ConceptNode, ConceptRef, DslModel, MemberValue};

pub const OUTLINE: &str = "outline.txt";

fn modules_tag() -> Tag {
    Tag::appendable(INITIALIZATION, "Modules")
}

fn members_tag() -> Tag {
    Tag::appendable(MODULE, "Members")
}

fn summary_tag() -> Tag {
    Tag::single(DATA_STRUCTURE, "Summary").with_template("{key} summary")
}

fn properties_tag() -> Tag {
    Tag::appendable(DATA_STRUCTURE, "Properties")
}

fn flags_tag() -> Tag {
    Tag::reverse(PROPERTY, "Flags").with_wrap(" [{text}]", " [{text}]")
}

pub fn generators() -> GeneratorRegistry {
    let mut g = GeneratorRegistry::new();
    g.register(Header)
        .register(Modules)
        .register(DataStructures)
        .register(Properties)
        .register(Flags)
        .register(Uniques)
        .register(Descriptions);
    g
}

fn parent_in<'m>(concept: &ConceptNode, model: &'m DslModel) -> Result<&'m ConceptNode, CodegenError> {
    concept
        .parent()
        .and_then(|p| model.resolve(p))
        .ok_or_else(|| CodegenError::Generator {
            concept_type: concept.type_name().to_owned(),
            concept: concept.key().to_string(),
            message: "owner is not in the model".to_owned(),
        })
}

fn name(concept: &ConceptNode) -> &str {
    concept.value("Name").unwrap_or_default()
}

fn label(concept: &ConceptNode) -> String {
    concept
        .type_name()
        .trim_end_matches("Info")
        .trim_end_matches("Property")
        .to_owned()
}

fn qualified(r: &ConceptRef) -> String {
    r.node().key_parts().join(".")
}

struct Header;

impl CodeGenerator for Header {
    fn concept_type(&self) -> &str {
        INITIALIZATION
    }

    fn generate(&self, concept: &ConceptNode, _: &DslModel, ctx: &mut GenerationContext) -> Result<(), CodegenError> {
        let buf = ctx.buffer(OUTLINE);
        let marker = buf.marker(&modules_tag(), concept)?;
        buf.append("# Concept outline\n");
        buf.append(&marker);
        Ok(())
    }
}

struct Modules;

impl CodeGenerator for Modules {
    fn concept_type(&self) -> &str {
        MODULE
    }

    fn generate(&self, concept: &ConceptNode, model: &DslModel, ctx: &mut GenerationContext) -> Result<(), CodegenError> {
        let buf = ctx.buffer(OUTLINE);
        let members = buf.marker(&members_tag(), concept)?;
        let text = format!("\nmodule {}\n{}", name(concept), members);
        match model.of_type(INITIALIZATION).next() {
            Some(init) => buf.insert(&text, &modules_tag(), init),
            None => {
                buf.append(&text);
                Ok(())
            }
        }
    }
}

struct DataStructures;

impl CodeGenerator for DataStructures {
    fn concept_type(&self) -> &str {
        DATA_STRUCTURE
    }

    fn generate(&self, concept: &ConceptNode, model: &DslModel, ctx: &mut GenerationContext) -> Result<(), CodegenError> {
        let module = parent_in(concept, model)?;
        let buf = ctx.buffer(OUTLINE);
        let summary = buf.marker(&summary_tag(), concept)?;
        let properties = buf.marker(&properties_tag(), concept)?;
        let source = if concept.concept_type().is_a(BROWSE) {
            concept
                .reference("Source")
                .map(|s| format!(" of {}", qualified(s)))
                .unwrap_or_default()
        } else {
            String::new()
        };
        let text = format!(
            "  {} {}{}{}\n{}",
            label(concept).to_lowercase(),
            name(concept),
            source,
            summary,
            properties
        );
        buf.insert(&text, &members_tag(), module)
    }
}

struct Properties;

impl CodeGenerator for Properties {
    fn concept_type(&self) -> &str {
        PROPERTY
    }

    fn generate(&self, concept: &ConceptNode, model: &DslModel, ctx: &mut GenerationContext) -> Result<(), CodegenError> {
        let owner = parent_in(concept, model)?;
        let buf = ctx.buffer(OUTLINE);
        let flags = buf.marker(&flags_tag(), concept)?;
        let target = concept
            .reference("Referenced")
            .map(|r| format!(" -> {}", qualified(r)))
            .unwrap_or_default();
        let text = format!("    - {} : {}{}{}\n", name(concept), label(concept), target, flags);
        buf.insert(&text, &properties_tag(), owner)
    }
}

struct Flags;

impl CodeGenerator for Flags {
    fn concept_type(&self) -> &str {
        REQUIRED
    }

    fn generate(&self, concept: &ConceptNode, model: &DslModel, ctx: &mut GenerationContext) -> Result<(), CodegenError> {
        let property = parent_in(concept, model)?;
        ctx.buffer(OUTLINE).insert("required", &flags_tag(), property)
    }
}

struct Uniques;

impl CodeGenerator for Uniques {
    fn concept_type(&self) -> &str {
        UNIQUE
    }

    fn generate(&self, concept: &ConceptNode, model: &DslModel, ctx: &mut GenerationContext) -> Result<(), CodegenError> {
        let owner = parent_in(concept, model)?;
        let names: Vec<&str> = match concept.get("Properties") {
            Some(MemberValue::List(items)) => items.iter().map(|r| name(r.node())).collect(),
            _ => Vec::new(),
        };
        let text = format!("    unique ({})\n", names.join(", "));
        ctx.buffer(OUTLINE).insert(&text, &properties_tag(), owner)
    }
}

struct Descriptions;

impl CodeGenerator for Descriptions {
    fn concept_type(&self) -> &str {
        DESCRIPTION
    }

    /// Only the first description of a data structure makes it into the
    /// summary; descriptions of other concepts are not part of the outline.
    fn generate(&self, concept: &ConceptNode, model: &DslModel, ctx: &mut GenerationContext) -> Result<(), CodegenError> {
        let target = parent_in(concept, model)?;
        if !target.concept_type().is_a(DATA_STRUCTURE) {
            return Ok(());
        }
        let buf = ctx.buffer(OUTLINE);
        let marker = buf.marker(&summary_tag(), target)?;
        if !buf.tag_exists(&marker) {
            return Ok(());
        }
        let text = format!(" -- {}", concept.value("Text").unwrap_or_default());
        buf.insert(&text, &summary_tag(), target)
    }
}

#[cfg(test)]
mod tests {
    use super::super::{compiler, concepts::registry};
    use super::*;
    use conceptc_codegen::{generate, CodegenOptions};
    use conceptc_core::CompilerOptions;

    fn outline(script: &str) -> String {
        let reg = registry().unwrap();
        let out = compiler(reg, CompilerOptions::default())
            .unwrap()
            .compile_str("outline.dsl", script)
            .unwrap();
        let artifacts = generate(&out.model, &generators(), &CodegenOptions::default()).unwrap();
        artifacts.get(OUTLINE).unwrap().to_owned()
    }

    #[test]
    fn outline_lists_modules_entities_and_properties() {
        let text = outline(
            "Module Common { Entity Employee { ShortString Name { Required; } Description 'Staff'; Description 'Ignored'; } }",
        );
        assert_eq!(
            text,
            "# Concept outline\n\nmodule Common\n  entity Employee -- Staff\n    - Name : ShortString [required]\n    - ID : Guid\n"
        );
    }

    #[test]
    fn references_and_unique_lists() {
        let text = outline(
            "Module M { Entity P; Entity E { Integer Age; Reference Boss M.P; Unique [Age Boss]; } Browse Grid M.E; }",
        );
        assert!(text.contains("    - Boss : Reference -> M.P\n"), "{}", text);
        assert!(text.contains("    unique (Age, Boss)\n"), "{}", text);
        assert!(text.contains("  browse Grid of M.E\n"), "{}", text);
    }
}
