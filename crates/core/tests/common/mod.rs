//! A small concept domain shared by the integration tests: modules,
//! entities, properties and references, with two macros.

#![allow(dead_code)]

use conceptc_core::{
    CompilerOptions, Compiler, ConceptNode, ConceptRegistry, ConceptType, DslError, MacroRegistry,
    MemberKind, TypeRef,
};
use std::sync::Arc;

pub fn registry() -> Arc<ConceptRegistry> {
    Arc::new(
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
            .concept(ConceptType::define("ShortStringPropertyInfo").keyword("ShortString").extends("PropertyInfo"))
            .concept(ConceptType::define("GuidPropertyInfo").extends("PropertyInfo"))
            .concept(
                ConceptType::define("ReferencePropertyInfo")
                    .keyword("Reference")
                    .extends("PropertyInfo")
                    .member("Referenced", MemberKind::Reference(TypeRef::concept("DataStructureInfo"))),
            )
            .concept(
                ConceptType::define("SimpleReferencePropertyInfo")
                    .keyword("Reference")
                    .parent("DataStructure", TypeRef::concept("DataStructureInfo"))
                    .key("Name", MemberKind::Identifier),
            )
            .concept(
                ConceptType::define("UniqueMultiplePropertiesInfo")
                    .keyword("Unique")
                    .parent("DataStructure", TypeRef::concept("DataStructureInfo"))
                    .key("Properties", MemberKind::ReferenceList(TypeRef::concept("PropertyInfo"))),
            )
            .build()
            .expect("test registry is valid"),
    )
}

/// Entities get an `ID` property; `Reference X;` means a reference to the
/// entity `X` in the same module.
pub fn macros(registry: &Arc<ConceptRegistry>) -> MacroRegistry {
    let mut macros = MacroRegistry::new();
    let reg = registry.clone();
    macros.register_fn("EntityInfo", move |entity, _| {
        let id = ConceptNode::new(reg.require("GuidPropertyInfo")?.clone())
            .with_ref("DataStructure", entity)?
            .with_value("Name", "ID")?;
        Ok(vec![id])
    });
    let reg = registry.clone();
    macros.register_fn("SimpleReferencePropertyInfo", move |r, _| {
        simple_reference(&reg, r)
    });
    macros
}

fn simple_reference(reg: &ConceptRegistry, r: &ConceptNode) -> Result<Vec<ConceptNode>, DslError> {
    let owner = r
        .parent()
        .ok_or_else(|| DslError::invalid_concept("reference without owner"))?;
    let name = r.value("Name").unwrap_or_default();
    let module = owner
        .node()
        .reference("Module")
        .ok_or_else(|| DslError::invalid_concept("owner without module"))?;
    let target = ConceptNode::new(reg.require("DataStructureInfo")?.clone())
        .with(
            "Module",
            conceptc_core::MemberValue::Reference(module.clone()),
        )?
        .with_value("Name", name)?;
    let full = ConceptNode::new(reg.require("ReferencePropertyInfo")?.clone())
        .with("DataStructure", conceptc_core::MemberValue::Reference(owner.clone()))?
        .with_value("Name", name)?
        .with_ref("Referenced", &target)?;
    Ok(vec![full])
}

pub fn compiler() -> Compiler {
    let reg = registry();
    let macros = macros(&reg);
    Compiler::new(reg, macros)
}

pub fn compiler_with(options: CompilerOptions) -> Compiler {
    compiler().with_options(options)
}

pub const COMMON: &str = r#"
// Shared module
Module Common
{
    Entity Principal
    {
        ShortString Name;
    }

    Entity Employee
    {
        ShortString Name;
        ShortString Surname;
        Reference Manager Common.Principal;
        Reference Principal;
        Unique 'Name Surname';
    }
}
"#;
