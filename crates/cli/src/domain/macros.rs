//! Macros of the sample domain.

use super::concepts::{
    DATA_STRUCTURE, ENTITY, GUID_PROPERTY, LOGGING, LOG_PROPERTY, PROPERTY, REFERENCE_PROPERTY,
    SIMPLE_REFERENCE,
};
use conceptc_core::{ConceptNode, ConceptRegistry, DslError, DslModel, MacroRegistry, MemberValue};
use std::sync::Arc;

pub fn macros(registry: &Arc<ConceptRegistry>) -> MacroRegistry {
    let mut macros = MacroRegistry::new();

    let reg = registry.clone();
    macros.register_fn(ENTITY, move |entity, _| entity_id(&reg, entity));

    let reg = registry.clone();
    macros.register_fn(SIMPLE_REFERENCE, move |r, _| simple_reference(&reg, r));

    let reg = registry.clone();
    macros.register_model_fn(LOGGING, move |logging, model| log_properties(&reg, logging, model));

    macros
}

/// Every entity gets a `Guid ID` property.
fn entity_id(reg: &ConceptRegistry, entity: &ConceptNode) -> Result<Vec<ConceptNode>, DslError> {
    let id = ConceptNode::new(reg.require(GUID_PROPERTY)?.clone())
        .with_ref("DataStructure", entity)?
        .with_value("Name", "ID")?;
    Ok(vec![id])
}

/// `Reference X;` references the data structure `X` of the owner's module,
/// through a property also named `X`.
fn simple_reference(reg: &ConceptRegistry, r: &ConceptNode) -> Result<Vec<ConceptNode>, DslError> {
    let owner = r
        .parent()
        .ok_or_else(|| DslError::invalid_concept(format!("'{}' has no owner", r.key())))?;
    let module = owner
        .node()
        .reference("Module")
        .ok_or_else(|| DslError::invalid_concept(format!("'{}' has no module", owner.key())))?;
    let name = r.value("Name").unwrap_or_default();

    let target = ConceptNode::new(reg.require(DATA_STRUCTURE)?.clone())
        .with("Module", MemberValue::Reference(module.clone()))?
        .with_value("Name", name)?;
    let full = ConceptNode::new(reg.require(REFERENCE_PROPERTY)?.clone())
        .with("DataStructure", MemberValue::Reference(owner.clone()))?
        .with_value("Name", name)?
        .with_ref("Referenced", &target)?;
    Ok(vec![full])
}

/// A logged entity logs each of its properties, including the ones other
/// macros add later.
fn log_properties(
    reg: &ConceptRegistry,
    logging: &ConceptNode,
    model: &DslModel,
) -> Result<Vec<ConceptNode>, DslError> {
    let Some(entity) = logging.parent() else {
        return Ok(Vec::new());
    };
    let log_type = reg.require(LOG_PROPERTY)?;
    model
        .children(&entity.key())
        .filter(|c| c.concept_type().is_a(PROPERTY))
        .map(|property| {
            ConceptNode::new(log_type.clone())
                .with_ref("Logging", logging)?
                .with_ref("Property", property)
        })
        .collect()
}
