//! Concept types of the built-in sample domain.
//!
//! ```text
//! Module Common
//! {
//!     Entity Employee
//!     {
//!         ShortString Name { Required; }
//!         Integer Age;
//!         Reference Manager Common.Principal;
//!         Reference Principal;
//!         Unique 'Name Age';
//!         Logging;
//!         Description "People on the payroll";
//!     }
//!     Browse EmployeeGrid Common.Employee;
//! }
//! ```

use conceptc_core::{ConceptNode, ConceptRegistry, ConceptType, DslError, MemberKind, TypeRef};
use std::sync::Arc;

pub const INITIALIZATION: &str = "InitializationConcept";
pub const MODULE: &str = "ModuleInfo";
pub const DATA_STRUCTURE: &str = "DataStructureInfo";
pub const ENTITY: &str = "EntityInfo";
pub const BROWSE: &str = "BrowseInfo";
pub const PROPERTY: &str = "PropertyInfo";
pub const GUID_PROPERTY: &str = "GuidPropertyInfo";
pub const REFERENCE_PROPERTY: &str = "ReferencePropertyInfo";
pub const SIMPLE_REFERENCE: &str = "SimpleReferencePropertyInfo";
pub const REQUIRED: &str = "RequiredPropertyInfo";
pub const UNIQUE: &str = "UniqueMultiplePropertiesInfo";
pub const LOGGING: &str = "LoggingInfo";
pub const LOG_PROPERTY: &str = "LogPropertyInfo";
pub const DESCRIPTION: &str = "DescriptionInfo";

fn data_structure() -> TypeRef {
    TypeRef::concept(DATA_STRUCTURE)
}

pub fn registry() -> Result<Arc<ConceptRegistry>, DslError> {
    let registry = ConceptRegistry::builder()
        .concept(ConceptType::define(INITIALIZATION))
        .concept(ConceptType::define(MODULE).keyword("Module").key("Name", MemberKind::Identifier))
        .concept(
            ConceptType::define(DATA_STRUCTURE)
                .parent("Module", TypeRef::concept(MODULE))
                .key("Name", MemberKind::Identifier),
        )
        .concept(ConceptType::define(ENTITY).keyword("Entity").extends(DATA_STRUCTURE))
        .concept(
            ConceptType::define(BROWSE)
                .keyword("Browse")
                .extends(DATA_STRUCTURE)
                .member("Source", MemberKind::Reference(data_structure())),
        )
        .concept(
            ConceptType::define(PROPERTY)
                .parent("DataStructure", data_structure())
                .key("Name", MemberKind::Identifier),
        )
        .concept(ConceptType::define("ShortStringPropertyInfo").keyword("ShortString").extends(PROPERTY))
        .concept(ConceptType::define("IntegerPropertyInfo").keyword("Integer").extends(PROPERTY))
        .concept(
            ConceptType::define("TextPropertyInfo")
                .keyword("Text")
                .extends(PROPERTY)
                .deprecated("use ShortString, or a dedicated long text property"),
        )
        .concept(ConceptType::define(GUID_PROPERTY).extends(PROPERTY))
        .concept(
            ConceptType::define(REFERENCE_PROPERTY)
                .keyword("Reference")
                .extends(PROPERTY)
                .member("Referenced", MemberKind::Reference(data_structure())),
        )
        .concept(
            ConceptType::define(SIMPLE_REFERENCE)
                .keyword("Reference")
                .parent("DataStructure", data_structure())
                .key("Name", MemberKind::Identifier),
        )
        .concept(
            ConceptType::define(REQUIRED)
                .keyword("Required")
                .parent("Property", TypeRef::concept(PROPERTY)),
        )
        .concept(
            ConceptType::define(UNIQUE)
                .keyword("Unique")
                .parent("DataStructure", data_structure())
                .key("Properties", MemberKind::ReferenceList(TypeRef::concept(PROPERTY))),
        )
        .concept(
            ConceptType::define(LOGGING)
                .keyword("Logging")
                .parent("Entity", TypeRef::concept(ENTITY)),
        )
        .concept(
            ConceptType::define(LOG_PROPERTY)
                .parent("Logging", TypeRef::concept(LOGGING))
                .key("Property", MemberKind::Reference(TypeRef::concept(PROPERTY))),
        )
        .concept(
            ConceptType::define(DESCRIPTION)
                .keyword("Description")
                .parent("Target", TypeRef::Any)
                .key("Text", MemberKind::Text),
        )
        .build()?;
    Ok(Arc::new(registry))
}

/// The root concept every compilation starts from.
pub fn initialization(registry: &ConceptRegistry) -> Result<ConceptNode, DslError> {
    Ok(ConceptNode::new(registry.require(INITIALIZATION)?.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_registry_builds() {
        let reg = registry().unwrap();
        assert_eq!(reg.with_keyword("Reference").count(), 2);
        assert!(reg.get(ENTITY).unwrap().is_a(DATA_STRUCTURE));
        assert!(reg.get("TextPropertyInfo").unwrap().deprecated().is_some());
    }
}
