//! JSON rendering of a finished model.
//!
//! Output shape:
//! `{"concepts":[{"key":..,"type":..,"members":{name: value}}]}` with
//! concepts sorted by key. Values are strings, references render as the
//! referenced key and lists as arrays of keys.

use crate::concept::MemberValue;
use crate::model::DslModel;
use serde_json::{json, Map, Value};

pub fn serialize_model(model: &DslModel) -> Value {
    let mut entries: Vec<_> = model.entries().iter().collect();
    entries.sort_by(|a, b| a.key.cmp(&b.key));

    let concepts: Vec<Value> = entries
        .into_iter()
        .map(|entry| {
            let mut members = Map::new();
            for (member, value) in entry.node.members() {
                let v = match value {
                    Some(MemberValue::Value(s)) => Value::String(s.clone()),
                    Some(MemberValue::Reference(r)) => Value::String(r.key().to_string()),
                    Some(MemberValue::List(items)) => {
                        Value::Array(items.iter().map(|r| Value::String(r.key().to_string())).collect())
                    }
                    None => Value::Null,
                };
                members.insert(member.name.clone(), v);
            }
            json!({
                "key": entry.key,
                "type": entry.node.type_name(),
                "members": members,
            })
        })
        .collect();

    json!({ "concepts": concepts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::ConceptNode;
    use crate::model::ConceptOrigin;
    use crate::registry::{ConceptRegistry, ConceptType, MemberKind, TypeRef};
    use std::sync::Arc;

    #[test]
    fn concepts_sorted_by_key_with_reference_keys() {
        let reg = Arc::new(
            ConceptRegistry::builder()
                .concept(ConceptType::define("ModuleInfo").key("Name", MemberKind::Identifier))
                .concept(
                    ConceptType::define("EntityInfo")
                        .parent("Module", TypeRef::concept("ModuleInfo"))
                        .key("Name", MemberKind::Identifier),
                )
                .build()
                .unwrap(),
        );
        let m = ConceptNode::new(reg.get("ModuleInfo").unwrap().clone())
            .with_value("Name", "Common")
            .unwrap();
        let e = ConceptNode::new(reg.get("EntityInfo").unwrap().clone())
            .with_ref("Module", &m)
            .unwrap()
            .with_value("Name", "Employee")
            .unwrap();
        let mut model = DslModel::new(reg);
        model.insert(m, ConceptOrigin::Initial).unwrap();
        model.insert(e, ConceptOrigin::Initial).unwrap();

        let v = serialize_model(&model);
        assert_eq!(v["concepts"][0]["key"], "EntityInfo Common.Employee");
        assert_eq!(v["concepts"][0]["members"]["Module"], "ModuleInfo Common");
        assert_eq!(v["concepts"][1]["type"], "ModuleInfo");
    }
}
