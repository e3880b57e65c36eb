//! Choosing one interpretation when several concept types parse a statement.

use super::generic::Interpretation;
use crate::error::{DslError, DslWarning, ErrorCode, SourceSpan};
use tracing::debug;

/// Pick the single winning interpretation.
///
/// The longest match wins. Among equally long matches the nesting depth of
/// the concept type decides: a concrete parent chain beats an open one, then
/// fewer hops win. A tie after both rules is an ambiguity error; a decided
/// tie yields a warning because the losers can be written with explicit
/// nesting instead.
pub(crate) fn choose(
    mut interpretations: Vec<Interpretation>,
    keyword: &str,
    span: &SourceSpan,
) -> Result<(Interpretation, Option<DslWarning>), DslError> {
    let longest = interpretations.iter().map(|i| i.consumed).max().unwrap_or(0);
    interpretations.retain(|i| i.consumed == longest);

    if interpretations.len() <= 1 {
        return interpretations
            .pop()
            .map(|i| (i, None))
            .ok_or_else(|| DslError::new(ErrorCode::InvalidSyntax, "no interpretation to choose from").at(span.clone()));
    }

    let best = interpretations
        .iter()
        .map(|i| i.node.concept_type().nesting_depth())
        .min()
        .unwrap_or_else(|| interpretations[0].node.concept_type().nesting_depth());
    let (mut winners, losers): (Vec<_>, Vec<_>) = interpretations
        .into_iter()
        .partition(|i| i.node.concept_type().nesting_depth() == best);

    if winners.len() > 1 {
        let names: Vec<&str> = winners.iter().map(|i| i.node.type_name()).collect();
        return Err(DslError::new(
            ErrorCode::AmbiguousSyntax,
            format!(
                "ambiguous syntax for keyword '{}': it matches {}",
                keyword,
                names.join(", ")
            ),
        )
        .at(span.clone())
        .with_causes(
            "several concept types parse this statement equally well; \
             nest the statement inside its intended parent to select one",
        )
        .with_details(names.iter().map(|n| n.to_string()).collect()));
    }

    let winner = winners.remove(0);
    let loser_names: Vec<&str> = losers.iter().map(|i| i.node.type_name()).collect();
    debug!(
        keyword,
        chosen = winner.node.type_name(),
        rejected = ?loser_names,
        "disambiguated by nesting depth"
    );
    let warning = DslWarning::new(
        format!(
            "'{}' interpreted as {} rather than {}; the alternatives can be written by explicit nesting",
            keyword,
            winner.node.type_name(),
            loser_names.join(", ")
        ),
        Some(span.clone()),
    );
    Ok((winner, Some(warning)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::ConceptNode;
    use crate::error::Position;
    use crate::registry::{ConceptRegistry, ConceptType, MemberKind, TypeRef};

    fn span() -> SourceSpan {
        SourceSpan {
            file: "d.dsl".to_owned(),
            begin: Position { line: 1, column: 1 },
            end: Position { line: 1, column: 10 },
        }
    }

    fn registry() -> ConceptRegistry {
        ConceptRegistry::builder()
            .concept(ConceptType::define("Root").keyword("Root").key("Name", MemberKind::Identifier))
            .concept(ConceptType::interface("IAny"))
            .concept(
                ConceptType::define("Shallow")
                    .keyword("Item")
                    .parent("Owner", TypeRef::concept("Root"))
                    .key("Name", MemberKind::Identifier),
            )
            .concept(
                ConceptType::define("Open")
                    .keyword("Item")
                    .parent("Owner", TypeRef::Any)
                    .key("Name", MemberKind::Identifier),
            )
            .concept(
                ConceptType::define("Twin")
                    .keyword("Item")
                    .parent("Owner", TypeRef::concept("Root"))
                    .key("Title", MemberKind::Text),
            )
            .build()
            .unwrap()
    }

    fn interp(reg: &ConceptRegistry, ty: &str, consumed: usize) -> Interpretation {
        Interpretation {
            node: ConceptNode::new(reg.get(ty).unwrap().clone()),
            next: consumed,
            consumed,
            notes: Vec::new(),
        }
    }

    #[test]
    fn longest_match_wins() {
        let reg = registry();
        let (w, warning) = choose(
            vec![interp(&reg, "Shallow", 2), interp(&reg, "Open", 3)],
            "Item",
            &span(),
        )
        .unwrap();
        assert_eq!(w.node.type_name(), "Open");
        assert!(warning.is_none());
    }

    #[test]
    fn concrete_parent_beats_open_parent_with_warning() {
        let reg = registry();
        let (w, warning) = choose(
            vec![interp(&reg, "Open", 2), interp(&reg, "Shallow", 2)],
            "Item",
            &span(),
        )
        .unwrap();
        assert_eq!(w.node.type_name(), "Shallow");
        assert!(warning.unwrap().message.contains("Open"));
    }

    #[test]
    fn equal_depth_is_ambiguous() {
        let reg = registry();
        let err = choose(
            vec![interp(&reg, "Shallow", 2), interp(&reg, "Twin", 2), interp(&reg, "Open", 2)],
            "Item",
            &span(),
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::AmbiguousSyntax);
        assert!(err.message.contains("Shallow"));
        assert!(err.message.contains("Twin"));
        assert!(!err.message.contains("Open"));
    }
}
