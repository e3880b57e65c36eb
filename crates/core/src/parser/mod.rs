//! Statement-level parsing: drives the token stream of each script, runs
//! every candidate [`GenericParser`] for a keyword, picks one interpretation
//! and tracks the `{ }` nesting context.

use crate::concept::ConceptNode;
use crate::config::CompilerOptions;
use crate::error::{DslError, DslWarning, ErrorCode, SourceSpan};
use crate::lexer::{lex, Spanned, Token};
use crate::registry::ConceptRegistry;
use crate::source::{Script, ScriptId, SourceMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

mod disambiguate;
mod generic;
mod property_list;

pub use generic::{GenericParser, Interpretation, ParseFailure};
pub use property_list::{split_property_list, ParseCache};

/// A concept read from a script, with the span of its statement.
#[derive(Debug, Clone)]
pub struct ParsedConcept {
    pub node: ConceptNode,
    pub span: SourceSpan,
}

#[derive(Debug, Default)]
pub struct ParseOutput {
    /// Concepts in script order, parents before the concepts nested in them.
    pub concepts: Vec<ParsedConcept>,
    pub warnings: Vec<DslWarning>,
}

pub struct DslParser<'r> {
    registry: &'r ConceptRegistry,
    options: &'r CompilerOptions,
    cache: Arc<ParseCache>,
}

impl<'r> DslParser<'r> {
    pub fn new(registry: &'r ConceptRegistry, options: &'r CompilerOptions, cache: Arc<ParseCache>) -> Self {
        DslParser {
            registry,
            options,
            cache,
        }
    }

    /// Parse every script of `sources`. Nesting never crosses scripts.
    pub fn parse(&self, sources: &SourceMap) -> Result<ParseOutput, DslError> {
        let mut out = ParseOutput::default();
        for (id, script) in sources.iter() {
            self.parse_script(id, script, &mut out)?;
        }
        info!(
            scripts = sources.len(),
            concepts = out.concepts.len(),
            warnings = out.warnings.len(),
            "parsed scripts"
        );
        Ok(out)
    }

    fn parse_script(&self, id: ScriptId, script: &Script, out: &mut ParseOutput) -> Result<(), DslError> {
        let tokens = lex(script, id)?;
        debug!(script = script.name(), tokens = tokens.len(), "tokenized");

        let mut stack: Vec<ParsedConcept> = Vec::new();
        let mut pos = 0;
        loop {
            let tok = &tokens[pos];
            match &tok.token {
                Token::Eof => {
                    if let Some(open) = stack.last() {
                        return Err(DslError::new(
                            ErrorCode::UnclosedConcept,
                            format!(
                                "'{}' is not closed: expected '}}' before the end of {}",
                                open.node.describe(),
                                script.name()
                            ),
                        )
                        .at(open.span.clone())
                        .with_causes("every '{' must be matched by a '}' in the same script"));
                    }
                    return Ok(());
                }
                Token::RBrace => {
                    if stack.pop().is_none() {
                        return Err(DslError::new(
                            ErrorCode::UnexpectedClosingBrace,
                            "unexpected '}': no concept is open",
                        )
                        .at(span_of(script, tok, tok)));
                    }
                    pos += 1;
                }
                Token::Word(keyword) => {
                    let keyword = keyword.clone();
                    let (parsed, next) = self.parse_statement(&tokens, pos, &keyword, &stack, script, out)?;
                    let term = &tokens[next];
                    match term.token {
                        Token::LBrace => {
                            out.concepts.push(parsed.clone());
                            stack.push(parsed);
                        }
                        Token::Semicolon => out.concepts.push(parsed),
                        ref other => {
                            return Err(DslError::new(
                                ErrorCode::MissingTerminator,
                                format!(
                                    "expected ';' or '{{' after '{}', found {}",
                                    parsed.node.describe(),
                                    other
                                ),
                            )
                            .at(span_of(script, term, term)));
                        }
                    }
                    pos = next + 1;
                }
                other => {
                    return Err(DslError::new(
                        ErrorCode::ExpectedKeyword,
                        format!("expected a concept keyword, found {}", other),
                    )
                    .at(span_of(script, tok, tok)));
                }
            }
        }
    }

    /// Parse one statement starting at `pos`. Returns the concept and the
    /// index of the token following it.
    fn parse_statement(
        &self,
        tokens: &[Spanned],
        pos: usize,
        keyword: &str,
        stack: &[ParsedConcept],
        script: &Script,
        out: &mut ParseOutput,
    ) -> Result<(ParsedConcept, usize), DslError> {
        let head = &tokens[pos];
        let context = stack.last().map(|p| &p.node);

        let candidates: Vec<_> = self.registry.with_keyword(keyword).collect();
        if candidates.is_empty() {
            return Err(DslError::new(
                ErrorCode::UnrecognizedKeyword,
                format!("unrecognized concept keyword '{}'", keyword),
            )
            .at(span_of(script, head, head)));
        }

        let mut interpretations = Vec::new();
        let mut causes = Vec::new();
        for ty in candidates {
            let parser = GenericParser::new(ty, self.registry, &self.cache);
            match parser.parse(tokens, pos, context, script) {
                Ok(i) => interpretations.push(i),
                Err(ParseFailure::Silent) => {}
                Err(ParseFailure::Explain(reason)) => {
                    debug!(keyword, candidate = ty.name(), %reason, "candidate rejected");
                    causes.push(reason);
                }
                Err(ParseFailure::Fatal(e)) => return Err(e),
            }
        }

        // Every candidate declares `keyword`, so none of them fails silently.
        if interpretations.is_empty() {
            return Err(DslError::new(
                ErrorCode::InvalidSyntax,
                format!("invalid syntax for '{}'", keyword),
            )
            .at(span_of(script, head, head))
            .with_causes(self.condense(&causes))
            .with_details(causes));
        }

        let last = interpretations
            .iter()
            .map(|i| i.next)
            .max()
            .unwrap_or(pos + 1)
            .saturating_sub(1)
            .max(pos);
        let span = span_of(script, head, &tokens[last]);
        let (chosen, warning) = disambiguate::choose(interpretations, keyword, &span)?;

        let span = span_of(script, head, &tokens[chosen.next.saturating_sub(1).max(pos)]);
        for note in &chosen.notes {
            warn!(%span, "{}", note);
            out.warnings.push(DslWarning::new(note.clone(), Some(span.clone())));
        }
        if let Some(w) = warning {
            out.warnings.push(w);
        }
        debug!(concept = %chosen.node.key(), "parsed");
        Ok((
            ParsedConcept {
                node: chosen.node,
                span,
            },
            chosen.next,
        ))
    }

    /// Bounded, truncated list of causes for the console message.
    fn condense(&self, causes: &[String]) -> String {
        let max_len = self.options.max_cause_length;
        let mut lines: Vec<String> = causes
            .iter()
            .take(self.options.max_reported_causes)
            .map(|c| {
                if c.chars().count() > max_len {
                    format!("{}...", c.chars().take(max_len).collect::<String>())
                } else {
                    c.clone()
                }
            })
            .collect();
        if causes.len() > self.options.max_reported_causes {
            lines.push(format!(
                "... and {} more",
                causes.len() - self.options.max_reported_causes
            ));
        }
        lines.join("\n")
    }
}

fn span_of(script: &Script, first: &Spanned, last: &Spanned) -> SourceSpan {
    script.span(first.span.begin, last.span.end)
}
