use serde::{Serialize, Serializer};
use std::fmt;

/// Stable, machine-readable error codes. The string form never changes once
/// published; tooling matches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Malformed token (unterminated string, stray dot, ...).
    Lexical,
    /// No interpretation of a statement succeeded.
    InvalidSyntax,
    /// The statement keyword is not declared by any concept type.
    UnrecognizedKeyword,
    /// A statement started with something that is not a keyword.
    ExpectedKeyword,
    /// A concept was not followed by `;` or `{`.
    MissingTerminator,
    /// A `}` without a matching open concept.
    UnexpectedClosingBrace,
    /// End of script reached while a concept was still open.
    UnclosedConcept,
    /// More than one interpretation survived disambiguation.
    AmbiguousSyntax,
    /// Malformed property list member.
    InvalidPropertyList,
    /// Two distinct concepts share one key.
    DuplicateKey,
    /// A reference never matched a concept in the model.
    UnresolvedReference,
    /// A reference matched a concept of an incompatible type.
    ReferenceTypeMismatch,
    /// Concepts reference each other in a cycle.
    DependencyCycle,
    /// Macro expansion exceeded its step bound.
    ExpansionDiverged,
    /// A warning raised while strict mode is on.
    StrictWarning,
    /// A concept instance violates its type (missing or mistyped member).
    InvalidConcept,
    /// The concept type registry or macro registry is inconsistent.
    InvalidRegistry,
    /// A macro returned an error of its own.
    MacroFailed,
    /// A script could not be read.
    Source,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Lexical => "DSL0001",
            ErrorCode::InvalidSyntax => "DSL0002",
            ErrorCode::UnrecognizedKeyword => "DSL0003",
            ErrorCode::ExpectedKeyword => "DSL0004",
            ErrorCode::MissingTerminator => "DSL0005",
            ErrorCode::UnexpectedClosingBrace => "DSL0006",
            ErrorCode::UnclosedConcept => "DSL0007",
            ErrorCode::AmbiguousSyntax => "DSL0008",
            ErrorCode::InvalidPropertyList => "DSL0009",
            ErrorCode::DuplicateKey => "DSL0010",
            ErrorCode::UnresolvedReference => "DSL0011",
            ErrorCode::ReferenceTypeMismatch => "DSL0012",
            ErrorCode::DependencyCycle => "DSL0013",
            ErrorCode::ExpansionDiverged => "DSL0014",
            ErrorCode::StrictWarning => "DSL0015",
            ErrorCode::InvalidConcept => "DSL0016",
            ErrorCode::InvalidRegistry => "DSL0017",
            ErrorCode::MacroFailed => "DSL0018",
            ErrorCode::Source => "DSL0019",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// 1-based line and column (columns count characters, not bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

/// A user-facing source location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSpan {
    pub file: String,
    pub begin: Position,
    pub end: Position,
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.begin.line, self.begin.column)
    }
}

/// A compilation error. Every error is fatal to the compilation job.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("{code}: {message}{}", .span.as_ref().map(|s| format!(" (at {})", s)).unwrap_or_default())]
pub struct DslError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub possible_causes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<SourceSpan>,
    /// Full, untruncated detail lines (all candidate causes, derivation
    /// chains). Meant for logs, not for the condensed console message.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl DslError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        DslError {
            code,
            message: message.into(),
            possible_causes: None,
            span: None,
            details: Vec::new(),
        }
    }

    pub fn at(mut self, span: SourceSpan) -> Self {
        self.span = Some(span);
        self
    }

    pub fn at_opt(mut self, span: Option<SourceSpan>) -> Self {
        if span.is_some() {
            self.span = span;
        }
        self
    }

    pub fn with_causes(mut self, causes: impl Into<String>) -> Self {
        self.possible_causes = Some(causes.into());
        self
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }

    pub fn lexical(span: SourceSpan, message: impl Into<String>) -> Self {
        DslError::new(ErrorCode::Lexical, message).at(span)
    }

    pub fn registry(message: impl Into<String>) -> Self {
        DslError::new(ErrorCode::InvalidRegistry, message)
    }

    pub fn invalid_concept(message: impl Into<String>) -> Self {
        DslError::new(ErrorCode::InvalidConcept, message)
    }

    /// Serialize to JSON for tooling. Always includes every field (null for
    /// missing) so consumers can rely on a fixed shape.
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "code":            self.code.as_str(),
            "message":         self.message,
            "possible_causes": self.possible_causes,
            "span":            self.span,
            "details":         self.details,
        })
    }
}

/// An advisory diagnostic. Warnings never abort compilation unless strict
/// mode turns them into [`ErrorCode::StrictWarning`] errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DslWarning {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<SourceSpan>,
}

impl DslWarning {
    pub fn new(message: impl Into<String>, span: Option<SourceSpan>) -> Self {
        DslWarning {
            message: message.into(),
            span,
        }
    }

    pub fn into_error(self) -> DslError {
        DslError::new(ErrorCode::StrictWarning, self.message)
            .at_opt(self.span)
            .with_causes("strict mode treats every warning as an error")
    }
}

impl fmt::Display for DslWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.span {
            Some(span) => write!(f, "warning: {} (at {})", self.message, span),
            None => write!(f, "warning: {}", self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> SourceSpan {
        SourceSpan {
            file: "model.dsl".to_owned(),
            begin: Position { line: 3, column: 5 },
            end: Position { line: 3, column: 9 },
        }
    }

    #[test]
    fn display_includes_code_and_location() {
        let err = DslError::new(ErrorCode::UnclosedConcept, "concept left open").at(span());
        assert_eq!(
            err.to_string(),
            "DSL0007: concept left open (at model.dsl:3:5)"
        );
    }

    #[test]
    fn json_value_has_fixed_shape() {
        let err = DslError::new(ErrorCode::DuplicateKey, "dup");
        let v = err.to_json_value();
        assert_eq!(v["code"], "DSL0010");
        assert!(v["span"].is_null());
        assert!(v["possible_causes"].is_null());
        assert_eq!(v["details"], serde_json::json!([]));
    }

    #[test]
    fn strict_warning_keeps_span() {
        let err = DslWarning::new("preferred A over B", Some(span())).into_error();
        assert_eq!(err.code, ErrorCode::StrictWarning);
        assert_eq!(err.span, Some(span()));
    }
}
