use serde::Deserialize;

/// Tunables of one compilation job.
///
/// Deserializes from the `[compiler]` table of a `conceptc.toml`; every
/// field is optional and falls back to [`CompilerOptions::default`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerOptions {
    /// Upper bound on concepts processed by macro expansion (including
    /// re-evaluation rounds) before giving up as non-convergent.
    pub max_expansion_steps: usize,
    /// How many candidate causes a syntax error message lists.
    pub max_reported_causes: usize,
    /// Each listed cause is cut to this many characters.
    pub max_cause_length: usize,
    /// Treat every warning as an error.
    pub strict_warnings: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        CompilerOptions {
            max_expansion_steps: 200_000,
            max_reported_causes: 5,
            max_cause_length: 300,
            strict_warnings: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let opts: CompilerOptions = serde_json::from_str(r#"{"strict_warnings": true}"#).unwrap();
        assert!(opts.strict_warnings);
        assert_eq!(opts.max_expansion_steps, 200_000);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = serde_json::from_str::<CompilerOptions>(r#"{"max_steps": 3}"#).unwrap_err();
        assert!(err.to_string().contains("max_steps"));
    }
}
