//! `conceptc.toml` configuration.
//!
//! # Example
//!
//! ```toml
//! [compiler]
//! max_expansion_steps = 50000
//! max_reported_causes = 3
//! strict_warnings = true
//!
//! [codegen]
//! tag_open = "<%"
//! tag_close = "%>"
//! ```

use std::path::Path;

use conceptc_codegen::CodegenOptions;
use conceptc_core::CompilerOptions;
use serde::Deserialize;

/// Default file name looked up in the working directory.
pub const DEFAULT_CONFIG: &str = "conceptc.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConceptcConfig {
    /// `[compiler]` section.
    pub compiler: CompilerOptions,
    /// `[codegen]` section.
    pub codegen: CodegenOptions,
}

/// Read and parse a config TOML file from `path`.
///
/// Returns a human-readable error string on failure.
pub fn read_config(path: &Path) -> Result<ConceptcConfig, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;

    toml::from_str(&content).map_err(|e| format!("could not parse '{}': {}", path.display(), e))
}

/// The explicit config file, else `conceptc.toml` if present, else defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<ConceptcConfig, String> {
    match explicit {
        Some(path) => read_config(path),
        None => {
            let default = Path::new(DEFAULT_CONFIG);
            if default.is_file() {
                read_config(default)
            } else {
                Ok(ConceptcConfig::default())
            }
        }
    }
}
