use std::path::PathBuf;
use std::process;

use conceptc_core::serialize_model;

use super::{compile_or_exit, print_warnings, report_dsl_error};
use crate::config::ConceptcConfig;
use crate::OutputFormat;

/// Print the expanded model: concept keys in dependency order, or the
/// serialized model as JSON.
pub(crate) fn cmd_parse(files: &[PathBuf], config: &ConceptcConfig, output: OutputFormat, quiet: bool) {
    let compilation = compile_or_exit(files, config, output, quiet);
    print_warnings(&compilation.warnings, quiet);

    match output {
        OutputFormat::Json => {
            let pretty = serde_json::to_string_pretty(&serialize_model(&compilation.model))
                .unwrap_or_else(|e| format!("serialization error: {}", e));
            println!("{}", pretty);
        }
        OutputFormat::Text => {
            let ordered = match compilation.model.dependency_order() {
                Ok(o) => o,
                Err(e) => {
                    report_dsl_error(&e, output, quiet);
                    process::exit(1);
                }
            };
            for entry in ordered {
                println!("{}", entry.key);
            }
        }
    }
}
