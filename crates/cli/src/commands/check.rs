use std::path::PathBuf;

use super::{compile_or_exit, print_warnings};
use crate::config::ConceptcConfig;
use crate::OutputFormat;

pub(crate) fn cmd_check(files: &[PathBuf], config: &ConceptcConfig, output: OutputFormat, quiet: bool) {
    let compilation = compile_or_exit(files, config, output, quiet);

    match output {
        OutputFormat::Json => {
            let report = serde_json::json!({
                "status": "ok",
                "concepts": compilation.model.len(),
                "warnings": compilation.warnings,
            });
            let pretty = serde_json::to_string_pretty(&report)
                .unwrap_or_else(|e| format!("serialization error: {}", e));
            println!("{}", pretty);
        }
        OutputFormat::Text => {
            print_warnings(&compilation.warnings, quiet);
            if !quiet {
                println!(
                    "ok: {} concepts, {} warning(s)",
                    compilation.model.len(),
                    compilation.warnings.len()
                );
            }
        }
    }
}
