pub(crate) mod check;
pub(crate) mod generate;
pub(crate) mod parse;

use std::path::PathBuf;
use std::process;

use conceptc_core::{Compilation, DslError, DslWarning, FileSystemProvider};
use tracing::debug;

use crate::config::ConceptcConfig;
use crate::{domain, OutputFormat};

/// Compile `files` with the sample domain, or report the error and exit.
pub(crate) fn compile_or_exit(
    files: &[PathBuf],
    config: &ConceptcConfig,
    output: OutputFormat,
    quiet: bool,
) -> Compilation {
    debug!(scripts = files.len(), "compiling with the sample domain");
    let result = domain::concepts::registry()
        .and_then(|registry| domain::compiler(registry, config.compiler.clone()))
        .and_then(|compiler| compiler.compile_files(files, &FileSystemProvider));
    match result {
        Ok(c) => c,
        Err(e) => {
            report_dsl_error(&e, output, quiet);
            process::exit(1);
        }
    }
}

/// JSON errors are always printed; text errors honor `--quiet`.
pub(crate) fn report_dsl_error(e: &DslError, output: OutputFormat, quiet: bool) {
    match output {
        OutputFormat::Json => {
            let err_json = serde_json::to_string_pretty(&e.to_json_value())
                .unwrap_or_else(|_| format!("{{\"error\": \"{:?}\"}}", e));
            eprintln!("{}", err_json);
        }
        OutputFormat::Text => {
            if quiet {
                return;
            }
            let location = e.span.as_ref().map(|s| format!("{}: ", s)).unwrap_or_default();
            eprintln!("{}error[{}]: {}", location, e.code, e.message);
            if let Some(causes) = &e.possible_causes {
                for line in causes.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }
}

pub(crate) fn print_warnings(warnings: &[DslWarning], quiet: bool) {
    if quiet {
        return;
    }
    for w in warnings {
        eprintln!("{}", w);
    }
}
