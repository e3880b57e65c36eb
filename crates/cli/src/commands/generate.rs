use std::path::{Path, PathBuf};
use std::process;

use conceptc_codegen::{generate, CodegenError};
use tracing::info;

use super::{compile_or_exit, print_warnings};
use crate::config::ConceptcConfig;
use crate::domain::outline::{generators, OUTLINE};
use crate::{report_error, OutputFormat};

pub(crate) fn cmd_generate(
    files: &[PathBuf],
    out: Option<&Path>,
    config: &ConceptcConfig,
    output: OutputFormat,
    quiet: bool,
) {
    let compilation = compile_or_exit(files, config, output, quiet);
    print_warnings(&compilation.warnings, quiet);

    let artifacts = match generate(&compilation.model, &generators(), &config.codegen) {
        Ok(a) => a,
        Err(e) => exit_with(&e, output, quiet),
    };

    match out {
        Some(dir) => {
            let written = match artifacts.write_to_dir(dir) {
                Ok(w) => w,
                Err(e) => exit_with(&e, output, quiet),
            };
            info!(dir = %dir.display(), files = written.len(), "artifacts written");
            match output {
                OutputFormat::Json => {
                    let paths: Vec<String> = written.iter().map(|p| p.display().to_string()).collect();
                    println!("{}", serde_json::json!({ "written": paths }));
                }
                OutputFormat::Text => {
                    if !quiet {
                        for path in &written {
                            println!("wrote {}", path.display());
                        }
                    }
                }
            }
        }
        None => {
            let text = artifacts.get(OUTLINE).unwrap_or_default();
            match output {
                OutputFormat::Json => println!("{}", serde_json::json!({ "outline": text })),
                OutputFormat::Text => print!("{}", text),
            }
        }
    }
}

fn exit_with(e: &CodegenError, output: OutputFormat, quiet: bool) -> ! {
    report_error(&format!("error[{}]: {}", e.code(), e), output, quiet);
    process::exit(1);
}
