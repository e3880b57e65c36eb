//! The built-in sample concept domain: modules, entities, browses,
//! properties, references, unique lists, logging and descriptions.

pub mod concepts;
pub mod macros;
pub mod outline;

use conceptc_core::{Compiler, CompilerOptions, ConceptRegistry, DslError};
use std::sync::Arc;

/// A compiler for the sample domain, seeded with the initialization concept.
pub fn compiler(registry: Arc<ConceptRegistry>, options: CompilerOptions) -> Result<Compiler, DslError> {
    let init = concepts::initialization(&registry)?;
    let macros = macros::macros(&registry);
    Ok(Compiler::new(registry, macros)
        .with_options(options)
        .with_initial_concept(init))
}
