//! conceptc-codegen: tag-based code building over a compiled concept model.
//!
//! Concept types declare [`Tag`]s, generators emit their markers into
//! [`CodeBuffer`]s and other generators insert text at them. [`generate`]
//! drives every registered [`CodeGenerator`] over a model.

pub mod code_builder;
pub mod error;
pub mod generator;
pub mod options;
pub mod tag;

pub use code_builder::CodeBuffer;
pub use error::CodegenError;
pub use generator::{generate, CodeGenerator, GeneratedArtifacts, GenerationContext, GeneratorRegistry};
pub use options::CodegenOptions;
pub use tag::{Tag, TagDiscipline};
