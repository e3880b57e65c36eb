#![allow(clippy::result_large_err)]
//! conceptc-core: DSL compiler front end.
//!
//! Turns concept scripts into a resolved, deduplicated concept graph.
//!
//! # Public API
//!
//! Key types are re-exported at the crate root for convenience:
//!
//! - [`Compiler`] -- run the full pipeline (parse, expand, order)
//! - [`ConceptRegistry`], [`ConceptType`] -- the concept shapes a script may use
//! - [`MacroRegistry`], [`ConceptMacro`] -- derivation of implied concepts
//! - [`DslModel`] -- the expanded concept graph
//! - [`DslError`] -- compilation error type
//!
//! Individual stages ([`parser::DslParser`], [`macros::expand`],
//! [`DslModel::dependency_order`]) are public for selective use.

pub mod compile;
pub mod concept;
pub mod config;
pub mod error;
pub mod lexer;
pub mod macros;
pub mod model;
mod ordering;
pub mod parser;
pub mod registry;
pub mod serialize;
pub mod source;

// ── Convenience re-exports: key types ────────────────────────────────

pub use compile::{Compilation, Compiler};
pub use concept::{ConceptKey, ConceptNode, ConceptRef, MemberValue};
pub use config::CompilerOptions;
pub use error::{DslError, DslWarning, ErrorCode, Position, SourceSpan};
pub use macros::{ConceptMacro, MacroRegistry, SeedConcept};
pub use model::{ConceptEntry, ConceptOrigin, DslModel};
pub use registry::{ConceptRegistry, ConceptType, MemberKind, TypeRef};
pub use source::{FileSystemProvider, InMemoryProvider, SourceMap, SourceProvider};

// ── Convenience re-exports: pipeline entry points ────────────────────

pub use macros::expand;
pub use serialize::serialize_model;
