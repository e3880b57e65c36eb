//! Compiler pipeline: scripts -> parsed concepts -> expanded model.
//!
//! This is a thin orchestrator over the parser, the macro expansion engine
//! and the dependency ordering check.

use crate::concept::ConceptNode;
use crate::config::CompilerOptions;
use crate::error::{DslError, DslWarning};
use crate::macros::{self, MacroRegistry, SeedConcept};
use crate::model::{ConceptOrigin, DslModel};
use crate::parser::{DslParser, ParseCache};
use crate::registry::ConceptRegistry;
use crate::source::{SourceMap, SourceProvider};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of a successful compilation.
#[derive(Debug)]
pub struct Compilation {
    pub model: DslModel,
    pub warnings: Vec<DslWarning>,
}

/// A configured compiler. Cheap to share: the registry and the parse cache
/// are reference counted, and `compile` takes `&self`.
pub struct Compiler {
    registry: Arc<ConceptRegistry>,
    macros: MacroRegistry,
    options: CompilerOptions,
    initial: Vec<ConceptNode>,
    cache: Arc<ParseCache>,
}

impl Compiler {
    pub fn new(registry: Arc<ConceptRegistry>, macros: MacroRegistry) -> Self {
        Compiler {
            registry,
            macros,
            options: CompilerOptions::default(),
            initial: Vec::new(),
            cache: Arc::new(ParseCache::new()),
        }
    }

    pub fn with_options(mut self, options: CompilerOptions) -> Self {
        self.options = options;
        self
    }

    /// Seed a concept that exists before any script is read.
    pub fn with_initial_concept(mut self, node: ConceptNode) -> Self {
        self.initial.push(node);
        self
    }

    /// Share a parse cache with other compilers.
    pub fn with_cache(mut self, cache: Arc<ParseCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn registry(&self) -> &Arc<ConceptRegistry> {
        &self.registry
    }

    pub fn compile(&self, sources: &SourceMap) -> Result<Compilation, DslError> {
        // Parse
        let parsed = DslParser::new(&self.registry, &self.options, self.cache.clone()).parse(sources)?;
        let warnings = parsed.warnings;
        if self.options.strict_warnings {
            if let Some(w) = warnings.first() {
                return Err(w.clone().into_error());
            }
        }
        for w in &warnings {
            warn!("{}", w);
        }

        // Expand
        let seeds = self
            .initial
            .iter()
            .cloned()
            .map(|node| SeedConcept {
                node,
                origin: ConceptOrigin::Initial,
            })
            .chain(parsed.concepts.into_iter().map(|p| SeedConcept {
                node: p.node,
                origin: ConceptOrigin::Script(p.span),
            }))
            .collect();
        let model = macros::expand(seeds, self.registry.clone(), &self.macros, &self.options)?;

        // Order
        model.dependency_order()?;

        info!(
            concepts = model.len(),
            warnings = warnings.len(),
            "compilation finished"
        );
        Ok(Compilation { model, warnings })
    }

    pub fn compile_str(&self, name: &str, text: &str) -> Result<Compilation, DslError> {
        let mut sources = SourceMap::new();
        sources.add(name, text);
        self.compile(&sources)
    }

    pub fn compile_files(&self, paths: &[PathBuf], provider: &dyn SourceProvider) -> Result<Compilation, DslError> {
        let sources = SourceMap::load(paths, provider)?;
        self.compile(&sources)
    }
}
