//! Generator plugins and the generation driver.
//!
//! [`generate`] walks the model in dependency order, so a generator sees
//! the markers emitted for every concept its concept references before it
//! runs.

use crate::code_builder::CodeBuffer;
use crate::error::CodegenError;
use crate::options::CodegenOptions;
use conceptc_core::{ConceptNode, ConceptRegistry, ConceptType, DslError, DslModel};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Emits code for concepts of one type (and its subtypes).
pub trait CodeGenerator: Send + Sync {
    /// The concept type this generator is registered against.
    fn concept_type(&self) -> &str;

    fn generate(
        &self,
        concept: &ConceptNode,
        model: &DslModel,
        ctx: &mut GenerationContext,
    ) -> Result<(), CodegenError>;
}

#[derive(Default, Clone)]
pub struct GeneratorRegistry {
    generators: Vec<Arc<dyn CodeGenerator>>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, generator: impl CodeGenerator + 'static) -> &mut Self {
        self.generators.push(Arc::new(generator));
        self
    }

    /// Generators applying to `ty`, in registration order.
    pub fn for_type(&self, ty: &ConceptType) -> Vec<Arc<dyn CodeGenerator>> {
        self.generators
            .iter()
            .filter(|g| ty.is_a(g.concept_type()))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }

    /// Every generator must target a known concept type.
    pub fn validate(&self, registry: &ConceptRegistry) -> Result<(), CodegenError> {
        for g in &self.generators {
            if registry.get(g.concept_type()).is_none() {
                return Err(DslError::registry(format!(
                    "generator registered for unknown concept type '{}'",
                    g.concept_type()
                ))
                .into());
            }
        }
        Ok(())
    }
}

/// Output buffers of one generation pass, one per artifact name.
#[derive(Debug)]
pub struct GenerationContext {
    options: CodegenOptions,
    buffers: BTreeMap<String, CodeBuffer>,
}

impl GenerationContext {
    pub fn new(options: CodegenOptions) -> Self {
        GenerationContext {
            options,
            buffers: BTreeMap::new(),
        }
    }

    pub fn options(&self) -> &CodegenOptions {
        &self.options
    }

    /// The buffer of `artifact`, created empty on first use.
    pub fn buffer(&mut self, artifact: &str) -> &mut CodeBuffer {
        let options = &self.options;
        self.buffers
            .entry(artifact.to_owned())
            .or_insert_with(|| CodeBuffer::new(options.clone()))
    }

    /// The buffer of `artifact`, if anything created it.
    pub fn existing(&mut self, artifact: &str) -> Option<&mut CodeBuffer> {
        self.buffers.get_mut(artifact)
    }

    pub fn finish(self) -> Result<GeneratedArtifacts, CodegenError> {
        let mut files = BTreeMap::new();
        for (name, buffer) in self.buffers {
            files.insert(name, buffer.finish()?);
        }
        Ok(GeneratedArtifacts { files })
    }
}

/// Finished artifacts keyed by relative file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifacts {
    pub files: BTreeMap<String, String>,
}

impl GeneratedArtifacts {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(String::as_str)
    }

    /// Write every artifact under `dir`, creating directories as needed.
    pub fn write_to_dir(&self, dir: &Path) -> Result<Vec<PathBuf>, CodegenError> {
        let mut written = Vec::with_capacity(self.files.len());
        for (name, content) in &self.files {
            let path = dir.join(name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|source| CodegenError::Io {
                    path: parent.display().to_string(),
                    source,
                })?;
            }
            std::fs::write(&path, content).map_err(|source| CodegenError::Io {
                path: path.display().to_string(),
                source,
            })?;
            written.push(path);
        }
        Ok(written)
    }
}

/// Run every registered generator over `model` in dependency order.
pub fn generate(
    model: &DslModel,
    generators: &GeneratorRegistry,
    options: &CodegenOptions,
) -> Result<GeneratedArtifacts, CodegenError> {
    generators.validate(model.registry())?;
    let mut ctx = GenerationContext::new(options.clone());
    let mut invocations = 0usize;
    for entry in model.dependency_order()? {
        for g in generators.for_type(entry.node.concept_type()) {
            debug!(concept = %entry.key, generator = g.concept_type(), "generating");
            g.generate(&entry.node, model, &mut ctx)?;
            invocations += 1;
        }
    }
    let artifacts = ctx.finish()?;
    info!(
        concepts = model.len(),
        invocations,
        artifacts = artifacts.files.len(),
        "code generation finished"
    );
    Ok(artifacts)
}
