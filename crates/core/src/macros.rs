//! Macro Expansion Engine.
//!
//! Macros derive further concepts from a concept (and optionally from the
//! model built so far). [`expand`] saturates the model: every new resolved
//! concept is handed to the macros registered for its type or any of its
//! supertypes, and their output is queued until nothing new appears.

use crate::concept::ConceptNode;
use crate::config::CompilerOptions;
use crate::error::{DslError, ErrorCode};
use crate::model::{ConceptOrigin, DslModel, Insertion};
use crate::registry::{ConceptRegistry, ConceptType};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info};

/// A macro: a pure function from a concept to the concepts it implies.
///
/// Implementations must not perform I/O. The order in which independent
/// macros run is unspecified.
pub trait ConceptMacro: Send + Sync {
    fn expand(&self, concept: &ConceptNode, model: &DslModel) -> Result<Vec<ConceptNode>, DslError>;

    /// Macros that inspect the model (not only their own concept) are
    /// evaluated again after the queue drains, until a round adds nothing.
    fn depends_on_model(&self) -> bool {
        false
    }
}

struct FnMacro<F> {
    f: F,
    depends_on_model: bool,
}

impl<F> ConceptMacro for FnMacro<F>
where
    F: Fn(&ConceptNode, &DslModel) -> Result<Vec<ConceptNode>, DslError> + Send + Sync,
{
    fn expand(&self, concept: &ConceptNode, model: &DslModel) -> Result<Vec<ConceptNode>, DslError> {
        (self.f)(concept, model)
    }

    fn depends_on_model(&self) -> bool {
        self.depends_on_model
    }
}

/// Macros keyed by the concept type they are registered against.
#[derive(Default, Clone)]
pub struct MacroRegistry {
    by_type: HashMap<String, Vec<Arc<dyn ConceptMacro>>>,
}

impl MacroRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, type_name: impl Into<String>, m: impl ConceptMacro + 'static) -> &mut Self {
        self.by_type.entry(type_name.into()).or_default().push(Arc::new(m));
        self
    }

    pub fn register_fn<F>(&mut self, type_name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&ConceptNode, &DslModel) -> Result<Vec<ConceptNode>, DslError> + Send + Sync + 'static,
    {
        self.register(
            type_name,
            FnMacro {
                f,
                depends_on_model: false,
            },
        )
    }

    /// Register a closure that reads the model; see [`ConceptMacro::depends_on_model`].
    pub fn register_model_fn<F>(&mut self, type_name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&ConceptNode, &DslModel) -> Result<Vec<ConceptNode>, DslError> + Send + Sync + 'static,
    {
        self.register(
            type_name,
            FnMacro {
                f,
                depends_on_model: true,
            },
        )
    }

    /// Macros applying to `ty`: those of the type itself, then of its bases
    /// and interfaces.
    pub fn for_type(&self, ty: &ConceptType) -> Vec<Arc<dyn ConceptMacro>> {
        ty.ancestors()
            .iter()
            .filter_map(|a| self.by_type.get(a))
            .flatten()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_type.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every macro must be registered against a known concept type.
    pub fn validate(&self, registry: &ConceptRegistry) -> Result<(), DslError> {
        let mut names: Vec<&String> = self.by_type.keys().collect();
        names.sort();
        for name in names {
            if registry.get(name).is_none() {
                return Err(DslError::registry(format!(
                    "macro registered for unknown concept type '{}'",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// A concept entering expansion before any macro runs.
#[derive(Debug, Clone)]
pub struct SeedConcept {
    pub node: ConceptNode,
    pub origin: ConceptOrigin,
}

/// How many recent derivations a non-convergence error lists.
const RECENT_DERIVATIONS: usize = 10;

struct Expansion<'m> {
    model: DslModel,
    macros: &'m MacroRegistry,
    queue: VecDeque<SeedConcept>,
    steps: usize,
    max_steps: usize,
    recent: VecDeque<String>,
}

impl<'m> Expansion<'m> {
    fn step(&mut self) -> Result<(), DslError> {
        self.steps += 1;
        if self.steps <= self.max_steps {
            return Ok(());
        }
        Err(DslError::new(
            ErrorCode::ExpansionDiverged,
            format!(
                "macro expansion did not converge within {} steps",
                self.max_steps
            ),
        )
        .with_causes(
            "macros keep deriving new concepts, most likely a cyclic derivation; \
             the most recent derivations are listed in the details",
        )
        .with_details(self.recent.iter().cloned().collect()))
    }

    fn drain(&mut self) -> Result<(), DslError> {
        while let Some(seed) = self.queue.pop_front() {
            self.step()?;
            let derived_from = match &seed.origin {
                ConceptOrigin::Macro { derived_from } => Some(derived_from.clone()),
                _ => None,
            };
            let key = seed.node.key();
            match self.model.insert(seed.node, seed.origin)? {
                Insertion::Duplicate => {}
                Insertion::Added { resolved, .. } => {
                    if let Some(from) = derived_from {
                        if self.recent.len() == RECENT_DERIVATIONS {
                            self.recent.pop_front();
                        }
                        self.recent.push_back(format!("{} <- {}", key, from));
                    }
                    for index in resolved {
                        self.run_macros(index, false)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Evaluate the macros of one resolved entry and queue their output.
    fn run_macros(&mut self, index: usize, model_dependent_only: bool) -> Result<(), DslError> {
        let node = self.model.entry_at(index).node.clone();
        let key = self.model.entry_at(index).key.clone();
        for m in self.macros.for_type(node.concept_type()) {
            if model_dependent_only && !m.depends_on_model() {
                continue;
            }
            let derived = m.expand(&node, &self.model).map_err(|mut e| {
                if e.code != ErrorCode::MacroFailed {
                    e.message = format!("macro of '{}' failed: {}", key, e.message);
                }
                e
            })?;
            if !derived.is_empty() {
                debug!(concept = %key, derived = derived.len(), "macro derived concepts");
            }
            for node in derived {
                self.queue.push_back(SeedConcept {
                    node,
                    origin: ConceptOrigin::Macro {
                        derived_from: key.clone(),
                    },
                });
            }
        }
        Ok(())
    }
}

/// Saturate `seeds` into a model.
///
/// Fails on duplicate keys, references that never resolve, incomplete
/// concepts, macro errors, and when more than
/// [`CompilerOptions::max_expansion_steps`] concepts are processed.
pub fn expand(
    seeds: Vec<SeedConcept>,
    registry: Arc<ConceptRegistry>,
    macros: &MacroRegistry,
    options: &CompilerOptions,
) -> Result<DslModel, DslError> {
    macros.validate(&registry)?;
    let seed_count = seeds.len();
    let mut x = Expansion {
        model: DslModel::new(registry),
        macros,
        queue: seeds.into(),
        steps: 0,
        max_steps: options.max_expansion_steps,
        recent: VecDeque::new(),
    };

    x.drain()?;
    let mut rounds = 0;
    loop {
        let before = x.model.len();
        for index in 0..before {
            if x.model.entry_at(index).is_resolved() {
                x.run_macros(index, true)?;
            }
        }
        if x.queue.is_empty() {
            break;
        }
        rounds += 1;
        x.drain()?;
        if x.model.len() == before {
            break;
        }
    }

    x.model.check_resolved()?;
    info!(
        seeds = seed_count,
        concepts = x.model.len(),
        steps = x.steps,
        rounds,
        "macro expansion reached fixpoint"
    );
    Ok(x.model)
}
