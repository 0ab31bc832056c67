//! The library resolver.
//!
//! Resolution of a target library proceeds through fixed stages. The
//! dependency walk and cycle identification run once per request; every
//! later stage runs once per library cycle, dependencies first, so that a
//! cycle only ever consults finished elements of the cycles below it.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use strand_common::{InternalError, Interner};
use strand_source::Source;
use thiserror::Error;

use crate::builder::build_library_element;
use crate::const_eval::evaluate_constants;
use crate::cycle::DependencyGraph;
use crate::element::LibraryElement;
use crate::hierarchy::build_hierarchy;
use crate::index::ElementIndex;
use crate::model::{LibraryModel, ResolverHost};
use crate::resolve::resolve_unit;
use crate::scope::{bind_directives, compute_namespaces};
use crate::types::TypeProvider;
use crate::unit::ResolvedUnit;
use crate::verify::verify_unit;

/// Progress of a resolution request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ResolutionStage {
    /// Nothing done yet.
    Unstarted,
    /// Every unresolved library reachable from the target is known.
    DependenciesComputed,
    /// The target's library cycle is known.
    CycleIdentified,
    /// Declarations of the current cycle have elements.
    ElementsBuilt,
    /// Imports, exports and prefixes are bound; namespaces are complete.
    DirectivesBound,
    /// Supertypes and declared types are resolved.
    TypeHierarchyBuilt,
    /// Every name expression is bound and typed.
    ReferencesResolved,
    /// Constant initializers are evaluated.
    ConstantsEvaluated,
    /// Checks that need resolved references have run.
    AdditionalVerification,
    /// The cycle's results are in the output.
    ResultsRecorded,
}

/// Why a resolution produced no result.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The host asked to stop between two units.
    #[error("resolution was cancelled")]
    Cancelled,
    /// The installation is broken.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

/// One newly resolved library.
#[derive(Clone, Debug)]
pub struct ResolvedLibrary {
    /// The finished element.
    pub element: Arc<LibraryElement>,
    /// Its units, the self unit first.
    pub units: Vec<ResolvedUnit>,
}

impl ResolvedLibrary {
    /// The defining source.
    pub fn source(&self) -> &Source {
        &self.element.source
    }

    /// The resolved unit for `source`, if it belongs to this library.
    pub fn unit(&self, source: &Source) -> Option<&ResolvedUnit> {
        self.units.iter().find(|u| u.source == *source)
    }
}

/// Everything resolved by one request.
#[derive(Clone, Debug, Default)]
pub struct ResolveOutput {
    /// Libraries resolved by this request, dependencies first. Libraries
    /// the host supplied as already resolved are not repeated.
    pub libraries: Vec<ResolvedLibrary>,
    /// The target's library cycle, sorted by URI.
    pub cycle: Vec<Source>,
}

impl ResolveOutput {
    /// The result for `library`, if this request resolved it.
    pub fn library(&self, library: &Source) -> Option<&ResolvedLibrary> {
        self.libraries.iter().find(|l| l.source() == library)
    }
}

/// Resolves libraries supplied by a [`ResolverHost`].
pub struct LibraryResolver {
    interner: Arc<Interner>,
    core: Source,
    verify: bool,
    stage: ResolutionStage,
}

impl LibraryResolver {
    /// Creates a resolver whose libraries all implicitly import `core`.
    pub fn new(interner: Arc<Interner>, core: Source) -> Self {
        Self {
            interner,
            core,
            verify: true,
            stage: ResolutionStage::Unstarted,
        }
    }

    /// Enables or disables the additional verification stage.
    pub fn with_verification(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// The stage the last request reached.
    pub fn stage(&self) -> ResolutionStage {
        self.stage
    }

    fn enter(&mut self, stage: ResolutionStage, libraries: &[Source]) {
        tracing::debug!(?stage, libraries = libraries.len(), "resolution stage");
        self.stage = stage;
    }

    /// Resolves `target` and every unresolved library it depends on.
    ///
    /// A target the host cannot load yields an empty output. Failing to load
    /// the core library is an internal error.
    pub fn resolve(
        &mut self,
        target: &Source,
        host: &mut dyn ResolverHost,
    ) -> Result<ResolveOutput, ResolveError> {
        self.stage = ResolutionStage::Unstarted;
        let mut libraries: HashMap<Source, Arc<LibraryElement>> = HashMap::new();
        let Some((models, graph)) = self.compute_dependencies(target, host, &mut libraries)? else {
            return Ok(ResolveOutput::default());
        };
        self.enter(ResolutionStage::DependenciesComputed, &[target.clone()]);

        let cycle = graph.cycle_of(target);
        self.enter(ResolutionStage::CycleIdentified, &cycle);
        tracing::debug!(%target, cycle = cycle.len(), pending = graph.len(), "library cycle identified");

        let mut types = libraries
            .get(&self.core)
            .map(|core| TypeProvider::from_core(core, &self.interner));
        let mut output = ResolveOutput {
            libraries: Vec::new(),
            cycle,
        };
        for component in graph.components() {
            let resolved =
                self.resolve_cycle(&component, &models, &mut libraries, &mut types, host)?;
            output.libraries.extend(resolved);
        }
        Ok(output)
    }

    /// Walks the dependencies of `target`, collecting models of libraries
    /// that still need resolution and elements of those that do not.
    fn compute_dependencies(
        &self,
        target: &Source,
        host: &mut dyn ResolverHost,
        resolved: &mut HashMap<Source, Arc<LibraryElement>>,
    ) -> Result<Option<(HashMap<Source, Arc<LibraryModel>>, DependencyGraph)>, ResolveError> {
        let mut models: HashMap<Source, Arc<LibraryModel>> = HashMap::new();
        let mut edges: Vec<(Source, Source)> = Vec::new();
        let mut seen = HashSet::from([target.clone()]);
        let mut queue = VecDeque::from([target.clone()]);
        while let Some(library) = queue.pop_front() {
            if let Some(element) = host.resolved_library(&library) {
                resolved.insert(library, element);
                continue;
            }
            let Some(model) = host.library_model(&library) else {
                if library == self.core {
                    return Err(InternalError::new(format!("Could not resolve {}", self.core)).into());
                }
                if library == *target {
                    tracing::debug!(%target, "target library could not be loaded");
                    return Ok(None);
                }
                continue;
            };
            let mut dependencies: Vec<Source> = model.dependencies().cloned().collect();
            if library != self.core {
                dependencies.push(self.core.clone());
            }
            for dependency in dependencies {
                if dependency == library {
                    continue;
                }
                edges.push((library.clone(), dependency.clone()));
                if seen.insert(dependency.clone()) {
                    queue.push_back(dependency);
                }
            }
            models.insert(library, model);
        }

        let mut graph = DependencyGraph::new();
        for library in models.keys() {
            graph.add_library(library);
        }
        for (from, to) in edges {
            if models.contains_key(&to) {
                graph.add_dependency(&from, &to);
            }
        }
        Ok(Some((models, graph)))
    }

    fn resolve_cycle(
        &mut self,
        cycle: &[Source],
        models: &HashMap<Source, Arc<LibraryModel>>,
        libraries: &mut HashMap<Source, Arc<LibraryElement>>,
        types: &mut Option<TypeProvider>,
        host: &mut dyn ResolverHost,
    ) -> Result<Vec<ResolvedLibrary>, ResolveError> {
        let interner = Arc::clone(&self.interner);
        let cycle_models: Vec<&Arc<LibraryModel>> =
            cycle.iter().filter_map(|s| models.get(s)).collect();

        let mut units: Vec<Vec<ResolvedUnit>> = Vec::with_capacity(cycle_models.len());
        for model in &cycle_models {
            let mut lib_units: Vec<ResolvedUnit> = model
                .units
                .iter()
                .map(|u| ResolvedUnit::new(&model.source, u))
                .collect();
            let element = build_library_element(model, &interner, &mut lib_units);
            libraries.insert(model.source.clone(), Arc::new(element));
            units.push(lib_units);
        }
        self.enter(ResolutionStage::ElementsBuilt, cycle);

        for model in &cycle_models {
            if let Some(element) = libraries.get_mut(&model.source) {
                bind_directives(model, Arc::make_mut(element), &self.core);
            }
        }
        compute_namespaces(libraries, cycle, &interner);
        self.enter(ResolutionStage::DirectivesBound, cycle);

        if types.is_none() {
            *types = libraries
                .get(&self.core)
                .map(|core| TypeProvider::from_core(core, &interner));
        }
        let types = types.clone().unwrap_or_default();

        build_hierarchy(libraries, cycle, &mut units, &types, &interner);
        self.enter(ResolutionStage::TypeHierarchyBuilt, cycle);

        let constants = {
            let index = ElementIndex::new(libraries, &interner, &types);
            for (source, lib_units) in cycle.iter().zip(units.iter_mut()) {
                let Some(library) = index.library(source) else {
                    continue;
                };
                for unit in lib_units.iter_mut() {
                    if host.is_cancelled() {
                        tracing::debug!(unit = %unit.source, "resolution cancelled");
                        return Err(ResolveError::Cancelled);
                    }
                    resolve_unit(&index, library, unit);
                }
            }
            self.enter(ResolutionStage::ReferencesResolved, cycle);
            evaluate_constants(&index, cycle, &mut units)
        };
        for (library, values) in constants.top_level {
            if let Some(element) = libraries.get_mut(&library) {
                Arc::make_mut(element).constants.extend(values);
            }
        }
        for (class, values) in constants.fields {
            if let Some(element) = libraries.get_mut(&class.library) {
                if let Some(decl) = Arc::make_mut(element).classes.get_mut(&class.name) {
                    decl.constants.extend(values);
                }
            }
        }
        self.enter(ResolutionStage::ConstantsEvaluated, cycle);

        if self.verify {
            let index = ElementIndex::new(libraries, &interner, &types);
            for unit in units.iter_mut().flatten() {
                verify_unit(&index, unit);
            }
            self.enter(ResolutionStage::AdditionalVerification, cycle);
        }

        let mut resolved = Vec::with_capacity(cycle.len());
        for (model, lib_units) in cycle_models.iter().zip(units) {
            if let Some(element) = libraries.get(&model.source) {
                resolved.push(ResolvedLibrary {
                    element: Arc::clone(element),
                    units: lib_units,
                });
            }
        }
        self.enter(ResolutionStage::ResultsRecorded, cycle);
        Ok(resolved)
    }
}
