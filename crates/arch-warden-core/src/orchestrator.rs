//! The project validation orchestrator.
//!
//! Drives the multi-phase pipeline: obtain the import graph, fan out
//! single-file validation (graph-dependent rules excluded), evaluate
//! graph-dependent rules in fixed-size batches, run the four project-level
//! checks concurrently, and merge everything into one batch report.
//!
//! Per-file failures degrade that file's result; a graph build failure or a
//! malformed constraint value aborts the whole run.

use crate::cache::{self, ContentCache, ResolutionCache};
use crate::checks::{
    BoundaryValidator, CoverageConfig, CoverageValidator, FindSimilarOptions, SimilarityAnalyzer,
};
use crate::context::{FileContext, ProjectView};
use crate::dispatch::{rules, RuleContext, ValidatorError, ValidatorRegistry};
use crate::graph::{GraphBuild, GraphBuilder, GraphError};
use crate::registry::Registry;
use crate::report::{
    BatchReport, BatchSummary, CoverageSummary, EdgeViolation, FileReport, FileStatus,
    ProjectStats, SimilarityViolation,
};
use crate::resolver::ResolveError;
use crate::types::{Constraint, Severity, Violation};

use indexmap::IndexMap;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Files validated per batch in the fan-out phases, to bound peak
/// concurrency and memory while still overlapping I/O-bound work.
const BATCH_SIZE: usize = 50;

/// Typed failures of the orchestrator. All of these abort the run.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// The import graph could not be built.
    #[error("import graph build failed: {0}")]
    Graph(#[from] GraphError),

    /// A constraint value is malformed (unrecoverable configuration error).
    #[error("configuration error: {0}")]
    Config(#[from] ValidatorError),

    /// A registry-wide scan hit an unresolvable architecture.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The orchestrator was built without a required collaborator.
    #[error("orchestrator misconfigured: missing {0}")]
    Missing(&'static str),

    /// An internal task failed to join.
    #[error("internal task failure: {0}")]
    Task(String),
}

fn join_err(e: tokio::task::JoinError) -> OrchestratorError {
    OrchestratorError::Task(e.to_string())
}

/// Options for one validation run.
#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    /// Globs restricting which files are in scope (empty = all).
    pub include: Vec<String>,
    /// Globs excluding files from scope.
    pub exclude: Vec<String>,
    /// Architecture ids whose files are excluded from validation.
    pub arch_ignore: Vec<String>,
    /// Rule names skipped in every phase.
    pub skip_rules: Vec<String>,
    /// When set, only violations of these severities are reported.
    pub severities: Option<Vec<Severity>>,
    /// A pre-built import graph, to avoid rebuilding one the caller has.
    pub prebuilt_graph: Option<Arc<GraphBuild>>,
    /// A pre-populated content cache, to avoid redundant I/O.
    pub prebuilt_content_cache: Option<Arc<ContentCache>>,
}

/// Run-scoped memoization: constructed per run, discarded afterwards.
struct RunState {
    content: Arc<ContentCache>,
    resolution: Arc<ResolutionCache>,
    has_coverage: OnceLock<bool>,
    has_similarity: OnceLock<bool>,
}

impl RunState {
    fn new(options: &ValidateOptions) -> Self {
        Self {
            content: options
                .prebuilt_content_cache
                .clone()
                .unwrap_or_else(|| Arc::new(ContentCache::new())),
            resolution: Arc::new(ResolutionCache::new()),
            has_coverage: OnceLock::new(),
            has_similarity: OnceLock::new(),
        }
    }

    /// Memoized one-time registry scan for the cheap-skip paths.
    fn registry_has(&self, registry: &Registry, rule: &'static str) -> bool {
        let slot = match rule {
            rules::REQUIRE_COVERAGE => &self.has_coverage,
            _ => &self.has_similarity,
        };
        *slot.get_or_init(|| registry.has_rule(rule))
    }
}

/// Builder for configuring an [`Orchestrator`].
#[derive(Default)]
pub struct OrchestratorBuilder {
    root: Option<PathBuf>,
    registry: Option<Arc<Registry>>,
    validators: Option<Arc<ValidatorRegistry>>,
    graph_builder: Option<Arc<dyn GraphBuilder>>,
    package_boundary: Option<Arc<dyn BoundaryValidator>>,
    layer_boundary: Option<Arc<dyn BoundaryValidator>>,
    coverage: Option<Arc<dyn CoverageValidator>>,
    similarity: Option<Arc<dyn SimilarityAnalyzer>>,
}

impl OrchestratorBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the project root.
    #[must_use]
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Sets the rule registry.
    #[must_use]
    pub fn registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets the validator dispatch registry.
    #[must_use]
    pub fn validators(mut self, validators: Arc<ValidatorRegistry>) -> Self {
        self.validators = Some(validators);
        self
    }

    /// Sets the import graph builder.
    #[must_use]
    pub fn graph_builder(mut self, builder: Arc<dyn GraphBuilder>) -> Self {
        self.graph_builder = Some(builder);
        self
    }

    /// Sets the package boundary validator.
    #[must_use]
    pub fn package_boundary(mut self, validator: Arc<dyn BoundaryValidator>) -> Self {
        self.package_boundary = Some(validator);
        self
    }

    /// Sets the layer boundary validator.
    #[must_use]
    pub fn layer_boundary(mut self, validator: Arc<dyn BoundaryValidator>) -> Self {
        self.layer_boundary = Some(validator);
        self
    }

    /// Sets the coverage validator.
    #[must_use]
    pub fn coverage(mut self, validator: Arc<dyn CoverageValidator>) -> Self {
        self.coverage = Some(validator);
        self
    }

    /// Sets the similarity analyzer.
    #[must_use]
    pub fn similarity(mut self, analyzer: Arc<dyn SimilarityAnalyzer>) -> Self {
        self.similarity = Some(analyzer);
        self
    }

    /// Builds the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first missing collaborator.
    pub fn build(self) -> Result<Orchestrator, OrchestratorError> {
        Ok(Orchestrator {
            root: self.root.ok_or(OrchestratorError::Missing("root"))?,
            registry: self.registry.ok_or(OrchestratorError::Missing("registry"))?,
            validators: self
                .validators
                .ok_or(OrchestratorError::Missing("validators"))?,
            graph_builder: self
                .graph_builder
                .ok_or(OrchestratorError::Missing("graph builder"))?,
            package_boundary: self
                .package_boundary
                .ok_or(OrchestratorError::Missing("package boundary validator"))?,
            layer_boundary: self
                .layer_boundary
                .ok_or(OrchestratorError::Missing("layer boundary validator"))?,
            coverage: self
                .coverage
                .ok_or(OrchestratorError::Missing("coverage validator"))?,
            similarity: self
                .similarity
                .ok_or(OrchestratorError::Missing("similarity analyzer"))?,
        })
    }
}

/// Drives whole-project and file-set validation.
pub struct Orchestrator {
    root: PathBuf,
    registry: Arc<Registry>,
    validators: Arc<ValidatorRegistry>,
    graph_builder: Arc<dyn GraphBuilder>,
    package_boundary: Arc<dyn BoundaryValidator>,
    layer_boundary: Arc<dyn BoundaryValidator>,
    coverage: Arc<dyn CoverageValidator>,
    similarity: Arc<dyn SimilarityAnalyzer>,
}

impl Orchestrator {
    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    /// Returns the project root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validates every file in the import graph.
    ///
    /// # Errors
    ///
    /// Returns an error on graph build failure or an unrecoverable
    /// configuration error; per-file failures degrade that file only.
    pub async fn validate_project(
        &self,
        options: &ValidateOptions,
    ) -> Result<BatchReport, OrchestratorError> {
        let build = self.obtain_graph(options).await?;
        let files = build.graph.files();
        self.run_pipeline(files, build, options).await
    }

    /// Validates the given files against the project graph.
    ///
    /// Relative paths are resolved against the project root. Files outside
    /// the graph are scanned on demand and validated without a project view.
    ///
    /// # Errors
    ///
    /// Same failure semantics as [`Orchestrator::validate_project`].
    pub async fn validate_files(
        &self,
        paths: &[PathBuf],
        options: &ValidateOptions,
    ) -> Result<BatchReport, OrchestratorError> {
        let build = self.obtain_graph(options).await?;
        let files: Vec<PathBuf> = paths
            .iter()
            .map(|p| {
                if p.is_absolute() {
                    p.clone()
                } else {
                    self.root.join(p)
                }
            })
            .collect();
        self.run_pipeline(files, build, options).await
    }

    /// Builds the import graph, or accepts the caller's pre-built one.
    async fn obtain_graph(
        &self,
        options: &ValidateOptions,
    ) -> Result<Arc<GraphBuild>, OrchestratorError> {
        if let Some(prebuilt) = &options.prebuilt_graph {
            debug!("using caller-supplied import graph");
            return Ok(prebuilt.clone());
        }
        let builder = self.graph_builder.clone();
        let root = self.root.clone();
        let registry = self.registry.clone();
        let include = options.include.clone();
        let exclude = options.exclude.clone();
        let build = tokio::task::spawn_blocking(move || {
            builder.build(&root, &registry, &include, &exclude)
        })
        .await
        .map_err(join_err)??;
        info!(
            nodes = build.graph.len(),
            cycles = build.cycles.len(),
            ms = build.build_time_ms,
            "import graph built"
        );
        Ok(Arc::new(build))
    }

    async fn run_pipeline(
        &self,
        files: Vec<PathBuf>,
        build: Arc<GraphBuild>,
        options: &ValidateOptions,
    ) -> Result<BatchReport, OrchestratorError> {
        let run = RunState::new(options);

        // Ignored architectures drop out of scope entirely.
        let files: Vec<PathBuf> = files
            .into_iter()
            .filter(|file| {
                let arch = self.arch_of(file, &build);
                !arch.is_some_and(|a| options.arch_ignore.iter().any(|ignored| *ignored == a))
            })
            .collect();

        info!(files = files.len(), "starting validation");

        let mut reports = self.single_file_phase(&files, &build, &run, options).await?;
        self.graph_phase(&mut reports, &build, &run, options).await?;

        let (package, layer, coverage, similarity) = self
            .project_checks(&build, &run, &reports, options)
            .await?;

        Ok(assemble_report(
            reports, &build, &run, package, layer, coverage, similarity,
        ))
    }

    fn arch_of(&self, file: &Path, build: &GraphBuild) -> Option<String> {
        build
            .graph
            .node(file)
            .and_then(|n| n.arch_id.clone())
            .or_else(|| {
                let rel = file.strip_prefix(&self.root).unwrap_or(file);
                self.registry.classify(rel).map(str::to_string)
            })
    }

    /// Phase 2: single-file validation fan-out, graph-dependent rules
    /// excluded, batched to cap concurrency.
    async fn single_file_phase(
        &self,
        files: &[PathBuf],
        build: &Arc<GraphBuild>,
        run: &RunState,
        options: &ValidateOptions,
    ) -> Result<Vec<FileReport>, OrchestratorError> {
        let skip: Arc<HashSet<String>> = Arc::new(options.skip_rules.iter().cloned().collect());
        let mut reports: Vec<Option<FileReport>> = (0..files.len()).map(|_| None).collect();

        for (batch_index, batch) in files.chunks(BATCH_SIZE).enumerate() {
            let mut tasks: JoinSet<(usize, Result<FileReport, OrchestratorError>)> = JoinSet::new();
            for (offset, file) in batch.iter().enumerate() {
                let index = batch_index * BATCH_SIZE + offset;
                let task = SingleFileTask {
                    root: self.root.clone(),
                    file: file.clone(),
                    registry: self.registry.clone(),
                    validators: self.validators.clone(),
                    graph_builder: self.graph_builder.clone(),
                    build: build.clone(),
                    resolution: run.resolution.clone(),
                    content: run.content.clone(),
                    skip: skip.clone(),
                    severities: options.severities.clone(),
                };
                tasks.spawn(async move { (index, task.run().await) });
            }
            while let Some(joined) = tasks.join_next().await {
                let (index, result) = joined.map_err(join_err)?;
                reports[index] = Some(result?);
            }
        }

        Ok(reports.into_iter().flatten().collect())
    }

    /// Phase 3: graph-dependent rules, evaluated per file against a small
    /// project context, in fixed-size batches.
    async fn graph_phase(
        &self,
        reports: &mut [FileReport],
        build: &Arc<GraphBuild>,
        run: &RunState,
        options: &ValidateOptions,
    ) -> Result<(), OrchestratorError> {
        let skip: Arc<HashSet<String>> = Arc::new(options.skip_rules.iter().cloned().collect());
        let eligible: Vec<usize> = reports
            .iter()
            .enumerate()
            .filter(|(_, r)| {
                r.arch_id.is_some()
                    && !matches!(r.status, FileStatus::Errored | FileStatus::MissingArchitecture)
            })
            .map(|(i, _)| i)
            .collect();

        for batch in eligible.chunks(BATCH_SIZE) {
            let mut tasks: JoinSet<(usize, Result<Vec<Violation>, OrchestratorError>)> =
                JoinSet::new();
            for &index in batch {
                let report = &reports[index];
                let task = GraphRuleTask {
                    root: self.root.clone(),
                    file: report.file.clone(),
                    arch_id: report.arch_id.clone().unwrap_or_default(),
                    registry: self.registry.clone(),
                    validators: self.validators.clone(),
                    build: build.clone(),
                    resolution: run.resolution.clone(),
                    content: run.content.clone(),
                    skip: skip.clone(),
                    severities: options.severities.clone(),
                };
                tasks.spawn(async move { (index, task.run().await) });
            }
            while let Some(joined) = tasks.join_next().await {
                let (index, result) = joined.map_err(join_err)?;
                for violation in result? {
                    reports[index].push(violation);
                }
            }
        }

        Ok(())
    }

    /// Phase 4: the four project-level checks, run concurrently since none
    /// depends on another's output.
    async fn project_checks(
        &self,
        build: &Arc<GraphBuild>,
        run: &RunState,
        reports: &[FileReport],
        options: &ValidateOptions,
    ) -> Result<
        (
            Vec<EdgeViolation>,
            Vec<EdgeViolation>,
            Option<CoverageSummary>,
            Vec<SimilarityViolation>,
        ),
        OrchestratorError,
    > {
        let package_task = {
            let validator = self.package_boundary.clone();
            let registry = self.registry.clone();
            let build = build.clone();
            let root = self.root.clone();
            tokio::task::spawn_blocking(move || validator.validate(&root, &build.graph, &registry))
        };
        let layer_task = {
            let validator = self.layer_boundary.clone();
            let registry = self.registry.clone();
            let build = build.clone();
            let root = self.root.clone();
            tokio::task::spawn_blocking(move || validator.validate(&root, &build.graph, &registry))
        };

        let (package, layer, coverage, similarity) = tokio::join!(
            package_task,
            layer_task,
            self.coverage_check(run, options),
            self.similarity_check(run, reports, options),
        );

        Ok((
            package.map_err(join_err)?,
            layer.map_err(join_err)?,
            coverage?,
            similarity?,
        ))
    }

    /// Coverage sub-check with the cheap-skip path: nothing runs when the
    /// rule is skipped or no coverage constraint exists anywhere.
    async fn coverage_check(
        &self,
        run: &RunState,
        options: &ValidateOptions,
    ) -> Result<Option<CoverageSummary>, OrchestratorError> {
        if options.skip_rules.iter().any(|r| r == rules::REQUIRE_COVERAGE) {
            return Ok(None);
        }
        if !run.registry_has(&self.registry, rules::REQUIRE_COVERAGE) {
            debug!("no coverage constraints in registry, skipping coverage check");
            return Ok(None);
        }

        let mut configs: Vec<CoverageConfig> = Vec::new();
        let mut seen_keys: HashSet<String> = HashSet::new();
        for node in self.registry.architectures() {
            let resolved = run.resolution.resolve(&self.registry, &node.id)?;
            for constraint in resolved.constraints_for(rules::REQUIRE_COVERAGE) {
                if seen_keys.insert(constraint.key()) {
                    configs.push(coverage_config_from(constraint)?);
                }
            }
        }
        if configs.is_empty() {
            return Ok(None);
        }

        let validator = self.coverage.clone();
        let root = self.root.clone();
        let outcomes = tokio::task::spawn_blocking(move || validator.validate_all(&root, &configs))
            .await
            .map_err(join_err)??;

        let mut gaps = Vec::new();
        let mut total_sources = 0;
        let mut covered_sources = 0;
        for outcome in outcomes.into_values() {
            gaps.extend(outcome.gaps);
            total_sources += outcome.total_sources;
            covered_sources += outcome.covered_sources;
        }
        #[allow(clippy::cast_precision_loss)]
        let percent = if total_sources == 0 {
            100.0
        } else {
            covered_sources as f64 / total_sources as f64 * 100.0
        };
        Ok(Some(CoverageSummary {
            gaps,
            total_sources,
            covered_sources,
            percent,
        }))
    }

    /// Similarity sub-check: same cheap-skip pattern as coverage; scores
    /// each unordered same-architecture pair exactly once.
    async fn similarity_check(
        &self,
        run: &RunState,
        reports: &[FileReport],
        options: &ValidateOptions,
    ) -> Result<Vec<SimilarityViolation>, OrchestratorError> {
        if options.skip_rules.iter().any(|r| r == rules::MAX_SIMILARITY) {
            return Ok(Vec::new());
        }
        if !run.registry_has(&self.registry, rules::MAX_SIMILARITY) {
            debug!("no similarity constraints in registry, skipping similarity check");
            return Ok(Vec::new());
        }

        // Group candidate files by resolved architecture; files lacking a
        // resolvable architecture are excluded.
        let mut groups: IndexMap<String, Vec<PathBuf>> = IndexMap::new();
        for report in reports {
            if matches!(
                report.status,
                FileStatus::Errored | FileStatus::MissingArchitecture
            ) {
                continue;
            }
            let signature = self
                .similarity
                .extract_signature(&report.file, report.arch_id.as_deref());
            if let Some(arch_id) = signature.arch_id {
                groups.entry(arch_id).or_default().push(report.file.clone());
            }
        }

        let seen: Arc<Mutex<HashSet<(PathBuf, PathBuf)>>> = Arc::new(Mutex::new(HashSet::new()));
        let mut tasks: JoinSet<Vec<SimilarityViolation>> = JoinSet::new();

        for (arch_id, files) in groups {
            if files.len() < 2 {
                continue;
            }
            let resolved = run.resolution.resolve(&self.registry, &arch_id)?;
            let Some(constraint) = resolved.constraints_for(rules::MAX_SIMILARITY).next() else {
                continue;
            };
            let threshold = constraint.value.as_num().ok_or_else(|| {
                ValidatorError::MalformedValue {
                    rule: rules::MAX_SIMILARITY.to_string(),
                    expected: "a numeric ceiling in 0.0..=1.0",
                    found: constraint.value.to_string(),
                }
            })?;
            let severity = constraint.severity;
            if options
                .severities
                .as_ref()
                .is_some_and(|wanted| !wanted.contains(&severity))
            {
                continue;
            }

            let analyzer = self.similarity.clone();
            let content_cache = run.content.clone();
            let seen = seen.clone();
            tasks.spawn_blocking(move || {
                score_architecture_pairs(
                    &arch_id,
                    &files,
                    threshold,
                    severity,
                    analyzer.as_ref(),
                    &content_cache,
                    &seen,
                )
            });
        }

        let mut violations = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            violations.extend(joined.map_err(join_err)?);
        }
        Ok(violations)
    }
}

/// Scores every not-yet-compared pair within one architecture.
///
/// Comparisons are symmetric: the shared sorted-pair set guarantees each
/// unordered pair is scored once even across concurrent groups. A file
/// whose content cannot be obtained drops out of this pass only.
fn score_architecture_pairs(
    arch_id: &str,
    files: &[PathBuf],
    threshold: f64,
    severity: Severity,
    analyzer: &dyn SimilarityAnalyzer,
    content_cache: &ContentCache,
    seen: &Mutex<HashSet<(PathBuf, PathBuf)>>,
) -> Vec<SimilarityViolation> {
    let mut violations = Vec::new();
    let options = FindSimilarOptions {
        threshold,
        same_arch_only: true,
    };

    for (i, file) in files.iter().enumerate() {
        let content = match content_cache.get_or_read_blocking(file) {
            Ok(content) => content,
            Err(e) => {
                warn!(file = %file.display(), "skipping similarity comparison: {e}");
                continue;
            }
        };

        let mut candidates = Vec::new();
        for other in files.iter().skip(i + 1) {
            let pair = sorted_pair(file, other);
            {
                let mut guard = match seen.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                if !guard.insert(pair) {
                    continue;
                }
            }
            match content_cache.get_or_read_blocking(other) {
                Ok(other_content) => candidates.push((other.clone(), other_content)),
                Err(e) => {
                    warn!(file = %other.display(), "skipping similarity comparison: {e}");
                }
            }
        }
        if candidates.is_empty() {
            continue;
        }

        for matched in analyzer.find_similar(file, &content, &candidates, &options) {
            violations.push(SimilarityViolation {
                file_a: file.clone(),
                file_b: matched.file,
                similarity: matched.similarity,
                threshold,
                severity,
                arch_id: arch_id.to_string(),
            });
        }
    }

    violations
}

fn sorted_pair(a: &Path, b: &Path) -> (PathBuf, PathBuf) {
    if a <= b {
        (a.to_path_buf(), b.to_path_buf())
    } else {
        (b.to_path_buf(), a.to_path_buf())
    }
}

/// One single-file validation unit, spawned per file.
struct SingleFileTask {
    root: PathBuf,
    file: PathBuf,
    registry: Arc<Registry>,
    validators: Arc<ValidatorRegistry>,
    graph_builder: Arc<dyn GraphBuilder>,
    build: Arc<GraphBuild>,
    resolution: Arc<ResolutionCache>,
    content: Arc<ContentCache>,
    skip: Arc<HashSet<String>>,
    severities: Option<Vec<Severity>>,
}

impl SingleFileTask {
    async fn run(self) -> Result<FileReport, OrchestratorError> {
        let node = self.build.graph.node(&self.file);
        let rel = self.file.strip_prefix(&self.root).unwrap_or(&self.file);
        let arch_id = node
            .and_then(|n| n.arch_id.clone())
            .or_else(|| self.registry.classify(rel).map(str::to_string));
        let Some(arch_id) = arch_id else {
            debug!(file = %self.file.display(), "no architecture matched, skipping");
            return Ok(FileReport::missing_architecture(self.file.clone()));
        };

        let resolved = match self.resolution.resolve(&self.registry, &arch_id) {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(file = %self.file.display(), "architecture resolution failed: {e}");
                return Ok(FileReport::errored(
                    self.file.clone(),
                    Some(arch_id),
                    e.to_string(),
                ));
            }
        };
        let content = match self.content.get_or_read(&self.file).await {
            Ok(content) => content,
            Err(e) => {
                return Ok(FileReport::errored(
                    self.file.clone(),
                    Some(arch_id),
                    format!("unreadable: {e}"),
                ));
            }
        };
        let imports = node.map_or_else(
            || self.graph_builder.scan_imports(&self.file, &content),
            |n| n.imports.clone(),
        );

        let file_ctx = FileContext::new(
            self.file.clone(),
            &self.root,
            Some(arch_id.clone()),
            content,
            imports,
        );
        let ctx = RuleContext {
            file: &file_ctx,
            project: None,
        };

        let allows: Vec<&Constraint> = resolved
            .constraints_for(rules::ALLOW_IMPORT)
            .collect();

        let mut report = FileReport::new(self.file.clone(), Some(arch_id));
        for constraint in &resolved.constraints {
            if rules::is_graph_rule(&constraint.rule)
                || constraint.rule == rules::ALLOW_IMPORT
                || self.skip.contains(&constraint.rule)
            {
                continue;
            }
            let Some(violations) = self.validators.dispatch(constraint, &ctx)? else {
                continue;
            };
            for violation in violations {
                if let Some(suppression) = allow_suppression(&violation, &allows) {
                    report.overrides_active.push(suppression);
                    continue;
                }
                if severity_selected(self.severities.as_deref(), violation.severity) {
                    report.push(violation);
                }
            }
        }
        Ok(report)
    }
}

/// One graph-dependent validation unit, spawned per eligible file.
struct GraphRuleTask {
    root: PathBuf,
    file: PathBuf,
    arch_id: String,
    registry: Arc<Registry>,
    validators: Arc<ValidatorRegistry>,
    build: Arc<GraphBuild>,
    resolution: Arc<ResolutionCache>,
    content: Arc<ContentCache>,
    skip: Arc<HashSet<String>>,
    severities: Option<Vec<Severity>>,
}

impl GraphRuleTask {
    async fn run(self) -> Result<Vec<Violation>, OrchestratorError> {
        let resolved = match self.resolution.resolve(&self.registry, &self.arch_id) {
            Ok(resolved) => resolved,
            // Already degraded in the single-file phase.
            Err(_) => return Ok(Vec::new()),
        };
        let graph_constraints: Vec<&Constraint> = resolved
            .constraints
            .iter()
            .filter(|c| rules::is_graph_rule(&c.rule) && !self.skip.contains(&c.rule))
            .collect();
        if graph_constraints.is_empty() {
            return Ok(Vec::new());
        }

        let content = match self.content.get_or_read(&self.file).await {
            Ok(content) => content,
            Err(_) => return Ok(Vec::new()),
        };
        let imports = self
            .build
            .graph
            .node(&self.file)
            .map(|n| n.imports.clone())
            .unwrap_or_default();
        let file_ctx = FileContext::new(
            self.file.clone(),
            &self.root,
            Some(self.arch_id.clone()),
            content,
            imports,
        );
        let view = ProjectView {
            importers: self.build.graph.importers(&self.file),
            cycles: self.build.cycles_through(&self.file),
        };
        let ctx = RuleContext {
            file: &file_ctx,
            project: Some(&view),
        };

        let mut violations = Vec::new();
        for constraint in graph_constraints {
            if let Some(found) = self.validators.dispatch(constraint, &ctx)? {
                violations.extend(
                    found
                        .into_iter()
                        .filter(|v| severity_selected(self.severities.as_deref(), v.severity)),
                );
            }
        }
        Ok(violations)
    }
}

/// Returns the suppression note when an `allow_import` entry covers the
/// violation's matched target.
fn allow_suppression(violation: &Violation, allows: &[&Constraint]) -> Option<String> {
    if violation.rule != rules::FORBID_IMPORT {
        return None;
    }
    let target = violation.target.as_deref()?;
    for allow in allows {
        let Some(patterns) = allow.value.as_str_list() else {
            continue;
        };
        if let Some(pattern) = patterns
            .iter()
            .find(|p| crate::utils::import_matches(target, p))
        {
            return Some(format!(
                "allow_import `{pattern}` suppressed forbid_import on `{target}`"
            ));
        }
    }
    None
}

fn severity_selected(wanted: Option<&[Severity]>, severity: Severity) -> bool {
    wanted.map_or(true, |list| list.contains(&severity))
}

fn coverage_config_from(constraint: &Constraint) -> Result<CoverageConfig, ValidatorError> {
    let malformed = || ValidatorError::MalformedValue {
        rule: rules::REQUIRE_COVERAGE.to_string(),
        expected: "a table with `sources`, `pattern`, and `targets`",
        found: constraint.value.to_string(),
    };
    let map = constraint.value.as_map().ok_or_else(malformed)?;

    let globs = |key: &str| -> Option<Vec<String>> {
        match map.get(key)? {
            serde_json::Value::String(s) => Some(vec![s.clone()]),
            serde_json::Value::Array(items) => items
                .iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => None,
        }
    };

    Ok(CoverageConfig {
        key: constraint.key(),
        source_globs: globs("sources").ok_or_else(malformed)?,
        source_pattern: map
            .get("pattern")
            .and_then(|v| v.as_str())
            .ok_or_else(malformed)?
            .to_string(),
        target_globs: globs("targets").ok_or_else(malformed)?,
        covering_pattern: map
            .get("covering")
            .and_then(|v| v.as_str())
            .map(str::to_string),
    })
}

/// Phase 5: merge everything into one batch report with the summary
/// accounting: package and layer violations increment both the error and
/// failed counts; coverage gaps increment only the error count; similarity
/// violations increment per their declared severity.
fn assemble_report(
    reports: Vec<FileReport>,
    build: &GraphBuild,
    run: &RunState,
    package: Vec<EdgeViolation>,
    layer: Vec<EdgeViolation>,
    coverage: Option<CoverageSummary>,
    similarity: Vec<SimilarityViolation>,
) -> BatchReport {
    let mut summary = BatchSummary {
        total: reports.len(),
        ..BatchSummary::default()
    };
    for report in &reports {
        match report.status {
            FileStatus::Pass => summary.passed += 1,
            FileStatus::Warn => summary.warned += 1,
            FileStatus::Fail => summary.failed += 1,
            FileStatus::MissingArchitecture => summary.skipped += 1,
            FileStatus::Errored => summary.errored += 1,
        }
        summary.total_errors += report.error_count;
        summary.total_warnings += report.warning_count;
    }

    summary.total_errors += package.len() + layer.len();
    summary.failed += package.len() + layer.len();

    let coverage = coverage.filter(|c| !c.gaps.is_empty());
    if let Some(c) = &coverage {
        summary.total_errors += c.gaps.len();
    }
    for v in &similarity {
        match v.severity {
            Severity::Error => summary.total_errors += 1,
            Severity::Warning => summary.total_warnings += 1,
        }
    }

    let stats = ProjectStats {
        graph_build_ms: build.build_time_ms,
        node_count: build.graph.len(),
        cycle_count: build.cycles.len(),
        cache: cache::stats(&run.content, &run.resolution),
    };

    BatchReport {
        files: reports,
        summary,
        stats,
        cycles: build.cycles.clone(),
        package_violations: (!package.is_empty()).then_some(package),
        layer_violations: (!layer.is_empty()).then_some(layer),
        coverage,
        similarity: (!similarity.is_empty()).then_some(similarity),
    }
}
