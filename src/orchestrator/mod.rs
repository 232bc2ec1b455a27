//! Run orchestration
//!
//! The orchestrator drives one inspection run through its phases:
//!
//! ```text
//! Idle → Initializing → BuildGraph → RunGlobal → ResolveUsages
//!      → RunLocal → Complete → Idle
//! ```
//!
//! Tool selection goes through the profile; graph construction is delegated
//! to the host's builder; global tools run serialized against the graph;
//! deferred usage searches resolve in fixpoint rounds; local tools run per
//! file, in parallel, filtered by the suppression resolver. Findings land in
//! the problem ledger, which is frozen at completion.
//!
//! A failing tool is isolated: logged, noted on its results, and the run
//! continues. A failing graph build aborts the run. Cancellation is
//! cooperative, checked once per unit of work, and discards the ledger.

mod progress;
mod usage_search;

pub use progress::{JobDescriptor, JobId, ProgressCallback, ProgressTracker};
pub use usage_search::{
    GraphSearchService, PendingSearchRequest, QueryKind, SearchQueue, SearchService,
    UsageProcessor,
};

use crossbeam_channel::unbounded;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::graph::{EntityId, ReferenceGraphBuilder, ScopeProvider, SymbolGraph};
use crate::ledger::{ProblemLedger, Snapshot};
use crate::models::Severity;
use crate::profile::ProfileHandle;
use crate::suppression::SuppressionResolver;
use crate::tools::{
    GlobalTool, LocalTool, RunSummary, SourceProvider, ToolInstance, ToolOutcome, ToolRegistry,
};

/// Execution phases of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Initializing,
    BuildGraph,
    RunGlobal,
    ResolveUsages,
    RunLocal,
    Complete,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Initializing => "initializing",
            Phase::BuildGraph => "build graph",
            Phase::RunGlobal => "global tools",
            Phase::ResolveUsages => "usage search",
            Phase::RunLocal => "local analysis",
            Phase::Complete => "complete",
        };
        write!(f, "{name}")
    }
}

/// Why a run did not complete.
#[derive(Debug, Error)]
pub enum RunError {
    /// Explicit abort. The in-flight ledger was discarded; nothing partial
    /// is ever reported as a completed run.
    #[error("inspection run cancelled")]
    Cancelled,
    /// The reference graph could not be built. Fatal for the whole run.
    #[error("reference graph build failed: {0}")]
    GraphBuild(#[source] anyhow::Error),
    /// Engine-internal failure, e.g. the worker pool could not start.
    #[error("inspection engine error: {0}")]
    Internal(#[source] anyhow::Error),
}

/// Cooperative cancellation flag shared between the caller and the run.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Checked at least once per unit of work in every phase.
    pub fn checkpoint(&self) -> Result<(), RunError> {
        if self.is_cancelled() {
            Err(RunError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Results of one completed run. A completed run with zero findings is
/// distinct from an aborted run, which yields [`RunError`] instead.
pub struct RunOutcome {
    /// The frozen ledger.
    pub ledger: Arc<ProblemLedger>,
    pub summary: RunSummary,
    /// Per-tool execution outcomes, failure notes included.
    pub outcomes: Vec<ToolOutcome>,
    /// Effective severity per selected tool, resolved through the profile.
    pub severities: FxHashMap<String, Severity>,
    /// Usage-search rounds executed.
    pub search_rounds: usize,
}

impl std::fmt::Debug for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunOutcome")
            .field("summary", &self.summary)
            .field("outcomes", &self.outcomes)
            .field("severities", &self.severities)
            .field("search_rounds", &self.search_rounds)
            .finish_non_exhaustive()
    }
}

/// Phased run controller.
pub struct Orchestrator {
    registry: ToolRegistry,
    profile: Arc<ProfileHandle>,
    graph_builder: Arc<dyn ReferenceGraphBuilder>,
    search: Arc<dyn SearchService>,
    source: Arc<dyn SourceProvider>,
    workers: usize,
    diff_mode: bool,
    baseline: Option<Snapshot>,
    progress_callback: Option<ProgressCallback>,
    phase: Phase,
}

impl Orchestrator {
    pub fn new(
        registry: ToolRegistry,
        profile: Arc<ProfileHandle>,
        graph_builder: Arc<dyn ReferenceGraphBuilder>,
        search: Arc<dyn SearchService>,
        source: Arc<dyn SourceProvider>,
    ) -> Self {
        Self {
            registry,
            profile,
            graph_builder,
            search,
            source,
            workers: 0,
            diff_mode: false,
            baseline: None,
            progress_callback: None,
            phase: Phase::Idle,
        }
    }

    /// Worker threads for per-file analysis. 0 = auto-detect, capped at 16.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Toggle run-to-run diffing. Turning it off drops the retained snapshot.
    pub fn set_diff_mode(&mut self, enabled: bool) {
        self.diff_mode = enabled;
        if !enabled {
            self.baseline = None;
        }
    }

    pub fn diff_mode(&self) -> bool {
        self.diff_mode
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Execute one run over `scope`.
    pub fn run(
        &mut self,
        scope: &dyn ScopeProvider,
        cancel: &CancelFlag,
    ) -> Result<RunOutcome, RunError> {
        let result = self.run_phases(scope, cancel);
        self.phase = Phase::Idle;
        result
    }

    fn run_phases(
        &mut self,
        scope: &dyn ScopeProvider,
        cancel: &CancelFlag,
    ) -> Result<RunOutcome, RunError> {
        let started = Instant::now();
        let progress = ProgressTracker::new(self.progress_callback.clone());

        // Initializing: select and instantiate enabled tools.
        self.phase = Phase::Initializing;
        cancel.checkpoint()?;
        let init_job = progress.add_job("initializing", 1.0);
        let profile = self.profile.get();
        let mut local_tools: Vec<Arc<dyn LocalTool>> = Vec::new();
        let mut global_tools: Vec<Arc<dyn GlobalTool>> = Vec::new();
        let mut severities: FxHashMap<String, Severity> = FxHashMap::default();

        for factory in self.registry.iter() {
            let id = factory.identity().id.clone();
            let state = profile.resolve_with_default(&id, Some(factory.default_state()));
            if !state.enabled {
                debug!("tool {} disabled by profile", id);
                continue;
            }
            severities.insert(id, state.severity);
            match factory.create() {
                ToolInstance::Local(tool) => local_tools.push(tool),
                ToolInstance::Global(tool) => global_tools.push(tool),
            }
        }
        info!(
            "selected {} local and {} global tools",
            local_tools.len(),
            global_tools.len()
        );
        progress.finish(init_job);

        // The retained snapshot survives an aborted run; only a completed
        // run replaces it.
        let ledger = Arc::new(match (self.diff_mode, self.baseline.as_ref()) {
            (true, Some(baseline)) => ProblemLedger::new().with_baseline(baseline.clone()),
            _ => ProblemLedger::new(),
        });

        let workers = effective_workers(self.workers);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| RunError::Internal(e.into()))?;

        // BuildGraph: delegated; reference resolution is skipped when no
        // global tool needs the whole graph.
        self.phase = Phase::BuildGraph;
        cancel.checkpoint()?;
        let graph_job = progress.add_job("build graph", 1.0);
        let needs_references = !global_tools.is_empty();
        if !needs_references {
            debug!("no global tools selected; skipping reference resolution");
        }
        let graph = self
            .graph_builder
            .build(scope, needs_references, cancel)
            .map_err(|e| {
                if cancel.is_cancelled() {
                    RunError::Cancelled
                } else {
                    RunError::GraphBuild(e)
                }
            })?;
        info!("graph ready: {} entities", graph.len());
        progress.finish(graph_job);

        let mut outcomes: Vec<ToolOutcome> = Vec::new();
        let queue = SearchQueue::new();

        // RunGlobal: serialized, tools share and may annotate the graph.
        self.phase = Phase::RunGlobal;
        let global_job = progress.add_job("global tools", global_tools.len() as f64);
        let mut continuations: Vec<Arc<dyn GlobalTool>> = Vec::new();
        for tool in &global_tools {
            cancel.checkpoint()?;
            let id = tool.identity().id.clone();
            let timer = Instant::now();
            let writer = ledger.writer(&id);
            match tool.run(&graph, &writer) {
                Ok(()) => {
                    let elapsed = timer.elapsed().as_millis() as u64;
                    outcomes.push(ToolOutcome::success(
                        &id,
                        ledger.findings_count(&id),
                        elapsed,
                    ));
                }
                Err(e) => {
                    let elapsed = timer.elapsed().as_millis() as u64;
                    warn!("global tool {} failed: {:#}", id, e);
                    ledger.record_failure(&id, format!("{e:#}"));
                    outcomes.push(ToolOutcome::failure(&id, format!("{e:#}"), elapsed));
                }
            }
            if let Some(us) = tool.usage_search() {
                if us.query_external_usages(&queue) {
                    continuations.push(Arc::clone(tool));
                }
            }
            progress.advance(global_job, 1.0);
        }

        // ResolveUsages: fixpoint rounds over the queued requests.
        self.phase = Phase::ResolveUsages;
        let search_rounds = self.resolve_usages(
            &pool,
            &graph,
            &queue,
            continuations,
            &progress,
            cancel,
        )?;

        // RunLocal: per file, parallel, suppression-filtered.
        self.phase = Phase::RunLocal;
        let local_outcomes = self.run_local(
            &pool,
            &graph,
            scope,
            &local_tools,
            &ledger,
            &progress,
            cancel,
        )?;
        outcomes.extend(local_outcomes);

        // Complete: freeze and optionally retain a snapshot for diffing.
        self.phase = Phase::Complete;
        cancel.checkpoint()?;
        ledger.freeze();
        if self.diff_mode {
            self.baseline = Some(ledger.snapshot());
        }

        let mut summary = RunSummary::default();
        for outcome in &outcomes {
            summary.add_outcome(outcome);
        }
        summary.by_severity = ledger.severity_counts();
        info!(
            "run complete: {} findings from {}/{} tools in {:?}",
            summary.total_findings,
            summary.tools_succeeded,
            summary.tools_run,
            started.elapsed()
        );

        Ok(RunOutcome {
            ledger,
            summary,
            outcomes,
            severities,
            search_rounds,
        })
    }

    fn resolve_usages(
        &self,
        pool: &rayon::ThreadPool,
        graph: &SymbolGraph,
        queue: &SearchQueue,
        mut continuations: Vec<Arc<dyn GlobalTool>>,
        progress: &ProgressTracker,
        cancel: &CancelFlag,
    ) -> Result<usize, RunError> {
        let job = progress.add_job("usage search", 0.0);
        let mut rounds = 0usize;

        loop {
            cancel.checkpoint()?;
            let requests = queue.drain();
            if requests.is_empty() {
                if continuations.is_empty() {
                    break;
                }
                // Ask continuing tools for more work. A tool that wants
                // another round must actually queue requests.
                continuations.retain(|tool| match tool.usage_search() {
                    Some(us) => us.query_external_usages(queue),
                    None => false,
                });
                if queue.is_empty() {
                    break;
                }
                continue;
            }

            rounds += 1;
            progress.grow_total(job, (requests.len() * 2) as f64);
            debug!("usage search round {}: {} requests", rounds, requests.len());

            // One round dispatches every request; requests may run in
            // parallel, but the round is a barrier.
            let search = Arc::clone(&self.search);
            pool.install(|| {
                requests.par_iter().try_for_each(|request| {
                    cancel.checkpoint()?;
                    for processor in &request.processors {
                        search.search(graph, request.symbol, request.kind, processor.as_ref());
                    }
                    progress.advance(job, 2.0);
                    Ok(())
                })
            })?;

            // Satisfaction is only decided now that the round is complete.
            for request in requests {
                let unsatisfied: Vec<_> = request
                    .processors
                    .into_iter()
                    .filter(|p| !p.is_satisfied())
                    .collect();
                if !unsatisfied.is_empty() {
                    queue.enqueue(PendingSearchRequest {
                        symbol: request.symbol,
                        kind: request.kind,
                        processors: unsatisfied,
                    });
                }
            }
        }

        progress.finish(job);
        if rounds > 0 {
            info!("usage search settled after {} rounds", rounds);
        }
        Ok(rounds)
    }

    #[allow(clippy::too_many_arguments)]
    fn run_local(
        &self,
        pool: &rayon::ThreadPool,
        graph: &SymbolGraph,
        scope: &dyn ScopeProvider,
        local_tools: &[Arc<dyn LocalTool>],
        ledger: &ProblemLedger,
        progress: &ProgressTracker,
        cancel: &CancelFlag,
    ) -> Result<Vec<ToolOutcome>, RunError> {
        let files: Vec<EntityId> = graph
            .files()
            .into_iter()
            .filter(|id| {
                graph
                    .entity(*id)
                    .filter(|e| e.valid)
                    .and_then(|e| e.file.as_deref())
                    .map(|path| scope.contains(path))
                    .unwrap_or(false)
            })
            .collect();
        let job = progress.add_job("local analysis", files.len() as f64);
        if local_tools.is_empty() || files.is_empty() {
            progress.finish(job);
            return Ok(Vec::new());
        }

        let resolver = SuppressionResolver::new(graph, Arc::clone(&self.source));
        let (tx, rx) = unbounded::<LocalEvent>();

        let walk = pool.install(|| {
            files.par_iter().try_for_each_with(tx, |tx, file_id| {
                cancel.checkpoint()?;
                let Some(file) = graph.entity(*file_id) else {
                    progress.advance(job, 1.0);
                    return Ok(());
                };
                for tool in local_tools {
                    let id = tool.identity().id.as_str();
                    let timer = Instant::now();
                    match tool.visit(file, graph) {
                        Ok(descriptors) => {
                            let mut recorded = 0usize;
                            let mut by_entity: FxHashMap<EntityId, Vec<_>> = FxHashMap::default();
                            for descriptor in descriptors {
                                let entity = descriptor
                                    .location()
                                    .map(|l| l.entity)
                                    .unwrap_or(*file_id);
                                if resolver.is_suppressed(id, entity) {
                                    debug!("suppressed {} finding at {:?}", id, entity);
                                    continue;
                                }
                                by_entity.entry(entity).or_default().push(descriptor);
                            }
                            for (entity, group) in by_entity {
                                recorded += ledger.record(id, entity, group).len();
                            }
                            let _ = tx.send(LocalEvent {
                                tool_id: id.to_string(),
                                duration_ms: timer.elapsed().as_millis() as u64,
                                findings: recorded,
                                error: None,
                            });
                        }
                        Err(e) => {
                            warn!("local tool {} failed on {}: {:#}", id, file.name, e);
                            let _ = tx.send(LocalEvent {
                                tool_id: id.to_string(),
                                duration_ms: timer.elapsed().as_millis() as u64,
                                findings: 0,
                                error: Some(format!("{}: {e:#}", file.name)),
                            });
                        }
                    }
                }
                progress.advance(job, 1.0);
                Ok(())
            })
        });
        walk?;

        // Fold the per-file events into one outcome per tool.
        let mut aggregate: FxHashMap<String, (usize, u64, Vec<String>)> = FxHashMap::default();
        for event in rx.iter() {
            let entry = aggregate.entry(event.tool_id).or_default();
            entry.0 += event.findings;
            entry.1 += event.duration_ms;
            if let Some(error) = event.error {
                entry.2.push(error);
            }
        }

        let mut outcomes = Vec::new();
        for tool in local_tools {
            let id = tool.identity().id.clone();
            let (findings, duration_ms, errors) =
                aggregate.remove(&id).unwrap_or((0, 0, Vec::new()));
            if errors.is_empty() {
                outcomes.push(ToolOutcome::success(&id, findings, duration_ms));
            } else {
                let note = errors.join("; ");
                ledger.record_failure(&id, note.clone());
                outcomes.push(ToolOutcome::failure(&id, note, duration_ms));
            }
        }
        Ok(outcomes)
    }
}

/// Worker count: explicit, or auto-detected and capped at 16.
fn effective_workers(configured: usize) -> usize {
    if configured > 0 {
        configured
    } else {
        std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(4)
            .min(16)
    }
}

struct LocalEvent {
    tool_id: String,
    duration_ms: u64,
    findings: usize,
    error: Option<String>,
}
