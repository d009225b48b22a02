//! Iterative research orchestration.
//!
//! Drives one session through planning, `depth` rounds of at most
//! `breadth` queries each, and report synthesis:
//!
//! ```text
//! validate → plan → round 0 .. round depth-1 → synthesize → hook → COMPLETED
//!                          │        ▲
//!                          └ expand ┘
//! ```
//!
//! Queries run one at a time. Each processed query is announced with an
//! `IN_PROGRESS` snapshot before its search starts, and its findings and
//! URLs are appended whatever they contain. Any error that escapes the
//! stages ends the session with a single `ERROR` snapshot.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::budget::TokenBudget;
use super::config::ResearchConfig;
use super::expander::QueryExpander;
use super::planner::ParameterPlanner;
use super::progress::{CompletionHook, ProgressSink, ProgressSnapshot};
use super::prompt::PromptSet;
use super::provider::{LlmProvider, SearchProvider};
use super::request::{ResearchParameters, ResearchRequest};
use super::synthesizer::ReportSynthesizer;
use super::worker::SearchWorker;
use crate::error::ResearchError;

/// Runs research sessions against shared provider clients.
///
/// One orchestrator serves any number of concurrent sessions; it holds no
/// per-session state.
pub struct Orchestrator {
    llm: Arc<dyn LlmProvider>,
    search: Arc<dyn SearchProvider>,
    planner: ParameterPlanner,
    expander: QueryExpander,
    worker: SearchWorker,
    synthesizer: ReportSynthesizer,
}

/// Aggregates of one running session.
struct Session<'a> {
    sink: &'a dyn ProgressSink,
    cancel: &'a CancellationToken,
    total: u32,
    started: u32,
    learnings: Vec<String>,
    urls: Vec<String>,
}

impl Session<'_> {
    fn check_cancelled(&self) -> Result<(), ResearchError> {
        if self.cancel.is_cancelled() {
            return Err(ResearchError::Cancelled);
        }
        Ok(())
    }

    /// Awaits `call` unless the session is cancelled first. A cancelled
    /// call is dropped mid-flight.
    async fn guard<T>(&self, call: impl Future<Output = T>) -> Result<T, ResearchError> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(ResearchError::Cancelled),
            out = call => Ok(out),
        }
    }

    async fn announce(&self, query: &str) -> Result<(), ResearchError> {
        tracing::debug!(query, progress = self.started, total = self.total, "research progress");
        self.sink
            .send(ProgressSnapshot::in_progress(
                query,
                &self.learnings,
                &self.urls,
                self.started,
                self.total,
            ))
            .await
    }
}

impl Orchestrator {
    /// Creates an orchestrator with the given providers and configuration.
    ///
    /// Loads prompt templates from [`ResearchConfig::prompt_dir`], falling
    /// back to compiled-in defaults, and the `cl100k_base` tokenizer.
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        search: Arc<dyn SearchProvider>,
        config: &ResearchConfig,
    ) -> Self {
        let prompts = PromptSet::load(config.prompt_dir.as_deref());
        let budget = Arc::new(TokenBudget::new(config.tiers.clone()));
        Self::with_components(llm, search, config, &prompts, budget)
    }

    /// Creates an orchestrator from explicit prompts and a token budget.
    pub fn with_components(
        llm: Arc<dyn LlmProvider>,
        search: Arc<dyn SearchProvider>,
        config: &ResearchConfig,
        prompts: &PromptSet,
        budget: Arc<TokenBudget>,
    ) -> Self {
        Self {
            llm,
            search,
            planner: ParameterPlanner::new(config, prompts.planner.clone()),
            expander: QueryExpander::new(config, prompts.expander.clone()),
            worker: SearchWorker::new(config, Arc::clone(&budget), prompts.extractor.clone()),
            synthesizer: ReportSynthesizer::new(config, budget, prompts),
        }
    }

    /// Plans breadth and depth for a request without running it.
    pub async fn plan(&self, request: &ResearchRequest) -> ResearchParameters {
        self.planner
            .plan(self.llm.as_ref(), &request.full_query(), request.speed)
            .await
            .into_inner()
    }

    /// Runs one session to completion.
    ///
    /// Returns the terminal snapshot after it has been sent to `sink`.
    pub async fn run_research(
        &self,
        request: &ResearchRequest,
        sink: &dyn ProgressSink,
        hook: Option<&dyn CompletionHook>,
    ) -> ProgressSnapshot {
        self.run_research_until(request, sink, hook, &CancellationToken::new())
            .await
    }

    /// Runs one session, stopping early once `cancel` fires.
    ///
    /// Every provider call races the token; a call still in flight when it
    /// fires is dropped. A cancelled session ends with an `ERROR` snapshot.
    pub async fn run_research_until(
        &self,
        request: &ResearchRequest,
        sink: &dyn ProgressSink,
        hook: Option<&dyn CompletionHook>,
        cancel: &CancellationToken,
    ) -> ProgressSnapshot {
        let mut session = Session {
            sink,
            cancel,
            total: 0,
            started: 0,
            learnings: Vec::new(),
            urls: Vec::new(),
        };

        let terminal = match self.drive(request, hook, &mut session).await {
            Ok(terminal) => terminal,
            Err(e) => {
                tracing::error!(query = %request.query, error = %e, "research session failed");
                ProgressSnapshot::failed(e.to_string(), session.learnings, session.urls)
            }
        };

        if let Err(e) = sink.send(terminal.clone()).await {
            tracing::warn!(error = %e, "terminal snapshot could not be delivered");
        }
        terminal
    }

    async fn drive(
        &self,
        request: &ResearchRequest,
        hook: Option<&dyn CompletionHook>,
        session: &mut Session<'_>,
    ) -> Result<ProgressSnapshot, ResearchError> {
        request.validate()?;
        let query = request.query.trim();
        let full_query = request.full_query();

        let params = session
            .guard(
                self.planner
                    .plan(self.llm.as_ref(), &full_query, request.speed),
            )
            .await?
            .into_inner();
        session.total = params.total();
        tracing::info!(
            query,
            breadth = params.breadth,
            depth = params.depth,
            "starting research"
        );
        session.announce(query).await?;

        let breadth = params.breadth as usize;
        let mut current = vec![query.to_string()];

        for round in 0..params.depth {
            if current.len() > breadth {
                tracing::debug!(
                    round,
                    dropped = current.len() - breadth,
                    "dropping follow-up queries beyond breadth"
                );
                current.truncate(breadth);
            }

            for q in &current {
                session.check_cancelled()?;
                session.started += 1;
                session.announce(q).await?;
                let extraction = session
                    .guard(self.worker.run(self.search.as_ref(), self.llm.as_ref(), q))
                    .await?;
                session.learnings.extend(extraction.findings);
                session.urls.extend(extraction.urls);
            }

            if round + 1 < params.depth {
                let mut next = Vec::new();
                for q in &current {
                    next.extend(
                        session
                            .guard(self.expander.expand(self.llm.as_ref(), q))
                            .await?,
                    );
                }
                current = next;
            }
        }

        let report = session
            .guard(self.synthesizer.synthesize(
                self.llm.as_ref(),
                &full_query,
                &session.learnings,
                &session.urls,
            ))
            .await?;

        let completed = ProgressSnapshot::completed(
            report,
            std::mem::take(&mut session.learnings),
            std::mem::take(&mut session.urls),
            session.total,
        );

        if let Some(hook) = hook {
            let report = completed.report.as_deref().unwrap_or_default();
            if let Err(e) = hook.on_complete(report, &completed.visited_urls).await {
                tracing::warn!(error = %e, "completion hook failed");
                return Ok(completed.with_error(e.to_string()));
            }
        }

        tracing::info!(
            query,
            learnings = completed.learnings.len(),
            urls = completed.visited_urls.len(),
            "research completed"
        );
        Ok(completed)
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("llm", &self.llm.name())
            .field("search", &self.search.name())
            .field("planner", &self.planner)
            .field("worker", &self.worker)
            .finish_non_exhaustive()
    }
}
