//! Scripted provider doubles for unit tests.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::message::{ChatRequest, ChatResponse, TokenUsage};
use super::prompt::PromptSet;
use super::provider::{LlmProvider, SearchHit, SearchOptions, SearchProvider, SearchResponse};
use crate::error::ResearchError;

/// Pipeline stage a request belongs to, recovered from its system prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Planner,
    Selector,
    Expander,
    Extractor,
    Outline,
    RankedReport,
    Report,
    Unknown,
}

impl Stage {
    pub fn of(request: &ChatRequest) -> Self {
        let prompts = PromptSet::defaults();
        let system = request
            .messages
            .first()
            .map_or("", |m| m.content.as_str());
        if system == prompts.planner {
            Self::Planner
        } else if system == prompts.selector {
            Self::Selector
        } else if system == prompts.expander {
            Self::Expander
        } else if system == prompts.extractor {
            Self::Extractor
        } else if system == prompts.outline {
            Self::Outline
        } else if system == prompts.ranked_report {
            Self::RankedReport
        } else if system == prompts.report {
            Self::Report
        } else {
            Self::Unknown
        }
    }
}

type LlmRoute = Box<dyn Fn(Stage, &ChatRequest) -> Result<String, String> + Send + Sync>;

/// LLM double answering from a queue, then from an optional router.
pub struct ScriptedLlm {
    queue: Mutex<VecDeque<Result<String, String>>>,
    router: Option<LlmRoute>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            router: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn routed(
        route: impl Fn(Stage, &ChatRequest) -> Result<String, String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            router: Some(Box::new(route)),
            ..Self::new()
        }
    }

    pub fn reply(self, content: &str) -> Self {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Ok(content.to_string()));
        self
    }

    pub fn fail(self, message: &str) -> Self {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Err(message.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.requests().iter().map(Stage::of).collect()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ResearchError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let queued = self
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let outcome = match (queued, &self.router) {
            (Some(outcome), _) => outcome,
            (None, Some(route)) => route(Stage::of(request), request),
            (None, None) => Err("no scripted reply".to_string()),
        };

        outcome
            .map(|content| ChatResponse {
                content,
                usage: TokenUsage::default(),
                finish_reason: Some("stop".to_string()),
            })
            .map_err(|message| ResearchError::ApiRequest {
                message,
                status: None,
            })
    }
}

type SearchRoute = Box<dyn Fn(&str) -> Result<SearchResponse, ResearchError> + Send + Sync>;

/// Search double answering through a router closure.
pub struct ScriptedSearch {
    route: SearchRoute,
    queries: Mutex<Vec<String>>,
}

impl ScriptedSearch {
    pub fn routed(
        route: impl Fn(&str) -> Result<SearchResponse, ResearchError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            route: Box::new(route),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Every query returns one hit whose URL is derived from the query.
    pub fn echo() -> Self {
        Self::routed(|q| {
            Ok(SearchResponse {
                success: true,
                data: vec![hit(&format!("https://example.com/{}", q.replace(' ', "-")))],
            })
        })
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl SearchProvider for ScriptedSearch {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn search(
        &self,
        query: &str,
        _options: &SearchOptions,
    ) -> Result<SearchResponse, ResearchError> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(query.to_string());
        (self.route)(query)
    }
}

pub fn hit(url: &str) -> SearchHit {
    SearchHit {
        url: url.to_string(),
        title: format!("Title for {url}"),
        description: format!("Description for {url}"),
    }
}
