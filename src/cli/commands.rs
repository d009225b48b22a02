//! CLI command implementations.
//!
//! Each command renders its result into a `String`. Long-running commands
//! build a tokio runtime and block on it, the same way for every command.

use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
#[cfg(any(feature = "store", feature = "server"))]
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::cli::output::{OutputFormat, format_plan, format_progress_line};
#[cfg(feature = "store")]
use crate::cli::output::{format_report, format_report_list};
#[cfg(feature = "store")]
use crate::cli::parser::ReportsCommands;
use crate::cli::parser::{Cli, Commands};
use crate::error::{CommandError, ResearchError, Result};
use crate::research::{
    CompletionHook, ModelSelector, Orchestrator, ParameterPlanner, ProgressSink, ProgressSnapshot,
    PromptSet, ResearchConfig, ResearchRequest, ResearchStatus, SpeedHint, create_provider,
    create_search_provider,
};
#[cfg(feature = "store")]
use crate::store::ReportStore;

/// Parameters for the research command.
#[derive(Debug, Clone)]
pub struct ResearchParams<'a> {
    /// The research question.
    pub query: &'a str,
    /// Clarification question/answer pairs.
    pub clarifications: &'a [(String, String)],
    /// Preferred session speed.
    pub speed: Option<SpeedHint>,
    /// Persist the finished report.
    pub save: bool,
    /// Directory containing prompt template files.
    pub prompt_dir: Option<&'a Path>,
}

/// Executes the CLI command.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);

    match &cli.command {
        Commands::Research {
            query,
            clarifications,
            speed,
            save,
            prompt_dir,
        } => {
            let params = ResearchParams {
                query,
                clarifications,
                speed: *speed,
                save: *save,
                prompt_dir: prompt_dir.as_deref(),
            };
            cmd_research(cli, &params, format)
        }
        Commands::Plan {
            query,
            speed,
            prompt_dir,
        } => cmd_plan(query, *speed, prompt_dir.as_deref(), format),
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),
        #[cfg(feature = "server")]
        Commands::Serve { host, port, save } => {
            #[cfg(feature = "store")]
            let db_path = save.then(|| cli.get_db_path());
            #[cfg(not(feature = "store"))]
            let db_path: Option<PathBuf> = if *save {
                return Err(store_disabled());
            } else {
                None
            };
            cmd_serve(host, *port, db_path)
        }
        #[cfg(feature = "store")]
        Commands::Reports(sub) => execute_reports(sub, &cli.get_db_path(), format),
    }
}

/// Builds configuration from the environment plus CLI overrides.
fn load_config(prompt_dir: Option<&Path>) -> Result<ResearchConfig> {
    let mut builder = ResearchConfig::builder().from_env();
    if let Some(dir) = prompt_dir {
        builder = builder.prompt_dir(dir);
    }
    Ok(builder.build()?)
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}")).into()
    })
}

/// Writes snapshots to the terminal as they arrive.
///
/// Text mode prints one progress line per snapshot to stderr; JSON mode
/// prints each snapshot as a JSON line to stdout.
#[derive(Debug, Clone, Copy)]
struct ConsoleSink {
    format: OutputFormat,
}

#[async_trait]
impl ProgressSink for ConsoleSink {
    async fn send(&self, snapshot: ProgressSnapshot) -> std::result::Result<(), ResearchError> {
        let written = match self.format {
            OutputFormat::Text => {
                writeln!(io::stderr().lock(), "{}", format_progress_line(&snapshot))
            }
            OutputFormat::Json => {
                let line =
                    serde_json::to_string(&snapshot).map_err(|e| ResearchError::Sink {
                        message: e.to_string(),
                    })?;
                writeln!(io::stdout().lock(), "{line}")
            }
        };
        written.map_err(|e| ResearchError::Sink {
            message: e.to_string(),
        })
    }
}

fn build_request(params: &ResearchParams<'_>) -> ResearchRequest {
    let mut request = params
        .clarifications
        .iter()
        .fold(ResearchRequest::new(params.query), |req, (q, a)| {
            req.clarify(q.as_str(), a.as_str())
        });
    if let Some(speed) = params.speed {
        request = request.with_speed(speed);
    }
    request
}

#[cfg(feature = "store")]
fn open_hook(cli: &Cli, request: &ResearchRequest) -> Result<Box<dyn CompletionHook>> {
    let store = Arc::new(ReportStore::open(&cli.get_db_path())?);
    Ok(Box::new(store.hook(request.query.trim())))
}

#[cfg(not(feature = "store"))]
fn open_hook(_cli: &Cli, _request: &ResearchRequest) -> Result<Box<dyn CompletionHook>> {
    Err(store_disabled())
}

#[cfg(not(feature = "store"))]
fn store_disabled() -> crate::error::Error {
    CommandError::InvalidArgument("--save requires the `store` feature".to_string()).into()
}

fn cmd_research(cli: &Cli, params: &ResearchParams<'_>, format: OutputFormat) -> Result<String> {
    let config = load_config(params.prompt_dir)?;
    let llm = create_provider(&config)?;
    let search = create_search_provider(&config)?;
    let orchestrator = Orchestrator::new(llm, search, &config);

    let request = build_request(params);
    let hook = if params.save {
        Some(open_hook(cli, &request)?)
    } else {
        None
    };

    let sink = ConsoleSink { format };
    let cancel = CancellationToken::new();
    let rt = runtime()?;
    let terminal = rt.block_on(async {
        let on_interrupt = cancel.clone();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_interrupt.cancel();
            }
        });
        let terminal = orchestrator
            .run_research_until(&request, &sink, hook.as_deref(), &cancel)
            .await;
        watcher.abort();
        terminal
    });

    match terminal.status {
        ResearchStatus::Completed => match format {
            OutputFormat::Text => Ok(format!(
                "{}\n",
                terminal.report.as_deref().unwrap_or("").trim_end()
            )),
            OutputFormat::Json => Ok(String::new()),
        },
        _ => Err(CommandError::ExecutionFailed(format!(
            "Research failed: {}",
            terminal.error.as_deref().unwrap_or("unknown error")
        ))
        .into()),
    }
}

fn cmd_plan(
    query: &str,
    speed: Option<SpeedHint>,
    prompt_dir: Option<&Path>,
    format: OutputFormat,
) -> Result<String> {
    let mut request = ResearchRequest::new(query);
    if let Some(speed) = speed {
        request = request.with_speed(speed);
    }
    request.validate()?;

    let config = load_config(prompt_dir)?;
    let llm = create_provider(&config)?;
    let prompts = PromptSet::load(config.prompt_dir.as_deref());
    let planner = ParameterPlanner::new(&config, prompts.planner);
    let selector = ModelSelector::new(&config, prompts.selector);

    let full_query = request.full_query();
    let rt = runtime()?;
    let (params, tier) = rt.block_on(async {
        let params = planner.plan(llm.as_ref(), &full_query, speed).await;
        let tier = selector.select(llm.as_ref(), &full_query).await;
        (params.into_inner(), tier.into_inner())
    });

    Ok(format_plan(request.query.trim(), params, tier, format))
}

fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(PathBuf::from)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                return Ok(format!(
                    "All prompt templates already exist in: {}\n",
                    target_dir.display()
                ));
            }
            let mut output = format!(
                "Wrote {} prompt template(s) to: {}\n",
                written.len(),
                target_dir.display()
            );
            for path in &written {
                let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("unknown");
                output.push_str("  ");
                output.push_str(name);
                output.push('\n');
            }
            output.push_str("\nEdit these files to customize the research prompts.\n");
            Ok(output)
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "directory": target_dir.to_string_lossy(),
                "written": written.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>(),
                "count": written.len()
            });
            Ok(format.to_json(&json))
        }
    }
}

/// Starts the WebSocket server and blocks until Ctrl-C.
#[cfg(feature = "server")]
fn cmd_serve(host: &str, port: u16, db_path: Option<PathBuf>) -> Result<String> {
    use crate::server::{ServerState, serve};

    let config = load_config(None)?;
    let llm = create_provider(&config)?;
    let search = create_search_provider(&config)?;
    let orchestrator = Arc::new(Orchestrator::new(llm, search, &config));

    #[cfg_attr(not(feature = "store"), allow(unused_mut))]
    let mut state = ServerState::new(orchestrator);
    #[cfg(feature = "store")]
    if let Some(path) = db_path {
        state = state.with_store(Arc::new(ReportStore::open(&path)?));
    }
    #[cfg(not(feature = "store"))]
    let _ = db_path;

    let rt = runtime()?;
    rt.block_on(serve(state, host, port))
        .map_err(|e| CommandError::ExecutionFailed(format!("Server error: {e}")))?;

    Ok(String::new())
}

#[cfg(feature = "store")]
fn execute_reports(cmd: &ReportsCommands, db_path: &Path, format: OutputFormat) -> Result<String> {
    let store = ReportStore::open(db_path)?;
    match cmd {
        ReportsCommands::List => Ok(format_report_list(&store.list()?, format)),
        ReportsCommands::Show { id } => Ok(format_report(&store.get(*id)?, format)),
    }
}
