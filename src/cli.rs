//! Command-line interface.
//!
//! `tasksearch search` and `tasksearch expand` run one query against a JSON
//! task file; `tasksearch serve` starts the MCP server; `tasksearch config`
//! prints the effective configuration.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use console::style;

use crate::config::{load_config, SearchConfig};
use crate::corpus::{JsonFileTaskSource, TaskFilter, TaskSource};
use crate::error::{Result, TaskSearchError};
use crate::mcp::{run_http_server, run_server, TaskSearchServer};
use crate::search::{build_backend, ExpansionResponse, SearchRequest, SearchResponse, SearchService};

// ---------------------------------------------------------------------------
// CLI definition (clap derive)
// ---------------------------------------------------------------------------

/// Natural-language task search with typo tolerance and semantic escalation.
#[derive(Debug, Parser)]
#[command(name = "tasksearch", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Explicit config file, layered over user and project config
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Search a task file
    Search {
        /// Query text
        query: String,

        /// JSON file with a task array (or {"tasks": [...]})
        #[arg(long)]
        tasks: PathBuf,

        /// Maximum number of matches
        #[arg(long)]
        limit: Option<usize>,

        /// Minimum score in [0, 1]
        #[arg(long)]
        min_score: Option<f64>,

        /// Always consult the semantic backend
        #[arg(long)]
        force_semantic: bool,

        /// Include completed tasks
        #[arg(long)]
        all: bool,

        /// Print the JSON response instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show how a query is normalized and expanded
    Expand {
        query: String,

        /// Task file whose vocabulary sharpens typo correction
        #[arg(long)]
        tasks: Option<PathBuf>,
    },
    /// Run the MCP server (stdio by default)
    Serve {
        #[arg(long)]
        tasks: PathBuf,

        /// Listen on HTTP at this address instead of stdio
        #[arg(long, value_name = "ADDR")]
        http: Option<String>,

        /// Only expose tasks with this label
        #[arg(long)]
        label: Option<String>,
    },
    /// Print the effective configuration as YAML
    Config,
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Run a parsed command. Returns the process exit code.
pub async fn run(cli: Cli) -> Result<i32> {
    let project_root = std::env::current_dir().ok();
    let config = load_config(cli.config.as_deref(), project_root.as_deref())?;

    match cli.command {
        Commands::Search {
            query,
            tasks,
            limit,
            min_score,
            force_semantic,
            all,
            json,
        } => {
            let request = SearchRequest {
                query,
                limit,
                min_score,
                force_semantic: Some(force_semantic),
            };
            let filter = TaskFilter {
                include_completed: all,
                ..Default::default()
            };
            cmd_search(config, &tasks, &filter, &request, json).await
        }
        Commands::Expand { query, tasks } => cmd_expand(config, &query, tasks.as_deref()),
        Commands::Serve { tasks, http, label } => {
            let filter = TaskFilter {
                label,
                ..Default::default()
            };
            cmd_serve(config, tasks, filter, http.as_deref()).await
        }
        Commands::Config => {
            print!("{}", serde_yaml::to_string(&config)?);
            Ok(0)
        }
    }
}

fn build_service(config: SearchConfig) -> Result<SearchService> {
    let timeout = Duration::from_millis(config.escalation.timeout_ms);
    let backend = build_backend(&config.semantic, timeout)?;
    Ok(SearchService::new(config).with_optional_backend(backend))
}

async fn cmd_search(
    config: SearchConfig,
    tasks: &Path,
    filter: &TaskFilter,
    request: &SearchRequest,
    json: bool,
) -> Result<i32> {
    let service = build_service(config)?;
    let options = request.validate(&service.config().limits)?;
    let source = JsonFileTaskSource::new(tasks);
    let corpus = source.get_tasks(filter)?;
    let result = service.search(&request.query, &corpus, &options).await;
    let mut response =
        SearchResponse::from_result(&result, service.config().limits.variation_preview);
    response.skipped_tasks += source.skipped();

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(0);
    }

    if response.matches.is_empty() {
        eprintln!("{}", style("No matching tasks.").dim());
        return Ok(1);
    }
    for m in &response.matches {
        println!(
            "{:>3}  {}  {}",
            style(m.score).bold().green(),
            style(&m.id).cyan(),
            m.content
        );
        if let Some(reasoning) = &m.reasoning {
            println!("     {}", style(reasoning).dim());
        }
    }
    eprintln!(
        "{} {} match(es) via {} in {} ms",
        style("→").dim(),
        response.match_count,
        response.search_method.as_str(),
        response.search_time_ms
    );
    if response.skipped_tasks > 0 {
        eprintln!(
            "{} skipped {} task(s) without id or content",
            style("!").yellow(),
            response.skipped_tasks
        );
    }
    Ok(0)
}

fn cmd_expand(config: SearchConfig, query: &str, tasks: Option<&Path>) -> Result<i32> {
    if query.trim().is_empty() {
        return Err(TaskSearchError::Validation("query must not be empty".into()));
    }
    let corpus = match tasks {
        Some(path) => JsonFileTaskSource::new(path).get_tasks(&TaskFilter::default())?,
        None => Vec::new(),
    };
    let service = SearchService::new(config);
    let (nq, variants) = service.expand(query, &corpus);
    println!(
        "{}",
        serde_json::to_string_pretty(&ExpansionResponse::new(&nq, variants))?
    );
    Ok(0)
}

async fn cmd_serve(
    config: SearchConfig,
    tasks: PathBuf,
    filter: TaskFilter,
    http: Option<&str>,
) -> Result<i32> {
    let service = Arc::new(build_service(config)?);
    let source: Arc<dyn TaskSource> = Arc::new(JsonFileTaskSource::new(tasks));
    // Warm the lexicon with corpus vocabulary so the first query benefits.
    if let Ok(corpus) = source.get_tasks(&filter) {
        service.rebuild_lexicon(&corpus);
    }
    let server = TaskSearchServer::new(service, source).with_filter(filter);

    let outcome = match http {
        Some(addr) => run_http_server(server, addr).await,
        None => run_server(server).await,
    };
    outcome.map_err(|e| TaskSearchError::Other(e.to_string()))?;
    Ok(0)
}
