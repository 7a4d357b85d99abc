//! tasksearch: natural-language search over a personal task list.
//!
//! Queries are normalized, expanded into typo-corrected and synonym
//! variants, scored against each task with fuzzy matching, and optionally
//! escalated to a semantic backend when the fuzzy pass comes up short.
//! The engine is exposed as a library, a CLI, and an MCP server.

pub mod cli;
pub mod config;
pub mod corpus;
pub mod error;
pub mod mcp;
pub mod observability;
pub mod search;
pub mod types;

pub use config::SearchConfig;
pub use error::{Result, TaskSearchError};
pub use search::SearchService;
pub use types::{SearchMethod, SearchOptions, SearchResult, Task};
