//! MCP server: Model Context Protocol over stdio and HTTP.
//!
//! - [`tools`]: tool handlers returning JSON text
//! - [`server`]: rmcp tool router and `ServerHandler`
//! - [`http`]: streamable HTTP transport via axum

pub mod http;
pub mod server;
pub mod tools;

pub use http::run_http_server;
pub use server::{run_server, TaskSearchServer};
