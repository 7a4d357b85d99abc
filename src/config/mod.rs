//! Configuration: schema and layered loading.

pub mod loader;
pub mod schema;

pub use loader::load_config;
pub use schema::{
    EscalationConfig, ExpansionConfig, FuzzyConfig, LimitsConfig, ParallelConfig, SearchConfig,
    SemanticBackendKind, SemanticConfig,
};
