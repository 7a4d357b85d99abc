//! Natural-language task search: normalization, query expansion, fuzzy
//! matching, semantic escalation, and the orchestrating service.

pub mod expansion;
pub mod fuzzy;
pub mod lexicon;
pub mod normalize;
pub mod response;
pub mod semantic;
pub mod service;

pub use expansion::{expand_query, QueryExpander};
pub use lexicon::{Lexicon, SharedLexicon, SynonymTable};
pub use normalize::normalize;
pub use response::{ExpansionResponse, SearchRequest, SearchResponse};
pub use semantic::{build_backend, HttpSemanticBackend, SemanticBackend, SemanticHit};
pub use service::SearchService;
