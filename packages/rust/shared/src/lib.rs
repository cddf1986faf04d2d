//! Shared types, error model, and configuration for Dossier.
//!
//! This crate is the foundation depended on by all other Dossier crates.
//! It provides:
//! - [`DossierError`]: the unified error type
//! - Domain types ([`ResearchRequest`], [`PageRecord`], [`ResearchBundle`], ...)
//! - Configuration ([`AppConfig`], [`ResearchConfig`], config loading)
//! - Text helpers ([`clean_text`], [`truncate_chars`])

pub mod config;
pub mod error;
pub mod text;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CohortConfig, ContextBudgets, DirectoryConfig, DomainListsConfig, FetchConfig,
    LimitsConfig, ResearchConfig, SearchConfig, SearchSettings, config_dir, config_file_path,
    init_config, load_config, load_config_from,
};
pub use error::{DossierError, Result};
pub use text::{char_len, clean_text, truncate_chars};
pub use types::{
    CohortContext, CohortPost, Contact, EmailMessage, Founder, Introducer, PageMap, PageRecord,
    RelationshipContext, ResearchBundle, ResearchRequest, SearchResult, TimelineEvent,
    normalize_domain,
};
