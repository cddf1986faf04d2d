//! Research pipeline orchestration and context assembly for Dossier.
//!
//! This crate ties together domain crawling, web search, external scraping,
//! and directory probing into a single `research` call, then merges the
//! results into one bounded context document.

pub mod assembler;
pub mod pipeline;

pub use assembler::{ContextInputs, assemble_context};
pub use pipeline::{ProgressReporter, ResearchEngine, ResearchReport, SilentProgress};
