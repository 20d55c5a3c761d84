//! Kv Language Server
//!
//! A Language Server Protocol implementation reporting lint diagnostics for
//! the Kivy kv language, in `.kv` files and in kv blocks embedded in Python.
//!
//! This library provides:
//! - LSP framing and a synchronous dispatcher
//! - Embedded kv block extraction
//! - A rule based lint engine with a built-in kv syntax checker
//! - Configuration and logging setup

pub mod config;
pub mod core;
pub mod logging;
pub mod lsp;
pub mod parser;
pub mod validation;

pub use config::Config;
pub use crate::core::{LanguageId, TextDocumentItem, TextDocumentStore};
pub use lsp::Server;
pub use validation::LintEngine;
