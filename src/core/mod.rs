//! Core document management for the LSP server

pub mod document;
pub mod position;
pub mod scan_state;

pub use document::{Document, DocumentManager};
