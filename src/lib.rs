//! Rikstoto AI wrapper
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry points.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod fixtures;
pub mod generation;
pub mod llm;
pub mod prompt;
pub mod server;
pub mod types;
