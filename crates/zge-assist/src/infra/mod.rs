//! Infrastructure adapters for files, processes, config, and terminal output.

pub mod config;
pub mod document;
pub mod folds;
pub mod line_endings;
pub mod logging;
pub mod reporter;
pub mod zge;
