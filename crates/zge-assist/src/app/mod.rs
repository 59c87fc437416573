//! Application layer: the text passes and the commands built on them.

pub mod commands;
pub mod folding;
pub mod host;
pub mod spacing;
