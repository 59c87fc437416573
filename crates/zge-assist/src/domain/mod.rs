//! Domain types shared by the text passes and commands.

pub mod errors;
pub mod model;
