//! CLI subcommand implementations.

pub mod directory;
pub mod dispatch;
pub mod group;
pub mod history;
pub mod normalize;
pub mod resolve;
