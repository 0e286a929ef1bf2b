//! Engine module: store, CLI plumbing, progress, path tools

pub mod arg_parser;
pub mod db_ops;
pub mod handlers;
pub mod progress;
pub mod tools;

// Re-export commonly used functions
pub use arg_parser::{Cli, Commands};
pub use db_ops::{
    count_for_root, list_by_root, lookup, open_db, open_db_in_memory, reconcile, upsert,
};
pub use handlers::{RunConfig, handle_run};
pub use tools::{canonicalize_root, path_relative_to, path_to_db_string};
