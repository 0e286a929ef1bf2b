pub mod config;
pub mod logger;
pub(crate) mod photolyzer_toml;
pub mod tempfiles;

pub use config::*;
pub use logger::{Colors, setup_logging};
pub use tempfiles::{temp_path_for, write_atomic};
