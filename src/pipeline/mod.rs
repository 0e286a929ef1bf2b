//! Pipeline components: scan, fingerprint, orchestrated incremental run.

pub mod metadata;
pub mod orchestrator;
pub mod walk;

pub use metadata::read_fingerprint;
pub use orchestrator::{analyze_dir, analyze_dir_with_conn};
pub use walk::{ExtensionSet, parse_extensions, scan};
