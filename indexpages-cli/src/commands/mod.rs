//! CLI command implementations.

pub mod build;
pub mod list;
pub mod resolve;
pub mod serve;

pub use build::build_indexes;
pub use list::list_indexes;
pub use resolve::resolve_path;
pub use serve::serve;
