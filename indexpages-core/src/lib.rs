//! Index pages: virtual pages that group the children of a record by key.
//!
//! An index is configured under a parent record (say `/blog`) with a key
//! rule (say the year of each post's `pub_date`). Every distinct key value
//! becomes a virtual page listing the records that share it, optionally
//! paginated and optionally grouped further by a sub-index (months within
//! a year). None of these pages exist as source files; they are resolved
//! on demand from virtual paths and URLs, and rebuilt when their checksum
//! changes.

pub mod buildprog;
pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod node;
pub mod pagination;
pub mod plugin;
pub mod query;
pub mod registry;
pub mod site;
pub mod slug;
pub mod sort;

pub use buildprog::{ArtifactDeclaration, IndexBuildProgram, TemplateRenderer};
pub use cache::{CacheKey, CacheStats, ComputationCache};
pub use config::{IndexConfig, IndexSection, PaginationSection};
pub use error::{ConfigError, Error, LookupError, Result};
pub use model::{FieldRule, IndexModel, IndexRootModel, PaginationConfig, DEFAULT_TEMPLATE, VIRTUAL_PATH_PREFIX};
pub use node::{FieldSlot, IndexNode, IndexRoot, IndexSource, LazyField};
pub use pagination::Pagination;
pub use plugin::{ConfigSource, IndexPages, IndexPagesPlugin, TemplateValue};
pub use query::Query;
pub use registry::Registry;
pub use site::{MemoryPad, SiteError};
pub use slug::{build_url, slugify, slugify_path};
pub use sort::SortKey;
