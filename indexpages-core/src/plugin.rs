//! Host-facing facade: lifecycle hooks, generator, resolvers and the
//! `index_pages(...)` template global.

use crate::cache::{CacheKey, ComputationCache};
use crate::config::IndexConfig;
use crate::error::{ConfigError, Error};
use crate::model::VIRTUAL_PATH_PREFIX;
use crate::node::{IndexNode, IndexRoot, IndexSource};
use crate::registry::Registry;
use crate::Result;
use indexpages_types::{EvalError, ExpressionEngine, Object, Pad, Record, Value, PRIMARY_ALT};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Flag value under the `index-pages` extra flag that disables generation
pub const SKIP_BUILD_FLAG: &str = "skip-build";

/// Where the index configuration comes from
#[derive(Debug, Clone)]
pub enum ConfigSource {
    File(PathBuf),
    Inline(IndexConfig),
}

pub struct IndexPagesPlugin {
    engine: Arc<dyn ExpressionEngine>,
    config_source: ConfigSource,
    cache: Arc<ComputationCache>,
    skip_build: bool,
}

impl IndexPagesPlugin {
    pub fn new(engine: Arc<dyn ExpressionEngine>, config_source: ConfigSource) -> Self {
        Self {
            engine,
            config_source,
            cache: Arc::new(ComputationCache::new()),
            skip_build: false,
        }
    }

    pub fn cache(&self) -> &Arc<ComputationCache> {
        &self.cache
    }

    /// The compiled configuration, parsed once per build
    pub fn read_config(&self) -> Result<Arc<Registry>, ConfigError> {
        self.cache
            .get_or_try_create(CacheKey::Config, || match &self.config_source {
                ConfigSource::File(path) => {
                    debug!(path = %path.display(), "reading index configuration");
                    Registry::from_config(&IndexConfig::from_file(path)?, &*self.engine, self.cache.clone())
                }
                ConfigSource::Inline(config) => Registry::from_config(config, &*self.engine, self.cache.clone()),
            })
    }

    /// Forget everything computed during the previous build
    pub fn before_build_all(&self) {
        info!("index-pages: starting full build, clearing cache");
        self.cache.clear();
    }

    /// Apply extra flags; `index-pages=skip-build` turns generation off
    pub fn setup(&mut self, extra_flags: &HashMap<String, String>) {
        self.skip_build = extra_flags
            .get(VIRTUAL_PATH_PREFIX)
            .is_some_and(|flags| flags.split(',').any(|flag| flag.trim() == SKIP_BUILD_FLAG));
        if self.skip_build {
            info!("index-pages: skipping build of index pages");
        }
    }

    pub fn skip_build(&self) -> bool {
        self.skip_build
    }

    /// Index roots to build along with `record`
    pub fn generate(&self, pad: &dyn Pad, record: &Arc<Record>) -> Result<Vec<Arc<IndexRoot>>> {
        if self.skip_build {
            return Ok(Vec::new());
        }
        self.read_config()?.iter_index_roots(pad, record)
    }

    /// Resolve the pieces after `index-pages/` in a virtual path
    pub fn resolve_virtual_path(
        &self,
        pad: &dyn Pad,
        record: &Arc<Record>,
        pieces: &[&str],
    ) -> Result<Option<IndexNode>> {
        self.read_config()?.resolve_virtual_path(pad, record, pieces)
    }

    /// Resolve URL segments below `record`'s URL
    pub fn resolve_url(&self, pad: &dyn Pad, record: &Arc<Record>, url_path: &[&str]) -> Result<Option<IndexNode>> {
        self.read_config()?.resolve_url_path(pad, record, url_path)
    }

    /// The `index_pages(name, alt)` template global
    ///
    /// Unknown indexes and missing parent records yield an undefined value
    /// rather than an error, so templates can test for them.
    pub fn index_pages(&self, pad: Option<&dyn Pad>, index_name: &str, alt: Option<&str>) -> Result<TemplateValue> {
        let Some(pad) = pad else {
            return Ok(TemplateValue::Undefined("index_pages: no site is available".to_string()));
        };
        let registry = self.read_config()?;
        match registry.get_index_root(pad, index_name, alt.unwrap_or(PRIMARY_ALT)) {
            Ok(root) => Ok(TemplateValue::Defined(IndexPages::new(root))),
            Err(Error::Lookup(err)) => Ok(TemplateValue::Undefined(format!("index_pages: {}", err))),
            Err(err) => Err(err),
        }
    }
}

impl Drop for IndexPagesPlugin {
    fn drop(&mut self) {
        // The cached registry holds the cache itself
        self.cache.clear();
    }
}

impl fmt::Debug for IndexPagesPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexPagesPlugin")
            .field("config_source", &self.config_source)
            .field("cache", &self.cache)
            .field("skip_build", &self.skip_build)
            .finish()
    }
}

/// Result of a template global: a value, or undefined with a reason
#[derive(Debug, Clone)]
pub enum TemplateValue<T = IndexPages> {
    Defined(T),
    Undefined(String),
}

impl<T> TemplateValue<T> {
    pub fn is_undefined(&self) -> bool {
        matches!(self, TemplateValue::Undefined(_))
    }

    pub fn defined(self) -> Option<T> {
        match self {
            TemplateValue::Defined(value) => Some(value),
            TemplateValue::Undefined(_) => None,
        }
    }
}

/// The first-level groups of one index, as seen by templates
#[derive(Clone)]
pub struct IndexPages {
    root: Arc<IndexRoot>,
}

impl IndexPages {
    pub fn new(root: Arc<IndexRoot>) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Arc<IndexRoot> {
        &self.root
    }

    pub fn indexes(&self, pad: &dyn Pad) -> Result<Vec<Arc<IndexSource>>> {
        self.root.subindexes(pad)
    }

    pub fn is_empty(&self, pad: &dyn Pad) -> Result<bool> {
        Ok(self.root.to_node().subindex_ids(pad)?.is_empty())
    }

    pub fn index_name(&self) -> &str {
        self.root.index_name()
    }

    pub fn alt(&self) -> &str {
        self.root.alt()
    }
}

impl fmt::Display for IndexPages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.alt() == PRIMARY_ALT {
            write!(f, "<index_pages('{}')>", self.index_name())
        } else {
            write!(f, "<index_pages('{}', '{}')>", self.index_name(), self.alt())
        }
    }
}

impl fmt::Debug for IndexPages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl Object for IndexPages {
    fn type_name(&self) -> &'static str {
        "index_pages"
    }

    fn identity(&self) -> String {
        self.to_string()
    }

    fn attr(self: Arc<Self>, name: &str, pad: &dyn Pad) -> Result<Value, EvalError> {
        Ok(match name {
            "indexes" => Value::List(self.indexes(pad)?.iter().map(IndexSource::to_value).collect()),
            "index_name" => Value::from(self.index_name()),
            "alt" => Value::from(self.alt()),
            _ => Value::undefined(format!("index_pages has no attribute '{}'", name)),
        })
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
