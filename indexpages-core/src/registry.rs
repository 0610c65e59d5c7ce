//! Lookup of configured indexes and dispatch of path resolution.

use crate::cache::ComputationCache;
use crate::config::IndexConfig;
use crate::error::{ConfigError, LookupError};
use crate::model::{index_models_from_config, IndexRootModel, VIRTUAL_PATH_PREFIX};
use crate::node::{IndexNode, IndexRoot, IndexSource};
use crate::Result;
use indexpages_types::{ExpressionEngine, Pad, Record, VirtualKey};
use std::sync::Arc;
use tracing::debug;

/// All configured indexes, in configuration order
#[derive(Debug)]
pub struct Registry {
    models: Vec<Arc<IndexRootModel>>,
    cache: Arc<ComputationCache>,
}

impl Registry {
    pub fn new(models: Vec<Arc<IndexRootModel>>, cache: Arc<ComputationCache>) -> Self {
        Self { models, cache }
    }

    /// Compile `config` into index models
    pub fn from_config(
        config: &IndexConfig,
        engine: &dyn ExpressionEngine,
        cache: Arc<ComputationCache>,
    ) -> Result<Self, ConfigError> {
        let models = index_models_from_config(config, engine)?;
        debug!(indexes = models.len(), "compiled index configuration");
        Ok(Self::new(models, cache))
    }

    pub fn index_names(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(|m| m.index_name.as_str())
    }

    pub fn models(&self) -> &[Arc<IndexRootModel>] {
        &self.models
    }

    pub fn model(&self, index_name: &str) -> Option<&Arc<IndexRootModel>> {
        self.models.iter().find(|m| m.index_name == index_name)
    }

    pub fn cache(&self) -> &Arc<ComputationCache> {
        &self.cache
    }

    /// The root of index `index_name` on its parent record in `alt`
    pub fn get_index_root(&self, pad: &dyn Pad, index_name: &str, alt: &str) -> Result<Arc<IndexRoot>> {
        let model = self.model(index_name).ok_or_else(|| LookupError::NoSuchIndex {
            name: index_name.to_string(),
        })?;
        let record = pad
            .get(&model.parent_path, alt)
            .ok_or_else(|| LookupError::MissingParent {
                index: index_name.to_string(),
                path: model.parent_path.clone(),
            })?;
        IndexRoot::get_index(pad, model, &record, &self.cache)
    }

    /// Roots of every index whose parent is `record`
    pub fn iter_index_roots(&self, pad: &dyn Pad, record: &Arc<Record>) -> Result<Vec<Arc<IndexRoot>>> {
        self.models
            .iter()
            .filter(|m| m.parent_path == record.path)
            .map(|m| IndexRoot::get_index(pad, m, record, &self.cache))
            .collect()
    }

    /// Resolve `pieces` (the virtual path after `index-pages/`) on `record`
    ///
    /// The first piece names the index, which must be attached to
    /// `record`; the rest is resolved by that index's root.
    pub fn resolve_virtual_path(
        &self,
        pad: &dyn Pad,
        record: &Arc<Record>,
        pieces: &[&str],
    ) -> Result<Option<IndexNode>> {
        let Some((index_name, rest)) = pieces.split_first() else {
            return Ok(None);
        };

        let virtual_path = std::iter::once(VIRTUAL_PATH_PREFIX)
            .chain(pieces.iter().copied())
            .collect::<Vec<_>>()
            .join("/");
        let key = VirtualKey::new(record, virtual_path);
        let cache = pad.virtual_cache();
        if let Some(root) = cache.get::<IndexRoot>(&key) {
            return Ok(Some(IndexNode::Root(root)));
        }
        if let Some(source) = cache.get::<IndexSource>(&key) {
            return Ok(Some(IndexNode::Source(source)));
        }

        let Some(model) = self
            .model(index_name)
            .filter(|m| m.parent_path == record.path)
        else {
            debug!(path = %record.path, index = %index_name, "no index attached to record");
            return Ok(None);
        };
        let root = IndexRoot::get_index(pad, model, record, &self.cache)?;
        let resolved = IndexNode::Root(root).resolve_virtual_path(pad, rest)?;
        if resolved.is_none() {
            debug!(path = %record.path, virtual_path = %key.virtual_path, "unresolved virtual path");
        }
        Ok(resolved)
    }

    /// Resolve URL segments below `record`'s URL; the first index that matches wins
    pub fn resolve_url_path(
        &self,
        pad: &dyn Pad,
        record: &Arc<Record>,
        url_path: &[&str],
    ) -> Result<Option<IndexNode>> {
        for root in self.iter_index_roots(pad, record)? {
            if let Some(node) = IndexNode::Root(root).resolve_url_path(pad, url_path)? {
                return Ok(Some(node));
            }
        }
        Ok(None)
    }
}
