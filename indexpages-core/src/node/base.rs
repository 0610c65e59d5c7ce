use crate::cache::{CacheKey, ComputationCache};
use crate::model::{IndexModel, PaginationConfig};
use crate::query::Query;
use crate::{Error, Result};
use indexpages_types::{Pad, Record};
use once_cell::sync::OnceCell;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

/// State shared by index roots and index sources
pub(crate) struct NodeBase {
    pub record: Arc<Record>,
    pub id: String,
    pub children: Query,
    pub page_num: Option<usize>,
    pub virtual_path: String,
    /// `<record path>@<virtual path>`
    pub path: String,
    /// Model of the next grouping level, if any
    pub subindex_model: Option<Arc<IndexModel>>,
    pub pagination: PaginationConfig,
    pub config_filename: Option<PathBuf>,
    pub cache: Arc<ComputationCache>,
    subindex_ids: OnceCell<Arc<Vec<String>>>,
}

pub(crate) struct NodeParts {
    pub record: Arc<Record>,
    pub id: String,
    pub children: Query,
    pub page_num: Option<usize>,
    pub virtual_path: String,
    pub subindex_model: Option<Arc<IndexModel>>,
    pub pagination: PaginationConfig,
    pub config_filename: Option<PathBuf>,
    pub cache: Arc<ComputationCache>,
}

impl NodeBase {
    pub fn new(parts: NodeParts) -> Self {
        Self {
            path: node_path(&parts.record, &parts.virtual_path),
            record: parts.record,
            id: parts.id,
            children: parts.children,
            page_num: parts.page_num,
            virtual_path: parts.virtual_path,
            subindex_model: parts.subindex_model,
            pagination: parts.pagination,
            config_filename: parts.config_filename,
            cache: parts.cache,
            subindex_ids: OnceCell::new(),
        }
    }

    /// Distinct sub-group ids over all members, in first-seen order
    pub fn subindex_ids(&self, pad: &dyn Pad) -> Result<Arc<Vec<String>>> {
        let Some(model) = &self.subindex_model else {
            return Ok(Arc::default());
        };
        self.subindex_ids
            .get_or_try_init(|| {
                let key = CacheKey::SubindexIds {
                    path: self.path.clone(),
                    alt: self.record.alt.clone(),
                };
                self.cache.get_or_try_create(key, || {
                    let _suspended = pad.dependencies().suspend();
                    let mut seen = HashSet::new();
                    let mut ids = Vec::new();
                    for record in self.children.records(pad) {
                        for key in model.keys_for_record(pad, &record)? {
                            if seen.insert(key.clone()) {
                                ids.push(key);
                            }
                        }
                    }
                    Ok::<_, Error>(ids)
                })
            })
            .cloned()
    }

    /// Paths of the members whose sub-group keys include `id`
    pub fn member_paths(&self, pad: &dyn Pad, model: &IndexModel, id: &str) -> Result<Arc<Vec<String>>> {
        let key = CacheKey::ChildIds {
            path: self.path.clone(),
            alt: self.record.alt.clone(),
            id: id.to_string(),
        };
        self.cache.get_or_try_create(key, || {
            let _suspended = pad.dependencies().suspend();
            let mut paths = Vec::new();
            for record in self.children.records(pad) {
                if model.keys_for_record(pad, &record)?.iter().any(|key| key == id) {
                    paths.push(record.path.clone());
                }
            }
            Ok::<_, Error>(paths)
        })
    }

    pub fn count_pages(&self, pad: &dyn Pad) -> usize {
        let _suspended = pad.dependencies().suspend();
        self.pagination.count_pages(self.children.count(pad))
    }
}

pub(crate) fn node_path(record: &Record, virtual_path: &str) -> String {
    format!("{}@{}", record.path, virtual_path)
}
