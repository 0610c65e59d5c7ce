use super::base::{NodeBase, NodeParts};
use super::{records_value, sources_value, write_alt, IndexNode};
use crate::cache::ComputationCache;
use crate::model::IndexRootModel;
use crate::Result;
use indexpages_types::{EvalError, Object, Pad, Record, Value, VirtualKey};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Top of one index, attached to the index's parent record
///
/// A root is never built. It exists to hold the index's members and to
/// anchor the first grouping level.
pub struct IndexRoot {
    base: NodeBase,
    model: Arc<IndexRootModel>,
}

impl IndexRoot {
    /// The root of `model` on `record`, created on first use
    pub fn get_index(
        pad: &dyn Pad,
        model: &Arc<IndexRootModel>,
        record: &Arc<Record>,
        cache: &Arc<ComputationCache>,
    ) -> Result<Arc<IndexRoot>> {
        let virtual_path = model.virtual_path();
        let key = VirtualKey::new(record, virtual_path.clone());
        pad.virtual_cache().get_or_try_create(key, || {
            let children = model.get_items(pad, record)?;
            Ok(Arc::new(IndexRoot {
                base: NodeBase::new(NodeParts {
                    record: record.clone(),
                    id: model.index_name.clone(),
                    children,
                    page_num: None,
                    virtual_path,
                    subindex_model: Some(model.index_model.clone()),
                    pagination: model.pagination.clone(),
                    config_filename: model.config_filename.clone(),
                    cache: cache.clone(),
                }),
                model: model.clone(),
            }))
        })
    }

    pub(crate) fn base(&self) -> &NodeBase {
        &self.base
    }

    pub fn model(&self) -> &Arc<IndexRootModel> {
        &self.model
    }

    pub fn index_name(&self) -> &str {
        &self.model.index_name
    }

    pub fn path(&self) -> &str {
        &self.base.path
    }

    pub fn record(&self) -> &Arc<Record> {
        &self.base.record
    }

    pub fn alt(&self) -> &str {
        &self.base.record.alt
    }

    /// Same URL as the parent record
    pub fn url_path(&self) -> &str {
        &self.base.record.url_path
    }

    pub fn to_node(self: &Arc<Self>) -> IndexNode {
        IndexNode::Root(self.clone())
    }

    /// First-level groups of this index
    pub fn subindexes(self: &Arc<Self>, pad: &dyn Pad) -> Result<Vec<Arc<super::IndexSource>>> {
        self.to_node().subindexes(pad)
    }
}

impl fmt::Display for IndexRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<IndexRoot path='{}'", self.base.path)?;
        write_alt(f, self.alt())?;
        f.write_str(">")
    }
}

impl fmt::Debug for IndexRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl Object for IndexRoot {
    fn type_name(&self) -> &'static str {
        "index_root"
    }

    fn identity(&self) -> String {
        self.base.path.clone()
    }

    fn attr(self: Arc<Self>, name: &str, pad: &dyn Pad) -> Result<Value, EvalError> {
        Ok(match name {
            "_id" | "index_name" => Value::from(self.index_name()),
            "_path" | "path" => Value::from(self.path()),
            "_alt" | "alt" => Value::from(self.alt()),
            "_hidden" | "is_hidden" => Value::Bool(true),
            "virtual_path" => Value::from(self.base.virtual_path.as_str()),
            "url_path" => Value::from(self.url_path()),
            "record" | "parent" => Value::Object(self.base.record.clone() as Arc<dyn Object>),
            "children" => records_value(self.base.children.records(pad)),
            "subindexes" => sources_value(self.subindexes(pad)?),
            _ => Value::undefined(format!("Missing value in field '{}'", name)),
        })
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
