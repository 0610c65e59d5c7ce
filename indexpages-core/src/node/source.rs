use super::base::{node_path, NodeBase, NodeParts};
use super::{checksum, records_value, sources_value, write_alt, IndexNode};
use crate::error::LookupError;
use crate::model::{FieldRule, IndexModel, PaginationConfig};
use crate::pagination::Pagination;
use crate::query::Query;
use crate::slug::build_url;
use crate::sort::{parse_field_spec, SortKey};
use crate::Result;
use indexpages_types::{EvalError, Object, Pad, Record, Value, VirtualKey, PRIMARY_ALT};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A field value not computed until first read
#[derive(Debug, Clone)]
pub enum LazyField {
    Slug,
    Gid,
    Custom(FieldRule),
}

/// One entry of a node's field table
#[derive(Debug, Clone)]
pub enum FieldSlot {
    Static(Value),
    Lazy(LazyField),
}

/// One group of an index: the records sharing a key value
pub struct IndexSource {
    base: NodeBase,
    model: Arc<IndexModel>,
    parent: IndexNode,
    /// System fields first, then custom fields in name order
    fields: Mutex<Vec<(String, FieldSlot)>>,
    slug: OnceCell<String>,
    pagination: OnceCell<Arc<Pagination>>,
}

impl IndexSource {
    /// The node for group `id` of `model` below `parent`, created on first use
    pub fn get_index(
        pad: &dyn Pad,
        model: &Arc<IndexModel>,
        parent: &IndexNode,
        id: &str,
        children: Query,
        page_num: Option<usize>,
    ) -> Arc<IndexSource> {
        let virtual_path = model.virtual_path(parent.virtual_path(), id, page_num);
        let key = VirtualKey::new(parent.record(), virtual_path.clone());
        pad.virtual_cache().get_or_create(key, || {
            Arc::new(IndexSource::new(
                model.clone(),
                parent.clone(),
                NodeParts {
                    record: parent.record().clone(),
                    id: id.to_string(),
                    children,
                    page_num,
                    virtual_path,
                    subindex_model: model.subindex.clone(),
                    pagination: model.pagination.clone(),
                    config_filename: model.config_filename.clone(),
                    cache: parent.base().cache.clone(),
                },
            ))
        })
    }

    fn new(model: Arc<IndexModel>, parent: IndexNode, parts: NodeParts) -> Self {
        let base = NodeBase::new(parts);
        let record = &base.record;

        let mut fields: Vec<(String, FieldSlot)> = vec![
            ("_id".into(), FieldSlot::Static(Value::from(base.id.as_str()))),
            ("key".into(), FieldSlot::Static(Value::from(base.id.as_str()))),
            ("_path".into(), FieldSlot::Static(Value::from(base.path.as_str()))),
            ("_gid".into(), FieldSlot::Lazy(LazyField::Gid)),
            ("_slug".into(), FieldSlot::Lazy(LazyField::Slug)),
            ("_template".into(), FieldSlot::Static(Value::from(model.template.as_str()))),
            ("_hidden".into(), FieldSlot::Static(Value::Bool(record.hidden))),
            ("_discoverable".into(), FieldSlot::Static(Value::Bool(true))),
            ("_alt".into(), FieldSlot::Static(Value::from(record.alt.as_str()))),
            ("_source_alt".into(), FieldSlot::Static(Value::from(PRIMARY_ALT))),
            ("_model".into(), FieldSlot::Static(Value::undefined("Missing value in field '_model': index is virtual"))),
            (
                "_attachment_for".into(),
                FieldSlot::Static(Value::undefined("Missing value in field '_attachment_for': not an attachment")),
            ),
            (
                "_attachment_type".into(),
                FieldSlot::Static(Value::undefined("Missing value in field '_attachment_type': not an attachment")),
            ),
        ];
        for (name, rule) in &model.fields {
            let slot = FieldSlot::Lazy(LazyField::Custom(rule.clone()));
            match fields.iter_mut().find(|(existing, _)| existing == name) {
                Some(entry) => entry.1 = slot,
                None => fields.push((name.clone(), slot)),
            }
        }

        Self {
            base,
            model,
            parent,
            fields: Mutex::new(fields),
            slug: OnceCell::new(),
            pagination: OnceCell::new(),
        }
    }

    pub(crate) fn base(&self) -> &NodeBase {
        &self.base
    }

    pub fn model(&self) -> &Arc<IndexModel> {
        &self.model
    }

    pub fn parent(&self) -> &IndexNode {
        &self.parent
    }

    pub fn id(&self) -> &str {
        &self.base.id
    }

    pub fn path(&self) -> &str {
        &self.base.path
    }

    pub fn virtual_path(&self) -> &str {
        &self.base.virtual_path
    }

    pub fn record(&self) -> &Arc<Record> {
        &self.base.record
    }

    pub fn alt(&self) -> &str {
        &self.base.record.alt
    }

    pub fn page_num(&self) -> Option<usize> {
        self.base.page_num
    }

    pub fn children(&self) -> &Query {
        &self.base.children
    }

    pub fn pagination_config(&self) -> &PaginationConfig {
        &self.base.pagination
    }

    pub fn template(&self) -> &str {
        &self.model.template
    }

    pub fn is_hidden(&self) -> bool {
        self.base.record.hidden
    }

    pub fn to_node(self: &Arc<Self>) -> IndexNode {
        IndexNode::Source(self.clone())
    }

    pub fn to_value(self: &Arc<Self>) -> Value {
        Value::Object(self.clone() as Arc<dyn Object>)
    }

    /// Names in the field table, in table order
    pub fn field_names(&self) -> Vec<String> {
        self.fields.lock().iter().map(|(name, _)| name.clone()).collect()
    }

    /// Value of field `name`, or `None` when the table has no such field
    ///
    /// Lazy fields are computed on first read and then memoized. The
    /// table lock is not held while a rule runs, so rules may read other
    /// fields of the same node.
    pub fn get_field(self: &Arc<Self>, pad: &dyn Pad, name: &str) -> Result<Option<Value>> {
        let lazy = {
            let fields = self.fields.lock();
            match fields.iter().find(|(field, _)| field == name) {
                None => return Ok(None),
                Some((_, FieldSlot::Static(value))) => return Ok(Some(value.clone())),
                Some((_, FieldSlot::Lazy(lazy))) => lazy.clone(),
            }
        };

        let value = match lazy {
            LazyField::Slug => Value::from(self.slug(pad)?),
            LazyField::Gid => Value::from(checksum::gid(self.path())),
            LazyField::Custom(rule) => rule.evaluate_this(pad, self.alt(), self.to_value())?,
        };

        let mut fields = self.fields.lock();
        if let Some(entry) = fields.iter_mut().find(|(field, _)| field == name) {
            entry.1 = FieldSlot::Static(value.clone());
        }
        Ok(Some(value))
    }

    /// Whether field `name` exists and is not undefined
    pub fn contains(self: &Arc<Self>, pad: &dyn Pad, name: &str) -> Result<bool> {
        Ok(self
            .get_field(pad, name)?
            .is_some_and(|value| !value.is_undefined()))
    }

    /// URL path segment(s) of this group, relative to the parent's URL
    pub fn slug(self: &Arc<Self>, pad: &dyn Pad) -> Result<String, EvalError> {
        self.slug
            .get_or_try_init(|| self.model.get_slug(pad, self))
            .cloned()
    }

    /// Parent URL, slug, then `<url_suffix>/<n>` for pages after the first
    ///
    /// The URL ends in a slash unless the slug's last segment looks like a
    /// file name.
    pub fn url_path(self: &Arc<Self>, pad: &dyn Pad) -> Result<String> {
        let slug = self.slug(pad)?;
        let mut pieces = vec![self.parent.url_path(pad)?, slug.clone()];
        if let Some(page_num) = self.page_num().filter(|n| *n > 1) {
            pieces.push(self.base.pagination.url_suffix.clone());
            pieces.push(page_num.to_string());
        }
        let last_segment = slug.rsplit('/').next().unwrap_or_default();
        Ok(build_url(&pieces, !last_segment.contains('.')))
    }

    /// The variant of this group for `page_num` (`None` is the anchor)
    pub fn for_page(self: &Arc<Self>, pad: &dyn Pad, page_num: Option<usize>) -> Arc<IndexSource> {
        if page_num == self.page_num() {
            return self.clone();
        }
        IndexSource::get_index(pad, &self.model, &self.parent, self.id(), self.base.children.clone(), page_num)
    }

    /// Recognize a `page/<n>` virtual path suffix
    pub fn match_path_pagination(self: &Arc<Self>, pad: &dyn Pad, pieces: &[&str]) -> Option<Arc<IndexSource>> {
        let page_num = self
            .model
            .match_path_pagination(pieces, || self.base.count_pages(pad))?;
        Some(self.for_page(pad, Some(page_num)))
    }

    /// The pagination controller of this page variant
    pub fn pagination(self: &Arc<Self>, pad: &dyn Pad) -> Result<Arc<Pagination>> {
        if !self.base.pagination.enabled {
            return Err(LookupError::PaginationDisabled {
                path: self.path().to_string(),
            }
            .into());
        }
        Ok(self
            .pagination
            .get_or_init(|| Arc::new(Pagination::new(self, pad)))
            .clone())
    }

    /// Sort key over `fields`, each optionally prefixed `-` for descending
    ///
    /// Fields that are missing or undefined contribute `None`.
    pub fn sort_key(self: &Arc<Self>, pad: &dyn Pad, fields: &[&str]) -> Result<Vec<SortKey>> {
        fields
            .iter()
            .map(|spec| {
                let (field, reverse) = parse_field_spec(spec);
                let value = self.get_field(pad, field)?.filter(|v| !v.is_undefined());
                Ok::<_, crate::Error>(SortKey::new(value, reverse))
            })
            .collect()
    }

    /// All sub-groups of this group
    pub fn subindexes(self: &Arc<Self>, pad: &dyn Pad) -> Result<Vec<Arc<IndexSource>>> {
        self.to_node().subindexes(pad)
    }
}

impl PartialEq for IndexSource {
    fn eq(&self, other: &Self) -> bool {
        self.path() == other.path()
    }
}

impl Eq for IndexSource {}

impl fmt::Display for IndexSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let anchor = self
            .model
            .virtual_path(self.parent.virtual_path(), self.id(), None);
        write!(f, "<IndexSource path='{}'", node_path(self.record(), &anchor))?;
        write_alt(f, self.alt())?;
        if let Some(page_num) = self.page_num() {
            write!(f, " page_num={}", page_num)?;
        }
        f.write_str(">")
    }
}

impl fmt::Debug for IndexSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl Object for IndexSource {
    fn type_name(&self) -> &'static str {
        "index_source"
    }

    fn identity(&self) -> String {
        self.base.path.clone()
    }

    fn attr(self: Arc<Self>, name: &str, pad: &dyn Pad) -> Result<Value, EvalError> {
        Ok(match name {
            "path" => Value::from(self.path()),
            "virtual_path" => Value::from(self.virtual_path()),
            "url_path" => Value::from(self.url_path(pad)?),
            "page_num" => Value::from(self.page_num().map(|n| n as i64)),
            "is_hidden" => Value::Bool(self.is_hidden()),
            "alt" => Value::from(self.alt()),
            "record" => Value::Object(self.record().clone() as Arc<dyn Object>),
            "parent" => self.parent.to_value(),
            "children" => records_value(self.base.children.records(pad)),
            "subindexes" => sources_value(self.subindexes(pad)?),
            "has_subindex" => Value::Bool(self.base.subindex_model.is_some()),
            "pagination" => Value::Object(self.pagination(pad)? as Arc<dyn Object>),
            _ => self
                .get_field(pad, name)?
                .unwrap_or_else(|| Value::undefined(format!("Missing value in field '{}'", name))),
        })
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
