//! The virtual node tree of an index.
//!
//! An [`IndexRoot`] hangs off the parent record of each configured index
//! and is never built itself. Below it, every distinct key value produces
//! an [`IndexSource`], which may be paginated and may group its members
//! further through a sub-index:
//!
//! ```text
//! /blog@index-pages/year-index                  root
//! /blog@index-pages/year-index/2020             source
//! /blog@index-pages/year-index/2020/page/2      page variant
//! /blog@index-pages/year-index/2020/08          source of the sub-index
//! ```
//!
//! Nodes are created through the pad's virtual cache, so resolving the
//! same virtual path twice yields the same `Arc`.

mod base;
mod checksum;
mod root;
mod source;

pub use root::IndexRoot;
pub use source::{FieldSlot, IndexSource, LazyField};

use crate::error::LookupError;
use crate::model::PaginationConfig;
use crate::query::Query;
use crate::Result;
use base::NodeBase;
use checksum::Members;
use indexpages_types::{Object, Pad, Record, Value};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;

/// A node of the index tree
#[derive(Clone)]
pub enum IndexNode {
    Root(Arc<IndexRoot>),
    Source(Arc<IndexSource>),
}

impl IndexNode {
    pub(crate) fn base(&self) -> &NodeBase {
        match self {
            IndexNode::Root(root) => root.base(),
            IndexNode::Source(source) => source.base(),
        }
    }

    pub fn path(&self) -> &str {
        &self.base().path
    }

    pub fn virtual_path(&self) -> &str {
        &self.base().virtual_path
    }

    /// The real record this node hangs off
    pub fn record(&self) -> &Arc<Record> {
        &self.base().record
    }

    pub fn alt(&self) -> &str {
        &self.base().record.alt
    }

    pub fn id(&self) -> &str {
        &self.base().id
    }

    pub fn page_num(&self) -> Option<usize> {
        self.base().page_num
    }

    pub fn children(&self) -> &Query {
        &self.base().children
    }

    pub fn pagination_config(&self) -> &PaginationConfig {
        &self.base().pagination
    }

    pub fn config_filename(&self) -> Option<&Path> {
        self.base().config_filename.as_deref()
    }

    pub fn has_subindex(&self) -> bool {
        self.base().subindex_model.is_some()
    }

    pub fn is_hidden(&self) -> bool {
        match self {
            IndexNode::Root(_) => true,
            IndexNode::Source(source) => source.is_hidden(),
        }
    }

    pub fn url_path(&self, pad: &dyn Pad) -> Result<String> {
        match self {
            IndexNode::Root(root) => Ok(root.url_path().to_string()),
            IndexNode::Source(source) => source.url_path(pad),
        }
    }

    pub fn as_source(&self) -> Option<&Arc<IndexSource>> {
        match self {
            IndexNode::Source(source) => Some(source),
            IndexNode::Root(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            IndexNode::Root(root) => Value::Object(root.clone() as Arc<dyn Object>),
            IndexNode::Source(source) => Value::Object(source.clone() as Arc<dyn Object>),
        }
    }

    /// The variant of this node for `page_num`; roots are never paginated
    pub fn for_page(&self, pad: &dyn Pad, page_num: Option<usize>) -> IndexNode {
        match self {
            IndexNode::Root(_) => self.clone(),
            IndexNode::Source(source) => IndexNode::Source(source.for_page(pad, page_num)),
        }
    }

    /// Number of pages the members fill; one when pagination is disabled
    pub fn count_pages(&self, pad: &dyn Pad) -> usize {
        self.base().count_pages(pad)
    }

    /// Ids of the sub-groups below this node
    pub fn subindex_ids(&self, pad: &dyn Pad) -> Result<Arc<Vec<String>>> {
        self.base().subindex_ids(pad)
    }

    /// Sub-group `id` of this node
    ///
    /// Its members are the members of this node whose sub-index keys
    /// include `id`. The id need not be one of [`subindex_ids`](Self::subindex_ids),
    /// in which case the sub-group is empty.
    pub fn get_subgroup(&self, pad: &dyn Pad, id: &str, page_num: Option<usize>) -> Result<Arc<IndexSource>> {
        let anchor = self.for_page(pad, None);
        let base = anchor.base();
        let Some(model) = &base.subindex_model else {
            return Err(LookupError::NoSubindex {
                path: base.path.clone(),
            }
            .into());
        };
        let paths = base.member_paths(pad, model, id)?;
        let children = Query::precomputed(base.children.parent_path(), base.children.alt(), paths);
        Ok(IndexSource::get_index(pad, model, &anchor, id, children, page_num))
    }

    /// All sub-groups below this node, in first-seen order of their ids
    pub fn subindexes(&self, pad: &dyn Pad) -> Result<Vec<Arc<IndexSource>>> {
        let anchor = self.for_page(pad, None);
        anchor
            .subindex_ids(pad)?
            .iter()
            .map(|id| anchor.get_subgroup(pad, id, None))
            .collect()
    }

    /// Resolve virtual path pieces relative to this node
    ///
    /// Each piece names a sub-group id, except a trailing `page/<n>` which
    /// selects a page of a paginated node. An empty slice resolves to the
    /// node itself.
    pub fn resolve_virtual_path(&self, pad: &dyn Pad, pieces: &[&str]) -> Result<Option<IndexNode>> {
        let Some((first, rest)) = pieces.split_first() else {
            return Ok(Some(self.clone()));
        };
        if self.has_subindex() && self.subindex_ids(pad)?.iter().any(|id| id == first) {
            let subgroup = IndexNode::Source(self.get_subgroup(pad, first, None)?);
            return subgroup.resolve_virtual_path(pad, rest);
        }
        match self {
            IndexNode::Root(_) => Ok(None),
            IndexNode::Source(source) => Ok(source
                .match_path_pagination(pad, pieces)
                .map(IndexNode::Source)),
        }
    }

    /// Resolve URL segments relative to this node's URL
    ///
    /// An empty slice selects this node, or its first page when paginated.
    /// Otherwise the segments must start with a sub-group's slug, or be
    /// `<url_suffix>/<n>` for a page `n >= 2`.
    pub fn resolve_url_path(&self, pad: &dyn Pad, url_path: &[&str]) -> Result<Option<IndexNode>> {
        if url_path.is_empty() {
            let page_num = self.pagination_config().enabled.then_some(1);
            return Ok(Some(self.for_page(pad, page_num)));
        }

        if self.has_subindex() {
            for subindex in self.subindexes(pad)? {
                let slug = subindex.slug(pad)?;
                let slug_pieces: Vec<&str> = slug.split('/').collect();
                if url_path.starts_with(&slug_pieces) {
                    let rest = &url_path[slug_pieces.len()..];
                    return IndexNode::Source(subindex).resolve_url_path(pad, rest);
                }
            }
        }

        if let IndexNode::Source(source) = self {
            let config = source.pagination_config();
            let page_num = config.match_url_page(url_path, || self.count_pages(pad));
            if let Some(page_num) = page_num {
                return Ok(Some(IndexNode::Source(source.for_page(pad, Some(page_num)))));
            }
        }
        Ok(None)
    }

    /// Content checksum, used to decide whether the node must be rebuilt
    ///
    /// It covers the node path, the member record paths (or, for the
    /// anchor of a paginated node, the page count), and the sub-group ids.
    /// Dependency recording is suspended while it is computed.
    pub fn checksum(&self, pad: &dyn Pad) -> Result<String> {
        let _suspended = pad.dependencies().suspend();
        let base = self.base();

        let members = match self {
            _ if !base.pagination.enabled => Members::Paths(base.children.paths(pad)),
            IndexNode::Source(source) if source.page_num().is_some() => {
                Members::Paths(source.pagination(pad)?.item_paths(pad))
            }
            _ => Members::PageCount(base.count_pages(pad)),
        };
        let subindex_ids = if self.has_subindex() {
            Some(self.subindex_ids(pad)?)
        } else {
            None
        };

        let data = checksum::checksum_data(&base.path, &members, subindex_ids.as_ref().map(|ids| ids.as_slice()));
        Ok(checksum::digest(&data))
    }
}

impl PartialEq for IndexNode {
    fn eq(&self, other: &Self) -> bool {
        matches!(
            (self, other),
            (IndexNode::Root(_), IndexNode::Root(_)) | (IndexNode::Source(_), IndexNode::Source(_))
        ) && self.path() == other.path()
    }
}

impl Eq for IndexNode {}

impl Hash for IndexNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        self.path().hash(state);
    }
}

impl fmt::Display for IndexNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexNode::Root(root) => fmt::Display::fmt(root, f),
            IndexNode::Source(source) => fmt::Display::fmt(source, f),
        }
    }
}

impl fmt::Debug for IndexNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<Arc<IndexRoot>> for IndexNode {
    fn from(root: Arc<IndexRoot>) -> Self {
        IndexNode::Root(root)
    }
}

impl From<Arc<IndexSource>> for IndexNode {
    fn from(source: Arc<IndexSource>) -> Self {
        IndexNode::Source(source)
    }
}

/// Append ` alt='…'` for non-primary alts
fn write_alt(f: &mut fmt::Formatter<'_>, alt: &str) -> fmt::Result {
    if alt != indexpages_types::PRIMARY_ALT {
        write!(f, " alt='{}'", alt)?;
    }
    Ok(())
}

fn records_value(records: Vec<Arc<Record>>) -> Value {
    Value::List(
        records
            .into_iter()
            .map(|r| Value::Object(r as Arc<dyn Object>))
            .collect(),
    )
}

fn sources_value(sources: Vec<Arc<IndexSource>>) -> Value {
    Value::List(
        sources
            .into_iter()
            .map(|s| Value::Object(s as Arc<dyn Object>))
            .collect(),
    )
}
