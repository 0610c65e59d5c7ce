//! Plain data extracted from an index node for templates.

use indexpages_core::{IndexNode, Result};
use indexpages_types::{Pad, Record};
use serde::Serialize;
use std::sync::Arc;

/// Which record fields feed titles and dates
#[derive(Debug, Clone)]
pub struct ViewFields {
    pub title: String,
    pub date: String,
}

impl Default for ViewFields {
    fn default() -> Self {
        Self {
            title: "title".to_string(),
            date: "pub_date".to_string(),
        }
    }
}

/// A titled link
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkEntry {
    pub title: String,
    pub url: String,
}

/// One sub-group listed on a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupEntry {
    pub key: String,
    pub title: String,
    pub url: String,
    pub count: usize,
}

/// One member record listed on a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemEntry {
    pub path: String,
    pub title: String,
    pub url: String,
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PagerView {
    pub page: usize,
    pub pages: usize,
    pub total: usize,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
}

/// Everything a template needs to render one index node
#[derive(Debug, Clone, Serialize)]
pub struct PageView {
    pub path: String,
    pub key: String,
    pub title: String,
    pub url: String,
    pub alt: String,
    pub parent: Option<LinkEntry>,
    pub groups: Vec<GroupEntry>,
    pub items: Vec<ItemEntry>,
    pub pager: Option<PagerView>,
}

impl PageView {
    /// Collect the view of `node`
    ///
    /// Listing the items records them as dependencies of the current build
    /// step, so the page is rebuilt when one of them changes.
    pub fn build(node: &IndexNode, pad: &dyn Pad, fields: &ViewFields) -> Result<Self> {
        let records = match node.as_source() {
            Some(source) if node.pagination_config().enabled => source.pagination(pad)?.items(pad),
            _ => node.children().records(pad),
        };
        let items = records.iter().map(|record| item_entry(record, fields)).collect();

        let groups = node
            .for_page(pad, None)
            .subindex_ids(pad)?
            .iter()
            .map(|id| {
                let group = node.get_subgroup(pad, id, None)?;
                let group_node = group.to_node();
                Ok(GroupEntry {
                    key: id.clone(),
                    title: node_title(&group_node, pad, fields)?,
                    url: group.url_path(pad)?,
                    count: group.children().count(pad),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let parent = match node {
            IndexNode::Root(_) => None,
            IndexNode::Source(source) => {
                let parent = source.parent();
                Some(LinkEntry {
                    title: node_title(parent, pad, fields)?,
                    url: parent.url_path(pad)?,
                })
            }
        };

        Ok(Self {
            path: node.path().to_string(),
            key: node.id().to_string(),
            title: node_title(node, pad, fields)?,
            url: node.url_path(pad)?,
            alt: node.alt().to_string(),
            parent,
            groups,
            items,
            pager: pager(node, pad)?,
        })
    }
}

/// The node's `title` field, else its key; a root is titled by its record
fn node_title(node: &IndexNode, pad: &dyn Pad, fields: &ViewFields) -> Result<String> {
    match node {
        IndexNode::Root(root) => Ok(record_title(root.record(), fields)),
        IndexNode::Source(source) => Ok(source
            .get_field(pad, &fields.title)?
            .filter(|value| !value.is_undefined())
            .map(|value| value.render())
            .unwrap_or_else(|| source.id().to_string())),
    }
}

fn record_title(record: &Record, fields: &ViewFields) -> String {
    let title = record.get(&fields.title);
    if title.is_undefined() {
        record.id().to_string()
    } else {
        title.render()
    }
}

fn item_entry(record: &Arc<Record>, fields: &ViewFields) -> ItemEntry {
    let date = record.get(&fields.date);
    ItemEntry {
        path: record.path.clone(),
        title: record_title(record, fields),
        url: record.url_path.clone(),
        date: (!date.is_undefined()).then(|| date.render()),
    }
}

fn pager(node: &IndexNode, pad: &dyn Pad) -> Result<Option<PagerView>> {
    let Some(source) = node.as_source() else {
        return Ok(None);
    };
    if !node.pagination_config().enabled {
        return Ok(None);
    }
    let pagination = source.pagination(pad)?;
    Ok(Some(PagerView {
        page: pagination.page,
        pages: pagination.pages,
        total: pagination.total,
        prev_url: pagination.prev(pad).map(|n| n.url_path(pad)).transpose()?,
        next_url: pagination.next(pad).map(|n| n.url_path(pad)).transpose()?,
    }))
}
