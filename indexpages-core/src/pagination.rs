//! Pagination controller exposed to templates as `this.pagination`.

use crate::node::IndexSource;
use crate::query::Query;
use indexpages_types::{EvalError, Object, Pad, Record, Value};
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

/// Page state of one page variant of an index node
///
/// Counts are taken with dependency recording suspended; iterating
/// [`items`](Self::items) records the listed records as dependencies.
pub struct Pagination {
    node: Weak<IndexSource>,
    query: Query,
    pub page: usize,
    pub pages: usize,
    pub per_page: usize,
    pub total: usize,
}

impl Pagination {
    pub(crate) fn new(node: &Arc<IndexSource>, pad: &dyn Pad) -> Self {
        let _suspended = pad.dependencies().suspend();
        let config = node.pagination_config();
        let query = node.children().clone();
        let total = query.count(pad);
        Self {
            node: Arc::downgrade(node),
            page: node.page_num().unwrap_or(1),
            pages: config.count_pages(total),
            per_page: config.per_page,
            total,
            query,
        }
    }

    fn offset(&self) -> usize {
        (self.page - 1) * self.per_page
    }

    /// Records on this page
    pub fn items(&self, pad: &dyn Pad) -> Vec<Arc<Record>> {
        self.query.slice(pad, self.offset(), self.per_page)
    }

    /// Paths of the records on this page, without recording dependencies
    pub fn item_paths(&self, pad: &dyn Pad) -> Vec<String> {
        let _suspended = pad.dependencies().suspend();
        self.items(pad).iter().map(|r| r.path.clone()).collect()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.pages
    }

    pub fn prev(&self, pad: &dyn Pad) -> Option<Arc<IndexSource>> {
        if !self.has_prev() {
            return None;
        }
        Some(self.node.upgrade()?.for_page(pad, Some(self.page - 1)))
    }

    pub fn next(&self, pad: &dyn Pad) -> Option<Arc<IndexSource>> {
        if !self.has_next() {
            return None;
        }
        Some(self.node.upgrade()?.for_page(pad, Some(self.page + 1)))
    }
}

impl fmt::Debug for Pagination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pagination")
            .field("page", &self.page)
            .field("pages", &self.pages)
            .field("per_page", &self.per_page)
            .field("total", &self.total)
            .finish()
    }
}

fn count(n: usize) -> Value {
    Value::Int(n as i64)
}

impl Object for Pagination {
    fn type_name(&self) -> &'static str {
        "pagination"
    }

    fn identity(&self) -> String {
        match self.node.upgrade() {
            Some(node) => format!("{}#pagination", node.path()),
            None => "pagination".to_string(),
        }
    }

    fn attr(self: Arc<Self>, name: &str, pad: &dyn Pad) -> Result<Value, EvalError> {
        Ok(match name {
            "page" => count(self.page),
            "pages" => count(self.pages),
            "per_page" => count(self.per_page),
            "total" => count(self.total),
            "has_prev" => Value::Bool(self.has_prev()),
            "has_next" => Value::Bool(self.has_next()),
            "items" => Value::List(
                self.items(pad)
                    .into_iter()
                    .map(|r| Value::Object(r as Arc<dyn Object>))
                    .collect(),
            ),
            "prev" => self.prev(pad).map(|n| n.to_value()).unwrap_or(Value::Null),
            "next" => self.next(pad).map(|n| n.to_value()).unwrap_or(Value::Null),
            _ => Value::undefined(format!("pagination has no attribute '{}'", name)),
        })
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
