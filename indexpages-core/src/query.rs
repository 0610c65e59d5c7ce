//! Enumeration of the member records of an index node.

use indexpages_types::{Pad, Record};
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Source {
    /// Children of the record at `parent_path`, looked up at iteration time
    Children,
    /// A fixed list of records, e.g. the result of an `items` rule
    Fixed(Arc<Vec<Arc<Record>>>),
    /// Replays a precomputed list of record paths
    Precomputed(Arc<Vec<String>>),
}

/// Re-iterable query over records
///
/// Iterating a query records every yielded record as a dependency of the
/// current build step, unless recording is suspended.
#[derive(Debug, Clone)]
pub struct Query {
    parent_path: String,
    alt: String,
    source: Source,
}

impl Query {
    /// All children of `record`
    pub fn children(record: &Record) -> Self {
        Self {
            parent_path: record.path.clone(),
            alt: record.alt.clone(),
            source: Source::Children,
        }
    }

    pub fn fixed(parent_path: &str, alt: &str, records: Vec<Arc<Record>>) -> Self {
        Self {
            parent_path: parent_path.to_string(),
            alt: alt.to_string(),
            source: Source::Fixed(Arc::new(records)),
        }
    }

    /// A query yielding exactly the records at `paths`, in order
    pub fn precomputed(parent_path: &str, alt: &str, paths: Arc<Vec<String>>) -> Self {
        Self {
            parent_path: parent_path.to_string(),
            alt: alt.to_string(),
            source: Source::Precomputed(paths),
        }
    }

    pub fn parent_path(&self) -> &str {
        &self.parent_path
    }

    pub fn alt(&self) -> &str {
        &self.alt
    }

    /// Fetch the member records without recording dependencies
    fn fetch(&self, pad: &dyn Pad) -> Vec<Arc<Record>> {
        match &self.source {
            Source::Children => pad
                .get(&self.parent_path, &self.alt)
                .map(|parent| pad.children(&parent))
                .unwrap_or_default(),
            Source::Fixed(records) => records.as_ref().clone(),
            Source::Precomputed(paths) => paths
                .iter()
                .filter_map(|path| pad.get(path, &self.alt))
                .collect(),
        }
    }

    /// The member records, recorded as dependencies
    pub fn records(&self, pad: &dyn Pad) -> Vec<Arc<Record>> {
        let records = self.fetch(pad);
        record_dependencies(pad, &records);
        records
    }

    /// Member records `offset..offset + limit`
    pub fn slice(&self, pad: &dyn Pad, offset: usize, limit: usize) -> Vec<Arc<Record>> {
        let page: Vec<_> = self.fetch(pad).into_iter().skip(offset).take(limit).collect();
        record_dependencies(pad, &page);
        page
    }

    /// Number of records iteration yields; replayed paths the pad no
    /// longer has are not counted
    pub fn count(&self, pad: &dyn Pad) -> usize {
        match &self.source {
            Source::Precomputed(paths) => paths
                .iter()
                .filter(|path| pad.get(path, &self.alt).is_some())
                .count(),
            Source::Fixed(records) => records.len(),
            Source::Children => self.fetch(pad).len(),
        }
    }

    /// Paths of the member records, without recording dependencies
    pub fn paths(&self, pad: &dyn Pad) -> Vec<String> {
        match &self.source {
            Source::Precomputed(paths) => paths.as_ref().clone(),
            _ => self.fetch(pad).iter().map(|r| r.path.clone()).collect(),
        }
    }
}

fn record_dependencies(pad: &dyn Pad, records: &[Arc<Record>]) {
    let deps = pad.dependencies();
    for filename in records.iter().filter_map(|r| r.source_filename.as_ref()) {
        deps.record(filename);
    }
}
