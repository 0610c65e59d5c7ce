#![allow(dead_code)]

use chrono::NaiveDate;
use indexpages_core::site::ORDER_BY_FIELD;
use indexpages_core::{ComputationCache, IndexConfig, IndexNode, IndexRoot, IndexSource, MemoryPad, Registry};
use indexpages_expr::Engine;
use indexpages_types::{Pad, Record, PRIMARY_ALT};
use std::sync::Arc;

pub const ROOT_PATH: &str = "/blog@index-pages/year-index";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// `/blog` with two posts from 2020 (April and March) and one from 2019
pub fn blog_pad_in(alt: &str) -> MemoryPad {
    let post = |id: &str, pub_date: NaiveDate| {
        Record::new(format!("/blog/{}", id))
            .with_alt(alt)
            .with_source_filename(format!("content/blog/{}/contents.lr", id))
            .with_field("title", id)
            .with_field("pub_date", pub_date)
    };
    MemoryPad::new()
        .with_record(Record::new("/").with_alt(alt))
        .with_record(
            Record::new("/blog")
                .with_alt(alt)
                .with_source_filename("content/blog/contents.lr")
                .with_field(ORDER_BY_FIELD, "-pub_date"),
        )
        .with_record(post("second-post", date(2020, 4, 1)))
        .with_record(post("first-post", date(2020, 3, 15)))
        .with_record(post("old-post", date(2019, 3, 2)))
}

pub fn blog_pad() -> MemoryPad {
    blog_pad_in(PRIMARY_ALT)
}

/// Knobs of the test configuration
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// `Some(per_page)` enables pagination globally
    pub per_page: Option<usize>,
    pub months: bool,
    pub slug_format: Option<&'static str>,
}

impl Options {
    pub fn paginated(per_page: usize) -> Self {
        Self {
            per_page: Some(per_page),
            ..Self::default()
        }
    }

    pub fn with_months(mut self) -> Self {
        self.months = true;
        self
    }
}

pub fn config_yaml(options: &Options) -> String {
    let mut yaml = String::new();
    if let Some(per_page) = options.per_page {
        yaml.push_str(&format!("pagination:\n  enabled: true\n  per_page: {}\n", per_page));
    }
    yaml.push_str(
        "indexes:\n  year-index:\n    parent_path: /blog\n    key: \"item.pub_date|dateformat('%Y')\"\n    template: year-index.html\n",
    );
    if let Some(slug) = options.slug_format {
        yaml.push_str(&format!("    slug_format: {:?}\n", slug));
    }
    if options.months {
        yaml.push_str("    subindex: month-index\n");
    }
    yaml.push_str(
        "    fields:\n      title: \"'Posts from ' ~ this._id\"\n    sections:\n      month-index:\n        key: \"item.pub_date|dateformat('%m')\"\n        template: month-index.html\n",
    );
    yaml
}

pub fn config(options: &Options) -> IndexConfig {
    IndexConfig::from_str(&config_yaml(options)).unwrap()
}

pub fn registry(options: &Options) -> Registry {
    Registry::from_config(&config(options), &Engine, Arc::new(ComputationCache::new())).unwrap()
}

pub fn root(registry: &Registry, pad: &dyn Pad) -> Arc<IndexRoot> {
    registry.get_index_root(pad, "year-index", PRIMARY_ALT).unwrap()
}

pub fn year(registry: &Registry, pad: &dyn Pad, id: &str) -> Arc<IndexSource> {
    root(registry, pad).to_node().get_subgroup(pad, id, None).unwrap()
}

/// Resolve a `/`-separated virtual path below the root and return the node path
pub fn resolve(registry: &Registry, pad: &dyn Pad, path: &str) -> Option<String> {
    let pieces: Vec<&str> = if path.is_empty() { vec![] } else { path.split('/').collect() };
    root(registry, pad)
        .to_node()
        .resolve_virtual_path(pad, &pieces)
        .unwrap()
        .map(|node| node.path().to_string())
}

/// Resolve a `/`-separated URL below `/blog/` and return the node path
pub fn resolve_url(registry: &Registry, pad: &dyn Pad, url: &str) -> Option<String> {
    let pieces: Vec<&str> = if url.is_empty() { vec![] } else { url.split('/').collect() };
    root(registry, pad)
        .to_node()
        .resolve_url_path(pad, &pieces)
        .unwrap()
        .map(|node| node.path().to_string())
}

pub fn ids(sources: &[Arc<IndexSource>]) -> Vec<String> {
    sources.iter().map(|s| s.id().to_string()).collect()
}

pub fn paths(nodes: &[IndexNode]) -> Vec<String> {
    nodes.iter().map(|n| n.path().to_string()).collect()
}
