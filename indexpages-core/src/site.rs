//! In-memory record tree and a loader for a directory of Markdown files.
//!
//! Every directory is a record, with fields from its `index.md` if it has
//! one; every other `.md` file is a record of its own. YAML front matter
//! becomes the record's fields, and the Markdown body is stored as `body`.
//!
//! ```text
//! content/index.md                 -> /
//! content/blog/index.md            -> /blog
//! content/blog/first-post.md       -> /blog/first-post
//! content/blog/second-post/index.md -> /blog/second-post
//! ```

use crate::sort::{compare_sort_keys, parse_field_spec, SortKey};
use chrono::NaiveDate;
use indexpages_types::{DependencyRecorder, Pad, Record, Value, VirtualCache, PRIMARY_ALT};
use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Front matter field naming the child sort order, e.g. `-pub_date, title`
pub const ORDER_BY_FIELD: &str = "_order_by";

#[derive(Error, Debug)]
pub enum SiteError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid front matter in {path}: {source}")]
    FrontMatter {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error(transparent)]
    Pattern(#[from] regex::Error),
}

/// A record tree held in memory
///
/// Each pad has its own dependency recorder and virtual cache; use
/// [`fresh`](Self::fresh) for a new pad over the same records, the way
/// a dev server starts every request.
#[derive(Debug, Default)]
pub struct MemoryPad {
    records: BTreeMap<(String, String), Arc<Record>>,
    dependencies: DependencyRecorder,
    virtual_cache: VirtualCache,
}

impl MemoryPad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a record
    pub fn insert(&mut self, record: Record) -> Arc<Record> {
        let record = Arc::new(record);
        self.records
            .insert((record.path.clone(), record.alt.clone()), record.clone());
        record
    }

    pub fn with_record(mut self, record: Record) -> Self {
        self.insert(record);
        self
    }

    pub fn records(&self) -> impl Iterator<Item = &Arc<Record>> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// A new pad over the same records with empty caches
    pub fn fresh(&self) -> Self {
        Self {
            records: self.records.clone(),
            ..Self::default()
        }
    }

    /// Load every Markdown file below `content_dir`
    pub fn load(content_dir: impl AsRef<Path>) -> Result<Self, SiteError> {
        let content_dir = content_dir.as_ref();
        let mut pad = MemoryPad::new();
        pad.insert(Record::new("/"));

        for entry in WalkDir::new(content_dir).sort_by_file_name() {
            let entry = entry.map_err(|source| SiteError::Walk {
                path: content_dir.to_path_buf(),
                source,
            })?;
            let rel = entry.path().strip_prefix(content_dir).unwrap_or(entry.path());

            if entry.file_type().is_dir() {
                let path = record_path(rel);
                if pad.get(&path, PRIMARY_ALT).is_none() {
                    pad.insert(Record::new(path));
                }
                continue;
            }
            if entry.path().extension().and_then(|ext| ext.to_str()) != Some("md") {
                continue;
            }

            let path = if entry.path().file_stem().is_some_and(|stem| stem == "index") {
                record_path(rel.parent().unwrap_or(Path::new("")))
            } else {
                record_path(&rel.with_extension(""))
            };
            pad.insert(read_record(entry.path(), path)?);
        }

        debug!(records = pad.len(), dir = %content_dir.display(), "loaded content");
        Ok(pad)
    }

    fn child_order(&self, record: &Record) -> Vec<(String, bool)> {
        match record.data.get(ORDER_BY_FIELD) {
            Some(Value::Str(spec)) => spec
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    let (field, reverse) = parse_field_spec(s);
                    (field.to_string(), reverse)
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl Pad for MemoryPad {
    fn get(&self, path: &str, alt: &str) -> Option<Arc<Record>> {
        self.records.get(&(path.to_string(), alt.to_string())).cloned()
    }

    /// Children in the parent's `_order_by` order, then by path
    fn children(&self, record: &Record) -> Vec<Arc<Record>> {
        let mut children: Vec<Arc<Record>> = self
            .records
            .values()
            .filter(|r| r.alt == record.alt && r.parent_path().as_deref() == Some(record.path.as_str()))
            .cloned()
            .collect();

        let order = self.child_order(record);
        if !order.is_empty() {
            let sort_key = |r: &Arc<Record>| -> Vec<SortKey> {
                order
                    .iter()
                    .map(|(field, reverse)| {
                        let value = r.get(field);
                        SortKey::new((!value.is_undefined()).then_some(value), *reverse)
                    })
                    .collect()
            };
            children.sort_by(|a, b| compare_sort_keys(&sort_key(a), &sort_key(b)).then_with(|| a.path.cmp(&b.path)));
        }
        children
    }

    fn dependencies(&self) -> &DependencyRecorder {
        &self.dependencies
    }

    fn virtual_cache(&self) -> &VirtualCache {
        &self.virtual_cache
    }
}

/// `/`-joined record path of a path relative to the content directory
fn record_path(rel: &Path) -> String {
    let segments: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    format!("/{}", segments.join("/"))
}

static FRONT_MATTER: OnceCell<Regex> = OnceCell::new();

/// Split `content` into YAML front matter and body
pub fn split_front_matter(content: &str) -> Result<(Option<&str>, &str), regex::Error> {
    let re = FRONT_MATTER.get_or_try_init(|| Regex::new(r"(?s)^---\s*\n(.*?)\n---\s*\n?(.*)$"))?;
    Ok(match re.captures(content) {
        Some(captures) => {
            let yaml = captures.get(1).map_or("", |m| m.as_str());
            let body = captures.get(2).map_or("", |m| m.as_str());
            (Some(yaml), body)
        }
        None => (None, content),
    })
}

fn read_record(file: &Path, path: String) -> Result<Record, SiteError> {
    let content = fs::read_to_string(file).map_err(|source| SiteError::Read {
        path: file.to_path_buf(),
        source,
    })?;
    let (front_matter, body) = split_front_matter(&content)?;

    let mut record = Record::new(path).with_source_filename(file);
    let fields: serde_yaml::Mapping = match front_matter {
        Some(yaml) if !yaml.trim().is_empty() => serde_yaml::from_str(yaml).map_err(|source| SiteError::FrontMatter {
            path: file.to_path_buf(),
            source,
        })?,
        _ => serde_yaml::Mapping::new(),
    };

    for (name, value) in fields {
        let Some(name) = name.as_str() else {
            warn!(file = %file.display(), "skipping front matter entry with a non-string key");
            continue;
        };
        match (name, yaml_to_value(value)) {
            ("_hidden", Some(value)) => record = record.with_hidden(value.is_truthy()),
            (_, Some(value)) => record = record.with_field(name, value),
            (_, None) => warn!(file = %file.display(), field = name, "skipping unsupported front matter value"),
        }
    }
    if !record.data.contains_key("body") {
        record = record.with_field("body", body.trim());
    }
    Ok(record)
}

/// Convert YAML into a field value; mappings are not representable
fn yaml_to_value(value: serde_yaml::Value) -> Option<Value> {
    use serde_yaml::Value as Yaml;

    Some(match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Str(n.to_string()),
        },
        Yaml::String(s) => match NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
            Ok(date) if s.len() == 10 => Value::Date(date),
            _ => Value::Str(s),
        },
        Yaml::Sequence(items) => Value::List(items.into_iter().filter_map(yaml_to_value).collect()),
        Yaml::Mapping(_) => return None,
        Yaml::Tagged(tagged) => return yaml_to_value(tagged.value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_split_front_matter() {
        let (yaml, body) = split_front_matter("---\ntitle: Hi\n---\n# Body\n").unwrap();
        assert_eq!(yaml, Some("title: Hi"));
        assert_eq!(body, "# Body\n");

        let (yaml, body) = split_front_matter("no front matter").unwrap();
        assert_eq!(yaml, None);
        assert_eq!(body, "no front matter");
    }

    #[test]
    fn test_yaml_values() {
        let yaml: serde_yaml::Value = serde_yaml::from_str("[2020-04-01, 3, true, text, 1.5]").unwrap();
        let value = yaml_to_value(yaml).unwrap();
        assert_eq!(
            value,
            Value::List(vec![
                Value::Date(NaiveDate::from_ymd_opt(2020, 4, 1).unwrap()),
                Value::Int(3),
                Value::Bool(true),
                Value::from("text"),
                Value::from("1.5"),
            ])
        );
        assert!(yaml_to_value(serde_yaml::from_str("{a: 1}").unwrap()).is_none());
    }

    #[test]
    fn test_load_content_tree() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "index.md", "---\ntitle: Home\n---\n");
        write(dir.path(), "blog/index.md", "---\ntitle: Blog\n_order_by: -pub_date\n---\n");
        write(dir.path(), "blog/first-post.md", "---\npub_date: 2019-12-31\n---\nFirst\n");
        write(dir.path(), "blog/second-post/index.md", "---\npub_date: 2020-04-01\n_hidden: true\n---\n");
        write(dir.path(), "notes.txt", "ignored");

        let pad = MemoryPad::load(dir.path()).unwrap();
        let blog = pad.get("/blog", PRIMARY_ALT).unwrap();
        assert_eq!(blog.get("title"), Value::from("Blog"));

        let children: Vec<_> = pad.children(&blog).iter().map(|r| r.path.clone()).collect();
        assert_eq!(children, vec!["/blog/second-post", "/blog/first-post"]);

        let first = pad.get("/blog/first-post", PRIMARY_ALT).unwrap();
        assert_eq!(first.get("body"), Value::from("First"));
        assert_eq!(first.source_filename.as_deref(), Some(dir.path().join("blog/first-post.md").as_path()));
        assert!(pad.get("/blog/second-post", PRIMARY_ALT).unwrap().hidden);
        assert!(pad.get("/notes", PRIMARY_ALT).is_none());
    }

    #[test]
    fn test_children_default_to_path_order() {
        let pad = MemoryPad::new()
            .with_record(Record::new("/blog"))
            .with_record(Record::new("/blog/b"))
            .with_record(Record::new("/blog/a"))
            .with_record(Record::new("/blog/a").with_alt("de"))
            .with_record(Record::new("/other/c"));
        let blog = pad.get("/blog", PRIMARY_ALT).unwrap();
        let children: Vec<_> = pad.children(&blog).iter().map(|r| r.path.clone()).collect();
        assert_eq!(children, vec!["/blog/a", "/blog/b"]);
    }

    #[test]
    fn test_invalid_front_matter() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "bad.md", "---\ntitle: [unclosed\n---\n");
        let err = MemoryPad::load(dir.path()).unwrap_err();
        assert!(matches!(err, SiteError::FrontMatter { .. }));
    }
}
