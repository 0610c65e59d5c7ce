//! Host records as the index engine sees them.

use crate::expr::EvalError;
use crate::pad::Pad;
use crate::value::{Object, Value};
use crate::PRIMARY_ALT;
use std::any::Any;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// A content record in the host's record tree
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Slash separated path, `/` for the site root
    pub path: String,
    pub alt: String,
    /// Public URL path, always starting with `/`
    pub url_path: String,
    /// File the record was loaded from, if any
    pub source_filename: Option<PathBuf>,
    pub hidden: bool,
    pub data: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let url_path = default_url_path(&path);
        Self {
            path,
            alt: PRIMARY_ALT.to_string(),
            url_path,
            source_filename: None,
            hidden: false,
            data: BTreeMap::new(),
        }
    }

    pub fn with_alt(mut self, alt: impl Into<String>) -> Self {
        self.alt = alt.into();
        self
    }

    pub fn with_url_path(mut self, url_path: impl Into<String>) -> Self {
        self.url_path = url_path.into();
        self
    }

    pub fn with_source_filename(mut self, filename: impl Into<PathBuf>) -> Self {
        self.source_filename = Some(filename.into());
        self
    }

    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(name.into(), value.into());
        self
    }

    /// Last path segment (empty for the root)
    pub fn id(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or("")
    }

    /// Path of the parent record, `None` for the root
    pub fn parent_path(&self) -> Option<String> {
        if self.path == "/" || self.path.is_empty() {
            return None;
        }
        match self.path.rfind('/') {
            Some(0) => Some("/".to_string()),
            Some(idx) => Some(self.path[..idx].to_string()),
            None => None,
        }
    }

    /// Look up a field, including the system fields every record has
    pub fn get(&self, name: &str) -> Value {
        match name {
            "_id" => Value::from(self.id()),
            "_path" | "path" => Value::from(self.path.as_str()),
            "_alt" | "alt" => Value::from(self.alt.as_str()),
            "_hidden" | "is_hidden" => Value::from(self.hidden),
            "url_path" => Value::from(self.url_path.as_str()),
            _ => self
                .data
                .get(name)
                .cloned()
                .unwrap_or_else(|| Value::undefined(format!("Missing value in field '{}'", name))),
        }
    }
}

fn default_url_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", trimmed)
    }
}

impl Object for Record {
    fn type_name(&self) -> &'static str {
        "record"
    }

    fn identity(&self) -> String {
        self.path.clone()
    }

    fn attr(self: Arc<Self>, name: &str, pad: &dyn Pad) -> Result<Value, EvalError> {
        match name {
            "children" => Ok(Value::List(
                pad.children(&self)
                    .into_iter()
                    .map(|child| Value::Object(child as Arc<dyn Object>))
                    .collect(),
            )),
            "parent" => Ok(self
                .parent_path()
                .and_then(|path| pad.get(&path, &self.alt))
                .map(|parent| Value::Object(parent as Arc<dyn Object>))
                .unwrap_or(Value::Null)),
            _ => Ok(self.get(name)),
        }
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_and_parent() {
        let record = Record::new("/blog/first-post");
        assert_eq!(record.id(), "first-post");
        assert_eq!(record.parent_path().as_deref(), Some("/blog"));
        assert_eq!(Record::new("/blog").parent_path().as_deref(), Some("/"));
        assert_eq!(Record::new("/").parent_path(), None);
    }

    #[test]
    fn test_default_url_path() {
        assert_eq!(Record::new("/").url_path, "/");
        assert_eq!(Record::new("/blog/post").url_path, "/blog/post/");
    }

    #[test]
    fn test_system_fields() {
        let record = Record::new("/blog/post")
            .with_alt("de")
            .with_field("title", "Hallo");
        assert_eq!(record.get("_id"), Value::from("post"));
        assert_eq!(record.get("_alt"), Value::from("de"));
        assert_eq!(record.get("title"), Value::from("Hallo"));
        assert!(record.get("missing").is_undefined());
    }
}
