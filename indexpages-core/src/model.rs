//! Index models: the immutable, compiled form of the configuration.

use crate::config::{resolve_pagination, IndexConfig, IndexSection, PaginationSection};
use crate::error::ConfigError;
use crate::node::IndexSource;
use crate::query::Query;
use crate::slug::slugify_path;
use crate::Result;
use indexpages_types::{
    CompiledExpression, EvalError, ExpressionEngine, Object, Pad, Record, Scope, Value,
};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// First piece of every virtual path produced by this crate
pub const VIRTUAL_PATH_PREFIX: &str = "index-pages";

pub const DEFAULT_TEMPLATE: &str = "index-pages.html";

/// Resolved pagination settings for one index level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationConfig {
    pub enabled: bool,
    pub per_page: usize,
    pub url_suffix: String,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            per_page: 20,
            url_suffix: "page".to_string(),
        }
    }
}

impl PaginationConfig {
    pub fn new(enabled: bool, per_page: usize, url_suffix: impl Into<String>) -> Self {
        Self {
            enabled,
            per_page: per_page.max(1),
            url_suffix: url_suffix.into(),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    /// Number of pages needed for `total` items; never less than one
    pub fn count_pages(&self, total: usize) -> usize {
        total.div_ceil(self.per_page.max(1)).max(1)
    }

    /// Recognize `[url_suffix, n]` in a URL with `2 <= n <= pages`
    ///
    /// Page one lives at the bare URL, so `page/1` does not match, and
    /// neither does a non-canonical number such as `02`.
    pub fn match_url_page(&self, pieces: &[&str], pages: impl FnOnce() -> usize) -> Option<usize> {
        let [suffix, num] = pieces else {
            return None;
        };
        if !self.enabled || *suffix != self.url_suffix {
            return None;
        }
        let page_num: usize = num.parse().ok()?;
        (page_num.to_string() == *num && page_num >= 2 && page_num <= pages()).then_some(page_num)
    }
}

/// A compiled rule together with its name and source text
#[derive(Clone)]
pub struct FieldRule {
    name: String,
    expr: Arc<dyn CompiledExpression>,
}

impl FieldRule {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        self.expr.source()
    }

    /// Evaluate with `this` bound to `this`
    pub fn evaluate_this(&self, pad: &dyn Pad, alt: &str, this: Value) -> Result<Value, EvalError> {
        self.expr.evaluate(&Scope::new(pad, alt).with_this(this))
    }

    /// Evaluate with `item` bound to `item`
    pub fn evaluate_item(&self, pad: &dyn Pad, alt: &str, item: Value) -> Result<Value, EvalError> {
        self.expr.evaluate(&Scope::new(pad, alt).with_item(item))
    }
}

impl fmt::Debug for FieldRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRule")
            .field("name", &self.name)
            .field("source", &self.source())
            .finish()
    }
}

/// Compiles rules of one config section, attributing syntax errors to it
pub struct ExpressionCompiler<'a> {
    engine: &'a dyn ExpressionEngine,
    section: String,
    filename: String,
}

impl<'a> ExpressionCompiler<'a> {
    pub fn new(engine: &'a dyn ExpressionEngine, section: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            engine,
            section: section.into(),
            filename: filename.into(),
        }
    }

    pub fn compile(&self, name: &str, source: &str) -> Result<FieldRule, ConfigError> {
        let expr = self
            .engine
            .compile(source)
            .map_err(|err| ConfigError::ExpressionSyntax {
                section: self.section.clone(),
                filename: self.filename.clone(),
                name: name.to_string(),
                expression: source.to_string(),
                message: err.to_string(),
            })?;
        Ok(FieldRule {
            name: name.to_string(),
            expr,
        })
    }
}

/// Coerce a key value into a path component
pub fn idify(value: &str) -> String {
    value.replace('@', "_")
}

/// Configuration for one grouping level
#[derive(Debug)]
pub struct IndexModel {
    /// Dotted section name, e.g. `year-index.month-index`
    pub name: String,
    pub key: FieldRule,
    pub slug_format: Option<FieldRule>,
    pub template: String,
    pub fields: Vec<(String, FieldRule)>,
    pub pagination: PaginationConfig,
    pub subindex: Option<Arc<IndexModel>>,
    pub config_filename: Option<PathBuf>,
}

impl IndexModel {
    /// `<parent>/<id>`, plus `/page/<n>` for a page variant
    pub fn virtual_path(&self, parent_virtual_path: &str, id: &str, page_num: Option<usize>) -> String {
        match page_num {
            Some(n) => format!("{}/{}/page/{}", parent_virtual_path, id, n),
            None => format!("{}/{}", parent_virtual_path, id),
        }
    }

    /// Recognize `["page", n]` with `1 <= n <= pages`
    pub fn match_path_pagination(&self, pieces: &[&str], pages: impl FnOnce() -> usize) -> Option<usize> {
        if !self.pagination.enabled {
            return None;
        }
        let ["page", num] = pieces else {
            return None;
        };
        if num.is_empty() || !num.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let page_num: usize = num.parse().ok()?;
        (page_num >= 1 && page_num <= pages()).then_some(page_num)
    }

    /// Group keys a record belongs to, in order of appearance
    pub fn keys_for_record(&self, pad: &dyn Pad, record: &Arc<Record>) -> Result<Vec<String>, EvalError> {
        let item = Value::Object(record.clone() as Arc<dyn Object>);
        let value = self.key.evaluate_item(pad, &record.alt, item)?;
        let values = match value {
            Value::List(items) => items,
            other => vec![other],
        };
        Ok(values
            .iter()
            .filter(|v| !v.is_undefined() && !matches!(v, Value::Null))
            .map(|v| idify(&v.render()))
            .filter(|key| !key.is_empty())
            .collect())
    }

    /// URL segment(s) of `source`: the slug rule's result, else the id
    pub fn get_slug(&self, pad: &dyn Pad, source: &Arc<IndexSource>) -> Result<String, EvalError> {
        let raw = match &self.slug_format {
            None => source.id().to_string(),
            Some(rule) => rule
                .evaluate_this(pad, source.alt(), source.to_value())?
                .render(),
        };
        Ok(slugify_path(&raw))
    }

    pub fn has_subindex(&self) -> bool {
        self.subindex.is_some()
    }
}

/// The root of one configured index
#[derive(Debug)]
pub struct IndexRootModel {
    pub index_name: String,
    pub parent_path: String,
    pub items: Option<FieldRule>,
    pub index_model: Arc<IndexModel>,
    pub pagination: PaginationConfig,
    pub config_filename: Option<PathBuf>,
}

impl IndexRootModel {
    pub fn virtual_path(&self) -> String {
        format!("{}/{}", VIRTUAL_PATH_PREFIX, self.index_name)
    }

    /// The members of the index: the `items` rule, else the record's children
    pub fn get_items(&self, pad: &dyn Pad, record: &Arc<Record>) -> Result<Query> {
        let Some(items) = &self.items else {
            return Ok(Query::children(record));
        };
        let this = Value::Object(record.clone() as Arc<dyn Object>);
        let value = items.evaluate_this(pad, &record.alt, this)?;
        let members = match value {
            Value::Undefined(_) | Value::Null => Vec::new(),
            Value::List(values) => values,
            other => vec![other],
        };
        let records = members
            .iter()
            .map(|member| {
                member.downcast::<Record>().ok_or_else(|| {
                    EvalError::Type(format!(
                        "'items' of index '{}' must yield records, got {}",
                        self.index_name,
                        member.type_name()
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Query::fixed(&record.path, &record.alt, records))
    }
}

/// Build root models for every index in `config`, in file order
pub fn index_models_from_config(
    config: &IndexConfig,
    engine: &dyn ExpressionEngine,
) -> Result<Vec<Arc<IndexRootModel>>, ConfigError> {
    let filename = config.display_filename();
    let mut models = Vec::with_capacity(config.indexes.len());

    for (index_name, section) in &config.indexes {
        let index_model = index_model_from_section(config, engine, index_name, section, &mut Vec::new())?;
        let compiler = ExpressionCompiler::new(engine, index_name.as_str(), filename.as_str());
        let items = section
            .items
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|source| compiler.compile("items", source))
            .transpose()?;

        models.push(Arc::new(IndexRootModel {
            index_name: index_name.clone(),
            parent_path: section.parent_path.clone().unwrap_or_else(|| "/".to_string()),
            items,
            index_model,
            pagination: PaginationConfig::disabled(),
            config_filename: config.filename.clone(),
        }));
    }
    Ok(models)
}

fn index_model_from_section<'c>(
    config: &'c IndexConfig,
    engine: &dyn ExpressionEngine,
    name: &str,
    section: &'c IndexSection,
    enclosing: &mut Vec<&'c PaginationSection>,
) -> Result<Arc<IndexModel>, ConfigError> {
    let filename = config.display_filename();
    let compiler = ExpressionCompiler::new(engine, name, filename.as_str());

    let key = match section.key.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(source) => compiler.compile("key", source)?,
        None => {
            return Err(ConfigError::MissingKey {
                section: name.to_string(),
                filename,
            })
        }
    };
    let slug_format = section
        .slug_format
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|source| compiler.compile("slug_format", source))
        .transpose()?;

    if let Some(dotted) = section.fields.keys().find(|name| name.contains('.')) {
        return Err(ConfigError::DottedFieldName {
            section: name.to_string(),
            filename,
            name: dotted.clone(),
        });
    }
    let fields_compiler = ExpressionCompiler::new(engine, format!("{}.fields", name), filename.as_str());
    let fields = section
        .fields
        .iter()
        .map(|(field, source)| Ok((field.clone(), fields_compiler.compile(field, source)?)))
        .collect::<Result<Vec<_>, ConfigError>>()?;

    enclosing.push(&section.pagination);
    let pagination = resolve_pagination(&config.pagination, enclosing);

    let subindex = match section.subindex.as_deref().filter(|s| !s.is_empty()) {
        None => None,
        Some(sub) => {
            let sub_section = section.sections.get(sub).ok_or_else(|| ConfigError::UnknownSubindex {
                section: name.to_string(),
                subindex: sub.to_string(),
                filename: filename.clone(),
            })?;
            let sub_name = format!("{}.{}", name, sub);
            Some(index_model_from_section(config, engine, &sub_name, sub_section, enclosing)?)
        }
    };
    enclosing.pop();

    Ok(Arc::new(IndexModel {
        name: name.to_string(),
        key,
        slug_format,
        template: section
            .template
            .clone()
            .unwrap_or_else(|| DEFAULT_TEMPLATE.to_string()),
        fields,
        pagination,
        subindex,
        config_filename: config.filename.clone(),
    }))
}
