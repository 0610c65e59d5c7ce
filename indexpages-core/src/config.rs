//! Index configuration file parsing.
//!
//! ```yaml
//! pagination:
//!   per_page: 10
//! indexes:
//!   year-index:
//!     parent_path: /blog
//!     key: item.pub_date|dateformat('%Y')
//!     subindex: month-index
//!     pagination:
//!       enabled: true
//!     sections:
//!       month-index:
//!         key: item.pub_date|dateformat('%m')
//! ```

use crate::error::ConfigError;
use crate::model::PaginationConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Pagination settings as written; unset values are inherited
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationSection {
    #[serde(default)]
    pub enabled: Option<bool>,

    #[serde(default)]
    pub per_page: Option<usize>,

    #[serde(default)]
    pub url_suffix: Option<String>,
}

/// One index section; nested `sections` hold sub-index configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexSection {
    #[serde(default)]
    pub parent_path: Option<String>,

    #[serde(default)]
    pub items: Option<String>,

    #[serde(default)]
    pub key: Option<String>,

    #[serde(default)]
    pub slug_format: Option<String>,

    #[serde(default)]
    pub template: Option<String>,

    #[serde(default)]
    pub subindex: Option<String>,

    #[serde(default)]
    pub fields: BTreeMap<String, String>,

    #[serde(default)]
    pub pagination: PaginationSection,

    #[serde(default)]
    pub sections: BTreeMap<String, IndexSection>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    pagination: PaginationSection,

    #[serde(default)]
    indexes: serde_yaml::Mapping,
}

/// Parsed index configuration
#[derive(Debug, Clone, Default)]
pub struct IndexConfig {
    /// Global pagination defaults
    pub pagination: PaginationSection,

    /// Top-level indexes in file order
    pub indexes: Vec<(String, IndexSection)>,

    /// File the configuration was read from
    pub filename: Option<PathBuf>,
}

impl IndexConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_str(&contents)?;
        config.filename = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse configuration from a YAML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_yaml::from_str(contents)?;
        let mut indexes = Vec::with_capacity(raw.indexes.len());
        for (name, section) in raw.indexes {
            let name: String = serde_yaml::from_value(name)?;
            let section: IndexSection = serde_yaml::from_value(section)?;
            indexes.push((name, section));
        }
        Ok(Self {
            pagination: raw.pagination,
            indexes,
            filename: None,
        })
    }

    /// Name used for this configuration in error messages
    pub fn display_filename(&self) -> String {
        match &self.filename {
            Some(path) => path.display().to_string(),
            None => "<inline config>".to_string(),
        }
    }

    pub fn index(&self, name: &str) -> Option<&IndexSection> {
        self.indexes
            .iter()
            .find(|(index_name, _)| index_name == name)
            .map(|(_, section)| section)
    }
}

/// Resolve pagination for a section given its enclosing sections
///
/// `chain` lists the pagination sections from the outermost index down to
/// the section being resolved. Each setting comes from the innermost
/// section that sets it, then from `global`, then from the default.
pub fn resolve_pagination(global: &PaginationSection, chain: &[&PaginationSection]) -> PaginationConfig {
    let defaults = PaginationConfig::default();
    PaginationConfig::new(
        inherit(global, chain, |s| s.enabled).unwrap_or(defaults.enabled),
        inherit(global, chain, |s| s.per_page).unwrap_or(defaults.per_page),
        inherit(global, chain, |s| s.url_suffix.clone()).unwrap_or(defaults.url_suffix),
    )
}

fn inherit<T>(
    global: &PaginationSection,
    chain: &[&PaginationSection],
    get: impl Fn(&PaginationSection) -> Option<T>,
) -> Option<T> {
    chain
        .iter()
        .rev()
        .find_map(|section| get(section))
        .or_else(|| get(global))
}
