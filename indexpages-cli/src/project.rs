//! A content directory plus its index configuration.

use anyhow::{bail, Context, Result};
use indexpages_core::{
    ConfigSource, IndexBuildProgram, IndexNode, IndexPagesPlugin, MemoryPad, VIRTUAL_PATH_PREFIX,
};
use indexpages_expr::Engine;
use indexpages_types::Pad;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

/// Global command line options shared by every command
#[derive(Debug, Clone)]
pub struct ProjectOptions {
    pub content_dir: PathBuf,
    pub config_path: PathBuf,
    pub extra_flags: Vec<String>,
}

pub struct Project {
    content_dir: PathBuf,
    config_path: PathBuf,
    plugin: IndexPagesPlugin,
}

impl Project {
    pub fn open(options: &ProjectOptions) -> Result<Self> {
        if !options.content_dir.is_dir() {
            bail!("Content directory {:?} does not exist", options.content_dir);
        }

        let mut plugin = IndexPagesPlugin::new(Arc::new(Engine), ConfigSource::File(options.config_path.clone()));
        plugin.setup(&parse_extra_flags(&options.extra_flags));

        Ok(Self {
            content_dir: options.content_dir.clone(),
            config_path: options.config_path.clone(),
            plugin,
        })
    }

    pub fn plugin(&self) -> &IndexPagesPlugin {
        &self.plugin
    }

    pub fn content_dir(&self) -> &PathBuf {
        &self.content_dir
    }

    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Read the content directory into a fresh pad
    pub fn load_pad(&self) -> Result<MemoryPad> {
        MemoryPad::load(&self.content_dir)
            .with_context(|| format!("Failed to load content from {:?}", self.content_dir))
    }

    /// Check the configuration now so errors surface before any output
    pub fn check_config(&self) -> Result<()> {
        self.plugin
            .read_config()
            .with_context(|| format!("Invalid index configuration {:?}", self.config_path))?;
        Ok(())
    }

    /// Resolve a full virtual path such as `/blog@index-pages/year-index/2020`
    pub fn resolve_path(&self, pad: &dyn Pad, path: &str, alt: &str) -> Result<Option<IndexNode>> {
        let Some((record_path, virtual_path)) = path.split_once('@') else {
            bail!("{:?} is not a virtual path (expected <record>@{}/...)", path, VIRTUAL_PATH_PREFIX);
        };
        let Some(rest) = virtual_path.strip_prefix(VIRTUAL_PATH_PREFIX) else {
            return Ok(None);
        };
        if !(rest.is_empty() || rest.starts_with('/')) {
            return Ok(None);
        }
        let Some(record) = pad.get(record_path, alt) else {
            return Ok(None);
        };

        let pieces: Vec<&str> = rest.split('/').filter(|p| !p.is_empty()).collect();
        Ok(self.plugin.resolve_virtual_path(pad, &record, &pieces)?)
    }

    /// Resolve a URL path against the records whose URL prefixes it
    ///
    /// The deepest record is tried first, so `/blog/2020/` is looked up
    /// under `/blog` before `/`.
    pub fn resolve_url(&self, pad: &MemoryPad, url: &str, alt: &str) -> Result<Option<IndexNode>> {
        let mut candidates: Vec<_> = pad
            .records()
            .filter(|record| record.alt == alt)
            .filter_map(|record| {
                let base = record.url_path.trim_end_matches('/');
                let rest = url.strip_prefix(base)?;
                (rest.is_empty() || rest.starts_with('/')).then(|| (base.len(), record.clone(), rest))
            })
            .collect();
        candidates.sort_by(|a, b| b.0.cmp(&a.0));

        for (_, record, rest) in candidates {
            let pieces: Vec<&str> = rest.split('/').filter(|p| !p.is_empty()).collect();
            if pieces.is_empty() {
                continue;
            }
            if let Some(node) = self.plugin.resolve_url(pad, &record, &pieces)? {
                return Ok(Some(node));
            }
        }
        Ok(None)
    }

    /// Every index node in build order
    ///
    /// Roots come from the generator hook of each record; their
    /// descendants follow depth first. Pages of a node list the same
    /// sub-groups as the node itself, so nodes are visited once.
    pub fn walk(&self, pad: &MemoryPad, alt: &str) -> Result<Vec<IndexNode>> {
        let mut seen = HashSet::new();
        let mut nodes = Vec::new();

        for record in pad.records().filter(|record| record.alt == alt) {
            for root in self.plugin.generate(pad, record)? {
                visit(pad, IndexNode::from(root), &mut seen, &mut nodes)?;
            }
        }
        Ok(nodes)
    }
}

fn visit(pad: &dyn Pad, node: IndexNode, seen: &mut HashSet<IndexNode>, nodes: &mut Vec<IndexNode>) -> Result<()> {
    if !seen.insert(node.clone()) {
        return Ok(());
    }
    let children = IndexBuildProgram::new(node.clone()).iter_child_sources(pad)?;
    nodes.push(node);
    for child in children {
        visit(pad, child, seen, nodes)?;
    }
    Ok(())
}

/// `KEY=VALUE` pairs; a bare `KEY` maps to an empty value
fn parse_extra_flags(flags: &[String]) -> HashMap<String, String> {
    flags
        .iter()
        .map(|flag| match flag.split_once('=') {
            Some((key, value)) => (key.trim().to_string(), value.trim().to_string()),
            None => (flag.trim().to_string(), String::new()),
        })
        .collect()
}
