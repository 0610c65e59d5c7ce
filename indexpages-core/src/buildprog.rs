//! Build program for index nodes: what to write, how to render it, and
//! which nodes to visit next.

use crate::error::Error;
use crate::node::IndexNode;
use crate::Result;
use indexpages_types::Pad;
use std::path::PathBuf;
use tracing::debug;

/// Renders a named template with `this` bound to an index node
pub trait TemplateRenderer {
    fn render(&self, template: &str, this: &IndexNode, pad: &dyn Pad) -> Result<String>;
}

/// An output file the build of a node will produce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDeclaration {
    /// URL path of the artifact, e.g. `/blog/2020/index.html`
    pub artifact_name: String,
    /// Source files whose change invalidates the artifact
    pub sources: Vec<PathBuf>,
}

pub struct IndexBuildProgram {
    node: IndexNode,
}

impl IndexBuildProgram {
    pub fn new(node: IndexNode) -> Self {
        Self { node }
    }

    pub fn node(&self) -> &IndexNode {
        &self.node
    }

    /// Artifacts of this node
    ///
    /// Hidden nodes produce nothing, and neither does the anchor of a
    /// paginated node: each of its pages is built instead.
    pub fn produce_artifacts(&self, pad: &dyn Pad) -> Result<Vec<ArtifactDeclaration>> {
        let node = &self.node;
        if node.is_hidden() {
            return Ok(Vec::new());
        }
        if node.pagination_config().enabled && node.page_num().is_none() {
            return Ok(Vec::new());
        }

        let mut artifact_name = node.url_path(pad)?;
        if artifact_name.ends_with('/') {
            artifact_name.push_str("index.html");
        }
        // Without any source the artifact would be pruned right after the build
        let sources = node.record().source_filename.iter().cloned().collect();
        Ok(vec![ArtifactDeclaration {
            artifact_name,
            sources,
        }])
    }

    /// Render the node's template
    ///
    /// The configuration file is recorded as a dependency so that editing
    /// it rebuilds every index page.
    pub fn build_artifact(&self, pad: &dyn Pad, renderer: &dyn TemplateRenderer) -> Result<String> {
        let Some(source) = self.node.as_source() else {
            return Err(Error::Render {
                template: String::new(),
                message: format!("{} is not buildable", self.node),
            });
        };
        if let Some(filename) = self.node.config_filename() {
            pad.dependencies().record(filename);
        }
        debug!(node = %self.node, template = source.template(), "rendering index page");
        renderer.render(source.template(), &self.node, pad)
    }

    /// Nodes to build after this one: its pages, then its sub-groups
    pub fn iter_child_sources(&self, pad: &dyn Pad) -> Result<Vec<IndexNode>> {
        let node = &self.node;
        let mut children = Vec::new();

        if node.pagination_config().enabled && node.page_num().is_none() {
            let pages = node.count_pages(pad);
            children.extend((1..=pages).map(|n| node.for_page(pad, Some(n))));
        }
        if node.has_subindex() {
            children.extend(node.subindexes(pad)?.into_iter().map(IndexNode::Source));
        }
        Ok(children)
    }
}
