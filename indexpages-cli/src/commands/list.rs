//! List command implementation.

use crate::project::{Project, ProjectOptions};
use anyhow::Result;
use indexpages_core::{IndexBuildProgram, IndexNode};

/// Print every index node as an indented tree
pub fn list_indexes(options: &ProjectOptions, alt: &str) -> Result<()> {
    let project = Project::open(options)?;
    project.check_config()?;
    let pad = project.load_pad()?;

    let nodes = project.walk(&pad, alt)?;
    if nodes.is_empty() {
        println!("No index pages");
        return Ok(());
    }

    for node in nodes {
        let built = !IndexBuildProgram::new(node.clone()).produce_artifacts(&pad)?.is_empty();
        println!(
            "{}{}  {}{}",
            "  ".repeat(depth(&node)),
            node.path(),
            node.url_path(&pad)?,
            if built { "" } else { "  (not built)" }
        );
    }
    Ok(())
}

/// Nesting below the index root; a page sits one level under its node
fn depth(node: &IndexNode) -> usize {
    let pieces = node.virtual_path().split('/').count().saturating_sub(2);
    match node.page_num() {
        Some(_) => pieces.saturating_sub(1),
        None => pieces,
    }
}
