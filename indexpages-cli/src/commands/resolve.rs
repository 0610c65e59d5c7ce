//! Resolve command implementation.

use crate::project::{Project, ProjectOptions};
use anyhow::{bail, Context, Result};
use indexpages_render::HtmlRenderer;

/// Look up an index node by virtual path or URL and describe it
pub fn resolve_path(options: &ProjectOptions, path: &str, url: bool, alt: &str, json: bool) -> Result<()> {
    let project = Project::open(options)?;
    project.check_config()?;
    let pad = project.load_pad()?;

    let node = if url {
        project.resolve_url(&pad, path, alt)?
    } else {
        project.resolve_path(&pad, path, alt)?
    };
    let Some(node) = node else {
        bail!("No index page found for {:?}", path);
    };

    if json {
        let view = HtmlRenderer::new("").view(&node, &pad)?;
        let output = serde_json::to_string_pretty(&view).context("Failed to serialize index page")?;
        println!("{}", output);
        return Ok(());
    }

    println!("path:     {}", node.path());
    println!("url:      {}", node.url_path(&pad)?);
    println!("alt:      {}", node.alt());
    match node.page_num() {
        Some(page) => println!("page:     {}", page),
        None => println!("page:     -"),
    }
    println!("members:  {}", node.children().count(&pad));
    println!("hidden:   {}", node.is_hidden());
    println!("checksum: {}", node.checksum(&pad)?);
    Ok(())
}
