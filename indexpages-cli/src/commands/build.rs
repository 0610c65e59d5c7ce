//! Build command implementation.

use crate::project::{Project, ProjectOptions};
use crate::state::{file_digest, ArtifactState, BuildState};
use anyhow::{Context, Result};
use indexpages_core::IndexBuildProgram;
use indexpages_render::HtmlRenderer;
use indexpages_types::Pad;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

#[derive(Debug, Default)]
struct BuildStats {
    built: usize,
    unchanged: usize,
    removed: usize,
}

/// Build every index page below `output_dir`
///
/// Pages whose checksum and dependencies are unchanged since the previous
/// build are kept; pages that are no longer produced are removed.
pub fn build_indexes(options: &ProjectOptions, output_dir: &Path, site_title: &str) -> Result<()> {
    let project = Project::open(options)?;
    project.plugin().before_build_all();
    project.check_config()?;

    if project.plugin().skip_build() {
        println!("Index pages disabled, nothing to build");
        return Ok(());
    }

    tracing::info!("Loading content from {:?}", project.content_dir());
    let pad = project.load_pad()?;
    let renderer = HtmlRenderer::new(site_title);

    fs::create_dir_all(output_dir).context("Failed to create output directory")?;
    let mut previous = BuildState::load(output_dir)?;
    let mut state = BuildState::default();
    let mut stats = BuildStats::default();

    let alts: BTreeSet<String> = pad.records().map(|record| record.alt.clone()).collect();
    for alt in &alts {
        for node in project.walk(&pad, alt)? {
            let program = IndexBuildProgram::new(node);
            for artifact in program.produce_artifacts(&pad)? {
                let checksum = program.node().checksum(&pad)?;
                let output = output_dir.join(artifact.artifact_name.trim_start_matches('/'));

                if let Some(entry) = previous.artifacts.remove(&artifact.artifact_name) {
                    if entry.is_current(&checksum, &output) {
                        tracing::debug!("Unchanged: {}", artifact.artifact_name);
                        state.artifacts.insert(artifact.artifact_name, entry);
                        stats.unchanged += 1;
                        continue;
                    }
                }

                pad.dependencies().take();
                let html = program
                    .build_artifact(&pad, &renderer)
                    .with_context(|| format!("Failed to render {}", program.node()))?;
                let dependencies: BTreeMap<_, _> = pad
                    .dependencies()
                    .take()
                    .into_iter()
                    .filter_map(|path| file_digest(&path).map(|digest| (path, digest)))
                    .collect();

                if let Some(parent) = output.parent() {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("Failed to create directory {:?}", parent))?;
                }
                fs::write(&output, html).with_context(|| format!("Failed to write {:?}", output))?;
                tracing::debug!("Built: {}", artifact.artifact_name);

                state.artifacts.insert(
                    artifact.artifact_name,
                    ArtifactState {
                        checksum,
                        sources: artifact.sources,
                        dependencies,
                    },
                );
                stats.built += 1;
            }
        }
    }

    for name in previous.artifacts.keys() {
        let output = output_dir.join(name.trim_start_matches('/'));
        if output.exists() {
            fs::remove_file(&output).with_context(|| format!("Failed to remove {:?}", output))?;
            tracing::info!("Removed stale page {}", name);
        }
        stats.removed += 1;
    }

    state.save(output_dir)?;
    tracing::info!("Index pages written to {:?}", output_dir);
    println!(
        "Built {} pages ({} unchanged, {} removed)",
        stats.built, stats.unchanged, stats.removed
    );
    Ok(())
}
