//! Serve command: renders index pages on request.

use crate::project::{Project, ProjectOptions};
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    Router,
};
use indexpages_core::IndexBuildProgram;
use indexpages_render::HtmlRenderer;
use indexpages_types::PRIMARY_ALT;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
struct AppState {
    project: Arc<Project>,
    renderer: Arc<HtmlRenderer>,
}

/// Start a server that resolves every request URL to an index page
///
/// Content is reloaded per request. The computation cache is cleared
/// whenever the content directory or the configuration changes.
pub async fn serve(options: ProjectOptions, port: u16, site_title: String) -> Result<()> {
    let project = Arc::new(Project::open(&options)?);
    project.check_config()?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            let _ = tx.send(res);
        },
        notify::Config::default(),
    )
    .context("Failed to initialize file watcher")?;
    watcher
        .watch(project.content_dir(), RecursiveMode::Recursive)
        .with_context(|| format!("Failed to watch {:?}", project.content_dir()))?;
    if project.config_path().exists() {
        watcher
            .watch(project.config_path(), RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {:?}", project.config_path()))?;
    }

    tokio::spawn({
        let project = project.clone();
        async move {
            while let Some(event) = rx.recv().await {
                match event {
                    Ok(_) => {
                        while rx.try_recv().is_ok() {}
                        tracing::info!("Change detected, clearing index cache");
                        project.plugin().before_build_all();
                    }
                    Err(err) => tracing::warn!("Watcher error: {}", err),
                }
            }
        }
    });

    let state = AppState {
        project,
        renderer: Arc::new(HtmlRenderer::new(site_title)),
    };
    let app = Router::new()
        .fallback(serve_page)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("127.0.0.1:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("Serving index pages on http://localhost:{}", port);
    println!("Serving at http://localhost:{}", port);
    println!("Press Ctrl+C to stop");

    axum::serve(listener, app).await.context("Server error")?;

    // Keep the watcher alive for the lifetime of the server
    drop(watcher);
    Ok(())
}

async fn serve_page(State(state): State<AppState>, uri: Uri) -> Response {
    let url = uri.path().to_string();
    let result = tokio::task::spawn_blocking(move || render_url(&state, &url)).await;

    match result {
        Ok(Ok(Some(html))) => Html(html).into_response(),
        Ok(Ok(None)) => (StatusCode::NOT_FOUND, "404 Not Found").into_response(),
        Ok(Err(err)) => {
            tracing::error!("Failed to render {}: {:#}", uri.path(), err);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", err)).into_response()
        }
        Err(err) => {
            tracing::error!("Render task panicked: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Render the index page at `url`, `None` if there is none
fn render_url(state: &AppState, url: &str) -> Result<Option<String>> {
    let url = url.strip_suffix("index.html").unwrap_or(url);
    let pad = state.project.load_pad()?;

    let Some(node) = state.project.resolve_url(&pad, url, PRIMARY_ALT)? else {
        return Ok(None);
    };

    let program = IndexBuildProgram::new(node);
    if program.produce_artifacts(&pad)?.is_empty() {
        return Ok(None);
    }
    Ok(Some(program.build_artifact(&pad, &*state.renderer)?))
}
