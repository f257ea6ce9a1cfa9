//! HTML view of the subscribed feeds.
//!
//! Every request loads its own copy of the saved state, fetches the feeds
//! and renders them.  Nothing is written back; the batch run owns the state
//! file.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use handlebars::Handlebars;
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::{Config, HttpConfig};
use crate::error::{StoreError, TransportError};
use crate::present::FeedView;
use crate::source::ReqwestClient;
use crate::store;
use crate::sync;

const INDEX_TEMPLATE_NAME: &str = "index";

const INDEX_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>RSS Feeds</title>
</head>
<body>
  <h1>RSS Feeds</h1>
  {{#each feeds}}
  <h2><a href="{{link}}">{{title}}</a></h2>
  <p>{{description}}</p>
  <ul>
    {{#each items}}
    <li class="{{status}}">
      <h3><a href="{{link}}">{{title}}</a></h3>
      <p>{{description}}</p>
      <p>Published: {{pub_date}}</p>
      <p>Status: {{status}}</p>
      {{#if has_media}}
      <img src="{{media_url}}" alt="Media">
      {{/if}}
    </li>
    {{/each}}
  </ul>
  {{else}}
  <p>No feeds to show.</p>
  {{/each}}
</body>
</html>
"#;

/// Failures that prevent a page from being produced at all.
#[derive(Error, Debug)]
pub enum PageError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Client(#[from] TransportError),

    #[error("template error: {0}")]
    Render(#[from] handlebars::RenderError),
}

#[derive(Serialize)]
struct Page<'a> {
    feeds: &'a [FeedView],
}

/// Compiled templates.
pub struct Pages {
    registry: Handlebars<'static>,
}

impl Pages {
    pub fn new() -> Result<Self, handlebars::TemplateError> {
        let mut registry = Handlebars::new();
        registry.register_template_string(INDEX_TEMPLATE_NAME, INDEX_TEMPLATE)?;
        Ok(Self { registry })
    }

    /// Render the index page. HTML in feed content is escaped.
    pub fn render_index(&self, feeds: &[FeedView]) -> Result<String, handlebars::RenderError> {
        self.registry.render(INDEX_TEMPLATE_NAME, &Page { feeds })
    }
}

/// What each request needs. Shared read-only between requests.
pub struct ServeContext {
    state_path: PathBuf,
    http: HttpConfig,
    pages: Pages,
}

impl ServeContext {
    pub fn new(config: &Config, pages: Pages) -> Self {
        Self {
            state_path: config.store.path.clone(),
            http: config.http.clone(),
            pages,
        }
    }

    /// Load a snapshot of the state, fetch every feed and render the page.
    ///
    /// Blocking; call from `spawn_blocking`.
    pub fn render(&self) -> Result<String, PageError> {
        let state = store::load_or_default(&self.state_path)?;
        let client = ReqwestClient::new(&self.http)?;
        let feeds = sync::snapshot(&state, &client);
        Ok(self.pages.render_index(&feeds)?)
    }
}

async fn index(State(ctx): State<Arc<ServeContext>>) -> Response {
    match tokio::task::spawn_blocking(move || ctx.render()).await {
        Ok(Ok(html)) => Html(html).into_response(),
        Ok(Err(e)) => {
            error!("failed to render feeds: {e}");
            internal_error()
        }
        Err(e) => {
            error!("render task failed: {e}");
            internal_error()
        }
    }
}

fn internal_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "Error loading feeds").into_response()
}

pub fn router(ctx: Arc<ServeContext>, download_dir: PathBuf) -> Router {
    Router::new()
        .route("/", get(index))
        .nest_service("/downloads", ServeDir::new(download_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// Serve the HTML view until the process is stopped.
pub async fn serve(config: &Config) -> anyhow::Result<()> {
    let pages = Pages::new()?;
    let ctx = Arc::new(ServeContext::new(config, pages));
    let app = router(ctx, config.media.download_dir.clone());

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr).await?;
    info!("Server is running on http://{addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
