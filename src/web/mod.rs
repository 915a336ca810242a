//! HTML dashboard served over axum

mod forms;
mod handlers;
mod views;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tera::{Context, Tera};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::error::{Error, Result};
use crate::notify::Notifications;
use crate::Tracker;

/// Screenshots are the largest bodies the dashboard accepts
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

const TEMPLATES: [(&str, &str); 4] = [
    ("base.html", include_str!("../../templates/base.html")),
    ("login.html", include_str!("../../templates/login.html")),
    ("dashboard.html", include_str!("../../templates/dashboard.html")),
    ("detail.html", include_str!("../../templates/detail.html")),
];

/// State shared by every handler
pub struct AppState {
    pub tracker: Tracker,
    pub notifications: Notifications,
    templates: Tera,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(tracker: Tracker) -> Result<Self> {
        let mut templates = Tera::default();
        templates.add_raw_templates(TEMPLATES)?;
        Ok(Self {
            tracker,
            notifications: Notifications::new(),
            templates,
        })
    }

    fn render(&self, name: &str, ctx: &Context) -> Result<Html<String>> {
        Ok(Html(self.templates.render(name, ctx)?))
    }
}

/// Error page for failures that cannot be shown as a toast
pub struct PageError(Error);

impl<E: Into<Error>> From<E> for PageError {
    fn from(err: E) -> Self {
        PageError(err.into())
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Auth(_) => StatusCode::UNAUTHORIZED,
            Error::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = if self.0.is_user_facing() {
            self.0.to_string()
        } else {
            error!(error = %self.0, "request failed");
            "Something went wrong talking to the backend. Please reload.".to_string()
        };
        let body = format!(
            "<!doctype html><title>TST</title><p>{}</p><p><a href=\"/\">Back</a></p>",
            tera::escape_html(&message)
        );
        (status, Html(body)).into_response()
    }
}

/// Build the dashboard router
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route("/projects", post(handlers::create_project))
        .route("/projects/delete", post(handlers::delete_project))
        .route("/issues", post(handlers::create_issue))
        .route("/issues/grid", post(handlers::update_grid))
        .route("/issues/{id}", get(handlers::show_issue))
        .route("/issues/{id}/comments", post(handlers::add_comment))
        .route("/issues/{id}/status", post(handlers::set_status))
        .route("/issues/{id}/evidence", post(handlers::attach_evidence))
        .route("/export.xlsx", get(handlers::export_xlsx))
        .route("/export.csv", get(handlers::export_csv))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the dashboard on `bind_addr` until Ctrl+C
pub async fn serve(tracker: Tracker, bind_addr: &str) -> anyhow::Result<()> {
    use anyhow::Context as _;

    let state = Arc::new(AppState::new(tracker)?);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "TST dashboard listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for Ctrl+C");
    }
}
