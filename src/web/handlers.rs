use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use tracing::error;

use super::forms::{self, CommentForm, LoginForm, PageQuery, ProjectForm, StatusForm};
use super::views::{self, href, issue_path};
use super::{PageError, SharedState};
use crate::auth::{Session, SignedIn};
use crate::error::{Error, Result};
use crate::export::{self, ExportFormat};
use crate::metrics::Selection;
use crate::notify::Toast;

type PageResult = std::result::Result<Response, PageError>;

async fn signed_in(state: &SharedState, query: &PageQuery) -> Result<Option<SignedIn>> {
    match state.tracker.auth().session(query.session.as_deref()).await? {
        Session::Authenticated(signed_in) => Ok(Some(signed_in)),
        Session::Anonymous => Ok(None),
    }
}

/// Queue the outcome of a mutation for the next render
fn report<T>(state: &SharedState, who: &SignedIn, outcome: Result<T>, success: impl FnOnce(T) -> String) {
    let toast = match outcome {
        Ok(value) => Toast::success(success(value)),
        Err(e) => {
            if !e.is_user_facing() {
                error!(error = %e, "mutation failed");
            }
            Toast::error(e.to_string())
        }
    };
    state.notifications.push(&who.marker, toast);
}

fn back_to_dashboard(who: &SignedIn, project: Option<&str>) -> Response {
    Redirect::to(&href("/", &who.marker, project)).into_response()
}

fn back_to_issue(who: &SignedIn, id: &str) -> Response {
    Redirect::to(&href(&issue_path(id), &who.marker, None)).into_response()
}

fn to_login() -> Response {
    Redirect::to("/").into_response()
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn index(State(state): State<SharedState>, Query(query): Query<PageQuery>) -> PageResult {
    let Some(who) = signed_in(&state, &query).await? else {
        let expired = query.session.as_deref().is_some_and(|m| !m.is_empty());
        let notice = expired.then_some("Session expired, please sign in again");
        return Ok(state.render("login.html", &views::login(notice))?.into_response());
    };

    let snapshot = state.tracker.snapshot().await?;
    let selection = views::selection(&snapshot, query.project.as_deref());
    let toasts = state.notifications.take(&who.marker);
    let ctx = views::dashboard(&who, &snapshot, &selection, &toasts);
    Ok(state.render("dashboard.html", &ctx)?.into_response())
}

pub async fn login(State(state): State<SharedState>, Form(form): Form<LoginForm>) -> PageResult {
    match state.tracker.auth().login(&form.username, &form.password).await {
        Ok(who) => Ok(back_to_dashboard(&who, None)),
        Err(Error::Auth(message)) => {
            let page = state.render("login.html", &views::login(Some(&message)))?;
            Ok((StatusCode::UNAUTHORIZED, page).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Markers are stateless; signing out just drops it from the URL
pub async fn logout() -> Response {
    to_login()
}

pub async fn create_project(
    State(state): State<SharedState>,
    Query(query): Query<PageQuery>,
    Form(form): Form<ProjectForm>,
) -> PageResult {
    let Some(who) = signed_in(&state, &query).await? else {
        return Ok(to_login());
    };

    let outcome = state.tracker.projects().create(&form.name).await;
    let selected = outcome.as_ref().ok().map(|p| p.name.clone());
    report(&state, &who, outcome, |p| format!("Project {} created", p.name));
    Ok(back_to_dashboard(&who, selected.as_deref()))
}

pub async fn delete_project(
    State(state): State<SharedState>,
    Query(query): Query<PageQuery>,
    Form(form): Form<ProjectForm>,
) -> PageResult {
    let Some(who) = signed_in(&state, &query).await? else {
        return Ok(to_login());
    };

    let outcome = state.tracker.projects().delete(&form.name).await;
    report(&state, &who, outcome, |_| format!("Project {} deleted", form.name));
    Ok(back_to_dashboard(&who, None))
}

pub async fn create_issue(
    State(state): State<SharedState>,
    Query(query): Query<PageQuery>,
    multipart: Multipart,
) -> PageResult {
    let Some(who) = signed_in(&state, &query).await? else {
        return Ok(to_login());
    };
    let project = query.project.as_deref().unwrap_or_default();

    let outcome = async {
        let (draft, upload) = forms::read_issue_form(multipart).await?;
        if draft.description.trim().is_empty() {
            return Err(Error::validation("Description is required"));
        }
        let snapshot = state.tracker.snapshot().await?;

        let evidence = match upload {
            Some(upload) => match state.tracker.evidence().upload(&upload).await {
                Ok(url) => Some(url),
                Err(e) => {
                    state
                        .notifications
                        .push(&who.marker, Toast::error(format!("Upload failed: {}", e)));
                    None
                }
            },
            None => None,
        };

        state
            .tracker
            .issues()
            .create(&who.user, project, draft, evidence, &snapshot)
            .await
    }
    .await;

    report(&state, &who, outcome, |issue| format!("Issue {} created", issue.id));
    Ok(back_to_dashboard(&who, Some(project)))
}

pub async fn update_grid(
    State(state): State<SharedState>,
    Query(query): Query<PageQuery>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> PageResult {
    let Some(who) = signed_in(&state, &query).await? else {
        return Ok(to_login());
    };

    let outcome = async {
        let rows = forms::parse_grid(&pairs)?;
        let snapshot = state.tracker.snapshot().await?;
        state
            .tracker
            .issues()
            .apply_grid(&who.user, &snapshot.issues, &rows)
            .await
    }
    .await;

    match outcome {
        Ok(counts) if counts.is_empty() => state
            .notifications
            .push(&who.marker, Toast::info("No changes")),
        outcome => report(&state, &who, outcome, |counts| {
            format!("Saved! {} updated, {} deleted", counts.updated, counts.deleted)
        }),
    }
    Ok(back_to_dashboard(&who, query.project.as_deref()))
}

pub async fn show_issue(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> PageResult {
    let Some(who) = signed_in(&state, &query).await? else {
        return Ok(to_login());
    };

    let issue = state.tracker.detail().issue(&id).await?;
    let toasts = state.notifications.take(&who.marker);
    let ctx = views::detail(&who, &issue, &toasts);
    Ok(state.render("detail.html", &ctx)?.into_response())
}

pub async fn add_comment(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
    Form(form): Form<CommentForm>,
) -> PageResult {
    let Some(who) = signed_in(&state, &query).await? else {
        return Ok(to_login());
    };

    let outcome = state.tracker.detail().add_comment(&who.user, &id, &form.msg).await;
    report(&state, &who, outcome, |_| "Comment added".to_string());
    Ok(back_to_issue(&who, &id))
}

pub async fn set_status(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
    Form(form): Form<StatusForm>,
) -> PageResult {
    let Some(who) = signed_in(&state, &query).await? else {
        return Ok(to_login());
    };

    let outcome = state.tracker.issues().set_status(&who.user, &id, form.resolved).await;
    report(&state, &who, outcome, |_| {
        if form.resolved {
            format!("{} resolved", id)
        } else {
            format!("{} reopened", id)
        }
    });
    Ok(back_to_issue(&who, &id))
}

pub async fn attach_evidence(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
    mut multipart: Multipart,
) -> PageResult {
    let Some(who) = signed_in(&state, &query).await? else {
        return Ok(to_login());
    };

    let outcome = async {
        let upload = forms::read_upload(&mut multipart)
            .await?
            .ok_or_else(|| Error::validation("Choose a file to upload"))?;
        state.tracker.evidence().attach(&id, &upload).await
    }
    .await;

    report(&state, &who, outcome, |_| "Evidence uploaded".to_string());
    Ok(back_to_issue(&who, &id))
}

pub async fn export_xlsx(State(state): State<SharedState>, Query(query): Query<PageQuery>) -> PageResult {
    download(&state, &query, ExportFormat::Xlsx).await
}

pub async fn export_csv(State(state): State<SharedState>, Query(query): Query<PageQuery>) -> PageResult {
    download(&state, &query, ExportFormat::Csv).await
}

async fn download(state: &SharedState, query: &PageQuery, format: ExportFormat) -> PageResult {
    if signed_in(state, query).await?.is_none() {
        return Ok(to_login());
    }

    let snapshot = state.tracker.snapshot().await?;
    let selection = Selection::parse(query.project.as_deref());
    let file = export::export(&selection, &snapshot.issues, format)?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        file.file_name.replace('"', "")
    );

    Ok((
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.body,
    )
        .into_response())
}
