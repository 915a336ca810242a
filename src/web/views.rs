//! Page contexts handed to the templates

use serde::Serialize;
use tera::Context;

use crate::auth::SignedIn;
use crate::fetch::Snapshot;
use crate::metrics::{Selection, ALL_PROJECTS};
use crate::models::{Category, Issue, Severity};
use crate::notify::Toast;

/// `path` with the session marker and optional project in the query string
pub fn href(path: &str, session: &str, project: Option<&str>) -> String {
    let mut url = format!("{}?session={}", path, urlencoding::encode(session));
    if let Some(project) = project {
        url.push_str("&project=");
        url.push_str(&urlencoding::encode(project));
    }
    url
}

/// Route of an issue; ids contain `#` and must be escaped
pub fn issue_path(id: &str) -> String {
    format!("/issues/{}", urlencoding::encode(id))
}

/// Selection requested in the query, falling back to the aggregate view for
/// projects that no longer exist
pub fn selection(snapshot: &Snapshot, requested: Option<&str>) -> Selection {
    match Selection::parse(requested) {
        Selection::Project(name) if snapshot.has_project(&name) => Selection::Project(name),
        _ => Selection::All,
    }
}

#[derive(Serialize)]
struct ProjectLink<'a> {
    name: &'a str,
    href: String,
    selected: bool,
}

#[derive(Serialize)]
struct IssueRow<'a> {
    index: usize,
    issue: &'a Issue,
    href: String,
}

fn option_lists(ctx: &mut Context) {
    let severities: Vec<&str> = Severity::ALL.iter().map(Severity::as_str).collect();
    let categories: Vec<&str> = Category::ALL.iter().map(Category::as_str).collect();
    ctx.insert("severities", &severities);
    ctx.insert("categories", &categories);
}

pub fn login(error: Option<&str>) -> Context {
    let mut ctx = Context::new();
    ctx.insert("title", "Sign in");
    ctx.insert("error", &error);
    ctx
}

pub fn dashboard(
    signed_in: &SignedIn,
    snapshot: &Snapshot,
    selection: &Selection,
    toasts: &[Toast],
) -> Context {
    let session = signed_in.marker.as_str();
    let project = selection.project();

    let mut projects = vec![ProjectLink {
        name: ALL_PROJECTS,
        href: href("/", session, None),
        selected: project.is_none(),
    }];
    projects.extend(snapshot.project_names().into_iter().map(|name| ProjectLink {
        name,
        href: href("/", session, Some(name)),
        selected: project == Some(name),
    }));

    let rows: Vec<IssueRow> = snapshot
        .issues_for(selection)
        .into_iter()
        .enumerate()
        .map(|(index, issue)| IssueRow {
            index,
            issue,
            href: href(&issue_path(&issue.id), session, None),
        })
        .collect();

    let mut ctx = Context::new();
    ctx.insert("title", project.unwrap_or(ALL_PROJECTS));
    ctx.insert("display_name", signed_in.user.display_name());
    ctx.insert("project", &project);
    ctx.insert("projects", &projects);
    ctx.insert("metrics", &snapshot.metrics(selection));
    ctx.insert("rows", &rows);
    ctx.insert("toasts", toasts);
    ctx.insert("logout_action", "/logout");
    ctx.insert("create_project_action", &href("/projects", session, None));
    ctx.insert("delete_project_action", &href("/projects/delete", session, None));
    if let Some(project) = project {
        ctx.insert("create_issue_action", &href("/issues", session, Some(project)));
        ctx.insert("xlsx_href", &href("/export.xlsx", session, Some(project)));
        ctx.insert("csv_href", &href("/export.csv", session, Some(project)));
    }
    ctx.insert("grid_action", &href("/issues/grid", session, project));
    option_lists(&mut ctx);
    ctx
}

pub fn detail(signed_in: &SignedIn, issue: &Issue, toasts: &[Toast]) -> Context {
    let session = signed_in.marker.as_str();
    let path = issue_path(&issue.id);

    let mut ctx = Context::new();
    ctx.insert("title", &issue.id);
    ctx.insert("display_name", signed_in.user.display_name());
    ctx.insert("issue", issue);
    ctx.insert("toasts", toasts);
    ctx.insert("back_href", &href("/", session, Some(&issue.project)));
    ctx.insert(
        "comment_action",
        &href(&format!("{}/comments", path), session, None),
    );
    ctx.insert(
        "status_action",
        &href(&format!("{}/status", path), session, None),
    );
    ctx.insert(
        "evidence_action",
        &href(&format!("{}/evidence", path), session, None),
    );
    ctx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Project;

    #[test]
    fn test_links_escape_ids_and_projects() {
        assert_eq!(issue_path("#T-001"), "/issues/%23T-001");
        assert_eq!(
            href("/", "a.b.c", Some("Web App")),
            "/?session=a.b.c&project=Web%20App"
        );
    }

    #[test]
    fn test_unknown_project_falls_back_to_all() {
        let snapshot = Snapshot {
            projects: vec![Project {
                name: "Alpha".to_string(),
            }],
            issues: Vec::new(),
        };
        assert_eq!(
            selection(&snapshot, Some("Alpha")),
            Selection::Project("Alpha".to_string())
        );
        assert_eq!(selection(&snapshot, Some("Gone")), Selection::All);
        assert_eq!(selection(&snapshot, None), Selection::All);
    }
}
