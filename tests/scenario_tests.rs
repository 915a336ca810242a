use chrono::{TimeZone, Utc};
use tst_tracker::clock::Clock;
use tst_tracker::issues::GridRow;
use tst_tracker::metrics::{Metrics, Selection};
use tst_tracker::models::{Category, NewIssue, Severity, UNRESOLVED};
use tst_tracker::prelude::*;

const SECRET: &str = "scenario-secret-0123";

fn tracker() -> Tracker {
    let config = TrackerConfig::default().with_session_secret(SECRET);
    let store = MemoryStore::new("evidence").with_user("qa", "secret", Some("Quinn Avery"));
    let clock = Clock::frozen(7, Utc.with_ymd_and_hms(2024, 4, 1, 2, 15, 0).unwrap()).unwrap();
    Tracker::in_memory(store, &config).unwrap().with_clock(clock)
}

fn draft(description: &str, severity: Severity) -> NewIssue {
    NewIssue {
        description: description.to_string(),
        remarks: String::new(),
        severity,
        category: Category::Frontend,
    }
}

#[tokio::test]
async fn test_report_then_resolve_walkthrough() {
    let tracker = tracker();
    let signed_in = tracker.auth().login("qa", "secret").await.unwrap();
    let user = signed_in.user.clone();

    // The marker restores the same user.
    let restored = tracker.auth().restore(&signed_in.marker).await.unwrap();
    assert_eq!(restored.user.username, "qa");

    tracker.projects().create("Alpha").await.unwrap();
    let snapshot = tracker.snapshot().await.unwrap();
    let issue = tracker
        .issues()
        .create(&user, "Alpha", draft("Login button misaligned", Severity::High), None, &snapshot)
        .await
        .unwrap();
    assert_eq!(issue.category.as_str(), "Frontend (UI/UX)");
    assert_eq!(issue.time_found, "01/04 09:15");

    let alpha = Selection::Project("Alpha".to_string());
    let before = tracker.snapshot().await.unwrap().metrics(&alpha);
    assert_eq!(
        before,
        Metrics {
            total: 1,
            pending: 1,
            resolved: 0,
            high_severity_open: 1
        }
    );

    let snapshot = tracker.snapshot().await.unwrap();
    let mut row = GridRow::from_issue(&snapshot.issues[0]);
    row.status = true;
    tracker
        .issues()
        .apply_grid(&user, &snapshot.issues, &[row])
        .await
        .unwrap();

    let after_snapshot = tracker.snapshot().await.unwrap();
    let after = after_snapshot.metrics(&alpha);
    assert_eq!(after.resolved, before.resolved + 1);
    assert_eq!(after.pending, before.pending - 1);
    assert_eq!(after.high_severity_open, before.high_severity_open - 1);

    let resolved = &after_snapshot.issues[0];
    assert_ne!(resolved.time_resolved, UNRESOLVED);
    assert_eq!(resolved.resolved_by.as_deref(), Some("qa"));
}

#[tokio::test]
async fn test_project_delete_leaves_other_projects() {
    let tracker = tracker();
    let user = tracker.auth().login("qa", "secret").await.unwrap().user;
    tracker.projects().create("Alpha").await.unwrap();
    tracker.projects().create("Beta").await.unwrap();

    for (project, description) in [("Alpha", "a1"), ("Beta", "b1"), ("Alpha", "a2")] {
        let snapshot = tracker.snapshot().await.unwrap();
        tracker
            .issues()
            .create(&user, project, draft(description, Severity::Low), None, &snapshot)
            .await
            .unwrap();
    }

    tracker.projects().delete("Alpha").await.unwrap();

    let snapshot = tracker.snapshot().await.unwrap();
    assert!(!snapshot.has_project("Alpha"));
    assert!(snapshot.has_project("Beta"));
    assert_eq!(snapshot.issues.len(), 1);
    assert_eq!(snapshot.issues[0].description, "b1");
}

#[tokio::test]
async fn test_comments_extend_thread_by_one() {
    let tracker = tracker();
    let user = tracker.auth().login("qa", "secret").await.unwrap().user;
    tracker.projects().create("Alpha").await.unwrap();
    let snapshot = tracker.snapshot().await.unwrap();
    let issue = tracker
        .issues()
        .create(&user, "Alpha", draft("Crash on save", Severity::Critical), None, &snapshot)
        .await
        .unwrap();

    for (n, text) in ["First look", "Reproduced on staging"].iter().enumerate() {
        tracker.detail().add_comment(&user, &issue.id, text).await.unwrap();
        let thread = tracker.detail().issue(&issue.id).await.unwrap().comments;
        assert_eq!(thread.len(), n + 1);
        assert_eq!(thread[n].user, "qa");
        assert_eq!(thread[n].msg, *text);
    }
}

#[tokio::test]
async fn test_empty_description_writes_nothing() {
    let tracker = tracker();
    let user = tracker.auth().login("qa", "secret").await.unwrap().user;
    tracker.projects().create("Alpha").await.unwrap();
    let snapshot = tracker.snapshot().await.unwrap();

    let result = tracker
        .issues()
        .create(&user, "Alpha", draft("", Severity::High), None, &snapshot)
        .await;

    assert!(matches!(result, Err(Error::Validation(_))));
    assert!(tracker.snapshot().await.unwrap().issues.is_empty());
}

#[tokio::test]
async fn test_bulk_edit_applies_delete_and_edit_together() {
    let tracker = tracker();
    let user = tracker.auth().login("qa", "secret").await.unwrap().user;
    tracker.projects().create("Alpha").await.unwrap();
    for description in ["first", "second", "third"] {
        let snapshot = tracker.snapshot().await.unwrap();
        tracker
            .issues()
            .create(&user, "Alpha", draft(description, Severity::Medium), None, &snapshot)
            .await
            .unwrap();
    }

    let snapshot = tracker.snapshot().await.unwrap();
    let mut rows: Vec<GridRow> = snapshot.issues.iter().map(GridRow::from_issue).collect();
    rows[0].delete = true;
    rows[1].remarks = "Only on Firefox".to_string();
    rows[2].severity = Severity::Critical;

    let outcome = tracker
        .issues()
        .apply_grid(&user, &snapshot.issues, &rows)
        .await
        .unwrap();
    assert_eq!(outcome.deleted, 1);
    assert_eq!(outcome.updated, 2);

    let issues = tracker.snapshot().await.unwrap().issues;
    assert_eq!(issues.len(), 2);
    assert_eq!(issues[0].remarks, "Only on Firefox");
    assert_eq!(issues[1].severity, Severity::Critical);
    assert!(issues.iter().all(|i| i.time_resolved == UNRESOLVED));
}

#[tokio::test]
async fn test_export_follows_selection() {
    let tracker = tracker();
    let user = tracker.auth().login("qa", "secret").await.unwrap().user;
    tracker.projects().create("Alpha").await.unwrap();
    let snapshot = tracker.snapshot().await.unwrap();
    tracker
        .issues()
        .create(&user, "Alpha", draft("Login button misaligned", Severity::High), None, &snapshot)
        .await
        .unwrap();

    let issues = tracker.snapshot().await.unwrap().issues;
    let file = tst_tracker::export::export(
        &Selection::Project("Alpha".to_string()),
        &issues,
        tst_tracker::export::ExportFormat::Xlsx,
    )
    .unwrap();
    assert_eq!(file.file_name, "TST_Alpha.xlsx");
    assert!(!file.body.is_empty());
}
