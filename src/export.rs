//! Spreadsheet downloads of one project's issues

use rust_xlsxwriter::{Format, Workbook};

use crate::error::{Error, Result};
use crate::metrics::Selection;
use crate::models::Issue;

/// Excel's limit on worksheet name length
const SHEET_NAME_MAX: usize = 31;

const FALLBACK_SHEET: &str = "Issues";

pub const COLUMNS: [&str; 13] = [
    "id",
    "project",
    "description",
    "remarks",
    "severity",
    "category",
    "status",
    "time_found",
    "time_resolved",
    "resolved_by",
    "reporter",
    "evidence",
    "comments",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Csv => "text/csv; charset=utf-8",
        }
    }
}

/// A rendered download
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

/// Worksheet name Excel will accept
pub fn clean_sheet_name(project: &str) -> String {
    let cleaned: String = project
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(SHEET_NAME_MAX)
        .collect();
    // Excel rejects names that start or end with an apostrophe
    let cleaned = cleaned.trim().trim_matches('\'').trim();
    if cleaned.is_empty() {
        FALLBACK_SHEET.to_string()
    } else {
        cleaned.to_string()
    }
}

pub fn file_name(project: &str, format: ExportFormat) -> String {
    format!("TST_{}.{}", project, format.extension())
}

fn cells(issue: &Issue) -> Result<[String; 12]> {
    Ok([
        issue.id.clone(),
        issue.project.clone(),
        issue.description.clone(),
        issue.remarks.clone(),
        issue.severity.to_string(),
        issue.category.to_string(),
        issue.time_found.clone(),
        issue.time_resolved.clone(),
        issue.resolved_by.clone().unwrap_or_default(),
        issue.reporter.clone(),
        issue.evidence.clone().unwrap_or_default(),
        serde_json::to_string(&issue.comments)?,
    ])
}

pub fn to_xlsx(project: &str, issues: &[&Issue]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(clean_sheet_name(project))?;

    for (col, title) in COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, &header)?;
    }

    for (index, issue) in issues.iter().enumerate() {
        let row = index as u32 + 1;
        let [id, project, description, remarks, severity, category, time_found, time_resolved, resolved_by, reporter, evidence, comments] =
            cells(issue)?;
        sheet.write_string(row, 0, id)?;
        sheet.write_string(row, 1, project)?;
        sheet.write_string(row, 2, description)?;
        sheet.write_string(row, 3, remarks)?;
        sheet.write_string(row, 4, severity)?;
        sheet.write_string(row, 5, category)?;
        sheet.write_boolean(row, 6, issue.status)?;
        sheet.write_string(row, 7, time_found)?;
        sheet.write_string(row, 8, time_resolved)?;
        sheet.write_string(row, 9, resolved_by)?;
        sheet.write_string(row, 10, reporter)?;
        sheet.write_string(row, 11, evidence)?;
        sheet.write_string(row, 12, comments)?;
    }

    Ok(workbook.save_to_buffer()?)
}

pub fn to_csv(issues: &[&Issue]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(COLUMNS)?;

    for issue in issues {
        let [id, project, description, remarks, severity, category, time_found, time_resolved, resolved_by, reporter, evidence, comments] =
            cells(issue)?;
        let status = issue.status.to_string();
        writer.write_record([
            &id,
            &project,
            &description,
            &remarks,
            &severity,
            &category,
            &status,
            &time_found,
            &time_resolved,
            &resolved_by,
            &reporter,
            &evidence,
            &comments,
        ])?;
    }

    writer.into_inner().map_err(Error::export)
}

/// Export the issues of the selected project. The aggregate view has no export.
pub fn export(selection: &Selection, issues: &[Issue], format: ExportFormat) -> Result<ExportFile> {
    let project = selection
        .project()
        .ok_or_else(|| Error::validation("Select a project to export"))?;
    let rows = selection.filter(issues);

    let body = match format {
        ExportFormat::Xlsx => to_xlsx(project, &rows)?,
        ExportFormat::Csv => to_csv(&rows)?,
    };

    Ok(ExportFile {
        file_name: file_name(project, format),
        content_type: format.content_type(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Comment;
    use serde_json::json;

    fn issues() -> Vec<Issue> {
        let mut first: Issue = serde_json::from_value(json!({
            "id": "#T-001",
            "project": "Alpha",
            "description": "Login button misaligned",
            "severity": "High",
            "reporter": "qa"
        }))
        .unwrap();
        first.comments.push(Comment {
            user: "dev".to_string(),
            msg: "On it, \"today\"".to_string(),
            time: "01/05 11:00".to_string(),
        });
        let second: Issue = serde_json::from_value(json!({
            "id": "#T-002", "project": "Beta", "description": "Slow query"
        }))
        .unwrap();
        vec![first, second]
    }

    #[test]
    fn test_clean_sheet_name() {
        assert_eq!(clean_sheet_name("Alpha"), "Alpha");
        assert_eq!(clean_sheet_name("Q1/Q2 [web]: *?"), "Q1Q2 web");
        assert_eq!(clean_sheet_name("[]:*?/\\"), "Issues");
        assert_eq!(clean_sheet_name(&"x".repeat(40)).len(), 31);
        assert_eq!(clean_sheet_name("'Beta'"), "Beta");
        assert_eq!(clean_sheet_name("  ' Q3 's  "), "Q3 's");
        assert_eq!(clean_sheet_name("'''"), "Issues");
    }

    #[test]
    fn test_xlsx_accepts_quoted_project_names() {
        let file = export(
            &Selection::Project("'Beta'".to_string()),
            &[],
            ExportFormat::Xlsx,
        )
        .unwrap();
        assert_eq!(file.file_name, "TST_'Beta'.xlsx");
        assert!(!file.body.is_empty());
    }

    #[test]
    fn test_file_names() {
        assert_eq!(file_name("Alpha", ExportFormat::Xlsx), "TST_Alpha.xlsx");
        assert_eq!(file_name("Alpha", ExportFormat::Csv), "TST_Alpha.csv");
    }

    #[test]
    fn test_csv_contains_only_selected_project() {
        let file = export(
            &Selection::Project("Alpha".to_string()),
            &issues(),
            ExportFormat::Csv,
        )
        .unwrap();
        let text = String::from_utf8(file.body).unwrap();
        let mut lines = text.lines();

        assert_eq!(lines.next().unwrap(), COLUMNS.join(","));
        let row = lines.next().unwrap();
        assert!(row.starts_with("#T-001,Alpha,Login button misaligned,"));
        assert!(row.contains("High"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_csv_comments_as_json() {
        let rows = issues();
        let body = to_csv(&[&rows[0]]).unwrap();
        let mut reader = csv::Reader::from_reader(body.as_slice());
        let record = reader.records().next().unwrap().unwrap();
        let comments: Vec<Comment> = serde_json::from_str(&record[12]).unwrap();
        assert_eq!(comments, rows[0].comments);
        assert_eq!(&record[6], "false");
    }

    #[test]
    fn test_xlsx_is_a_zip() {
        let file = export(
            &Selection::Project("Alpha".to_string()),
            &issues(),
            ExportFormat::Xlsx,
        )
        .unwrap();
        assert_eq!(file.file_name, "TST_Alpha.xlsx");
        assert_eq!(&file.body[..2], b"PK");
    }

    #[test]
    fn test_aggregate_view_has_no_export() {
        assert!(matches!(
            export(&Selection::All, &issues(), ExportFormat::Csv),
            Err(Error::Validation(_))
        ));
    }
}
