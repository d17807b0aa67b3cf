//! Artifact export: the JSON document, the multi-sheet workbook and the
//! optional per-table CSV files.
//!
//! Nothing reaches its final path unless every artifact was produced.

pub mod delimited;
pub mod json;
pub mod staging;
pub mod table;
pub mod workbook;

use chrono::Utc;
use std::path::PathBuf;
use tracing::info;

use crate::analyzers::types::Report;
use crate::config::DateRange;
use crate::error::ExportError;
use crate::records::Visit;
use json::Document;
use staging::Staging;

/// Where a run's artifacts go.
#[derive(Debug, Clone)]
pub struct ExportTargets {
    pub workbook: PathBuf,
    pub json: PathBuf,
    pub csv_dir: Option<PathBuf>,
}

/// Writes every artifact, then publishes them together. Returns the
/// published paths.
#[tracing::instrument(skip_all, fields(workbook = %targets.workbook.display(), json = %targets.json.display()))]
pub fn write_artifacts(
    visits: &[Visit],
    report: &Report,
    range: &DateRange,
    targets: &ExportTargets,
) -> Result<Vec<PathBuf>, ExportError> {
    let views = table::views(report);
    let mut staging = Staging::new();

    let json_path = staging.stage(&targets.json)?;
    json::write_document(&json_path, &Document::new(visits, report, range, Utc::now()))?;

    let workbook_path = staging.stage(&targets.workbook)?;
    workbook::write_workbook(&workbook_path, &views)?;

    if let Some(dir) = &targets.csv_dir {
        for view in &views {
            let path = staging.stage(&dir.join(format!("{}.csv", view.file_stem)))?;
            delimited::write_table(&path, view)?;
        }
    }

    let published = staging.commit()?;
    info!(artifacts = published.len(), "Artifacts published");
    Ok(published)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::aggregate::aggregate;
    use std::env;
    use std::fs;

    fn targets(name: &str) -> ExportTargets {
        let dir = env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&dir);
        ExportTargets {
            workbook: dir.join("report.xlsx"),
            json: dir.join("report.json"),
            csv_dir: Some(dir.join("csv")),
        }
    }

    #[test]
    fn test_write_artifacts_publishes_all() {
        let t = targets("elab_analytics_export_all");
        let report = aggregate(&[], &[], &[]);

        let published = write_artifacts(&[], &report, &DateRange::all(), &t).unwrap();

        // json + workbook + summary and fifteen tables as CSV
        assert_eq!(published.len(), 18);
        assert!(t.workbook.exists());
        assert!(t.json.exists());
        let csv_dir = t.csv_dir.clone().unwrap();
        assert!(csv_dir.join("summary.csv").exists());
        assert!(csv_dir.join("district_test_volume.csv").exists());
        assert!(csv_dir.join("species_trends.csv").exists());

        fs::remove_dir_all(t.json.parent().unwrap()).unwrap();
    }

    #[test]
    fn test_failed_export_leaves_nothing_behind() {
        let mut t = targets("elab_analytics_export_fail");
        let dir = t.json.parent().unwrap().to_path_buf();
        fs::create_dir_all(&dir).unwrap();
        // A file where the CSV directory should go makes the last step fail.
        let blocker = dir.join("csv");
        fs::write(&blocker, "not a directory").unwrap();
        t.csv_dir = Some(blocker);

        let report = aggregate(&[], &[], &[]);
        let err = write_artifacts(&[], &report, &DateRange::all(), &t).unwrap_err();

        assert!(matches!(err, ExportError::Io(_)));
        assert!(!t.json.exists());
        assert!(!t.workbook.exists());
        let names: Vec<String> = fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["csv".to_string()]);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_unpublishable_workbook_keeps_previous_json() {
        let t = targets("elab_analytics_export_rollback");
        let dir = t.json.parent().unwrap().to_path_buf();
        fs::create_dir_all(t.workbook.join("in_the_way")).unwrap();
        fs::write(&t.json, "previous run").unwrap();

        let report = aggregate(&[], &[], &[]);
        let err = write_artifacts(&[], &report, &DateRange::all(), &t).unwrap_err();

        assert!(matches!(err, ExportError::Io(_)));
        assert_eq!(fs::read_to_string(&t.json).unwrap(), "previous run");
        assert!(t.workbook.join("in_the_way").is_dir());
        assert!(!dir.join("csv/summary.csv").exists());

        fs::remove_dir_all(&dir).unwrap();
    }
}
