use csv::WriterBuilder;
use std::path::Path;
use tracing::debug;

use crate::error::ExportError;
use crate::output::table::TableView;

/// Writes one table as a headed CSV file.
pub fn write_table(path: &Path, view: &TableView) -> Result<(), ExportError> {
    debug!(path = %path.display(), table = view.title, rows = view.rows.len(), "Writing CSV table");

    let mut writer = WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(&view.headers)?;
    for row in &view.rows {
        writer.write_record(row.iter().map(|cell| cell.render()))?;
    }
    writer.flush()?;
    Ok(())
}
