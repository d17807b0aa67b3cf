use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook, Worksheet};
use std::path::Path;
use tracing::debug;

use crate::error::ExportError;
use crate::output::table::{Cell, TableView};

/// Data rows a worksheet can hold under its header row.
pub const MAX_DATA_ROWS: usize = 1_048_575;

const MAX_COLUMN_WIDTH: usize = 50;

/// Writes one sheet per view, in order, to a single workbook.
pub fn write_workbook(path: &Path, views: &[TableView]) -> Result<(), ExportError> {
    if let Some(view) = views.iter().find(|v| v.rows.len() > MAX_DATA_ROWS) {
        return Err(ExportError::TooManyRows {
            sheet: view.title.to_string(),
            rows: view.rows.len(),
        });
    }

    let header = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(0x4472C4))
        .set_align(FormatAlign::Center);
    let money = Format::new().set_num_format("#,##0.00");
    let percent = Format::new().set_num_format("0.00");

    let mut workbook = Workbook::new();
    for view in views {
        let sheet = workbook.add_worksheet();
        sheet.set_name(view.title)?;

        let mut widths: Vec<usize> = view.headers.iter().map(|h| h.len()).collect();
        for (col, title) in view.headers.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *title, &header)?;
        }

        for (i, row) in view.rows.iter().enumerate() {
            let r = (i + 1) as u32;
            for (col, cell) in row.iter().enumerate() {
                write_cell(sheet, r, col as u16, cell, &money, &percent)?;
                if let Some(w) = widths.get_mut(col) {
                    *w = (*w).max(cell.render().chars().count());
                }
            }
        }

        for (col, width) in widths.iter().enumerate() {
            sheet.set_column_width(col as u16, (width + 2).min(MAX_COLUMN_WIDTH) as f64)?;
        }
        sheet.set_freeze_panes(1, 0)?;

        debug!(sheet = view.title, rows = view.rows.len(), "Sheet written");
    }

    workbook.save(path)?;
    Ok(())
}

fn write_cell(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &Cell,
    money: &Format,
    percent: &Format,
) -> Result<(), ExportError> {
    match cell {
        Cell::Text(s) => {
            sheet.write_string(row, col, s.as_str())?;
        }
        Cell::Int(n) => {
            sheet.write_number(row, col, *n as f64)?;
        }
        Cell::Money(d) => write_decimal(sheet, row, col, *d, money)?,
        Cell::Percent(d) => write_decimal(sheet, row, col, *d, percent)?,
        Cell::Empty => {}
    }
    Ok(())
}

/// Numeric when the value survives conversion to `f64` unchanged; as text
/// otherwise, so no digit is lost.
fn write_decimal(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: Decimal,
    format: &Format,
) -> Result<(), ExportError> {
    match exact_f64(value) {
        Some(f) => sheet.write_number_with_format(row, col, f, format)?,
        None => sheet.write_string(row, col, value.to_string())?,
    };
    Ok(())
}

fn exact_f64(value: Decimal) -> Option<f64> {
    let f = value.to_f64()?;
    Decimal::from_f64(f).filter(|back| *back == value).map(|_| f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::env;
    use std::fs;

    fn view(title: &'static str, rows: usize) -> TableView {
        TableView {
            title,
            file_stem: "t",
            headers: vec!["District", "Total Revenue"],
            rows: (0..rows)
                .map(|i| vec![Cell::Text(format!("D{i}")), Cell::Money(dec!(10.25))])
                .collect(),
        }
    }

    #[test]
    fn test_exact_f64_keeps_cents() {
        assert_eq!(exact_f64(dec!(1500.50)), Some(1500.5));
        assert_eq!(exact_f64(dec!(0.10)), Some(0.1));
        assert_eq!(exact_f64(dec!(12345678901234567890.12)), None);
    }

    #[test]
    fn test_write_workbook_creates_file() {
        let path = env::temp_dir().join("elab_analytics_test_workbook.xlsx");
        let _ = fs::remove_file(&path);

        write_workbook(&path, &[view("Summary", 2), view("District Analysis", 3)]).unwrap();

        let bytes = fs::read(&path).unwrap();
        // xlsx is a zip container.
        assert_eq!(&bytes[..2], b"PK");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_oversized_table_fails_instead_of_truncating() {
        let path = env::temp_dir().join("elab_analytics_test_oversized.xlsx");
        let _ = fs::remove_file(&path);

        let big = TableView {
            title: "Employee Monthly",
            file_stem: "employee_monthly",
            headers: vec!["Employee ID"],
            rows: vec![vec![Cell::Empty]; MAX_DATA_ROWS + 1],
        };
        let err = write_workbook(&path, &[big]).unwrap_err();

        assert!(matches!(err, ExportError::TooManyRows { rows, .. } if rows == MAX_DATA_ROWS + 1));
        assert!(!path.exists());
    }
}
