//! Flat, typed views of the report tables shared by the workbook and CSV
//! writers.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::analyzers::types::*;

/// One typed cell. Money stays a `Decimal` until a writer decides how to
/// render it.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Int(i64),
    Money(Decimal),
    /// A rate in percent, e.g. `66.67`.
    Percent(Decimal),
    Empty,
}

impl Cell {
    fn count(n: u64) -> Self {
        i64::try_from(n).map_or_else(|_| Cell::Text(n.to_string()), Cell::Int)
    }

    fn text(s: &str) -> Self {
        Cell::Text(s.to_string())
    }

    fn date(d: Option<NaiveDate>) -> Self {
        d.map_or(Cell::Empty, |d| Cell::Text(d.format("%Y-%m-%d").to_string()))
    }

    fn opt_text(s: Option<&str>) -> Self {
        s.map_or(Cell::Empty, Cell::text)
    }

    /// Plain-text rendering, with money and rates at full precision.
    pub fn render(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Int(n) => n.to_string(),
            Cell::Money(d) | Cell::Percent(d) => d.to_string(),
            Cell::Empty => String::new(),
        }
    }
}

/// A row that can be laid out under a fixed header.
pub trait TableRow {
    const HEADERS: &'static [&'static str];

    fn cells(&self) -> Vec<Cell>;
}

/// A titled table ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    /// Sheet name.
    pub title: &'static str,
    /// CSV file name without extension.
    pub file_stem: &'static str,
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<Cell>>,
}

impl TableView {
    pub fn of<R: TableRow>(title: &'static str, file_stem: &'static str, rows: &[R]) -> Self {
        Self {
            title,
            file_stem,
            headers: R::HEADERS.to_vec(),
            rows: rows.iter().map(TableRow::cells).collect(),
        }
    }
}

/// The top-line totals as a two-column metric/value table.
pub fn summary_view(summary: &Summary) -> TableView {
    let rows = vec![
        ("Total Visits", Cell::count(summary.total_visits)),
        ("Total Tests", Cell::count(summary.total_tests)),
        ("Total Revenue", Cell::Money(summary.total_revenue)),
        ("Unique Employees", Cell::count(summary.unique_employees)),
        ("Unique Districts", Cell::count(summary.unique_districts)),
        ("Unattributed Visits", Cell::count(summary.unattributed_visits)),
        ("Undated Visits", Cell::count(summary.undated_visits)),
        ("Orphan Tests", Cell::count(summary.orphan_tests)),
        ("Animal Cases", Cell::count(summary.animal_cases)),
        ("Orphan Animal Cases", Cell::count(summary.orphan_animal_cases)),
        ("Unique Customers", Cell::count(summary.unique_customers)),
        ("Average Revenue per Case", Cell::Money(summary.avg_revenue_per_case)),
        ("Payment Completion Rate (%)", Cell::Percent(summary.payment_completion_rate)),
        ("Sample Collection Rate (%)", Cell::Percent(summary.sample_collection_rate)),
        ("Report Sent Rate (%)", Cell::Percent(summary.report_sent_rate)),
    ];

    TableView {
        title: "Summary",
        file_stem: "summary",
        headers: vec!["Metric", "Value"],
        rows: rows
            .into_iter()
            .map(|(metric, value)| vec![Cell::text(metric), value])
            .collect(),
    }
}

/// Every aggregate table in export order, summary first.
pub fn views(report: &Report) -> Vec<TableView> {
    vec![
        summary_view(&report.summary),
        TableView::of("Employee Totals", "employee_totals", &report.employee_totals),
        TableView::of("Employee Monthly", "employee_monthly", &report.employee_monthly),
        TableView::of("District Analysis", "district_analysis", &report.district_analysis),
        TableView::of(
            "Employee Test Totals",
            "employee_test_totals",
            &report.employee_test_totals,
        ),
        TableView::of(
            "Employee Test Detail",
            "employee_test_detail",
            &report.employee_test_detail,
        ),
        TableView::of(
            "District Test Volume",
            "district_test_volume",
            &report.district_test_volume_ascending(),
        ),
        TableView::of(
            "District Test Monthly",
            "district_test_monthly",
            &report.district_test_monthly,
        ),
        TableView::of(
            "District Test Yearly",
            "district_test_yearly",
            &report.district_test_yearly,
        ),
        TableView::of(
            "District Test Detail",
            "district_test_detail",
            &report.district_test_detail,
        ),
        TableView::of("Monthly Analysis", "monthly_analysis", &report.monthly_analysis),
        TableView::of("Yearly Analysis", "yearly_analysis", &report.yearly_analysis),
        TableView::of("Test Analysis", "test_analysis", &report.test_analysis),
        TableView::of(
            "Test Monthly Analysis",
            "test_monthly_analysis",
            &report.test_monthly_analysis,
        ),
        TableView::of("Species Analysis", "species_analysis", &report.species_by_cases()),
        TableView::of("Species Trends", "species_trends", &report.species_trends),
    ]
}

impl TableRow for EmployeeTotalsRow {
    const HEADERS: &'static [&'static str] = &[
        "Employee ID",
        "Employee Name",
        "Role",
        "Cases",
        "Total Revenue",
        "Avg Revenue per Case",
        "Tests",
        "Payments Received",
        "Samples Collected",
        "Reports Sent",
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::text(&self.employee_id),
            Cell::text(&self.employee_name),
            Cell::text(&self.employee_role),
            Cell::count(self.case_count),
            Cell::Money(self.total_revenue),
            Cell::Money(self.avg_revenue_per_case),
            Cell::count(self.test_count),
            Cell::count(self.payments_received),
            Cell::count(self.samples_collected),
            Cell::count(self.reports_sent),
        ]
    }
}

impl TableRow for EmployeeMonthlyRow {
    const HEADERS: &'static [&'static str] = &[
        "Employee ID",
        "Employee Name",
        "Month",
        "Month Name",
        "Cases",
        "Total Revenue",
        "Payments Received",
        "Samples Collected",
        "Reports Sent",
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::text(&self.employee_id),
            Cell::text(&self.employee_name),
            Cell::Text(self.month.key()),
            Cell::text(&self.month_name),
            Cell::count(self.case_count),
            Cell::Money(self.total_revenue),
            Cell::count(self.payments_received),
            Cell::count(self.samples_collected),
            Cell::count(self.reports_sent),
        ]
    }
}

impl TableRow for DistrictRow {
    const HEADERS: &'static [&'static str] = &[
        "District",
        "State",
        "Cases",
        "Unique Owners",
        "Total Revenue",
        "Avg Revenue per Visit",
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::text(&self.district),
            Cell::text(&self.state),
            Cell::count(self.case_count),
            Cell::count(self.unique_owners),
            Cell::Money(self.total_revenue),
            Cell::Money(self.avg_revenue_per_visit),
        ]
    }
}

impl TableRow for EmployeeTestTotalsRow {
    const HEADERS: &'static [&'static str] = &[
        "Employee ID",
        "Employee Name",
        "Tests",
        "Test Revenue",
        "Most Common Test Type",
        "Most Common Test Name",
        "Most Common Test Count",
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::text(&self.employee_id),
            Cell::text(&self.employee_name),
            Cell::count(self.test_count),
            Cell::Money(self.test_revenue),
            Cell::opt_text(self.most_common_test_type.as_deref()),
            Cell::opt_text(self.most_common_test_name.as_deref()),
            Cell::count(self.most_common_test_count),
        ]
    }
}

impl TableRow for EmployeeTestDetailRow {
    const HEADERS: &'static [&'static str] = &[
        "Employee ID",
        "Employee Name",
        "Test Type",
        "Test Name",
        "Tests",
        "Test Revenue",
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::text(&self.employee_id),
            Cell::text(&self.employee_name),
            Cell::text(&self.test_type),
            Cell::text(&self.test_name),
            Cell::count(self.test_count),
            Cell::Money(self.test_revenue),
        ]
    }
}

impl TableRow for DistrictTestVolumeRow {
    const HEADERS: &'static [&'static str] = &["District", "Tests", "Test Revenue"];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::text(&self.district),
            Cell::count(self.test_count),
            Cell::Money(self.test_revenue),
        ]
    }
}

impl TableRow for DistrictTestMonthlyRow {
    const HEADERS: &'static [&'static str] = &["District", "Month", "Month Name", "Tests"];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::text(&self.district),
            Cell::Text(self.month.key()),
            Cell::text(&self.month_name),
            Cell::count(self.test_count),
        ]
    }
}

impl TableRow for DistrictTestYearlyRow {
    const HEADERS: &'static [&'static str] = &["District", "Year", "Tests"];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::text(&self.district),
            Cell::Int(i64::from(self.year)),
            Cell::count(self.test_count),
        ]
    }
}

impl TableRow for DistrictTestDetailRow {
    const HEADERS: &'static [&'static str] =
        &["District", "Test Type", "Test Name", "Tests", "Test Revenue"];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::text(&self.district),
            Cell::text(&self.test_type),
            Cell::text(&self.test_name),
            Cell::count(self.test_count),
            Cell::Money(self.test_revenue),
        ]
    }
}

impl TableRow for MonthlyRow {
    const HEADERS: &'static [&'static str] = &[
        "Month",
        "Month Name",
        "Cases",
        "Total Revenue",
        "Avg Revenue",
        "Unique Customers",
        "Payments Received",
        "Samples Collected",
        "Reports Sent",
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.month.key()),
            Cell::text(&self.month_name),
            Cell::count(self.case_count),
            Cell::Money(self.total_revenue),
            Cell::Money(self.avg_revenue),
            Cell::count(self.unique_customers),
            Cell::count(self.payments_received),
            Cell::count(self.samples_collected),
            Cell::count(self.reports_sent),
        ]
    }
}

impl TableRow for YearlyRow {
    const HEADERS: &'static [&'static str] = &[
        "Year",
        "Cases",
        "Total Revenue",
        "Avg Revenue",
        "Unique Customers",
        "Payments Received",
        "Samples Collected",
        "Reports Sent",
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Int(i64::from(self.year)),
            Cell::count(self.case_count),
            Cell::Money(self.total_revenue),
            Cell::Money(self.avg_revenue),
            Cell::count(self.unique_customers),
            Cell::count(self.payments_received),
            Cell::count(self.samples_collected),
            Cell::count(self.reports_sent),
        ]
    }
}

impl TableRow for TestAnalysisRow {
    const HEADERS: &'static [&'static str] = &[
        "Test Type",
        "Test Name",
        "Tests",
        "Total Revenue",
        "Avg Price",
        "First Test Date",
        "Last Test Date",
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::text(&self.test_type),
            Cell::text(&self.test_name),
            Cell::count(self.test_count),
            Cell::Money(self.total_revenue),
            Cell::Money(self.avg_price),
            Cell::date(self.first_test_date),
            Cell::date(self.last_test_date),
        ]
    }
}

impl TableRow for TestMonthlyRow {
    const HEADERS: &'static [&'static str] = &[
        "Month",
        "Month Name",
        "Test Type",
        "Test Name",
        "Tests",
        "Total Revenue",
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.month.key()),
            Cell::text(&self.month_name),
            Cell::text(&self.test_type),
            Cell::text(&self.test_name),
            Cell::count(self.test_count),
            Cell::Money(self.total_revenue),
        ]
    }
}

impl TableRow for SpeciesRow {
    const HEADERS: &'static [&'static str] =
        &["Species", "Cases", "Total Revenue", "Avg Revenue per Case"];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::text(&self.species),
            Cell::count(self.case_count),
            Cell::Money(self.total_revenue),
            Cell::Money(self.avg_revenue_per_case),
        ]
    }
}

impl TableRow for SpeciesMonthlyRow {
    const HEADERS: &'static [&'static str] = &["Species", "Month", "Month Name", "Revenue", "Cases"];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::text(&self.species),
            Cell::Text(self.month.key()),
            Cell::text(&self.month_name),
            Cell::Money(self.total_revenue),
            Cell::count(self.case_count),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn volume(district: &str, tests: u64) -> DistrictTestVolumeRow {
        DistrictTestVolumeRow {
            district: district.to_string(),
            test_count: tests,
            test_revenue: dec!(0),
        }
    }

    #[test]
    fn test_every_row_matches_its_headers() {
        let report = Report {
            district_test_volume: vec![volume("Kollam", 3)],
            ..Default::default()
        };
        for view in views(&report) {
            for row in &view.rows {
                assert_eq!(row.len(), view.headers.len(), "{}", view.title);
            }
        }
    }

    #[test]
    fn test_summary_sheet_comes_first() {
        let titles: Vec<&str> = views(&Report::default()).iter().map(|v| v.title).collect();
        assert_eq!(titles[0], "Summary");
        assert_eq!(titles[1], "Employee Totals");
        assert_eq!(titles.len(), 16);
        assert_eq!(titles[15], "Species Trends");
        assert!(titles.iter().all(|t| t.len() <= 31));
    }

    #[test]
    fn test_district_volume_presented_ascending() {
        let report = Report {
            district_test_volume: vec![volume("Alappuzha", 9), volume("Kollam", 2), volume("Wayanad", 2)],
            ..Default::default()
        };
        let view = views(&report)
            .into_iter()
            .find(|v| v.file_stem == "district_test_volume")
            .unwrap();
        let order: Vec<String> = view.rows.iter().map(|r| r[0].render()).collect();
        assert_eq!(order, vec!["Kollam", "Wayanad", "Alappuzha"]);
    }

    #[test]
    fn test_species_presented_by_cases() {
        let species = |name: &str, cases: u64| SpeciesRow {
            species: name.to_string(),
            case_count: cases,
            total_revenue: dec!(0),
            avg_revenue_per_case: dec!(0),
        };
        let report = Report {
            species_analysis: vec![species("Bovine", 2), species("Canine", 7), species("Feline", 2)],
            ..Default::default()
        };
        let view = views(&report)
            .into_iter()
            .find(|v| v.file_stem == "species_analysis")
            .unwrap();
        let order: Vec<String> = view.rows.iter().map(|r| r[0].render()).collect();
        assert_eq!(order, vec!["Canine", "Bovine", "Feline"]);
    }

    #[test]
    fn test_money_renders_at_full_precision() {
        assert_eq!(Cell::Money(dec!(1234567.891)).render(), "1234567.891");
        assert_eq!(Cell::Empty.render(), "");
    }
}
