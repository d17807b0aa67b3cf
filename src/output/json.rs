//! The structured document consumed by the dashboard.
//!
//! Field names are the filter keys the dashboard reads (`employee_name`,
//! `month`, `district`), so they stay stable across releases.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::analyzers::types::*;
use crate::config::DateRange;
use crate::error::ExportError;
use crate::records::{Period, Visit};

#[derive(Debug, Serialize)]
pub struct Meta {
    pub generated_at: DateTime<Utc>,
    pub start_date: String,
    pub end_date: String,
    pub date_field: &'static str,
}

/// A normalized visit, flattened for client-side filtering. The employee
/// name and role are the ones the employee tables use.
#[derive(Debug, Serialize)]
pub struct VisitEntry<'a> {
    pub id: &'a str,
    pub visit_date: Option<NaiveDate>,
    pub month: Option<Period>,
    pub month_name: Option<String>,
    pub year: Option<i32>,
    pub district: &'a str,
    pub state: &'a str,
    pub revenue: Decimal,
    pub employee_id: Option<&'a str>,
    pub employee_name: Option<&'a str>,
    pub employee_role: &'a str,
    pub owner_id: Option<&'a str>,
    pub payment_received: bool,
    pub sample_collected: bool,
    pub report_sent: bool,
}

impl<'a> VisitEntry<'a> {
    pub fn new(v: &'a Visit, employees: &'a BTreeMap<String, EmployeeLabel>) -> Self {
        let employee_id = v.attribution.employee_id();
        let label = employee_id.and_then(|id| employees.get(id));
        Self {
            id: &v.id,
            visit_date: v.date,
            month: v.period,
            month_name: v.period.map(|p| p.name()),
            year: v.year(),
            district: &v.district,
            state: &v.state,
            revenue: v.revenue,
            employee_id,
            employee_name: label.map(|l| l.name.as_str()),
            employee_role: label.map_or(v.attribution.role(), |l| l.role.as_str()),
            owner_id: v.owner_id.as_deref(),
            payment_received: v.payment_received,
            sample_collected: v.sample_collected,
            report_sent: v.report_sent,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Document<'a> {
    pub meta: Meta,
    pub summary: &'a Summary,
    pub visits: Vec<VisitEntry<'a>>,
    pub unattributed_visits: &'a [String],
    pub employee_totals: &'a [EmployeeTotalsRow],
    pub employee_monthly: &'a [EmployeeMonthlyRow],
    pub district_analysis: &'a [DistrictRow],
    pub employee_test_totals: &'a [EmployeeTestTotalsRow],
    pub employee_test_detail: &'a [EmployeeTestDetailRow],
    pub district_test_volume: &'a [DistrictTestVolumeRow],
    pub district_test_monthly: &'a [DistrictTestMonthlyRow],
    pub district_test_yearly: &'a [DistrictTestYearlyRow],
    pub district_test_detail: &'a [DistrictTestDetailRow],
    pub monthly_analysis: &'a [MonthlyRow],
    pub yearly_analysis: &'a [YearlyRow],
    pub test_analysis: &'a [TestAnalysisRow],
    pub test_monthly_analysis: &'a [TestMonthlyRow],
    pub species_analysis: &'a [SpeciesRow],
    pub species_trends: &'a [SpeciesMonthlyRow],
}

impl<'a> Document<'a> {
    pub fn new(visits: &'a [Visit], report: &'a Report, range: &DateRange, generated_at: DateTime<Utc>) -> Self {
        Self {
            meta: Meta {
                generated_at,
                start_date: range.describe_start(),
                end_date: range.describe_end(),
                date_field: "visit_date",
            },
            summary: &report.summary,
            visits: visits
                .iter()
                .map(|v| VisitEntry::new(v, &report.employees))
                .collect(),
            unattributed_visits: &report.unattributed_visits,
            employee_totals: &report.employee_totals,
            employee_monthly: &report.employee_monthly,
            district_analysis: &report.district_analysis,
            employee_test_totals: &report.employee_test_totals,
            employee_test_detail: &report.employee_test_detail,
            district_test_volume: &report.district_test_volume,
            district_test_monthly: &report.district_test_monthly,
            district_test_yearly: &report.district_test_yearly,
            district_test_detail: &report.district_test_detail,
            monthly_analysis: &report.monthly_analysis,
            yearly_analysis: &report.yearly_analysis,
            test_analysis: &report.test_analysis,
            test_monthly_analysis: &report.test_monthly_analysis,
            species_analysis: &report.species_analysis,
            species_trends: &report.species_trends,
        }
    }
}

pub fn write_document(path: &Path, document: &Document<'_>) -> Result<(), ExportError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, document)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::aggregate::aggregate;
    use crate::attribution::Attribution;
    use rust_decimal_macros::dec;
    use serde_json::Value;

    fn visits() -> Vec<Visit> {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9);
        vec![
            Visit {
                id: "v1".into(),
                date,
                period: date.map(Period::of),
                district: "Thiruvananthapuram".into(),
                state: "Kerala".into(),
                revenue: dec!(1234.56),
                attribution: Attribution::LabAssistant("E7".into()),
                employee_name: Some("Lab Person".into()),
                directory_role: None,
                owner_id: Some("o1".into()),
                payment_received: true,
                sample_collected: true,
                report_sent: false,
            },
            Visit {
                id: "v2".into(),
                date: None,
                period: None,
                district: "Unknown".into(),
                state: "Kerala".into(),
                revenue: dec!(0.10),
                attribution: Attribution::Unattributed,
                employee_name: None,
                directory_role: None,
                owner_id: None,
                payment_received: false,
                sample_collected: false,
                report_sent: false,
            },
        ]
    }

    fn render(range: DateRange) -> Value {
        let visits = visits();
        let report = aggregate(&visits, &[], &[]);
        let doc = Document::new(&visits, &report, &range, Utc::now());
        serde_json::to_value(&doc).unwrap()
    }

    #[test]
    fn test_document_sections() {
        let json = render(DateRange::all());
        for key in [
            "meta",
            "summary",
            "visits",
            "unattributed_visits",
            "employee_totals",
            "district_analysis",
            "district_test_volume",
            "test_monthly_analysis",
            "species_analysis",
            "species_trends",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["meta"]["start_date"], "ALL");
        assert_eq!(json["meta"]["date_field"], "visit_date");
        assert_eq!(json["unattributed_visits"], serde_json::json!(["v2"]));
    }

    #[test]
    fn test_visit_entries_carry_filter_fields() {
        let json = render(DateRange::all());
        let v = &json["visits"][0];
        assert_eq!(v["month"], "2024-03");
        assert_eq!(v["month_name"], "March 2024");
        assert_eq!(v["district"], "Thiruvananthapuram");
        assert_eq!(v["employee_name"], "Lab Person");
        assert_eq!(v["employee_role"], "lab_assistant");
        assert_eq!(v["visit_date"], "2024-03-09");

        let undated = &json["visits"][1];
        assert!(undated["month"].is_null());
        assert!(undated["employee_id"].is_null());
    }

    #[test]
    fn test_visit_entries_use_the_table_name() {
        let mut visits = visits();
        let mut second = visits[0].clone();
        second.id = "v3".into();
        second.employee_name = Some("L. Person".into());
        let mut third = visits[0].clone();
        third.id = "v4".into();
        third.employee_name = None;
        visits.extend([second, third]);

        let report = aggregate(&visits, &[], &[]);
        let doc = Document::new(&visits, &report, &DateRange::all(), Utc::now());
        let json = serde_json::to_value(&doc).unwrap();

        assert_eq!(json["employee_totals"][0]["employee_name"], "Lab Person");
        for entry in json["visits"].as_array().unwrap() {
            if entry["employee_id"] == "E7" {
                assert_eq!(entry["employee_name"], "Lab Person", "{}", entry["id"]);
                assert_eq!(entry["employee_role"], "lab_assistant");
            }
        }
    }

    #[test]
    fn test_money_is_serialized_as_exact_strings() {
        let json = render(DateRange::all());
        assert_eq!(json["visits"][0]["revenue"], "1234.56");
        assert_eq!(json["summary"]["total_revenue"], "1234.66");
        assert_eq!(json["employee_totals"][0]["total_revenue"], "1234.56");
    }

    #[test]
    fn test_meta_reports_range() {
        let range = DateRange {
            start: NaiveDate::from_ymd_opt(2024, 1, 1),
            end: NaiveDate::from_ymd_opt(2024, 3, 31),
        };
        let json = render(range);
        assert_eq!(json["meta"]["start_date"], "2024-01-01");
        assert_eq!(json["meta"]["end_date"], "2024-03-31");
    }
}
