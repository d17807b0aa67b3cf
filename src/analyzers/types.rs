//! Rows of the aggregate tables and the report that holds them.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::records::Period;

/// Employee → cases, revenue and tests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeTotalsRow {
    pub employee_id: String,
    pub employee_name: String,
    pub employee_role: String,
    pub case_count: u64,
    pub total_revenue: Decimal,
    pub avg_revenue_per_case: Decimal,
    pub test_count: u64,
    pub payments_received: u64,
    pub samples_collected: u64,
    pub reports_sent: u64,
}

/// (employee, month) → cases and revenue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeMonthlyRow {
    pub employee_id: String,
    pub employee_name: String,
    pub month: Period,
    pub month_name: String,
    pub case_count: u64,
    pub total_revenue: Decimal,
    pub payments_received: u64,
    pub samples_collected: u64,
    pub reports_sent: u64,
}

/// District → cases and revenue. `state` is the first one seen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistrictRow {
    pub district: String,
    pub state: String,
    pub case_count: u64,
    pub unique_owners: u64,
    pub total_revenue: Decimal,
    pub avg_revenue_per_visit: Decimal,
}

/// Employee → tests, with the most common test. Ties on count go to the
/// test seen first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeTestTotalsRow {
    pub employee_id: String,
    pub employee_name: String,
    pub test_count: u64,
    pub test_revenue: Decimal,
    pub most_common_test_type: Option<String>,
    pub most_common_test_name: Option<String>,
    pub most_common_test_count: u64,
}

/// (employee, test) → count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeTestDetailRow {
    pub employee_id: String,
    pub employee_name: String,
    pub test_type: String,
    pub test_name: String,
    pub test_count: u64,
    pub test_revenue: Decimal,
}

/// District → tests. Emitted in district order; `test_count` is the
/// ascending presentation key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistrictTestVolumeRow {
    pub district: String,
    pub test_count: u64,
    pub test_revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistrictTestMonthlyRow {
    pub district: String,
    pub month: Period,
    pub month_name: String,
    pub test_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistrictTestYearlyRow {
    pub district: String,
    pub year: i32,
    pub test_count: u64,
}

/// (district, test) → count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistrictTestDetailRow {
    pub district: String,
    pub test_type: String,
    pub test_name: String,
    pub test_count: u64,
    pub test_revenue: Decimal,
}

/// Month → visit measures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyRow {
    pub month: Period,
    pub month_name: String,
    pub case_count: u64,
    pub total_revenue: Decimal,
    pub avg_revenue: Decimal,
    pub unique_customers: u64,
    pub payments_received: u64,
    pub samples_collected: u64,
    pub reports_sent: u64,
}

/// Year → visit measures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyRow {
    pub year: i32,
    pub case_count: u64,
    pub total_revenue: Decimal,
    pub avg_revenue: Decimal,
    pub unique_customers: u64,
    pub payments_received: u64,
    pub samples_collected: u64,
    pub reports_sent: u64,
}

/// Test → count, revenue and the span of service dates it was seen on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestAnalysisRow {
    pub test_type: String,
    pub test_name: String,
    pub test_count: u64,
    pub total_revenue: Decimal,
    pub avg_price: Decimal,
    pub first_test_date: Option<NaiveDate>,
    pub last_test_date: Option<NaiveDate>,
}

/// (month, test) → count and revenue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestMonthlyRow {
    pub month: Period,
    pub month_name: String,
    pub test_type: String,
    pub test_name: String,
    pub test_count: u64,
    pub total_revenue: Decimal,
}

/// Species → animal cases and the revenue of the visits they came on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeciesRow {
    pub species: String,
    pub case_count: u64,
    pub total_revenue: Decimal,
    pub avg_revenue_per_case: Decimal,
}

/// (species, month) → revenue and animal cases.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeciesMonthlyRow {
    pub species: String,
    pub month: Period,
    pub month_name: String,
    pub total_revenue: Decimal,
    pub case_count: u64,
}

/// The one name and role an employee is shown under everywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeeLabel {
    pub name: String,
    pub role: String,
}

/// Top-line totals and KPIs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total_visits: u64,
    pub total_tests: u64,
    pub total_revenue: Decimal,
    pub unique_employees: u64,
    pub unique_districts: u64,
    pub unattributed_visits: u64,
    pub undated_visits: u64,
    pub orphan_tests: u64,
    pub animal_cases: u64,
    pub orphan_animal_cases: u64,
    pub unique_customers: u64,
    pub avg_revenue_per_case: Decimal,
    pub payment_completion_rate: Decimal,
    pub sample_collection_rate: Decimal,
    pub report_sent_rate: Decimal,
}

/// Every table produced by one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    pub summary: Summary,
    pub employee_totals: Vec<EmployeeTotalsRow>,
    pub employee_monthly: Vec<EmployeeMonthlyRow>,
    pub district_analysis: Vec<DistrictRow>,
    pub employee_test_totals: Vec<EmployeeTestTotalsRow>,
    pub employee_test_detail: Vec<EmployeeTestDetailRow>,
    pub district_test_volume: Vec<DistrictTestVolumeRow>,
    pub district_test_monthly: Vec<DistrictTestMonthlyRow>,
    pub district_test_yearly: Vec<DistrictTestYearlyRow>,
    pub district_test_detail: Vec<DistrictTestDetailRow>,
    pub monthly_analysis: Vec<MonthlyRow>,
    pub yearly_analysis: Vec<YearlyRow>,
    pub test_analysis: Vec<TestAnalysisRow>,
    pub test_monthly_analysis: Vec<TestMonthlyRow>,
    pub species_analysis: Vec<SpeciesRow>,
    pub species_trends: Vec<SpeciesMonthlyRow>,
    /// Ids of visits with no employee reference, in input order.
    pub unattributed_visits: Vec<String>,
    /// Employee id → the label used in every table and in the visit list.
    pub employees: BTreeMap<String, EmployeeLabel>,
}

impl Report {
    /// District test volume, least to most. Ties keep district order.
    pub fn district_test_volume_ascending(&self) -> Vec<DistrictTestVolumeRow> {
        let mut rows = self.district_test_volume.clone();
        rows.sort_by_key(|r| r.test_count);
        rows
    }

    /// Species, most cases first. Ties keep species order.
    pub fn species_by_cases(&self) -> Vec<SpeciesRow> {
        let mut rows = self.species_analysis.clone();
        rows.sort_by_key(|r| std::cmp::Reverse(r.case_count));
        rows
    }
}
