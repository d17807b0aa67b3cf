//! Raw store rows and their normalized form.
//!
//! A visit is dated by its service date (`visit_date`); `created_at` is only
//! a fallback when the service date is missing or unparsable. Tests carry no
//! date of their own and inherit the parent visit's.

mod de;
mod rows;

pub use rows::{AnimalRef, OwnerRef, TestRow, UserRow, VisitAnimalRef, VisitAnimalRow, VisitRow};

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::attribution::Attribution;
use crate::districts::DistrictNormalizer;

/// State recorded when the owner row does not carry one.
pub const DEFAULT_STATE: &str = "Kerala";

/// Label for tests without a type or name.
pub const UNKNOWN_TEST: &str = "Unknown";

/// Label for animals with no recorded species or breed.
pub const UNKNOWN_SPECIES: &str = "Unknown";

/// A calendar month. Orders chronologically and displays as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Long form, e.g. `March 2024`.
    pub fn name(&self) -> String {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .map(|d| d.format("%B %Y").to_string())
            .unwrap_or_else(|| self.key())
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

/// Parses the date part of a store timestamp.
///
/// Accepts RFC 3339 timestamps (the local date in the stored offset is
/// kept), naive `T`/space separated timestamps and plain `YYYY-MM-DD`.
pub fn parse_service_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ts.date());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    // Offsets such as `+00` that RFC 3339 parsing refuses.
    raw.get(..10)
        .and_then(|head| NaiveDate::parse_from_str(head, "%Y-%m-%d").ok())
}

/// A visit after attribution, district canonicalization and dating.
#[derive(Debug, Clone, PartialEq)]
pub struct Visit {
    pub id: String,
    pub date: Option<NaiveDate>,
    pub period: Option<Period>,
    pub district: String,
    pub state: String,
    pub revenue: Decimal,
    pub attribution: Attribution,
    /// Name from the directory or the staff column matching the resolved role.
    pub employee_name: Option<String>,
    /// Role recorded for the employee in the directory, if any.
    pub directory_role: Option<String>,
    pub owner_id: Option<String>,
    pub payment_received: bool,
    pub sample_collected: bool,
    pub report_sent: bool,
}

impl Visit {
    pub fn year(&self) -> Option<i32> {
        self.period.map(|p| p.year)
    }
}

/// Test type plus test name; the unit counted by the test tables.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TestKind {
    pub test_type: String,
    pub test_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestRecord {
    pub id: String,
    pub visit_id: Option<String>,
    pub kind: TestKind,
    pub price: Decimal,
}

impl From<TestRow> for TestRecord {
    fn from(row: TestRow) -> Self {
        let visit_id = row.parent_visit_id().map(str::to_string);
        TestRecord {
            id: row.id,
            visit_id,
            kind: TestKind {
                test_type: row.test_type.unwrap_or_else(|| UNKNOWN_TEST.to_string()),
                test_name: row.test_name.unwrap_or_else(|| UNKNOWN_TEST.to_string()),
            },
            price: row.price,
        }
    }
}

/// An animal case: one animal on one visit, labelled by species.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimalCase {
    pub id: String,
    pub visit_id: Option<String>,
    pub species: String,
    pub breed: String,
}

impl AnimalCase {
    pub fn is_species(&self, species: &str) -> bool {
        self.species.to_lowercase() == species.trim().to_lowercase()
    }
}

impl From<VisitAnimalRow> for AnimalCase {
    fn from(row: VisitAnimalRow) -> Self {
        let animal = row.animals.unwrap_or_default();
        let label = |raw: Option<String>| {
            raw.map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| UNKNOWN_SPECIES.to_string())
        };
        AnimalCase {
            id: row.id,
            visit_id: row.visit_id,
            species: label(animal.species),
            breed: label(animal.breed),
        }
    }
}

/// Employee id → directory name and role.
#[derive(Debug, Clone, Default)]
pub struct EmployeeDirectory {
    names: HashMap<String, String>,
    roles: HashMap<String, String>,
}

impl EmployeeDirectory {
    pub fn from_users(users: &[UserRow]) -> Self {
        let names = users
            .iter()
            .filter_map(|u| u.name.as_ref().map(|n| (u.id.clone(), n.clone())))
            .collect();
        let roles = users
            .iter()
            .filter_map(|u| u.role.as_ref().map(|r| (u.id.clone(), r.clone())))
            .collect();
        Self { names, roles }
    }

    pub fn name(&self, id: &str) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    pub fn role(&self, id: &str) -> Option<&str> {
        self.roles.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Applies attribution, naming, district canonicalization and dating to raw
/// visit rows.
pub struct VisitNormalizer<'a> {
    districts: &'a DistrictNormalizer,
    directory: &'a EmployeeDirectory,
}

impl<'a> VisitNormalizer<'a> {
    pub fn new(districts: &'a DistrictNormalizer, directory: &'a EmployeeDirectory) -> Self {
        Self {
            districts,
            directory,
        }
    }

    pub fn normalize(&self, row: VisitRow) -> Visit {
        let attribution =
            Attribution::resolve(row.field_staff_id.as_deref(), row.lab_assistant_id.as_deref());

        let employee_name = match &attribution {
            Attribution::FieldStaff(id) => self
                .directory
                .name(id)
                .map(str::to_string)
                .or_else(|| row.field_staff_name.clone()),
            Attribution::LabAssistant(id) => self
                .directory
                .name(id)
                .map(str::to_string)
                .or_else(|| row.lab_staff_name.clone()),
            Attribution::Unattributed => None,
        };
        let directory_role = attribution
            .employee_id()
            .and_then(|id| self.directory.role(id))
            .map(str::to_string);

        let date = row
            .visit_date
            .as_deref()
            .and_then(parse_service_date)
            .or_else(|| row.created_at.as_deref().and_then(parse_service_date));

        Visit {
            district: self.districts.normalize(row.raw_district()),
            state: row.raw_state().unwrap_or(DEFAULT_STATE).to_string(),
            period: date.map(Period::of),
            date,
            revenue: row.total_test_charge,
            attribution,
            employee_name,
            directory_role,
            owner_id: row.owner_id,
            payment_received: row.payment_status,
            sample_collected: row.sample_collected,
            report_sent: row.report_sent,
            id: row.id,
        }
    }
}
