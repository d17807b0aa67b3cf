use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::info;

use crate::analyzers::types::*;
use crate::analyzers::utility::{average, percentage};
use crate::records::{AnimalCase, Period, TestKind, TestRecord, Visit};

/// Name used when neither the directory nor the visit rows name an employee.
pub const UNKNOWN_EMPLOYEE: &str = "Unknown";

#[derive(Debug, Default, Clone, Copy)]
struct VisitTally {
    cases: u64,
    revenue: Decimal,
    payments: u64,
    samples: u64,
    reports: u64,
}

impl VisitTally {
    fn add(&mut self, v: &Visit) {
        self.cases += 1;
        self.revenue += v.revenue;
        self.payments += u64::from(v.payment_received);
        self.samples += u64::from(v.sample_collected);
        self.reports += u64::from(v.report_sent);
    }
}

/// A count and the money attached to the counted things.
#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    count: u64,
    revenue: Decimal,
}

impl Tally {
    fn add(&mut self, amount: Decimal) {
        self.count += 1;
        self.revenue += amount;
    }
}

struct EmployeeAcc<'a> {
    name: Option<&'a str>,
    role: &'a str,
    visits: VisitTally,
    tests: Tally,
}

struct DistrictAcc<'a> {
    state: &'a str,
    visits: VisitTally,
    owners: BTreeSet<&'a str>,
}

#[derive(Default)]
struct PeriodAcc<'a> {
    visits: VisitTally,
    owners: BTreeSet<&'a str>,
}

impl<'a> PeriodAcc<'a> {
    fn add(&mut self, v: &'a Visit) {
        self.visits.add(v);
        if let Some(owner) = v.owner_id.as_deref() {
            self.owners.insert(owner);
        }
    }
}

struct KindAcc {
    tally: Tally,
    first_seen: usize,
}

#[derive(Default)]
struct TestSpan {
    tally: Tally,
    first: Option<NaiveDate>,
    last: Option<NaiveDate>,
}

/// Builds every aggregate table from normalized visits, tests and animal
/// cases.
///
/// Tests and animal cases are joined to their parent visit by id and inherit
/// its employee, district, date and revenue; those without a known parent
/// are counted as orphans and contribute to nothing else. All grouping goes
/// through ordered maps, so the output depends only on the input.
pub fn aggregate(visits: &[Visit], tests: &[TestRecord], animals: &[AnimalCase]) -> Report {
    let mut employees: BTreeMap<&str, EmployeeAcc> = BTreeMap::new();
    let mut employee_monthly: BTreeMap<(&str, Period), VisitTally> = BTreeMap::new();
    let mut districts: BTreeMap<&str, DistrictAcc> = BTreeMap::new();
    let mut monthly: BTreeMap<Period, PeriodAcc> = BTreeMap::new();
    let mut yearly: BTreeMap<i32, PeriodAcc> = BTreeMap::new();
    let mut customers: BTreeSet<&str> = BTreeSet::new();
    let mut overall = VisitTally::default();
    let mut unattributed = Vec::new();
    let mut undated = 0u64;

    for v in visits {
        overall.add(v);
        if let Some(owner) = v.owner_id.as_deref() {
            customers.insert(owner);
        }

        match v.attribution.employee_id() {
            Some(emp) => {
                // The directory role, when known, outranks the slot the id came from.
                let acc = employees.entry(emp).or_insert_with(|| EmployeeAcc {
                    name: None,
                    role: v.directory_role.as_deref().unwrap_or(v.attribution.role()),
                    visits: VisitTally::default(),
                    tests: Tally::default(),
                });
                if acc.name.is_none() {
                    acc.name = v.employee_name.as_deref();
                }
                acc.visits.add(v);
                if let Some(p) = v.period {
                    employee_monthly.entry((emp, p)).or_default().add(v);
                }
            }
            None => unattributed.push(v.id.clone()),
        }

        let district = districts
            .entry(v.district.as_str())
            .or_insert_with(|| DistrictAcc {
                state: v.state.as_str(),
                visits: VisitTally::default(),
                owners: BTreeSet::new(),
            });
        district.visits.add(v);
        if let Some(owner) = v.owner_id.as_deref() {
            district.owners.insert(owner);
        }

        match v.period {
            Some(p) => {
                monthly.entry(p).or_default().add(v);
                yearly.entry(p.year).or_default().add(v);
            }
            None => undated += 1,
        }
    }

    let by_id: HashMap<&str, &Visit> = visits.iter().map(|v| (v.id.as_str(), v)).collect();

    let mut employee_tests: BTreeMap<(&str, &TestKind), KindAcc> = BTreeMap::new();
    let mut district_tests: BTreeMap<&str, Tally> = BTreeMap::new();
    let mut district_test_monthly: BTreeMap<(&str, Period), u64> = BTreeMap::new();
    let mut district_test_yearly: BTreeMap<(&str, i32), u64> = BTreeMap::new();
    let mut district_kinds: BTreeMap<(&str, &TestKind), Tally> = BTreeMap::new();
    let mut kinds: BTreeMap<&TestKind, TestSpan> = BTreeMap::new();
    let mut kinds_monthly: BTreeMap<(Period, &TestKind), Tally> = BTreeMap::new();
    let mut linked = 0u64;
    let mut orphans = 0u64;

    for (seen, t) in tests.iter().enumerate() {
        let Some(v) = t.visit_id.as_deref().and_then(|id| by_id.get(id).copied()) else {
            orphans += 1;
            continue;
        };
        linked += 1;

        if let Some(emp) = v.attribution.employee_id() {
            if let Some(acc) = employees.get_mut(emp) {
                acc.tests.add(t.price);
            }
            employee_tests
                .entry((emp, &t.kind))
                .or_insert_with(|| KindAcc {
                    tally: Tally::default(),
                    first_seen: seen,
                })
                .tally
                .add(t.price);
        }

        let district = v.district.as_str();
        district_tests.entry(district).or_default().add(t.price);
        district_kinds.entry((district, &t.kind)).or_default().add(t.price);

        let span = kinds.entry(&t.kind).or_default();
        span.tally.add(t.price);
        if let Some(date) = v.date {
            span.first = Some(span.first.map_or(date, |d| d.min(date)));
            span.last = Some(span.last.map_or(date, |d| d.max(date)));
        }

        if let Some(p) = v.period {
            *district_test_monthly.entry((district, p)).or_default() += 1;
            *district_test_yearly.entry((district, p.year)).or_default() += 1;
            kinds_monthly.entry((p, &t.kind)).or_default().add(t.price);
        }
    }

    // An animal case carries its visit's full revenue, so a visit with two
    // animals counts towards both species.
    let mut species: BTreeMap<&str, Tally> = BTreeMap::new();
    let mut species_monthly: BTreeMap<(&str, Period), Tally> = BTreeMap::new();
    let mut animal_cases = 0u64;
    let mut orphan_animals = 0u64;

    for a in animals {
        let Some(v) = a.visit_id.as_deref().and_then(|id| by_id.get(id).copied()) else {
            orphan_animals += 1;
            continue;
        };
        animal_cases += 1;
        species.entry(a.species.as_str()).or_default().add(v.revenue);
        if let Some(p) = v.period {
            species_monthly
                .entry((a.species.as_str(), p))
                .or_default()
                .add(v.revenue);
        }
    }

    // Per employee: highest count wins, ties go to the earliest-seen test.
    let mut most_common: BTreeMap<&str, (&TestKind, u64, usize)> = BTreeMap::new();
    for ((emp, kind), acc) in &employee_tests {
        let candidate = (*kind, acc.tally.count, acc.first_seen);
        most_common
            .entry(*emp)
            .and_modify(|best| {
                if candidate.1 > best.1 || (candidate.1 == best.1 && candidate.2 < best.2) {
                    *best = candidate;
                }
            })
            .or_insert(candidate);
    }

    let labels: BTreeMap<String, EmployeeLabel> = employees
        .iter()
        .map(|(emp, acc)| {
            let label = EmployeeLabel {
                name: acc.name.unwrap_or(UNKNOWN_EMPLOYEE).to_string(),
                role: acc.role.to_string(),
            };
            (emp.to_string(), label)
        })
        .collect();
    let name_of = |emp: &str| -> String {
        labels
            .get(emp)
            .map_or(UNKNOWN_EMPLOYEE, |l| l.name.as_str())
            .to_string()
    };

    let employee_totals = employees
        .iter()
        .map(|(emp, acc)| EmployeeTotalsRow {
            employee_id: emp.to_string(),
            employee_name: name_of(emp),
            employee_role: acc.role.to_string(),
            case_count: acc.visits.cases,
            total_revenue: acc.visits.revenue,
            avg_revenue_per_case: average(acc.visits.revenue, acc.visits.cases),
            test_count: acc.tests.count,
            payments_received: acc.visits.payments,
            samples_collected: acc.visits.samples,
            reports_sent: acc.visits.reports,
        })
        .collect();

    let employee_monthly = employee_monthly
        .iter()
        .map(|((emp, p), tally)| EmployeeMonthlyRow {
            employee_id: emp.to_string(),
            employee_name: name_of(emp),
            month: *p,
            month_name: p.name(),
            case_count: tally.cases,
            total_revenue: tally.revenue,
            payments_received: tally.payments,
            samples_collected: tally.samples,
            reports_sent: tally.reports,
        })
        .collect();

    let district_analysis = districts
        .iter()
        .map(|(name, acc)| DistrictRow {
            district: name.to_string(),
            state: acc.state.to_string(),
            case_count: acc.visits.cases,
            unique_owners: acc.owners.len() as u64,
            total_revenue: acc.visits.revenue,
            avg_revenue_per_visit: average(acc.visits.revenue, acc.visits.cases),
        })
        .collect();

    let employee_test_totals = employees
        .iter()
        .map(|(emp, acc)| {
            let top = most_common.get(emp);
            EmployeeTestTotalsRow {
                employee_id: emp.to_string(),
                employee_name: name_of(emp),
                test_count: acc.tests.count,
                test_revenue: acc.tests.revenue,
                most_common_test_type: top.map(|(k, _, _)| k.test_type.clone()),
                most_common_test_name: top.map(|(k, _, _)| k.test_name.clone()),
                most_common_test_count: top.map_or(0, |(_, count, _)| *count),
            }
        })
        .collect();

    let employee_test_detail = employee_tests
        .iter()
        .map(|((emp, kind), acc)| EmployeeTestDetailRow {
            employee_id: emp.to_string(),
            employee_name: name_of(emp),
            test_type: kind.test_type.clone(),
            test_name: kind.test_name.clone(),
            test_count: acc.tally.count,
            test_revenue: acc.tally.revenue,
        })
        .collect();

    let district_test_volume = district_tests
        .iter()
        .map(|(district, tally)| DistrictTestVolumeRow {
            district: district.to_string(),
            test_count: tally.count,
            test_revenue: tally.revenue,
        })
        .collect();

    let district_test_monthly = district_test_monthly
        .iter()
        .map(|((district, p), count)| DistrictTestMonthlyRow {
            district: district.to_string(),
            month: *p,
            month_name: p.name(),
            test_count: *count,
        })
        .collect();

    let district_test_yearly = district_test_yearly
        .iter()
        .map(|((district, year), count)| DistrictTestYearlyRow {
            district: district.to_string(),
            year: *year,
            test_count: *count,
        })
        .collect();

    let district_test_detail = district_kinds
        .iter()
        .map(|((district, kind), tally)| DistrictTestDetailRow {
            district: district.to_string(),
            test_type: kind.test_type.clone(),
            test_name: kind.test_name.clone(),
            test_count: tally.count,
            test_revenue: tally.revenue,
        })
        .collect();

    let monthly_analysis = monthly
        .iter()
        .map(|(p, acc)| MonthlyRow {
            month: *p,
            month_name: p.name(),
            case_count: acc.visits.cases,
            total_revenue: acc.visits.revenue,
            avg_revenue: average(acc.visits.revenue, acc.visits.cases),
            unique_customers: acc.owners.len() as u64,
            payments_received: acc.visits.payments,
            samples_collected: acc.visits.samples,
            reports_sent: acc.visits.reports,
        })
        .collect();

    let yearly_analysis = yearly
        .iter()
        .map(|(year, acc)| YearlyRow {
            year: *year,
            case_count: acc.visits.cases,
            total_revenue: acc.visits.revenue,
            avg_revenue: average(acc.visits.revenue, acc.visits.cases),
            unique_customers: acc.owners.len() as u64,
            payments_received: acc.visits.payments,
            samples_collected: acc.visits.samples,
            reports_sent: acc.visits.reports,
        })
        .collect();

    let test_analysis = kinds
        .iter()
        .map(|(kind, span)| TestAnalysisRow {
            test_type: kind.test_type.clone(),
            test_name: kind.test_name.clone(),
            test_count: span.tally.count,
            total_revenue: span.tally.revenue,
            avg_price: average(span.tally.revenue, span.tally.count),
            first_test_date: span.first,
            last_test_date: span.last,
        })
        .collect();

    let test_monthly_analysis = kinds_monthly
        .iter()
        .map(|((p, kind), tally)| TestMonthlyRow {
            month: *p,
            month_name: p.name(),
            test_type: kind.test_type.clone(),
            test_name: kind.test_name.clone(),
            test_count: tally.count,
            total_revenue: tally.revenue,
        })
        .collect();

    let species_analysis = species
        .iter()
        .map(|(name, tally)| SpeciesRow {
            species: name.to_string(),
            case_count: tally.count,
            total_revenue: tally.revenue,
            avg_revenue_per_case: average(tally.revenue, tally.count),
        })
        .collect();

    let species_trends = species_monthly
        .iter()
        .map(|((name, p), tally)| SpeciesMonthlyRow {
            species: name.to_string(),
            month: *p,
            month_name: p.name(),
            total_revenue: tally.revenue,
            case_count: tally.count,
        })
        .collect();

    let summary = Summary {
        total_visits: overall.cases,
        total_tests: linked,
        total_revenue: overall.revenue,
        unique_employees: employees.len() as u64,
        unique_districts: districts.len() as u64,
        unattributed_visits: unattributed.len() as u64,
        undated_visits: undated,
        orphan_tests: orphans,
        animal_cases,
        orphan_animal_cases: orphan_animals,
        unique_customers: customers.len() as u64,
        avg_revenue_per_case: average(overall.revenue, overall.cases),
        payment_completion_rate: percentage(overall.payments, overall.cases),
        sample_collection_rate: percentage(overall.samples, overall.cases),
        report_sent_rate: percentage(overall.reports, overall.cases),
    };

    info!(
        visits = summary.total_visits,
        tests = summary.total_tests,
        employees = summary.unique_employees,
        districts = summary.unique_districts,
        unattributed = summary.unattributed_visits,
        undated = summary.undated_visits,
        orphan_tests = summary.orphan_tests,
        animal_cases = summary.animal_cases,
        orphan_animal_cases = summary.orphan_animal_cases,
        "Aggregation complete"
    );

    Report {
        summary,
        employee_totals,
        employee_monthly,
        district_analysis,
        employee_test_totals,
        employee_test_detail,
        district_test_volume,
        district_test_monthly,
        district_test_yearly,
        district_test_detail,
        monthly_analysis,
        yearly_analysis,
        test_analysis,
        test_monthly_analysis,
        species_analysis,
        species_trends,
        unattributed_visits: unattributed,
        employees: labels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribution::Attribution;
    use rust_decimal_macros::dec;

    fn visit(id: &str, emp: Option<&str>, district: &str, date: Option<(i32, u32, u32)>, revenue: Decimal) -> Visit {
        let date = date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d));
        Visit {
            id: id.to_string(),
            date,
            period: date.map(Period::of),
            district: district.to_string(),
            state: "Kerala".to_string(),
            revenue,
            attribution: Attribution::resolve(emp, None),
            employee_name: emp.map(|e| format!("Name {e}")),
            directory_role: None,
            owner_id: Some(format!("o-{id}")),
            payment_received: true,
            sample_collected: false,
            report_sent: false,
        }
    }

    fn test(id: &str, visit_id: &str, name: &str, price: Decimal) -> TestRecord {
        TestRecord {
            id: id.to_string(),
            visit_id: Some(visit_id.to_string()),
            kind: TestKind {
                test_type: "Lab".to_string(),
                test_name: name.to_string(),
            },
            price,
        }
    }

    fn fixture() -> (Vec<Visit>, Vec<TestRecord>) {
        let visits = vec![
            visit("v1", Some("A"), "Thiruvananthapuram", Some((2024, 1, 5)), dec!(100.10)),
            visit("v2", Some("A"), "Kollam", Some((2024, 2, 5)), dec!(200.20)),
            visit("v3", Some("B"), "Kollam", Some((2023, 12, 31)), dec!(0.30)),
            visit("v4", None, "Kollam", Some((2024, 2, 7)), dec!(50)),
            visit("v5", Some("B"), "Unknown", None, dec!(9.99)),
        ];
        let tests = vec![
            test("t1", "v1", "CBC", dec!(10)),
            test("t2", "v1", "LFT", dec!(20)),
            test("t3", "v2", "LFT", dec!(20)),
            test("t4", "v2", "CBC", dec!(10)),
            test("t5", "v4", "CBC", dec!(10)),
            test("t6", "missing", "CBC", dec!(10)),
            test("t7", "v3", "KFT", dec!(5)),
        ];
        (visits, tests)
    }

    #[test]
    fn test_employee_totals_exclude_unattributed() {
        let (visits, tests) = fixture();
        let report = aggregate(&visits, &tests, &[]);

        let cases: u64 = report.employee_totals.iter().map(|r| r.case_count).sum();
        assert_eq!(cases, 4);
        assert_eq!(report.summary.unattributed_visits, 1);
        assert_eq!(report.unattributed_visits, vec!["v4".to_string()]);

        let a = &report.employee_totals[0];
        assert_eq!(a.employee_id, "A");
        assert_eq!(a.employee_name, "Name A");
        assert_eq!(a.employee_role, "field_staff");
        assert_eq!(a.case_count, 2);
        assert_eq!(a.total_revenue, dec!(300.30));
        assert_eq!(a.avg_revenue_per_case, dec!(150.15));
        assert_eq!(a.test_count, 4);
    }

    #[test]
    fn test_district_analysis_counts_every_visit() {
        let (visits, tests) = fixture();
        let report = aggregate(&visits, &tests, &[]);

        let cases: u64 = report.district_analysis.iter().map(|r| r.case_count).sum();
        assert_eq!(cases, 5);

        let kollam = report
            .district_analysis
            .iter()
            .find(|r| r.district == "Kollam")
            .unwrap();
        assert_eq!(kollam.case_count, 3);
        assert_eq!(kollam.total_revenue, dec!(250.50));
        assert_eq!(kollam.unique_owners, 3);
    }

    #[test]
    fn test_monthly_tables_skip_undated_visits() {
        let (visits, tests) = fixture();
        let report = aggregate(&visits, &tests, &[]);

        let months: Vec<String> = report.monthly_analysis.iter().map(|r| r.month.key()).collect();
        assert_eq!(months, vec!["2023-12", "2024-01", "2024-02"]);
        assert_eq!(report.summary.undated_visits, 1);

        let feb = &report.monthly_analysis[2];
        assert_eq!(feb.case_count, 2);
        assert_eq!(feb.total_revenue, dec!(250.20));

        let years: Vec<i32> = report.yearly_analysis.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2023, 2024]);
    }

    #[test]
    fn test_employee_monthly_rows() {
        let (visits, tests) = fixture();
        let report = aggregate(&visits, &tests, &[]);

        let keys: Vec<(String, String)> = report
            .employee_monthly
            .iter()
            .map(|r| (r.employee_id.clone(), r.month.key()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("A".to_string(), "2024-01".to_string()),
                ("A".to_string(), "2024-02".to_string()),
                ("B".to_string(), "2023-12".to_string()),
            ]
        );
        assert_eq!(report.employee_monthly[0].month_name, "January 2024");
    }

    #[test]
    fn test_most_common_tie_goes_to_first_seen() {
        let (visits, tests) = fixture();
        let report = aggregate(&visits, &tests, &[]);

        // A has CBC x2 and LFT x2; CBC was seen first (t1).
        let a = &report.employee_test_totals[0];
        assert_eq!(a.most_common_test_name.as_deref(), Some("CBC"));
        assert_eq!(a.most_common_test_count, 2);

        // Seeing LFT first flips the tie.
        let mut reordered = tests.clone();
        reordered.swap(0, 1);
        let report = aggregate(&visits, &reordered, &[]);
        assert_eq!(
            report.employee_test_totals[0].most_common_test_name.as_deref(),
            Some("LFT")
        );
    }

    #[test]
    fn test_orphan_and_unattributed_tests() {
        let (visits, tests) = fixture();
        let report = aggregate(&visits, &tests, &[]);

        assert_eq!(report.summary.orphan_tests, 1);
        assert_eq!(report.summary.total_tests, 6);

        let employee_tests: u64 = report.employee_test_totals.iter().map(|r| r.test_count).sum();
        assert_eq!(employee_tests, 5);

        let district_tests: u64 = report.district_test_volume.iter().map(|r| r.test_count).sum();
        assert_eq!(district_tests, 6);
    }

    #[test]
    fn test_district_test_volume_orderings() {
        let (visits, tests) = fixture();
        let report = aggregate(&visits, &tests, &[]);

        let by_name: Vec<&str> = report.district_test_volume.iter().map(|r| r.district.as_str()).collect();
        assert_eq!(by_name, vec!["Kollam", "Thiruvananthapuram"]);

        let ascending: Vec<(String, u64)> = report
            .district_test_volume_ascending()
            .into_iter()
            .map(|r| (r.district, r.test_count))
            .collect();
        assert_eq!(
            ascending,
            vec![("Thiruvananthapuram".to_string(), 2), ("Kollam".to_string(), 4)]
        );
    }

    #[test]
    fn test_district_test_periods() {
        let (visits, tests) = fixture();
        let report = aggregate(&visits, &tests, &[]);

        let kollam_2023 = report
            .district_test_yearly
            .iter()
            .find(|r| r.district == "Kollam" && r.year == 2023)
            .unwrap();
        assert_eq!(kollam_2023.test_count, 1);

        let monthly: u64 = report.district_test_monthly.iter().map(|r| r.test_count).sum();
        assert_eq!(monthly, 6);
    }

    #[test]
    fn test_test_analysis_span() {
        let (visits, tests) = fixture();
        let report = aggregate(&visits, &tests, &[]);

        let cbc = report
            .test_analysis
            .iter()
            .find(|r| r.test_name == "CBC")
            .unwrap();
        assert_eq!(cbc.test_count, 3);
        assert_eq!(cbc.total_revenue, dec!(30));
        assert_eq!(cbc.first_test_date, NaiveDate::from_ymd_opt(2024, 1, 5));
        assert_eq!(cbc.last_test_date, NaiveDate::from_ymd_opt(2024, 2, 7));
    }

    #[test]
    fn test_summary_kpis() {
        let (visits, tests) = fixture();
        let report = aggregate(&visits, &tests, &[]);
        let s = &report.summary;

        assert_eq!(s.total_visits, 5);
        assert_eq!(s.total_revenue, dec!(360.59));
        assert_eq!(s.unique_employees, 2);
        assert_eq!(s.unique_districts, 3);
        assert_eq!(s.unique_customers, 5);
        assert_eq!(s.payment_completion_rate, dec!(100));
        assert_eq!(s.sample_collection_rate, Decimal::ZERO);
    }

    #[test]
    fn test_same_input_same_report() {
        let (visits, tests) = fixture();
        assert_eq!(aggregate(&visits, &tests, &[]), aggregate(&visits, &tests, &[]));
    }

    #[test]
    fn test_empty_input() {
        let report = aggregate(&[], &[], &[]);
        assert_eq!(report.summary, Summary::default());
        assert!(report.employee_totals.is_empty());
    }

    #[test]
    fn test_employee_keeps_one_name_and_role() {
        let mut visits = vec![
            visit("v1", Some("E1"), "Kollam", Some((2024, 1, 5)), dec!(10)),
            visit("v2", Some("E1"), "Kollam", Some((2024, 1, 6)), dec!(10)),
            visit("v3", Some("E1"), "Kollam", Some((2024, 2, 6)), dec!(10)),
            visit("v4", Some("E2"), "Kollam", None, dec!(10)),
        ];
        visits[0].employee_name = Some("Anu".into());
        visits[1].employee_name = Some("Anu K".into());
        visits[2].employee_name = None;
        visits[3].employee_name = None;
        for v in &mut visits[..3] {
            v.directory_role = Some("senior_field_staff".into());
        }

        let report = aggregate(&visits, &[], &[]);

        let e1 = &report.employees["E1"];
        assert_eq!(e1.name, "Anu");
        assert_eq!(e1.role, "senior_field_staff");
        assert_eq!(report.employee_totals[0].employee_name, "Anu");
        assert_eq!(report.employee_totals[0].employee_role, "senior_field_staff");
        assert!(report.employee_monthly.iter().all(|r| r.employee_name == "Anu"));

        // No directory role falls back to the attribution slot.
        let e2 = &report.employees["E2"];
        assert_eq!(e2.name, UNKNOWN_EMPLOYEE);
        assert_eq!(e2.role, "field_staff");
    }

    #[test]
    fn test_species_tables() {
        let (visits, tests) = fixture();
        let case = |id: &str, visit_id: &str, species: &str| AnimalCase {
            id: id.to_string(),
            visit_id: Some(visit_id.to_string()),
            species: species.to_string(),
            breed: "Unknown".to_string(),
        };
        let animals = vec![
            case("a1", "v1", "Canine"),
            case("a2", "v1", "Feline"),
            case("a3", "v2", "Canine"),
            case("a4", "v5", "Canine"),
            case("a5", "missing", "Bovine"),
        ];

        let report = aggregate(&visits, &tests, &animals);

        assert_eq!(report.summary.animal_cases, 4);
        assert_eq!(report.summary.orphan_animal_cases, 1);

        let canine = &report.species_analysis[0];
        assert_eq!(canine.species, "Canine");
        assert_eq!(canine.case_count, 3);
        assert_eq!(canine.total_revenue, dec!(310.29));
        assert_eq!(canine.avg_revenue_per_case, dec!(103.43));

        // v5 is undated, so it is missing from the trend.
        let trend: Vec<(String, String, u64)> = report
            .species_trends
            .iter()
            .map(|r| (r.species.clone(), r.month.key(), r.case_count))
            .collect();
        assert_eq!(
            trend,
            vec![
                ("Canine".to_string(), "2024-01".to_string(), 1),
                ("Canine".to_string(), "2024-02".to_string(), 1),
                ("Feline".to_string(), "2024-01".to_string(), 1),
            ]
        );
        assert_eq!(report.species_trends[0].total_revenue, dec!(100.10));

        let by_cases: Vec<String> = report.species_by_cases().into_iter().map(|r| r.species).collect();
        assert_eq!(by_cases, vec!["Canine", "Feline"]);
    }
}
