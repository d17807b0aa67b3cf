//! Cross-checks between the aggregate tables and the inputs they came from.
//!
//! Every check recomputes its expected value straight from the visits and
//! tests, so a grouping bug in the engine cannot hide behind itself.

use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use tracing::{debug, error};

use crate::analyzers::types::Report;
use crate::error::PipelineError;
use crate::records::{AnimalCase, TestRecord, Visit};

struct Checks {
    failures: Vec<String>,
}

impl Checks {
    fn count(&mut self, what: &str, actual: u64, expected: u64) {
        if actual != expected {
            self.failures
                .push(format!("{what}: tables sum to {actual}, inputs give {expected}"));
        }
    }

    fn money(&mut self, what: &str, actual: Decimal, expected: Decimal) {
        if actual != expected {
            self.failures
                .push(format!("{what}: tables sum to {actual}, inputs give {expected}"));
        }
    }
}

/// Fails with every violated invariant listed, or returns `Ok` if the report
/// is consistent with `visits`, `tests` and `animals`.
pub fn verify(
    report: &Report,
    visits: &[Visit],
    tests: &[TestRecord],
    animals: &[AnimalCase],
) -> Result<(), PipelineError> {
    let total = visits.len() as u64;
    let attributed: Vec<&Visit> = visits.iter().filter(|v| v.attribution.is_attributed()).collect();
    let dated: Vec<&Visit> = visits.iter().filter(|v| v.period.is_some()).collect();
    let unattributed = total - attributed.len() as u64;

    let revenue_of = |vs: &[&Visit]| vs.iter().map(|v| v.revenue).sum::<Decimal>();
    let all_revenue: Decimal = visits.iter().map(|v| v.revenue).sum();

    let ids: HashSet<&str> = visits.iter().map(|v| v.id.as_str()).collect();
    let attributed_ids: HashSet<&str> = attributed.iter().map(|v| v.id.as_str()).collect();
    let dated_ids: HashSet<&str> = dated.iter().map(|v| v.id.as_str()).collect();
    let linked_to = |set: &HashSet<&str>| {
        tests
            .iter()
            .filter(|t| t.visit_id.as_deref().is_some_and(|id| set.contains(id)))
            .count() as u64
    };
    let linked = linked_to(&ids);

    let mut c = Checks { failures: Vec::new() };

    // Visit tables.
    c.count(
        "employee totals cases",
        report.employee_totals.iter().map(|r| r.case_count).sum(),
        attributed.len() as u64,
    );
    c.count("unattributed visits", report.summary.unattributed_visits, unattributed);
    c.count(
        "unattributed visit ids",
        report.unattributed_visits.len() as u64,
        unattributed,
    );
    c.money(
        "employee totals revenue",
        report.employee_totals.iter().map(|r| r.total_revenue).sum(),
        revenue_of(&attributed),
    );
    c.count(
        "district cases",
        report.district_analysis.iter().map(|r| r.case_count).sum(),
        total,
    );
    c.money(
        "district revenue",
        report.district_analysis.iter().map(|r| r.total_revenue).sum(),
        all_revenue,
    );
    c.count(
        "monthly cases",
        report.monthly_analysis.iter().map(|r| r.case_count).sum(),
        dated.len() as u64,
    );
    c.money(
        "monthly revenue",
        report.monthly_analysis.iter().map(|r| r.total_revenue).sum(),
        revenue_of(&dated),
    );
    c.count(
        "yearly cases",
        report.yearly_analysis.iter().map(|r| r.case_count).sum(),
        dated.len() as u64,
    );
    c.money(
        "yearly revenue",
        report.yearly_analysis.iter().map(|r| r.total_revenue).sum(),
        revenue_of(&dated),
    );
    let attributed_dated: Vec<&Visit> = attributed.iter().copied().filter(|v| v.period.is_some()).collect();
    c.count(
        "employee monthly cases",
        report.employee_monthly.iter().map(|r| r.case_count).sum(),
        attributed_dated.len() as u64,
    );
    c.money(
        "employee monthly revenue",
        report.employee_monthly.iter().map(|r| r.total_revenue).sum(),
        revenue_of(&attributed_dated),
    );
    c.count("summary visits", report.summary.total_visits, total);
    c.money("summary revenue", report.summary.total_revenue, all_revenue);

    // Test tables.
    c.count("summary tests", report.summary.total_tests, linked);
    c.count(
        "orphan tests",
        report.summary.orphan_tests,
        tests.len() as u64 - linked,
    );
    c.count(
        "district test volume",
        report.district_test_volume.iter().map(|r| r.test_count).sum(),
        linked,
    );
    c.count(
        "district test detail",
        report.district_test_detail.iter().map(|r| r.test_count).sum(),
        linked,
    );
    c.count(
        "test analysis",
        report.test_analysis.iter().map(|r| r.test_count).sum(),
        linked,
    );
    let attributed_tests = linked_to(&attributed_ids);
    c.count(
        "employee test totals",
        report.employee_test_totals.iter().map(|r| r.test_count).sum(),
        attributed_tests,
    );
    c.count(
        "employee test detail",
        report.employee_test_detail.iter().map(|r| r.test_count).sum(),
        attributed_tests,
    );
    let dated_tests = linked_to(&dated_ids);
    c.count(
        "district test monthly",
        report.district_test_monthly.iter().map(|r| r.test_count).sum(),
        dated_tests,
    );
    c.count(
        "district test yearly",
        report.district_test_yearly.iter().map(|r| r.test_count).sum(),
        dated_tests,
    );
    c.count(
        "test monthly analysis",
        report.test_monthly_analysis.iter().map(|r| r.test_count).sum(),
        dated_tests,
    );

    // Species tables.
    let by_id: HashMap<&str, &Visit> = visits.iter().map(|v| (v.id.as_str(), v)).collect();
    let parents: Vec<&Visit> = animals
        .iter()
        .filter_map(|a| a.visit_id.as_deref().and_then(|id| by_id.get(id).copied()))
        .collect();
    let dated_parents: Vec<&Visit> = parents.iter().copied().filter(|v| v.period.is_some()).collect();
    c.count("summary animal cases", report.summary.animal_cases, parents.len() as u64);
    c.count(
        "orphan animal cases",
        report.summary.orphan_animal_cases,
        (animals.len() - parents.len()) as u64,
    );
    c.count(
        "species cases",
        report.species_analysis.iter().map(|r| r.case_count).sum(),
        parents.len() as u64,
    );
    c.money(
        "species revenue",
        report.species_analysis.iter().map(|r| r.total_revenue).sum(),
        revenue_of(&parents),
    );
    c.count(
        "species trend cases",
        report.species_trends.iter().map(|r| r.case_count).sum(),
        dated_parents.len() as u64,
    );
    c.money(
        "species trend revenue",
        report.species_trends.iter().map(|r| r.total_revenue).sum(),
        revenue_of(&dated_parents),
    );

    if c.failures.is_empty() {
        debug!("Report totals reconcile with inputs");
        return Ok(());
    }
    for failure in &c.failures {
        error!(%failure, "Invariant check failed");
    }
    Err(PipelineError::InvariantViolated(c.failures.join("; ")))
}
