//! One batch run: fetch every collection, normalize, filter, aggregate and
//! verify. Export is left to the caller so that nothing is written unless
//! this whole sequence succeeded.

use std::collections::HashSet;
use tracing::{info, warn};

use crate::analyzers::aggregate::aggregate;
use crate::analyzers::types::Report;
use crate::analyzers::verify::verify;
use crate::config::{DateRange, PagingConfig};
use crate::districts::DistrictNormalizer;
use crate::error::{FetchError, PipelineError};
use crate::fetch::PageFetcher;
use crate::records::{
    AnimalCase, EmployeeDirectory, TestRecord, TestRow, UserRow, Visit, VisitAnimalRow, VisitNormalizer, VisitRow,
};
use crate::services::record_store::{Collection, RecordStore};

/// Every row of every collection, as decoded from the store.
#[derive(Debug, Default)]
pub struct RawDataset {
    pub visits: Vec<VisitRow>,
    pub tests: Vec<TestRow>,
    pub users: Vec<UserRow>,
    pub animals: Vec<VisitAnimalRow>,
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub range: DateRange,
    /// Accept an empty visits collection instead of failing the run.
    pub allow_empty: bool,
    /// Restrict the species tables to one species (case-insensitive).
    pub species: Option<String>,
}

/// Normalized inputs plus the verified report built from them.
#[derive(Debug)]
pub struct Analysis {
    pub visits: Vec<Visit>,
    pub tests: Vec<TestRecord>,
    pub animals: Vec<AnimalCase>,
    pub report: Report,
    pub range: DateRange,
}

/// Fetches visits, tests, users and animal links concurrently. Any
/// collection failing fails the whole fetch.
#[tracing::instrument(skip_all)]
pub async fn collect<S: RecordStore>(store: &S, paging: &PagingConfig) -> Result<RawDataset, FetchError> {
    let fetcher = PageFetcher::new(store, paging.clone());
    let visits = Collection::visits();
    let tests = Collection::tests();
    let users = Collection::users();
    let animals = Collection::visit_animals();

    let (visits, tests, users, animals) = tokio::try_join!(
        fetcher.fetch_all::<VisitRow>(&visits),
        fetcher.fetch_all::<TestRow>(&tests),
        fetcher.fetch_all::<UserRow>(&users),
        fetcher.fetch_all::<VisitAnimalRow>(&animals),
    )?;

    info!(
        visits = visits.len(),
        tests = tests.len(),
        users = users.len(),
        animals = animals.len(),
        "All collections fetched"
    );
    Ok(RawDataset {
        visits,
        tests,
        users,
        animals,
    })
}

/// Turns a raw dataset into a verified report.
#[tracing::instrument(skip_all, fields(range_start = %options.range.describe_start(), range_end = %options.range.describe_end()))]
pub fn build(
    raw: RawDataset,
    districts: &DistrictNormalizer,
    options: &RunOptions,
) -> Result<Analysis, PipelineError> {
    if raw.visits.is_empty() {
        if !options.allow_empty {
            return Err(PipelineError::EmptyCollection("visits".to_string()));
        }
        warn!("Visits collection is empty, exporting empty tables");
    }
    if raw.tests.is_empty() {
        warn!("Tests collection is empty, test tables will be empty");
    }

    let directory = EmployeeDirectory::from_users(&raw.users);
    let normalizer = VisitNormalizer::new(districts, &directory);
    let all: Vec<Visit> = raw.visits.into_iter().map(|row| normalizer.normalize(row)).collect();
    let tests: Vec<TestRecord> = raw.tests.into_iter().map(TestRecord::from).collect();
    let mut animals: Vec<AnimalCase> = raw.animals.into_iter().map(AnimalCase::from).collect();

    if let Some(species) = options.species.as_deref() {
        let before = animals.len();
        animals.retain(|a| a.is_species(species));
        info!(species, kept = animals.len(), dropped = before - animals.len(), "Applied species filter");
    }

    let range = options.range;
    let (visits, tests, animals) = if range.is_all() {
        (all, tests, animals)
    } else {
        filter_range(all, tests, animals, &range)
    };

    if visits.is_empty() && !range.is_all() && !options.allow_empty {
        return Err(PipelineError::EmptyAfterFilter);
    }

    let report = aggregate(&visits, &tests, &animals);
    verify(&report, &visits, &tests, &animals)?;

    Ok(Analysis {
        visits,
        tests,
        animals,
        report,
        range,
    })
}

/// Keeps visits dated inside `range` and the tests and animal cases belonging
/// to them. Children whose parent is unknown altogether are kept so they
/// still show up as orphans.
fn filter_range(
    all: Vec<Visit>,
    tests: Vec<TestRecord>,
    animals: Vec<AnimalCase>,
    range: &DateRange,
) -> (Vec<Visit>, Vec<TestRecord>, Vec<AnimalCase>) {
    let known: HashSet<String> = all.iter().map(|v| v.id.clone()).collect();
    let before = all.len();
    let undated = all.iter().filter(|v| v.date.is_none()).count();

    let visits: Vec<Visit> = all
        .into_iter()
        .filter(|v| v.date.is_some_and(|d| range.contains(d)))
        .collect();
    let kept: HashSet<&str> = visits.iter().map(|v| v.id.as_str()).collect();

    let follows_parent = |visit_id: Option<&str>| match visit_id {
        Some(id) => kept.contains(id) || !known.contains(id),
        None => true,
    };

    let tests_before = tests.len();
    let tests: Vec<TestRecord> = tests
        .into_iter()
        .filter(|t| follows_parent(t.visit_id.as_deref()))
        .collect();
    let animals_before = animals.len();
    let animals: Vec<AnimalCase> = animals
        .into_iter()
        .filter(|a| follows_parent(a.visit_id.as_deref()))
        .collect();

    info!(
        start = %range.describe_start(),
        end = %range.describe_end(),
        visits_kept = visits.len(),
        visits_dropped = before - visits.len(),
        undated_dropped = undated,
        tests_kept = tests.len(),
        tests_dropped = tests_before - tests.len(),
        animals_dropped = animals_before - animals.len(),
        "Applied date range"
    );
    (visits, tests, animals)
}
