//! Trait and types for reading paginated collections from a record store.

use crate::error::StoreError;
use serde_json::Value;

/// A named remote collection and the projection requested from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub name: String,
    pub select: String,
}

impl Collection {
    pub fn new(name: impl Into<String>, select: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            select: select.into(),
        }
    }

    /// Visits with the owner's district and state embedded.
    pub fn visits() -> Self {
        Self::new(
            "visits",
            "id,visit_date,created_at,owner_id,total_test_charge,\
             field_staff_id,field_staff_name,lab_assistant_id,lab_staff_name,\
             payment_status,sample_collected,report_sent,owners(district,state)",
        )
    }

    /// Tests with the linking visit row embedded.
    pub fn tests() -> Self {
        Self::new(
            "tests",
            "id,test_type,test_name,price,created_at,visit_animals(visit_id)",
        )
    }

    /// Animal-to-visit links with the animal's species embedded.
    pub fn visit_animals() -> Self {
        Self::new("visit_animals", "id,visit_id,animal_id,animals(species,breed)")
    }

    /// The employee directory.
    pub fn users() -> Self {
        Self::new("users", "id,name,role")
    }
}

/// One offset window of raw rows.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub rows: Vec<Value>,
    /// Total size of the collection, when the store reports one.
    pub total: Option<usize>,
}

/// Abstraction over a store that serves `[offset, offset + limit)` windows.
///
/// A window shorter than `limit` marks the end of the data.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    async fn fetch_page(
        &self,
        collection: &Collection,
        offset: usize,
        limit: usize,
    ) -> Result<Page, StoreError>;
}
