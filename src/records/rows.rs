//! Rows as served by the store, before normalization.

use rust_decimal::Decimal;
use serde::Deserialize;

use super::de;
use crate::fetch::Record;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OwnerRef {
    #[serde(default, deserialize_with = "de::opt_text")]
    pub district: Option<String>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub state: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VisitRow {
    #[serde(deserialize_with = "de::id")]
    pub id: String,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub visit_date: Option<String>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "de::opt_id")]
    pub owner_id: Option<String>,
    /// Test charges only; collection charges are not revenue.
    #[serde(default, deserialize_with = "de::money")]
    pub total_test_charge: Decimal,
    #[serde(default, deserialize_with = "de::opt_id")]
    pub field_staff_id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub field_staff_name: Option<String>,
    #[serde(default, deserialize_with = "de::opt_id")]
    pub lab_assistant_id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub lab_staff_name: Option<String>,
    #[serde(default, deserialize_with = "de::flag")]
    pub payment_status: bool,
    #[serde(default, deserialize_with = "de::flag")]
    pub sample_collected: bool,
    #[serde(default, deserialize_with = "de::flag")]
    pub report_sent: bool,
    #[serde(default, deserialize_with = "de::embedded")]
    pub owners: Option<OwnerRef>,
    /// Flat district column, for stores that denormalize the owner.
    #[serde(default, deserialize_with = "de::opt_text")]
    pub district: Option<String>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub state: Option<String>,
}

impl VisitRow {
    pub fn raw_district(&self) -> Option<&str> {
        self.owners
            .as_ref()
            .and_then(|o| o.district.as_deref())
            .or(self.district.as_deref())
    }

    pub fn raw_state(&self) -> Option<&str> {
        self.owners
            .as_ref()
            .and_then(|o| o.state.as_deref())
            .or(self.state.as_deref())
    }
}

impl Record for VisitRow {
    fn record_id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VisitAnimalRef {
    #[serde(default, deserialize_with = "de::opt_id")]
    pub visit_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestRow {
    #[serde(deserialize_with = "de::id")]
    pub id: String,
    #[serde(default, deserialize_with = "de::opt_id")]
    pub visit_id: Option<String>,
    #[serde(default, deserialize_with = "de::embedded")]
    pub visit_animals: Option<VisitAnimalRef>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub test_type: Option<String>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub test_name: Option<String>,
    #[serde(default, deserialize_with = "de::money")]
    pub price: Decimal,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub created_at: Option<String>,
}

impl TestRow {
    /// Parent visit, from the flat column or the embedded link row.
    pub fn parent_visit_id(&self) -> Option<&str> {
        self.visit_id.as_deref().or_else(|| {
            self.visit_animals
                .as_ref()
                .and_then(|va| va.visit_id.as_deref())
        })
    }
}

impl Record for TestRow {
    fn record_id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserRow {
    #[serde(deserialize_with = "de::id")]
    pub id: String,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub role: Option<String>,
}

impl Record for UserRow {
    fn record_id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnimalRef {
    #[serde(default, deserialize_with = "de::opt_text")]
    pub species: Option<String>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub breed: Option<String>,
}

/// One animal brought to one visit.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VisitAnimalRow {
    #[serde(deserialize_with = "de::id")]
    pub id: String,
    #[serde(default, deserialize_with = "de::opt_id")]
    pub visit_id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_id")]
    pub animal_id: Option<String>,
    #[serde(default, deserialize_with = "de::embedded")]
    pub animals: Option<AnimalRef>,
}

impl Record for VisitAnimalRow {
    fn record_id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_visit_row_with_embedded_owner() {
        let row: VisitRow = serde_json::from_value(json!({
            "id": 17,
            "visit_date": "2024-03-15",
            "total_test_charge": "850.00",
            "collection_charges": 200,
            "field_staff_id": null,
            "lab_assistant_id": "E7",
            "payment_status": true,
            "owners": { "district": "Trivandrum", "state": "Kerala" }
        }))
        .unwrap();

        assert_eq!(row.id, "17");
        assert_eq!(row.total_test_charge, dec!(850.00));
        assert_eq!(row.raw_district(), Some("Trivandrum"));
        assert_eq!(row.lab_assistant_id.as_deref(), Some("E7"));
        assert!(row.payment_status);
        assert!(!row.report_sent);
    }

    #[test]
    fn test_visit_row_with_null_owner_and_flat_district() {
        let row: VisitRow = serde_json::from_value(json!({
            "id": "v1",
            "owners": null,
            "district": "Calicut"
        }))
        .unwrap();

        assert_eq!(row.raw_district(), Some("Calicut"));
        assert_eq!(row.raw_state(), None);
    }

    #[test]
    fn test_test_row_parent_from_embedded_link() {
        let row: TestRow = serde_json::from_value(json!({
            "id": 9,
            "test_type": "Blood",
            "test_name": "CBC",
            "price": 300,
            "visit_animals": [{ "visit_id": 17 }]
        }))
        .unwrap();

        assert_eq!(row.parent_visit_id(), Some("17"));
    }

    #[test]
    fn test_test_row_flat_parent_wins() {
        let row: TestRow = serde_json::from_value(json!({
            "id": 9,
            "visit_id": "v2",
            "visit_animals": { "visit_id": "v3" }
        }))
        .unwrap();

        assert_eq!(row.parent_visit_id(), Some("v2"));
    }

    #[test]
    fn test_visit_animal_row_with_embedded_animal() {
        let row: VisitAnimalRow = serde_json::from_value(json!({
            "id": 4,
            "visit_id": 17,
            "animal_id": "a9",
            "animals": { "species": "Canine", "breed": null }
        }))
        .unwrap();

        assert_eq!(row.visit_id.as_deref(), Some("17"));
        let animal = row.animals.unwrap();
        assert_eq!(animal.species.as_deref(), Some("Canine"));
        assert_eq!(animal.breed, None);
    }
}
