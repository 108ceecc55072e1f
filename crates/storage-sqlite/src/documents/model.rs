//! Row model for the `documents` table. The full envelope lives in `payload`;
//! the other columns exist for lookups and ordering.

use chrono::{DateTime, SecondsFormat, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use formdesk_core::documents::{Document, FormType, Tier};

use crate::errors::StorageError;

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    Debug,
    Clone,
    Serialize,
    Deserialize,
)]
#[diesel(primary_key(form_type, tier, id))]
#[diesel(table_name = crate::schema::documents)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DocumentDB {
    pub form_type: String,
    pub tier: String,
    pub id: String,
    pub doc_number: String,
    pub title: String,
    pub payload: String,
    pub last_modified: Option<String>,
    pub cloud_synced_at: Option<String>,
    pub updated_at: String,
}

fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl DocumentDB {
    pub fn new(form_type: FormType, tier: Tier, document: &Document) -> Result<Self, StorageError> {
        Ok(Self {
            form_type: form_type.as_str().to_string(),
            tier: tier.as_str().to_string(),
            id: document.id.clone(),
            doc_number: document.doc_number.clone(),
            title: document.title.clone(),
            payload: serde_json::to_string(document)?,
            last_modified: Some(timestamp(document.modified_at())),
            cloud_synced_at: document.cloud_synced_at.map(timestamp),
            updated_at: timestamp(document.updated_at),
        })
    }

    pub fn into_document(self) -> Result<Document, StorageError> {
        let tier: Tier = self
            .tier
            .parse()
            .map_err(|_| StorageError::Corrupt(format!("unknown tier '{}'", self.tier)))?;
        let document: Document = serde_json::from_str(&self.payload)?;
        if document.id != self.id {
            return Err(StorageError::Corrupt(format!(
                "row {} holds payload for {}",
                self.id, document.id
            )));
        }
        Ok(document.with_provenance(tier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_keeps_envelope_and_restores_provenance() {
        let mut doc = Document::new(FormType::PurchaseOrder, Utc::now());
        doc.title = "Office chairs".into();
        doc.enter_tier(Tier::Cache, Utc::now());

        let row = DocumentDB::new(FormType::PurchaseOrder, Tier::Cache, &doc).unwrap();
        assert_eq!(row.form_type, "purchase-order");
        assert_eq!(row.tier, "cache");
        assert!(row.cloud_synced_at.is_some());

        let restored = row.into_document().unwrap();
        assert_eq!(restored.title, "Office chairs");
        assert_eq!(restored.provenance, Some(Tier::Cache));
        assert!(restored.is_read_only);
    }

    #[test]
    fn unknown_tier_is_reported_as_corrupt() {
        let doc = Document::new(FormType::ExpenseReport, Utc::now());
        let mut row = DocumentDB::new(FormType::ExpenseReport, Tier::Workspace, &doc).unwrap();
        row.tier = "archive".into();
        assert!(matches!(row.into_document(), Err(StorageError::Corrupt(_))));
    }
}
