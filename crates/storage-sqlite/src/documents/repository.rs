use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::sqlite::SqliteConnection;
use log::debug;

use formdesk_core::documents::{
    Document, DocumentRepositoryTrait, FormType, Tier, UploadReceipt,
};
use formdesk_core::errors::{Error, Result, ValidationError};

use super::model::DocumentDB;
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::documents;

pub struct SqliteDocumentRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl SqliteDocumentRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        SqliteDocumentRepository { pool, writer }
    }
}

fn find_row(
    conn: &mut SqliteConnection,
    form_type: FormType,
    tier: Tier,
    id: &str,
) -> Result<Option<DocumentDB>> {
    Ok(documents::table
        .find((form_type.as_str(), tier.as_str(), id))
        .select(DocumentDB::as_select())
        .first::<DocumentDB>(conn)
        .optional()
        .map_err(StorageError::from)?)
}

fn upsert_row(conn: &mut SqliteConnection, row: &DocumentDB) -> Result<()> {
    diesel::replace_into(documents::table)
        .values(row)
        .execute(conn)
        .map_err(StorageError::from)?;
    Ok(())
}

fn clear_tier(conn: &mut SqliteConnection, form_type: FormType, tier: Tier) -> Result<usize> {
    Ok(diesel::delete(
        documents::table
            .filter(documents::form_type.eq(form_type.as_str()))
            .filter(documents::tier.eq(tier.as_str())),
    )
    .execute(conn)
    .map_err(StorageError::from)?)
}

fn delete_ids(
    conn: &mut SqliteConnection,
    form_type: FormType,
    tier: Tier,
    ids: &[String],
) -> Result<usize> {
    Ok(diesel::delete(
        documents::table
            .filter(documents::form_type.eq(form_type.as_str()))
            .filter(documents::tier.eq(tier.as_str()))
            .filter(documents::id.eq_any(ids.to_vec())),
    )
    .execute(conn)
    .map_err(StorageError::from)?)
}

fn workspace_ids(conn: &mut SqliteConnection, form_type: FormType) -> Result<HashSet<String>> {
    let ids = documents::table
        .filter(documents::form_type.eq(form_type.as_str()))
        .filter(documents::tier.eq(Tier::Workspace.as_str()))
        .select(documents::id)
        .load::<String>(conn)
        .map_err(StorageError::from)?;
    Ok(ids.into_iter().collect())
}

#[async_trait]
impl DocumentRepositoryTrait for SqliteDocumentRepository {
    fn get(&self, form_type: FormType, tier: Tier, id: &str) -> Result<Option<Document>> {
        let mut conn = get_connection(&self.pool)?;
        let row = find_row(&mut conn, form_type, tier, id)?;
        Ok(row.map(DocumentDB::into_document).transpose()?)
    }

    fn get_all(&self, form_type: FormType, tier: Tier) -> Result<Vec<Document>> {
        let mut conn = get_connection(&self.pool)?;
        let query = documents::table
            .filter(documents::form_type.eq(form_type.as_str()))
            .filter(documents::tier.eq(tier.as_str()))
            .select(DocumentDB::as_select())
            .into_boxed();
        let query = match tier {
            Tier::Workspace => query.order(documents::last_modified.desc()),
            Tier::Cache => query.order(documents::cloud_synced_at.desc()),
        };
        let rows = query
            .then_order_by(documents::id.asc())
            .load::<DocumentDB>(&mut conn)
            .map_err(StorageError::from)?;

        Ok(rows
            .into_iter()
            .map(DocumentDB::into_document)
            .collect::<std::result::Result<Vec<_>, _>>()?)
    }

    async fn put(&self, form_type: FormType, tier: Tier, document: Document) -> Result<Document> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Document> {
                let row = DocumentDB::new(form_type, tier, &document)?;
                match tier {
                    Tier::Workspace => {
                        delete_ids(conn, form_type, Tier::Cache, &[document.id.clone()])?;
                        clear_tier(conn, form_type, Tier::Workspace)?;
                    }
                    Tier::Cache => {
                        if find_row(conn, form_type, Tier::Workspace, &document.id)?.is_some() {
                            return Err(ValidationError::TierExclusivity {
                                form_type,
                                id: document.id.clone(),
                                tier: Tier::Workspace,
                            }
                            .into());
                        }
                    }
                }
                upsert_row(conn, &row)?;
                debug!("Stored {}/{} in {}", form_type, document.id, tier);
                Ok(document.with_provenance(tier))
            })
            .await
    }

    async fn delete(&self, form_type: FormType, tier: Tier, id: String) -> Result<bool> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<bool> {
                let affected = diesel::delete(
                    documents::table.find((form_type.as_str(), tier.as_str(), id.as_str())),
                )
                .execute(conn)
                .map_err(StorageError::from)?;
                Ok(affected > 0)
            })
            .await
    }

    async fn clear_and_repopulate(
        &self,
        form_type: FormType,
        tier: Tier,
        documents: Vec<Document>,
    ) -> Result<usize> {
        if tier == Tier::Workspace && documents.len() > 1 {
            return Err(ValidationError::WorkspaceOverflow(documents.len()).into());
        }

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let resident = match tier {
                    Tier::Workspace => {
                        let ids: Vec<String> = documents.iter().map(|d| d.id.clone()).collect();
                        delete_ids(conn, form_type, Tier::Cache, &ids)?;
                        HashSet::new()
                    }
                    Tier::Cache => workspace_ids(conn, form_type)?,
                };
                clear_tier(conn, form_type, tier)?;

                let mut stored = HashSet::new();
                for document in documents.iter().filter(|d| !resident.contains(&d.id)) {
                    upsert_row(conn, &DocumentDB::new(form_type, tier, document)?)?;
                    stored.insert(document.id.clone());
                }
                if stored.len() < documents.len() {
                    debug!(
                        "Repopulated {} {} with {} of {} documents",
                        form_type,
                        tier,
                        stored.len(),
                        documents.len()
                    );
                }
                Ok(stored.len())
            })
            .await
    }

    async fn move_atomic(
        &self,
        form_type: FormType,
        from: Tier,
        to: Tier,
        id: String,
        receipt: Option<UploadReceipt>,
    ) -> Result<Document> {
        if from == to {
            return Err(ValidationError::InvalidInput(format!(
                "cannot move {} within the {} tier",
                id, from
            ))
            .into());
        }

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Document> {
                let Some(row) = find_row(conn, form_type, from, &id)? else {
                    return Err(Error::TransitionConflict {
                        form_type,
                        id: id.clone(),
                        from,
                    });
                };
                delete_ids(conn, form_type, from, &[id.clone()])?;

                let mut document = row.into_document()?;
                document.enter_tier(to, Utc::now());
                if let Some(receipt) = &receipt {
                    receipt.apply(&mut document);
                }
                if to == Tier::Workspace {
                    clear_tier(conn, form_type, Tier::Workspace)?;
                }
                upsert_row(conn, &DocumentDB::new(form_type, to, &document)?)?;
                debug!("Moved {}/{} from {} to {}", form_type, id, from, to);
                Ok(document)
            })
            .await
    }

    async fn clear_partition(&self, form_type: FormType, tier: Tier) -> Result<usize> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                clear_tier(conn, form_type, tier)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formdesk_core::documents::{FormStorageService, FormStorageServiceTrait};
    use tempfile::tempdir;

    use crate::db::{create_pool, init, run_migrations, write_actor::spawn_writer};

    fn setup_db() -> (
        Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        WriteHandle,
    ) {
        let app_data = tempdir()
            .expect("tempdir")
            .keep()
            .to_string_lossy()
            .to_string();
        let db_path = init(&app_data).expect("init db");
        run_migrations(&db_path).expect("migrate db");
        let pool = create_pool(&db_path).expect("create pool");
        let writer = spawn_writer(pool.as_ref().clone());
        (pool, writer)
    }

    fn repository() -> SqliteDocumentRepository {
        let (pool, writer) = setup_db();
        SqliteDocumentRepository::new(pool, writer)
    }

    fn expense(title: &str) -> Document {
        let mut doc = Document::new(FormType::ExpenseReport, Utc::now());
        doc.title = title.into();
        doc
    }

    #[tokio::test]
    async fn workspace_holds_one_document_per_form() {
        let repo = repository();
        let first = expense("first");
        let second = expense("second");
        repo.put(FormType::ExpenseReport, Tier::Workspace, first.clone())
            .await
            .unwrap();
        repo.put(FormType::ExpenseReport, Tier::Workspace, second.clone())
            .await
            .unwrap();

        let workspace = repo.get_all(FormType::ExpenseReport, Tier::Workspace).unwrap();
        assert_eq!(workspace.len(), 1);
        assert_eq!(workspace[0].id, second.id);
        assert_eq!(workspace[0].provenance, Some(Tier::Workspace));

        let other = repo.get_all(FormType::TravelReport, Tier::Workspace).unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn workspace_put_evicts_cached_copy() {
        let repo = repository();
        let doc = expense("shared");
        repo.put(FormType::ExpenseReport, Tier::Cache, doc.clone())
            .await
            .unwrap();
        repo.put(FormType::ExpenseReport, Tier::Workspace, doc.clone())
            .await
            .unwrap();

        assert!(repo
            .get(FormType::ExpenseReport, Tier::Cache, &doc.id)
            .unwrap()
            .is_none());

        let err = repo
            .put(FormType::ExpenseReport, Tier::Cache, doc.clone())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::TierExclusivity { .. })
        ));
    }

    #[tokio::test]
    async fn move_between_tiers_is_atomic() {
        let repo = repository();
        let doc = expense("moving");
        repo.put(FormType::ExpenseReport, Tier::Workspace, doc.clone())
            .await
            .unwrap();

        let moved = repo
            .move_atomic(
                FormType::ExpenseReport,
                Tier::Workspace,
                Tier::Cache,
                doc.id.clone(),
                None,
            )
            .await
            .unwrap();
        assert!(moved.is_read_only);
        assert_eq!(moved.provenance, Some(Tier::Cache));
        assert!(repo
            .get_all(FormType::ExpenseReport, Tier::Workspace)
            .unwrap()
            .is_empty());

        let back = repo
            .move_atomic(
                FormType::ExpenseReport,
                Tier::Cache,
                Tier::Workspace,
                doc.id.clone(),
                None,
            )
            .await
            .unwrap();
        assert!(!back.is_read_only);
        assert!(back.moved_to_workspace_at.is_some());
        assert!(repo
            .get_all(FormType::ExpenseReport, Tier::Cache)
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn move_with_receipt_persists_remote_identity() {
        let repo = repository();
        let mut doc = expense("uploaded");
        doc.is_draft = true;
        repo.put(FormType::ExpenseReport, Tier::Workspace, doc.clone())
            .await
            .unwrap();

        let receipt = UploadReceipt {
            remote_file_id: "remote-42".into(),
            remote_modified_time: Some("2026-03-01T10:00:00Z".into()),
            uploaded_at: Utc::now(),
        };
        repo.move_atomic(
            FormType::ExpenseReport,
            Tier::Workspace,
            Tier::Cache,
            doc.id.clone(),
            Some(receipt.clone()),
        )
        .await
        .unwrap();

        let stored = repo
            .get(FormType::ExpenseReport, Tier::Cache, &doc.id)
            .unwrap()
            .expect("cached row");
        assert_eq!(stored.cloud_file_id.as_deref(), Some("remote-42"));
        assert_eq!(
            stored.cloud_modified_time.as_deref(),
            Some("2026-03-01T10:00:00Z")
        );
        assert!(stored.uploaded_at.is_some());
        assert!(!stored.is_draft);
        assert!(stored.is_read_only);
    }

    #[tokio::test]
    async fn move_of_missing_document_changes_nothing() {
        let repo = repository();
        let cached = expense("cached");
        repo.put(FormType::ExpenseReport, Tier::Cache, cached.clone())
            .await
            .unwrap();

        let err = repo
            .move_atomic(
                FormType::ExpenseReport,
                Tier::Workspace,
                Tier::Cache,
                "missing".into(),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TransitionConflict { .. }));
        assert_eq!(
            repo.get_all(FormType::ExpenseReport, Tier::Cache).unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn move_to_workspace_replaces_existing_workspace_document() {
        let repo = repository();
        let draft = expense("draft");
        let cached = expense("cached");
        repo.put(FormType::ExpenseReport, Tier::Workspace, draft.clone())
            .await
            .unwrap();
        repo.put(FormType::ExpenseReport, Tier::Cache, cached.clone())
            .await
            .unwrap();

        repo.move_atomic(
            FormType::ExpenseReport,
            Tier::Cache,
            Tier::Workspace,
            cached.id.clone(),
            None,
        )
        .await
        .unwrap();

        let workspace = repo.get_all(FormType::ExpenseReport, Tier::Workspace).unwrap();
        assert_eq!(workspace.len(), 1);
        assert_eq!(workspace[0].id, cached.id);
    }

    #[tokio::test]
    async fn cache_refresh_skips_workspace_ids_and_dedupes() {
        let repo = repository();
        let local = expense("local");
        repo.put(FormType::ExpenseReport, Tier::Workspace, local.clone())
            .await
            .unwrap();
        repo.put(FormType::ExpenseReport, Tier::Cache, expense("stale"))
            .await
            .unwrap();

        let fresh = expense("fresh");
        let count = repo
            .clear_and_repopulate(
                FormType::ExpenseReport,
                Tier::Cache,
                vec![local.clone(), fresh.clone(), fresh.clone()],
            )
            .await
            .unwrap();
        assert_eq!(count, 1);

        let cache = repo.get_all(FormType::ExpenseReport, Tier::Cache).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache[0].id, fresh.id);
        assert!(repo
            .get(FormType::ExpenseReport, Tier::Workspace, &local.id)
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn cache_is_ordered_by_most_recent_sync() {
        let repo = repository();
        let now = Utc::now();
        let mut older = expense("older");
        older.cloud_synced_at = Some(now - chrono::Duration::hours(2));
        let mut newer = expense("newer");
        newer.cloud_synced_at = Some(now);

        repo.clear_and_repopulate(
            FormType::ExpenseReport,
            Tier::Cache,
            vec![older.clone(), newer.clone()],
        )
        .await
        .unwrap();

        let cache = repo.get_all(FormType::ExpenseReport, Tier::Cache).unwrap();
        let titles: Vec<&str> = cache.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(titles, vec!["newer", "older"]);
    }

    #[tokio::test]
    async fn workspace_repopulate_rejects_more_than_one_document() {
        let repo = repository();
        let err = repo
            .clear_and_repopulate(
                FormType::ExpenseReport,
                Tier::Workspace,
                vec![expense("a"), expense("b")],
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::WorkspaceOverflow(2))
        ));
    }

    #[tokio::test]
    async fn clear_partition_only_touches_one_tier() {
        let repo = repository();
        repo.put(FormType::ExpenseReport, Tier::Workspace, expense("ws"))
            .await
            .unwrap();
        repo.put(FormType::ExpenseReport, Tier::Cache, expense("c1"))
            .await
            .unwrap();
        repo.put(FormType::ExpenseReport, Tier::Cache, expense("c2"))
            .await
            .unwrap();

        let removed = repo
            .clear_partition(FormType::ExpenseReport, Tier::Cache)
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(
            repo.get_all(FormType::ExpenseReport, Tier::Workspace)
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn storage_service_round_trip_over_sqlite() {
        let repo: Arc<dyn DocumentRepositoryTrait> = Arc::new(repository());
        let service = FormStorageService::new(repo);

        let saved = service
            .save_to_workspace(
                FormType::TravelReport,
                Document::new(FormType::TravelReport, Utc::now()),
            )
            .await
            .unwrap();
        let cached = service
            .move_to_cache(FormType::TravelReport, &saved.id)
            .await
            .unwrap();
        assert!(cached.is_read_only);

        let reopened = service
            .move_to_workspace(FormType::TravelReport, &saved.id)
            .await
            .unwrap();
        assert!(!reopened.is_read_only);

        let stats = service.storage_stats(FormType::TravelReport).unwrap();
        assert_eq!(stats.workspace_count, 1);
        assert_eq!(stats.cache_count, 0);
    }
}
