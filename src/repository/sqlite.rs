//! SQLite record store (durable, one database file per device)

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Pool, Sqlite,
};
use tokio::sync::broadcast;

use super::{change_channel, RecordStore, StoreChange, SCHEMA_VERSION};
use crate::{
    config::DatabaseConfig,
    error::{AppError, AppResult},
    models::{NewVisit, Photo, Visit, VisitId, Visitor, VisitorFields, VisitorId},
};

#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    changes: broadcast::Sender<StoreChange>,
}

impl SqliteStore {
    /// Open (creating if needed) the database file and bring the schema up to date
    pub async fn open(config: &DatabaseConfig) -> AppResult<Self> {
        if config.path == ":memory:" {
            return Self::in_memory().await;
        }

        if let Some(parent) = Path::new(&config.path).parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::StorageUnavailable(format!(
                    "cannot create {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", config.path))
            .map_err(|e| AppError::StorageUnavailable(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(|e| {
                AppError::StorageUnavailable(format!("cannot open {}: {}", config.path, e))
            })?;

        tracing::info!("Opened database: {}", config.path);

        Self::from_pool(pool).await
    }

    /// Private in-memory database, mostly for tests
    pub async fn in_memory() -> AppResult<Self> {
        // Each connection to :memory: is a separate database, so keep exactly one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| AppError::StorageUnavailable(e.to_string()))?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool and run the embedded migrations
    pub async fn from_pool(pool: Pool<Sqlite>) -> AppResult<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;

        let version: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM _sqlx_migrations")
            .fetch_one(&pool)
            .await?;
        if version != Some(SCHEMA_VERSION) {
            tracing::warn!(
                "Database schema version {:?} differs from expected {}",
                version,
                SCHEMA_VERSION
            );
        }

        Ok(Self {
            pool,
            changes: change_channel(),
        })
    }

    fn publish(&self, change: StoreChange) {
        // No subscribers is fine
        let _ = self.changes.send(change);
    }
}

fn map_visitor_insert_error(e: sqlx::Error, national_id: &str) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return AppError::ConstraintViolation(format!(
                "Visitor with national ID {} already exists",
                national_id
            ));
        }
    }
    AppError::Database(e)
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn create_visitor(&self, draft: &VisitorFields) -> AppResult<VisitorId> {
        let result = sqlx::query(
            r#"
            INSERT INTO visitors
                (last_name, first_names, birth_date, birth_place, phone,
                 national_id_number, occupation, front_photo, back_photo)
            VALUES (?, ?, ?, ?, ?, ?, ?, NULL, NULL)
            "#,
        )
        .bind(&draft.last_name)
        .bind(&draft.first_names)
        .bind(draft.birth_date)
        .bind(&draft.birth_place)
        .bind(&draft.phone)
        .bind(&draft.national_id_number)
        .bind(&draft.occupation)
        .execute(&self.pool)
        .await
        .map_err(|e| map_visitor_insert_error(e, &draft.national_id_number))?;

        let id = result.last_insert_rowid();
        self.publish(StoreChange::VisitorCreated(id));
        Ok(id)
    }

    async fn get_visitor(&self, id: VisitorId) -> AppResult<Option<Visitor>> {
        let visitor = sqlx::query_as::<_, Visitor>("SELECT * FROM visitors WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(visitor)
    }

    async fn get_visitor_by_national_id(&self, national_id: &str) -> AppResult<Option<Visitor>> {
        let visitor =
            sqlx::query_as::<_, Visitor>("SELECT * FROM visitors WHERE national_id_number = ?")
                .bind(national_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(visitor)
    }

    async fn list_visitors(&self) -> AppResult<Vec<Visitor>> {
        let rows = sqlx::query_as::<_, Visitor>("SELECT * FROM visitors ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn delete_visitor(&self, id: VisitorId) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let visits = sqlx::query("DELETE FROM visits WHERE visitor_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let visitors = sqlx::query("DELETE FROM visitors WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        if visitors.rows_affected() > 0 || visits.rows_affected() > 0 {
            tracing::debug!(
                "Deleted visitor {} and {} visits",
                id,
                visits.rows_affected()
            );
            self.publish(StoreChange::VisitorDeleted(id));
        }
        Ok(())
    }

    async fn update_visitor_photos(
        &self,
        id: VisitorId,
        front: Option<Photo>,
        back: Option<Photo>,
    ) -> AppResult<()> {
        let result = sqlx::query("UPDATE visitors SET front_photo = ?, back_photo = ? WHERE id = ?")
            .bind(front)
            .bind(back)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::visitor_not_found(id));
        }
        self.publish(StoreChange::VisitorPhotosUpdated(id));
        Ok(())
    }

    async fn create_visit(&self, draft: &NewVisit) -> AppResult<VisitId> {
        let result = sqlx::query(
            r#"
            INSERT INTO visits
                (visitor_id, national_id_number, visit_date, entry_time, exit_time, reason, notes)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(draft.visitor_id)
        .bind(&draft.national_id_number)
        .bind(draft.visit_date)
        .bind(&draft.entry_time)
        .bind(&draft.exit_time)
        .bind(&draft.reason)
        .bind(&draft.notes)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.publish(StoreChange::VisitCreated(id));
        Ok(id)
    }

    async fn list_visits_by_national_id(&self, national_id: &str) -> AppResult<Vec<Visit>> {
        let rows =
            sqlx::query_as::<_, Visit>("SELECT * FROM visits WHERE national_id_number = ?")
                .bind(national_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }

    async fn list_visits(&self) -> AppResult<Vec<Visit>> {
        let rows = sqlx::query_as::<_, Visit>("SELECT * FROM visits ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn update_visit_exit(&self, id: VisitId, exit_time: &str) -> AppResult<bool> {
        let result = sqlx::query("UPDATE visits SET exit_time = ? WHERE id = ?")
            .bind(exit_time)
            .bind(id)
            .execute(&self.pool)
            .await?;

        let updated = result.rows_affected() > 0;
        if updated {
            self.publish(StoreChange::VisitUpdated(id));
        }
        Ok(updated)
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    async fn health_check(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fields(national_id: &str) -> VisitorFields {
        VisitorFields {
            last_name: "Doe".into(),
            first_names: "John".into(),
            birth_date: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            birth_place: "Abidjan".into(),
            phone: "0102030405".into(),
            national_id_number: national_id.into(),
            occupation: "Engineer".into(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_insert_leaves_no_row() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.create_visitor(&fields("123456789012")).await.unwrap();

        let err = store.create_visitor(&fields("123456789012")).await.unwrap_err();
        assert!(err.is_constraint_violation());
        assert_eq!(store.list_visitors().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ids_not_reused_after_delete() {
        let store = SqliteStore::in_memory().await.unwrap();
        let first = store.create_visitor(&fields("AAAAAAAA1")).await.unwrap();
        store.delete_visitor(first).await.unwrap();

        let second = store.create_visitor(&fields("AAAAAAAA1")).await.unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_file_database_survives_reopen() {
        let dir = std::env::temp_dir().join(format!("guerite-test-{}", std::process::id()));
        let config = DatabaseConfig {
            path: dir.join("guerite.db").display().to_string(),
            ..DatabaseConfig::default()
        };

        {
            let store = SqliteStore::open(&config).await.unwrap();
            store.create_visitor(&fields("PERSIST001")).await.unwrap();
            store.pool.close().await;
        }

        let store = SqliteStore::open(&config).await.unwrap();
        let visitor = store.get_visitor_by_national_id("PERSIST001").await.unwrap();
        assert!(visitor.is_some());
        store.pool.close().await;

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_publishes_changes() {
        let store = SqliteStore::in_memory().await.unwrap();
        let mut changes = store.subscribe();

        let id = store.create_visitor(&fields("123456789012")).await.unwrap();
        assert_eq!(changes.recv().await.unwrap(), StoreChange::VisitorCreated(id));

        // Nothing to delete, nothing published
        store.delete_visitor(id + 100).await.unwrap();
        store.delete_visitor(id).await.unwrap();
        assert_eq!(changes.recv().await.unwrap(), StoreChange::VisitorDeleted(id));
    }
}
