use {
    super::{AuditQuery, AuditStore, SortOrder},
    crate::domain::audit::{AuditAction, AuditRecord, NewAuditRecord},
    crate::domain::changeset::ChangeSet,
    crate::domain::error::AuditError,
    crate::domain::id::{ActorRef, RecordRef, RecordType},
    chrono::{DateTime, Utc},
    sqlx::PgPool,
    std::{future::Future, pin::Pin},
    uuid::Uuid,
};

/// Append-only `audit_records` table. The partial schema contract this store
/// relies on lives in `migrations/`: a unique index on
/// `(record_type, record_id, version)` plus lookup indexes on the record and
/// actor pairs.
#[derive(Debug, Clone)]
pub struct PostgresAuditStore {
    pool: PgPool,
}

impl PostgresAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), AuditError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AuditError::Database(sqlx::Error::Migrate(Box::new(e))))
    }
}

#[derive(sqlx::FromRow)]
struct AuditRow {
    id: Uuid,
    record_type: String,
    record_id: Uuid,
    actor_type: Option<String>,
    actor_id: Option<Uuid>,
    origin: Option<String>,
    action: String,
    changes: serde_json::Value,
    comment: Option<String>,
    version: i64,
    created_at: DateTime<Utc>,
}

impl AuditRow {
    fn into_record(self) -> Result<AuditRecord, AuditError> {
        let action = AuditAction::try_from(self.action.as_str())?;
        let actor = match (self.actor_type, self.actor_id) {
            (Some(t), Some(id)) => Some(ActorRef::new(RecordType::new(t)?, id)),
            _ => None,
        };

        Ok(NewAuditRecord {
            record: RecordRef::new(RecordType::new(self.record_type)?, self.record_id),
            actor,
            origin: self.origin,
            action,
            changes: ChangeSet::from_value(action, self.changes)?,
            comment: self.comment,
            version: self.version,
            created_at: self.created_at,
        }
        .into_record(self.id))
    }
}

const SELECT_COLUMNS: &str = "SELECT id, record_type, record_id, actor_type, actor_id, origin, \
     action, changes, comment, version, created_at FROM audit_records";

impl AuditStore for PostgresAuditStore {
    fn append(
        &self,
        record: NewAuditRecord,
    ) -> Pin<Box<dyn Future<Output = Result<AuditRecord, AuditError>> + Send + '_>> {
        Box::pin(async move {
            let id = Uuid::now_v7();
            let changes = record.changes.to_value()?;

            let result = sqlx::query(
                r#"
                INSERT INTO audit_records
                    (id, record_type, record_id, actor_type, actor_id, origin,
                     action, changes, comment, version, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(id)
            .bind(record.record.record_type().as_str())
            .bind(record.record.record_id())
            .bind(record.actor.as_ref().map(|a| a.actor_type().as_str()))
            .bind(record.actor.as_ref().map(|a| a.actor_id()))
            .bind(record.origin.as_deref())
            .bind(record.action.as_str())
            .bind(&changes)
            .bind(record.comment.as_deref())
            .bind(record.version)
            .bind(record.created_at)
            .execute(&self.pool)
            .await;

            match result {
                Ok(_) => Ok(record.into_record(id)),
                Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                    Err(AuditError::VersionConflict {
                        record_type: record.record.record_type().as_str().to_string(),
                        record_id: record.record.record_id(),
                        version: record.version,
                    })
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    fn max_version<'a>(
        &'a self,
        record: &'a RecordRef,
    ) -> Pin<Box<dyn Future<Output = Result<Option<i64>, AuditError>> + Send + 'a>> {
        Box::pin(async move {
            let max: Option<i64> = sqlx::query_scalar(
                "SELECT MAX(version) FROM audit_records WHERE record_type = $1 AND record_id = $2",
            )
            .bind(record.record_type().as_str())
            .bind(record.record_id())
            .fetch_one(&self.pool)
            .await?;

            Ok(max)
        })
    }

    fn query<'a>(
        &'a self,
        record: &'a RecordRef,
        query: &'a AuditQuery,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<AuditRecord>, AuditError>> + Send + 'a>> {
        Box::pin(async move {
            let mut qb = sqlx::QueryBuilder::new(SELECT_COLUMNS);
            qb.push(" WHERE record_type = ")
                .push_bind(record.record_type().as_str());
            qb.push(" AND record_id = ").push_bind(record.record_id());

            if let Some(action) = query.action {
                qb.push(" AND action = ").push_bind(action.as_str());
            }
            if let Some(until) = query.up_until {
                qb.push(" AND created_at <= ").push_bind(until);
            }
            if let Some(from) = query.from_version {
                qb.push(" AND version >= ").push_bind(from);
            }
            if let Some(to) = query.to_version {
                qb.push(" AND version <= ").push_bind(to);
            }
            qb.push(match query.order {
                SortOrder::VersionAsc => " ORDER BY version ASC",
                SortOrder::VersionDesc => " ORDER BY version DESC",
            });

            let rows: Vec<AuditRow> = qb.build_query_as().fetch_all(&self.pool).await?;
            rows.into_iter().map(AuditRow::into_record).collect()
        })
    }

    fn find(
        &self,
        audit_id: Uuid,
    ) -> Pin<Box<dyn Future<Output = Result<Option<AuditRecord>, AuditError>> + Send + '_>> {
        Box::pin(async move {
            let row: Option<AuditRow> =
                sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = $1"))
                    .bind(audit_id)
                    .fetch_optional(&self.pool)
                    .await?;

            row.map(AuditRow::into_record).transpose()
        })
    }

    fn actor_trail<'a>(
        &'a self,
        actor: &'a ActorRef,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<AuditRecord>, AuditError>> + Send + 'a>> {
        Box::pin(async move {
            let rows: Vec<AuditRow> = sqlx::query_as(&format!(
                "{SELECT_COLUMNS} WHERE actor_type = $1 AND actor_id = $2 \
                 ORDER BY created_at DESC, version DESC"
            ))
            .bind(actor.actor_type().as_str())
            .bind(actor.actor_id())
            .fetch_all(&self.pool)
            .await?;

            rows.into_iter().map(AuditRow::into_record).collect()
        })
    }
}
