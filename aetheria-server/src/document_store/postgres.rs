//! PostgreSQL implementation of the document store.

use aetheria_core::store::{Direction, Document, DocumentStore, Query, QueryResult, StoredDocument};
use aetheria_core::Result;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::DocumentStoreError;

/// PostgreSQL-backed document store.
///
/// Ordering on any top-level field is always honored, so query results
/// report `ordered = true`. Timestamps are stored as fixed-width RFC 3339
/// strings and compare correctly under byte collation.
#[derive(Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

/// Row type for database queries.
#[derive(FromRow)]
struct DocumentRow {
    id: Uuid,
    seq: i64,
    fields: Json<Document>,
}

impl From<DocumentRow> for StoredDocument {
    fn from(row: DocumentRow) -> Self {
        Self {
            id: row.id.to_string(),
            sequence: u64::try_from(row.seq).unwrap_or_default(),
            fields: row.fields.0,
        }
    }
}

impl PostgresDocumentStore {
    /// Connect to the database and apply migrations.
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> std::result::Result<Self, DocumentStoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .connect(database_url)
            .await
            .map_err(|e| DocumentStoreError::Connection(e.to_string()))?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        tracing::info!("Document store connected and migrations applied");

        Ok(Self { pool })
    }

    /// Create a document store from an existing pool (for testing).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build the containment object for all equality filters.
    fn containment(query: &Query) -> Value {
        let mut object = Document::new();
        for filter in &query.filters {
            object.insert(filter.field.clone(), filter.value.clone());
        }
        Value::Object(object)
    }

    async fn run_query(
        &self,
        collection: &str,
        query: &Query,
    ) -> std::result::Result<Vec<DocumentRow>, DocumentStoreError> {
        let filter = Self::containment(query);

        let rows = match &query.order_by {
            Some(order) => {
                if order.field.is_empty() {
                    return Err(DocumentStoreError::InvalidInput(
                        "order field must not be empty".into(),
                    ));
                }
                // Direction cannot be bound as a parameter.
                let sql = match order.direction {
                    Direction::Ascending => {
                        r#"
                        SELECT id, seq, fields FROM documents
                        WHERE collection = $1 AND fields @> $2
                        ORDER BY fields->>$3 COLLATE "C" ASC NULLS FIRST, seq ASC
                        "#
                    }
                    Direction::Descending => {
                        r#"
                        SELECT id, seq, fields FROM documents
                        WHERE collection = $1 AND fields @> $2
                        ORDER BY fields->>$3 COLLATE "C" DESC NULLS LAST, seq ASC
                        "#
                    }
                };
                sqlx::query_as::<_, DocumentRow>(sql)
                    .bind(collection)
                    .bind(&filter)
                    .bind(&order.field)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as::<_, DocumentRow>(
                    r#"
                    SELECT id, seq, fields FROM documents
                    WHERE collection = $1 AND fields @> $2
                    ORDER BY seq ASC
                    "#,
                )
                .bind(collection)
                .bind(&filter)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows)
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn insert(&self, collection: &str, fields: Document) -> Result<String> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO documents (id, collection, fields)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(id)
        .bind(collection)
        .bind(Json(&fields))
        .execute(&self.pool)
        .await
        .map_err(DocumentStoreError::from)?;

        tracing::debug!(collection, id = %id, "Inserted document");

        Ok(id.to_string())
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<QueryResult> {
        let rows = self.run_query(collection, query).await?;
        Ok(QueryResult {
            documents: rows.into_iter().map(Into::into).collect(),
            ordered: true,
        })
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>> {
        // Ids are always UUIDs here; anything else cannot exist.
        let Ok(id) = Uuid::parse_str(id) else {
            return Ok(None);
        };

        let row: Option<DocumentRow> = sqlx::query_as(
            r#"
            SELECT id, seq, fields FROM documents
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DocumentStoreError::from)?;

        Ok(row.map(Into::into))
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
