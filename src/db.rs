use crate::models::item::Item;
use crate::models::review::{NewReview, Review, UserId};
use crate::models::target::TargetRef;
use crate::registry::{EntityHandle, EntityRepository, RepositoryError};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Error, OptionalExtension, Row};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;


// Define a struct to represent a database connection
#[derive(Debug, Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    // Create a new database connection
    pub fn new(db_path: &str) -> Result<Self, Error> {
        let conn = Connection::open(db_path)?;
        info!("Database connection established at: {}", db_path);
        Ok(Database {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    // Create the database schema
    pub async fn create_schema(&self) -> Result<(), Error> {
        let conn = self.conn.lock().await;

        // 1. Items table
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS items (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT ''
            );",
        )
        .map_err(|e| {
            tracing::error!("Failed creating items table: {}", e);
            e
        })?;

        // 2. Reviews table, keyed to any registered kind by (target_type, target_pk)
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS reviews (
                id TEXT PRIMARY KEY,
                rating INTEGER NOT NULL CHECK (rating >= 0),
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                user_id TEXT,
                target_type TEXT NOT NULL,
                target_pk TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS reviews_by_target
                ON reviews (target_type, target_pk, created_at DESC);",
        )
        .map_err(|e| {
            tracing::error!("Failed creating reviews table: {}", e);
            e
        })?;
        Ok(())
    }

    // Insert or update an item
    pub async fn insert_item(&self, item: &Item) -> Result<(), Error> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO items (id, name, description)
            VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description",
            rusqlite::params![&item.id, &item.name, &item.description],
        )?;
        debug!("[DB] Item upserted: {}", item.id);
        Ok(())
    }

    pub async fn get_item(&self, item_id: &str) -> Result<Option<Item>, Error> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT id, name, description FROM items WHERE id = ?",
            [item_id],
            item_from_row,
        )
        .optional()
    }

    // Retrieve all items from the database
    pub async fn get_items(&self) -> Result<Vec<Item>, Error> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT id, name, description FROM items ORDER BY rowid")?;
        let items = stmt.query_map([], item_from_row)?;
        let mut result = Vec::new();
        for item in items {
            result.push(item?);
        }
        debug!("[DB] Fetched {} items from the database", result.len());
        Ok(result)
    }

    /// Stores a review, assigning its id and creation time.
    ///
    /// The timestamp is taken while the connection lock is held so that
    /// insertion order and `created_at` order agree.
    pub async fn insert_review(&self, review: NewReview) -> Result<Review, Error> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        let review = Review::from_parts(Uuid::new_v4(), Utc::now(), review);
        tx.execute(
            "INSERT INTO reviews
                (id, rating, title, content, created_at, user_id, target_type, target_pk)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            rusqlite::params![
                review.id().to_string(),
                i64::from(review.rating),
                &review.title,
                &review.content,
                format_timestamp(review.created_at()),
                review.user_id.as_ref().map(|u| u.0.as_str()),
                review.target.type_tag.to_string(),
                &review.target.primary_key,
            ],
        )?;

        tx.commit()?;
        debug!("[DB] Review {} stored for {}", review.id(), review.target);
        Ok(review)
    }

    // Retrieve the reviews of one target, most recent first
    pub async fn reviews_for_target(&self, target: &TargetRef) -> Result<Vec<Review>, Error> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, rating, title, content, created_at, user_id, target_type, target_pk
            FROM reviews
            WHERE target_type = ? AND target_pk = ?
            ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt.query_map(
            rusqlite::params![target.type_tag.to_string(), &target.primary_key],
            review_from_row,
        )?;
        rows.collect()
    }

    pub async fn count_reviews_for_target(&self, target: &TargetRef) -> Result<usize, Error> {
        let conn = self.conn.lock().await;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM reviews WHERE target_type = ? AND target_pk = ?",
            rusqlite::params![target.type_tag.to_string(), &target.primary_key],
            |row| row.get(0),
        )?;
        usize::try_from(count).map_err(|_| Error::IntegralValueOutOfRange(0, count))
    }
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    // Fixed-width so that text order matches time order
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn conversion_error<E>(index: usize, err: E) -> Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    Error::FromSqlConversionFailure(index, Type::Text, Box::new(err))
}

fn item_from_row(row: &Row<'_>) -> Result<Item, Error> {
    Ok(Item {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
    })
}

fn review_from_row(row: &Row<'_>) -> Result<Review, Error> {
    let id: String = row.get(0)?;
    let id = Uuid::parse_str(&id).map_err(|e| conversion_error(0, e))?;
    let rating: i64 = row.get(1)?;
    let rating = u16::try_from(rating).map_err(|_| Error::IntegralValueOutOfRange(1, rating))?;
    let created_at: String = row.get(4)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| conversion_error(4, e))?
        .with_timezone(&Utc);
    let type_tag: String = row.get(6)?;
    let type_tag = type_tag.parse().map_err(|e| conversion_error(6, e))?;

    let review = NewReview {
        rating,
        title: row.get(2)?,
        content: row.get(3)?,
        user_id: row.get::<_, Option<String>>(5)?.map(UserId),
        target: TargetRef::new(type_tag, row.get::<_, String>(7)?),
    };
    Ok(Review::from_parts(id, created_at, review))
}

/// Serves `catalog.item` lookups for the type registry.
#[derive(Debug, Clone)]
pub struct ItemRepository {
    db: Database,
}

impl ItemRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EntityRepository for ItemRepository {
    async fn find(&self, primary_key: &str) -> Result<Option<EntityHandle>, RepositoryError> {
        let item = self.db.get_item(primary_key).await?;
        Ok(item.map(|item| Arc::new(item) as EntityHandle))
    }
}
