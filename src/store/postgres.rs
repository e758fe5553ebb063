//! PostgreSQL backend.
//!
//! Rows live in `registrant_rows`, ordered by a serial `position`. A row's
//! index is its rank in that order plus one, so deleting a row shifts later
//! indexes up exactly like a spreadsheet.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;
use tracing::info;

use super::{data_offset, RecordStore, RowIndex, FIRST_DATA_ROW};
use crate::errors::StoreError;

/// Create the row table if it does not exist yet
pub async fn init_database_schema(pool: &PgPool) -> Result<(), StoreError> {
    info!("Initializing registrant row table");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS registrant_rows (
            position BIGSERIAL PRIMARY KEY,
            cells TEXT[] NOT NULL DEFAULT '{}'
        )",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Store backed by a PostgreSQL table
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and make sure the schema exists
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url).await?;
        init_database_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    async fn position_of(&self, index: RowIndex) -> Result<i64, StoreError> {
        let offset = data_offset(index)? as i64;
        let row = sqlx::query("SELECT position FROM registrant_rows ORDER BY position OFFSET $1 LIMIT 1")
            .bind(offset)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(row.try_get("position")?),
            None => Err(StoreError::RowOutOfRange(index)),
        }
    }
}

fn decode_cells(cells: Vec<Option<String>>) -> Vec<String> {
    cells.into_iter().map(Option::unwrap_or_default).collect()
}

#[async_trait]
impl RecordStore for PostgresStore {
    async fn rows(&self) -> Result<Vec<Vec<String>>, StoreError> {
        let rows = sqlx::query("SELECT cells FROM registrant_rows ORDER BY position")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| -> Result<Vec<String>, StoreError> { Ok(decode_cells(row.try_get("cells")?)) })
            .collect()
    }

    async fn row(&self, index: RowIndex) -> Result<Option<Vec<String>>, StoreError> {
        if index < FIRST_DATA_ROW {
            return Ok(None);
        }
        let offset = (index - FIRST_DATA_ROW) as i64;
        let row = sqlx::query("SELECT cells FROM registrant_rows ORDER BY position OFFSET $1 LIMIT 1")
            .bind(offset)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(decode_cells(row.try_get("cells")?))),
            None => Ok(None),
        }
    }

    async fn write_row(&self, index: RowIndex, values: &[String]) -> Result<(), StoreError> {
        let position = self.position_of(index).await?;
        sqlx::query("UPDATE registrant_rows SET cells = $1 WHERE position = $2")
            .bind(values.to_vec())
            .bind(position)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn write_cell(&self, index: RowIndex, column: usize, value: &str) -> Result<(), StoreError> {
        let position = self.position_of(index).await?;
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT cells FROM registrant_rows WHERE position = $1 FOR UPDATE")
            .bind(position)
            .fetch_one(&mut *tx)
            .await?;
        let mut cells = decode_cells(row.try_get("cells")?);
        if cells.len() <= column {
            cells.resize(column + 1, String::new());
        }
        cells[column] = value.to_string();

        sqlx::query("UPDATE registrant_rows SET cells = $1 WHERE position = $2")
            .bind(cells)
            .bind(position)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn append_row(&self, values: &[String]) -> Result<RowIndex, StoreError> {
        let row = sqlx::query(
            "WITH inserted AS (
                INSERT INTO registrant_rows (cells) VALUES ($1) RETURNING position
            )
            SELECT (SELECT COUNT(*) FROM registrant_rows) + 1 AS total",
        )
        .bind(values.to_vec())
        .fetch_one(&self.pool)
        .await?;

        // The CTE snapshot does not see the inserted row, hence the + 1
        let total: i64 = row.try_get("total")?;
        Ok(FIRST_DATA_ROW + total as RowIndex - 1)
    }

    async fn delete_row(&self, index: RowIndex) -> Result<(), StoreError> {
        let position = self.position_of(index).await?;
        sqlx::query("DELETE FROM registrant_rows WHERE position = $1")
            .bind(position)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
