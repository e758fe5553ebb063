//! # Record Store Module
//!
//! Row-addressed tabular storage. Row 1 holds the column headers and data
//! rows start at row 2, matching the spreadsheet the bot was built around.
//! Three backends implement the same trait: Google Sheets (production),
//! PostgreSQL and an in-memory table.

use async_trait::async_trait;

use crate::errors::StoreError;
use crate::registrant::standard_header;

pub mod memory;
pub mod postgres;
pub mod sheets;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use sheets::SheetsStore;

/// 1-based row index, header included
pub type RowIndex = u32;

/// Index of the header row
pub const HEADER_ROW: RowIndex = 1;

/// Index of the first data row
pub const FIRST_DATA_ROW: RowIndex = 2;

/// Primitive operations of a row-addressed store
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Column names from the header row
    async fn header(&self) -> Result<Vec<String>, StoreError> {
        Ok(standard_header())
    }

    /// All data rows in store order, `rows()[0]` being row 2
    async fn rows(&self) -> Result<Vec<Vec<String>>, StoreError>;

    /// One data row, `None` past the end of the table
    async fn row(&self, index: RowIndex) -> Result<Option<Vec<String>>, StoreError> {
        if index < FIRST_DATA_ROW {
            return Ok(None);
        }
        let rows = self.rows().await?;
        Ok(rows.into_iter().nth((index - FIRST_DATA_ROW) as usize))
    }

    /// Overwrite the full row at `index`
    async fn write_row(&self, index: RowIndex, values: &[String]) -> Result<(), StoreError>;

    /// Overwrite one cell; `column` is the 0-based position within the row
    async fn write_cell(&self, index: RowIndex, column: usize, value: &str) -> Result<(), StoreError>;

    /// Append a row after the last one and return its index
    async fn append_row(&self, values: &[String]) -> Result<RowIndex, StoreError>;

    /// Remove a row; every later row moves up by one
    async fn delete_row(&self, index: RowIndex) -> Result<(), StoreError>;
}

/// Position of a data row inside `rows()`, rejecting the header and below
pub(crate) fn data_offset(index: RowIndex) -> Result<usize, StoreError> {
    if index < FIRST_DATA_ROW {
        return Err(StoreError::RowOutOfRange(index));
    }
    Ok((index - FIRST_DATA_ROW) as usize)
}
