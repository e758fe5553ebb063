//! In-memory record store for local runs and tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{data_offset, RecordStore, RowIndex, FIRST_DATA_ROW};
use crate::errors::StoreError;
use crate::registrant::standard_header;

/// Table kept in process memory. Outages can be simulated with
/// [`MemoryStore::set_unavailable`].
#[derive(Debug)]
pub struct MemoryStore {
    header: Vec<String>,
    rows: RwLock<Vec<Vec<String>>>,
    unavailable: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    /// Empty table with the standard header
    pub fn new() -> Self {
        Self::with_rows(standard_header(), Vec::new())
    }

    /// Table with a custom header and initial data rows
    pub fn with_rows(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            header,
            rows: RwLock::new(rows),
            unavailable: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
        }
    }

    /// Make every following call fail as if the store were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of successful mutations so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Copy of every data row
    pub async fn snapshot(&self) -> Vec<Vec<String>> {
        self.rows.read().await.clone()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store marked unavailable".to_string()));
        }
        Ok(())
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn header(&self) -> Result<Vec<String>, StoreError> {
        self.check_available()?;
        Ok(self.header.clone())
    }

    async fn rows(&self) -> Result<Vec<Vec<String>>, StoreError> {
        self.check_available()?;
        Ok(self.rows.read().await.clone())
    }

    async fn row(&self, index: RowIndex) -> Result<Option<Vec<String>>, StoreError> {
        self.check_available()?;
        if index < FIRST_DATA_ROW {
            return Ok(None);
        }
        let rows = self.rows.read().await;
        Ok(rows.get((index - FIRST_DATA_ROW) as usize).cloned())
    }

    async fn write_row(&self, index: RowIndex, values: &[String]) -> Result<(), StoreError> {
        self.check_available()?;
        let offset = data_offset(index)?;
        let mut rows = self.rows.write().await;
        let row = rows.get_mut(offset).ok_or(StoreError::RowOutOfRange(index))?;
        *row = values.to_vec();
        self.record_write();
        Ok(())
    }

    async fn write_cell(&self, index: RowIndex, column: usize, value: &str) -> Result<(), StoreError> {
        self.check_available()?;
        let offset = data_offset(index)?;
        let mut rows = self.rows.write().await;
        let row = rows.get_mut(offset).ok_or(StoreError::RowOutOfRange(index))?;
        if row.len() <= column {
            row.resize(column + 1, String::new());
        }
        row[column] = value.to_string();
        self.record_write();
        Ok(())
    }

    async fn append_row(&self, values: &[String]) -> Result<RowIndex, StoreError> {
        self.check_available()?;
        let mut rows = self.rows.write().await;
        rows.push(values.to_vec());
        self.record_write();
        Ok(FIRST_DATA_ROW + rows.len() as RowIndex - 1)
    }

    async fn delete_row(&self, index: RowIndex) -> Result<(), StoreError> {
        self.check_available()?;
        let offset = data_offset(index)?;
        let mut rows = self.rows.write().await;
        if offset >= rows.len() {
            return Err(StoreError::RowOutOfRange(index));
        }
        rows.remove(offset);
        self.record_write();
        Ok(())
    }
}
