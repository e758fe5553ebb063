//! # Registry Module
//!
//! Record reconciliation on top of a [`RecordStore`]: look a user up by id,
//! decide between overwrite and append, and make sure writes through a row
//! reference captured earlier still land on that user's row.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::catalog::validate_catalog;
use crate::errors::StoreError;
use crate::registrant::{Column, ColumnMap, Registrant};
use crate::store::{RecordStore, RowIndex, FIRST_DATA_ROW};
use crate::user_locks::UserLockManager;

/// Row position of a user's record, tagged with the owner it was read for
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RowRef {
    pub index: RowIndex,
    pub user_id: u64,
}

/// What `upsert` did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    Updated(RowRef),
    Appended(RowRef),
}

impl UpsertOutcome {
    pub fn row(&self) -> RowRef {
        match self {
            UpsertOutcome::Updated(row) | UpsertOutcome::Appended(row) => *row,
        }
    }
}

pub struct Registry {
    store: Arc<dyn RecordStore>,
    columns: ColumnMap,
    locks: UserLockManager,
}

impl Registry {
    /// Read the store layout and check it can hold every catalog field
    pub async fn connect(store: Arc<dyn RecordStore>) -> Result<Self> {
        let mut header = store
            .header()
            .await
            .context("Failed to read the store header row")?;

        if header.iter().all(|h| h.trim().is_empty()) {
            warn!("Store has no header row, writing the standard layout");
            header = crate::registrant::standard_header();
            store
                .append_row(&header)
                .await
                .context("Failed to write the header row")?;
        }

        let columns = ColumnMap::from_header(&header);
        validate_catalog(&columns).context("Store layout does not match the field catalog")?;
        info!(columns = columns.width(), "Registry connected to record store");

        Ok(Self::with_columns(store, columns))
    }

    /// Registry over a store whose layout is already known
    pub fn with_columns(store: Arc<dyn RecordStore>, columns: ColumnMap) -> Self {
        Self {
            store,
            columns,
            locks: UserLockManager::new(),
        }
    }

    pub fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    fn owner_of(&self, row: &[String]) -> Option<u64> {
        self.columns.cell(row, Column::UserId).trim().parse().ok()
    }

    /// Find the user's first row. Read failures are reported as errors.
    pub async fn lookup(&self, user_id: u64) -> Result<Option<(RowRef, Registrant)>, StoreError> {
        let rows = self.store.rows().await?;
        for (offset, row) in rows.iter().enumerate() {
            if self.owner_of(row) != Some(user_id) {
                continue;
            }
            if let Some(record) = Registrant::from_row(&self.columns, row) {
                let index = FIRST_DATA_ROW + offset as RowIndex;
                return Ok(Some((RowRef { index, user_id }, record)));
            }
        }
        Ok(None)
    }

    /// Find the user's first row. Read failures are logged and reported as
    /// "not found".
    pub async fn find_by_user_id(&self, user_id: u64) -> Option<(RowRef, Registrant)> {
        match self.lookup(user_id).await {
            Ok(found) => found,
            Err(e) => {
                warn!(user_id, error = %e, "Record lookup failed, treating user as unregistered");
                None
            }
        }
    }

    /// Overwrite the user's row, or append one when none exists
    pub async fn upsert(&self, record: &Registrant) -> Result<UpsertOutcome, StoreError> {
        let guard = self.locks.lock(record.user_id).await;
        let outcome = self.upsert_locked(record).await;
        drop(guard);
        self.locks.prune();
        outcome
    }

    async fn upsert_locked(&self, record: &Registrant) -> Result<UpsertOutcome, StoreError> {
        match self.lookup(record.user_id).await? {
            Some((row_ref, _)) => {
                let existing = self.store.row(row_ref.index).await?.unwrap_or_default();
                let row = self.merge_row(record, existing);
                self.store.write_row(row_ref.index, &row).await?;
                info!(user_id = record.user_id, row = row_ref.index, "Updated registrant row");
                Ok(UpsertOutcome::Updated(row_ref))
            }
            None => {
                let index = self.store.append_row(&record.to_row(&self.columns)).await?;
                info!(user_id = record.user_id, row = index, "Appended registrant row");
                Ok(UpsertOutcome::Appended(RowRef {
                    index,
                    user_id: record.user_id,
                }))
            }
        }
    }

    /// Record cells laid over an existing row, keeping cells of unknown columns
    fn merge_row(&self, record: &Registrant, mut row: Vec<String>) -> Vec<String> {
        if row.len() < self.columns.width() {
            row.resize(self.columns.width(), String::new());
        }
        for column in Column::ALL {
            if let Some(position) = self.columns.position(column) {
                row[position] = record.value(column);
            }
        }
        row
    }

    /// Write one cell of the user's row. Returns the row actually written,
    /// which differs from `row_ref` when the row moved since it was read.
    pub async fn update_field(
        &self,
        row_ref: &RowRef,
        column: Column,
        value: &str,
    ) -> Result<RowRef, StoreError> {
        let position = self
            .columns
            .position(column)
            .ok_or(StoreError::UnmappedColumn(column))?;

        let guard = self.locks.lock(row_ref.user_id).await;
        let written = self.write_cell_locked(row_ref, position, value).await;
        drop(guard);
        self.locks.prune();

        let target = written?;
        debug!(user_id = target.user_id, row = target.index, column = ?column, "Updated registrant field");
        Ok(target)
    }

    async fn write_cell_locked(&self, row_ref: &RowRef, position: usize, value: &str) -> Result<RowRef, StoreError> {
        let target = self.resolve(row_ref).await?;
        self.store.write_cell(target.index, position, value).await?;
        Ok(target)
    }

    /// Delete the user's row
    pub async fn delete(&self, row_ref: &RowRef) -> Result<(), StoreError> {
        let guard = self.locks.lock(row_ref.user_id).await;
        let deleted = self.delete_locked(row_ref).await;
        drop(guard);
        self.locks.prune();

        let target = deleted?;

        info!(user_id = target.user_id, row = target.index, "Deleted registrant row");
        Ok(())
    }

    async fn delete_locked(&self, row_ref: &RowRef) -> Result<RowRef, StoreError> {
        let target = self.resolve(row_ref).await?;
        self.store.delete_row(target.index).await?;
        Ok(target)
    }

    /// Every record whose user id cell parses
    pub async fn all(&self) -> Result<Vec<Registrant>, StoreError> {
        let rows = self.store.rows().await?;
        Ok(rows
            .iter()
            .filter_map(|row| Registrant::from_row(&self.columns, row))
            .collect())
    }

    /// Confirm `row_ref` still points at its owner, re-resolving by scan when
    /// the row has moved
    async fn resolve(&self, row_ref: &RowRef) -> Result<RowRef, StoreError> {
        let current = self.store.row(row_ref.index).await?;
        if current.as_deref().and_then(|row| self.owner_of(row)) == Some(row_ref.user_id) {
            return Ok(*row_ref);
        }

        warn!(
            user_id = row_ref.user_id,
            row = row_ref.index,
            "Row no longer belongs to user, re-resolving"
        );
        match self.lookup(row_ref.user_id).await? {
            Some((moved, _)) => Ok(moved),
            None => Err(StoreError::StaleReference {
                user_id: row_ref.user_id,
                row: row_ref.index,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn record(user_id: u64) -> Registrant {
        Registrant {
            user_id,
            full_name: "Selam".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_writes_leave_no_idle_locks() {
        let registry = Registry::with_columns(Arc::new(MemoryStore::new()), ColumnMap::standard());

        let row = registry.upsert(&record(1)).await.unwrap().row();
        registry.upsert(&record(2)).await.unwrap();
        assert!(registry.locks.is_empty());

        registry.update_field(&row, Column::Phone, "0911000000").await.unwrap();
        assert!(registry.locks.is_empty());

        registry.delete(&row).await.unwrap();
        assert!(registry.locks.is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_releases_lock() {
        let store = Arc::new(MemoryStore::new());
        let registry = Registry::with_columns(store.clone(), ColumnMap::standard());
        let row = registry.upsert(&record(3)).await.unwrap().row();

        store.set_unavailable(true);
        assert!(registry.update_field(&row, Column::Phone, "0911000000").await.is_err());
        assert!(registry.locks.is_empty());
    }
}
